use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "camblur",
    author,
    version,
    about = "Windowed preview for the camera blur renderer",
    arg_required_else_help = false
)]
pub struct Args {
    /// Window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", default_value = "1280x720")]
    pub size: String,

    /// Use a PNG or JPEG still as the camera feed instead of the synthetic
    /// test pattern.
    #[arg(long, value_name = "PATH")]
    pub image: Option<PathBuf>,

    /// Resolution of the synthetic test pattern; ignored with --image.
    #[arg(long, value_name = "WIDTHxHEIGHT", default_value = "640x480")]
    pub input_size: String,

    /// Start with the background already blurred.
    #[arg(long)]
    pub blurred: bool,
}

pub fn parse() -> Args {
    Args::parse()
}

/// Parses a `WIDTHxHEIGHT` pair.
pub fn parse_dimensions(value: &str) -> Result<(u32, u32)> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid width in '{value}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid height in '{value}'"))?;
    if width == 0 || height == 0 {
        return Err(anyhow!("dimensions must be non-zero, got '{value}'"));
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_dimensions() {
        assert_eq!(parse_dimensions("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_dimensions("640X480").unwrap(), (640, 480));
    }

    #[test]
    fn rejects_malformed_dimensions() {
        assert!(parse_dimensions("1280").is_err());
        assert!(parse_dimensions("0x720").is_err());
        assert!(parse_dimensions("axb").is_err());
    }
}
