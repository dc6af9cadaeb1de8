//! Stand-ins for the camera: a decoded still image or an animated synthetic
//! test pattern, both delivered as tightly-packed RGBA8 frames.

use std::path::Path;

use anyhow::{Context, Result};

pub enum Feed {
    Still {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
    Synthetic {
        width: u32,
        height: u32,
        buffer: Vec<u8>,
    },
}

impl Feed {
    pub fn from_image(path: &Path) -> Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("failed to load feed image {}", path.display()))?
            .to_rgba8();
        let (width, height) = image.dimensions();
        tracing::info!(path = %path.display(), width, height, "using still image feed");
        Ok(Self::Still {
            width,
            height,
            pixels: image.into_raw(),
        })
    }

    pub fn synthetic(width: u32, height: u32) -> Self {
        tracing::info!(width, height, "using synthetic test pattern feed");
        Self::Synthetic {
            width,
            height,
            buffer: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Still { width, height, .. } | Self::Synthetic { width, height, .. } => {
                (*width, *height)
            }
        }
    }

    /// The pixels for this frame. Still feeds return the same image every
    /// time; the synthetic pattern redraws so motion stays visible under the
    /// blur.
    pub fn frame(&mut self, frame_index: u64) -> &[u8] {
        match self {
            Self::Still { pixels, .. } => pixels,
            Self::Synthetic {
                width,
                height,
                buffer,
            } => {
                draw_test_pattern(buffer, *width, *height, frame_index);
                buffer
            }
        }
    }
}

/// Scrolling diagonal color bands with a brightness pulse. Deliberately high
/// contrast so the blur LOD sweep is obvious.
fn draw_test_pattern(buffer: &mut [u8], width: u32, height: u32, frame_index: u64) {
    let phase = frame_index as f32 * 0.02;
    let pulse = 0.75 + 0.25 * (frame_index as f32 * 0.05).sin();
    for y in 0..height {
        let fy = y as f32 / height as f32;
        for x in 0..width {
            let fx = x as f32 / width as f32;
            let band = ((fx + fy + phase) * 6.0).sin() * 0.5 + 0.5;
            let offset = (y as usize * width as usize + x as usize) * 4;
            buffer[offset] = (band * pulse * 255.0) as u8;
            buffer[offset + 1] = ((1.0 - band) * pulse * 255.0) as u8;
            buffer[offset + 2] = ((fx * (1.0 - fy)) * 255.0) as u8;
            buffer[offset + 3] = 255;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_frames_are_tightly_packed_and_opaque() {
        let mut feed = Feed::synthetic(16, 8);
        let frame = feed.frame(0);
        assert_eq!(frame.len(), 16 * 8 * 4);
        assert!(frame.chunks_exact(4).all(|px| px[3] == 255));
    }

    #[test]
    fn synthetic_pattern_moves_between_frames() {
        let mut feed = Feed::synthetic(32, 32);
        let first = feed.frame(0).to_vec();
        let later = feed.frame(30).to_vec();
        assert_ne!(first, later);
    }
}
