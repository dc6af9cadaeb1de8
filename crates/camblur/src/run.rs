use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use renderer::{DrawnRect, FrameParams, RenderContext, IDENTITY_MATRIX};
use tracing_subscriber::EnvFilter;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowBuilder;

use crate::cli::{parse_dimensions, Args};
use crate::feed::Feed;

/// Contrast tint colors cycled with the `c` key.
const PALETTE: [[f32; 3]; 4] = [
    [1.0, 1.0, 1.0],
    [0.9, 0.2, 0.2],
    [0.2, 0.9, 0.3],
    [0.2, 0.4, 1.0],
];

pub fn run(args: Args) -> Result<()> {
    initialise_tracing();

    let (width, height) = parse_dimensions(&args.size).context("invalid --size")?;
    let mut feed = match args.image.as_deref() {
        Some(path) => Feed::from_image(path)?,
        None => {
            let (input_width, input_height) =
                parse_dimensions(&args.input_size).context("invalid --input-size")?;
            Feed::synthetic(input_width, input_height)
        }
    };

    let mut context = RenderContext::new()?;
    let (input_width, input_height) = feed.dimensions();
    context.set_input_resolution(input_width, input_height);
    if args.blurred {
        context.set_blur_enabled(true, false);
    }
    context.set_contrasting_color(PALETTE[0][0], PALETTE[0][1], PALETTE[0][2]);

    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let window = WindowBuilder::new()
        .with_title("camblur preview")
        .with_inner_size(PhysicalSize::new(width, height))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))?;

    let size = window.inner_size();
    context.attach_surface(&window, size.width, size.height)?;
    tracing::info!(
        width = size.width,
        height = size.height,
        "preview up; space toggles blur, return snaps it, c cycles the tint"
    );

    let start = Instant::now();
    let mut frame_index: u64 = 0;
    let mut blurred = args.blurred;
    let mut palette_index = 0usize;
    let mut result = Ok(());

    let run_result = event_loop.run(|event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                elwt.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                match event.logical_key {
                    Key::Named(NamedKey::Space) => {
                        blurred = !blurred;
                        context.set_blur_enabled(blurred, true);
                    }
                    Key::Named(NamedKey::Enter) => {
                        blurred = !blurred;
                        context.set_blur_enabled(blurred, false);
                    }
                    Key::Named(NamedKey::Escape) => {
                        elwt.exit();
                    }
                    Key::Character(ref value) if value.as_str() == "c" => {
                        palette_index = (palette_index + 1) % PALETTE.len();
                        let [red, green, blue] = PALETTE[palette_index];
                        context.set_contrasting_color(red, green, blue);
                    }
                    _ => {}
                }
            }
            WindowEvent::Resized(new_size) => {
                if new_size.width > 0 && new_size.height > 0 {
                    if let Err(err) =
                        context.attach_surface(&window, new_size.width, new_size.height)
                    {
                        result = Err(err.context("failed to re-attach surface after resize"));
                        elwt.exit();
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                frame_index += 1;
                let Some((surface_width, surface_height)) = context.surface_size() else {
                    return;
                };
                if let Err(err) = context.write_input_frame(feed.frame(frame_index)) {
                    result = Err(err);
                    elwt.exit();
                    return;
                }
                let rects = demo_rects(surface_width, surface_height, frame_index);
                let params = FrameParams {
                    timestamp_ns: start.elapsed().as_nanos() as i64,
                    vert_transform: IDENTITY_MATRIX,
                    tex_transform: IDENTITY_MATRIX,
                    rects: &rects,
                    secondary_rect_count: 1,
                };
                match context.render_frame(&params) {
                    Ok(true) => {}
                    Ok(false) => tracing::warn!("frame dropped"),
                    Err(err) => {
                        result = Err(err);
                        elwt.exit();
                    }
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            window.request_redraw();
            elwt.set_control_flow(ControlFlow::Poll);
        }
        _ => {}
    });

    if let Err(err) = run_result {
        return Err(anyhow!("window event loop error: {err}"));
    }
    result
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// One fixed marker rectangle in the middle and one secondary rectangle
/// orbiting it. The secondary one comes first so it stays sharp while the
/// background sits fully blurred.
fn demo_rects(surface_width: u32, surface_height: u32, frame_index: u64) -> [DrawnRect; 2] {
    let width = surface_width as f32;
    let height = surface_height as f32;
    let angle = frame_index as f32 * 0.015;

    let orbit_width = width * 0.18;
    let orbit_height = height * 0.12;
    let orbit = DrawnRect {
        left: width * 0.5 + angle.cos() * width * 0.3 - orbit_width * 0.5,
        top: height * 0.5 + angle.sin() * height * 0.3 - orbit_height * 0.5,
        width: orbit_width,
        height: orbit_height,
        corner_radius: orbit_height * 0.2,
    };
    let marker_width = width * 0.3;
    let marker_height = height * 0.2;
    let marker = DrawnRect {
        left: (width - marker_width) * 0.5,
        top: (height - marker_height) * 0.5,
        width: marker_width,
        height: marker_height,
        corner_radius: marker_height * 0.15,
    };
    [orbit, marker]
}
