//! Camera-texture blur renderer.
//!
//! The crate renders a host-supplied camera texture to an attachable window
//! surface, with a frame-animated Gaussian blur cascade and sharp
//! rounded-rectangle cutouts composited over it through a stencil mask.
//!
//! Data flow per frame:
//!
//! ```text
//! host input frame ──► InputTexture
//!                          │
//!        BlurAnimation ────┤ (lod / contrast mix, ticked per frame)
//!                          ▼
//!                    plan::plan_frame ──► [FrameStep]
//!                          │
//!                          ▼
//!                    gpu::GpuState::render ──► surface
//! ```
//!
//! The planner is pure and unit-tested; the executor encodes what the planner
//! decided and never makes policy choices of its own.

pub mod animation;
mod gpu;
pub(crate) mod plan;

use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use animation::{BlurAnimation, ContrastColorAnimation};
use gpu::GpuState;
use plan::FrameSnapshot;

pub use gpu::IDENTITY_MATRIX;

/// A sharp rectangle to punch through the blurred base layer, in surface
/// pixels with a top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawnRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    /// Corner rounding in pixels; `0.0` draws square corners.
    pub corner_radius: f32,
}

/// Everything the host supplies for one frame.
///
/// `rects` is laid out with the secondary rectangles first: while the base
/// layer sits fully blurred, only the first `secondary_rect_count` entries are
/// carved sharp and the remainder stay blurred with the background.
#[derive(Debug, Clone, Copy)]
pub struct FrameParams<'a> {
    /// Presentation timestamp in nanoseconds, forwarded to tracing.
    pub timestamp_ns: i64,
    /// Column-major 4x4 transform applied to the fullscreen geometry.
    pub vert_transform: [f32; 16],
    /// Column-major 4x4 transform applied to texture coordinates, typically
    /// the camera's crop/rotation matrix.
    pub tex_transform: [f32; 16],
    pub rects: &'a [DrawnRect],
    pub secondary_rect_count: usize,
}

/// The renderer: GPU resources plus the two frame-driven animation machines.
///
/// Construction brings up the GPU context with no surface attached; the host
/// attaches one with [`attach_surface`](Self::attach_surface) before the first
/// [`render_frame`](Self::render_frame) and may detach/re-attach at any time.
pub struct RenderContext {
    state: GpuState,
    blur: BlurAnimation,
    contrast: ContrastColorAnimation,
}

impl RenderContext {
    pub fn new() -> Result<Self> {
        Ok(Self {
            state: GpuState::new()?,
            blur: BlurAnimation::new(),
            contrast: ContrastColorAnimation::new(),
        })
    }

    /// Attaches (or replaces) the output surface and allocates the
    /// surface-sized blur cascade.
    pub fn attach_surface<T>(&mut self, target: &T, width: u32, height: u32) -> Result<()>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        self.state.attach_surface(target, width, height)
    }

    /// Releases the surface and everything sized to it. Rendering calls made
    /// while detached fail without touching the remaining state.
    pub fn detach_surface(&mut self) {
        self.state.detach_surface();
    }

    pub fn surface_size(&self) -> Option<(u32, u32)> {
        self.state.surface_size()
    }

    /// Reallocates the input texture for a new camera resolution. Contents
    /// are undefined until the next [`write_input_frame`](Self::write_input_frame).
    pub fn set_input_resolution(&mut self, width: u32, height: u32) {
        self.state.set_input_resolution(width, height);
    }

    /// The texture sampled as the camera image, for hosts that fill it
    /// through their own copy paths instead of [`write_input_frame`](Self::write_input_frame).
    pub fn input_texture(&self) -> &wgpu::Texture {
        self.state.input_texture()
    }

    /// Uploads one tightly-packed RGBA8 frame at the current input resolution.
    pub fn write_input_frame(&self, pixels: &[u8]) -> Result<()> {
        self.state.write_input_frame(pixels)
    }

    /// Requests the blurred (`true`) or sharp (`false`) base layer, either as
    /// a 30-frame transition or as an immediate snap. Repeated calls in the
    /// same state are no-ops; a call mid-transition reverses its direction.
    pub fn set_blur_enabled(&mut self, enabled: bool, animated: bool) {
        self.blur.set_enabled(enabled, animated);
    }

    /// Sets the tint target for punched-through rectangles. The first call
    /// takes effect immediately; later calls fade over 60 frames.
    pub fn set_contrasting_color(&mut self, red: f32, green: f32, blue: f32) {
        self.contrast.set_target([red, green, blue]);
    }

    /// Renders and presents one frame, advancing both animation machines by
    /// one step. Returns `Ok(false)` when the frame had to be dropped (lost
    /// surface texture or a GPU error); the context stays usable.
    pub fn render_frame(&mut self, params: &FrameParams) -> Result<bool> {
        if self.blur.is_animating() {
            self.blur.tick();
        }
        if !params.rects.is_empty() && self.contrast.is_animating() {
            self.contrast.tick();
        }

        let snapshot = FrameSnapshot {
            lod: self.blur.lod(),
            enabled: self.blur.enabled(),
            animating: self.blur.is_animating(),
            contrast_mix: self.blur.contrast_mix(),
            contrast_color: self.contrast.current(),
        };
        let Some(surface) = self.state.surface_size() else {
            anyhow::bail!("render_frame called without an attached surface");
        };
        let steps = plan::plan_frame(&snapshot, params.rects, params.secondary_rect_count, surface);
        self.state.render(&steps, params)
    }

    /// Tears the renderer down. Dropping does the same; this form exists for
    /// hosts that want the release to be an explicit, ordered event.
    pub fn shutdown(self) {
        tracing::debug!("render context shut down");
        drop(self);
    }
}
