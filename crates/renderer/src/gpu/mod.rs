//! The wgpu execution layer.
//!
//! Everything under this module deals in device objects; the frame *plan* is
//! computed upstream in [`crate::plan`] and handed to [`GpuState::render`]
//! already decided. Submodules:
//! - `context`: instance/adapter/device selection and surface configuration.
//! - `shaders`: the GLSL 450 sources and naga front-end compilation.
//! - `programs`: bind group layouts, shader modules, pipelines.
//! - `uniforms`: std140 blocks mirrored by the shader `Params` declarations.
//! - `targets`: the offscreen cascade, stencil buffer, and input texture.
//! - `state`: the per-frame encoder.

mod context;
mod programs;
mod shaders;
mod state;
mod targets;
mod uniforms;

pub(crate) use state::GpuState;
pub use uniforms::IDENTITY_MATRIX;
