//! std140 uniform blocks shared between the GLSL sources and the encoder.
//!
//! Field order and padding must match the `Params` blocks declared in
//! `shaders.rs`; both structs are 160 bytes so either bind group satisfies
//! the common uniform layout.

use bytemuck::{Pod, Zeroable};

/// Column-major identity, the no-op value for both transform uniforms.
pub const IDENTITY_MATRIX: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Uniforms of the NoBlur program: transforms plus the rounded-rectangle mask
/// (`rect` is x, y, width, height in framebuffer pixels, top-left origin).
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct QuadUniforms {
    pub vert_transform: [f32; 16],
    pub tex_transform: [f32; 16],
    pub rect: [f32; 4],
    pub corner_radius: f32,
    pub _padding: [f32; 3],
}

impl QuadUniforms {
    pub fn passthrough(vert_transform: [f32; 16], tex_transform: [f32; 16]) -> Self {
        Self {
            vert_transform,
            tex_transform,
            rect: [0.0; 4],
            corner_radius: 0.0,
            _padding: [0.0; 3],
        }
    }

    pub fn rounded_rect(
        vert_transform: [f32; 16],
        tex_transform: [f32; 16],
        rect: [f32; 4],
        corner_radius: f32,
    ) -> Self {
        Self {
            vert_transform,
            tex_transform,
            rect,
            corner_radius,
            _padding: [0.0; 3],
        }
    }
}

/// Uniforms shared by the three blur programs. `contrast_color` packs the
/// tint rgb with the mix amount in the fourth component; `axis_extent` is the
/// destination height for vertical passes and width for horizontal ones.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct BlurUniforms {
    pub vert_transform: [f32; 16],
    pub tex_transform: [f32; 16],
    pub contrast_color: [f32; 4],
    pub axis_extent: f32,
    pub lod: f32,
    pub min_lod: f32,
    pub _padding: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_share_one_std140_size() {
        assert_eq!(std::mem::size_of::<QuadUniforms>(), 160);
        assert_eq!(std::mem::size_of::<BlurUniforms>(), 160);
    }
}
