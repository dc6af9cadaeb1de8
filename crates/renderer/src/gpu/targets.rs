//! Offscreen render targets: the blur cascade, the stencil buffer, and the
//! host-filled input texture.
//!
//! Cascade and stencil are sized to the attached surface and recreated as a
//! unit on every attach; the input texture follows the camera resolution and
//! starts as a 1x1 placeholder so the context is always fully bound.

use anyhow::{ensure, Result};

use super::programs::{INPUT_FORMAT, OFFSCREEN_FORMAT, STENCIL_FORMAT};
use crate::plan::cascade_tiers;

/// One color-renderable texture of the blur chain, with the bind group used
/// to sample it from the following pass.
pub(crate) struct OffscreenTarget {
    pub view: wgpu::TextureView,
    pub bind_group: wgpu::BindGroup,
    pub width: u32,
    pub height: u32,
}

impl OffscreenTarget {
    fn new(
        device: &wgpu::Device,
        texture_layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        width: u32,
        height: u32,
        index: usize,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("cascade target {index}")),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = sample_bind_group(device, texture_layout, sampler, &view);
        Self {
            view,
            bind_group,
            width,
            height,
        }
    }
}

/// The seven-target ping-pong chain of the separable blur, plus the
/// surface-sized stencil buffer used for rectangle compositing.
pub(crate) struct Cascade {
    pub targets: [OffscreenTarget; 7],
    pub stencil_view: wgpu::TextureView,
}

impl Cascade {
    pub(crate) fn allocate(
        device: &wgpu::Device,
        texture_layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        ensure!(
            width >= 4 && height >= 4,
            "surface {width}x{height} too small for the quarter-resolution blur tier"
        );
        let tiers = cascade_tiers(width, height);
        let targets = std::array::from_fn(|index| {
            let (tier_width, tier_height) = tiers[index];
            OffscreenTarget::new(device, texture_layout, sampler, tier_width, tier_height, index)
        });

        let stencil = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("compositing stencil"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: STENCIL_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let stencil_view = stencil.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self {
            targets,
            stencil_view,
        })
    }
}

/// The stand-in for the external camera texture: a regular 2D texture the
/// host uploads frames into before each render call.
pub(crate) struct InputTexture {
    pub texture: wgpu::Texture,
    pub bind_group: wgpu::BindGroup,
    pub width: u32,
    pub height: u32,
}

impl InputTexture {
    pub(crate) fn new(
        device: &wgpu::Device,
        texture_layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        width: u32,
        height: u32,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("camera input"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: INPUT_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = sample_bind_group(device, texture_layout, sampler, &view);
        Self {
            texture,
            bind_group,
            width,
            height,
        }
    }
}

fn sample_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    view: &wgpu::TextureView,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("sample bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}
