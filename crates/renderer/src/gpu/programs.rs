//! The fixed shader program set, compiled once per context.
//!
//! Every program shares two bind group layouts: set 0 is the std140 uniform
//! block, set 1 the sampled texture plus sampler. What the original resolved
//! as per-name uniform handles is expressed here as layout contracts checked
//! fatally at pipeline creation — a GLSL/layout mismatch aborts
//! initialization with the validation diagnostic, exactly like an unresolved
//! uniform did.

use anyhow::{anyhow, Result};
use wgpu::naga::ShaderStage;

use super::shaders;

/// Color format of the offscreen cascade. The alpha channel is real storage
/// here: the separable kernel accumulates its weight sum in alpha and
/// normalizes by it, so a format with implicit alpha would change the math.
pub(crate) const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub(crate) const STENCIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Stencil8;
/// Format of the host-filled input texture.
pub(crate) const INPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Stencil behavior of a surface-targeting pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StencilRole {
    /// Stencil attachment present but untouched.
    Ignore,
    /// Always pass and replace with the pass reference (the rect carve).
    Mark,
    /// Draw only where the stencil equals the pass reference.
    Test,
}

impl StencilRole {
    fn state(self) -> wgpu::StencilState {
        let face = match self {
            StencilRole::Ignore => wgpu::StencilFaceState {
                compare: wgpu::CompareFunction::Always,
                fail_op: wgpu::StencilOperation::Keep,
                depth_fail_op: wgpu::StencilOperation::Keep,
                pass_op: wgpu::StencilOperation::Keep,
            },
            StencilRole::Mark => wgpu::StencilFaceState {
                compare: wgpu::CompareFunction::Always,
                fail_op: wgpu::StencilOperation::Keep,
                depth_fail_op: wgpu::StencilOperation::Keep,
                pass_op: wgpu::StencilOperation::Replace,
            },
            StencilRole::Test => wgpu::StencilFaceState {
                compare: wgpu::CompareFunction::Equal,
                fail_op: wgpu::StencilOperation::Keep,
                depth_fail_op: wgpu::StencilOperation::Keep,
                pass_op: wgpu::StencilOperation::Keep,
            },
        };
        wgpu::StencilState {
            front: face,
            back: face,
            read_mask: 0xFF,
            write_mask: if self == StencilRole::Mark { 0xFF } else { 0 },
        }
    }
}

/// Context-lifetime shader modules, layouts, and the offscreen pipelines.
/// Surface-format pipelines live in [`SurfacePipelines`] because the
/// swapchain format is only known once a surface is attached.
pub(crate) struct ProgramSet {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    vs_transform: wgpu::ShaderModule,
    vs_plain: wgpu::ShaderModule,
    fs_no_blur: wgpu::ShaderModule,
    fs_blur_h: wgpu::ShaderModule,
    pub blur_v_input: wgpu::RenderPipeline,
    pub blur_h_offscreen: wgpu::RenderPipeline,
    pub blur_v_2d_offscreen: wgpu::RenderPipeline,
}

impl ProgramSet {
    pub(crate) fn new(device: &wgpu::Device) -> Result<Self> {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("camblur pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let vs_transform = shaders::compile_shader(
            device,
            "transform vertex",
            shaders::VS_TRANSFORM,
            ShaderStage::Vertex,
        )?;
        let vs_plain = shaders::compile_shader(
            device,
            "plain vertex",
            shaders::VS_PLAIN,
            ShaderStage::Vertex,
        )?;
        let fs_no_blur = shaders::compile_shader(
            device,
            "no-blur fragment",
            shaders::FS_NO_BLUR,
            ShaderStage::Fragment,
        )?;
        let fs_blur_v_input = shaders::compile_shader(
            device,
            "vertical blur (input) fragment",
            shaders::FS_BLUR_V_INPUT,
            ShaderStage::Fragment,
        )?;
        let fs_blur_v_2d = shaders::compile_shader(
            device,
            "vertical blur (2d) fragment",
            shaders::FS_BLUR_V_2D,
            ShaderStage::Fragment,
        )?;
        let fs_blur_h = shaders::compile_shader(
            device,
            "horizontal blur fragment",
            shaders::FS_BLUR_H,
            ShaderStage::Fragment,
        )?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let blur_v_input = build_pipeline(
            device,
            &pipeline_layout,
            "vertical blur from input",
            &vs_transform,
            &fs_blur_v_input,
            OFFSCREEN_FORMAT,
            None,
            None,
        );
        let blur_h_offscreen = build_pipeline(
            device,
            &pipeline_layout,
            "horizontal blur offscreen",
            &vs_plain,
            &fs_blur_h,
            OFFSCREEN_FORMAT,
            None,
            None,
        );
        let blur_v_2d_offscreen = build_pipeline(
            device,
            &pipeline_layout,
            "vertical blur offscreen",
            &vs_plain,
            &fs_blur_v_2d,
            OFFSCREEN_FORMAT,
            None,
            None,
        );
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(anyhow!("failed to build offscreen pipelines: {error}"));
        }

        Ok(Self {
            uniform_layout,
            texture_layout,
            pipeline_layout,
            vs_transform,
            vs_plain,
            fs_no_blur,
            fs_blur_h,
            blur_v_input,
            blur_h_offscreen,
            blur_v_2d_offscreen,
        })
    }

    /// Builds the four surface-format pipelines for a freshly attached
    /// surface. Rebuilt only when the swapchain format actually changes.
    pub(crate) fn surface_pipelines(
        &self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
    ) -> Result<SurfacePipelines> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let passthrough = build_pipeline(
            device,
            &self.pipeline_layout,
            "no-blur passthrough",
            &self.vs_transform,
            &self.fs_no_blur,
            format,
            None,
            Some(StencilRole::Ignore),
        );
        let rect_carve = build_pipeline(
            device,
            &self.pipeline_layout,
            "rect carve",
            &self.vs_transform,
            &self.fs_no_blur,
            format,
            Some(wgpu::BlendState::ALPHA_BLENDING),
            Some(StencilRole::Mark),
        );
        let cascade_final = build_pipeline(
            device,
            &self.pipeline_layout,
            "cascade final",
            &self.vs_plain,
            &self.fs_blur_h,
            format,
            None,
            Some(StencilRole::Ignore),
        );
        let cascade_final_masked = build_pipeline(
            device,
            &self.pipeline_layout,
            "cascade final masked",
            &self.vs_plain,
            &self.fs_blur_h,
            format,
            None,
            Some(StencilRole::Test),
        );
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(anyhow!("failed to build surface pipelines: {error}"));
        }

        Ok(SurfacePipelines {
            format,
            passthrough,
            rect_carve,
            cascade_final,
            cascade_final_masked,
        })
    }
}

/// Pipelines bound to a concrete swapchain format. All of them declare the
/// Stencil8 attachment because every surface pass of a frame shares it.
pub(crate) struct SurfacePipelines {
    pub format: wgpu::TextureFormat,
    pub passthrough: wgpu::RenderPipeline,
    pub rect_carve: wgpu::RenderPipeline,
    pub cascade_final: wgpu::RenderPipeline,
    pub cascade_final_masked: wgpu::RenderPipeline,
}

#[allow(clippy::too_many_arguments)]
fn build_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    label: &str,
    vertex: &wgpu::ShaderModule,
    fragment: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    stencil: Option<StencilRole>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: vertex,
            entry_point: Some("main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: stencil.map(|role| wgpu::DepthStencilState {
            format: STENCIL_FORMAT,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Always,
            stencil: role.state(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module: fragment,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}
