//! GPU-side state and the frame executor.
//!
//! `GpuState` owns everything with a device lifetime (programs, uniform
//! buffers, the input texture) plus the surface-dependent swapchain state and
//! cascade. It encodes the pure [`FrameStep`] plan into render passes: each
//! pass uploads its uniforms through a staging-buffer copy on the encoder so
//! every draw sees its own values, and the whole frame runs inside a device
//! error scope that is popped before presentation — a reported error drops
//! the frame instead of presenting it.

use anyhow::{bail, ensure, Context as AnyhowContext, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::util::DeviceExt;

use super::context::GpuContext;
use super::programs::{ProgramSet, SurfacePipelines};
use super::targets::{Cascade, InputTexture};
use crate::animation::MIN_LOD;
use crate::gpu::uniforms::{BlurUniforms, QuadUniforms};
use crate::plan::FrameStep;
use crate::FrameParams;

struct SurfaceState {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    pipelines: SurfacePipelines,
    cascade: Cascade,
}

pub(crate) struct GpuState {
    context: GpuContext,
    programs: ProgramSet,
    sampler: wgpu::Sampler,
    quad_uniform_buffer: wgpu::Buffer,
    blur_uniform_buffer: wgpu::Buffer,
    quad_bind_group: wgpu::BindGroup,
    blur_bind_group: wgpu::BindGroup,
    input: InputTexture,
    surface: Option<SurfaceState>,
}

impl GpuState {
    pub(crate) fn new() -> Result<Self> {
        let context = GpuContext::new()?;
        let programs = ProgramSet::new(&context.device)?;

        let sampler = context.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("cascade sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let quad_uniform_buffer = uniform_buffer::<QuadUniforms>(&context.device, "quad uniforms");
        let blur_uniform_buffer = uniform_buffer::<BlurUniforms>(&context.device, "blur uniforms");
        let quad_bind_group =
            uniform_bind_group(&context.device, &programs.uniform_layout, &quad_uniform_buffer);
        let blur_bind_group =
            uniform_bind_group(&context.device, &programs.uniform_layout, &blur_uniform_buffer);

        // 1x1 placeholder until the host reports the camera resolution, so the
        // bind groups are valid from the first frame.
        let input = InputTexture::new(
            &context.device,
            &programs.texture_layout,
            &sampler,
            1,
            1,
        );

        Ok(Self {
            context,
            programs,
            sampler,
            quad_uniform_buffer,
            blur_uniform_buffer,
            quad_bind_group,
            blur_bind_group,
            input,
            surface: None,
        })
    }

    pub(crate) fn surface_size(&self) -> Option<(u32, u32)> {
        self.surface
            .as_ref()
            .map(|state| (state.config.width, state.config.height))
    }

    pub(crate) fn input_texture(&self) -> &wgpu::Texture {
        &self.input.texture
    }

    pub(crate) fn set_input_resolution(&mut self, width: u32, height: u32) {
        self.input = InputTexture::new(
            &self.context.device,
            &self.programs.texture_layout,
            &self.sampler,
            width.max(1),
            height.max(1),
        );
    }

    pub(crate) fn write_input_frame(&self, pixels: &[u8]) -> Result<()> {
        let expected = self.input.width as usize * self.input.height as usize * 4;
        ensure!(
            pixels.len() == expected,
            "input frame is {} bytes, expected {expected} for {}x{} rgba",
            pixels.len(),
            self.input.width,
            self.input.height
        );
        self.context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.input.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.input.width * 4),
                rows_per_image: Some(self.input.height),
            },
            wgpu::Extent3d {
                width: self.input.width,
                height: self.input.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    /// Detaches any previous surface, then creates and configures a new one
    /// and allocates the surface-sized cascade and stencil.
    pub(crate) fn attach_surface<T>(&mut self, target: &T, width: u32, height: u32) -> Result<()>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        self.detach_surface();

        let (surface, config) = self.context.create_surface(target, width, height)?;
        let pipelines = self
            .programs
            .surface_pipelines(&self.context.device, config.format)
            .context("failed to build pipelines for the attached surface")?;
        let cascade = Cascade::allocate(
            &self.context.device,
            &self.programs.texture_layout,
            &self.sampler,
            config.width,
            config.height,
        )
        .context("failed to allocate the offscreen blur cascade")?;

        tracing::debug!(
            format = ?pipelines.format,
            width = config.width,
            height = config.height,
            "surface attached"
        );
        self.surface = Some(SurfaceState {
            surface,
            config,
            pipelines,
            cascade,
        });
        Ok(())
    }

    pub(crate) fn detach_surface(&mut self) {
        if self.surface.take().is_some() {
            tracing::debug!("surface detached; cascade released");
        }
    }

    /// Encodes and submits the planned steps, then presents.
    ///
    /// `Ok(false)` means the frame was dropped (surface acquisition failed or
    /// the error scope reported a GPU error before presentation); the state
    /// stays valid for the next call.
    pub(crate) fn render(&mut self, steps: &[FrameStep], params: &FrameParams) -> Result<bool> {
        let Some(state) = self.surface.as_ref() else {
            bail!("render_frame called without an attached surface");
        };
        let device = &self.context.device;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let frame = match state.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(error) => {
                let _ = pollster::block_on(device.pop_error_scope());
                tracing::error!(%error, "failed to acquire surface texture; dropping frame");
                return Ok(false);
            }
        };
        let surface_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame encoder"),
        });

        let mut first_surface_pass = true;
        for step in steps {
            match step {
                FrameStep::Passthrough => {
                    self.encode_passthrough(
                        state,
                        &mut encoder,
                        &surface_view,
                        params,
                        first_surface_pass,
                    );
                    first_surface_pass = false;
                }
                FrameStep::RectCarve { rect, scissor } => {
                    self.encode_rect_carve(
                        state,
                        &mut encoder,
                        &surface_view,
                        params,
                        rect,
                        scissor,
                    );
                }
                FrameStep::Cascade {
                    lod,
                    contrast_mix,
                    contrast_color,
                    masked,
                } => {
                    self.encode_cascade(
                        state,
                        &mut encoder,
                        &surface_view,
                        params,
                        *lod,
                        [
                            contrast_color[0],
                            contrast_color[1],
                            contrast_color[2],
                            *contrast_mix,
                        ],
                        *masked,
                        first_surface_pass,
                    );
                    first_surface_pass = false;
                }
            }
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        let _ = device.poll(wgpu::PollType::Poll);

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            tracing::error!(%error, "abandoning frame after GPU error");
            return Ok(false);
        }

        tracing::trace!(timestamp_ns = params.timestamp_ns, "presenting frame");
        frame.present();
        Ok(true)
    }

    fn encode_passthrough(
        &self,
        state: &SurfaceState,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        params: &FrameParams,
        first_surface_pass: bool,
    ) {
        self.stage_uniforms(
            encoder,
            &self.quad_uniform_buffer,
            &QuadUniforms::passthrough(params.vert_transform, params.tex_transform),
        );
        let mut pass = begin_surface_pass(
            encoder,
            surface_view,
            &state.cascade.stencil_view,
            first_surface_pass,
        );
        pass.set_pipeline(&state.pipelines.passthrough);
        pass.set_bind_group(0, &self.quad_bind_group, &[]);
        pass.set_bind_group(1, &self.input.bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    fn encode_rect_carve(
        &self,
        state: &SurfaceState,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        params: &FrameParams,
        rect: &crate::DrawnRect,
        scissor: &crate::plan::ScissorRect,
    ) {
        self.stage_uniforms(
            encoder,
            &self.quad_uniform_buffer,
            &QuadUniforms::rounded_rect(
                params.vert_transform,
                params.tex_transform,
                [rect.left, rect.top, rect.width, rect.height],
                rect.corner_radius,
            ),
        );
        let mut pass = begin_surface_pass(
            encoder,
            surface_view,
            &state.cascade.stencil_view,
            false,
        );
        pass.set_scissor_rect(
            scissor.x,
            scissor.top_origin_y(state.config.height),
            scissor.width,
            scissor.height,
        );
        pass.set_stencil_reference(1);
        pass.set_pipeline(&state.pipelines.rect_carve);
        pass.set_bind_group(0, &self.quad_bind_group, &[]);
        pass.set_bind_group(1, &self.input.bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    /// The eight passes of the separable blur: vertical from the input into
    /// the half-resolution tier, then alternating horizontal/vertical through
    /// the chain, finishing with a horizontal pass onto the visible surface.
    /// The contrast tint is applied only on that final pass.
    #[allow(clippy::too_many_arguments)]
    fn encode_cascade(
        &self,
        state: &SurfaceState,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        params: &FrameParams,
        lod: f32,
        contrast: [f32; 4],
        masked: bool,
        first_surface_pass: bool,
    ) {
        let targets = &state.cascade.targets;
        let no_tint = [0.0; 4];

        let mut blur_uniforms = BlurUniforms {
            vert_transform: params.vert_transform,
            tex_transform: params.tex_transform,
            contrast_color: no_tint,
            axis_extent: targets[0].height as f32,
            lod,
            min_lod: MIN_LOD,
            _padding: 0.0,
        };
        self.stage_uniforms(encoder, &self.blur_uniform_buffer, &blur_uniforms);
        self.encode_offscreen_pass(
            encoder,
            &self.programs.blur_v_input,
            &self.input.bind_group,
            &targets[0].view,
        );

        for index in 1..7 {
            let horizontal = index % 2 == 1;
            blur_uniforms.axis_extent = if horizontal {
                targets[index].width as f32
            } else {
                targets[index].height as f32
            };
            self.stage_uniforms(encoder, &self.blur_uniform_buffer, &blur_uniforms);
            let pipeline = if horizontal {
                &self.programs.blur_h_offscreen
            } else {
                &self.programs.blur_v_2d_offscreen
            };
            self.encode_offscreen_pass(
                encoder,
                pipeline,
                &targets[index - 1].bind_group,
                &targets[index].view,
            );
        }

        blur_uniforms.axis_extent = targets[6].width as f32;
        blur_uniforms.contrast_color = contrast;
        self.stage_uniforms(encoder, &self.blur_uniform_buffer, &blur_uniforms);
        let mut pass = begin_surface_pass(
            encoder,
            surface_view,
            &state.cascade.stencil_view,
            first_surface_pass,
        );
        if masked {
            pass.set_stencil_reference(1);
            pass.set_pipeline(&state.pipelines.cascade_final_masked);
        } else {
            pass.set_pipeline(&state.pipelines.cascade_final);
        }
        pass.set_bind_group(0, &self.blur_bind_group, &[]);
        pass.set_bind_group(1, &targets[6].bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    fn encode_offscreen_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::RenderPipeline,
        source: &wgpu::BindGroup,
        destination: &wgpu::TextureView,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("cascade pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: destination,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.blur_bind_group, &[]);
        pass.set_bind_group(1, source, &[]);
        pass.draw(0..3, 0..1);
    }

    /// Per-pass uniform upload: copying from a fresh staging buffer inside
    /// the encoder keeps the copies ordered with the passes, so one uniform
    /// buffer per block serves the whole frame.
    fn stage_uniforms<T: bytemuck::Pod>(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::Buffer,
        value: &T,
    ) {
        let staging = self
            .context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("uniform staging"),
                contents: bytemuck::bytes_of(value),
                usage: wgpu::BufferUsages::COPY_SRC,
            });
        encoder.copy_buffer_to_buffer(&staging, 0, target, 0, std::mem::size_of::<T>() as u64);
    }
}

/// Begins a pass on the visible surface with the shared stencil attachment.
/// The first surface pass of a frame clears both color and stencil; later
/// passes load what the previous ones wrote.
fn begin_surface_pass<'a>(
    encoder: &'a mut wgpu::CommandEncoder,
    surface_view: &'a wgpu::TextureView,
    stencil_view: &'a wgpu::TextureView,
    first_surface_pass: bool,
) -> wgpu::RenderPass<'a> {
    let (color_load, stencil_load) = if first_surface_pass {
        (
            wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            wgpu::LoadOp::Clear(0),
        )
    } else {
        (wgpu::LoadOp::Load, wgpu::LoadOp::Load)
    };
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("surface pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: surface_view,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: color_load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: stencil_view,
            depth_ops: None,
            stencil_ops: Some(wgpu::Operations {
                load: stencil_load,
                store: wgpu::StoreOp::Store,
            }),
        }),
        occlusion_query_set: None,
        timestamp_writes: None,
    })
}

fn uniform_buffer<T>(device: &wgpu::Device, label: &str) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<T>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn uniform_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("uniform bind group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    })
}
