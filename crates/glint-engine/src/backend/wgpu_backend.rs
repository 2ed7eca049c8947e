use std::borrow::Cow;
use std::sync::Arc;

use anyhow::{Context, Result};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::coords::Extent2d;
use crate::device::{Gpu, GpuInit};
use crate::render::{
    GlobalData, MaterialData, PixelFormat, RenderError, RendererConfig, Transform, QUAD_INDICES,
};

use super::{Acquire, FrameRecording, GpuBackend, ImageDesc};

/// Device texture plus its sampled view.
pub struct WgpuImage {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// One bind group (globals, transforms, image, sampler, materials).
pub struct WgpuDescriptor {
    bind_group: wgpu::BindGroup,
}

/// Slot in the presentation engine's image rotation.
///
/// wgpu owns the actual surface textures; a slot records which chain
/// generation it belongs to so stale handles can be rejected.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ChainSlot {
    generation: u64,
    index: u32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ChainView {
    generation: u64,
    index: u32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ChainFramebuffer {
    generation: u64,
    index: u32,
    extent: Extent2d,
}

/// wgpu implementation of [`GpuBackend`].
///
/// Owns the device context, the quad pipeline and every fixed-size buffer:
/// - persistent staging buffer for image uploads
/// - globals uniform buffer
/// - transform and material storage buffers
/// - unit quad index buffer
///
/// The frame fence is the submission index of the last frame.
pub struct WgpuBackend {
    gpu: Gpu,

    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    staging: wgpu::Buffer,
    staging_size: u64,

    globals_ubo: wgpu::Buffer,
    transforms_sbo: wgpu::Buffer,
    materials_sbo: wgpu::Buffer,
    quad_ibo: wgpu::Buffer,
    max_transforms: usize,
    max_materials: usize,

    max_descriptors: usize,
    live_descriptors: usize,

    frame_fence: Option<wgpu::SubmissionIndex>,

    chain_generation: u64,
    chain_len: u32,
    next_slot: u32,
    acquired: Option<wgpu::SurfaceTexture>,
}

impl WgpuBackend {
    /// Creates the device context and every fixed pipeline object.
    pub async fn new(window: Arc<Window>, init: GpuInit, config: &RendererConfig) -> Result<Self> {
        let gpu = Gpu::new(window, init).await?;
        let device = gpu.device();

        let source: Cow<'static, str> = match &config.shader_override {
            Some(path) => std::fs::read_to_string(path)
                .map(Cow::Owned)
                .map_err(|e| RenderError::Shader(format!("{}: {e}", path.display())))
                .context("failed to load shader override")?,
            None => Cow::Borrowed(include_str!("../render/shaders/quad.wgsl")),
        };

        // Catches invalid shader overrides instead of hitting the uncaptured-error handler.
        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("glint quad shader"),
            source: wgpu::ShaderSource::Wgsl(source),
        });

        let storage_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("glint quad bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<GlobalData>() as u64,
                        ),
                    },
                    count: None,
                },
                storage_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                storage_entry(4),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("glint quad pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("glint quad pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.surface_format(),
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        if let Some(err) = scope.pop().await {
            return Err(RenderError::Shader(err.to_string())).context("failed to build quad pipeline");
        }

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("glint quad sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("glint staging buffer"),
            size: config.staging_size,
            usage: wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let globals_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("glint globals ubo"),
            size: std::mem::size_of::<GlobalData>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let max_transforms = config.max_transforms.max(1);
        let transforms_sbo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("glint transforms sbo"),
            size: (max_transforms * std::mem::size_of::<Transform>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let max_materials = config.max_materials.max(1);
        let materials_sbo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("glint materials sbo"),
            size: (max_materials * std::mem::size_of::<MaterialData>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let quad_ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("glint quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        log::debug!(
            "quad pipeline ready: format={:?} transforms={} materials={} staging={}B",
            gpu.surface_format(),
            max_transforms,
            max_materials,
            config.staging_size,
        );

        Ok(Self {
            gpu,
            pipeline,
            bind_group_layout,
            sampler,
            staging,
            staging_size: config.staging_size,
            globals_ubo,
            transforms_sbo,
            materials_sbo,
            quad_ibo,
            max_transforms,
            max_materials,
            max_descriptors: config.max_descriptors,
            live_descriptors: 0,
            frame_fence: None,
            chain_generation: 0,
            chain_len: 0,
            next_slot: 0,
            acquired: None,
        })
    }

    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    fn wait_for(&self, submission: wgpu::SubmissionIndex) -> Result<(), RenderError> {
        self.gpu
            .device()
            .poll(wgpu::PollType::Wait {
                submission_index: Some(submission),
                timeout: None,
            })
            .map(|_| ())
            .map_err(|e| RenderError::DeviceLost(e.to_string()))
    }
}

/// Rounds `bytes_per_row` up to the copy alignment wgpu requires.
fn padded_bytes_per_row(unpadded: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

fn texture_format(format: PixelFormat) -> wgpu::TextureFormat {
    match format {
        PixelFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
        PixelFormat::R8 => wgpu::TextureFormat::R8Unorm,
    }
}

/// Outdated is the only recoverable acquire failure.
fn acquire_error(err: wgpu::SurfaceError) -> Result<Acquire, RenderError> {
    match err {
        wgpu::SurfaceError::Outdated => Ok(Acquire::OutOfDate),
        wgpu::SurfaceError::Lost => Err(RenderError::SurfaceLost),
        wgpu::SurfaceError::Timeout => {
            Err(RenderError::DeviceLost("surface acquire timed out".into()))
        }
        wgpu::SurfaceError::OutOfMemory => Err(RenderError::OutOfMemory),
        e => Err(RenderError::DeviceLost(e.to_string())),
    }
}

impl GpuBackend for WgpuBackend {
    type Image = WgpuImage;
    type Descriptor = WgpuDescriptor;
    type ChainImage = ChainSlot;
    type View = ChainView;
    type Framebuffer = ChainFramebuffer;

    fn create_image(&mut self, desc: &ImageDesc<'_>) -> Result<WgpuImage, RenderError> {
        let expected = desc.expected_len();
        if desc.pixels.len() != expected {
            return Err(RenderError::InvalidPixelData {
                id: desc.id,
                expected,
                actual: desc.pixels.len(),
            });
        }

        let row = desc.width * desc.format.bytes_per_pixel();
        let padded_row = padded_bytes_per_row(row);
        let required = padded_row as u64 * desc.height as u64;
        if required > self.staging_size {
            return Err(RenderError::StagingOverflow {
                required,
                capacity: self.staging_size,
            });
        }

        // Rows are re-laid out at the padded pitch before the copy.
        let mut staged = vec![0u8; required as usize];
        for (src, dst) in desc
            .pixels
            .chunks_exact(row as usize)
            .zip(staged.chunks_exact_mut(padded_row as usize))
        {
            dst[..row as usize].copy_from_slice(src);
        }

        let device = self.gpu.device();
        let queue = self.gpu.queue();

        let size = wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("glint image"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(desc.format),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_buffer(&self.staging, 0, &staged);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("glint upload encoder"),
        });
        encoder.copy_buffer_to_texture(
            wgpu::TexelCopyBufferInfo {
                buffer: &self.staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(desc.height),
                },
            },
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            size,
        );
        let submission = queue.submit(std::iter::once(encoder.finish()));
        self.wait_for(submission)?;

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        log::debug!(
            "uploaded {:?} ({}x{} {:?})",
            desc.id,
            desc.width,
            desc.height,
            desc.format
        );

        Ok(WgpuImage { texture, view })
    }

    fn destroy_image(&mut self, image: WgpuImage) {
        drop(image.view);
        image.texture.destroy();
    }

    fn create_descriptor(&mut self, image: &WgpuImage) -> Result<WgpuDescriptor, RenderError> {
        if self.live_descriptors >= self.max_descriptors {
            return Err(RenderError::DescriptorTableFull {
                capacity: self.max_descriptors,
            });
        }

        let bind_group = self.gpu.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("glint quad bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.globals_ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.transforms_sbo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&image.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: self.materials_sbo.as_entire_binding(),
                },
            ],
        });

        self.live_descriptors += 1;
        Ok(WgpuDescriptor { bind_group })
    }

    fn destroy_descriptor(&mut self, descriptor: WgpuDescriptor) {
        drop(descriptor.bind_group);
        self.live_descriptors = self.live_descriptors.saturating_sub(1);
    }

    fn write_globals(&mut self, globals: &GlobalData) {
        self.gpu
            .queue()
            .write_buffer(&self.globals_ubo, 0, bytemuck::bytes_of(globals));
    }

    fn write_transforms(&mut self, transforms: &[Transform]) {
        let n = transforms.len().min(self.max_transforms);
        if n > 0 {
            self.gpu
                .queue()
                .write_buffer(&self.transforms_sbo, 0, bytemuck::cast_slice(&transforms[..n]));
        }
    }

    fn write_materials(&mut self, materials: &[MaterialData]) {
        let n = materials.len().min(self.max_materials);
        if n > 0 {
            self.gpu
                .queue()
                .write_buffer(&self.materials_sbo, 0, bytemuck::cast_slice(&materials[..n]));
        }
    }

    fn wait_for_frame(&mut self) -> Result<(), RenderError> {
        match self.frame_fence.take() {
            Some(submission) => self.wait_for(submission),
            None => Ok(()),
        }
    }

    fn wait_idle(&mut self) -> Result<(), RenderError> {
        self.frame_fence = None;
        self.gpu
            .device()
            .poll(wgpu::PollType::wait_indefinitely())
            .map(|_| ())
            .map_err(|e| RenderError::DeviceLost(e.to_string()))
    }

    fn create_chain(&mut self, extent: Extent2d) -> Result<Vec<ChainSlot>, RenderError> {
        if extent.is_empty() {
            return Err(RenderError::SwapchainInactive);
        }

        self.gpu.configure(extent);
        self.chain_generation += 1;
        self.chain_len = self.gpu.chain_length() as u32;
        self.next_slot = 0;

        log::debug!(
            "surface configured: {}x{}, {} images (generation {})",
            extent.width,
            extent.height,
            self.chain_len,
            self.chain_generation
        );

        let generation = self.chain_generation;
        Ok((0..self.chain_len)
            .map(|index| ChainSlot { generation, index })
            .collect())
    }

    fn destroy_chain(&mut self) {
        self.acquired = None;
        self.chain_len = 0;
        self.gpu.unconfigure();
    }

    fn create_view(&mut self, image: &ChainSlot) -> Result<ChainView, RenderError> {
        if image.generation != self.chain_generation {
            return Err(RenderError::SwapchainInactive);
        }
        Ok(ChainView {
            generation: image.generation,
            index: image.index,
        })
    }

    fn destroy_view(&mut self, _view: ChainView) {}

    fn create_framebuffer(
        &mut self,
        view: &ChainView,
        extent: Extent2d,
    ) -> Result<ChainFramebuffer, RenderError> {
        if view.generation != self.chain_generation {
            return Err(RenderError::SwapchainInactive);
        }
        Ok(ChainFramebuffer {
            generation: view.generation,
            index: view.index,
            extent,
        })
    }

    fn destroy_framebuffer(&mut self, _framebuffer: ChainFramebuffer) {}

    fn acquire(&mut self) -> Result<Acquire, RenderError> {
        if !self.gpu.is_configured() || self.chain_len == 0 {
            return Err(RenderError::SwapchainInactive);
        }

        // Holding a surface texture blocks the next acquisition.
        self.acquired = None;

        match self.gpu.surface().get_current_texture() {
            Ok(texture) => {
                let index = self.next_slot;
                self.next_slot = (self.next_slot + 1) % self.chain_len;
                let suboptimal = texture.suboptimal;
                self.acquired = Some(texture);
                Ok(if suboptimal {
                    Acquire::Suboptimal(index)
                } else {
                    Acquire::Ready(index)
                })
            }
            Err(e) => acquire_error(e),
        }
    }

    fn submit(
        &mut self,
        frame: &FrameRecording<'_, WgpuDescriptor, ChainFramebuffer>,
    ) -> Result<(), RenderError> {
        let target = frame.framebuffer;
        if target.generation != self.chain_generation || target.index != frame.image_index {
            return Err(RenderError::SwapchainInactive);
        }
        let Some(surface_texture) = self.acquired.as_ref() else {
            return Err(RenderError::SwapchainInactive);
        };
        debug_assert_eq!(target.extent, self.gpu.surface_extent());

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let device = self.gpu.device();
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("glint frame encoder"),
        });

        let [r, g, b, a] = frame.clear_color.to_array();
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("glint quad pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            let Extent2d { width, height } = frame.extent;
            rpass.set_pipeline(&self.pipeline);
            rpass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
            rpass.set_scissor_rect(0, 0, width, height);
            rpass.set_index_buffer(self.quad_ibo.slice(..), wgpu::IndexFormat::Uint32);

            for cmd in frame.commands {
                let Some(descriptor) = frame.descriptors.get(cmd.descriptor.get()) else {
                    log::error!("render command references missing descriptor {:?}", cmd.descriptor);
                    continue;
                };
                let first = cmd.push.transform_idx;
                rpass.set_bind_group(0, &descriptor.bind_group, &[]);
                rpass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, first..first + cmd.instance_count);
            }
        }

        let submission = self.gpu.queue().submit(std::iter::once(encoder.finish()));
        self.frame_fence = Some(submission);
        Ok(())
    }

    fn present(&mut self, image_index: u32) -> Result<(), RenderError> {
        let Some(texture) = self.acquired.take() else {
            return Err(RenderError::SwapchainInactive);
        };
        log::trace!("present image {image_index}");
        texture.present();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_padding_matches_copy_alignment() {
        assert_eq!(padded_bytes_per_row(4), 256);
        assert_eq!(padded_bytes_per_row(256), 256);
        assert_eq!(padded_bytes_per_row(512), 512);
        assert_eq!(padded_bytes_per_row(513), 768);
    }

    #[test]
    fn only_outdated_acquire_is_recoverable() {
        assert_eq!(acquire_error(wgpu::SurfaceError::Outdated), Ok(Acquire::OutOfDate));

        let timeout = acquire_error(wgpu::SurfaceError::Timeout).unwrap_err();
        assert!(matches!(timeout, RenderError::DeviceLost(_)));
        assert!(timeout.is_fatal());

        assert_eq!(acquire_error(wgpu::SurfaceError::Lost), Err(RenderError::SurfaceLost));
        assert_eq!(acquire_error(wgpu::SurfaceError::OutOfMemory), Err(RenderError::OutOfMemory));
    }

    #[test]
    fn pixel_formats_map_to_unorm_textures() {
        assert_eq!(texture_format(PixelFormat::Rgba8), wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(texture_format(PixelFormat::R8), wgpu::TextureFormat::R8Unorm);
    }
}
