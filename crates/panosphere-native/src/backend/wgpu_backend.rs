//! Explicit command-buffer backend on wgpu.
//!
//! Every `clear`/`draw` records one command buffer with a single render pass
//! and submits it. The window surface is presented right after submission;
//! the offscreen target is only used by headless tests.

use panosphere_core::constants::{
    CHROMA_TEXTURE_UNIT, CLEAR_COLOR, LUMA_TEXTURE_UNIT, POSITION_LOCATION, TEX_COORD_LOCATION,
};
use panosphere_core::texture::{PlaneTextureDesc, TextureAllocator};
use panosphere_core::{
    DrawCall, FrameError, GpuBackend, IndexWidth, Plane, PlaneFormat, SetupError, ShaderAssets,
    SphereGeometry, TextureError,
};
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct SphereUniforms {
    mvp: [[f32; 4]; 4],
}

enum RenderTarget {
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: wgpu::Texture,
    },
}

struct MeshBuffers {
    positions: wgpu::Buffer,
    tex_coords: wgpu::Buffer,
    indices: wgpu::Buffer,
}

struct Program {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

/// One plane texture and the view bound for sampling.
pub struct WgpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target: RenderTarget,
    color_format: wgpu::TextureFormat,
    mesh: Option<MeshBuffers>,
    program: Option<Program>,
}

impl WgpuBackend {
    /// Backend presenting to `window`.
    pub async fn for_window(window: Arc<Window>) -> Result<Self, SetupError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window)
            .map_err(|e| SetupError::DeviceUnavailable(e.to_string()))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| SetupError::DeviceUnavailable("no compatible GPU adapter".into()))?;
        let (device, queue) = request_device(&adapter).await?;

        let caps = surface.get_capabilities(&adapter);
        // Decoded video is already gamma encoded; an sRGB target would encode it twice.
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| SetupError::DeviceUnavailable("surface reports no formats".into()))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: caps.alpha_modes[0],
            desired_maximum_frame_latency: 2,
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        log::info!(
            "[wgpu] adapter {:?}, surface {:?} {}x{}",
            adapter.get_info().name,
            format,
            config.width,
            config.height
        );

        Ok(Self {
            device,
            queue,
            target: RenderTarget::Surface { surface, config },
            color_format: format,
            mesh: None,
            program: None,
        })
    }

    /// Backend rendering into an offscreen texture. Used without a window.
    pub async fn headless(width: u32, height: u32) -> Result<Self, SetupError> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| SetupError::DeviceUnavailable("no GPU adapter".into()))?;
        let (device, queue) = request_device(&adapter).await?;
        let texture = offscreen_texture(&device, width.max(1), height.max(1));
        log::info!("[wgpu] headless adapter {:?}", adapter.get_info().name);
        Ok(Self {
            device,
            queue,
            target: RenderTarget::Offscreen { texture },
            color_format: OFFSCREEN_FORMAT,
            mesh: None,
            program: None,
        })
    }

    /// Reapply the surface configuration after the surface was lost.
    pub fn reconfigure(&mut self) {
        if let RenderTarget::Surface { surface, config } = &self.target {
            surface.configure(&self.device, config);
        }
    }

    fn acquire(&self) -> Result<(Option<wgpu::SurfaceTexture>, wgpu::TextureView), FrameError> {
        match &self.target {
            RenderTarget::Surface { surface, .. } => {
                let frame = surface.get_current_texture().map_err(map_surface_error)?;
                let view = frame
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok((Some(frame), view))
            }
            RenderTarget::Offscreen { texture } => Ok((
                None,
                texture.create_view(&wgpu::TextureViewDescriptor::default()),
            )),
        }
    }

    fn sphere(&self) -> Result<(&MeshBuffers, &Program), FrameError> {
        match (&self.mesh, &self.program) {
            (Some(mesh), Some(program)) => Ok((mesh, program)),
            (None, _) => Err(FrameError::Backend("sphere mesh not uploaded".into())),
            (_, None) => Err(FrameError::Backend("program not built".into())),
        }
    }

    /// Record one pass: clear, then optionally draw the sphere.
    fn submit_pass(&self, draw: Option<(&wgpu::BindGroup, u32, IndexWidth)>) -> Result<(), FrameError> {
        let draw = match draw {
            Some(call) => Some((call, self.sphere()?)),
            None => None,
        };
        let (frame, view) = self.acquire()?;
        let [r, g, b, a] = CLEAR_COLOR;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("sphere encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sphere pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            if let Some(((textures, index_count, index_width), (mesh, program))) = draw {
                rpass.set_pipeline(&program.pipeline);
                rpass.set_bind_group(0, &program.uniform_bind_group, &[]);
                rpass.set_bind_group(1, textures, &[]);
                rpass.set_vertex_buffer(POSITION_LOCATION, mesh.positions.slice(..));
                rpass.set_vertex_buffer(TEX_COORD_LOCATION, mesh.tex_coords.slice(..));
                rpass.set_index_buffer(mesh.indices.slice(..), index_format(index_width));
                rpass.draw_indexed(0..index_count, 0, 0..1);
            }
        }
        self.queue.submit(Some(encoder.finish()));
        if let Some(frame) = frame {
            frame.present();
        }
        Ok(())
    }
}

async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue), SetupError> {
    adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::Performance,
                label: Some("panosphere device"),
            },
            None,
        )
        .await
        .map_err(|e| SetupError::DeviceUnavailable(e.to_string()))
}

fn offscreen_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("offscreen target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

fn map_surface_error(e: wgpu::SurfaceError) -> FrameError {
    match e {
        wgpu::SurfaceError::Lost => FrameError::Lost,
        wgpu::SurfaceError::Outdated => FrameError::Outdated,
        wgpu::SurfaceError::Timeout => FrameError::Timeout,
        wgpu::SurfaceError::OutOfMemory => FrameError::OutOfMemory,
        other => FrameError::Backend(other.to_string()),
    }
}

fn index_format(width: IndexWidth) -> wgpu::IndexFormat {
    match width {
        IndexWidth::U16 => wgpu::IndexFormat::Uint16,
        IndexWidth::U32 => wgpu::IndexFormat::Uint32,
    }
}

fn plane_format(format: PlaneFormat) -> wgpu::TextureFormat {
    match format {
        PlaneFormat::R8 => wgpu::TextureFormat::R8Unorm,
        PlaneFormat::Rg8 => wgpu::TextureFormat::Rg8Unorm,
    }
}

fn plane_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

impl TextureAllocator for WgpuBackend {
    type Texture = WgpuTexture;

    fn allocate_texture(&mut self, desc: &PlaneTextureDesc) -> Result<WgpuTexture, TextureError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if desc.width > max || desc.height > max {
            return Err(TextureError::Allocation {
                plane: desc.plane,
                reason: format!("{}x{} exceeds the {max} texel limit", desc.width, desc.height),
            });
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(match desc.format {
                PlaneFormat::R8 => "luma plane",
                PlaneFormat::Rg8 => "chroma plane",
            }),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: plane_format(desc.format),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(WgpuTexture { texture, view })
    }

    fn write_texture(
        &mut self,
        texture: &WgpuTexture,
        desc: &PlaneTextureDesc,
        plane: &Plane<'_>,
    ) -> Result<(), TextureError> {
        let stride = u32::try_from(plane.stride).map_err(|_| TextureError::Allocation {
            plane: desc.plane,
            reason: format!("stride {} does not fit a copy", plane.stride),
        })?;
        let used = plane.stride * (desc.height as usize - 1) + desc.row_bytes();
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &plane.data[..used],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(stride),
                rows_per_image: Some(desc.height),
            },
            wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    // Dropping instead of `Texture::destroy` keeps the texture alive until
    // writes already staged on the queue have been submitted.
    fn destroy_texture(&mut self, texture: WgpuTexture) {
        drop(texture);
    }
}

impl GpuBackend for WgpuBackend {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn upload_mesh(&mut self, geometry: &SphereGeometry) -> Result<(), SetupError> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let positions = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("sphere positions"),
                contents: geometry.positions_bytes(),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let tex_coords = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("sphere tex coords"),
                contents: geometry.tex_coords_bytes(),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let indices = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("sphere indices"),
                contents: geometry.indices.as_bytes(),
                usage: wgpu::BufferUsages::INDEX,
            });
        // Scopes pop innermost first.
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        if let Some(error) = validation.or(out_of_memory) {
            return Err(SetupError::BufferAllocation {
                label: "sphere mesh",
                reason: error.to_string(),
            });
        }
        self.mesh = Some(MeshBuffers {
            positions,
            tex_coords,
            indices,
        });
        Ok(())
    }

    fn build_program(&mut self, shaders: &dyn ShaderAssets) -> Result<(), SetupError> {
        let source = shaders.wgsl()?;
        // Validation errors surface through the error scope instead of the
        // default panicking handler.
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("sphere shader"),
                source: wgpu::ShaderSource::Wgsl(source),
            });

        let uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sphere uniforms"),
            size: std::mem::size_of::<SphereUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("sphere uniform layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });
        let uniform_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sphere uniforms"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        let texture_layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("plane texture layout"),
                entries: &[
                    plane_texture_entry(LUMA_TEXTURE_UNIT),
                    plane_texture_entry(CHROMA_TEXTURE_UNIT),
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("plane sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("sphere pipeline layout"),
                bind_group_layouts: &[&uniform_layout, &texture_layout],
                push_constant_ranges: &[],
            });
        let vertex_buffers = [
            wgpu::VertexBufferLayout {
                array_stride: (std::mem::size_of::<f32>() * 3) as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 0,
                    shader_location: POSITION_LOCATION,
                }],
            },
            wgpu::VertexBufferLayout {
                array_stride: (std::mem::size_of::<f32>() * 2) as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x2,
                    offset: 0,
                    shader_location: TEX_COORD_LOCATION,
                }],
            },
        ];
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("sphere pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &vertex_buffers,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                // Seen from the centre the sphere's triangles wind clockwise.
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Cw,
                    cull_mode: Some(wgpu::Face::Back),
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.color_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                cache: None,
                multiview: None,
            });

        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(SetupError::ShaderCompile {
                stage: "wgsl",
                log: error.to_string(),
            });
        }

        self.program = Some(Program {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            texture_layout,
            sampler,
        });
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        match &mut self.target {
            RenderTarget::Surface { surface, config } => {
                config.width = width;
                config.height = height;
                surface.configure(&self.device, config);
            }
            RenderTarget::Offscreen { texture } => {
                *texture = offscreen_texture(&self.device, width, height);
            }
        }
    }

    fn clear(&mut self) -> Result<(), FrameError> {
        self.submit_pass(None)
    }

    fn draw(&mut self, call: DrawCall<'_, WgpuTexture>) -> Result<(), FrameError> {
        let (_, program) = self.sphere()?;
        self.queue.write_buffer(
            &program.uniform_buffer,
            0,
            bytemuck::bytes_of(&SphereUniforms {
                mvp: call.mvp.to_cols_array_2d(),
            }),
        );
        let textures = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("plane textures"),
            layout: &program.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: LUMA_TEXTURE_UNIT,
                    resource: wgpu::BindingResource::TextureView(&call.textures.luma.view),
                },
                wgpu::BindGroupEntry {
                    binding: CHROMA_TEXTURE_UNIT,
                    resource: wgpu::BindingResource::TextureView(&call.textures.chroma.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&program.sampler),
                },
            ],
        });
        self.submit_pass(Some((&textures, call.index_count, call.index_width)))
    }

    fn release_mesh(&mut self) {
        self.mesh = None;
        self.program = None;
    }
}
