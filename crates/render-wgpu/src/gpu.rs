use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use procgfx_common::{
    BackendError, CommandList, Extent2d, ResourceDescriptor, ResourceId, ResourceKind,
    SubmissionId, TextureFormat,
};
use procgfx_content::Vertex;
use procgfx_device::{
    DeviceBackend, DeviceCapabilities, DeviceRequirements, SurfaceConfig, SurfaceRequest,
};
use procgfx_frame::{AcquireError, FrameBackend, TargetImage};
use procgfx_resources::{ResourceBackend, ResourceError};

use crate::shaders;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const FRAME_LATENCY: u32 = 2;

/// Formats probed on the adapter and reported in the capabilities.
const PROBED_FORMATS: [TextureFormat; 5] = [
    TextureFormat::Rgba8Unorm,
    TextureFormat::Rgba8UnormSrgb,
    TextureFormat::Bgra8Unorm,
    TextureFormat::Bgra8UnormSrgb,
    TextureFormat::Depth32Float,
];

pub(crate) fn to_wgpu_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TextureFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        TextureFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        TextureFormat::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
        TextureFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
    }
}

pub(crate) fn from_wgpu_format(format: wgpu::TextureFormat) -> Option<TextureFormat> {
    PROBED_FORMATS
        .into_iter()
        .find(|f| to_wgpu_format(*f) == format)
}

pub(crate) fn map_surface_error(error: wgpu::SurfaceError) -> AcquireError {
    match error {
        wgpu::SurfaceError::Timeout => AcquireError::Timeout,
        wgpu::SurfaceError::Outdated => AcquireError::Outdated,
        wgpu::SurfaceError::Lost => AcquireError::Lost,
        wgpu::SurfaceError::OutOfMemory => AcquireError::OutOfMemory,
        other => AcquireError::Other(other.to_string()),
    }
}

/// Device-level objects shared by every resource.
struct Gpu {
    device: wgpu::Device,
    queue: wgpu::Queue,
    limits: wgpu::Limits,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    shader: wgpu::ShaderModule,
    sampler: wgpu::Sampler,
}

enum GpuObject {
    Buffer(wgpu::Buffer),
    Texture {
        texture: wgpu::Texture,
        view: wgpu::TextureView,
        extent: Extent2d,
    },
    Pipeline(wgpu::RenderPipeline),
}

struct Presentable {
    config: wgpu::SurfaceConfiguration,
    depth: wgpu::TextureView,
}

/// wgpu implementation of the renderer backend traits, presenting to a
/// window surface.
pub struct WgpuBackend {
    instance: wgpu::Instance,
    surface: Option<wgpu::Surface<'static>>,
    adapter: Option<wgpu::Adapter>,
    gpu: Option<Gpu>,
    presentable: Option<Presentable>,
    current: Option<(TargetImage, wgpu::SurfaceTexture)>,
    next_image: u32,
    objects: HashMap<ResourceId, GpuObject>,
    bind_groups: HashMap<(ResourceId, ResourceId), wgpu::BindGroup>,
    submitted: SubmissionId,
    completed: Arc<AtomicU64>,
    lost: Arc<AtomicBool>,
}

impl WgpuBackend {
    /// Create the instance and the raw surface for `target`.
    ///
    /// Nothing is configured until the device context initializes.
    pub fn new(target: impl Into<wgpu::SurfaceTarget<'static>>) -> Result<Self, BackendError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(target)
            .map_err(|e| BackendError::new(format!("create surface: {e}")))?;
        Ok(Self {
            instance,
            surface: Some(surface),
            adapter: None,
            gpu: None,
            presentable: None,
            current: None,
            next_image: 0,
            objects: HashMap::new(),
            bind_groups: HashMap::new(),
            submitted: SubmissionId::NONE,
            completed: Arc::new(AtomicU64::new(0)),
            lost: Arc::new(AtomicBool::new(false)),
        })
    }

    fn gpu(&self) -> Result<&Gpu, BackendError> {
        self.gpu
            .as_ref()
            .ok_or_else(|| BackendError::new("device not open"))
    }

    fn configure(&mut self, extent: Extent2d) -> Result<SurfaceConfig, BackendError> {
        let gpu = self
            .gpu
            .as_ref()
            .ok_or_else(|| BackendError::new("device not open"))?;
        let surface = self
            .surface
            .as_ref()
            .ok_or_else(|| BackendError::new("surface destroyed"))?;
        let presentable = self
            .presentable
            .as_mut()
            .ok_or_else(|| BackendError::new("surface not created"))?;

        self.current = None;
        presentable.config.width = extent.width.max(1);
        presentable.config.height = extent.height.max(1);
        surface.configure(&gpu.device, &presentable.config);
        presentable.depth = create_depth_view(
            &gpu.device,
            presentable.config.width,
            presentable.config.height,
        );

        let format = from_wgpu_format(presentable.config.format)
            .ok_or_else(|| BackendError::new("surface format not representable"))?;
        Ok(SurfaceConfig {
            extent: Extent2d::new(presentable.config.width, presentable.config.height),
            format,
            image_count: FRAME_LATENCY + 1,
        })
    }

    fn create_object(gpu: &Gpu, descriptor: &ResourceDescriptor) -> GpuObject {
        let label = Some(descriptor.label.as_str());
        match descriptor.kind {
            ResourceKind::VertexBuffer | ResourceKind::IndexBuffer | ResourceKind::UniformBuffer => {
                let usage = match descriptor.kind {
                    ResourceKind::VertexBuffer => wgpu::BufferUsages::VERTEX,
                    ResourceKind::IndexBuffer => wgpu::BufferUsages::INDEX,
                    _ => wgpu::BufferUsages::UNIFORM,
                };
                GpuObject::Buffer(gpu.device.create_buffer(&wgpu::BufferDescriptor {
                    label,
                    size: descriptor.size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT),
                    usage: usage | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                }))
            }
            ResourceKind::Texture { extent, format } => {
                let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
                    label,
                    size: wgpu::Extent3d {
                        width: extent.width,
                        height: extent.height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: to_wgpu_format(format),
                    usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                    view_formats: &[],
                });
                let view = texture.create_view(&Default::default());
                GpuObject::Texture {
                    texture,
                    view,
                    extent,
                }
            }
            ResourceKind::Pipeline { target_format } => {
                GpuObject::Pipeline(create_pipeline(gpu, label, to_wgpu_format(target_format)))
            }
        }
    }

    fn ensure_bind_group(
        &mut self,
        uniforms: ResourceId,
        texture: ResourceId,
    ) -> Result<(), BackendError> {
        if self.bind_groups.contains_key(&(uniforms, texture)) {
            return Ok(());
        }
        let gpu = self
            .gpu
            .as_ref()
            .ok_or_else(|| BackendError::new("device not open"))?;
        let Some(GpuObject::Buffer(buffer)) = self.objects.get(&uniforms) else {
            return Err(BackendError::new(format!("{uniforms} is not a uniform buffer")));
        };
        let Some(GpuObject::Texture { view, .. }) = self.objects.get(&texture) else {
            return Err(BackendError::new(format!("{texture} is not a texture")));
        };
        let group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("heightfield_bind_group"),
            layout: &gpu.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&gpu.sampler),
                },
            ],
        });
        self.bind_groups.insert((uniforms, texture), group);
        Ok(())
    }

    fn encode(
        &self,
        view: &wgpu::TextureView,
        commands: &CommandList,
    ) -> Result<wgpu::CommandBuffer, BackendError> {
        let gpu = self.gpu()?;
        let depth = &self
            .presentable
            .as_ref()
            .ok_or_else(|| BackendError::new("surface not created"))?
            .depth;
        let [r, g, b, a] = commands.clear_color.map(f64::from);

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            for draw in &commands.draws {
                let missing = |id: ResourceId| BackendError::new(format!("command list uses freed {id}"));
                let Some(GpuObject::Pipeline(pipeline)) = self.objects.get(&draw.pipeline) else {
                    return Err(missing(draw.pipeline));
                };
                let Some(GpuObject::Buffer(vertices)) = self.objects.get(&draw.vertex_buffer)
                else {
                    return Err(missing(draw.vertex_buffer));
                };
                let Some(GpuObject::Buffer(indices)) = self.objects.get(&draw.index_buffer) else {
                    return Err(missing(draw.index_buffer));
                };
                let group = self
                    .bind_groups
                    .get(&(draw.uniforms, draw.texture))
                    .ok_or_else(|| missing(draw.uniforms))?;

                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, group, &[]);
                pass.set_vertex_buffer(0, vertices.slice(..));
                pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..draw.index_count, 0, 0..1);
            }
        }
        Ok(encoder.finish())
    }
}

impl DeviceBackend for WgpuBackend {
    fn name(&self) -> &str {
        "wgpu"
    }

    fn open_device(
        &mut self,
        _requirements: &DeviceRequirements,
    ) -> Result<DeviceCapabilities, BackendError> {
        let adapter = pollster::block_on(self.instance.request_adapter(
            &wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: self.surface.as_ref(),
                force_fallback_adapter: false,
            },
        ))
        .ok_or_else(|| BackendError::new("no compatible adapter"))?;

        let limits = wgpu::Limits::default().using_resolution(adapter.limits());
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("procgfx_device"),
                required_features: wgpu::Features::empty(),
                required_limits: limits.clone(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| BackendError::new(format!("request device: {e}")))?;

        let lost = Arc::clone(&self.lost);
        device.set_device_lost_callback(move |reason, message| {
            tracing::error!(?reason, %message, "wgpu device lost");
            lost.store(true, Ordering::Release);
        });

        let info = adapter.get_info();
        let formats = PROBED_FORMATS
            .into_iter()
            .filter(|f| {
                adapter
                    .get_texture_format_features(to_wgpu_format(*f))
                    .allowed_usages
                    .contains(wgpu::TextureUsages::TEXTURE_BINDING)
            })
            .collect();
        let capabilities = DeviceCapabilities {
            adapter_name: format!("{} ({})", info.name, info.backend.to_str()),
            formats,
            max_texture_dimension: limits.max_texture_dimension_2d,
            max_buffer_size: limits.max_buffer_size,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("heightfield_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("heightfield_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("heightfield_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::HEIGHTFIELD_SHADER.into()),
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("albedo_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        tracing::info!(
            adapter = %capabilities.adapter_name,
            max_texture = capabilities.max_texture_dimension,
            "wgpu device opened"
        );
        self.adapter = Some(adapter);
        self.gpu = Some(Gpu {
            device,
            queue,
            limits,
            bind_group_layout,
            pipeline_layout,
            shader,
            sampler,
        });
        Ok(capabilities)
    }

    fn create_surface(&mut self, request: &SurfaceRequest) -> Result<SurfaceConfig, BackendError> {
        let gpu = self.gpu()?;
        let adapter = self
            .adapter
            .as_ref()
            .ok_or_else(|| BackendError::new("device not open"))?;
        let surface = self
            .surface
            .as_ref()
            .ok_or_else(|| BackendError::new("surface destroyed"))?;

        let caps = surface.get_capabilities(adapter);
        let wanted = to_wgpu_format(request.format);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| *f == wanted)
            .or_else(|| {
                caps.formats
                    .iter()
                    .copied()
                    .find(|f| f.is_srgb() && from_wgpu_format(*f).is_some())
            })
            .or_else(|| caps.formats.iter().copied().find(|f| from_wgpu_format(*f).is_some()))
            .ok_or_else(|| BackendError::new("surface offers no usable format"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: request.extent.width.max(1),
            height: request.extent.height.max(1),
            present_mode: if request.vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: FRAME_LATENCY,
        };
        let depth = create_depth_view(&gpu.device, config.width, config.height);
        self.presentable = Some(Presentable { config, depth });
        self.configure(request.extent)
    }

    fn resize_surface(&mut self, extent: Extent2d) -> Result<SurfaceConfig, BackendError> {
        self.configure(extent)
    }

    fn destroy_surface(&mut self) {
        self.current = None;
        self.presentable = None;
        self.surface = None;
    }

    fn close_device(&mut self) {
        if !self.objects.is_empty() {
            tracing::error!(
                leaked = self.objects.len(),
                "wgpu device closed with live resources"
            );
        }
        self.bind_groups.clear();
        self.objects.clear();
        self.gpu = None;
        self.adapter = None;
    }

    fn wait_idle(&mut self) {
        if let Some(gpu) = &self.gpu {
            let _ = gpu.device.poll(wgpu::Maintain::Wait);
        }
        self.completed.fetch_max(self.submitted.0, Ordering::AcqRel);
    }
}

impl ResourceBackend for WgpuBackend {
    fn allocate(
        &mut self,
        id: ResourceId,
        descriptor: &ResourceDescriptor,
    ) -> Result<(), ResourceError> {
        let gpu = self.gpu().map_err(|e| ResourceError::Backend(e.to_string()))?;
        if descriptor.size > gpu.limits.max_buffer_size {
            return Err(ResourceError::OutOfMemory {
                requested: descriptor.size,
                limit: gpu.limits.max_buffer_size,
            });
        }

        gpu.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let object = Self::create_object(gpu, descriptor);
        let validation = pollster::block_on(gpu.device.pop_error_scope());
        let oom = pollster::block_on(gpu.device.pop_error_scope());
        if oom.is_some() {
            return Err(ResourceError::OutOfMemory {
                requested: descriptor.size,
                limit: gpu.limits.max_buffer_size,
            });
        }
        if let Some(e) = validation {
            return Err(ResourceError::Backend(e.to_string()));
        }

        self.objects.insert(id, object);
        Ok(())
    }

    fn write(&mut self, id: ResourceId, data: &[u8]) -> Result<(), ResourceError> {
        let gpu = self.gpu().map_err(|e| ResourceError::Backend(e.to_string()))?;
        match self.objects.get(&id) {
            Some(GpuObject::Buffer(buffer)) => {
                if data.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
                    return Err(ResourceError::Backend(format!(
                        "write of {} bytes to {id} is not 4-byte aligned",
                        data.len()
                    )));
                }
                gpu.queue.write_buffer(buffer, 0, data);
            }
            Some(GpuObject::Texture {
                texture, extent, ..
            }) => {
                gpu.queue.write_texture(
                    wgpu::TexelCopyTextureInfo {
                        texture,
                        mip_level: 0,
                        origin: wgpu::Origin3d::ZERO,
                        aspect: wgpu::TextureAspect::All,
                    },
                    data,
                    wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(extent.width * 4),
                        rows_per_image: Some(extent.height),
                    },
                    wgpu::Extent3d {
                        width: extent.width,
                        height: extent.height,
                        depth_or_array_layers: 1,
                    },
                );
            }
            Some(GpuObject::Pipeline(_)) => {
                return Err(ResourceError::Backend(format!("{id} is a pipeline")));
            }
            None => return Err(ResourceError::Backend(format!("write to unknown {id}"))),
        }
        Ok(())
    }

    fn free(&mut self, id: ResourceId) {
        if self.objects.remove(&id).is_none() {
            tracing::error!(%id, "free of unknown resource");
        }
        self.bind_groups
            .retain(|(uniforms, texture), _| *uniforms != id && *texture != id);
    }
}

impl FrameBackend for WgpuBackend {
    fn acquire_target(&mut self) -> Result<TargetImage, AcquireError> {
        if self.lost.load(Ordering::Acquire) {
            return Err(AcquireError::DeviceLost);
        }
        let surface = self.surface.as_ref().ok_or(AcquireError::Lost)?;
        let presentable = self.presentable.as_ref().ok_or(AcquireError::Lost)?;
        // A target acquired but never presented goes back to the swapchain.
        self.current = None;

        let texture = surface.get_current_texture().map_err(map_surface_error)?;
        let target = TargetImage {
            image_index: self.next_image,
            extent: Extent2d::new(presentable.config.width, presentable.config.height),
        };
        self.next_image = (self.next_image + 1) % (FRAME_LATENCY + 1);
        self.current = Some((target, texture));
        Ok(target)
    }

    fn submit(
        &mut self,
        target: &TargetImage,
        commands: &CommandList,
    ) -> Result<SubmissionId, BackendError> {
        for draw in &commands.draws {
            self.ensure_bind_group(draw.uniforms, draw.texture)?;
        }
        let view = match &self.current {
            Some((acquired, texture)) if acquired == target => {
                texture.texture.create_view(&Default::default())
            }
            _ => return Err("submit to a target that was not acquired".into()),
        };
        let buffer = self.encode(&view, commands)?;

        let gpu = self.gpu()?;
        gpu.queue.submit(std::iter::once(buffer));
        let id = self.submitted.next();
        let completed = Arc::clone(&self.completed);
        gpu.queue.on_submitted_work_done(move || {
            completed.fetch_max(id.0, Ordering::AcqRel);
        });
        let _ = gpu.device.poll(wgpu::Maintain::Poll);
        self.submitted = id;
        Ok(id)
    }

    fn present(&mut self, target: TargetImage) -> Result<(), BackendError> {
        match self.current.take() {
            Some((acquired, texture)) if acquired == target => {
                texture.present();
                Ok(())
            }
            _ => Err("present of a target that was not acquired".into()),
        }
    }

    fn completed_submission(&self) -> SubmissionId {
        SubmissionId(self.completed.load(Ordering::Acquire))
    }
}

fn create_pipeline(
    gpu: &Gpu,
    label: Option<&str>,
    target_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    gpu.device
        .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label,
            layout: Some(&gpu.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &gpu.shader,
                entry_point: Some(shaders::VS_ENTRY),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![
                        0 => Float32x3,
                        1 => Float32x3,
                        2 => Float32x2,
                    ],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &gpu.shader,
                entry_point: Some(shaders::FS_ENTRY),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        })
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&Default::default())
}
