use std::sync::Arc;

use winit::window::Window;

use crate::accumulation::TargetAllocator;
use crate::error::{Result, TracewError};
use crate::frame_loop::{RenderBackend, TraceUniforms};
use crate::scene::{Scene, SceneBuffer};

// 32-bit float per channel so thousands of averaged frames do not band.
const ACCUMULATION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// One ping-pong target plus the bind groups that read it.
pub struct AccumulationTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    // Trace program reading this target as the previous frame.
    history_bind_group: wgpu::BindGroup,
    // Display program copying this target to the surface.
    display_bind_group: wgpu::BindGroup,
}

// ======================================
// === WINDOW STATE ===
// ======================================

pub struct GpuBackend {
    pub window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    trace_pipeline: wgpu::RenderPipeline,
    display_pipeline: wgpu::RenderPipeline,
    trace_layout: wgpu::BindGroupLayout,
    display_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    scene_buffer: wgpu::Buffer,
}

impl GpuBackend {
    pub fn new(window: Arc<Window>, present_mode: wgpu::PresentMode) -> Result<Self> {
        pollster::block_on(Self::new_async(window, present_mode))
    }

    async fn new_async(window: Arc<Window>, present_mode: wgpu::PresentMode) -> Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Selected GPU: {} ({:?}, {:?})",
            adapter_info.name,
            adapter_info.device_type,
            adapter_info.backend
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("tracew device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await?;

        let caps = surface.get_capabilities(&adapter);
        // The trace output is shown as-is, so skip formats that re-encode to sRGB.
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(TracewError::UnsupportedSurface)?;

        let present_mode = if caps.present_modes.contains(&present_mode) {
            present_mode
        } else {
            log::warn!("Present mode {:?} unsupported, falling back to Fifo", present_mode);
            wgpu::PresentMode::Fifo
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::info!("Surface configured: {}x{} {:?}", config.width, config.height, surface_format);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Trace Uniform Buffer"),
            size: std::mem::size_of::<TraceUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let scene_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Buffer"),
            size: std::mem::size_of::<SceneBuffer>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let trace_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Trace Bind Group Layout"),
            entries: &[
                uniform_entry(0),
                uniform_entry(1),
                history_texture_entry(2),
            ],
        });

        let display_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Display Bind Group Layout"),
            entries: &[history_texture_entry(0)],
        });

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let trace_module = device.create_shader_module(wgpu::include_wgsl!("shaders/trace.wgsl"));
        let trace_pipeline = create_fullscreen_pipeline(
            &device,
            "Trace Pipeline",
            &trace_module,
            &trace_layout,
            ACCUMULATION_FORMAT,
            None, // Float32 targets are not blendable
        );
        if let Some(err) = device.pop_error_scope().await {
            return Err(TracewError::Shader {
                label: "trace",
                message: err.to_string(),
            });
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let display_module = device.create_shader_module(wgpu::include_wgsl!("shaders/display.wgsl"));
        let display_pipeline = create_fullscreen_pipeline(
            &device,
            "Display Pipeline",
            &display_module,
            &display_layout,
            surface_format,
            Some(wgpu::BlendState::REPLACE),
        );
        if let Some(err) = device.pop_error_scope().await {
            return Err(TracewError::Shader {
                label: "display",
                message: err.to_string(),
            });
        }

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            trace_pipeline,
            display_pipeline,
            trace_layout,
            display_layout,
            uniform_buffer,
            scene_buffer,
        })
    }

    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }

    fn clear_pass<'e>(encoder: &'e mut wgpu::CommandEncoder, label: &str, view: &wgpu::TextureView) -> wgpu::RenderPass<'e> {
        encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            })
    }
}

impl TargetAllocator for GpuBackend {
    type Target = AccumulationTarget;

    fn create_target(&mut self, label: &str, width: u32, height: u32) -> Result<AccumulationTarget> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: ACCUMULATION_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let history_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.trace_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.scene_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
            ],
        });

        let display_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.display_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            }],
        });

        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            log::error!("{label} rejected by the device: {err}");
            return Err(TracewError::IncompleteTarget {
                label: label.to_string(),
                message: err.to_string(),
            });
        }

        Ok(AccumulationTarget {
            texture,
            view,
            history_bind_group,
            display_bind_group,
        })
    }

    fn clear_target(&mut self, target: &AccumulationTarget) {
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Accumulation Clear Encoder"),
        });
        drop(Self::clear_pass(&mut encoder, "Accumulation Clear Pass", &target.view));
        self.queue.submit([encoder.finish()]);
    }
}

impl RenderBackend for GpuBackend {
    type Error = wgpu::SurfaceError;

    fn trace(&mut self, uniforms: &TraceUniforms, scene: &Scene, history: &AccumulationTarget, output: &AccumulationTarget) {
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
        self.queue
            .write_buffer(&self.scene_buffer, 0, bytemuck::bytes_of(&scene.to_gpu()));

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Trace Encoder"),
        });
        {
            let mut pass = Self::clear_pass(&mut encoder, "Trace Pass", &output.view);
            pass.set_pipeline(&self.trace_pipeline);
            pass.set_bind_group(0, &history.history_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        self.queue.submit([encoder.finish()]);
    }

    fn present(&mut self, source: &AccumulationTarget) -> std::result::Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Display Encoder"),
        });
        {
            let mut pass = Self::clear_pass(&mut encoder, "Display Pass", &view);
            pass.set_pipeline(&self.display_pipeline);
            pass.set_bind_group(0, &source.display_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        self.queue.submit([encoder.finish()]);
        self.window.pre_present_notify();
        output.present();
        Ok(())
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.reconfigure();
        log::info!("Surface resized to {}x{}", self.config.width, self.config.height);
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

// Read with textureLoad only, so the float format need not be filterable.
fn history_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn create_fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    module: &wgpu::ShaderModule,
    bind_group_layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
) -> wgpu::RenderPipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
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
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}
