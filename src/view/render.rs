use std::marker::PhantomData;

use bytemuck::Pod;
use tracing::{debug, warn};
use wgpu::util::DeviceExt;

use crate::controller::frame_loop::{FrameContext, RenderTarget};
use crate::error::DemoError;
use crate::view::debug::ErrorCheck;
use crate::view::gpu_init::GpuContext;
use crate::view::texture::Texture;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
    let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
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
    let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());
    (depth_texture, depth_view)
}

pub fn create_shader(device: &wgpu::Device, label: &str, source: &str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

/// The knobs the lessons actually vary between pipelines.
pub struct PipelineSpec<'a> {
    pub label: &'a str,
    pub shader: &'a wgpu::ShaderModule,
    pub bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
    pub buffers: &'a [wgpu::VertexBufferLayout<'a>],
    pub color_format: wgpu::TextureFormat,
    pub cull_mode: Option<wgpu::Face>,
    pub depth_compare: wgpu::CompareFunction,
    pub depth_write: bool,
}

impl<'a> PipelineSpec<'a> {
    /// Opaque triangles, depth tested with `Less`, no culling.
    pub fn new(
        label: &'a str,
        shader: &'a wgpu::ShaderModule,
        bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
        buffers: &'a [wgpu::VertexBufferLayout<'a>],
        color_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            label,
            shader,
            bind_group_layouts,
            buffers,
            color_format,
            cull_mode: None,
            depth_compare: wgpu::CompareFunction::Less,
            depth_write: true,
        }
    }
}

pub fn create_pipeline(device: &wgpu::Device, spec: &PipelineSpec<'_>) -> wgpu::RenderPipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(spec.label),
        bind_group_layouts: spec.bind_group_layouts,
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(spec.label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: spec.shader,
            entry_point: Some("vs_main"),
            buffers: spec.buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: spec.shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: spec.color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: spec.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: spec.depth_write,
            depth_compare: spec.depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}

/// A uniform buffer of one `T` and the bind group exposing it at binding 0.
pub struct Uniform<T> {
    pub buffer: wgpu::Buffer,
    pub layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
    _marker: PhantomData<T>,
}

impl<T: Pod> Uniform<T> {
    pub fn new(device: &wgpu::Device, label: &str, visibility: wgpu::ShaderStages, initial: &T) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(initial),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self {
            buffer,
            layout,
            bind_group,
            _marker: PhantomData,
        }
    }

    pub fn write(&self, queue: &wgpu::Queue, value: &T) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(value));
    }
}

/// Texture at binding 0, its sampler at binding 1, fragment stage only.
pub fn texture_bind_group_layout(
    device: &wgpu::Device,
    label: &str,
    view_dimension: wgpu::TextureViewDimension,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension,
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
    })
}

pub fn texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture: &Texture,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&texture.sampler),
            },
        ],
    })
}

/// Encoder and attachments for the frame being recorded.
pub struct Frame<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color: &'a wgpu::TextureView,
    pub depth: &'a wgpu::TextureView,
}

impl Frame<'_> {
    /// Pass that clears colour to `clear` and depth to 1.
    pub fn begin_pass(&mut self, label: &str, clear: wgpu::Color) -> wgpu::RenderPass<'_> {
        self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: self.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }
}

/// What one lesson draws. Resources are created up front by the lesson
/// itself; `render` only updates uniforms and records passes.
pub trait Scene {
    fn render(&mut self, gpu: &GpuContext, frame: &mut Frame<'_>, ctx: &FrameContext<'_>);

    fn resize(&mut self, _gpu: &GpuContext, _width: u32, _height: u32) {}
}

/// Drives a [`Scene`] against the window surface.
pub struct GpuRenderer<S> {
    gpu: GpuContext,
    scene: S,
    depth: (wgpu::Texture, wgpu::TextureView),
    pending: Option<wgpu::SurfaceTexture>,
    error_check: Option<ErrorCheck>,
}

impl<S: Scene> GpuRenderer<S> {
    pub fn new(gpu: GpuContext, scene: S) -> Self {
        let (width, height) = gpu.size();
        let depth = create_depth_texture(&gpu.device, width, height);
        Self {
            gpu,
            scene,
            depth,
            pending: None,
            error_check: None,
        }
    }

    /// Capture and log GPU errors raised during each frame.
    pub fn with_error_checks(mut self) -> Self {
        self.error_check = Some(ErrorCheck::default());
        self
    }

    /// Next surface texture, or `None` when this frame should be skipped.
    fn acquire(&mut self) -> Result<Option<wgpu::SurfaceTexture>, DemoError> {
        match self.gpu.surface.get_current_texture() {
            Ok(frame) => Ok(Some(frame)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!("surface lost or outdated; reconfiguring");
                self.gpu.reconfigure();
                Ok(None)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("timed out waiting for a surface texture; skipping frame");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn draw(&mut self, ctx: &FrameContext<'_>) -> Result<(), DemoError> {
        let Some(surface_texture) = self.acquire()? else {
            return Ok(());
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("frame_encoder") });

        let mut frame = Frame {
            encoder: &mut encoder,
            color: &view,
            depth: &self.depth.1,
        };
        self.scene.render(&self.gpu, &mut frame, ctx);

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        self.pending = Some(surface_texture);
        Ok(())
    }
}

impl<S: Scene> RenderTarget for GpuRenderer<S> {
    fn render(&mut self, ctx: &FrameContext<'_>) -> Result<(), DemoError> {
        if let Some(check) = self.error_check.as_mut() {
            check.begin(&self.gpu.device);
        }
        let result = self.draw(ctx);
        if let Some(check) = self.error_check.as_mut() {
            check.end(&self.gpu.device, &format!("frame {}", ctx.frame_index()));
        }
        result
    }

    fn present(&mut self) -> Result<(), DemoError> {
        if let Some(surface_texture) = self.pending.take() {
            surface_texture.present();
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
        let (width, height) = self.gpu.size();
        self.depth = create_depth_texture(&self.gpu.device, width, height);
        self.scene.resize(&self.gpu, width, height);
    }
}
