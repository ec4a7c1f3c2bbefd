//! One triangle with a colour per corner, interpolated across the face.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::config::DemoConfig;
use crate::controller::frame_loop::FrameContext;
use crate::demos::{self, DemoOptions};
use crate::error::DemoError;
use crate::view::gpu_init::GpuContext;
use crate::view::render::{create_pipeline, create_shader, Frame, PipelineSpec, Scene};

const CLEAR: wgpu::Color = wgpu::Color { r: 0.2, g: 0.3, b: 0.3, a: 1.0 };

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ColorVertex {
    pub pos: [f32; 3],
    pub color: [f32; 3],
}

impl ColorVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ColorVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

pub const TRIANGLE: [ColorVertex; 3] = [
    // bottom right, red
    ColorVertex { pos: [0.5, -0.5, 0.0], color: [1.0, 0.0, 0.0] },
    // bottom left, green
    ColorVertex { pos: [-0.5, -0.5, 0.0], color: [0.0, 1.0, 0.0] },
    // top, blue
    ColorVertex { pos: [0.0, 0.5, 0.0], color: [0.0, 0.0, 1.0] },
];

pub struct ShaderClassScene {
    pipeline: wgpu::RenderPipeline,
    vertices: wgpu::Buffer,
}

impl ShaderClassScene {
    pub fn new(gpu: &GpuContext) -> Self {
        let shader = create_shader(&gpu.device, "shader_class", include_str!("../shaders/shader_class.wgsl"));
        let buffers = [ColorVertex::layout()];
        let pipeline = create_pipeline(
            &gpu.device,
            &PipelineSpec::new("shader_class", &shader, &[], &buffers, gpu.format),
        );
        let vertices = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("triangle"),
            contents: bytemuck::cast_slice(&TRIANGLE),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self { pipeline, vertices }
    }
}

impl Scene for ShaderClassScene {
    fn render(&mut self, _gpu: &GpuContext, frame: &mut Frame<'_>, _ctx: &FrameContext<'_>) {
        let mut pass = frame.begin_pass("shader_class", CLEAR);
        pass.set_pipeline(&self.pipeline);
        pass.set_vertex_buffer(0, self.vertices.slice(..));
        pass.draw(0..TRIANGLE.len() as u32, 0..1);
    }
}

pub fn run(config: &DemoConfig) -> Result<(), DemoError> {
    demos::run(config, DemoOptions::default(), |gpu, _| ShaderClassScene::new(gpu))
}
