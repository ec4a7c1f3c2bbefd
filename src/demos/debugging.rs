//! A spinning, back-face culled cube with every frame checked for GPU
//! errors.

use glam::{Mat4, Vec3};

use crate::config::DemoConfig;
use crate::controller::frame_loop::FrameContext;
use crate::demos::{self, DemoOptions, Transforms};
use crate::error::DemoError;
use crate::view::gpu_init::GpuContext;
use crate::view::mesh::{Mesh, MeshBuffer, Vertex};
use crate::view::render::{
    create_pipeline, create_shader, texture_bind_group, texture_bind_group_layout, Frame, PipelineSpec, Scene,
    Uniform,
};
use crate::view::texture::{load_texture_or_placeholder, ColorSpace};

const CLEAR: wgpu::Color = wgpu::Color::BLACK;
/// Degrees of rotation per timer unit.
pub const ROTATION_SPEED: f32 = 10.0;

/// Starts at 0.1 and advances by 0.1 before every read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinTimer {
    timer: f32,
}

impl Default for SpinTimer {
    fn default() -> Self {
        Self { timer: 0.1 }
    }
}

impl SpinTimer {
    /// Next rotation angle in degrees.
    pub fn next_angle(&mut self) -> f32 {
        self.timer += 0.1;
        self.timer * ROTATION_SPEED
    }
}

pub fn cube_model(angle_degrees: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(0.0, 0.0, -2.5))
        * Mat4::from_axis_angle(Vec3::ONE.normalize(), angle_degrees.to_radians())
}

pub struct DebuggingScene {
    pipeline: wgpu::RenderPipeline,
    uniform: Uniform<Transforms>,
    texture: wgpu::BindGroup,
    cube: MeshBuffer,
    spin: SpinTimer,
}

impl DebuggingScene {
    pub fn new(gpu: &GpuContext, config: &DemoConfig) -> Self {
        let device = &gpu.device;
        let uniform = Uniform::new(device, "debugging_transforms", wgpu::ShaderStages::VERTEX, &Transforms::default());
        let texture_layout = texture_bind_group_layout(device, "debugging_texture", wgpu::TextureViewDimension::D2);
        let wood = load_texture_or_placeholder(device, &gpu.queue, &config.assets.path("wood.png"), ColorSpace::Linear);

        let shader = create_shader(device, "debugging", include_str!("../shaders/debugging.wgsl"));
        let buffers = [Vertex::layout()];
        let layouts = [&uniform.layout, &texture_layout];
        let pipeline = create_pipeline(
            device,
            &PipelineSpec {
                cull_mode: Some(wgpu::Face::Back),
                ..PipelineSpec::new("debugging", &shader, &layouts, &buffers, gpu.format)
            },
        );

        Self {
            pipeline,
            texture: texture_bind_group(device, &texture_layout, &wood, "debugging_texture"),
            uniform,
            cube: Mesh::cube().upload(device, "cube"),
            spin: SpinTimer::default(),
        }
    }
}

impl Scene for DebuggingScene {
    fn render(&mut self, gpu: &GpuContext, frame: &mut Frame<'_>, ctx: &FrameContext<'_>) {
        let projection = Mat4::perspective_rh(45f32.to_radians(), ctx.aspect(), 0.1, 10.0);
        let model = cube_model(self.spin.next_angle());
        self.uniform
            .write(&gpu.queue, &Transforms::new(model, Mat4::IDENTITY, projection));

        let mut pass = frame.begin_pass("debugging", CLEAR);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.uniform.bind_group, &[]);
        pass.set_bind_group(1, &self.texture, &[]);
        self.cube.draw(&mut pass, 0..1);
    }
}

pub fn run(config: &DemoConfig) -> Result<(), DemoError> {
    let options = DemoOptions {
        error_checks: true,
        ..DemoOptions::default()
    };
    demos::run(config, options, DebuggingScene::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_advances_before_each_frame() {
        let mut spin = SpinTimer::default();
        assert!((spin.next_angle() - 2.0).abs() < 1e-5);
        assert!((spin.next_angle() - 3.0).abs() < 1e-5);
        for _ in 0..8 {
            spin.next_angle();
        }
        assert!((spin.next_angle() - 12.0).abs() < 1e-3);
    }

    #[test]
    fn cube_stays_in_front_of_the_viewer() {
        for angle in [0.0, 45.0, 90.0, 270.0] {
            let centre = cube_model(angle).transform_point3(Vec3::ZERO);
            assert_eq!(centre, Vec3::new(0.0, 0.0, -2.5));
        }
    }
}
