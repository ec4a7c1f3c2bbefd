//! Blinn-Phong floor lit by four lights, with Space switching between a
//! linear workflow (sRGB texture, inverse-square falloff, gamma encoded
//! output) and the naive one.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use tracing::{info, warn};

use crate::config::DemoConfig;
use crate::controller::frame_loop::FrameContext;
use crate::demos::{self, DemoOptions};
use crate::error::DemoError;
use crate::model::state::Controls;
use crate::view::gpu_init::GpuContext;
use crate::view::mesh::{Mesh, MeshBuffer, Vertex};
use crate::view::render::{
    create_pipeline, create_shader, texture_bind_group, texture_bind_group_layout, Frame, PipelineSpec, Scene,
    Uniform,
};
use crate::view::texture::{decode_image, ColorSpace, Texture};

const CLEAR: wgpu::Color = wgpu::Color { r: 0.1, g: 0.1, b: 0.1, a: 1.0 };

pub const LIGHT_POSITIONS: [Vec3; 4] = [
    Vec3::new(-3.0, 0.0, 0.0),
    Vec3::new(-1.0, 0.0, 0.0),
    Vec3::new(1.0, 0.0, 0.0),
    Vec3::new(3.0, 0.0, 0.0),
];
pub const LIGHT_INTENSITIES: [f32; 4] = [0.25, 0.5, 0.75, 1.0];

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GammaUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub light_positions: [[f32; 4]; 4],
    pub light_colors: [[f32; 4]; 4],
    pub view_pos: [f32; 4],
    pub gamma: u32,
    pub _pad: [u32; 3],
}

impl GammaUniform {
    pub fn new(view: Mat4, projection: Mat4, view_pos: Vec3, gamma: bool) -> Self {
        Self {
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            light_positions: LIGHT_POSITIONS.map(|p| p.extend(1.0).to_array()),
            light_colors: LIGHT_INTENSITIES.map(|i| [i, i, i, 1.0]),
            view_pos: view_pos.extend(1.0).to_array(),
            gamma: u32::from(gamma),
            _pad: [0; 3],
        }
    }
}

pub struct GammaCorrectionScene {
    pipeline: wgpu::RenderPipeline,
    uniform: Uniform<GammaUniform>,
    floor: MeshBuffer,
    linear_texture: wgpu::BindGroup,
    srgb_texture: wgpu::BindGroup,
    gamma_shown: Option<bool>,
}

impl GammaCorrectionScene {
    pub fn new(gpu: &GpuContext, config: &DemoConfig) -> Self {
        let device = &gpu.device;
        let uniform = Uniform::new(
            device,
            "gamma_uniform",
            wgpu::ShaderStages::VERTEX_FRAGMENT,
            &GammaUniform::new(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO, false),
        );
        let texture_layout = texture_bind_group_layout(device, "floor_texture", wgpu::TextureViewDimension::D2);

        // Same file uploaded twice: once read as-is, once decoded from sRGB
        let path = config.assets.path("wood.png");
        let (linear, srgb) = match decode_image(&path) {
            Ok(image) => (
                Texture::from_image(device, &gpu.queue, &image, ColorSpace::Linear, "wood_linear"),
                Texture::from_image(device, &gpu.queue, &image, ColorSpace::Srgb, "wood_srgb"),
            ),
            Err(err) => {
                warn!("{err}; using placeholder texture");
                (
                    Texture::placeholder(device, &gpu.queue, ColorSpace::Linear),
                    Texture::placeholder(device, &gpu.queue, ColorSpace::Srgb),
                )
            }
        };
        let linear_texture = texture_bind_group(device, &texture_layout, &linear, "wood_linear");
        let srgb_texture = texture_bind_group(device, &texture_layout, &srgb, "wood_srgb");

        let shader = create_shader(device, "gamma_correction", include_str!("../shaders/gamma_correction.wgsl"));
        let buffers = [Vertex::layout()];
        let layouts = [&uniform.layout, &texture_layout];
        let pipeline = create_pipeline(
            device,
            &PipelineSpec::new("gamma_correction", &shader, &layouts, &buffers, gpu.format),
        );

        Self {
            pipeline,
            uniform,
            floor: Mesh::plane(10.0, -0.5, 10.0).upload(device, "floor"),
            linear_texture,
            srgb_texture,
            gamma_shown: None,
        }
    }
}

impl Scene for GammaCorrectionScene {
    fn render(&mut self, gpu: &GpuContext, frame: &mut Frame<'_>, ctx: &FrameContext<'_>) {
        let gamma = ctx.toggle_enabled();
        if self.gamma_shown != Some(gamma) {
            info!("{}", if gamma { "Gamma enabled" } else { "Gamma disabled" });
            self.gamma_shown = Some(gamma);
        }

        self.uniform.write(
            &gpu.queue,
            &GammaUniform::new(ctx.view(), ctx.projection(0.1, 100.0), ctx.camera().position, gamma),
        );

        let texture = if gamma { &self.srgb_texture } else { &self.linear_texture };
        let mut pass = frame.begin_pass("gamma_correction", CLEAR);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.uniform.bind_group, &[]);
        pass.set_bind_group(1, texture, &[]);
        self.floor.draw(&mut pass, 0..1);
    }
}

pub fn run(config: &DemoConfig) -> Result<(), DemoError> {
    let options = DemoOptions {
        controls: Controls::FREE_FLY_WITH_TOGGLE,
        ..DemoOptions::default()
    };
    demos::run(config, options, GammaCorrectionScene::new)
}
