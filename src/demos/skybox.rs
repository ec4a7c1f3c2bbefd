//! A textured crate inside a cubemap skybox. The skybox is drawn last at
//! the far plane so only uncovered pixels pay for it.

use std::path::PathBuf;

use glam::{Mat3, Mat4, Vec3};
use tracing::warn;

use crate::config::DemoConfig;
use crate::controller::frame_loop::FrameContext;
use crate::demos::{self, DemoOptions, Transforms};
use crate::error::DemoError;
use crate::model::state::Controls;
use crate::view::gpu_init::GpuContext;
use crate::view::mesh::{Mesh, MeshBuffer, Vertex};
use crate::view::render::{
    create_pipeline, create_shader, texture_bind_group, texture_bind_group_layout, Frame, PipelineSpec, Scene,
    Uniform,
};
use crate::view::texture::{load_cubemap, load_texture_or_placeholder, ColorSpace, Texture};

const CLEAR: wgpu::Color = wgpu::Color { r: 0.1, g: 0.1, b: 0.1, a: 1.0 };

/// Face files in +X, -X, +Y, -Y, +Z, -Z order.
pub const SKYBOX_FACES: [&str; 6] = ["right.jpg", "left.jpg", "top.jpg", "bottom.jpg", "front.jpg", "back.jpg"];

pub fn face_paths(config: &DemoConfig) -> Vec<PathBuf> {
    SKYBOX_FACES
        .iter()
        .map(|face| config.assets.path("skybox").join(face))
        .collect()
}

/// View matrix with the translation removed, so the sky never gets closer.
pub fn skybox_view(view: Mat4) -> Mat4 {
    Mat4::from_mat3(Mat3::from_mat4(view))
}

pub struct SkyboxScene {
    cube_pipeline: wgpu::RenderPipeline,
    sky_pipeline: wgpu::RenderPipeline,
    cube_uniform: Uniform<Transforms>,
    sky_uniform: Uniform<Transforms>,
    cube_texture: wgpu::BindGroup,
    sky_texture: wgpu::BindGroup,
    cube: MeshBuffer,
}

impl SkyboxScene {
    pub fn new(gpu: &GpuContext, config: &DemoConfig) -> Self {
        let device = &gpu.device;
        let cube_uniform = Uniform::new(device, "cube_transforms", wgpu::ShaderStages::VERTEX, &Transforms::default());
        let sky_uniform = Uniform::new(device, "sky_transforms", wgpu::ShaderStages::VERTEX, &Transforms::default());

        let crate_texture = load_texture_or_placeholder(
            device,
            &gpu.queue,
            &config.assets.path("container.jpg"),
            ColorSpace::Linear,
        );
        let cubemap = load_cubemap(device, &gpu.queue, &face_paths(config)).unwrap_or_else(|err| {
            warn!("{err}; using placeholder cubemap");
            Texture::placeholder_cubemap(device, &gpu.queue)
        });

        let flat_layout = texture_bind_group_layout(device, "cube_texture", wgpu::TextureViewDimension::D2);
        let cube_layout = texture_bind_group_layout(device, "skybox_texture", wgpu::TextureViewDimension::Cube);
        let cube_texture = texture_bind_group(device, &flat_layout, &crate_texture, "cube_texture");
        let sky_texture = texture_bind_group(device, &cube_layout, &cubemap, "skybox_texture");

        let buffers = [Vertex::layout()];

        let cube_shader = create_shader(device, "cubemaps", include_str!("../shaders/cubemaps.wgsl"));
        let cube_layouts = [&cube_uniform.layout, &flat_layout];
        let cube_pipeline = create_pipeline(
            device,
            &PipelineSpec::new("cube", &cube_shader, &cube_layouts, &buffers, gpu.format),
        );

        let sky_shader = create_shader(device, "skybox", include_str!("../shaders/skybox.wgsl"));
        let sky_layouts = [&sky_uniform.layout, &cube_layout];
        let sky_pipeline = create_pipeline(
            device,
            &PipelineSpec {
                // Passes where the depth buffer still holds the cleared 1.0
                depth_compare: wgpu::CompareFunction::LessEqual,
                depth_write: false,
                ..PipelineSpec::new("skybox", &sky_shader, &sky_layouts, &buffers, gpu.format)
            },
        );

        Self {
            cube_pipeline,
            sky_pipeline,
            cube_uniform,
            sky_uniform,
            cube_texture,
            sky_texture,
            cube: Mesh::cube().upload(device, "cube"),
        }
    }
}

impl Scene for SkyboxScene {
    fn render(&mut self, gpu: &GpuContext, frame: &mut Frame<'_>, ctx: &FrameContext<'_>) {
        let view = ctx.view();
        let projection = ctx.projection(0.1, 100.0);
        self.cube_uniform
            .write(&gpu.queue, &Transforms::new(Mat4::IDENTITY, view, projection));
        self.sky_uniform
            .write(&gpu.queue, &Transforms::new(Mat4::IDENTITY, skybox_view(view), projection));

        let mut pass = frame.begin_pass("skybox", CLEAR);
        pass.set_pipeline(&self.cube_pipeline);
        pass.set_bind_group(0, &self.cube_uniform.bind_group, &[]);
        pass.set_bind_group(1, &self.cube_texture, &[]);
        self.cube.draw(&mut pass, 0..1);

        pass.set_pipeline(&self.sky_pipeline);
        pass.set_bind_group(0, &self.sky_uniform.bind_group, &[]);
        pass.set_bind_group(1, &self.sky_texture, &[]);
        self.cube.draw(&mut pass, 0..1);
    }
}

pub fn run(config: &DemoConfig) -> Result<(), DemoError> {
    let options = DemoOptions {
        camera_position: Vec3::new(0.0, 0.0, 3.0),
        controls: Controls::FREE_FLY,
        ..DemoOptions::default()
    };
    demos::run(config, options, SkyboxScene::new)
}
