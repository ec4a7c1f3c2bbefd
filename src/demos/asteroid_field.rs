//! A planet circled by a thousand rocks. All rocks share one mesh and are
//! drawn with a single instanced call.

use std::f32::consts::TAU;
use std::time::{SystemTime, UNIX_EPOCH};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};
use wgpu::util::DeviceExt;

use crate::config::DemoConfig;
use crate::controller::frame_loop::FrameContext;
use crate::demos::{self, DemoOptions};
use crate::error::DemoError;
use crate::model::state::Controls;
use crate::view::gpu_init::GpuContext;
use crate::view::mesh::{load_model, Mesh, MeshBuffer, Vertex};
use crate::view::render::{
    create_pipeline, create_shader, texture_bind_group, texture_bind_group_layout, Frame, PipelineSpec, Scene,
    Uniform,
};
use crate::view::texture::{ColorSpace, Texture};

const CLEAR: wgpu::Color = wgpu::Color { r: 0.1, g: 0.1, b: 0.1, a: 1.0 };

pub const ROCK_COUNT: usize = 1000;
pub const RING_RADIUS: f32 = 50.0;
pub const RING_OFFSET: f32 = 2.5;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
}

/// Per-instance model matrix, fed as four vec4 attributes.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
}

impl InstanceRaw {
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] =
        wgpu::vertex_attr_array![3 => Float32x4, 4 => Float32x4, 5 => Float32x4, 6 => Float32x4];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

impl From<Mat4> for InstanceRaw {
    fn from(model: Mat4) -> Self {
        Self { model: model.to_cols_array_2d() }
    }
}

/// Uniform offset in `[-offset, offset)`, in hundredths.
fn displacement<R: Rng>(rng: &mut R, offset: f32) -> f32 {
    let span = (2.0 * offset * 100.0) as i32;
    rng.random_range(0..span.max(1)) as f32 / 100.0 - offset
}

/// Model matrices for `amount` rocks scattered around a ring in the XZ
/// plane: jittered position (flattened in Y), random scale in
/// [0.05, 0.25) and a random spin about a fixed tilted axis.
pub fn asteroid_transforms<R: Rng>(amount: usize, radius: f32, offset: f32, rng: &mut R) -> Vec<Mat4> {
    let axis = Vec3::new(0.4, 0.6, 0.8).normalize();
    (0..amount)
        .map(|i| {
            let angle = i as f32 / amount as f32 * TAU;
            let x = angle.sin() * radius + displacement(rng, offset);
            let y = displacement(rng, offset) * 0.4;
            let z = angle.cos() * radius + displacement(rng, offset);
            let scale = rng.random_range(0..20u32) as f32 / 100.0 + 0.05;
            let rotation = (rng.random_range(0..360u32) as f32).to_radians();

            Mat4::from_translation(Vec3::new(x, y, z))
                * Mat4::from_scale(Vec3::splat(scale))
                * Mat4::from_axis_angle(axis, rotation)
        })
        .collect()
}

pub fn planet_transform() -> Mat4 {
    Mat4::from_translation(Vec3::new(0.0, -3.0, 0.0)) * Mat4::from_scale(Vec3::splat(4.0))
}

/// Mesh and texture of one model, with sphere and checkerboard stand-ins.
struct LoadedModel {
    mesh: MeshBuffer,
    texture: Texture,
}

fn load_or_sphere(gpu: &GpuContext, config: &DemoConfig, relative: &str) -> LoadedModel {
    let path = config.assets.path(relative);
    let (mesh, image) = match load_model(&path) {
        Ok(model) => (model.mesh, model.base_color),
        Err(err) => {
            warn!("{err}; using a sphere instead");
            (Mesh::uv_sphere(1.0, 32, 16), None)
        }
    };
    let texture = match image {
        Some(image) => Texture::from_image(&gpu.device, &gpu.queue, &image, ColorSpace::Linear, relative),
        None => Texture::placeholder(&gpu.device, &gpu.queue, ColorSpace::Linear),
    };
    LoadedModel {
        mesh: mesh.upload(&gpu.device, relative),
        texture,
    }
}

pub struct AsteroidFieldScene {
    pipeline: wgpu::RenderPipeline,
    camera: Uniform<CameraUniform>,
    planet: MeshBuffer,
    planet_texture: wgpu::BindGroup,
    planet_instance: wgpu::Buffer,
    rock: MeshBuffer,
    rock_texture: wgpu::BindGroup,
    rock_instances: wgpu::Buffer,
    rock_count: u32,
}

impl AsteroidFieldScene {
    pub fn new(gpu: &GpuContext, config: &DemoConfig) -> Self {
        let device = &gpu.device;
        let identity = CameraUniform {
            view: Mat4::IDENTITY.to_cols_array_2d(),
            projection: Mat4::IDENTITY.to_cols_array_2d(),
        };
        let camera = Uniform::new(device, "camera", wgpu::ShaderStages::VERTEX, &identity);
        let texture_layout = texture_bind_group_layout(device, "diffuse", wgpu::TextureViewDimension::D2);

        let rock = load_or_sphere(gpu, config, "rock/rock.gltf");
        let planet = load_or_sphere(gpu, config, "planet/planet.gltf");

        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let mut rng = StdRng::seed_from_u64(seed);
        let rocks: Vec<InstanceRaw> = asteroid_transforms(ROCK_COUNT, RING_RADIUS, RING_OFFSET, &mut rng)
            .into_iter()
            .map(InstanceRaw::from)
            .collect();
        info!(rocks = rocks.len(), seed, "asteroid ring generated");

        let rock_instances = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("rock_instances"),
            contents: bytemuck::cast_slice(&rocks),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let planet_instance = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("planet_instance"),
            contents: bytemuck::bytes_of(&InstanceRaw::from(planet_transform())),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let shader = create_shader(device, "instancing", include_str!("../shaders/instancing.wgsl"));
        let buffers = [Vertex::layout(), InstanceRaw::layout()];
        let layouts = [&camera.layout, &texture_layout];
        let pipeline = create_pipeline(
            device,
            &PipelineSpec::new("instancing", &shader, &layouts, &buffers, gpu.format),
        );

        Self {
            pipeline,
            planet_texture: texture_bind_group(device, &texture_layout, &planet.texture, "planet"),
            rock_texture: texture_bind_group(device, &texture_layout, &rock.texture, "rock"),
            camera,
            planet: planet.mesh,
            planet_instance,
            rock: rock.mesh,
            rock_instances,
            rock_count: rocks.len() as u32,
        }
    }
}

impl Scene for AsteroidFieldScene {
    fn render(&mut self, gpu: &GpuContext, frame: &mut Frame<'_>, ctx: &FrameContext<'_>) {
        let projection = Mat4::perspective_rh(45f32.to_radians(), ctx.aspect(), 0.1, 1000.0);
        self.camera.write(
            &gpu.queue,
            &CameraUniform {
                view: ctx.view().to_cols_array_2d(),
                projection: projection.to_cols_array_2d(),
            },
        );

        let mut pass = frame.begin_pass("asteroid_field", CLEAR);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.camera.bind_group, &[]);

        pass.set_bind_group(1, &self.planet_texture, &[]);
        pass.set_vertex_buffer(1, self.planet_instance.slice(..));
        self.planet.draw(&mut pass, 0..1);

        pass.set_bind_group(1, &self.rock_texture, &[]);
        pass.set_vertex_buffer(1, self.rock_instances.slice(..));
        self.rock.draw(&mut pass, 0..self.rock_count);
    }
}

pub fn run(config: &DemoConfig) -> Result<(), DemoError> {
    let options = DemoOptions {
        camera_position: Vec3::new(0.0, 0.0, 55.0),
        controls: Controls::FREE_FLY,
        ..DemoOptions::default()
    };
    demos::run(config, options, AsteroidFieldScene::new)
}
