//! The lessons, plus the start-up sequence they all share.

pub mod asteroid_field;
pub mod debugging;
pub mod gamma_correction;
pub mod shader_class;
pub mod skybox;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use tracing::{error, info};

use crate::config::DemoConfig;
use crate::controller::frame_loop::FrameDriver;
use crate::error::DemoError;
use crate::model::clock::SystemClock;
use crate::model::state::{Controls, DemoState};
use crate::view::gpu_init::GpuContext;
use crate::view::render::{GpuRenderer, Scene};
use crate::view::window::WindowHost;

/// Model, view and projection as laid out in the lesson shaders.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Transforms {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
}

impl Transforms {
    pub fn new(model: Mat4, view: Mat4, projection: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
        }
    }
}

impl Default for Transforms {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY)
    }
}

/// Per-lesson choices the shared runner needs.
#[derive(Debug, Clone, Copy)]
pub struct DemoOptions {
    pub camera_position: Vec3,
    pub controls: Controls,
    /// Wrap every frame in a GPU error scope.
    pub error_checks: bool,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            camera_position: Vec3::new(0.0, 0.0, 3.0),
            controls: Controls::NONE,
            error_checks: false,
        }
    }
}

/// Window, GPU, scene, loop. Returns once the user quits.
pub fn run<S, F>(config: &DemoConfig, options: DemoOptions, build: F) -> Result<(), DemoError>
where
    S: Scene,
    F: FnOnce(&GpuContext, &DemoConfig) -> S,
{
    let mut host = WindowHost::open(config)?;
    let gpu = GpuContext::new(host.window(), &config.graphics)?;

    let mut state = DemoState::new(config, options.camera_position, options.controls);
    // The surface is sized in physical pixels, which can differ from the
    // logical size requested in the config
    (state.width, state.height) = gpu.size();

    let scene = build(&gpu, config);
    let mut renderer = GpuRenderer::new(gpu, scene);
    if options.error_checks {
        renderer = renderer.with_error_checks();
    }

    let mut driver = FrameDriver::new(config);
    driver.run(&mut state, &mut host, &SystemClock::new(), &mut renderer)
}

/// Binary entry point: set up logging and config, run the lesson and exit
/// with -1 on any failure.
pub fn launch(name: &str, lesson: fn(&DemoConfig) -> Result<(), DemoError>) {
    crate::logging::init(name);
    info!(demo = name, "starting");

    let result = DemoConfig::from_env().and_then(|config| lesson(&config));
    match result {
        Ok(()) => info!(demo = name, "exited"),
        Err(err) => {
            // Startup and run failures exit the same way; only the log differs
            error!(demo = name, init = err.is_init_failure(), "{err}");
            std::process::exit(-1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transforms_match_three_mat4_uniform() {
        assert_eq!(std::mem::size_of::<Transforms>(), 192);
        let t = Transforms::new(Mat4::from_translation(Vec3::X), Mat4::IDENTITY, Mat4::IDENTITY);
        assert_eq!(t.model[3], [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn default_options_are_a_fixed_camera() {
        let options = DemoOptions::default();
        assert_eq!(options.controls, Controls::NONE);
        assert!(!options.error_checks);
    }
}
