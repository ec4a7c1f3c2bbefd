//! Demo settings. Every default is a compile-time constant; an optional TOML
//! file named by `DEMO_CONFIG` can override any subset of them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::controller::input::KeyBindings;
use crate::error::DemoError;
use crate::model::camera;

pub const CONFIG_ENV_VAR: &str = "DEMO_CONFIG";

pub const SCR_WIDTH: u32 = 640;
pub const SCR_HEIGHT: u32 = 480;
/// ~62.5 Hz
pub const TARGET_FRAME_MS: u64 = 16;
/// Pointer units applied per frame while an arrow key is held.
pub const LOOK_STEP: f32 = 10.0;
/// Zoom change per wheel notch, in degrees.
pub const SCROLL_STEP: f32 = 2.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DemoConfig {
    pub window: WindowConfig,
    pub timing: TimingConfig,
    pub camera: CameraConfig,
    pub controls: KeyBindings,
    pub graphics: GraphicsConfig,
    pub assets: AssetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "LearnOpenGL".to_string(),
            width: SCR_WIDTH,
            height: SCR_HEIGHT,
        }
    }
}

/// How many queued input events one loop iteration consumes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventPolling {
    /// At most one event per iteration; the rest wait for later frames.
    OnePerFrame,
    #[default]
    DrainAll,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    pub target_frame_ms: u64,
    pub event_polling: EventPolling,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            target_frame_ms: TARGET_FRAME_MS,
            event_polling: EventPolling::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// World units per millisecond of frame time.
    pub movement_speed: f32,
    /// Degrees per pointer pixel.
    pub mouse_sensitivity: f32,
    pub look_step: f32,
    pub scroll_step: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            movement_speed: camera::SPEED,
            mouse_sensitivity: camera::SENSITIVITY,
            look_step: LOOK_STEP,
            scroll_step: SCROLL_STEP,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct GraphicsConfig {
    /// Request backend validation and debug labels.
    pub debug: bool,
    /// Let the surface encode sRGB on write. Off by default so shaders see
    /// a linear framebuffer and do their own gamma.
    pub srgb_surface: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssetConfig {
    pub root: PathBuf,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self { root: PathBuf::from("resources") }
    }
}

impl AssetConfig {
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }
}

impl DemoConfig {
    /// Load options from a TOML file. Missing fields use defaults.
    pub fn load(path: &Path) -> Result<Self, DemoError> {
        let content = std::fs::read_to_string(path).map_err(|source| DemoError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| DemoError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults, or the file named by `DEMO_CONFIG` when it is set.
    pub fn from_env() -> Result<Self, DemoError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }
}
