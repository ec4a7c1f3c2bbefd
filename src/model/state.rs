use glam::Vec3;

use crate::config::DemoConfig;
use crate::model::camera::Camera;

/// Edge-triggered on/off switch driven by a level-sampled key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Toggle {
    pub enabled: bool,
    latched: bool,
}

impl Toggle {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, latched: false }
    }

    /// Feed this frame's key level. Returns true on the frame the state flips.
    pub fn update(&mut self, key_down: bool) -> bool {
        if !key_down {
            self.latched = false;
            return false;
        }
        if self.latched {
            return false;
        }
        self.latched = true;
        self.enabled = !self.enabled;
        true
    }
}

/// Turns absolute pointer positions into offsets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseTracker {
    pub last_x: f32,
    pub last_y: f32,
    first_mouse: bool,
}

impl MouseTracker {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            last_x: width as f32 / 2.0,
            last_y: height as f32 / 2.0,
            first_mouse: true,
        }
    }

    /// Offset since the previous sample, y reversed so up is positive.
    /// The first sample after a reset only records the position.
    pub fn offset(&mut self, x: f32, y: f32) -> (f32, f32) {
        if self.first_mouse {
            self.last_x = x;
            self.last_y = y;
            self.first_mouse = false;
        }
        let dx = x - self.last_x;
        let dy = self.last_y - y;
        self.last_x = x;
        self.last_y = y;
        (dx, dy)
    }

    pub fn reset(&mut self) {
        self.first_mouse = true;
    }
}

/// Which per-frame key handling a demo opts into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    /// WASD movement, arrow-key look, pointer look and wheel zoom.
    pub free_fly: bool,
    /// Drive `DemoState::toggle` from the toggle binding.
    pub toggle: bool,
}

impl Controls {
    pub const NONE: Controls = Controls { free_fly: false, toggle: false };
    pub const FREE_FLY: Controls = Controls { free_fly: true, toggle: false };
    pub const FREE_FLY_WITH_TOGGLE: Controls = Controls { free_fly: true, toggle: true };
}

/// Everything one running demo mutates between frames.
#[derive(Debug, Clone)]
pub struct DemoState {
    pub camera: Camera,
    pub mouse: MouseTracker,
    pub toggle: Toggle,
    pub controls: Controls,
    pub running: bool,
    pub width: u32,
    pub height: u32,
    pub frame_index: u64,
}

impl DemoState {
    pub fn new(config: &DemoConfig, camera_position: Vec3, controls: Controls) -> Self {
        let camera = Camera::new(camera_position)
            .with_speed(config.camera.movement_speed, config.camera.mouse_sensitivity);
        Self {
            camera,
            mouse: MouseTracker::new(config.window.width, config.window.height),
            toggle: Toggle::default(),
            controls,
            running: true,
            width: config.window.width,
            height: config.window.height,
            frame_index: 0,
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}
