use glam::{Mat4, Vec3};

pub const YAW: f32 = -90.0;
pub const PITCH: f32 = 0.0;
/// World units per millisecond.
pub const SPEED: f32 = 0.0025;
pub const SENSITIVITY: f32 = 0.1;
pub const ZOOM: f32 = 45.0;

pub const PITCH_LIMIT: f32 = 89.0;
pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 45.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Forward,
    Backward,
    Left,
    Right,
}

/// Free-fly camera: a position plus yaw/pitch in degrees, no fixed target.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub front: Vec3,
    pub up: Vec3,
    pub right: Vec3,
    pub world_up: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    /// Vertical field of view in degrees.
    pub zoom: f32,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        let mut camera = Self {
            position,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: Vec3::Y,
            yaw: YAW,
            pitch: PITCH,
            zoom: ZOOM,
            movement_speed: SPEED,
            mouse_sensitivity: SENSITIVITY,
        };
        camera.update_vectors();
        camera
    }

    pub fn with_speed(mut self, movement_speed: f32, mouse_sensitivity: f32) -> Self {
        self.movement_speed = movement_speed;
        self.mouse_sensitivity = mouse_sensitivity;
        self
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// Perspective projection from the current zoom.
    pub fn projection(&self, aspect: f32, z_near: f32, z_far: f32) -> Mat4 {
        Mat4::perspective_rh(self.zoom.to_radians(), aspect, z_near, z_far)
    }

    pub fn process_keyboard(&mut self, direction: Movement, delta_ms: f32) {
        let velocity = self.movement_speed * delta_ms;
        match direction {
            Movement::Forward => self.position += self.front * velocity,
            Movement::Backward => self.position -= self.front * velocity,
            Movement::Left => self.position -= self.right * velocity,
            Movement::Right => self.position += self.right * velocity,
        }
    }

    /// Apply a pointer offset. `dy` is positive when the pointer moves up.
    pub fn process_look(&mut self, dx: f32, dy: f32, constrain_pitch: bool) {
        self.yaw += dx * self.mouse_sensitivity;
        self.pitch += dy * self.mouse_sensitivity;

        // Past ±90 the view flips over the world up axis
        if constrain_pitch {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }

        self.update_vectors();
    }

    pub fn process_scroll(&mut self, delta: f32) {
        self.zoom = (self.zoom - delta).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}
