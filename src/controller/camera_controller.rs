use tracing::{debug, info};

use crate::config::DemoConfig;
use crate::controller::input::{InputEvent, InputProcessor, InputState};
use crate::model::camera::Movement;
use crate::model::DemoState;

/// What the frame driver must do after an event has been dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    Resize { width: u32, height: u32 },
}

/// Maps input onto the demo state: events first, then held keys.
#[derive(Debug, Clone)]
pub struct CameraController {
    processor: InputProcessor,
    look_step: f32,
}

impl CameraController {
    pub fn new(config: &DemoConfig) -> Self {
        Self {
            processor: InputProcessor::new(config.controls.clone()),
            look_step: config.camera.look_step,
        }
    }

    pub fn handle_event(&self, state: &mut DemoState, event: &InputEvent) -> Dispatch {
        match event {
            InputEvent::Quit => {
                info!("quit requested");
                state.running = false;
            }
            InputEvent::PointerMoved { x, y } => {
                // Keep the tracker current even when the camera is fixed so
                // enabling free-fly later does not produce a jump
                let (dx, dy) = state.mouse.offset(*x, *y);
                if state.controls.free_fly {
                    state.camera.process_look(dx, dy, true);
                }
            }
            InputEvent::Scroll { delta } => {
                if state.controls.free_fly {
                    state.camera.process_scroll(*delta);
                    debug!(zoom = state.camera.zoom, "zoom changed");
                }
            }
            InputEvent::Resized { width, height } => {
                if *width > 0 && *height > 0 && (*width, *height) != (state.width, state.height) {
                    state.width = *width;
                    state.height = *height;
                    return Dispatch::Resize { width: *width, height: *height };
                }
            }
            InputEvent::FocusLost => state.mouse.reset(),
            InputEvent::KeyDown(_) | InputEvent::KeyUp(_) => {}
        }
        Dispatch::Handled
    }

    /// Level-triggered handling of the keys held right now. Returns true on
    /// the frame the toggle flips.
    pub fn apply_held_keys(&self, state: &mut DemoState, input: &InputState, delta_ms: f32) -> bool {
        if self.processor.wants_quit(input) {
            state.running = false;
        }

        if state.controls.free_fly {
            let axes = self.processor.held_axes(input);
            let camera = &mut state.camera;
            match axes.forward {
                1 => camera.process_keyboard(Movement::Forward, delta_ms),
                -1 => camera.process_keyboard(Movement::Backward, delta_ms),
                _ => {}
            }
            match axes.strafe {
                1 => camera.process_keyboard(Movement::Right, delta_ms),
                -1 => camera.process_keyboard(Movement::Left, delta_ms),
                _ => {}
            }
            if axes.pitch != 0 {
                camera.process_look(0.0, f32::from(axes.pitch) * self.look_step, true);
            }
            if axes.yaw != 0 {
                camera.process_look(f32::from(axes.yaw) * self.look_step, 0.0, true);
            }
        }

        if state.controls.toggle {
            let flipped = state.toggle.update(self.processor.is_toggle_held(input));
            if flipped {
                info!(enabled = state.toggle.enabled, "toggle switched");
            }
            return flipped;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::input::Key;
    use crate::model::state::Controls;
    use glam::Vec3;

    fn state(controls: Controls) -> DemoState {
        DemoState::new(&DemoConfig::default(), Vec3::new(0.0, 0.0, 3.0), controls)
    }

    fn held(keys: &[Key]) -> InputState {
        let mut input = InputState::new();
        for key in keys {
            input.process_event(&InputEvent::KeyDown(*key));
        }
        input
    }

    #[test]
    fn quit_event_stops_the_demo() {
        let controller = CameraController::new(&DemoConfig::default());
        let mut state = state(Controls::NONE);
        controller.handle_event(&mut state, &InputEvent::Quit);
        assert!(!state.running);
    }

    #[test]
    fn escape_held_stops_the_demo() {
        let controller = CameraController::new(&DemoConfig::default());
        let mut state = state(Controls::NONE);
        controller.apply_held_keys(&mut state, &held(&[Key::Escape]), 16.0);
        assert!(!state.running);
    }

    #[test]
    fn first_pointer_sample_does_not_turn_the_camera() {
        let controller = CameraController::new(&DemoConfig::default());
        let mut state = state(Controls::FREE_FLY);
        let before = state.camera.clone();
        controller.handle_event(&mut state, &InputEvent::PointerMoved { x: 600.0, y: 10.0 });
        assert_eq!(state.camera, before);

        controller.handle_event(&mut state, &InputEvent::PointerMoved { x: 610.0, y: 10.0 });
        assert!((state.camera.yaw - (-89.0)).abs() < 1e-4);
    }

    #[test]
    fn fixed_camera_ignores_pointer_and_keys() {
        let controller = CameraController::new(&DemoConfig::default());
        let mut state = state(Controls::NONE);
        let before = state.camera.clone();
        controller.handle_event(&mut state, &InputEvent::PointerMoved { x: 1.0, y: 1.0 });
        controller.handle_event(&mut state, &InputEvent::PointerMoved { x: 100.0, y: 1.0 });
        controller.handle_event(&mut state, &InputEvent::Scroll { delta: 2.0 });
        controller.apply_held_keys(&mut state, &held(&[Key::W, Key::Up]), 100.0);
        assert_eq!(state.camera, before);
    }

    #[test]
    fn wheel_up_zooms_in() {
        let controller = CameraController::new(&DemoConfig::default());
        let mut state = state(Controls::FREE_FLY);
        controller.handle_event(&mut state, &InputEvent::Scroll { delta: 2.0 });
        assert_eq!(state.camera.zoom, 43.0);
    }

    #[test]
    fn held_movement_integrates_frame_time() {
        let controller = CameraController::new(&DemoConfig::default());
        let mut state = state(Controls::FREE_FLY);
        controller.apply_held_keys(&mut state, &held(&[Key::W]), 400.0);
        assert!((state.camera.position - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-5);
    }

    #[test]
    fn arrow_keys_turn_by_fixed_step() {
        let controller = CameraController::new(&DemoConfig::default());
        let mut state = state(Controls::FREE_FLY);
        controller.apply_held_keys(&mut state, &held(&[Key::Up, Key::Right]), 0.0);
        assert!((state.camera.pitch - 1.0).abs() < 1e-5);
        assert!((state.camera.yaw - (-89.0)).abs() < 1e-5);
    }

    #[test]
    fn toggle_only_runs_when_enabled() {
        let controller = CameraController::new(&DemoConfig::default());
        let mut plain = state(Controls::FREE_FLY);
        assert!(!controller.apply_held_keys(&mut plain, &held(&[Key::Space]), 16.0));
        assert!(!plain.toggle.enabled);

        let mut toggled = state(Controls::FREE_FLY_WITH_TOGGLE);
        assert!(controller.apply_held_keys(&mut toggled, &held(&[Key::Space]), 16.0));
        assert!(!controller.apply_held_keys(&mut toggled, &held(&[Key::Space]), 16.0));
        assert!(toggled.toggle.enabled);
    }

    #[test]
    fn resize_reports_only_real_changes() {
        let controller = CameraController::new(&DemoConfig::default());
        let mut state = state(Controls::NONE);
        let same = InputEvent::Resized { width: 640, height: 480 };
        assert_eq!(controller.handle_event(&mut state, &same), Dispatch::Handled);
        let minimized = InputEvent::Resized { width: 0, height: 0 };
        assert_eq!(controller.handle_event(&mut state, &minimized), Dispatch::Handled);
        let bigger = InputEvent::Resized { width: 800, height: 600 };
        assert_eq!(
            controller.handle_event(&mut state, &bigger),
            Dispatch::Resize { width: 800, height: 600 }
        );
        assert_eq!((state.width, state.height), (800, 600));
    }
}
