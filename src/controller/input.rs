/// Platform-agnostic input handling
use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

/// Keys the lessons react to. Anything else is dropped at the platform layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    W,
    A,
    S,
    D,
    Up,
    Down,
    Left,
    Right,
    Space,
    Escape,
}

/// Platform-independent input events
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Quit,

    // Keyboard events
    KeyDown(Key),
    KeyUp(Key),

    // Pointer events, in window pixels
    PointerMoved { x: f32, y: f32 },
    Scroll { delta: f32 },

    // Window events
    Resized { width: u32, height: u32 },
    FocusLost,
}

/// Level state of every tracked key, as of the last pumped event.
#[derive(Debug, Default, Clone)]
pub struct InputState {
    pub pressed_keys: HashSet<Key>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold an event into the key levels
    pub fn process_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyDown(key) => {
                self.pressed_keys.insert(*key);
            }
            InputEvent::KeyUp(key) => {
                self.pressed_keys.remove(key);
            }
            InputEvent::FocusLost => self.clear_keys(),
            _ => {}
        }
    }

    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.pressed_keys.contains(&key)
    }

    pub fn clear_keys(&mut self) {
        self.pressed_keys.clear();
    }
}

/// Non-blocking event queue plus the current key levels.
pub trait InputSource {
    /// Next pending event, or `None` when the queue is empty. Never blocks.
    fn poll_event(&mut self) -> Option<InputEvent>;

    fn keys(&self) -> &InputState;
}

/// Pending events in arrival order, plus the key levels they imply.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<InputEvent>,
    keys: InputState,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Levels change on arrival, not when the event is popped.
    pub fn push(&mut self, event: InputEvent) {
        self.keys.process_event(&event);
        self.events.push_back(event);
    }

    pub fn pop(&mut self) -> Option<InputEvent> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn keys(&self) -> &InputState {
        &self.keys
    }
}

/// Moves whatever the platform has pending into the queue. Never blocks.
pub trait EventPump {
    fn pump(&mut self, queue: &mut EventQueue);
}

/// Pumps before every poll, so key levels stay current even while a
/// backlog is drained one event per frame.
pub struct PumpedInput<P> {
    pump: P,
    queue: EventQueue,
}

impl<P: EventPump> PumpedInput<P> {
    pub fn new(pump: P, queue: EventQueue) -> Self {
        Self { pump, queue }
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl<P: EventPump> InputSource for PumpedInput<P> {
    fn poll_event(&mut self) -> Option<InputEvent> {
        self.pump.pump(&mut self.queue);
        self.queue.pop()
    }

    fn keys(&self) -> &InputState {
        self.queue.keys()
    }
}

/// Key mapping configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub forward: Key,
    pub backward: Key,
    pub left: Key,
    pub right: Key,
    pub look_up: Key,
    pub look_down: Key,
    pub look_left: Key,
    pub look_right: Key,
    pub toggle: Key,
    pub quit: Key,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: Key::W,
            backward: Key::S,
            left: Key::A,
            right: Key::D,
            look_up: Key::Up,
            look_down: Key::Down,
            look_left: Key::Left,
            look_right: Key::Right,
            toggle: Key::Space,
            quit: Key::Escape,
        }
    }
}

/// Which way the held keys push the camera this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeldAxes {
    /// +1 forward, -1 backward
    pub forward: i8,
    /// +1 right, -1 left
    pub strafe: i8,
    /// +1 up, -1 down
    pub pitch: i8,
    /// +1 right, -1 left
    pub yaw: i8,
}

/// High-level input processor
#[derive(Debug, Clone, Default)]
pub struct InputProcessor {
    bindings: KeyBindings,
}

impl InputProcessor {
    pub fn new(bindings: KeyBindings) -> Self {
        Self { bindings }
    }

    pub fn wants_quit(&self, input: &InputState) -> bool {
        input.is_key_pressed(self.bindings.quit)
    }

    pub fn is_toggle_held(&self, input: &InputState) -> bool {
        input.is_key_pressed(self.bindings.toggle)
    }

    /// Resolve opposing key pairs; the first binding of each pair wins when
    /// both are held.
    pub fn held_axes(&self, input: &InputState) -> HeldAxes {
        let b = &self.bindings;
        let axis = |pos: Key, neg: Key, pos_wins: bool| -> i8 {
            match (input.is_key_pressed(pos), input.is_key_pressed(neg)) {
                (true, true) => {
                    if pos_wins {
                        1
                    } else {
                        -1
                    }
                }
                (true, false) => 1,
                (false, true) => -1,
                (false, false) => 0,
            }
        };
        HeldAxes {
            forward: axis(b.forward, b.backward, true),
            strafe: axis(b.right, b.left, false),
            pitch: axis(b.look_up, b.look_down, true),
            yaw: axis(b.look_right, b.look_left, false),
        }
    }
}

pub mod native {
    use super::*;
    use winit::event::MouseScrollDelta;
    use winit::keyboard::KeyCode;

    pub fn key_from_code(code: KeyCode) -> Option<Key> {
        match code {
            KeyCode::KeyW => Some(Key::W),
            KeyCode::KeyA => Some(Key::A),
            KeyCode::KeyS => Some(Key::S),
            KeyCode::KeyD => Some(Key::D),
            KeyCode::ArrowUp => Some(Key::Up),
            KeyCode::ArrowDown => Some(Key::Down),
            KeyCode::ArrowLeft => Some(Key::Left),
            KeyCode::ArrowRight => Some(Key::Right),
            KeyCode::Space => Some(Key::Space),
            KeyCode::Escape => Some(Key::Escape),
            _ => None,
        }
    }

    /// One wheel notch becomes a fixed `step`, signed by direction (away
    /// from the user is positive). Touchpads report pixels; they are
    /// collapsed to the same notch so zoom speed does not depend on device.
    pub fn scroll_to_input(delta: MouseScrollDelta, step: f32) -> Option<InputEvent> {
        let dy = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(pos) => pos.y as f32,
        };
        if dy > 0.0 {
            Some(InputEvent::Scroll { delta: step })
        } else if dy < 0.0 {
            Some(InputEvent::Scroll { delta: -step })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(keys: &[Key]) -> InputState {
        let mut input = InputState::new();
        for key in keys {
            input.process_event(&InputEvent::KeyDown(*key));
        }
        input
    }

    #[test]
    fn key_events_track_levels() {
        let mut input = held(&[Key::W, Key::Space]);
        assert!(input.is_key_pressed(Key::W));
        input.process_event(&InputEvent::KeyUp(Key::W));
        assert!(!input.is_key_pressed(Key::W));
        assert!(input.is_key_pressed(Key::Space));
    }

    #[test]
    fn focus_loss_releases_everything() {
        let mut input = held(&[Key::W, Key::A]);
        input.process_event(&InputEvent::FocusLost);
        assert!(input.pressed_keys.is_empty());
    }

    /// Hands out one scripted batch per pump call.
    struct BatchPump {
        batches: VecDeque<Vec<InputEvent>>,
        calls: usize,
    }

    impl EventPump for BatchPump {
        fn pump(&mut self, queue: &mut EventQueue) {
            self.calls += 1;
            for event in self.batches.pop_front().unwrap_or_default() {
                queue.push(event);
            }
        }
    }

    #[test]
    fn levels_follow_pumps_not_pops() {
        let pointer = InputEvent::PointerMoved { x: 1.0, y: 1.0 };
        let mut first = vec![InputEvent::KeyDown(Key::W)];
        first.extend(std::iter::repeat(pointer).take(5));
        let pump = BatchPump {
            batches: VecDeque::from(vec![first, vec![InputEvent::KeyUp(Key::W)]]),
            calls: 0,
        };
        let mut input = PumpedInput::new(pump, EventQueue::new());

        assert_eq!(input.poll_event(), Some(InputEvent::KeyDown(Key::W)));
        assert!(input.keys().is_key_pressed(Key::W));
        assert_eq!(input.pending(), 5);

        // The backlog is still there, but the release is already visible
        assert!(matches!(input.poll_event(), Some(InputEvent::PointerMoved { .. })));
        assert!(!input.keys().is_key_pressed(Key::W));
        assert_eq!(input.pending(), 5);
        assert_eq!(input.pump.calls, 2);
    }

    #[test]
    fn opposing_keys_resolve_to_first_binding() {
        let processor = InputProcessor::default();
        let axes = processor.held_axes(&held(&[Key::W, Key::S, Key::A, Key::D]));
        assert_eq!(axes.forward, 1);
        assert_eq!(axes.strafe, -1);

        let axes = processor.held_axes(&held(&[Key::Up, Key::Down, Key::Left, Key::Right]));
        assert_eq!(axes.pitch, 1);
        assert_eq!(axes.yaw, -1);
    }

    #[test]
    fn no_keys_no_motion() {
        let axes = InputProcessor::default().held_axes(&InputState::new());
        assert_eq!(axes, HeldAxes::default());
    }

    #[test]
    fn scroll_collapses_to_fixed_steps() {
        use winit::event::MouseScrollDelta;
        assert_eq!(
            native::scroll_to_input(MouseScrollDelta::LineDelta(0.0, 3.0), 2.0),
            Some(InputEvent::Scroll { delta: 2.0 })
        );
        assert_eq!(
            native::scroll_to_input(MouseScrollDelta::LineDelta(0.0, -1.0), 2.0),
            Some(InputEvent::Scroll { delta: -2.0 })
        );
        assert_eq!(native::scroll_to_input(MouseScrollDelta::LineDelta(1.0, 0.0), 2.0), None);
    }
}
