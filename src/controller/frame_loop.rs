use glam::Mat4;
use tracing::{debug, info, trace};

use crate::config::{DemoConfig, EventPolling};
use crate::controller::camera_controller::{CameraController, Dispatch};
use crate::controller::input::InputSource;
use crate::error::DemoError;
use crate::model::camera::Camera;
use crate::model::clock::{Clock, FrameClock};
use crate::model::DemoState;

/// Read-only view of the demo handed to the render callback.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    pub state: &'a DemoState,
    pub delta_ms: f32,
}

impl FrameContext<'_> {
    pub fn camera(&self) -> &Camera {
        &self.state.camera
    }

    pub fn view(&self) -> Mat4 {
        self.state.camera.view_matrix()
    }

    /// Projection from the camera zoom and the current window aspect.
    pub fn projection(&self, z_near: f32, z_far: f32) -> Mat4 {
        self.state.camera.projection(self.aspect(), z_near, z_far)
    }

    pub fn aspect(&self) -> f32 {
        self.state.aspect()
    }

    pub fn toggle_enabled(&self) -> bool {
        self.state.toggle.enabled
    }

    pub fn frame_index(&self) -> u64 {
        self.state.frame_index
    }
}

/// Where frames go: draw one frame, then show it.
pub trait RenderTarget {
    fn render(&mut self, ctx: &FrameContext<'_>) -> Result<(), DemoError>;

    fn present(&mut self) -> Result<(), DemoError>;

    fn resize(&mut self, _width: u32, _height: u32) {}
}

/// Non-accumulating frame limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    target_ms: u64,
    checkpoint_ms: u64,
}

impl Throttle {
    pub fn new(target_ms: u64) -> Self {
        Self { target_ms, checkpoint_ms: 0 }
    }

    pub fn checkpoint_ms(&self) -> u64 {
        self.checkpoint_ms
    }

    /// Sleep off whatever is left of the target interval since the last
    /// checkpoint. Overshoot is not carried into later frames.
    pub fn wait<C: Clock + ?Sized>(&mut self, clock: &C) {
        let now = clock.now_ms();
        let elapsed = now.saturating_sub(self.checkpoint_ms);
        if elapsed < self.target_ms {
            clock.sleep_ms(self.target_ms - elapsed);
            self.checkpoint_ms = clock.now_ms();
        } else {
            self.checkpoint_ms = now;
        }
    }
}

/// Input → update → render → present → throttle, once per iteration.
pub struct FrameDriver {
    controller: CameraController,
    polling: EventPolling,
    frame_clock: FrameClock,
    throttle: Throttle,
}

impl FrameDriver {
    pub fn new(config: &DemoConfig) -> Self {
        Self {
            controller: CameraController::new(config),
            polling: config.timing.event_polling,
            frame_clock: FrameClock::default(),
            throttle: Throttle::new(config.timing.target_frame_ms),
        }
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    /// Run until `state.running` goes false.
    pub fn run<I, C, R>(
        &mut self,
        state: &mut DemoState,
        input: &mut I,
        clock: &C,
        target: &mut R,
    ) -> Result<(), DemoError>
    where
        I: InputSource + ?Sized,
        C: Clock + ?Sized,
        R: RenderTarget + ?Sized,
    {
        self.frame_clock = FrameClock::new(clock.now_ms());
        info!(polling = ?self.polling, "entering frame loop");
        while state.running {
            self.step(state, input, clock, target)?;
        }
        info!(frames = state.frame_index, "frame loop finished");
        Ok(())
    }

    /// One full iteration. Render and present still happen on the iteration
    /// that observes a quit.
    pub fn step<I, C, R>(
        &mut self,
        state: &mut DemoState,
        input: &mut I,
        clock: &C,
        target: &mut R,
    ) -> Result<(), DemoError>
    where
        I: InputSource + ?Sized,
        C: Clock + ?Sized,
        R: RenderTarget + ?Sized,
    {
        let delta_ms = self.frame_clock.tick(clock.now_ms());

        self.process_input(state, input, target, delta_ms);

        target.render(&FrameContext { state, delta_ms })?;
        target.present()?;

        self.throttle.wait(clock);
        trace!(frame = state.frame_index, delta_ms, "frame done");
        state.frame_index += 1;
        Ok(())
    }

    fn process_input<I, R>(&self, state: &mut DemoState, input: &mut I, target: &mut R, delta_ms: f32)
    where
        I: InputSource + ?Sized,
        R: RenderTarget + ?Sized,
    {
        loop {
            let Some(event) = input.poll_event() else { break };
            if let Dispatch::Resize { width, height } = self.controller.handle_event(state, &event) {
                debug!(width, height, "resizing render target");
                target.resize(width, height);
            }
            if self.polling == EventPolling::OnePerFrame {
                break;
            }
        }

        self.controller.apply_held_keys(state, input.keys(), delta_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::input::{EventPump, EventQueue, InputEvent, InputState, Key, PumpedInput};
    use crate::model::state::Controls;
    use glam::Vec3;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Clock that only moves when asked to sleep or when a frame "costs" time.
    #[derive(Default)]
    struct FakeClock {
        now: Cell<u64>,
        sleeps: RefCell<Vec<u64>>,
    }

    impl FakeClock {
        fn advance(&self, ms: u64) {
            self.now.set(self.now.get() + ms);
        }
    }

    impl Clock for FakeClock {
        fn now_ms(&self) -> u64 {
            self.now.get()
        }

        fn sleep_ms(&self, ms: u64) {
            self.sleeps.borrow_mut().push(ms);
            self.advance(ms);
        }
    }

    /// Per-frame script of queued events and held keys. The target bumps
    /// `frame` on present; the next poll loads that frame's script.
    struct ScriptedInput {
        frames: Vec<(Vec<InputEvent>, Vec<Key>)>,
        frame: Rc<Cell<usize>>,
        loaded: Option<usize>,
        queue: VecDeque<InputEvent>,
        keys: InputState,
    }

    impl ScriptedInput {
        fn sync(&mut self) {
            let frame = self.frame.get();
            if self.loaded == Some(frame) {
                return;
            }
            self.loaded = Some(frame);
            self.keys = InputState::new();
            if let Some((events, held)) = self.frames.get(frame) {
                self.queue.extend(events.iter().cloned());
                for key in held {
                    self.keys.process_event(&InputEvent::KeyDown(*key));
                }
            }
        }
    }

    impl InputSource for ScriptedInput {
        fn poll_event(&mut self) -> Option<InputEvent> {
            self.sync();
            self.queue.pop_front()
        }

        fn keys(&self) -> &InputState {
            &self.keys
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Render { frame: u64, delta_ms: f32, toggle: bool },
        Present,
        Resize(u32, u32),
    }

    /// Records calls and costs `render_ms` of fake time per frame.
    struct RecordingTarget {
        calls: Rc<RefCell<Vec<Call>>>,
        clock: Rc<FakeClock>,
        frame: Rc<Cell<usize>>,
        render_ms: u64,
    }

    impl RenderTarget for RecordingTarget {
        fn render(&mut self, ctx: &FrameContext<'_>) -> Result<(), DemoError> {
            self.calls.borrow_mut().push(Call::Render {
                frame: ctx.frame_index(),
                delta_ms: ctx.delta_ms,
                toggle: ctx.toggle_enabled(),
            });
            self.clock.advance(self.render_ms);
            Ok(())
        }

        fn present(&mut self) -> Result<(), DemoError> {
            self.calls.borrow_mut().push(Call::Present);
            self.frame.set(self.frame.get() + 1);
            Ok(())
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.calls.borrow_mut().push(Call::Resize(width, height));
        }
    }

    struct Harness {
        config: DemoConfig,
        clock: Rc<FakeClock>,
        calls: Rc<RefCell<Vec<Call>>>,
        frame: Rc<Cell<usize>>,
    }

    impl Harness {
        fn new(config: DemoConfig) -> Self {
            Self {
                config,
                clock: Rc::new(FakeClock::default()),
                calls: Rc::new(RefCell::new(Vec::new())),
                frame: Rc::new(Cell::new(0)),
            }
        }

        fn input(&self, frames: Vec<(Vec<InputEvent>, Vec<Key>)>) -> ScriptedInput {
            ScriptedInput {
                frames,
                frame: Rc::clone(&self.frame),
                loaded: None,
                queue: VecDeque::new(),
                keys: InputState::new(),
            }
        }

        fn target(&self, render_ms: u64) -> RecordingTarget {
            RecordingTarget {
                calls: Rc::clone(&self.calls),
                clock: Rc::clone(&self.clock),
                frame: Rc::clone(&self.frame),
                render_ms,
            }
        }

        fn state(&self, controls: Controls) -> DemoState {
            DemoState::new(&self.config, Vec3::new(0.0, 0.0, 3.0), controls)
        }

        fn driver(&self) -> FrameDriver {
            FrameDriver::new(&self.config)
        }

        fn rendered(&self) -> Vec<(u64, f32, bool)> {
            self.calls
                .borrow()
                .iter()
                .filter_map(|c| match c {
                    Call::Render { frame, delta_ms, toggle } => Some((*frame, *delta_ms, *toggle)),
                    _ => None,
                })
                .collect()
        }
    }

    fn idle(n: usize) -> Vec<(Vec<InputEvent>, Vec<Key>)> {
        vec![(vec![], vec![]); n]
    }

    #[test]
    fn quit_finishes_the_current_iteration_only() {
        let harness = Harness::new(DemoConfig::default());
        let mut script = idle(2);
        script.push((vec![InputEvent::Quit], vec![]));
        script.extend(idle(5));
        let mut input = harness.input(script);
        let mut state = harness.state(Controls::NONE);

        harness
            .driver()
            .run(&mut state, &mut input, harness.clock.as_ref(), &mut harness.target(0))
            .unwrap();

        assert_eq!(state.frame_index, 3);
        let calls = harness.calls.borrow();
        assert_eq!(calls.len(), 6);
        assert!(matches!(calls[4], Call::Render { frame: 2, .. }));
        assert_eq!(calls[5], Call::Present);
    }

    #[test]
    fn escape_key_ends_the_loop() {
        let harness = Harness::new(DemoConfig::default());
        let mut script = idle(1);
        script.push((vec![InputEvent::KeyDown(Key::Escape)], vec![Key::Escape]));
        script.extend(idle(3));
        let mut input = harness.input(script);
        let mut state = harness.state(Controls::NONE);

        harness
            .driver()
            .run(&mut state, &mut input, harness.clock.as_ref(), &mut harness.target(0))
            .unwrap();

        assert_eq!(state.frame_index, 2);
    }

    #[test]
    fn throttle_never_runs_faster_than_target() {
        let harness = Harness::new(DemoConfig::default());
        let mut input = harness.input(idle(20));
        let mut state = harness.state(Controls::NONE);
        let mut target = harness.target(0);
        let mut driver = harness.driver();

        let mut checkpoints = Vec::new();
        for _ in 0..20 {
            driver
                .step(&mut state, &mut input, harness.clock.as_ref(), &mut target)
                .unwrap();
            checkpoints.push(driver.throttle().checkpoint_ms());
        }
        for pair in checkpoints.windows(2) {
            assert!(pair[1] - pair[0] >= 16, "checkpoints {pair:?} too close");
        }
    }

    #[test]
    fn slow_frames_are_not_compensated() {
        let clock = FakeClock::default();
        let mut throttle = Throttle::new(16);

        clock.advance(40);
        throttle.wait(&clock);
        assert_eq!(throttle.checkpoint_ms(), 40);
        assert!(clock.sleeps.borrow().is_empty());

        clock.advance(5);
        throttle.wait(&clock);
        assert_eq!(*clock.sleeps.borrow(), vec![11]);
        assert_eq!(throttle.checkpoint_ms(), 56);
    }

    #[test]
    fn delta_time_follows_the_clock() {
        let harness = Harness::new(DemoConfig::default());
        let mut input = harness.input(idle(4));
        let mut state = harness.state(Controls::NONE);
        let mut target = harness.target(20);
        let mut driver = harness.driver();

        for _ in 0..3 {
            driver
                .step(&mut state, &mut input, harness.clock.as_ref(), &mut target)
                .unwrap();
        }

        let deltas: Vec<f32> = harness.rendered().iter().map(|r| r.1).collect();
        // 20 ms of rendering exceeds the target so no sleep is added
        assert_eq!(deltas, vec![0.0, 20.0, 20.0]);
    }

    #[test]
    fn held_toggle_flips_once_across_frames() {
        let harness = Harness::new(DemoConfig::default());
        let mut script = vec![(vec![], vec![Key::Space]); 10];
        script.push((vec![], vec![]));
        script.push((vec![], vec![Key::Space]));
        let mut input = harness.input(script);
        let mut state = harness.state(Controls::FREE_FLY_WITH_TOGGLE);
        let mut target = harness.target(0);
        let mut driver = harness.driver();

        for _ in 0..12 {
            driver
                .step(&mut state, &mut input, harness.clock.as_ref(), &mut target)
                .unwrap();
        }

        let toggles: Vec<bool> = harness.rendered().iter().map(|r| r.2).collect();
        let mut expected = vec![true; 11];
        expected.push(false);
        assert_eq!(toggles, expected);
    }

    #[test]
    fn one_event_per_frame_leaves_the_rest_queued() {
        let mut config = DemoConfig::default();
        config.timing.event_polling = EventPolling::OnePerFrame;
        let harness = Harness::new(config);
        let mut script = vec![(vec![InputEvent::Scroll { delta: 2.0 }; 3], vec![])];
        script.extend(idle(3));
        let mut input = harness.input(script);
        let mut state = harness.state(Controls::FREE_FLY);
        let mut target = harness.target(0);
        let mut driver = harness.driver();

        driver
            .step(&mut state, &mut input, harness.clock.as_ref(), &mut target)
            .unwrap();
        assert_eq!(state.camera.zoom, 43.0);
        driver
            .step(&mut state, &mut input, harness.clock.as_ref(), &mut target)
            .unwrap();
        assert_eq!(state.camera.zoom, 41.0);
    }

    /// One scripted batch of platform events per pump.
    struct BatchPump(VecDeque<Vec<InputEvent>>);

    impl EventPump for BatchPump {
        fn pump(&mut self, queue: &mut EventQueue) {
            for event in self.0.pop_front().unwrap_or_default() {
                queue.push(event);
            }
        }
    }

    #[test]
    fn key_release_is_seen_while_a_backlog_drains() {
        let mut config = DemoConfig::default();
        config.timing.event_polling = EventPolling::OnePerFrame;
        let harness = Harness::new(config);
        let pointer = InputEvent::PointerMoved { x: 320.0, y: 240.0 };
        let mut burst = vec![InputEvent::KeyDown(Key::W)];
        burst.extend(std::iter::repeat(pointer).take(5));
        let pump = BatchPump(VecDeque::from(vec![burst, vec![], vec![InputEvent::KeyUp(Key::W)]]));
        let mut input = PumpedInput::new(pump, EventQueue::new());
        let mut state = harness.state(Controls::FREE_FLY);
        let mut target = harness.target(20);
        let mut driver = harness.driver();

        for _ in 0..4 {
            driver
                .step(&mut state, &mut input, harness.clock.as_ref(), &mut target)
                .unwrap();
        }

        // Only frame 1 moves: frame 0 has a zero step and W is up from frame 2
        assert_eq!(input.pending(), 3);
        assert!((state.camera.position - Vec3::new(0.0, 0.0, 2.95)).length() < 1e-5);
    }

    #[test]
    fn drain_all_consumes_the_whole_queue() {
        let harness = Harness::new(DemoConfig::default());
        let mut input = harness.input(vec![(vec![InputEvent::Scroll { delta: 2.0 }; 3], vec![])]);
        let mut state = harness.state(Controls::FREE_FLY);

        harness
            .driver()
            .step(&mut state, &mut input, harness.clock.as_ref(), &mut harness.target(0))
            .unwrap();
        assert_eq!(state.camera.zoom, 39.0);
    }

    #[test]
    fn resize_reaches_the_target_before_render() {
        let harness = Harness::new(DemoConfig::default());
        let mut input = harness.input(vec![(vec![InputEvent::Resized { width: 800, height: 600 }], vec![])]);
        let mut state = harness.state(Controls::NONE);

        harness
            .driver()
            .step(&mut state, &mut input, harness.clock.as_ref(), &mut harness.target(0))
            .unwrap();

        let calls = harness.calls.borrow();
        assert_eq!(calls[0], Call::Resize(800, 600));
        assert!(matches!(calls[1], Call::Render { .. }));
        assert!((state.aspect() - 800.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn render_errors_stop_the_loop() {
        struct Failing;
        impl RenderTarget for Failing {
            fn render(&mut self, _ctx: &FrameContext<'_>) -> Result<(), DemoError> {
                Err(DemoError::Frame(wgpu::SurfaceError::OutOfMemory))
            }
            fn present(&mut self) -> Result<(), DemoError> {
                Ok(())
            }
        }

        let harness = Harness::new(DemoConfig::default());
        let mut input = harness.input(idle(2));
        let mut state = harness.state(Controls::NONE);
        let result = harness
            .driver()
            .run(&mut state, &mut input, harness.clock.as_ref(), &mut Failing);
        assert!(matches!(result, Err(DemoError::Frame(_))));
        assert_eq!(state.frame_index, 0);
    }
}
