use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::error::OsError;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::config::DemoConfig;
use crate::controller::input::native::{key_from_code, scroll_to_input};
use crate::controller::input::{EventPump, EventQueue, InputEvent, InputSource, InputState, PumpedInput};
use crate::error::DemoError;

/// The window, once created, and what is needed to create it.
struct WindowSlot {
    attributes: WindowAttributes,
    window: Option<Arc<Window>>,
    create_error: Option<OsError>,
    scroll_step: f32,
}

/// Receives winit callbacks during one pump and queues them as `InputEvent`s.
struct EventCollector<'a> {
    slot: &'a mut WindowSlot,
    queue: &'a mut EventQueue,
}

impl EventCollector<'_> {
    fn on_key(&mut self, event: KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else { return };
        let Some(key) = key_from_code(code) else { return };
        match event.state {
            ElementState::Pressed if !event.repeat => self.queue.push(InputEvent::KeyDown(key)),
            ElementState::Pressed => {}
            ElementState::Released => self.queue.push(InputEvent::KeyUp(key)),
        }
    }
}

impl ApplicationHandler for EventCollector<'_> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.slot.window.is_some() {
            return;
        }
        match event_loop.create_window(self.slot.attributes.clone()) {
            Ok(window) => {
                let size = window.inner_size();
                info!(width = size.width, height = size.height, "window created");
                self.slot.window = Some(Arc::new(window));
            }
            Err(err) => self.slot.create_error = Some(err),
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.slot.window.as_ref().map(|w| w.id()) != Some(window_id) {
            return;
        }
        match event {
            WindowEvent::CloseRequested => self.queue.push(InputEvent::Quit),
            WindowEvent::KeyboardInput { event, .. } => self.on_key(event),
            WindowEvent::CursorMoved { position, .. } => self.queue.push(InputEvent::PointerMoved {
                x: position.x as f32,
                y: position.y as f32,
            }),
            WindowEvent::MouseWheel { delta, .. } => {
                if let Some(event) = scroll_to_input(delta, self.slot.scroll_step) {
                    self.queue.push(event);
                }
            }
            WindowEvent::Resized(size) => self.queue.push(InputEvent::Resized {
                width: size.width,
                height: size.height,
            }),
            WindowEvent::Focused(false) => self.queue.push(InputEvent::FocusLost),
            _ => {}
        }
    }
}

/// The winit event loop, drained without waiting.
pub struct WindowPump {
    event_loop: EventLoop<()>,
    slot: WindowSlot,
    exited: bool,
}

impl WindowPump {
    fn pump_with_timeout(&mut self, timeout: Duration, queue: &mut EventQueue) -> PumpStatus {
        let mut collector = EventCollector {
            slot: &mut self.slot,
            queue,
        };
        self.event_loop.pump_app_events(Some(timeout), &mut collector)
    }
}

impl EventPump for WindowPump {
    fn pump(&mut self, queue: &mut EventQueue) {
        if self.exited {
            return;
        }
        if let PumpStatus::Exit(code) = self.pump_with_timeout(Duration::ZERO, queue) {
            warn!(code, "event loop exited");
            self.exited = true;
            queue.push(InputEvent::Quit);
        }
    }
}

/// Native window plus a non-blocking event queue over it.
pub struct WindowHost {
    input: PumpedInput<WindowPump>,
    window: Arc<Window>,
}

impl WindowHost {
    /// Create the event loop and pump it until the window exists.
    pub fn open(config: &DemoConfig) -> Result<Self, DemoError> {
        let event_loop = EventLoop::new()?;
        let attributes = Window::default_attributes()
            .with_title(config.window.title.clone())
            .with_inner_size(LogicalSize::new(config.window.width, config.window.height));

        let mut pump = WindowPump {
            event_loop,
            slot: WindowSlot {
                attributes,
                window: None,
                create_error: None,
                scroll_step: config.camera.scroll_step,
            },
            exited: false,
        };
        let mut queue = EventQueue::new();

        let window = loop {
            if let Some(window) = pump.slot.window.clone() {
                break window;
            }
            let status = pump.pump_with_timeout(Duration::from_millis(16), &mut queue);
            if let Some(err) = pump.slot.create_error.take() {
                return Err(err.into());
            }
            if let PumpStatus::Exit(code) = status {
                return Err(DemoError::WindowClosed(code));
            }
        };
        debug!(queued = queue.len(), "window ready");

        Ok(Self {
            input: PumpedInput::new(pump, queue),
            window,
        })
    }

    pub fn window(&self) -> Arc<Window> {
        Arc::clone(&self.window)
    }
}

impl InputSource for WindowHost {
    fn poll_event(&mut self) -> Option<InputEvent> {
        self.input.poll_event()
    }

    fn keys(&self) -> &InputState {
        self.input.keys()
    }
}
