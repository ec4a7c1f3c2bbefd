// CONTROLLER: input dispatch and the frame loop
pub mod camera_controller;
pub mod frame_loop;
pub mod input;

pub use camera_controller::{CameraController, Dispatch};
pub use frame_loop::{FrameContext, FrameDriver, RenderTarget, Throttle};
pub use input::{
    EventPump, EventQueue, InputEvent, InputProcessor, InputSource, InputState, Key, KeyBindings, PumpedInput,
};
