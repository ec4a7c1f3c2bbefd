// MODEL: camera, timing and per-demo state
pub mod camera;
pub mod clock;
pub mod state;

pub use camera::{Camera, Movement};
pub use clock::{Clock, FrameClock, SystemClock};
pub use state::{Controls, DemoState, MouseTracker, Toggle};
