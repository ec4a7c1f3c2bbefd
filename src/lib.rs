//! Small real-time rendering lessons sharing one frame driver.
//!
//! Each binary in `src/bin` opens a window, builds one [`view::render::Scene`]
//! and hands it to [`demos::run`], which owns the fixed-timestep loop.

pub mod config;
pub mod error;
pub mod logging;

// MVC layout
pub mod controller;
pub mod model;
pub mod view;

pub mod demos;
