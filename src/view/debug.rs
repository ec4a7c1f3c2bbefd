//! Per-frame GPU error checking.
//!
//! Wrapping a block of GPU work in [`ErrorCheck::begin`] / [`ErrorCheck::end`]
//! captures every validation and out-of-memory error it raised. Each one is
//! logged with its kind and a label naming the checked work.

use tracing::error;

/// Short name for an error kind, in the style of a GL error enum.
pub fn error_kind(err: &wgpu::Error) -> &'static str {
    #[allow(unreachable_patterns)]
    match err {
        wgpu::Error::OutOfMemory { .. } => "OUT_OF_MEMORY",
        wgpu::Error::Validation { .. } => "VALIDATION",
        wgpu::Error::Internal { .. } => "INTERNAL",
        _ => "UNKNOWN",
    }
}

/// Render a captured error as `KIND | label`.
pub fn describe(kind: &str, label: &str) -> String {
    format!("{kind} | {label}")
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorCheck {
    open: bool,
}

impl ErrorCheck {
    pub fn begin(&mut self, device: &wgpu::Device) {
        if self.open {
            return;
        }
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        self.open = true;
    }

    /// Close the scopes opened by `begin` and log what they caught.
    pub fn end(&mut self, device: &wgpu::Device, label: &str) {
        if !self.open {
            return;
        }
        self.open = false;

        let validation = pollster::block_on(device.pop_error_scope());
        let out_of_memory = pollster::block_on(device.pop_error_scope());
        for err in [validation, out_of_memory].into_iter().flatten() {
            error!(target: "gpu", "{}\n{err}", describe(error_kind(&err), label));
        }
    }
}
