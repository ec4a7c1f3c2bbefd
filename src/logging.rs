use std::env;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Log file used when `RUST_LOG_FILE` is unset.
pub fn default_log_path(demo: &str) -> PathBuf {
    Path::new("logs").join(format!("{demo}.log"))
}

/// Install the global subscriber for one demo binary. Calling it twice is
/// harmless; the second registry is rejected and the first keeps running.
pub fn init(demo: &str) {
    // Env filter: use RUST_LOG or default to info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .compact();

    let log_path = env::var_os("RUST_LOG_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| default_log_path(demo));
    let directory = log_path.parent().unwrap_or(Path::new("."));
    let file_name = log_path.file_name().unwrap_or(OsStr::new("demo.log"));
    let (nb_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(directory, file_name));
    let _ = FILE_GUARD.set(guard);

    let file_layer = fmt::layer()
        .with_writer(nb_writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .compact();

    if tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_err()
    {
        return;
    }

    // Hook panics to log with backtrace
    std::panic::set_hook(Box::new(|info| {
        let mut msg = String::new();
        if let Some(loc) = info.location() {
            msg.push_str(&format!("panic at {}:{}:{} ", loc.file(), loc.line(), loc.column()));
        }
        if let Some(s) = info.payload().downcast_ref::<&str>() {
            msg.push_str(s);
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            msg.push_str(s);
        } else {
            msg.push_str("<non-string panic>");
        }
        let bt = std::backtrace::Backtrace::force_capture();
        tracing::error!("{}\nBacktrace:\n{:?}", msg, bt);
    }));

    tracing::debug!(demo, path = %log_path.display(), "logging initialised");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_is_named_after_the_demo() {
        assert_eq!(default_log_path("skybox"), PathBuf::from("logs/skybox.log"));
    }
}
