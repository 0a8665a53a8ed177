// src/log.rs
//
// Diagnostic logging. Call sites use logf!/logd!/loge!; those forward to
// `tracing`, and `init` decides where the events land:
// - stderr, filtered by RUST_LOG (default "warn", the run trail goes to stdout)
// - `<dir>/debug.log.<date>`, everything at debug and above
use std::{fs, path::Path, sync::OnceLock};

use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

pub const LOG_FILE: &str = "debug.log";

static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Daily file under `dir`, or `None` if the directory can't be used.
fn file_appender(dir: &Path) -> Option<RollingFileAppender> {
    if let Err(e) = fs::create_dir_all(dir) {
        eprintln!("File log disabled: {}: {e}", dir.display());
        return None;
    }
    match RollingFileAppender::builder().rotation(Rotation::DAILY).filename_prefix(LOG_FILE).build(dir) {
        Ok(appender) => Some(appender),
        Err(e) => {
            eprintln!("File log disabled: {}: {e}", dir.display());
            None
        }
    }
}

/// Install the global subscriber. A second call is a no-op.
/// Without a usable `dir` only the stderr layer is installed.
pub fn init(dir: &Path) {
    if GUARD.get().is_some() {
        return;
    }

    let (file_layer, guard) = match file_appender(dir) {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(LevelFilter::DEBUG);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .try_init();

    // Keep the writer alive only if our subscriber won.
    if let (Ok(()), Some(guard)) = (installed, guard) {
        let _ = GUARD.set(guard);
    }
}

/// Info-level logging
#[macro_export]
macro_rules! logf {
    ($($arg:tt)*) => {
        ::tracing::info!($($arg)*)
    };
}

/// Debug-level logging
#[macro_export]
macro_rules! logd {
    ($($arg:tt)*) => {
        ::tracing::debug!($($arg)*)
    };
}

/// Error-level logging
#[macro_export]
macro_rules! loge {
    ($($arg:tt)*) => {
        ::tracing::error!($($arg)*)
    };
}
