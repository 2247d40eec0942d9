use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "focusmask.log";

/// Initialise logging into a daily-rolling file under `dir`.
///
/// The default level is `debug` in debug builds and `info` in release builds;
/// `RUST_LOG` overrides it. Writes go through a background worker so hook
/// callbacks never wait on disk. Keep the returned guard alive until exit or
/// buffered lines are lost. Falls back to stderr when `dir` cannot be created.
pub fn init(dir: &Path) -> Option<WorkerGuard> {
    let default_level = if cfg!(debug_assertions) { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if std::fs::create_dir_all(dir).is_err() {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
        return None;
    }

    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    Some(guard)
}
