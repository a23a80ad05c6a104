//! logging
//!
//! Structured logging to `<home>/logs/`.
//!
//! # Layers
//!
//! - File: every event at or above the configured level, without ANSI codes,
//!   written through a non-blocking daily-rotating appender to
//!   `logs/aio.log.<YYYY-MM-DD>`
//! - Stderr: added by `--debug`
//!
//! The filter comes from `AIO_LOG` when set (same syntax as `RUST_LOG`),
//! otherwise from `[logging] level`.
//!
//! Log files older than `[logging] retention_days` are removed at startup.

use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Environment variable holding a log filter directive.
pub const LOG_ENV: &str = "AIO_LOG";

/// File name prefix of the daily log files.
pub const LOG_FILE_PREFIX: &str = "aio.log";

/// Logging setup for one process.
#[derive(Debug, Clone)]
pub struct LogSettings<'a> {
    /// Directory receiving log files.
    pub dir: &'a Path,
    /// Default level when `AIO_LOG` is unset.
    pub level: &'a str,
    /// Mirror events to stderr.
    pub stderr: bool,
    /// Remove files older than this many days.
    pub retention_days: u64,
}

/// Keeps the background log writer alive; flushes when dropped.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// File logging problems never stop the program: they are reported on
/// stderr and logging continues without the file layer.
pub fn init(settings: LogSettings<'_>) -> LogGuard {
    let default_level = settings
        .level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::DEBUG);
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let mut guard = None;
    let mut setup_error = None;
    let mut pruned = 0;

    match fs::create_dir_all(settings.dir) {
        Ok(()) => {
            let max_age = Duration::from_secs(settings.retention_days.saturating_mul(24 * 60 * 60));
            match prune_logs(settings.dir, LOG_FILE_PREFIX, max_age, SystemTime::now()) {
                Ok(n) => pruned = n,
                Err(e) => setup_error = Some(format!("log retention failed: {}", e)),
            }

            let appender = tracing_appender::rolling::daily(settings.dir, LOG_FILE_PREFIX);
            let (writer, file_guard) = tracing_appender::non_blocking(appender);
            layers.push(Box::new(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_names(true),
            ));
            guard = Some(file_guard);
        }
        Err(e) => {
            setup_error = Some(format!(
                "cannot create log directory {}: {}",
                settings.dir.display(),
                e
            ))
        }
    }

    if settings.stderr {
        layers.push(Box::new(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(io::stderr)
                .with_target(false),
        ));
    }

    // A second init (tests running in one process) keeps the first subscriber.
    let _ = Registry::default().with(layers).with(filter).try_init();

    if pruned > 0 {
        tracing::info!(pruned, "old log files removed");
    }
    if let Some(error) = setup_error {
        eprintln!("warning: {}", error);
    }

    LogGuard { _file: guard }
}

/// Remove files in `dir` starting with `prefix` last modified before `now - max_age`.
///
/// Returns the number of files removed.
pub fn prune_logs(dir: &Path, prefix: &str, max_age: Duration, now: SystemTime) -> io::Result<usize> {
    let cutoff = now.checked_sub(max_age).unwrap_or(SystemTime::UNIX_EPOCH);
    let mut removed = 0;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(prefix) {
            continue;
        }
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified().unwrap_or(now);
        if modified < cutoff && fs::remove_file(entry.path()).is_ok() {
            removed += 1;
        }
    }

    Ok(removed)
}
