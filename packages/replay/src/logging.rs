use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Keeps the non-blocking file writer flushing until dropped
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub level: String,
    /// Daily-rolling `replay.log` goes here when set
    pub file_dir: Option<PathBuf>,
}

impl LogSettings {
    /// File output is opt-in through `ENABLE_FILE_LOGS`; `LOG_DIR` defaults to `./logs`
    pub fn from_env(level: &str) -> Self {
        Self::from_lookup(level, |key| std::env::var(key).ok())
    }

    pub fn from_lookup(level: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = lookup("ENABLE_FILE_LOGS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let file_dir = enabled.then(|| {
            lookup("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./logs"))
        });

        Self {
            level: level.to_string(),
            file_dir,
        }
    }
}

pub fn init_tracing(settings: &LogSettings) -> Option<FileLogGuard> {
    let env_filter =
        EnvFilter::try_new(&settings.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_writer, guard) = match settings.file_dir.as_deref().and_then(open_log_file) {
        Some((writer, guard)) => (Some(writer), Some(guard)),
        None => (None, None),
    };
    let file_layer = file_writer.map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .init();

    guard.map(|guard| FileLogGuard { _guard: guard })
}

fn open_log_file(dir: &Path) -> Option<(NonBlocking, WorkerGuard)> {
    if let Err(err) = std::fs::create_dir_all(dir) {
        // subscriber is not installed yet
        eprintln!("failed to create log directory {}: {err}", dir.display());
        return None;
    }
    let appender = RollingFileAppender::new(Rotation::DAILY, dir, "replay.log");
    Some(tracing_appender::non_blocking(appender))
}
