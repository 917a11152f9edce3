//! Process-wide tracing setup for lynkui binaries.

use crate::error::{LynkuiError, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub const LOG_DIR: &str = ".lynkui/logs";

/// Filter variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "LYNKUI_LOG";

/// notify reports every inotify hiccup at info level.
const DEFAULT_DIRECTIVES: &str = "info,notify=warn";

pub fn log_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(LOG_DIR)
}

#[derive(Debug, Clone)]
pub struct LogOptions {
    component: String,
    dir: PathBuf,
    to_stderr: bool,
    directives: Option<String>,
}

impl LogOptions {
    /// Daily files named after `component`, e.g. `watch.log.2024-01-21`,
    /// under `~/.lynkui/logs`.
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            dir: log_dir(),
            to_stderr: false,
            directives: None,
        }
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    /// Mirror events to stderr with colors.
    pub fn with_stderr(mut self, to_stderr: bool) -> Self {
        self.to_stderr = to_stderr;
        self
    }

    /// Directives used when neither `LYNKUI_LOG` nor `RUST_LOG` is set.
    pub fn with_directives(mut self, directives: impl Into<String>) -> Self {
        self.directives = Some(directives.into());
        self
    }

    fn filter(&self) -> EnvFilter {
        let from_env = [LOG_ENV, "RUST_LOG"]
            .into_iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()));
        let fallback = self.directives.as_deref().unwrap_or(DEFAULT_DIRECTIVES);
        match from_env {
            Some(directives) => EnvFilter::try_new(&directives).unwrap_or_else(|e| {
                eprintln!("ignoring log filter {:?}: {}", directives, e);
                EnvFilter::new(fallback)
            }),
            None => EnvFilter::new(fallback),
        }
    }

    /// Install the global subscriber. The returned guard flushes buffered
    /// lines when dropped, so it has to live as long as the process.
    pub fn init(self) -> Result<WorkerGuard> {
        std::fs::create_dir_all(&self.dir)?;
        let file_appender = tracing_appender::rolling::daily(&self.dir, &self.component);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true);
        let stderr_layer = self.to_stderr.then(|| {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_target(false)
        });

        tracing_subscriber::registry()
            .with(self.filter())
            .with(file_layer)
            .with(stderr_layer)
            .try_init()
            .map_err(|e| LynkuiError::Internal(format!("logging already set up: {}", e)))?;
        Ok(guard)
    }
}

/// `LogOptions::new(component).with_stderr(to_stderr).init()`.
pub fn init_logging(component: &str, to_stderr: bool) -> Result<WorkerGuard> {
    LogOptions::new(component).with_stderr(to_stderr).init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dir_is_under_home() {
        let options = LogOptions::new("watch");
        assert!(options.dir.ends_with(".lynkui/logs"));
        assert!(!options.to_stderr);
    }

    #[test]
    fn test_custom_directives_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let options = LogOptions::new("cli")
            .with_dir(dir.path())
            .with_directives("lynkui_core=debug");
        assert_eq!(options.dir, dir.path());
        assert_eq!(options.directives.as_deref(), Some("lynkui_core=debug"));
    }

    #[test]
    fn test_second_init_fails() {
        let dir = tempfile::tempdir().unwrap();
        let first = LogOptions::new("test").with_dir(dir.path()).init();
        let second = LogOptions::new("test").with_dir(dir.path()).init();
        drop(first);
        assert!(second.is_err());
    }
}
