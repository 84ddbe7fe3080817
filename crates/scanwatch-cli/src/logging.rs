//! Logging and tracing setup for the scanwatch binary
//!
//! Console output goes to stderr so `--json` output on stdout stays clean.
//! A JSON copy of every event is written to a daily-rolling file.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory where log files should be written
    pub log_dir: PathBuf,

    /// File name prefix of the rolling log
    pub file_name: String,

    /// Whether to write JSON logs to `log_dir`
    pub enable_file_logs: bool,

    /// Whether to log to the console
    pub enable_console_logs: bool,

    /// Whether to include file/line information in console logs
    pub include_location: bool,

    /// Default log level filter. A `scanwatch` directive also covers the
    /// `scanwatch_*` library crates since targets match by prefix.
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            file_name: "scanwatch.log".to_string(),
            enable_file_logs: true,
            enable_console_logs: true,
            include_location: cfg!(debug_assertions),
            default_filter: "warn,scanwatch=info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Verbose console output for `--verbose`
    pub fn verbose(mut self) -> Self {
        self.default_filter = "info,scanwatch=debug".to_string();
        self
    }

    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self
    }
}

/// Initialize the global subscriber.
///
/// The returned guard flushes the file writer when dropped; keep it alive
/// for the whole run.
pub fn init(config: LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    // RUST_LOG takes precedence over the default filter
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let mut layers = Vec::new();

    if config.enable_console_logs {
        let console_layer = fmt::layer()
            .with_target(false)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(std::io::stderr)
            .compact()
            .with_filter(env_filter.clone())
            .boxed();
        layers.push(console_layer);
    }

    let mut guard = None;
    if config.enable_file_logs {
        std::fs::create_dir_all(&config.log_dir)?;
        let file_appender = tracing_appender::rolling::daily(&config.log_dir, &config.file_name);
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_writer(non_blocking)
            .with_filter(env_filter)
            .boxed();
        layers.push(json_layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::debug!(
        log_dir = %config.log_dir.display(),
        file_logs = config.enable_file_logs,
        "logging initialized"
    );
    Ok(guard)
}
