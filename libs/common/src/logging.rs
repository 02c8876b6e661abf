//! Logging bootstrap for tracker bridge services
//!
//! One call installs console output (and optionally a daily-rolling log file)
//! behind a single `EnvFilter`. `RUST_LOG` wins over the configured level.

use std::path::Path;

use errors::{Result, TrackerError};
use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// Log level or filter directive (trace, debug, info, warn, error, `trackersrv=debug`)
    pub level: String,
    /// Console output format
    pub format: LogFormat,
    /// Enable ANSI colors in console output
    pub ansi: bool,
    /// Optional log file; rotated daily next to the given path
    pub file: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `timestamp [LEVEL] message`
    #[default]
    Plain,
    Pretty,
    Compact,
    Json,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Plain,
            ansi: true,
            file: None,
        }
    }
}

/// Custom format for log level with brackets: `[INFO]`, `[WARN]`, etc.
fn format_level(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "[TRACE]",
        Level::DEBUG => "[DEBUG]",
        Level::INFO => "[INFO]",
        Level::WARN => "[WARN]",
        Level::ERROR => "[ERROR]",
    }
}

/// Event formatter that outputs: `timestamp [LEVEL] message`
///
/// Example output: `2025-12-02T00:50:44.809Z [INFO] Coordinator started`
struct BracketedLevelFormat;

impl<S, N> FormatEvent<S, N> for BracketedLevelFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = chrono::Utc::now();
        write!(writer, "{} ", now.format("%Y-%m-%dT%H:%M:%S%.3fZ"))?;

        let level = *event.metadata().level();
        if writer.has_ansi_escapes() {
            let color = match level {
                Level::TRACE => "\x1b[35m",
                Level::DEBUG => "\x1b[34m",
                Level::INFO => "\x1b[32m",
                Level::WARN => "\x1b[33m",
                Level::ERROR => "\x1b[31m",
            };
            write!(writer, "{}{}\x1b[0m ", color, format_level(&level))?;
        } else {
            write!(writer, "{} ", format_level(&level))?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Build the event filter: `RUST_LOG` first, then the configured level
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level)
        .map_err(|e| TrackerError::invalid_config("logging.level", e.to_string()))
}

/// Initialize logging with the given configuration
///
/// Returns a guard that must be kept alive for file logging to flush.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let mut layers = Vec::new();
    let mut guard = None;

    let console_layer = match config.format {
        LogFormat::Plain => fmt::layer()
            .event_format(BracketedLevelFormat)
            .with_ansi(config.ansi)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_ansi(config.ansi)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_ansi(config.ansi)
            .with_target(true)
            .boxed(),
        LogFormat::Json => fmt::layer().json().with_target(true).boxed(),
    };
    layers.push(console_layer.with_filter(build_filter(&config.level)?).boxed());

    if let Some(file_path) = &config.file {
        let path = Path::new(file_path);
        let directory = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(directory)?;

        let file_appender = tracing_appender::rolling::daily(
            directory,
            path.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("trackersrv.log"),
        );
        let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(file_guard);

        let file_layer = match config.format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_target(true)
                .boxed(),
            _ => fmt::layer()
                .event_format(BracketedLevelFormat)
                .with_writer(non_blocking)
                .with_ansi(false)
                .boxed(),
        };
        layers.push(file_layer.with_filter(build_filter(&config.level)?).boxed());
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| TrackerError::config(format!("Failed to initialize logging: {}", e)))?;

    Ok(guard)
}
