//! Logging configuration
//!
//! Describes how the embedding process reports its own diagnostics. The sink
//! library never installs a subscriber itself; an application calls
//! [`init_logging`] once at startup if it wants the default setup.

use serde::Deserialize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::error::{ConfigError, Result};

/// Log level
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    /// Normal operation (default)
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Convert to tracing level filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable console output (default)
    #[default]
    Console,
    /// One JSON object per line
    Json,
}

/// Logging configuration
///
/// ```toml
/// [log]
/// level = "info"
/// format = "console"
/// sink_level = "debug"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Global level
    pub level: LogLevel,

    /// Output format
    pub format: LogFormat,

    /// Optional override for the sink crate's own diagnostics
    pub sink_level: Option<LogLevel>,
}

impl LogConfig {
    /// Build an `EnvFilter` directive string, e.g. `info,logspool_sinks=debug`
    pub fn directive(&self) -> String {
        match self.sink_level {
            Some(sink) => format!("{},logspool_sinks={}", self.level.as_str(), sink.as_str()),
            None => self.level.as_str().to_string(),
        }
    }
}

/// Install a process-wide tracing subscriber for the given config
///
/// `RUST_LOG`, when set, takes precedence over the configured directive.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.directive()))
        .map_err(|e| ConfigError::Logging(e.to_string()))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Console => registry
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };

    result.map_err(|e| ConfigError::Logging(e.to_string()))
}
