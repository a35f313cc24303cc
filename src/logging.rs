//! tracing subscriber setup.
//!
//! Logs go to stderr so that results printed on stdout stay machine readable.
use armctl_derive::LayeredConfig;
use clap::{Args, ValueEnum};
use serde::Deserialize;
use thiserror::Error;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("failed to install log subscriber: {0}")]
    Init(String),
}

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Logger {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl Logger {
    pub fn new(level: LogLevel, format: LogFormat) -> Self {
        Self { level, format }
    }

    /// Installs the global subscriber. `RUST_LOG` takes precedence over the
    /// configured level when set.
    pub fn init(&self) -> Result<(), LoggingError> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(self.level.as_str())
                .map_err(|e| LoggingError::Filter(e.to_string()))?,
        };

        let registry = tracing_subscriber::registry().with(filter);
        let result = match self.format {
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_current_span(false)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
            LogFormat::Text => registry
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
        };
        result.map_err(|e| LoggingError::Init(e.to_string()))
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(LogLevel::Info, LogFormat::Text)
    }
}

#[derive(Args, Debug, Clone, Default, Deserialize, LayeredConfig)]
#[armctl(try_into = "Logger")]
pub struct LoggerArgs {
    /// Log verbosity
    #[arg(long = "verbosity", env = "ARMCTL_LOG_LEVEL", value_enum, global = true)]
    #[serde(rename = "log-level")]
    #[armctl(default = LogLevel::Info)]
    pub level: Option<LogLevel>,

    /// Log output format
    #[arg(long = "log-format", env = "ARMCTL_LOG_FORMAT", value_enum, global = true)]
    #[serde(rename = "log-format")]
    #[armctl(default = LogFormat::Text)]
    pub format: Option<LogFormat>,
}
