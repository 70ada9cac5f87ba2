//! Tracing setup for binaries and embedders.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the host. [`init_logging`] installs a `tracing-subscriber` registry
//! configured from [`LoggingConfig`].

use std::env;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::error::Error;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Logging level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: LogLevel,
    /// Output format (JSON, Compact, Pretty)
    pub format: LogFormat,
    /// Whether to enable colored output
    pub enable_colors: bool,
    /// Whether to log span close events
    pub include_spans: bool,
    /// Custom environment filter, replaces the level based filter
    pub custom_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            enable_colors: true,
            include_spans: false,
            custom_filter: None,
        }
    }
}

impl LoggingConfig {
    /// Create logging configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level) = env::var("WALLET_REFRESH_LOG_LEVEL") {
            config.level = level.parse().unwrap_or(LogLevel::Info);
        }

        if let Ok(format) = env::var("WALLET_REFRESH_LOG_FORMAT") {
            config.format = format.parse().unwrap_or(LogFormat::Compact);
        }

        if let Ok(colors) = env::var("WALLET_REFRESH_LOG_COLORS") {
            config.enable_colors = colors.parse().unwrap_or(true);
        }

        if let Ok(spans) = env::var("WALLET_REFRESH_LOG_SPANS") {
            config.include_spans = spans.parse().unwrap_or(false);
        }

        // RUST_LOG wins over everything else
        if let Ok(filter) = env::var("RUST_LOG") {
            config.custom_filter = Some(filter);
        }

        config
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Filter directive used when no custom filter is set
    pub fn filter_directive(&self) -> String {
        match &self.custom_filter {
            Some(custom) => custom.clone(),
            None => format!(
                "wallet_refresh_sdk={},wallet_refresh={},tokio=warn",
                self.level.as_str(),
                self.level.as_str()
            ),
        }
    }
}

/// Supported logging levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

/// Supported log output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    /// Structured JSON format
    Json,
    /// Compact human-readable format
    Compact,
    /// Pretty human-readable format with indentation
    Pretty,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

/// Install the global subscriber, writing to stderr
pub fn init_logging(config: &LoggingConfig) -> Result<(), Error> {
    let env_filter = EnvFilter::try_new(config.filter_directive())
        .map_err(|e| Error::Config(format!("Failed to create environment filter: {}", e)))?;

    let span_events = if config.include_spans {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let result = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_span_events(span_events),
            )
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_span_events(span_events)
                    .with_ansi(config.enable_colors),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_span_events(span_events)
                    .with_ansi(config.enable_colors),
            )
            .try_init(),
    };

    result.map_err(|e| Error::Other(format!("Failed to install tracing subscriber: {}", e)))
}
