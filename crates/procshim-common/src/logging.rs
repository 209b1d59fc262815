//! Logging setup for procshim binaries and tests
//!
//! Installs a `tracing-subscriber` fmt layer whose filter comes from the
//! `PROCSHIM_LOG` environment variable, falling back to the configured level.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive
pub const LOG_ENV_VAR: &str = "PROCSHIM_LOG";

/// Minimum log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
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
    /// Convert to a filter directive
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

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

/// Logging configuration options
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Level used when `PROCSHIM_LOG` is unset
    pub level: LogLevel,
    /// Include target module paths in each line
    pub with_target: bool,
}

/// Build the filter: `PROCSHIM_LOG` wins, else the configured level
pub fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Initialize the global subscriber. Safe to call more than once; later calls
/// are no-ops.
pub fn init(options: LogOptions) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(options.level))
        .with_target(options.with_target)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Format an error with cause chain
pub fn format_error(error: &dyn std::error::Error) -> String {
    format_error_recursive(error, 0)
}

fn format_error_recursive(error: &dyn std::error::Error, depth: usize) -> String {
    const MAX_DEPTH: usize = 10;

    if depth >= MAX_DEPTH {
        return error.to_string();
    }

    let base = error.to_string();

    if let Some(source) = error.source() {
        format!("{} Caused by: {}", base, format_error_recursive(source, depth + 1))
    } else {
        base
    }
}
