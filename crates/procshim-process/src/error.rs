//! Error types for the process facade

use std::io;
use thiserror::Error;

use crate::permissions::Capability;

/// Process facade errors
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Member of the Node.js surface that is not supported
    #[error("Not implemented: process.{member}")]
    NotImplemented { member: &'static str },

    /// Identity source produced output that does not match `key=id(name)`
    #[error("Failed to parse process identity: {0}")]
    Parse(String),

    /// Signal target does not exist
    #[error("Process not found (PID: {pid})")]
    ProcessNotFound { pid: i32 },

    /// Host gated the requested capability
    #[error("Permission denied: requires {capability} access")]
    PermissionDenied { capability: Capability },

    /// Signal name or number not in the platform table
    #[error("Unknown signal: {0}")]
    InvalidSignal(String),

    /// `exit` was already called
    #[error("Process is already exiting")]
    AlreadyExiting,

    /// A global process facade is already registered
    #[error("Global process facade already installed")]
    GlobalAlreadyInstalled,

    /// Signal delivery failed for a reason other than a missing target
    #[error("Failed to deliver signal: {0}")]
    Signal(String),

    /// External command ran but did not succeed
    #[error("Command `{command}` failed: {reason}")]
    CommandFailed { command: String, reason: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<config::ConfigError> for ProcessError {
    fn from(err: config::ConfigError) -> Self {
        ProcessError::Config(err.to_string())
    }
}

/// Result type for process operations
pub type Result<T> = std::result::Result<T, ProcessError>;

pub(crate) fn not_implemented<T>(member: &'static str) -> Result<T> {
    tracing::debug!(member, "Unimplemented process member called");
    Err(ProcessError::NotImplemented { member })
}
