//! Process warnings (`emitWarning`)

use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// Warning type suppressed by `no_deprecation`
pub const DEPRECATION_WARNING: &str = "DeprecationWarning";

/// Shared error value forwarded as a warning
pub type SharedError = Arc<dyn StdError + Send + Sync>;

/// What was passed to `emit_warning`
#[derive(Debug, Clone)]
pub enum Warning {
    Message(String),
    /// An error value; forwarded untouched
    Error(SharedError),
}

impl Warning {
    pub fn error<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Warning::Error(Arc::new(err))
    }
}

impl From<&str> for Warning {
    fn from(message: &str) -> Self {
        Warning::Message(message.to_string())
    }
}

impl From<String> for Warning {
    fn from(message: String) -> Self {
        Warning::Message(message)
    }
}

/// Structured `emit_warning` options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarningOptions {
    pub warning_type: Option<String>,
    pub code: Option<String>,
    pub detail: Option<String>,
    /// Name the stack trace starts from
    pub ctor: Option<String>,
}

impl WarningOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warning_type(mut self, warning_type: impl Into<String>) -> Self {
        self.warning_type = Some(warning_type.into());
        self
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn ctor(mut self, ctor: impl Into<String>) -> Self {
        self.ctor = Some(ctor.into());
        self
    }
}

/// A bare string is the positional `type` argument
impl From<&str> for WarningOptions {
    fn from(warning_type: &str) -> Self {
        WarningOptions::new().warning_type(warning_type)
    }
}

impl From<Option<WarningOptions>> for WarningOptions {
    fn from(options: Option<WarningOptions>) -> Self {
        options.unwrap_or_default()
    }
}

/// Normalized warning payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarningRecord {
    #[serde(rename = "type")]
    pub warning_type: Option<String>,
    pub code: Option<String>,
    pub detail: Option<String>,
    pub stack: String,
    pub message: String,
    pub name: String,
}

impl WarningRecord {
    pub fn new(message: impl Into<String>, options: WarningOptions) -> Self {
        let message = message.into();
        let head = options.ctor.as_deref().unwrap_or("Warning");
        let mut stack = format!("{}: {}", head, message);

        let trace = Backtrace::capture();
        if trace.status() == BacktraceStatus::Captured {
            stack.push('\n');
            stack.push_str(&trace.to_string());
        }

        Self {
            warning_type: options.warning_type,
            code: options.code,
            detail: options.detail,
            stack,
            message,
            name: "Warning".to_string(),
        }
    }

    pub fn is_deprecation(&self) -> bool {
        self.warning_type.as_deref() == Some(DEPRECATION_WARNING)
    }
}

/// Payload of a `warning` event
#[derive(Debug, Clone)]
pub enum WarningEvent {
    Record(WarningRecord),
    Error(SharedError),
}

impl WarningEvent {
    pub fn message(&self) -> String {
        match self {
            WarningEvent::Record(record) => record.message.clone(),
            WarningEvent::Error(err) => err.to_string(),
        }
    }
}

impl fmt::Display for WarningEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningEvent::Record(record) => {
                if let Some(code) = &record.code {
                    write!(f, "[{}] ", code)?;
                }
                write!(
                    f,
                    "{}: {}",
                    record.warning_type.as_deref().unwrap_or("Warning"),
                    record.message
                )?;
                if let Some(detail) = &record.detail {
                    write!(f, "\n{}", detail)?;
                }
                Ok(())
            }
            WarningEvent::Error(err) => write!(f, "{}", err),
        }
    }
}
