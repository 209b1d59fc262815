//! Capability gates for host access
//!
//! Each capability is either allowed or denied. The facade checks the gate
//! before touching the host, so a denial surfaces as
//! [`ProcessError::PermissionDenied`] instead of a host failure.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ProcessError, Result};

/// Host capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Environment variables
    Env,
    /// Arguments, executable path, working directory
    Read,
    /// File writes
    Write,
    /// Running commands and delivering signals
    Run,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Env => write!(f, "env"),
            Capability::Read => write!(f, "read"),
            Capability::Write => write!(f, "write"),
            Capability::Run => write!(f, "run"),
        }
    }
}

/// Permission level for a capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    #[default]
    Allow,
    Deny,
}

/// Per-capability levels
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Permissions {
    pub env: PermissionLevel,
    pub read: PermissionLevel,
    pub write: PermissionLevel,
    pub run: PermissionLevel,
}

impl Permissions {
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn deny_all() -> Self {
        Self {
            env: PermissionLevel::Deny,
            read: PermissionLevel::Deny,
            write: PermissionLevel::Deny,
            run: PermissionLevel::Deny,
        }
    }

    /// Set the level for one capability
    pub fn with(mut self, capability: Capability, level: PermissionLevel) -> Self {
        *self.slot(capability) = level;
        self
    }

    pub fn level(&self, capability: Capability) -> PermissionLevel {
        match capability {
            Capability::Env => self.env,
            Capability::Read => self.read,
            Capability::Write => self.write,
            Capability::Run => self.run,
        }
    }

    fn slot(&mut self, capability: Capability) -> &mut PermissionLevel {
        match capability {
            Capability::Env => &mut self.env,
            Capability::Read => &mut self.read,
            Capability::Write => &mut self.write,
            Capability::Run => &mut self.run,
        }
    }

    /// Fail with `PermissionDenied` unless `capability` is allowed
    pub fn check(&self, capability: Capability) -> Result<()> {
        match self.level(capability) {
            PermissionLevel::Allow => Ok(()),
            PermissionLevel::Deny => {
                warn!(%capability, "Permission denied");
                Err(ProcessError::PermissionDenied { capability })
            }
        }
    }
}
