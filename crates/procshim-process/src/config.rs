//! Facade configuration
//!
//! Loaded from an optional TOML file plus `PROCSHIM__SECTION__KEY`
//! environment overrides, e.g. `PROCSHIM__PERMISSIONS__ENV=deny`.

use std::path::PathBuf;

use config::{Config, Environment, File};
use procshim_common::LogLevel;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProcessError, Result};
use crate::events::DEFAULT_CAPACITY;
use crate::identity::IdentityStrategy;
use crate::permissions::Permissions;

/// Environment prefix for overrides
pub const ENV_PREFIX: &str = "PROCSHIM";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShimConfig {
    pub identity: IdentityConfig,
    pub permissions: Permissions,
    pub warnings: WarningConfig,
    pub events: EventConfig,
    pub logging: LoggingConfig,
}

/// Identity resolution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub strategy: IdentityStrategy,
    /// Command used by the command strategy
    pub command: String,
    pub args: Vec<String>,
    /// Resolve while constructing the facade instead of on first query
    pub eager: bool,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            strategy: IdentityStrategy::Auto,
            command: "id".to_string(),
            args: Vec::new(),
            eager: false,
        }
    }
}

/// Warning handling
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WarningConfig {
    /// Drop `DeprecationWarning`s
    pub no_deprecation: bool,
    /// Publish warnings without logging them
    pub silent: bool,
}

/// Event bus settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    pub capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

impl ShimConfig {
    pub fn validate(&self) -> Result<()> {
        if self.events.capacity == 0 {
            return Err(ProcessError::Config(
                "events.capacity must be greater than 0".to_string(),
            ));
        }
        if self.identity.command.trim().is_empty() {
            return Err(ProcessError::Config(
                "identity.command must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads [`ShimConfig`] from file and environment
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_path: PathBuf,
    env_prefix: String,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Use a specific config file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// `<config dir>/procshim/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("procshim")
            .join("config.toml")
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Build and validate. A missing file is not an error.
    pub fn load(&self) -> Result<ShimConfig> {
        debug!(path = %self.config_path.display(), "Loading configuration");

        let config: ShimConfig = Config::builder()
            .add_source(File::from(self.config_path.clone()).required(false))
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
