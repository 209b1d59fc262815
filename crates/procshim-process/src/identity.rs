//! Process owner identity: uid, gid and supplementary groups
//!
//! Resolved once per facade. The native strategy asks the OS directly; the
//! command strategy runs `id` (or a configured replacement) and parses lines
//! such as:
//!
//! ```text
//! uid=501(alice) gid=20(staff) groups=20(staff),12(everyone),61(localaccounts)
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::IdentityConfig;
use crate::error::{ProcessError, Result};
use crate::host::Host;
use crate::permissions::{Capability, Permissions};

/// One `id(name)` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdEntry {
    pub id: u32,
    pub name: Option<String>,
}

impl IdEntry {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
        }
    }

    pub fn unnamed(id: u32) -> Self {
        Self { id, name: None }
    }
}

/// Credentials of the process owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessIdentity {
    pub uid: IdEntry,
    pub gid: IdEntry,
    /// Present only when it differs from `uid`
    pub euid: Option<IdEntry>,
    /// Present only when it differs from `gid`
    pub egid: Option<IdEntry>,
    pub groups: Vec<IdEntry>,
}

impl ProcessIdentity {
    pub fn effective_uid(&self) -> &IdEntry {
        self.euid.as_ref().unwrap_or(&self.uid)
    }

    pub fn effective_gid(&self) -> &IdEntry {
        self.egid.as_ref().unwrap_or(&self.gid)
    }

    pub fn group_ids(&self) -> Vec<u32> {
        self.groups.iter().map(|g| g.id).collect()
    }
}

/// How identity is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityStrategy {
    /// Native accessor when the host has one, else the command
    #[default]
    Auto,
    Native,
    Command,
}

/// Parse the output of `id`.
///
/// `uid` and `gid` are required, `euid`/`egid`/`groups` optional, other keys
/// (for example SELinux `context=`) are skipped.
pub fn parse_ids(text: &str) -> Result<ProcessIdentity> {
    let mut uid = None;
    let mut gid = None;
    let mut euid = None;
    let mut egid = None;
    let mut groups = Vec::new();

    for token in tokens(text) {
        let (key, value) = token
            .split_once('=')
            .ok_or_else(|| ProcessError::Parse(format!("expected key=value, got `{}`", token)))?;

        match key {
            "uid" => uid = Some(parse_entry(key, value)?),
            "gid" => gid = Some(parse_entry(key, value)?),
            "euid" => euid = Some(parse_entry(key, value)?),
            "egid" => egid = Some(parse_entry(key, value)?),
            "groups" => {
                groups = value
                    .split(',')
                    .filter(|g| !g.is_empty())
                    .map(|g| parse_entry(key, g))
                    .collect::<Result<Vec<_>>>()?;
            }
            other => debug!(key = other, "Skipping identity field"),
        }
    }

    Ok(ProcessIdentity {
        uid: uid.ok_or_else(|| ProcessError::Parse("missing uid".to_string()))?,
        gid: gid.ok_or_else(|| ProcessError::Parse("missing gid".to_string()))?,
        euid,
        egid,
        groups,
    })
}

/// Split on whitespace, rejoining names that contain spaces
/// (`groups=100(domain users)`).
fn tokens(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for word in text.split_whitespace() {
        match out.last_mut() {
            Some(prev) if prev.matches('(').count() > prev.matches(')').count() => {
                prev.push(' ');
                prev.push_str(word);
            }
            _ => out.push(word.to_string()),
        }
    }
    out
}

fn parse_entry(key: &str, raw: &str) -> Result<IdEntry> {
    let (id, name) = match raw.split_once('(') {
        Some((id, rest)) => {
            let name = rest.strip_suffix(')').ok_or_else(|| {
                ProcessError::Parse(format!("unterminated name in {}={}", key, raw))
            })?;
            (id, Some(name.to_string()))
        }
        None => (raw, None),
    };

    let id = id
        .parse::<u32>()
        .map_err(|_| ProcessError::Parse(format!("invalid id in {}={}", key, raw)))?;

    Ok(IdEntry { id, name })
}

/// Resolve identity. `Ok(None)` means the platform has no POSIX credentials.
pub fn resolve_identity(
    host: &dyn Host,
    config: &IdentityConfig,
    permissions: &Permissions,
) -> Result<Option<ProcessIdentity>> {
    if !host.platform().has_posix_ids() {
        debug!(platform = host.platform().as_node_str(), "No POSIX identity on platform");
        return Ok(None);
    }

    if config.strategy != IdentityStrategy::Command {
        match host.native_identity() {
            Some(identity) => return identity.map(Some),
            None if config.strategy == IdentityStrategy::Native => {
                return Err(ProcessError::NotImplemented {
                    member: "native identity",
                });
            }
            None => debug!("No native identity accessor, falling back to command"),
        }
    }

    permissions.check(Capability::Run)?;

    let stdout = host
        .exec_capture(&config.command, &config.args)
        .map_err(|e| match e {
            ProcessError::PermissionDenied { .. } => e,
            other => {
                warn!(command = %config.command, error = %other, "Identity command failed");
                ProcessError::Parse(other.to_string())
            }
        })?;

    parse_ids(&String::from_utf8_lossy(&stdout)).map(Some)
}
