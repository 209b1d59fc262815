//! Host runtime boundary
//!
//! Everything the facade needs from the outside world goes through [`Host`]:
//! environment, arguments, working directory, exit, signal delivery, the
//! monotonic clock, platform identifiers, command execution and load average.
//! [`SystemHost`] backs it with the real OS.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProcessError, Result};
use crate::identity::ProcessIdentity;

/// Operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Darwin,
    Windows,
    FreeBsd,
    OpenBsd,
    NetBsd,
    Other,
}

impl Platform {
    /// Platform of the running binary
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map a Rust `target_os` value
    pub fn from_os(os: &str) -> Self {
        match os {
            "linux" | "android" => Platform::Linux,
            "macos" | "ios" => Platform::Darwin,
            "windows" => Platform::Windows,
            "freebsd" => Platform::FreeBsd,
            "openbsd" => Platform::OpenBsd,
            "netbsd" => Platform::NetBsd,
            _ => Platform::Other,
        }
    }

    /// Node.js `process.platform` string
    pub fn as_node_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Darwin => "darwin",
            Platform::Windows => "win32",
            Platform::FreeBsd => "freebsd",
            Platform::OpenBsd => "openbsd",
            Platform::NetBsd => "netbsd",
            Platform::Other => "unknown",
        }
    }

    /// Whether the platform has POSIX process credentials
    pub fn has_posix_ids(&self) -> bool {
        !matches!(self, Platform::Windows | Platform::Other)
    }
}

/// Map a Rust `target_arch` to Node.js `process.arch`
pub fn node_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "x64",
        "x86" => "ia32",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64",
        other => other,
    }
}

/// Host runtime primitives
pub trait Host: Send + Sync {
    fn platform(&self) -> Platform;

    /// Node.js-style architecture name
    fn arch(&self) -> &str;

    fn pid(&self) -> u32;

    fn ppid(&self) -> u32;

    fn env(&self) -> Result<BTreeMap<String, String>>;

    /// Arguments after the executable
    fn args(&self) -> Result<Vec<String>>;

    /// Executable name as invoked
    fn argv0(&self) -> Result<String>;

    fn exec_path(&self) -> Result<PathBuf>;

    fn cwd(&self) -> Result<PathBuf>;

    fn chdir(&self, dir: &Path) -> Result<()>;

    /// Terminate with `code`. Real hosts do not return.
    fn exit(&self, code: i32);

    /// Deliver `signal` to `pid`; signal `0` only checks that `pid` exists
    fn kill(&self, pid: i32, signal: i32) -> Result<()>;

    /// Monotonic milliseconds since an arbitrary origin
    fn monotonic_millis(&self) -> f64;

    /// Run a command and capture its standard output
    fn exec_capture(&self, command: &str, args: &[String]) -> Result<Vec<u8>>;

    /// 1- and 5-minute load averages
    fn load_average(&self) -> (f64, f64);

    /// Credentials read through a structured OS accessor, `None` when the
    /// host has none
    fn native_identity(&self) -> Option<Result<ProcessIdentity>>;
}

static TIME_ORIGIN: Lazy<Instant> = Lazy::new(Instant::now);

/// Host backed by the operating system
#[derive(Debug, Clone)]
pub struct SystemHost {
    platform: Platform,
    arch: &'static str,
}

impl SystemHost {
    pub fn new() -> Self {
        Lazy::force(&TIME_ORIGIN);
        Self {
            platform: Platform::current(),
            arch: node_arch(std::env::consts::ARCH),
        }
    }
}

impl Default for SystemHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for SystemHost {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn arch(&self) -> &str {
        self.arch
    }

    fn pid(&self) -> u32 {
        std::process::id()
    }

    fn ppid(&self) -> u32 {
        #[cfg(unix)]
        {
            std::os::unix::process::parent_id()
        }
        #[cfg(not(unix))]
        {
            0
        }
    }

    fn env(&self) -> Result<BTreeMap<String, String>> {
        Ok(std::env::vars_os()
            .map(|(k, v)| (k.to_string_lossy().into_owned(), v.to_string_lossy().into_owned()))
            .collect())
    }

    fn args(&self) -> Result<Vec<String>> {
        Ok(std::env::args_os()
            .skip(1)
            .map(|a| a.to_string_lossy().into_owned())
            .collect())
    }

    fn argv0(&self) -> Result<String> {
        Ok(std::env::args_os()
            .next()
            .map(|a| a.to_string_lossy().into_owned())
            .unwrap_or_default())
    }

    fn exec_path(&self) -> Result<PathBuf> {
        Ok(std::env::current_exe()?)
    }

    fn cwd(&self) -> Result<PathBuf> {
        Ok(std::env::current_dir()?)
    }

    fn chdir(&self, dir: &Path) -> Result<()> {
        Ok(std::env::set_current_dir(dir)?)
    }

    fn exit(&self, code: i32) {
        std::process::exit(code)
    }

    #[cfg(unix)]
    fn kill(&self, pid: i32, signal: i32) -> Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        let sig = match signal {
            0 => None,
            n => Some(
                Signal::try_from(n).map_err(|_| ProcessError::InvalidSignal(n.to_string()))?,
            ),
        };

        match signal::kill(Pid::from_raw(pid), sig) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => Err(ProcessError::ProcessNotFound { pid }),
            Err(Errno::EPERM) => Err(ProcessError::PermissionDenied {
                capability: crate::permissions::Capability::Run,
            }),
            Err(e) => Err(ProcessError::Signal(format!("{} to {}: {}", signal, pid, e))),
        }
    }

    #[cfg(not(unix))]
    fn kill(&self, _pid: i32, _signal: i32) -> Result<()> {
        Err(ProcessError::NotImplemented { member: "kill" })
    }

    fn monotonic_millis(&self) -> f64 {
        TIME_ORIGIN.elapsed().as_secs_f64() * 1_000.0
    }

    fn exec_capture(&self, command: &str, args: &[String]) -> Result<Vec<u8>> {
        debug!(command, args = ?args, "Running command");

        let output = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .output()?;

        if !output.status.success() {
            return Err(ProcessError::CommandFailed {
                command: command.to_string(),
                reason: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(output.stdout)
    }

    fn load_average(&self) -> (f64, f64) {
        let load = sysinfo::System::load_average();
        (load.one, load.five)
    }

    #[cfg(all(unix, not(any(target_os = "macos", target_os = "ios"))))]
    fn native_identity(&self) -> Option<Result<ProcessIdentity>> {
        Some(native::read_identity())
    }

    // nix has no getgroups on Apple targets; the `id` command covers them
    #[cfg(not(all(unix, not(any(target_os = "macos", target_os = "ios")))))]
    fn native_identity(&self) -> Option<Result<ProcessIdentity>> {
        None
    }
}

#[cfg(all(unix, not(any(target_os = "macos", target_os = "ios"))))]
mod native {
    use nix::unistd::{self, Gid, Group, Uid, User};

    use crate::error::{ProcessError, Result};
    use crate::identity::{IdEntry, ProcessIdentity};

    fn user_entry(uid: Uid) -> IdEntry {
        let name = User::from_uid(uid).ok().flatten().map(|u| u.name);
        IdEntry {
            id: uid.as_raw(),
            name,
        }
    }

    fn group_entry(gid: Gid) -> IdEntry {
        let name = Group::from_gid(gid).ok().flatten().map(|g| g.name);
        IdEntry {
            id: gid.as_raw(),
            name,
        }
    }

    pub(super) fn read_identity() -> Result<ProcessIdentity> {
        let (uid, euid) = (unistd::getuid(), unistd::geteuid());
        let (gid, egid) = (unistd::getgid(), unistd::getegid());
        let groups = unistd::getgroups()
            .map_err(|e| ProcessError::Parse(format!("getgroups failed: {}", e)))?;

        Ok(ProcessIdentity {
            uid: user_entry(uid),
            gid: group_entry(gid),
            euid: (euid != uid).then(|| user_entry(euid)),
            egid: (egid != gid).then(|| group_entry(egid)),
            groups: groups.into_iter().map(group_entry).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_strings() {
        assert_eq!(Platform::from_os("windows").as_node_str(), "win32");
        assert_eq!(Platform::from_os("macos"), Platform::Darwin);
        assert_eq!(Platform::from_os("haiku"), Platform::Other);
        assert!(!Platform::Windows.has_posix_ids());
        assert!(Platform::FreeBsd.has_posix_ids());
    }

    #[test]
    fn test_node_arch() {
        assert_eq!(node_arch("x86_64"), "x64");
        assert_eq!(node_arch("aarch64"), "arm64");
        assert_eq!(node_arch("riscv64"), "riscv64");
    }

    #[test]
    fn test_system_host_basics() {
        let host = SystemHost::new();
        assert_eq!(host.pid(), std::process::id());
        assert!(host.exec_path().unwrap().is_absolute());
        assert!(host.cwd().is_ok());
        assert!(host.monotonic_millis() >= 0.0);
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_capture_reports_failure() {
        let host = SystemHost::new();
        let out = host.exec_capture("echo", &["hi".to_string()]).unwrap();
        assert_eq!(out, b"hi\n");

        let err = host.exec_capture("false", &[]).unwrap_err();
        assert!(matches!(err, ProcessError::CommandFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_kill_probe_self_and_missing() {
        let host = SystemHost::new();
        host.kill(std::process::id() as i32, 0).unwrap();

        let err = host.kill(i32::MAX, 0).unwrap_err();
        assert!(matches!(err, ProcessError::ProcessNotFound { pid } if pid == i32::MAX));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_native_identity_matches_libc() {
        let identity = SystemHost::new().native_identity().unwrap().unwrap();
        assert_eq!(identity.uid.id, nix::unistd::getuid().as_raw());
        assert_eq!(identity.effective_uid().id, nix::unistd::geteuid().as_raw());
    }
}
