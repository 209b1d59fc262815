//! The `process` facade
//!
//! A single long-lived context object exposing Node.js-style process
//! introspection and lifecycle operations on top of a [`Host`]. Pass it
//! explicitly to call sites; [`install_global`] is available for code that
//! expects one ambient instance.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    config::ShimConfig,
    error::{not_implemented, ProcessError, Result},
    events::{EventBus, ProcessEvent},
    host::{Host, SystemHost},
    hrtime::{Clock, HrTime},
    identity::{resolve_identity, ProcessIdentity},
    permissions::{Capability, Permissions},
    signals::{SignalArg, SignalTable},
    tick::TickQueue,
    warning::{Warning, WarningEvent, WarningOptions, WarningRecord},
};

static GLOBAL: OnceCell<Arc<Process>> = OnceCell::new();

/// Register `process` as the ambient instance. Only the first call succeeds.
pub fn install_global(process: Arc<Process>) -> Result<&'static Arc<Process>> {
    GLOBAL
        .set(process)
        .map_err(|_| ProcessError::GlobalAlreadyInstalled)?;
    info!("Installed global process facade");
    GLOBAL.get().ok_or(ProcessError::GlobalAlreadyInstalled)
}

/// The ambient instance, if one was installed
pub fn global() -> Option<&'static Arc<Process>> {
    GLOBAL.get()
}

/// Load-average based stand-in for `process.cpuUsage()`.
///
/// This is NOT CPU-time accounting: `user` carries the 1-minute and `system`
/// the 5-minute load average. Only the shape matches Node.js.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CpuUsage {
    pub user: f64,
    pub system: f64,
}

/// `process.release`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Release {
    pub name: &'static str,
    pub version: &'static str,
}

enum IdentityState {
    Resolved(ProcessIdentity),
    Unsupported,
    Failed(ProcessError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitState {
    Running,
    /// `exit` claimed; ticks and `beforeExit` still pending
    Closing,
    Exiting { code: i32 },
}

/// Node.js-compatible process facade
pub struct Process {
    host: Arc<dyn Host>,
    config: ShimConfig,
    permissions: Permissions,
    clock: Clock,
    events: EventBus,
    ticks: TickQueue,
    identity: OnceCell<IdentityState>,
    exit_state: Mutex<ExitState>,
    no_deprecation: AtomicBool,
}

impl Process {
    /// Build a facade over `host`
    pub fn new(host: Arc<dyn Host>, config: ShimConfig) -> Result<Self> {
        config.validate()?;

        let process = Self {
            clock: Clock::new(Arc::clone(&host)),
            events: EventBus::with_capacity(config.events.capacity),
            permissions: config.permissions.clone(),
            no_deprecation: AtomicBool::new(config.warnings.no_deprecation),
            ticks: TickQueue::new(),
            identity: OnceCell::new(),
            exit_state: Mutex::new(ExitState::Running),
            host,
            config,
        };

        if process.config.identity.eager {
            process.identity_state();
        }

        debug!(
            pid = process.pid(),
            platform = process.platform(),
            arch = process.arch(),
            "Process facade created"
        );
        Ok(process)
    }

    /// Facade over the real OS with default configuration
    pub fn system() -> Result<Self> {
        Self::new(Arc::new(SystemHost::new()), ShimConfig::default())
    }

    pub fn shim_config(&self) -> &ShimConfig {
        &self.config
    }

    // ---- identifiers -------------------------------------------------

    pub fn pid(&self) -> u32 {
        self.host.pid()
    }

    pub fn ppid(&self) -> u32 {
        self.host.ppid()
    }

    /// `process.platform` (`"win32"` on Windows)
    pub fn platform(&self) -> &'static str {
        self.host.platform().as_node_str()
    }

    pub fn arch(&self) -> &str {
        self.host.arch()
    }

    pub fn version(&self) -> String {
        format!("v{}", env!("CARGO_PKG_VERSION"))
    }

    pub fn versions(&self) -> BTreeMap<&'static str, &'static str> {
        BTreeMap::from([(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))])
    }

    pub fn release(&self) -> Release {
        Release {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    // ---- host state, re-read on every access ---------------------------

    pub fn env(&self) -> Result<BTreeMap<String, String>> {
        self.permissions.check(Capability::Env)?;
        self.host.env()
    }

    pub fn env_var(&self, key: &str) -> Result<Option<String>> {
        Ok(self.env()?.remove(key))
    }

    /// `[exec_path, ...args]`
    pub fn argv(&self) -> Result<Vec<String>> {
        self.permissions.check(Capability::Read)?;
        let mut argv = vec![self.host.exec_path()?.to_string_lossy().into_owned()];
        argv.extend(self.host.args()?);
        Ok(argv)
    }

    pub fn argv0(&self) -> Result<String> {
        self.permissions.check(Capability::Read)?;
        self.host.argv0()
    }

    pub fn exec_path(&self) -> Result<PathBuf> {
        self.permissions.check(Capability::Read)?;
        self.host.exec_path()
    }

    pub fn cwd(&self) -> Result<PathBuf> {
        self.permissions.check(Capability::Read)?;
        self.host.cwd()
    }

    pub fn chdir(&self, dir: impl AsRef<Path>) -> Result<()> {
        self.permissions.check(Capability::Read)?;
        self.host.chdir(dir.as_ref())
    }

    // ---- standard streams ------------------------------------------------

    /// `process.stdin`, the standard input of the running binary
    pub fn stdin(&self) -> std::io::Stdin {
        std::io::stdin()
    }

    /// `process.stdout`
    pub fn stdout(&self) -> std::io::Stdout {
        std::io::stdout()
    }

    /// `process.stderr`
    pub fn stderr(&self) -> std::io::Stderr {
        std::io::stderr()
    }

    // ---- lifecycle -----------------------------------------------------

    /// `process.exitCode`: `None` until `exit` runs
    pub fn exit_code(&self) -> Option<i32> {
        match *self.exit_state.lock() {
            ExitState::Running | ExitState::Closing => None,
            ExitState::Exiting { code } => Some(code),
        }
    }

    /// Drain pending ticks, publish `beforeExit`, record the exit code,
    /// publish `exit`, then ask the host to terminate. Real hosts never
    /// return from the last step.
    ///
    /// Only the first call proceeds; later or concurrent calls, including
    /// ones made from a tick or an event handler, get `AlreadyExiting`.
    pub fn exit(&self, code: Option<i32>) -> Result<()> {
        let code = code.unwrap_or(0);
        {
            let mut state = self.exit_state.lock();
            if *state != ExitState::Running {
                return Err(ProcessError::AlreadyExiting);
            }
            *state = ExitState::Closing;
        }

        let drained = self.ticks.run();
        if drained > 0 {
            debug!(drained, "Ran pending ticks before exit");
        }

        self.events.publish(ProcessEvent::BeforeExit { code });
        *self.exit_state.lock() = ExitState::Exiting { code };
        self.events.publish(ProcessEvent::Exit { code });

        info!(code, "Process exiting");
        self.host.exit(code);
        Ok(())
    }

    /// Send `signal` to `pid`. Use `SignalArg::default()` for SIGTERM.
    pub fn kill(&self, pid: i32, signal: impl Into<SignalArg>) -> Result<()> {
        let signal = signal.into();
        self.permissions.check(Capability::Run)?;

        let platform = self.host.platform();
        let table = SignalTable::for_platform(platform).ok_or_else(|| {
            warn!(platform = platform.as_node_str(), "No signal table for platform");
            ProcessError::NotImplemented { member: "kill" }
        })?;
        let resolved = table.resolve(&signal)?;

        self.events.publish(ProcessEvent::Signal {
            pid,
            name: resolved.name,
            number: resolved.number,
        });

        debug!(pid, signal = %signal, number = resolved.number, "Delivering signal");
        self.host.kill(pid, resolved.number).map_err(|e| {
            warn!(pid, error = %e, "Signal delivery failed");
            e
        })
    }

    /// SIGABRT to the current process
    pub fn abort(&self) -> Result<()> {
        self.kill(self.pid() as i32, "SIGABRT")
    }

    // ---- warnings ------------------------------------------------------

    /// `process.emitWarning(warning, options)`. Pass a `&str` as `options`
    /// for the positional `type` form.
    pub fn emit_warning(&self, warning: impl Into<Warning>, options: impl Into<WarningOptions>) {
        let event = match warning.into() {
            Warning::Error(err) => WarningEvent::Error(err),
            Warning::Message(message) => {
                let record = WarningRecord::new(message, options.into());
                if record.is_deprecation() && self.no_deprecation() {
                    debug!(message = %record.message, "Deprecation warning suppressed");
                    return;
                }
                WarningEvent::Record(record)
            }
        };

        if !self.config.warnings.silent {
            warn!(pid = self.pid(), "{}", event);
        }
        self.events.publish(ProcessEvent::Warning(event));
    }

    /// Positional form: `emitWarning(warning, type, code, ctor)`
    pub fn emit_warning_with(
        &self,
        warning: impl Into<Warning>,
        warning_type: Option<&str>,
        code: Option<&str>,
        ctor: Option<&str>,
    ) {
        let options = WarningOptions {
            warning_type: warning_type.map(str::to_string),
            code: code.map(str::to_string),
            detail: None,
            ctor: ctor.map(str::to_string),
        };
        self.emit_warning(warning, options);
    }

    pub fn no_deprecation(&self) -> bool {
        self.no_deprecation.load(Ordering::Relaxed)
    }

    pub fn set_no_deprecation(&self, value: bool) {
        self.no_deprecation.store(value, Ordering::Relaxed);
    }

    // ---- events and ticks ----------------------------------------------

    pub fn subscribe(&self) -> broadcast::Receiver<ProcessEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Queue `callback`.
    ///
    /// There is no event loop behind the facade: queued callbacks run when
    /// the embedder calls [`run_ticks`](Self::run_ticks) after its current
    /// synchronous work, and [`exit`](Self::exit) drains whatever is still
    /// pending before publishing `beforeExit`.
    pub fn next_tick<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.ticks.push(callback);
    }

    /// Queue `callback(args)`
    pub fn next_tick_with<F, A>(&self, callback: F, args: A)
    where
        F: FnOnce(A) + Send + 'static,
        A: Send + 'static,
    {
        self.ticks.push_with(callback, args);
    }

    /// Drain the tick queue; returns how many callbacks ran
    pub fn run_ticks(&self) -> usize {
        self.ticks.run()
    }

    pub fn pending_ticks(&self) -> usize {
        self.ticks.len()
    }

    // ---- time and load ---------------------------------------------------

    pub fn hrtime(&self) -> HrTime {
        self.clock.now()
    }

    pub fn hrtime_since(&self, prior: HrTime) -> HrTime {
        self.clock.elapsed_since(prior)
    }

    pub fn hrtime_bigint(&self) -> u64 {
        self.clock.now_nanos()
    }

    /// Approximation from load averages, see [`CpuUsage`]
    pub fn cpu_usage(&self, prev: Option<CpuUsage>) -> CpuUsage {
        let (one, five) = self.host.load_average();
        let prev = prev.unwrap_or_default();
        CpuUsage {
            user: one - prev.user,
            system: five - prev.system,
        }
    }

    // ---- identity ------------------------------------------------------

    fn identity_state(&self) -> &IdentityState {
        self.identity.get_or_init(|| {
            match resolve_identity(self.host.as_ref(), &self.config.identity, &self.permissions) {
                Ok(Some(identity)) => {
                    debug!(uid = identity.uid.id, gid = identity.gid.id, "Identity resolved");
                    IdentityState::Resolved(identity)
                }
                Ok(None) => IdentityState::Unsupported,
                Err(e) => {
                    warn!(error = %e, "Identity resolution failed");
                    IdentityState::Failed(e)
                }
            }
        })
    }

    /// Cached identity; `Ok(None)` on platforms without POSIX credentials
    pub fn identity(&self) -> Result<Option<&ProcessIdentity>> {
        match self.identity_state() {
            IdentityState::Resolved(identity) => Ok(Some(identity)),
            IdentityState::Unsupported => Ok(None),
            IdentityState::Failed(ProcessError::PermissionDenied { capability }) => {
                Err(ProcessError::PermissionDenied {
                    capability: *capability,
                })
            }
            IdentityState::Failed(ProcessError::NotImplemented { member }) => {
                Err(ProcessError::NotImplemented { member: *member })
            }
            IdentityState::Failed(ProcessError::Parse(reason)) => {
                Err(ProcessError::Parse(reason.clone()))
            }
            IdentityState::Failed(e) => Err(ProcessError::Parse(e.to_string())),
        }
    }

    pub fn getuid(&self) -> Result<Option<u32>> {
        Ok(self.identity()?.map(|i| i.uid.id))
    }

    pub fn geteuid(&self) -> Result<Option<u32>> {
        Ok(self.identity()?.map(|i| i.effective_uid().id))
    }

    pub fn getgid(&self) -> Result<Option<u32>> {
        Ok(self.identity()?.map(|i| i.gid.id))
    }

    pub fn getegid(&self) -> Result<Option<u32>> {
        Ok(self.identity()?.map(|i| i.effective_gid().id))
    }

    pub fn getgroups(&self) -> Result<Option<Vec<u32>>> {
        Ok(self.identity()?.map(ProcessIdentity::group_ids))
    }

    // ---- unsupported members ---------------------------------------------

    pub fn memory_usage(&self) -> Result<()> {
        not_implemented("memoryUsage")
    }

    pub fn dlopen(&self, _filename: &Path, _flags: Option<i32>) -> Result<()> {
        not_implemented("dlopen")
    }

    pub fn initgroups(&self, _user: &str, _extra_group: &str) -> Result<()> {
        not_implemented("initgroups")
    }

    pub fn debug_port(&self) -> Result<u16> {
        not_implemented("debugPort")
    }

    pub fn config(&self) -> Result<serde_json::Value> {
        not_implemented("config")
    }

    pub fn connected(&self) -> Result<bool> {
        not_implemented("connected")
    }

    pub fn allowed_node_environment_flags(&self) -> Result<Vec<String>> {
        not_implemented("allowedNodeEnvironmentFlags")
    }

    pub fn disconnect(&self) -> Result<()> {
        not_implemented("disconnect")
    }

    /// `process.channel`
    pub fn channel(&self) -> Channel<'_> {
        Channel { _process: self }
    }
}

impl std::fmt::Debug for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid())
            .field("platform", &self.platform())
            .field("exit_code", &self.exit_code())
            .finish_non_exhaustive()
    }
}

/// IPC channel handle; no IPC channel is ever connected
#[derive(Debug)]
pub struct Channel<'a> {
    _process: &'a Process,
}

impl Channel<'_> {
    pub fn ref_(&self) -> Result<()> {
        not_implemented("channel.ref")
    }

    pub fn unref(&self) -> Result<()> {
        not_implemented("channel.unref")
    }
}
