//! # procshim-process
//!
//! **Purpose**: Node.js-compatible `process` facade for capability-gated hosts
//!
//! Reconciles the POSIX process model with a host whose env, file, exec and
//! signal access sits behind permissions.
//!
//! ## Features
//!
//! - **Identity**: uid/gid/groups from a native accessor or parsed `id` output
//! - **Signals**: Darwin and Linux name/number tables, `kill` with events
//! - **hrtime**: `[seconds, nanoseconds]` readings from a monotonic clock
//! - **Lifecycle**: `exit` with `beforeExit`/`exit` notifications
//! - **Warnings**: `emitWarning` in both option and positional forms
//! - **nextTick**: FIFO microtask queue
//!
//! ## Usage
//!
//! ```rust,no_run
//! use procshim_process::{Process, SignalArg};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let process = Process::system()?;
//!
//! let start = process.hrtime();
//! println!("uid: {:?}", process.getuid()?);
//! println!("took {:?}", process.hrtime_since(start));
//!
//! process.kill(process.pid() as i32, 0)?;
//! process.kill(12345, SignalArg::default()).ok();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod hrtime;
pub mod identity;
pub mod permissions;
pub mod process;
pub mod signals;
pub mod tick;
pub mod warning;

pub use config::{ConfigLoader, IdentityConfig, ShimConfig};
pub use error::{ProcessError, Result};
pub use events::{EventBus, ProcessEvent};
pub use host::{Host, Platform, SystemHost};
pub use hrtime::{Clock, HrTime};
pub use identity::{parse_ids, IdEntry, IdentityStrategy, ProcessIdentity};
pub use permissions::{Capability, PermissionLevel, Permissions};
pub use process::{global, install_global, Channel, CpuUsage, Process, Release};
pub use signals::{ResolvedSignal, SignalArg, SignalTable};
pub use tick::TickQueue;
pub use warning::{Warning, WarningEvent, WarningOptions, WarningRecord};
