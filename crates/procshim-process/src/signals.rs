//! POSIX signal name/number tables
//!
//! Two immutable 31-entry tables cover signals 1 through 31: the BSD/Darwin
//! numbering (SIGHUP..SIGUSR2) and the Linux numbering (SIGHUP..SIGSYS).
//! Both directions are O(1): number→name indexes an array, name→number hits a
//! map built once on first use.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::error::{ProcessError, Result};
use crate::host::Platform;

/// Number of signals in each table
pub const SIGNAL_COUNT: usize = 31;

const DARWIN_NAMES: [&str; SIGNAL_COUNT] = [
    "SIGHUP", "SIGINT", "SIGQUIT", "SIGILL", "SIGTRAP", "SIGABRT", "SIGEMT", "SIGFPE", "SIGKILL",
    "SIGBUS", "SIGSEGV", "SIGSYS", "SIGPIPE", "SIGALRM", "SIGTERM", "SIGURG", "SIGSTOP",
    "SIGTSTP", "SIGCONT", "SIGCHLD", "SIGTTIN", "SIGTTOU", "SIGIO", "SIGXCPU", "SIGXFSZ",
    "SIGVTALRM", "SIGPROF", "SIGWINCH", "SIGINFO", "SIGUSR1", "SIGUSR2",
];

const LINUX_NAMES: [&str; SIGNAL_COUNT] = [
    "SIGHUP", "SIGINT", "SIGQUIT", "SIGILL", "SIGTRAP", "SIGABRT", "SIGBUS", "SIGFPE", "SIGKILL",
    "SIGUSR1", "SIGSEGV", "SIGUSR2", "SIGPIPE", "SIGALRM", "SIGTERM", "SIGSTKFLT", "SIGCHLD",
    "SIGCONT", "SIGSTOP", "SIGTSTP", "SIGTTIN", "SIGTTOU", "SIGURG", "SIGXCPU", "SIGXFSZ",
    "SIGVTALRM", "SIGPROF", "SIGWINCH", "SIGIO", "SIGPWR", "SIGSYS",
];

static DARWIN: Lazy<SignalTable> = Lazy::new(|| SignalTable::build("darwin", &DARWIN_NAMES));
static LINUX: Lazy<SignalTable> = Lazy::new(|| SignalTable::build("linux", &LINUX_NAMES));

/// Immutable bidirectional signal mapping
pub struct SignalTable {
    platform: &'static str,
    names: &'static [&'static str; SIGNAL_COUNT],
    numbers: HashMap<&'static str, i32>,
}

impl SignalTable {
    fn build(platform: &'static str, names: &'static [&'static str; SIGNAL_COUNT]) -> Self {
        let numbers = names
            .iter()
            .enumerate()
            .map(|(i, name)| (*name, i as i32 + 1))
            .collect();
        Self {
            platform,
            names,
            numbers,
        }
    }

    /// BSD/Darwin numbering
    pub fn darwin() -> &'static SignalTable {
        &DARWIN
    }

    /// Linux numbering
    pub fn linux() -> &'static SignalTable {
        &LINUX
    }

    /// Table for a platform, `None` where no POSIX numbering is known
    pub fn for_platform(platform: Platform) -> Option<&'static SignalTable> {
        match platform {
            Platform::Linux => Some(Self::linux()),
            Platform::Darwin => Some(Self::darwin()),
            _ => None,
        }
    }

    /// Platform this table describes
    pub fn platform(&self) -> &'static str {
        self.platform
    }

    /// Look up a signal number. Accepts `SIGTERM` or `TERM`.
    pub fn number(&self, name: &str) -> Option<i32> {
        match self.numbers.get(name) {
            Some(n) => Some(*n),
            None if !name.starts_with("SIG") => self.numbers.get(format!("SIG{}", name).as_str()).copied(),
            None => None,
        }
    }

    /// Look up a signal name
    pub fn name(&self, number: i32) -> Option<&'static str> {
        if (1..=SIGNAL_COUNT as i32).contains(&number) {
            Some(self.names[number as usize - 1])
        } else {
            None
        }
    }

    /// Resolve a signal argument against this table.
    ///
    /// Number `0` is the existence probe and resolves without a name.
    pub fn resolve(&self, signal: &SignalArg) -> Result<ResolvedSignal> {
        match signal {
            SignalArg::Number(0) => Ok(ResolvedSignal {
                number: 0,
                name: None,
            }),
            SignalArg::Number(n) => self
                .name(*n)
                .map(|name| ResolvedSignal {
                    number: *n,
                    name: Some(name),
                })
                .ok_or_else(|| ProcessError::InvalidSignal(n.to_string())),
            SignalArg::Name(name) => self
                .number(name)
                .map(|number| ResolvedSignal {
                    number,
                    name: self.name(number),
                })
                .ok_or_else(|| ProcessError::InvalidSignal(name.clone())),
        }
    }

    /// Iterate `(number, name)` pairs in numeric order
    pub fn iter(&self) -> impl Iterator<Item = (i32, &'static str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| (i as i32 + 1, *name))
    }

    pub fn len(&self) -> usize {
        SIGNAL_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Debug for SignalTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalTable")
            .field("platform", &self.platform)
            .field("len", &SIGNAL_COUNT)
            .finish()
    }
}

/// Signal given by name or number
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalArg {
    Name(String),
    Number(i32),
}

impl Default for SignalArg {
    fn default() -> Self {
        SignalArg::Name("SIGTERM".to_string())
    }
}

impl From<&str> for SignalArg {
    fn from(name: &str) -> Self {
        SignalArg::Name(name.to_string())
    }
}

impl From<String> for SignalArg {
    fn from(name: String) -> Self {
        SignalArg::Name(name)
    }
}

impl From<i32> for SignalArg {
    fn from(number: i32) -> Self {
        SignalArg::Number(number)
    }
}

impl fmt::Display for SignalArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalArg::Name(name) => f.write_str(name),
            SignalArg::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Signal after table lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSignal {
    pub number: i32,
    /// `None` only for the existence probe (0)
    pub name: Option<&'static str>,
}
