// Command-line arguments

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use procshim_common::LogLevel;

#[derive(Debug, Parser)]
#[command(name = "procshim")]
#[command(version)]
#[command(about = "Inspect and drive the current process through the procshim facade")]
pub struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log level after applying `-v` on top of the configured one
    pub fn log_level(&self, configured: LogLevel) -> LogLevel {
        match self.verbose {
            0 => configured,
            1 => configured.min(LogLevel::Debug),
            _ => LogLevel::Trace,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print uid, gid, effective ids and groups as JSON
    Id,
    /// Print a high-resolution time reading as [seconds, nanoseconds]
    Hrtime {
        /// Report time elapsed since this earlier reading
        #[arg(long, num_args = 2, value_names = ["SECS", "NANOS"])]
        since: Option<Vec<u64>>,
    },
    /// List the signal table
    Signals {
        /// Table to print (defaults to the current platform)
        #[arg(long, value_enum)]
        platform: Option<SignalPlatform>,
    },
    /// Send a signal to a process
    Kill {
        pid: i32,
        /// Signal name (SIGTERM, TERM) or number
        #[arg(short, long, default_value = "SIGTERM")]
        signal: String,
    },
    /// Print the environment, or one variable
    Env { key: Option<String> },
    /// Write a JSON document to a file
    WriteJson {
        path: PathBuf,
        /// JSON text to write
        json: String,
        /// Indentation width (clamped to 10)
        #[arg(long)]
        spaces: Option<usize>,
        /// Append instead of truncating
        #[arg(long)]
        append: bool,
    },
    /// Print the load-average based cpu usage approximation
    CpuUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SignalPlatform {
    Linux,
    Darwin,
}
