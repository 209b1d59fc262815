//! # procshim-cli
//!
//! Argument definitions and command handlers behind the `procshim` binary.
//! Handlers write to any [`std::io::Write`] so they can be driven from tests.

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{run, run_to_exit};
