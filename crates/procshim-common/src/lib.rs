//! # procshim-common
//!
//! Shared utilities for procshim crates:
//!
//! - [`json_store`]: `writeJson`/`writeJsonSync`-style JSON file writer
//! - [`logging`]: tracing subscriber setup and error cause-chain formatting

pub mod json_store;
pub mod logging;

pub use json_store::{
    load_json, to_json_string, write_json, write_json_sync, JsonStoreError, JsonStoreResult,
    Replacer, Spaces, WriteJsonOptions,
};
pub use logging::{format_error, LogLevel, LogOptions};
