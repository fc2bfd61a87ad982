//! Command-line interface for webgauge.
//!
//! Provides commands for serving the HTTP API, running tasks directly,
//! and comparing screenshots.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli};
