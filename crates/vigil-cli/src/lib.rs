//! # vigil-cli
//!
//! Command-line host for the Vigil health monitor and alert manager.
//!
//! Provides commands for:
//! - One-shot health checks of configured components
//! - Continuous monitoring with rule evaluation and notifications
//! - Listing the built-in alert rules
//!
//! Components are probed over TCP or HTTP as described in a JSON
//! configuration file (see [`config`]).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod probes;

pub use cli::{CheckArgs, Cli, Commands, Format, LogFormat, WatchArgs};
pub use config::VigilConfig;
pub use error::CliError;
pub use output::OutputFormat;
