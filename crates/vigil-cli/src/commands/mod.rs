//! CLI command implementations.
//!
//! Each submodule implements a specific CLI command:
//! - [`check`] - One probe cycle and a health report
//! - [`watch`] - Continuous monitoring with alerting
//! - [`rules`] - The built-in alert rules

pub mod check;
pub mod rules;
pub mod watch;

pub use check::CheckCommand;
pub use rules::RulesCommand;
pub use watch::WatchCommand;
