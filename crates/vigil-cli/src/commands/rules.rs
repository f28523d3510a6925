//! Rules command implementation.

use std::io::Write;

use vigil_alerts::default_rules;

use crate::error::Result;
use crate::output::{OutputFormat, RuleInfo, RuleList};

/// Rules command executor.
#[derive(Debug, Default)]
pub struct RulesCommand;

impl RulesCommand {
    /// Create a new rules command.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Execute the rules command.
    ///
    /// # Errors
    ///
    /// Returns an error if output fails.
    pub fn execute<W: Write>(&self, writer: &mut W, format: &OutputFormat) -> Result<()> {
        let rules = RuleList {
            rules: default_rules()?.iter().map(RuleInfo::from).collect(),
        };
        format.write(writer, &rules)
    }
}
