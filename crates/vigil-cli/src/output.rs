//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use serde::Serialize;
use vigil_alerts::{Alert, AlertRule};
use vigil_health::{HealthStatus, SystemHealth};

use crate::cli::Format;
use crate::error::{CliError, Result};

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<()>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => value.write_table(writer)?,
        }
        Ok(())
    }

    /// Write one record of a stream: a single JSON line, or table text.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_line<W, T>(&self, writer: &mut W, value: &T) -> Result<()>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => value.write_table(writer)?,
        }
        writer.flush()?;
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<()>;
}

/// A system health snapshot for display.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct HealthReport(pub SystemHealth);

impl TableDisplay for HealthReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<()> {
        let health = &self.0;
        let summary = &health.summary;

        writeln!(writer, "System Health: {}", health.status)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Checked:          {}", health.last_check.to_rfc3339())?;
        writeln!(writer, "Components:       {}", summary.total_components)?;
        writeln!(writer, "  Healthy:        {}", summary.healthy_components)?;
        writeln!(writer, "  Degraded:       {}", summary.degraded_components)?;
        writeln!(writer, "  Unhealthy:      {}", summary.unhealthy_components)?;
        writeln!(writer, "  Unknown:        {}", summary.unknown_components)?;
        writeln!(writer, "Health:           {:.1}%", summary.health_percentage)?;

        if health.components.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "No components configured")?;
            return Ok(());
        }

        writeln!(writer)?;
        writeln!(
            writer,
            "{:<24}  {:<16}  {:<10}  {:>12}  {:>8}  ERROR",
            "NAME", "TYPE", "STATUS", "LATENCY (ms)", "SUCCESS"
        )?;
        writeln!(writer, "{}", "─".repeat(96))?;

        let mut names: Vec<&String> = health.components.keys().collect();
        names.sort();
        for name in names {
            let c = &health.components[name];
            writeln!(
                writer,
                "{:<24}  {:<16}  {:<10}  {:>12.1}  {:>7.1}%  {}",
                truncate(name, 24),
                truncate(c.component_type.as_str(), 16),
                c.status.as_str(),
                c.response_time_ms,
                c.success_rate,
                c.error_message.as_deref().unwrap_or("-")
            )?;
        }
        Ok(())
    }
}

/// One alert rule for display.
#[derive(Debug, Clone, Serialize)]
pub struct RuleInfo {
    /// Rule name.
    pub name: String,
    /// Severity of raised alerts.
    pub severity: String,
    /// The condition, rendered as text.
    pub condition: String,
    /// Minutes between alerts.
    pub cooldown_minutes: u64,
    /// Maximum alerts per hour.
    pub max_alerts_per_hour: u32,
    /// Message template.
    pub message_template: String,
    /// Whether the rule is evaluated.
    pub enabled: bool,
}

impl From<&AlertRule> for RuleInfo {
    fn from(rule: &AlertRule) -> Self {
        Self {
            name: rule.name.clone(),
            severity: rule.severity.to_string(),
            condition: rule.condition.to_string(),
            cooldown_minutes: rule.cooldown_minutes,
            max_alerts_per_hour: rule.max_alerts_per_hour,
            message_template: rule.message_template.clone(),
            enabled: rule.enabled,
        }
    }
}

/// A list of rules for display.
#[derive(Debug, Clone, Serialize)]
pub struct RuleList {
    /// The rules.
    pub rules: Vec<RuleInfo>,
}

impl TableDisplay for RuleList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<()> {
        if self.rules.is_empty() {
            writeln!(writer, "No rules configured")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<28}  {:<8}  {:<32}  {:>8}  {:>8}",
            "NAME", "SEVERITY", "CONDITION", "COOLDOWN", "MAX/HOUR"
        )?;
        writeln!(writer, "{}", "─".repeat(92))?;

        for rule in &self.rules {
            writeln!(
                writer,
                "{:<28}  {:<8}  {:<32}  {:>7}m  {:>8}",
                truncate(&rule.name, 28),
                rule.severity,
                truncate(&rule.condition, 32),
                rule.cooldown_minutes,
                rule.max_alerts_per_hour
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} rule(s)", self.rules.len())?;
        Ok(())
    }
}

/// Something that happened while watching.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WatchEvent {
    /// A check cycle finished.
    Cycle {
        /// Aggregated status.
        status: HealthStatus,
        /// Components in the snapshot.
        total: usize,
        /// Components not healthy.
        unhealthy: Vec<String>,
        /// Components degraded.
        degraded: Vec<String>,
    },
    /// An alert was raised.
    Alert(Alert),
}

impl WatchEvent {
    /// Summarizes a snapshot.
    #[must_use]
    pub fn cycle(health: &SystemHealth) -> Self {
        Self::Cycle {
            status: health.status,
            total: health.total_components(),
            unhealthy: health.components_with_status(HealthStatus::Unhealthy),
            degraded: health.components_with_status(HealthStatus::Degraded),
        }
    }
}

impl TableDisplay for WatchEvent {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Self::Cycle {
                status,
                total,
                unhealthy,
                degraded,
            } => {
                write!(writer, "[cycle] {status} ({total} component(s))")?;
                if !unhealthy.is_empty() {
                    write!(writer, " unhealthy: {}", unhealthy.join(", "))?;
                }
                if !degraded.is_empty() {
                    write!(writer, " degraded: {}", degraded.join(", "))?;
                }
                writeln!(writer)?;
            }
            Self::Alert(alert) => {
                writeln!(
                    writer,
                    "[alert] {:<8} {} {}",
                    alert.severity.as_str(),
                    alert.name,
                    alert.message
                )?;
            }
        }
        Ok(())
    }
}

/// Truncate a string to a maximum length, adding "..." if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use vigil_alerts::default_rules;
    use vigil_health::{ComponentHealth, ComponentType};

    fn snapshot() -> SystemHealth {
        let components = HashMap::from([
            (
                "postgres".to_string(),
                ComponentHealth {
                    status: HealthStatus::Unhealthy,
                    success_rate: 0.0,
                    error_message: Some("connection refused".to_string()),
                    ..ComponentHealth::unchecked("postgres", ComponentType::Database, Utc::now())
                },
            ),
            (
                "redis".to_string(),
                ComponentHealth {
                    status: HealthStatus::Healthy,
                    response_time_ms: 1.25,
                    ..ComponentHealth::unchecked("redis", ComponentType::Cache, Utc::now())
                },
            ),
        ]);
        SystemHealth::from_components(components, Utc::now())
    }

    mod format_tests {
        use super::*;

        #[test]
        fn json_health_report() {
            let output = OutputFormat::new(Format::Json)
                .to_string(&HealthReport(snapshot()))
                .unwrap();
            let value: serde_json::Value = serde_json::from_str(&output).unwrap();
            assert_eq!(value["status"], "unhealthy");
            assert_eq!(value["components"]["redis"]["status"], "healthy");
        }

        #[test]
        fn table_health_report() {
            let output = OutputFormat::default()
                .to_string(&HealthReport(snapshot()))
                .unwrap();
            assert!(output.starts_with("System Health: unhealthy"));
            assert!(output.contains("Health:           50.0%"));
            assert!(output.contains("connection refused"));
            let postgres = output.find("postgres").unwrap();
            let redis = output.find("redis").unwrap();
            assert!(postgres < redis);
        }

        #[test]
        fn table_empty_report() {
            let output = OutputFormat::default()
                .to_string(&HealthReport(SystemHealth::empty(Utc::now())))
                .unwrap();
            assert!(output.starts_with("System Health: unknown"));
            assert!(output.contains("No components configured"));
        }

        #[test]
        fn table_rule_list() {
            let rules = RuleList {
                rules: default_rules().unwrap().iter().map(RuleInfo::from).collect(),
            };
            let output = OutputFormat::default().to_string(&rules).unwrap();
            assert!(output.contains("system_unhealthy"));
            assert!(output.contains("Total: 5 rule(s)"));
        }

        #[test]
        fn watch_event_is_one_json_line() {
            let mut buf = Vec::new();
            OutputFormat::new(Format::Json)
                .write_line(&mut buf, &WatchEvent::cycle(&snapshot()))
                .unwrap();
            let text = String::from_utf8(buf).unwrap();
            assert_eq!(text.lines().count(), 1);
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(value["event"], "cycle");
            assert_eq!(value["unhealthy"], serde_json::json!(["postgres"]));
        }

        #[test]
        fn watch_event_table() {
            let mut buf = Vec::new();
            OutputFormat::default()
                .write_line(&mut buf, &WatchEvent::cycle(&snapshot()))
                .unwrap();
            assert_eq!(
                String::from_utf8(buf).unwrap(),
                "[cycle] unhealthy (2 component(s)) unhealthy: postgres\n"
            );
        }
    }

    mod truncate_tests {
        use super::*;

        #[test]
        fn short_strings_untouched() {
            assert_eq!(truncate("redis", 10), "redis");
        }

        #[test]
        fn long_strings_get_ellipsis() {
            assert_eq!(truncate("a-very-long-component-name", 10), "a-very-...");
        }
    }
}
