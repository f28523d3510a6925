//! The built-in rule set.

use vigil_health::HealthStatus;

use crate::error::Result;
use crate::types::{AlertCondition, AlertRule, AlertSeverity};

/// Latency limit used by `component_high_latency`, in milliseconds.
pub const HIGH_LATENCY_MS: f64 = 5000.0;

/// Success rate floor used by `component_low_success_rate`, in percent.
pub const LOW_SUCCESS_RATE_PERCENT: f64 = 90.0;

/// Returns the built-in rules.
///
/// | name | severity | cooldown | cap/hour |
/// |------|----------|----------|----------|
/// | `system_unhealthy` | critical | 5 min | 10 |
/// | `system_degraded` | warning | 10 min | 6 |
/// | `component_unhealthy` | error | 5 min | 10 |
/// | `component_high_latency` | warning | 15 min | 4 |
/// | `component_low_success_rate` | warning | 10 min | 6 |
///
/// # Errors
///
/// Never fails in practice; the builders are validated like any other rule.
pub fn default_rules() -> Result<Vec<AlertRule>> {
    Ok(vec![
        AlertRule::builder(
            "system_unhealthy",
            AlertCondition::SystemStatus(HealthStatus::Unhealthy),
        )
        .severity(AlertSeverity::Critical)
        .message_template(
            "System is unhealthy: {unhealthy_count} of {total_count} components unhealthy ({health_percentage}% healthy)",
        )
        .cooldown_minutes(5)
        .max_alerts_per_hour(10)
        .build()?,
        AlertRule::builder(
            "system_degraded",
            AlertCondition::SystemStatus(HealthStatus::Degraded),
        )
        .severity(AlertSeverity::Warning)
        .message_template(
            "System is degraded: {degraded_count} of {total_count} components degraded",
        )
        .cooldown_minutes(10)
        .max_alerts_per_hour(6)
        .build()?,
        AlertRule::builder(
            "component_unhealthy",
            AlertCondition::ComponentStatus(HealthStatus::Unhealthy),
        )
        .severity(AlertSeverity::Error)
        .message_template("Component {component_name} is unhealthy: {error_message}")
        .cooldown_minutes(5)
        .max_alerts_per_hour(10)
        .build()?,
        AlertRule::builder(
            "component_high_latency",
            AlertCondition::ComponentLatencyAbove(HIGH_LATENCY_MS),
        )
        .severity(AlertSeverity::Warning)
        .message_template("Component {component_name} response time is {response_time_ms}ms")
        .cooldown_minutes(15)
        .max_alerts_per_hour(4)
        .build()?,
        AlertRule::builder(
            "component_low_success_rate",
            AlertCondition::ComponentSuccessRateBelow(LOW_SUCCESS_RATE_PERCENT),
        )
        .severity(AlertSeverity::Warning)
        .message_template("Component {component_name} success rate is {success_rate}%")
        .cooldown_minutes(10)
        .max_alerts_per_hour(6)
        .build()?,
    ])
}
