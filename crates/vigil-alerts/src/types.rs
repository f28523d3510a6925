//! Core types for the alerting system.
//!
//! This module provides the fundamental types used throughout the vigil-alerts crate:
//! - [`AlertSeverity`]: The severity level of an alert
//! - [`AlertStatus`]: Where an alert is in its lifecycle
//! - [`ComparisonOperator`]: Operators for comparing metric values
//! - [`AlertData`]: The input a rule is evaluated against
//! - [`AlertCondition`]: A predicate over [`AlertData`]
//! - [`AlertRule`]: A condition plus severity, message and rate limits
//! - [`Alert`]: An active or resolved alert instance

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vigil_health::{ComponentHealth, HealthStatus, SystemHealth};

use crate::error::{AlertError, Result};

/// The severity level of an alert.
///
/// Ordered `info < warning < error < critical`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Informational alert, no action required.
    Info,
    /// Warning alert, should be investigated.
    #[default]
    Warning,
    /// Something is broken.
    Error,
    /// Critical alert, requires immediate attention.
    Critical,
}

impl AlertSeverity {
    /// Every severity, lowest first.
    pub const ALL: [Self; 4] = [Self::Info, Self::Warning, Self::Error, Self::Critical];

    /// Returns the severity as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }

    /// Returns the priority of this severity (higher = more urgent).
    #[must_use]
    pub const fn priority(&self) -> u8 {
        match self {
            Self::Info => 1,
            Self::Warning => 2,
            Self::Error => 3,
            Self::Critical => 4,
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AlertSeverity {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "critical" => Ok(Self::Critical),
            other => Err(AlertError::InvalidConfig {
                reason: format!("unknown severity: {other}"),
            }),
        }
    }
}

/// Where an alert is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    /// Raised and awaiting attention.
    Active,
    /// Seen by an operator; still open.
    Acknowledged,
    /// Closed. Terminal.
    Resolved,
    /// Silenced by an operator; still open.
    Suppressed,
}

impl AlertStatus {
    /// Returns the status as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
            Self::Suppressed => "suppressed",
        }
    }

    /// Returns true for every status except `resolved`.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        !matches!(self, Self::Resolved)
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Comparison operators for metric conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperator {
    /// Greater than (>).
    #[serde(rename = ">")]
    GreaterThan,
    /// Greater than or equal (>=).
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    /// Less than (<).
    #[serde(rename = "<")]
    LessThan,
    /// Less than or equal (<=).
    #[serde(rename = "<=")]
    LessThanOrEqual,
    /// Equal (==).
    #[serde(rename = "==")]
    Equal,
    /// Not equal (!=).
    #[serde(rename = "!=")]
    NotEqual,
}

impl ComparisonOperator {
    /// Evaluates the comparison between two values.
    #[must_use]
    pub fn evaluate(&self, left: f64, right: f64) -> bool {
        match self {
            Self::GreaterThan => left > right,
            Self::GreaterThanOrEqual => left >= right,
            Self::LessThan => left < right,
            Self::LessThanOrEqual => left <= right,
            Self::Equal => (left - right).abs() < f64::EPSILON,
            Self::NotEqual => (left - right).abs() >= f64::EPSILON,
        }
    }

    /// Returns the operator as a string symbol.
    #[must_use]
    pub const fn as_symbol(&self) -> &'static str {
        match self {
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_symbol())
    }
}

/// The input a rule is evaluated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum AlertData {
    /// An aggregated system snapshot.
    System(SystemHealth),
    /// One component's latest result.
    Component(ComponentHealth),
    /// Arbitrary named metric values.
    Metrics(HashMap<String, f64>),
}

impl AlertData {
    /// The component this data describes, if any.
    #[must_use]
    pub fn component_name(&self) -> Option<&str> {
        match self {
            Self::Component(health) => Some(&health.component_name),
            Self::System(_) | Self::Metrics(_) => None,
        }
    }

    /// Short tag naming the kind of data.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::System(_) => "system",
            Self::Component(_) => "component",
            Self::Metrics(_) => "metrics",
        }
    }
}

impl From<SystemHealth> for AlertData {
    fn from(health: SystemHealth) -> Self {
        Self::System(health)
    }
}

impl From<ComponentHealth> for AlertData {
    fn from(health: ComponentHealth) -> Self {
        Self::Component(health)
    }
}

impl From<HashMap<String, f64>> for AlertData {
    fn from(values: HashMap<String, f64>) -> Self {
        Self::Metrics(values)
    }
}

/// Signature of a caller-supplied condition.
pub type ConditionFn = dyn Fn(&AlertData) -> Result<bool> + Send + Sync;

/// A predicate over [`AlertData`].
///
/// The built-in variants only match the kind of data they describe: a
/// component condition given a system snapshot evaluates to `false`.
#[derive(Clone)]
pub enum AlertCondition {
    /// The system snapshot has this status.
    SystemStatus(HealthStatus),
    /// The component has this status.
    ComponentStatus(HealthStatus),
    /// The component's response time exceeds this many milliseconds.
    ComponentLatencyAbove(f64),
    /// The component's success rate is below this percentage.
    ComponentSuccessRateBelow(f64),
    /// A named metric compared against a threshold.
    Metric {
        /// Metric name looked up in [`AlertData::Metrics`].
        name: String,
        /// The comparison operator.
        operator: ComparisonOperator,
        /// Right-hand side of the comparison.
        threshold: f64,
    },
    /// A caller-supplied predicate.
    Custom(Arc<ConditionFn>),
}

impl AlertCondition {
    /// Creates a metric condition.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidRule` if the metric name is empty or the
    /// threshold is not finite.
    pub fn metric(
        name: impl Into<String>,
        operator: ComparisonOperator,
        threshold: f64,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(AlertError::InvalidRule {
                reason: "metric name cannot be empty".to_string(),
            });
        }
        if !threshold.is_finite() {
            return Err(AlertError::InvalidRule {
                reason: format!("metric threshold must be finite, got {threshold}"),
            });
        }
        Ok(Self::Metric {
            name,
            operator,
            threshold,
        })
    }

    /// Wraps a closure as a condition.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&AlertData) -> Result<bool> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Evaluates the condition.
    ///
    /// A metric missing from the data evaluates to `false`.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::EvaluationError` if a metric value is not a
    /// finite number, or whatever a custom predicate returns.
    pub fn evaluate(&self, data: &AlertData) -> Result<bool> {
        match (self, data) {
            (Self::SystemStatus(status), AlertData::System(health)) => Ok(health.status == *status),
            (Self::ComponentStatus(status), AlertData::Component(health)) => {
                Ok(health.status == *status)
            }
            (Self::ComponentLatencyAbove(limit), AlertData::Component(health)) => {
                Ok(health.response_time_ms > *limit)
            }
            (Self::ComponentSuccessRateBelow(limit), AlertData::Component(health)) => {
                Ok(health.success_rate < *limit)
            }
            (
                Self::Metric {
                    name,
                    operator,
                    threshold,
                },
                AlertData::Metrics(values),
            ) => match values.get(name) {
                Some(value) if value.is_finite() => Ok(operator.evaluate(*value, *threshold)),
                Some(value) => Err(AlertError::EvaluationError {
                    reason: format!("metric {name} is not a finite number: {value}"),
                }),
                None => {
                    tracing::debug!(metric = %name, "metric missing from data");
                    Ok(false)
                }
            },
            (Self::Custom(f), data) => f(data),
            _ => Ok(false),
        }
    }
}

impl fmt::Debug for AlertCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(_) => f.write_str("Custom(..)"),
            other => write!(f, "{other}"),
        }
    }
}

impl fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SystemStatus(status) => write!(f, "system status == {status}"),
            Self::ComponentStatus(status) => write!(f, "component status == {status}"),
            Self::ComponentLatencyAbove(limit) => write!(f, "component response_time_ms > {limit}"),
            Self::ComponentSuccessRateBelow(limit) => write!(f, "component success_rate < {limit}"),
            Self::Metric {
                name,
                operator,
                threshold,
            } => write!(f, "{name} {operator} {threshold}"),
            Self::Custom(_) => write!(f, "custom"),
        }
    }
}

/// A rule that defines when and how to raise an alert.
#[derive(Debug, Clone)]
pub struct AlertRule {
    /// Unique name; also the deduplication key.
    pub name: String,
    /// The condition that triggers this alert.
    pub condition: AlertCondition,
    /// The severity of alerts generated by this rule.
    pub severity: AlertSeverity,
    /// Message with `{placeholder}` fields filled from the data.
    pub message_template: String,
    /// Minimum minutes between two alerts from this rule.
    pub cooldown_minutes: u64,
    /// Maximum alerts from this rule in any rolling hour.
    pub max_alerts_per_hour: u32,
    /// Whether this rule is evaluated.
    pub enabled: bool,
}

impl AlertRule {
    /// Maximum allowed length for rule names.
    pub const MAX_NAME_LENGTH: usize = 256;

    /// Creates a new alert rule builder.
    pub fn builder(name: impl Into<String>, condition: AlertCondition) -> AlertRuleBuilder {
        AlertRuleBuilder::new(name, condition)
    }

    /// Returns the cooldown as a [`Duration`].
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        i64::try_from(self.cooldown_minutes)
            .ok()
            .and_then(Duration::try_minutes)
            .unwrap_or(Duration::MAX)
    }
}

/// Builder for creating [`AlertRule`] instances.
#[derive(Debug)]
pub struct AlertRuleBuilder {
    name: String,
    condition: AlertCondition,
    severity: AlertSeverity,
    message_template: Option<String>,
    cooldown_minutes: u64,
    max_alerts_per_hour: u32,
    enabled: bool,
}

impl AlertRuleBuilder {
    /// Default cooldown in minutes.
    pub const DEFAULT_COOLDOWN_MINUTES: u64 = 5;
    /// Default hourly cap.
    pub const DEFAULT_MAX_ALERTS_PER_HOUR: u32 = 10;

    fn new(name: impl Into<String>, condition: AlertCondition) -> Self {
        Self {
            name: name.into(),
            condition,
            severity: AlertSeverity::Warning,
            message_template: None,
            cooldown_minutes: Self::DEFAULT_COOLDOWN_MINUTES,
            max_alerts_per_hour: Self::DEFAULT_MAX_ALERTS_PER_HOUR,
            enabled: true,
        }
    }

    /// Sets the severity level.
    #[must_use]
    pub const fn severity(mut self, severity: AlertSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets the message template. Defaults to the rule name.
    #[must_use]
    pub fn message_template(mut self, template: impl Into<String>) -> Self {
        self.message_template = Some(template.into());
        self
    }

    /// Sets the cooldown in minutes.
    #[must_use]
    pub const fn cooldown_minutes(mut self, minutes: u64) -> Self {
        self.cooldown_minutes = minutes;
        self
    }

    /// Sets the hourly cap.
    #[must_use]
    pub const fn max_alerts_per_hour(mut self, max: u32) -> Self {
        self.max_alerts_per_hour = max;
        self
    }

    /// Sets whether the rule is enabled.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builds the [`AlertRule`].
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidRule` if:
    /// - The name is empty
    /// - The name exceeds the maximum length
    /// - The hourly cap is zero
    pub fn build(self) -> Result<AlertRule> {
        if self.name.trim().is_empty() {
            return Err(AlertError::InvalidRule {
                reason: "rule name cannot be empty".to_string(),
            });
        }

        if self.name.len() > AlertRule::MAX_NAME_LENGTH {
            return Err(AlertError::InvalidRule {
                reason: format!(
                    "rule name exceeds maximum length of {} characters",
                    AlertRule::MAX_NAME_LENGTH
                ),
            });
        }

        if self.max_alerts_per_hour == 0 {
            return Err(AlertError::InvalidRule {
                reason: "max_alerts_per_hour must be at least 1".to_string(),
            });
        }

        let message_template = self.message_template.unwrap_or_else(|| self.name.clone());

        Ok(AlertRule {
            name: self.name,
            condition: self.condition,
            severity: self.severity,
            message_template,
            cooldown_minutes: self.cooldown_minutes,
            max_alerts_per_hour: self.max_alerts_per_hour,
            enabled: self.enabled,
        })
    }
}

/// Metadata key holding the reason given on resolve.
pub const RESOLUTION_REASON: &str = "resolution_reason";
/// Metadata key holding the reason given on acknowledge.
pub const ACKNOWLEDGMENT_REASON: &str = "acknowledgment_reason";
/// Metadata key holding the reason given on suppress.
pub const SUPPRESSION_REASON: &str = "suppression_reason";

/// An alert raised by a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique identifier for this alert instance.
    pub id: String,
    /// The name of the rule that raised this alert.
    pub name: String,
    /// The severity of the alert.
    pub severity: AlertSeverity,
    /// Lifecycle status.
    pub status: AlertStatus,
    /// Rendered message.
    pub message: String,
    /// The component the alert is about, if any.
    pub component: Option<String>,
    /// When the alert was raised.
    pub created_at: DateTime<Utc>,
    /// When the alert last changed.
    pub updated_at: DateTime<Utc>,
    /// When the alert was resolved.
    pub resolved_at: Option<DateTime<Utc>>,
    /// When the alert was acknowledged.
    pub acknowledged_at: Option<DateTime<Utc>>,
    /// Free-form metadata.
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Alert {
    /// Creates an active alert for `rule` raised from `data`.
    #[must_use]
    pub fn new(rule: &AlertRule, message: String, data: &AlertData, now: DateTime<Utc>) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), serde_json::Value::from(data.kind()));

        Self {
            id: Uuid::new_v4().to_string(),
            name: rule.name.clone(),
            severity: rule.severity,
            status: AlertStatus::Active,
            message,
            component: data.component_name().map(str::to_string),
            created_at: now,
            updated_at: now,
            resolved_at: None,
            acknowledged_at: None,
            metadata,
        }
    }

    /// Moves an `active` alert to `acknowledged`.
    ///
    /// Returns false, changing nothing, from any other status.
    pub fn acknowledge(&mut self, reason: Option<&str>, now: DateTime<Utc>) -> bool {
        if self.status != AlertStatus::Active {
            return false;
        }
        self.status = AlertStatus::Acknowledged;
        self.acknowledged_at = Some(now);
        self.touch(ACKNOWLEDGMENT_REASON, reason, now);
        true
    }

    /// Moves an `active` or `acknowledged` alert to `suppressed`.
    ///
    /// Returns false, changing nothing, from any other status.
    pub fn suppress(&mut self, reason: Option<&str>, now: DateTime<Utc>) -> bool {
        if !matches!(self.status, AlertStatus::Active | AlertStatus::Acknowledged) {
            return false;
        }
        self.status = AlertStatus::Suppressed;
        self.touch(SUPPRESSION_REASON, reason, now);
        true
    }

    /// Moves any open alert to `resolved`.
    ///
    /// Returns false, changing nothing, if already resolved.
    pub fn resolve(&mut self, reason: Option<&str>, now: DateTime<Utc>) -> bool {
        if !self.status.is_open() {
            return false;
        }
        self.status = AlertStatus::Resolved;
        self.resolved_at = Some(now);
        self.touch(RESOLUTION_REASON, reason, now);
        true
    }

    /// Returns true unless the alert is resolved.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.status.is_open()
    }

    fn touch(&mut self, key: &str, reason: Option<&str>, now: DateTime<Utc>) {
        self.updated_at = now;
        if let Some(reason) = reason {
            self.metadata
                .insert(key.to_string(), serde_json::Value::from(reason));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use vigil_health::ComponentType;

    fn component(status: HealthStatus, response_time_ms: f64, success_rate: f64) -> AlertData {
        AlertData::Component(ComponentHealth {
            status,
            response_time_ms,
            success_rate,
            ..ComponentHealth::unchecked("db", ComponentType::Database, Utc::now())
        })
    }

    fn system(statuses: &[HealthStatus]) -> AlertData {
        let components = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                let name = format!("c{i}");
                let health = ComponentHealth {
                    status: *status,
                    ..ComponentHealth::unchecked(&name, ComponentType::Api, Utc::now())
                };
                (name, health)
            })
            .collect();
        AlertData::System(SystemHealth::from_components(components, Utc::now()))
    }

    fn metrics(pairs: &[(&str, f64)]) -> AlertData {
        AlertData::Metrics(pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect())
    }

    fn test_rule() -> AlertRule {
        AlertRule::builder("db_down", AlertCondition::ComponentStatus(HealthStatus::Unhealthy))
            .severity(AlertSeverity::Error)
            .build()
            .unwrap()
    }

    mod severity_tests {
        use super::*;
        use test_case::test_case;

        #[test]
        fn severity_as_str() {
            assert_eq!(AlertSeverity::Info.as_str(), "info");
            assert_eq!(AlertSeverity::Warning.as_str(), "warning");
            assert_eq!(AlertSeverity::Error.as_str(), "error");
            assert_eq!(AlertSeverity::Critical.as_str(), "critical");
        }

        #[test]
        fn severity_ordering() {
            assert!(AlertSeverity::Info < AlertSeverity::Warning);
            assert!(AlertSeverity::Warning < AlertSeverity::Error);
            assert!(AlertSeverity::Error < AlertSeverity::Critical);
            assert!(AlertSeverity::Critical.priority() > AlertSeverity::Error.priority());
        }

        #[test]
        fn severity_default() {
            assert_eq!(AlertSeverity::default(), AlertSeverity::Warning);
        }

        #[test_case("info", AlertSeverity::Info ; "info")]
        #[test_case("WARN", AlertSeverity::Warning ; "warn alias")]
        #[test_case("error", AlertSeverity::Error ; "error")]
        #[test_case(" critical ", AlertSeverity::Critical ; "padded")]
        fn severity_parse(input: &str, expected: AlertSeverity) {
            assert_eq!(input.parse::<AlertSeverity>().unwrap(), expected);
        }

        #[test]
        fn severity_parse_unknown_fails() {
            assert!("page-everyone".parse::<AlertSeverity>().is_err());
        }

        #[test]
        fn severity_serializes_lowercase() {
            let json = serde_json::to_string(&AlertSeverity::Critical).unwrap();
            assert_eq!(json, "\"critical\"");
        }
    }

    mod status_tests {
        use super::*;

        #[test]
        fn status_is_open() {
            assert!(AlertStatus::Active.is_open());
            assert!(AlertStatus::Acknowledged.is_open());
            assert!(AlertStatus::Suppressed.is_open());
            assert!(!AlertStatus::Resolved.is_open());
        }

        #[test]
        fn status_display() {
            assert_eq!(AlertStatus::Acknowledged.to_string(), "acknowledged");
        }
    }

    mod operator_tests {
        use super::*;
        use test_case::test_case;

        #[test_case(ComparisonOperator::GreaterThan, 5.0, 3.0, true ; "gt true")]
        #[test_case(ComparisonOperator::GreaterThan, 3.0, 3.0, false ; "gt equal")]
        #[test_case(ComparisonOperator::GreaterThanOrEqual, 3.0, 3.0, true ; "ge equal")]
        #[test_case(ComparisonOperator::LessThan, 2.0, 3.0, true ; "lt true")]
        #[test_case(ComparisonOperator::LessThanOrEqual, 4.0, 3.0, false ; "le false")]
        #[test_case(ComparisonOperator::Equal, 3.0, 3.0, true ; "eq")]
        #[test_case(ComparisonOperator::NotEqual, 3.0, 3.0, false ; "ne equal")]
        fn operator_evaluate(op: ComparisonOperator, left: f64, right: f64, expected: bool) {
            assert_eq!(op.evaluate(left, right), expected);
        }

        #[test]
        fn operator_serialization_uses_symbols() {
            let json = serde_json::to_string(&ComparisonOperator::GreaterThanOrEqual).unwrap();
            assert_eq!(json, "\">=\"");
        }
    }

    mod condition_tests {
        use super::*;

        #[test]
        fn system_status_matches_snapshot() {
            let condition = AlertCondition::SystemStatus(HealthStatus::Unhealthy);
            assert!(condition
                .evaluate(&system(&[HealthStatus::Healthy, HealthStatus::Unhealthy]))
                .unwrap());
            assert!(!condition.evaluate(&system(&[HealthStatus::Healthy])).unwrap());
        }

        #[test]
        fn component_conditions() {
            let slow = component(HealthStatus::Healthy, 6000.0, 100.0);
            assert!(AlertCondition::ComponentLatencyAbove(5000.0).evaluate(&slow).unwrap());
            assert!(!AlertCondition::ComponentSuccessRateBelow(90.0).evaluate(&slow).unwrap());

            let flaky = component(HealthStatus::Degraded, 20.0, 70.0);
            assert!(AlertCondition::ComponentSuccessRateBelow(90.0).evaluate(&flaky).unwrap());
            assert!(AlertCondition::ComponentStatus(HealthStatus::Degraded)
                .evaluate(&flaky)
                .unwrap());
        }

        #[test]
        fn mismatched_data_kind_is_false() {
            let condition = AlertCondition::ComponentStatus(HealthStatus::Unhealthy);
            assert!(!condition.evaluate(&system(&[HealthStatus::Unhealthy])).unwrap());

            let condition = AlertCondition::SystemStatus(HealthStatus::Unhealthy);
            assert!(!condition
                .evaluate(&component(HealthStatus::Unhealthy, 0.0, 0.0))
                .unwrap());
        }

        #[test]
        fn metric_condition() {
            let condition =
                AlertCondition::metric("queue_depth", ComparisonOperator::GreaterThan, 100.0)
                    .unwrap();
            assert!(condition.evaluate(&metrics(&[("queue_depth", 150.0)])).unwrap());
            assert!(!condition.evaluate(&metrics(&[("queue_depth", 50.0)])).unwrap());
        }

        #[test]
        fn missing_metric_is_false() {
            let condition =
                AlertCondition::metric("queue_depth", ComparisonOperator::GreaterThan, 100.0)
                    .unwrap();
            assert!(!condition.evaluate(&metrics(&[("other", 150.0)])).unwrap());
        }

        #[test]
        fn nan_metric_is_error() {
            let condition =
                AlertCondition::metric("queue_depth", ComparisonOperator::GreaterThan, 100.0)
                    .unwrap();
            let result = condition.evaluate(&metrics(&[("queue_depth", f64::NAN)]));
            assert!(matches!(result, Err(AlertError::EvaluationError { .. })));
        }

        #[test]
        fn metric_condition_validation() {
            assert!(AlertCondition::metric("", ComparisonOperator::LessThan, 1.0).is_err());
            assert!(AlertCondition::metric("x", ComparisonOperator::LessThan, f64::INFINITY).is_err());
        }

        #[test]
        fn custom_condition() {
            let condition = AlertCondition::custom(|data| Ok(data.component_name() == Some("db")));
            assert!(condition
                .evaluate(&component(HealthStatus::Healthy, 1.0, 100.0))
                .unwrap());
            assert!(!condition.evaluate(&metrics(&[])).unwrap());
        }

        #[test]
        fn condition_display() {
            let condition =
                AlertCondition::metric("cpu", ComparisonOperator::GreaterThan, 80.0).unwrap();
            assert_eq!(condition.to_string(), "cpu > 80");
            assert_eq!(
                AlertCondition::SystemStatus(HealthStatus::Degraded).to_string(),
                "system status == degraded"
            );
            assert_eq!(format!("{:?}", AlertCondition::custom(|_| Ok(true))), "Custom(..)");
        }
    }

    mod rule_tests {
        use super::*;

        #[test]
        fn builder_defaults() {
            let rule = AlertRule::builder("r", AlertCondition::SystemStatus(HealthStatus::Degraded))
                .build()
                .unwrap();
            assert_eq!(rule.severity, AlertSeverity::Warning);
            assert_eq!(rule.message_template, "r");
            assert_eq!(rule.cooldown_minutes, 5);
            assert_eq!(rule.max_alerts_per_hour, 10);
            assert!(rule.enabled);
            assert_eq!(rule.cooldown(), Duration::minutes(5));
        }

        #[test]
        fn builder_sets_fields() {
            let rule = AlertRule::builder("r", AlertCondition::SystemStatus(HealthStatus::Degraded))
                .severity(AlertSeverity::Critical)
                .message_template("{status}")
                .cooldown_minutes(0)
                .max_alerts_per_hour(3)
                .enabled(false)
                .build()
                .unwrap();
            assert_eq!(rule.severity, AlertSeverity::Critical);
            assert_eq!(rule.message_template, "{status}");
            assert_eq!(rule.cooldown_minutes, 0);
            assert_eq!(rule.max_alerts_per_hour, 3);
            assert!(!rule.enabled);
        }

        #[test]
        fn rule_empty_name_fails() {
            let result =
                AlertRule::builder("", AlertCondition::SystemStatus(HealthStatus::Degraded)).build();
            assert!(matches!(result, Err(AlertError::InvalidRule { .. })));
        }

        #[test]
        fn rule_name_too_long_fails() {
            let name = "x".repeat(AlertRule::MAX_NAME_LENGTH + 1);
            let result =
                AlertRule::builder(name, AlertCondition::SystemStatus(HealthStatus::Degraded)).build();
            assert!(result.is_err());
        }

        #[test]
        fn rule_zero_cap_fails() {
            let result = AlertRule::builder("r", AlertCondition::SystemStatus(HealthStatus::Degraded))
                .max_alerts_per_hour(0)
                .build();
            assert!(matches!(result, Err(AlertError::InvalidRule { .. })));
        }
    }

    mod alert_tests {
        use super::*;

        fn new_alert() -> Alert {
            let data = component(HealthStatus::Unhealthy, 0.0, 0.0);
            Alert::new(&test_rule(), "db is down".to_string(), &data, Utc::now())
        }

        #[test]
        fn new_alert_is_active() {
            let alert = new_alert();
            assert_eq!(alert.status, AlertStatus::Active);
            assert_eq!(alert.name, "db_down");
            assert_eq!(alert.severity, AlertSeverity::Error);
            assert_eq!(alert.component.as_deref(), Some("db"));
            assert_eq!(alert.metadata.get("source"), Some(&serde_json::json!("component")));
            assert!(alert.resolved_at.is_none());
            assert!(alert.acknowledged_at.is_none());
        }

        #[test]
        fn alert_ids_are_unique() {
            assert_ne!(new_alert().id, new_alert().id);
        }

        #[test]
        fn acknowledge_only_from_active() {
            let mut alert = new_alert();
            let now = Utc::now();
            assert!(alert.acknowledge(Some("looking"), now));
            assert_eq!(alert.status, AlertStatus::Acknowledged);
            assert_eq!(alert.acknowledged_at, Some(now));
            assert_eq!(
                alert.metadata.get(ACKNOWLEDGMENT_REASON),
                Some(&serde_json::json!("looking"))
            );
            assert!(!alert.acknowledge(None, now));
        }

        #[test]
        fn suppress_from_acknowledged() {
            let mut alert = new_alert();
            let now = Utc::now();
            alert.acknowledge(None, now);
            assert!(alert.suppress(Some("maintenance"), now));
            assert_eq!(alert.status, AlertStatus::Suppressed);
            assert!(!alert.suppress(None, now));
        }

        #[test]
        fn resolve_is_terminal() {
            let mut alert = new_alert();
            let now = Utc::now();
            assert!(alert.resolve(Some("fixed"), now));
            assert_eq!(alert.resolved_at, Some(now));
            assert!(!alert.is_open());

            let before = alert.clone();
            assert!(!alert.resolve(Some("again"), now));
            assert!(!alert.acknowledge(None, now));
            assert!(!alert.suppress(None, now));
            assert_eq!(alert, before);
        }

        #[test]
        fn alert_serializes() {
            let alert = new_alert();
            let json = serde_json::to_value(&alert).unwrap();
            assert_eq!(json["status"], "active");
            assert_eq!(json["severity"], "error");
            assert_eq!(json["component"], "db");
        }
    }
}
