//! Core types for health monitoring.
//!
//! - [`HealthStatus`]: normalized status of a component or of the whole system
//! - [`ComponentType`]: coarse classification tag for a component
//! - [`HealthThreshold`]: limits that can only downgrade a healthy probe
//! - [`ComponentHealth`]: the outcome of one probe
//! - [`SystemHealth`]: an aggregated snapshot of every component
//! - [`HealthTrend`]: a windowed view over a component's history

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{HealthError, Result};

/// Normalized health status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Operating normally within every threshold.
    Healthy,
    /// Functional but outside at least one threshold.
    Degraded,
    /// Not functional.
    Unhealthy,
    /// Not yet checked, or the check produced unusable data.
    #[default]
    Unknown,
}

impl HealthStatus {
    /// Returns the status as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
            Self::Unknown => "unknown",
        }
    }

    /// Aggregates component statuses into a system status.
    ///
    /// Any `unhealthy` wins, then any `degraded`; a non-empty set with
    /// neither is `healthy`, and an empty set is `unknown`.
    pub fn aggregate<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut seen_any = false;
        let mut degraded = false;

        for status in statuses {
            seen_any = true;
            match status {
                Self::Unhealthy => return Self::Unhealthy,
                Self::Degraded => degraded = true,
                Self::Healthy | Self::Unknown => {}
            }
        }

        if degraded {
            Self::Degraded
        } else if seen_any {
            Self::Healthy
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classification tag for a monitored component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    /// A remote HTTP/RPC API.
    Api,
    /// A database.
    Database,
    /// A cache.
    Cache,
    /// A message queue or broker.
    MessageQueue,
    /// Object or file storage.
    Storage,
    /// Any other third-party dependency.
    ExternalService,
    /// A caller-defined tag.
    Custom(String),
}

impl ComponentType {
    /// Returns the tag as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Api => "api",
            Self::Database => "database",
            Self::Cache => "cache",
            Self::MessageQueue => "message_queue",
            Self::Storage => "storage",
            Self::ExternalService => "external_service",
            Self::Custom(tag) => tag,
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = HealthError;

    fn from_str(s: &str) -> Result<Self> {
        let tag = s.trim();
        if tag.is_empty() {
            return Err(HealthError::InvalidConfig {
                reason: "component type cannot be empty".to_string(),
            });
        }

        Ok(match tag.to_ascii_lowercase().as_str() {
            "api" => Self::Api,
            "database" | "db" => Self::Database,
            "cache" => Self::Cache,
            "message_queue" | "queue" => Self::MessageQueue,
            "storage" => Self::Storage,
            "external_service" | "external" => Self::ExternalService,
            _ => Self::Custom(tag.to_string()),
        })
    }
}

/// Per-component limits.
///
/// A threshold never upgrades a status; it can only turn a `healthy` probe
/// into a `degraded` one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthThreshold {
    /// Maximum acceptable response time in milliseconds.
    pub response_time_ms: f64,
    /// Minimum acceptable success rate, in percent.
    pub success_rate_percent: f64,
    /// Maximum acceptable error rate, in percent.
    pub error_rate_percent: f64,
}

impl HealthThreshold {
    /// Default maximum response time.
    pub const DEFAULT_RESPONSE_TIME_MS: f64 = 5000.0;
    /// Default minimum success rate.
    pub const DEFAULT_SUCCESS_RATE_PERCENT: f64 = 95.0;
    /// Default maximum error rate.
    pub const DEFAULT_ERROR_RATE_PERCENT: f64 = 5.0;

    /// Creates a threshold from explicit limits.
    ///
    /// # Errors
    ///
    /// Returns `HealthError::InvalidConfig` if a limit is negative, not
    /// finite, or a percentage exceeds 100.
    pub fn new(
        response_time_ms: f64,
        success_rate_percent: f64,
        error_rate_percent: f64,
    ) -> Result<Self> {
        let threshold = Self {
            response_time_ms,
            success_rate_percent,
            error_rate_percent,
        };
        threshold.validate()?;
        Ok(threshold)
    }

    /// Checks that every limit is in range.
    ///
    /// # Errors
    ///
    /// Returns `HealthError::InvalidConfig` describing the first bad limit.
    pub fn validate(&self) -> Result<()> {
        if !self.response_time_ms.is_finite() || self.response_time_ms < 0.0 {
            return Err(HealthError::InvalidConfig {
                reason: format!(
                    "response time threshold must be a non-negative number, got {}",
                    self.response_time_ms
                ),
            });
        }
        for (label, value) in [
            ("success rate", self.success_rate_percent),
            ("error rate", self.error_rate_percent),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(HealthError::InvalidConfig {
                    reason: format!("{label} threshold must be within 0-100, got {value}"),
                });
            }
        }
        Ok(())
    }
}

impl Default for HealthThreshold {
    fn default() -> Self {
        Self {
            response_time_ms: Self::DEFAULT_RESPONSE_TIME_MS,
            success_rate_percent: Self::DEFAULT_SUCCESS_RATE_PERCENT,
            error_rate_percent: Self::DEFAULT_ERROR_RATE_PERCENT,
        }
    }
}

/// The normalized result of probing one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// The component's type tag.
    pub component_type: ComponentType,
    /// The component's registered name.
    pub component_name: String,
    /// Status after threshold evaluation.
    pub status: HealthStatus,
    /// When the probe finished.
    pub last_check: DateTime<Utc>,
    /// Wall time the probe took.
    pub response_time_ms: f64,
    /// Success rate reported by the probe, in percent.
    pub success_rate: f64,
    /// Error rate reported by the probe, in percent.
    pub error_rate: f64,
    /// Free-form details reported by the probe.
    pub details: HashMap<String, serde_json::Value>,
    /// Why the component is not healthy, if it isn't.
    pub error_message: Option<String>,
}

impl ComponentHealth {
    /// Creates a placeholder entry for a component that has not been probed.
    #[must_use]
    pub fn unchecked(
        name: impl Into<String>,
        component_type: ComponentType,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            component_type,
            component_name: name.into(),
            status: HealthStatus::Unknown,
            last_check: at,
            response_time_ms: 0.0,
            success_rate: 0.0,
            error_rate: 0.0,
            details: HashMap::new(),
            error_message: None,
        }
    }

    /// Returns true if the status is `healthy`.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Counts derived from a set of component results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthSummary {
    /// Number of components in the snapshot.
    pub total_components: usize,
    /// Components reporting `healthy`.
    pub healthy_components: usize,
    /// Components reporting `degraded`.
    pub degraded_components: usize,
    /// Components reporting `unhealthy`.
    pub unhealthy_components: usize,
    /// Components reporting `unknown`.
    pub unknown_components: usize,
    /// `healthy / total * 100`, or 0 when empty.
    pub health_percentage: f64,
}

impl HealthSummary {
    /// Tallies the given component results.
    pub fn from_components<'a, I>(components: I) -> Self
    where
        I: IntoIterator<Item = &'a ComponentHealth>,
    {
        let mut summary = Self::default();
        for component in components {
            summary.total_components += 1;
            match component.status {
                HealthStatus::Healthy => summary.healthy_components += 1,
                HealthStatus::Degraded => summary.degraded_components += 1,
                HealthStatus::Unhealthy => summary.unhealthy_components += 1,
                HealthStatus::Unknown => summary.unknown_components += 1,
            }
        }
        if summary.total_components > 0 {
            summary.health_percentage =
                summary.healthy_components as f64 / summary.total_components as f64 * 100.0;
        }
        summary
    }
}

/// An aggregated, point-in-time view of every component.
///
/// Built wholesale from one cycle's results and never patched afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemHealth {
    /// Aggregated status.
    pub status: HealthStatus,
    /// When the snapshot was taken.
    pub last_check: DateTime<Utc>,
    /// Latest result per component.
    pub components: HashMap<String, ComponentHealth>,
    /// Counts derived from `components`.
    pub summary: HealthSummary,
}

impl SystemHealth {
    /// Builds a snapshot from one cycle's component results.
    #[must_use]
    pub fn from_components(
        components: HashMap<String, ComponentHealth>,
        last_check: DateTime<Utc>,
    ) -> Self {
        let status = HealthStatus::aggregate(components.values().map(|c| c.status));
        let summary = HealthSummary::from_components(components.values());
        Self {
            status,
            last_check,
            components,
            summary,
        }
    }

    /// An empty snapshot (status `unknown`).
    #[must_use]
    pub fn empty(at: DateTime<Utc>) -> Self {
        Self::from_components(HashMap::new(), at)
    }

    /// Number of components reporting `healthy`.
    #[must_use]
    pub fn healthy_components(&self) -> usize {
        self.components.values().filter(|c| c.is_healthy()).count()
    }

    /// Number of components in the snapshot.
    #[must_use]
    pub fn total_components(&self) -> usize {
        self.components.len()
    }

    /// Names of components with the given status, sorted.
    #[must_use]
    pub fn components_with_status(&self, status: HealthStatus) -> Vec<String> {
        let mut names: Vec<String> = self
            .components
            .values()
            .filter(|c| c.status == status)
            .map(|c| c.component_name.clone())
            .collect();
        names.sort();
        names
    }
}

/// Coarse direction of a component's health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    /// The latest probe was healthy.
    Improving,
    /// The latest probe was not healthy.
    Degrading,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Improving => write!(f, "improving"),
            Self::Degrading => write!(f, "degrading"),
        }
    }
}

/// Statistics over a component's recent history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthTrend {
    /// The component name.
    pub component_name: String,
    /// Window length in hours.
    pub period_hours: u32,
    /// Number of history entries inside the window.
    pub data_points: usize,
    /// Share of entries that were `healthy`, in percent.
    pub availability_percent: f64,
    /// Mean response time in milliseconds.
    pub avg_response_time_ms: f64,
    /// Mean reported success rate.
    pub avg_success_rate: f64,
    /// Mean reported error rate.
    pub avg_error_rate: f64,
    /// Status of the most recent entry.
    pub current_status: HealthStatus,
    /// Direction derived from the most recent entry.
    pub trend: TrendDirection,
}
