//! Rule-based alerting for Vigil.
//!
//! `vigil-alerts` evaluates rules against health snapshots, single component
//! results or free-form metric maps, and delivers the resulting alerts
//! through notification channels.
//!
//! # Features
//!
//! - **Alert Rules**: status, latency, success-rate, metric-comparison and
//!   custom conditions with a severity and a message template
//! - **Deduplication**: a per-rule cooldown and a rolling hourly cap
//! - **Lifecycle**: active, acknowledged, suppressed and resolved alerts with
//!   a timestamped reason for every transition
//! - **Notification Channels**: tracing logs, JSON webhooks, or your own
//!   [`NotificationChannel`], each filtered by severity
//! - **Retention**: a background loop that drops old resolved alerts
//!
//! # Example
//!
//! ```rust
//! use vigil_alerts::{AlertData, AlertManager, AlertSeverity, LogChannel};
//! use vigil_health::{ComponentHealth, ComponentType, HealthStatus};
//!
//! # let rt = tokio::runtime::Runtime::new().unwrap();
//! # rt.block_on(async {
//! let manager = AlertManager::default();
//! manager.add_default_rules().unwrap();
//! manager.add_channel("log", LogChannel::default());
//!
//! let health = ComponentHealth {
//!     status: HealthStatus::Unhealthy,
//!     error_message: Some("connection refused".to_string()),
//!     ..ComponentHealth::unchecked("postgres", ComponentType::Database, chrono::Utc::now())
//! };
//!
//! let raised = manager.evaluate_rules(&AlertData::from(health)).await;
//! let unhealthy = raised.iter().find(|a| a.name == "component_unhealthy").unwrap();
//! assert_eq!(unhealthy.severity, AlertSeverity::Error);
//! assert_eq!(unhealthy.message, "Component postgres is unhealthy: connection refused");
//! # });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod channels;
pub mod error;
pub mod limiter;
pub mod manager;
pub mod rules;
pub mod template;
pub mod types;

// Re-export main types at crate root
pub use channels::{
    HealthFuture, LogChannel, NotificationChannel, SendFuture, WebhookChannel, WebhookConfig,
    WebhookPayload, all_severities,
};
pub use error::{AlertError, Result};
pub use limiter::{Admission, RateLimiter};
pub use manager::{AlertManager, AlertManagerConfig, AlertSummary};
pub use rules::default_rules;
pub use types::{
    Alert, AlertCondition, AlertData, AlertRule, AlertRuleBuilder, AlertSeverity, AlertStatus,
    ComparisonOperator, ConditionFn,
};
