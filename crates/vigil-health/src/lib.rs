//! Component health monitoring for Vigil.
//!
//! `vigil-health` probes registered components through caller-supplied
//! checks, classifies each result against per-component thresholds and
//! aggregates the results into a system-wide snapshot.
//!
//! # Features
//!
//! - **Pluggable checks**: any async callable returning a boolean or a
//!   structured [`CheckReport`]
//! - **Fault isolation**: errors, panics and hung checks become `unhealthy`
//!   results instead of escaping
//! - **Thresholds**: response time, success rate and error rate limits that
//!   downgrade a healthy probe to `degraded`
//! - **History and trends**: a bounded per-component history with windowed
//!   availability statistics
//! - **Background loop**: periodic checks with cooperative shutdown
//!
//! # Example
//!
//! ```rust
//! use vigil_health::{BoxError, ComponentType, HealthMonitor, HealthStatus, health_check_fn};
//!
//! # tokio_test_main();
//! # fn tokio_test_main() {
//! # let rt = tokio::runtime::Runtime::new().unwrap();
//! # rt.block_on(async {
//! let monitor = HealthMonitor::default();
//!
//! monitor
//!     .register_component(
//!         "postgres",
//!         ComponentType::Database,
//!         health_check_fn(|| async { Ok::<_, BoxError>(true) }),
//!         None,
//!     )
//!     .unwrap();
//!
//! let snapshot = monitor.check_all_components().await;
//! assert_eq!(snapshot.status, HealthStatus::Healthy);
//! # });
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod check;
pub mod clock;
pub mod error;
pub mod history;
pub mod monitor;
pub mod prober;
pub mod task;
pub mod types;

pub use check::{BoxError, CheckFuture, CheckOutcome, CheckReport, FnHealthCheck, HealthCheck, health_check_fn};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock, system_clock};
pub use error::{HealthError, Result};
pub use history::HealthHistory;
pub use monitor::{HealthMonitor, HealthMonitorConfig, RegistrationPolicy};
pub use prober::{ProbeOutcome, Prober};
pub use task::PeriodicTask;
pub use types::{
    ComponentHealth, ComponentType, HealthStatus, HealthSummary, HealthThreshold, HealthTrend,
    SystemHealth, TrendDirection,
};
