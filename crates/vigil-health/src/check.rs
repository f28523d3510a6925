//! The health-check contract consumed by the monitor.
//!
//! A checker is any async callable that reports on one component. It may
//! answer with a plain boolean, with a structured [`CheckReport`], or fail
//! outright. Implement [`HealthCheck`] directly, or wrap a closure with
//! [`health_check_fn`].

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::types::HealthStatus;

/// Error type a checker may fail with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed future returned by [`HealthCheck::check`].
pub type CheckFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CheckOutcome, BoxError>> + Send + 'a>>;

/// A structured probe payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckReport {
    /// The status the checker itself reports.
    pub status: HealthStatus,
    /// Success rate in percent.
    pub success_rate: f64,
    /// Error rate in percent.
    pub error_rate: f64,
    /// Free-form details.
    #[serde(default)]
    pub details: HashMap<String, serde_json::Value>,
    /// Optional explanation.
    #[serde(default)]
    pub error_message: Option<String>,
}

impl CheckReport {
    /// Creates a report with the given status and perfect rates.
    #[must_use]
    pub fn new(status: HealthStatus) -> Self {
        Self {
            status,
            success_rate: 100.0,
            error_rate: 0.0,
            details: HashMap::new(),
            error_message: None,
        }
    }

    /// Shorthand for a `healthy` report.
    #[must_use]
    pub fn healthy() -> Self {
        Self::new(HealthStatus::Healthy)
    }

    /// Sets the success rate.
    #[must_use]
    pub const fn with_success_rate(mut self, rate: f64) -> Self {
        self.success_rate = rate;
        self
    }

    /// Sets the error rate.
    #[must_use]
    pub const fn with_error_rate(mut self, rate: f64) -> Self {
        self.error_rate = rate;
        self
    }

    /// Adds a detail entry.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Sets the error message.
    #[must_use]
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// What a checker returned.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// A bare pass/fail answer.
    Passed(bool),
    /// A structured report.
    Report(CheckReport),
}

impl From<bool> for CheckOutcome {
    fn from(passed: bool) -> Self {
        Self::Passed(passed)
    }
}

impl From<CheckReport> for CheckOutcome {
    fn from(report: CheckReport) -> Self {
        Self::Report(report)
    }
}

/// Trait for component health checks.
///
/// The monitor runs every check on its own task under a timeout, so an
/// implementation may block on I/O freely; it should not spin.
pub trait HealthCheck: Send + Sync {
    /// Probes the component once.
    ///
    /// # Errors
    ///
    /// Any error is recorded as an `unhealthy` result carrying its message.
    fn check(&self) -> CheckFuture<'_>;
}

/// A [`HealthCheck`] backed by a closure returning a future.
pub struct FnHealthCheck<F> {
    f: F,
}

impl<F> fmt::Debug for FnHealthCheck<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHealthCheck").finish_non_exhaustive()
    }
}

impl<F, Fut, O> HealthCheck for FnHealthCheck<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, BoxError>> + Send + 'static,
    O: Into<CheckOutcome>,
{
    fn check(&self) -> CheckFuture<'_> {
        let fut = (self.f)();
        Box::pin(async move { fut.await.map(Into::into) })
    }
}

/// Wraps a closure as a [`HealthCheck`].
///
/// ```rust
/// use vigil_health::{health_check_fn, BoxError};
///
/// let check = health_check_fn(|| async { Ok::<_, BoxError>(true) });
/// # let _ = check;
/// ```
pub fn health_check_fn<F, Fut, O>(f: F) -> FnHealthCheck<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, BoxError>> + Send + 'static,
    O: Into<CheckOutcome>,
{
    FnHealthCheck { f }
}
