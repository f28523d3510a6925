//! Runs a single health check and normalizes what comes back.
//!
//! Every failure mode of a checker ends up as a [`ComponentHealth`]:
//! errors and panics become `unhealthy`, a hung checker is cut off at the
//! timeout and also becomes `unhealthy`, and a report with impossible rates
//! becomes `unknown`. Nothing escapes to the caller.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::check::{BoxError, CheckOutcome, CheckReport, HealthCheck};
use crate::types::{ComponentHealth, ComponentType, HealthStatus, HealthThreshold};

/// What happened when a checker ran.
#[derive(Debug)]
pub enum ProbeOutcome {
    /// The checker returned normally.
    Returned(CheckOutcome),
    /// The checker returned an error.
    Failed(BoxError),
    /// The checker's task panicked.
    Panicked(String),
    /// The checker did not finish within the timeout.
    TimedOut(Duration),
}

/// Executes checkers under a timeout.
#[derive(Debug, Clone, Copy)]
pub struct Prober {
    timeout: Duration,
}

impl Prober {
    /// Creates a prober with the given per-check timeout.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Returns the per-check timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs the checker on its own task and returns the outcome and the
    /// elapsed time in milliseconds.
    ///
    /// A checker still running at the timeout is aborted.
    pub async fn run(&self, checker: Arc<dyn HealthCheck>) -> (ProbeOutcome, f64) {
        let started = Instant::now();
        let mut task = tokio::spawn(async move { checker.check().await });

        let outcome = match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(Ok(outcome))) => ProbeOutcome::Returned(outcome),
            Ok(Ok(Err(e))) => ProbeOutcome::Failed(e),
            Ok(Err(join_err)) => {
                let reason = if join_err.is_panic() {
                    "health check panicked".to_string()
                } else {
                    format!("health check task failed: {join_err}")
                };
                ProbeOutcome::Panicked(reason)
            }
            Err(_) => {
                task.abort();
                ProbeOutcome::TimedOut(self.timeout)
            }
        };

        let elapsed_ms = match outcome {
            ProbeOutcome::TimedOut(t) => duration_ms(t),
            _ => duration_ms(started.elapsed()),
        };

        (outcome, elapsed_ms)
    }

    /// Runs the checker and normalizes the result into a [`ComponentHealth`].
    pub async fn probe(
        &self,
        name: &str,
        component_type: &ComponentType,
        checker: Arc<dyn HealthCheck>,
        threshold: &HealthThreshold,
        checked_at: impl FnOnce() -> DateTime<Utc>,
    ) -> ComponentHealth {
        let (outcome, elapsed_ms) = self.run(checker).await;
        let health = normalize(
            name,
            component_type.clone(),
            outcome,
            elapsed_ms,
            threshold,
            checked_at(),
        );

        match health.status {
            HealthStatus::Healthy => debug!(
                component = %name,
                response_time_ms = health.response_time_ms,
                "component healthy"
            ),
            status => warn!(
                component = %name,
                status = %status,
                response_time_ms = health.response_time_ms,
                error = health.error_message.as_deref().unwrap_or(""),
                "component not healthy"
            ),
        }

        health
    }
}

/// Converts a raw probe outcome into a [`ComponentHealth`] and applies the
/// threshold downgrade.
#[must_use]
pub fn normalize(
    name: &str,
    component_type: ComponentType,
    outcome: ProbeOutcome,
    elapsed_ms: f64,
    threshold: &HealthThreshold,
    checked_at: DateTime<Utc>,
) -> ComponentHealth {
    let mut health = ComponentHealth {
        response_time_ms: elapsed_ms,
        ..ComponentHealth::unchecked(name, component_type, checked_at)
    };

    match outcome {
        ProbeOutcome::Returned(CheckOutcome::Passed(true)) => {
            health.status = HealthStatus::Healthy;
            health.success_rate = 100.0;
            health.error_rate = 0.0;
        }
        ProbeOutcome::Returned(CheckOutcome::Passed(false)) => {
            mark_unhealthy(&mut health, "health check returned false".to_string());
        }
        ProbeOutcome::Returned(CheckOutcome::Report(report)) => {
            apply_report(&mut health, report);
        }
        ProbeOutcome::Failed(e) => {
            mark_unhealthy(&mut health, format!("health check failed: {e}"));
        }
        ProbeOutcome::Panicked(reason) => {
            mark_unhealthy(&mut health, reason);
        }
        ProbeOutcome::TimedOut(timeout) => {
            mark_unhealthy(
                &mut health,
                format!("health check timed out after {}s", timeout.as_secs_f64()),
            );
        }
    }

    apply_thresholds(&mut health, threshold);
    health
}

/// Downgrades a `healthy` result to `degraded` when a threshold is violated.
///
/// Limits are checked in order (response time, success rate, error rate)
/// and only the first violation is reported. Non-healthy results are left
/// untouched.
pub fn apply_thresholds(health: &mut ComponentHealth, threshold: &HealthThreshold) {
    if health.status != HealthStatus::Healthy {
        return;
    }

    let violation = if health.response_time_ms > threshold.response_time_ms {
        Some(format!(
            "response time {:.1}ms exceeds threshold {:.1}ms",
            health.response_time_ms, threshold.response_time_ms
        ))
    } else if health.success_rate < threshold.success_rate_percent {
        Some(format!(
            "success rate {:.1}% below threshold {:.1}%",
            health.success_rate, threshold.success_rate_percent
        ))
    } else if health.error_rate > threshold.error_rate_percent {
        Some(format!(
            "error rate {:.1}% exceeds threshold {:.1}%",
            health.error_rate, threshold.error_rate_percent
        ))
    } else {
        None
    };

    if let Some(message) = violation {
        health.status = HealthStatus::Degraded;
        health.error_message = Some(message);
    }
}

fn apply_report(health: &mut ComponentHealth, report: CheckReport) {
    let CheckReport {
        status,
        success_rate,
        error_rate,
        details,
        error_message,
    } = report;

    health.details = details;

    for (label, value) in [("success_rate", success_rate), ("error_rate", error_rate)] {
        if !(0.0..=100.0).contains(&value) {
            health.status = HealthStatus::Unknown;
            health.error_message = Some(format!(
                "malformed check report: {label} {value} is outside 0-100"
            ));
            return;
        }
    }

    health.status = status;
    health.success_rate = success_rate;
    health.error_rate = error_rate;
    health.error_message = error_message;
}

fn mark_unhealthy(health: &mut ComponentHealth, message: String) {
    health.status = HealthStatus::Unhealthy;
    health.success_rate = 0.0;
    health.error_rate = 100.0;
    health.error_message = Some(message);
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::health_check_fn;
    use proptest::prelude::*;

    fn run_normalize(outcome: ProbeOutcome, elapsed_ms: f64, threshold: &HealthThreshold) -> ComponentHealth {
        normalize("room-api", ComponentType::Api, outcome, elapsed_ms, threshold, Utc::now())
    }

    mod normalize_tests {
        use super::*;

        #[test]
        fn bool_true_is_healthy() {
            let h = run_normalize(
                ProbeOutcome::Returned(CheckOutcome::Passed(true)),
                12.0,
                &HealthThreshold::default(),
            );
            assert_eq!(h.status, HealthStatus::Healthy);
            assert!(h.error_message.is_none());
            assert!((h.success_rate - 100.0).abs() < f64::EPSILON);
        }

        #[test]
        fn bool_false_is_unhealthy() {
            let h = run_normalize(
                ProbeOutcome::Returned(CheckOutcome::Passed(false)),
                12.0,
                &HealthThreshold::default(),
            );
            assert_eq!(h.status, HealthStatus::Unhealthy);
        }

        #[test]
        fn error_is_unhealthy_with_message() {
            let h = run_normalize(
                ProbeOutcome::Failed("connection refused".into()),
                3.0,
                &HealthThreshold::default(),
            );
            assert_eq!(h.status, HealthStatus::Unhealthy);
            assert_eq!(
                h.error_message.as_deref(),
                Some("health check failed: connection refused")
            );
        }

        #[test]
        fn timeout_uses_timeout_as_response_time() {
            let h = run_normalize(
                ProbeOutcome::TimedOut(Duration::from_secs(10)),
                10_000.0,
                &HealthThreshold::default(),
            );
            assert_eq!(h.status, HealthStatus::Unhealthy);
            assert!((h.response_time_ms - 10_000.0).abs() < f64::EPSILON);
            assert_eq!(
                h.error_message.as_deref(),
                Some("health check timed out after 10s")
            );
        }

        #[test]
        fn report_fields_are_copied() {
            let report = CheckReport::new(HealthStatus::Degraded)
                .with_success_rate(97.0)
                .with_error_rate(3.0)
                .with_detail("rooms", 4)
                .with_error_message("one node draining");
            let h = run_normalize(
                ProbeOutcome::Returned(report.into()),
                40.0,
                &HealthThreshold::default(),
            );
            assert_eq!(h.status, HealthStatus::Degraded);
            assert_eq!(h.error_message.as_deref(), Some("one node draining"));
            assert_eq!(h.details.get("rooms"), Some(&serde_json::json!(4)));
        }

        #[test]
        fn malformed_report_is_unknown() {
            let report = CheckReport::healthy().with_success_rate(140.0);
            let h = run_normalize(
                ProbeOutcome::Returned(report.into()),
                40.0,
                &HealthThreshold::default(),
            );
            assert_eq!(h.status, HealthStatus::Unknown);
            assert!(h.error_message.unwrap().contains("malformed"));
        }

        #[test]
        fn low_success_rate_degrades() {
            // success_rate=60 against an 80% floor
            let threshold = HealthThreshold::new(5000.0, 80.0, 50.0).unwrap();
            let report = CheckReport::healthy().with_success_rate(60.0).with_error_rate(40.0);
            let h = run_normalize(ProbeOutcome::Returned(report.into()), 20.0, &threshold);
            assert_eq!(h.status, HealthStatus::Degraded);
            assert!(h.error_message.unwrap().contains("success rate"));
        }

        #[test]
        fn response_time_checked_first() {
            let threshold = HealthThreshold::new(100.0, 80.0, 5.0).unwrap();
            let report = CheckReport::healthy().with_success_rate(10.0).with_error_rate(90.0);
            let h = run_normalize(ProbeOutcome::Returned(report.into()), 500.0, &threshold);
            assert_eq!(h.status, HealthStatus::Degraded);
            assert!(h.error_message.unwrap().starts_with("response time"));
        }

        #[test]
        fn high_error_rate_degrades() {
            let threshold = HealthThreshold::new(1000.0, 50.0, 5.0).unwrap();
            let report = CheckReport::healthy().with_success_rate(90.0).with_error_rate(10.0);
            let h = run_normalize(ProbeOutcome::Returned(report.into()), 5.0, &threshold);
            assert_eq!(h.status, HealthStatus::Degraded);
            assert!(h.error_message.unwrap().starts_with("error rate"));
        }

        #[test]
        fn thresholds_never_upgrade() {
            let report = CheckReport::new(HealthStatus::Unhealthy).with_error_message("down");
            let h = run_normalize(
                ProbeOutcome::Returned(report.into()),
                999_999.0,
                &HealthThreshold::default(),
            );
            assert_eq!(h.status, HealthStatus::Unhealthy);
            assert_eq!(h.error_message.as_deref(), Some("down"));
        }
    }

    mod prober_tests {
        use super::*;

        #[tokio::test]
        async fn run_returns_outcome() {
            let prober = Prober::new(Duration::from_secs(1));
            let check: Arc<dyn HealthCheck> =
                Arc::new(health_check_fn(|| async { Ok::<_, BoxError>(true) }));
            let (outcome, _) = prober.run(check).await;
            assert!(matches!(outcome, ProbeOutcome::Returned(CheckOutcome::Passed(true))));
        }

        #[tokio::test(start_paused = true)]
        async fn run_times_out() {
            let prober = Prober::new(Duration::from_secs(2));
            let check: Arc<dyn HealthCheck> = Arc::new(health_check_fn(|| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, BoxError>(true)
            }));
            let (outcome, elapsed_ms) = prober.run(check).await;
            assert!(matches!(outcome, ProbeOutcome::TimedOut(_)));
            assert!((elapsed_ms - 2000.0).abs() < f64::EPSILON);
        }

        #[tokio::test]
        async fn run_catches_panic() {
            let prober = Prober::new(Duration::from_secs(1));
            let check: Arc<dyn HealthCheck> = Arc::new(health_check_fn(|| async {
                if true {
                    panic!("checker bug");
                }
                Ok::<_, BoxError>(true)
            }));
            let (outcome, _) = prober.run(check).await;
            assert!(matches!(outcome, ProbeOutcome::Panicked(_)));
        }

        #[tokio::test(start_paused = true)]
        async fn probe_slow_check_is_degraded() {
            let prober = Prober::new(Duration::from_secs(10));
            let threshold = HealthThreshold::new(100.0, 95.0, 5.0).unwrap();
            let check: Arc<dyn HealthCheck> = Arc::new(health_check_fn(|| async {
                tokio::time::sleep(Duration::from_millis(250)).await;
                Ok::<_, BoxError>(true)
            }));
            let h = prober
                .probe("egress", &ComponentType::Api, check, &threshold, Utc::now)
                .await;
            assert_eq!(h.status, HealthStatus::Degraded);
            assert!(h.response_time_ms >= 250.0);
        }
    }

    proptest! {
        #[test]
        fn over_latency_is_never_healthy(
            limit in 1.0f64..10_000.0,
            excess in 0.001f64..10_000.0,
        ) {
            let threshold = HealthThreshold::new(limit, 0.0, 100.0).unwrap();
            let h = run_normalize(
                ProbeOutcome::Returned(CheckOutcome::Passed(true)),
                limit + excess,
                &threshold,
            );
            prop_assert_eq!(h.status, HealthStatus::Degraded);
        }
    }
}
