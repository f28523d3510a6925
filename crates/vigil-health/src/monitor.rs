//! The health monitor.
//!
//! [`HealthMonitor`] owns the component registry. It probes components on
//! demand or from a periodic background loop, keeps the latest result and a
//! bounded history per component, and publishes an aggregated
//! [`SystemHealth`] snapshot after every cycle.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::check::HealthCheck;
use crate::clock::{SharedClock, system_clock};
use crate::error::{HealthError, Result};
use crate::history::HealthHistory;
use crate::prober::Prober;
use crate::task::PeriodicTask;
use crate::types::{
    ComponentHealth, ComponentType, HealthStatus, HealthThreshold, HealthTrend, SystemHealth,
};

/// What to do when a component name is registered twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationPolicy {
    /// Replace the existing entry, discarding its results and history.
    #[default]
    Replace,
    /// Fail with [`HealthError::DuplicateComponent`].
    Reject,
}

/// Configuration for the health monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthMonitorConfig {
    /// Seconds between background check cycles.
    pub check_interval_secs: u64,
    /// Per-component check timeout in milliseconds.
    pub component_timeout_ms: u64,
    /// Number of results kept per component.
    pub history_size: usize,
    /// Duplicate registration policy.
    pub registration_policy: RegistrationPolicy,
}

impl HealthMonitorConfig {
    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns `HealthError::InvalidConfig` for a zero interval, timeout or
    /// history size.
    pub fn validate(&self) -> Result<()> {
        if self.check_interval_secs == 0 {
            return Err(HealthError::InvalidConfig {
                reason: "check_interval_secs must be at least 1".to_string(),
            });
        }
        if self.component_timeout_ms == 0 {
            return Err(HealthError::InvalidConfig {
                reason: "component_timeout_ms must be positive".to_string(),
            });
        }
        if self.history_size == 0 {
            return Err(HealthError::InvalidConfig {
                reason: "history_size must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// The check interval as a [`Duration`].
    #[must_use]
    pub const fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// The component timeout as a [`Duration`].
    #[must_use]
    pub const fn component_timeout(&self) -> Duration {
        Duration::from_millis(self.component_timeout_ms)
    }
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 30,
            component_timeout_ms: 10_000,
            history_size: 100,
            registration_policy: RegistrationPolicy::Replace,
        }
    }
}

struct RegisteredComponent {
    component_type: ComponentType,
    checker: Arc<dyn HealthCheck>,
    threshold: HealthThreshold,
    latest: Option<ComponentHealth>,
    history: HealthHistory,
    generation: u64,
}

impl fmt::Debug for RegisteredComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredComponent")
            .field("component_type", &self.component_type)
            .field("threshold", &self.threshold)
            .field("latest", &self.latest.as_ref().map(|h| h.status))
            .field("history_len", &self.history.len())
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// Monitors the health of registered components.
///
/// Clones share the same registry, snapshot and background task.
#[derive(Debug)]
pub struct HealthMonitor {
    config: HealthMonitorConfig,
    prober: Prober,
    clock: SharedClock,
    components: Arc<RwLock<HashMap<String, RegisteredComponent>>>,
    snapshots: Arc<watch::Sender<SystemHealth>>,
    cycle: Arc<tokio::sync::Mutex<()>>,
    task: Arc<Mutex<Option<PeriodicTask>>>,
    generations: Arc<AtomicU64>,
}

impl HealthMonitor {
    /// Creates a monitor using the system clock.
    ///
    /// # Errors
    ///
    /// Returns `HealthError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: HealthMonitorConfig) -> Result<Self> {
        Self::with_clock(config, system_clock())
    }

    /// Creates a monitor reading time from `clock`.
    ///
    /// # Errors
    ///
    /// Returns `HealthError::InvalidConfig` if the configuration is invalid.
    pub fn with_clock(config: HealthMonitorConfig, clock: SharedClock) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, clock))
    }

    fn build(config: HealthMonitorConfig, clock: SharedClock) -> Self {
        let (snapshots, _) = watch::channel(SystemHealth::empty(clock.now()));
        Self {
            prober: Prober::new(config.component_timeout()),
            config,
            clock,
            components: Arc::new(RwLock::new(HashMap::new())),
            snapshots: Arc::new(snapshots),
            cycle: Arc::new(tokio::sync::Mutex::new(())),
            task: Arc::new(Mutex::new(None)),
            generations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &HealthMonitorConfig {
        &self.config
    }

    // ============ Registry ============

    /// Registers a component.
    ///
    /// `threshold` defaults to [`HealthThreshold::default`]. A name that is
    /// already registered is handled per
    /// [`HealthMonitorConfig::registration_policy`].
    ///
    /// # Errors
    ///
    /// Returns `HealthError::InvalidComponentName` for an empty name,
    /// `HealthError::InvalidConfig` for an out-of-range threshold, and
    /// `HealthError::DuplicateComponent` under [`RegistrationPolicy::Reject`].
    pub fn register_component<C>(
        &self,
        name: impl Into<String>,
        component_type: ComponentType,
        checker: C,
        threshold: Option<HealthThreshold>,
    ) -> Result<()>
    where
        C: HealthCheck + 'static,
    {
        self.register_shared(name, component_type, Arc::new(checker), threshold)
    }

    /// Registers a component whose checker is already shared.
    ///
    /// # Errors
    ///
    /// Same as [`register_component`](Self::register_component).
    pub fn register_shared(
        &self,
        name: impl Into<String>,
        component_type: ComponentType,
        checker: Arc<dyn HealthCheck>,
        threshold: Option<HealthThreshold>,
    ) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(HealthError::InvalidComponentName {
                reason: "name cannot be empty".to_string(),
            });
        }

        let threshold = threshold.unwrap_or_default();
        threshold.validate()?;

        let mut components = self.components.write();
        let replacing = components.contains_key(&name);
        if replacing && self.config.registration_policy == RegistrationPolicy::Reject {
            return Err(HealthError::DuplicateComponent { name });
        }

        let entry = RegisteredComponent {
            component_type,
            checker,
            threshold,
            latest: None,
            history: HealthHistory::new(self.config.history_size),
            generation: self.generations.fetch_add(1, Ordering::Relaxed),
        };

        if replacing {
            info!(component = %name, component_type = %entry.component_type, "replaced component registration");
        } else {
            info!(component = %name, component_type = %entry.component_type, "registered component");
        }
        components.insert(name, entry);

        Ok(())
    }

    /// Removes a component and all of its results.
    ///
    /// # Errors
    ///
    /// Returns `HealthError::ComponentNotFound` if the name is unknown.
    pub fn unregister_component(&self, name: &str) -> Result<()> {
        let mut components = self.components.write();
        if components.remove(name).is_none() {
            return Err(HealthError::ComponentNotFound {
                name: name.to_string(),
            });
        }

        info!(component = %name, "unregistered component");
        Ok(())
    }

    /// Registered component names, sorted.
    #[must_use]
    pub fn component_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.components.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered components.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.read().len()
    }

    // ============ Checks ============

    /// Probes one component and records the result.
    ///
    /// Checker errors, panics and timeouts are folded into the returned
    /// [`ComponentHealth`].
    ///
    /// # Errors
    ///
    /// Returns `HealthError::ComponentNotFound` if the name is unknown, or
    /// if the component was unregistered or replaced while the check ran
    /// (the stale result is discarded).
    pub async fn check_component_health(&self, name: &str) -> Result<ComponentHealth> {
        let (component_type, checker, threshold, generation) = {
            let components = self.components.read();
            let entry = components
                .get(name)
                .ok_or_else(|| HealthError::ComponentNotFound {
                    name: name.to_string(),
                })?;
            (
                entry.component_type.clone(),
                Arc::clone(&entry.checker),
                entry.threshold,
                entry.generation,
            )
        };

        let clock = Arc::clone(&self.clock);
        let health = self
            .prober
            .probe(name, &component_type, checker, &threshold, || clock.now())
            .await;

        let mut components = self.components.write();
        match components.get_mut(name) {
            Some(entry) if entry.generation == generation => {
                entry.latest = Some(health.clone());
                entry.history.push(health.clone());
                Ok(health)
            }
            _ => {
                debug!(component = %name, "component changed during check, discarding result");
                Err(HealthError::ComponentNotFound {
                    name: name.to_string(),
                })
            }
        }
    }

    /// Probes every component concurrently and publishes the aggregate.
    ///
    /// Cycles are serialized: a second caller waits for the running cycle's
    /// snapshot to be written before starting its own.
    pub async fn check_all_components(&self) -> SystemHealth {
        let _cycle = self.cycle.lock().await;

        let names = self.component_names();
        let results = join_all(names.iter().map(|name| self.check_component_health(name))).await;

        let mut components = HashMap::with_capacity(names.len());
        for (name, result) in names.into_iter().zip(results) {
            match result {
                Ok(health) => {
                    components.insert(name, health);
                }
                Err(e) => debug!(component = %name, error = %e, "component left out of snapshot"),
            }
        }

        let snapshot = SystemHealth::from_components(components, self.clock.now());
        info!(
            status = %snapshot.status,
            total = snapshot.summary.total_components,
            healthy = snapshot.summary.healthy_components,
            degraded = snapshot.summary.degraded_components,
            unhealthy = snapshot.summary.unhealthy_components,
            "health check cycle complete"
        );

        self.snapshots.send_replace(snapshot.clone());
        snapshot
    }

    // ============ Background loop ============

    /// Starts the periodic check loop.
    ///
    /// Returns `false` (and logs a warning) if the loop is already running.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start_monitoring(&self) -> bool {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            warn!("health monitoring already running");
            return false;
        }

        let monitor = self.clone();
        *task = Some(PeriodicTask::spawn(
            "health-monitor",
            self.config.check_interval(),
            move || {
                let monitor = monitor.clone();
                async move {
                    monitor.check_all_components().await;
                }
            },
        ));

        info!(
            interval_secs = self.config.check_interval_secs,
            components = self.component_count(),
            "health monitoring started"
        );
        true
    }

    /// Stops the periodic check loop. Safe to call in any state.
    ///
    /// An in-flight cycle gets one component timeout plus a second to
    /// finish before the loop is aborted.
    pub async fn stop_monitoring(&self) {
        let task = self.task.lock().take();
        match task {
            Some(task) => {
                task.stop(self.config.component_timeout() + Duration::from_secs(1))
                    .await;
                info!("health monitoring stopped");
            }
            None => debug!("health monitoring not running"),
        }
    }

    /// Returns true while the background loop is running.
    #[must_use]
    pub fn is_monitoring(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Subscribes to snapshots published by each completed cycle.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SystemHealth> {
        self.snapshots.subscribe()
    }

    // ============ Queries ============

    /// The most recent aggregated snapshot (`unknown` before the first
    /// cycle).
    #[must_use]
    pub fn get_system_health(&self) -> SystemHealth {
        self.snapshots.borrow().clone()
    }

    /// The latest result for one component, if it has been checked.
    #[must_use]
    pub fn get_component_health(&self, name: &str) -> Option<ComponentHealth> {
        self.components.read().get(name)?.latest.clone()
    }

    /// The latest result for every checked component.
    #[must_use]
    pub fn get_all_component_health(&self) -> HashMap<String, ComponentHealth> {
        self.components
            .read()
            .iter()
            .filter_map(|(name, entry)| entry.latest.clone().map(|h| (name.clone(), h)))
            .collect()
    }

    /// Returns true if the latest snapshot is `healthy`.
    #[must_use]
    pub fn is_system_healthy(&self) -> bool {
        self.snapshots.borrow().status == HealthStatus::Healthy
    }

    /// Names of components whose latest result is `unhealthy`, sorted.
    #[must_use]
    pub fn get_unhealthy_components(&self) -> Vec<String> {
        self.components_with_status(HealthStatus::Unhealthy)
    }

    /// Names of components whose latest result is `degraded`, sorted.
    #[must_use]
    pub fn get_degraded_components(&self) -> Vec<String> {
        self.components_with_status(HealthStatus::Degraded)
    }

    /// A component's recorded history, oldest first.
    #[must_use]
    pub fn get_component_history(&self, name: &str) -> Option<Vec<ComponentHealth>> {
        let components = self.components.read();
        let entry = components.get(name)?;
        Some(entry.history.iter().cloned().collect())
    }

    /// Trend statistics over the last `hours` hours.
    ///
    /// Returns `None` if the component is unknown or has no results in the
    /// window.
    #[must_use]
    pub fn get_component_health_trend(&self, name: &str, hours: u32) -> Option<HealthTrend> {
        let components = self.components.read();
        components
            .get(name)?
            .history
            .trend(name, hours, self.clock.now())
    }

    fn components_with_status(&self, status: HealthStatus) -> Vec<String> {
        let mut names: Vec<String> = self
            .components
            .read()
            .iter()
            .filter(|(_, entry)| entry.latest.as_ref().is_some_and(|h| h.status == status))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::build(HealthMonitorConfig::default(), system_clock())
    }
}

impl Clone for HealthMonitor {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            prober: self.prober,
            clock: Arc::clone(&self.clock),
            components: Arc::clone(&self.components),
            snapshots: Arc::clone(&self.snapshots),
            cycle: Arc::clone(&self.cycle),
            task: Arc::clone(&self.task),
            generations: Arc::clone(&self.generations),
        }
    }
}
