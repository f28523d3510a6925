//! Alert manager for evaluating rules and managing alerts.
//!
//! This module provides the [`AlertManager`] which is the main entry point
//! for the alerting system. It evaluates rules against health or metric
//! data handed to it, deduplicates and rate-limits per rule, owns the alert
//! lifecycle, and fans alerts out to notification channels.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use vigil_health::{PeriodicTask, SharedClock, system_clock};

use crate::channels::NotificationChannel;
use crate::error::{AlertError, Result};
use crate::limiter::{Admission, RateLimiter};
use crate::rules::default_rules;
use crate::template;
use crate::types::{Alert, AlertData, AlertRule, AlertSeverity, AlertStatus};

/// Configuration for the alert manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertManagerConfig {
    /// Seconds between retention cleanups.
    pub cleanup_interval_secs: u64,
    /// How long resolved alerts are kept, in hours.
    pub retention_hours: u64,
    /// Maximum number of resolved alerts kept; oldest go first.
    pub max_resolved_alerts: usize,
    /// Whether resolved alerts are sent to channels.
    pub notify_on_resolve: bool,
}

impl AlertManagerConfig {
    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidConfig` for a zero interval, retention or
    /// resolved-alert cap.
    pub fn validate(&self) -> Result<()> {
        if self.cleanup_interval_secs == 0 {
            return Err(AlertError::InvalidConfig {
                reason: "cleanup_interval_secs must be at least 1".to_string(),
            });
        }
        if self.retention_hours == 0 {
            return Err(AlertError::InvalidConfig {
                reason: "retention_hours must be at least 1".to_string(),
            });
        }
        if self.max_resolved_alerts == 0 {
            return Err(AlertError::InvalidConfig {
                reason: "max_resolved_alerts must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// The retention window as a chrono duration.
    #[must_use]
    pub fn retention(&self) -> ChronoDuration {
        i64::try_from(self.retention_hours)
            .ok()
            .and_then(ChronoDuration::try_hours)
            .unwrap_or(ChronoDuration::MAX)
    }
}

impl Default for AlertManagerConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_secs: 3600,
            retention_hours: 24,
            max_resolved_alerts: 10_000,
            notify_on_resolve: false,
        }
    }
}

/// Counts describing the manager's current state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    /// Alerts in the active store (any open status).
    pub active: usize,
    /// Open alerts by status.
    pub by_status: BTreeMap<AlertStatus, usize>,
    /// Open alerts by severity.
    pub by_severity: BTreeMap<AlertSeverity, usize>,
    /// Resolved alerts still retained.
    pub resolved: usize,
    /// Registered rules.
    pub rules: usize,
    /// Registered rules that are enabled.
    pub enabled_rules: usize,
    /// Registered channels.
    pub channels: usize,
}

/// The alert manager is responsible for evaluating rules and managing alerts.
///
/// It maintains the state of all alerts and handles the lifecycle:
/// - Evaluating conditions against the data it is given
/// - Deduplicating by rule with a cooldown and an hourly cap
/// - Moving alerts between active, acknowledged, suppressed and resolved
/// - Sending notifications through configured channels
///
/// Clones share all state.
#[derive(Debug)]
pub struct AlertManager {
    /// Configuration for the manager.
    config: AlertManagerConfig,
    /// Time source for timestamps, cooldowns and retention.
    clock: SharedClock,
    /// Registered rules by name.
    rules: Arc<RwLock<BTreeMap<String, AlertRule>>>,
    /// Registered channels by name.
    channels: Arc<RwLock<BTreeMap<String, Arc<dyn NotificationChannel>>>>,
    /// Open alerts by ID.
    active: Arc<RwLock<HashMap<String, Alert>>>,
    /// Resolved alerts by ID.
    resolved: Arc<RwLock<HashMap<String, Alert>>>,
    /// Per-rule cooldown and hourly cap state.
    limiter: Arc<Mutex<RateLimiter>>,
    /// The retention loop, while running.
    task: Arc<Mutex<Option<PeriodicTask>>>,
}

impl AlertManager {
    /// Creates a manager using the system clock.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: AlertManagerConfig) -> Result<Self> {
        Self::with_clock(config, system_clock())
    }

    /// Creates a manager reading time from `clock`.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidConfig` if the configuration is invalid.
    pub fn with_clock(config: AlertManagerConfig, clock: SharedClock) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, clock))
    }

    fn build(config: AlertManagerConfig, clock: SharedClock) -> Self {
        Self {
            config,
            clock,
            rules: Arc::new(RwLock::new(BTreeMap::new())),
            channels: Arc::new(RwLock::new(BTreeMap::new())),
            active: Arc::new(RwLock::new(HashMap::new())),
            resolved: Arc::new(RwLock::new(HashMap::new())),
            limiter: Arc::new(Mutex::new(RateLimiter::new())),
            task: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &AlertManagerConfig {
        &self.config
    }

    // ============ Rule Management ============

    /// Adds a rule, replacing any rule with the same name.
    pub fn add_rule(&self, rule: AlertRule) {
        let mut rules = self.rules.write();
        let name = rule.name.clone();
        if rules.insert(name.clone(), rule).is_some() {
            info!(rule = %name, "replaced alert rule");
        } else {
            info!(rule = %name, "added alert rule");
        }
    }

    /// Adds the built-in rules.
    ///
    /// # Errors
    ///
    /// Propagates a rule validation failure.
    pub fn add_default_rules(&self) -> Result<()> {
        for rule in default_rules()? {
            self.add_rule(rule);
        }
        Ok(())
    }

    /// Removes a rule by name.
    ///
    /// Returns `true` if the rule was removed.
    pub fn remove_rule(&self, name: &str) -> bool {
        let removed = self.rules.write().remove(name).is_some();
        if removed {
            info!(rule = %name, "removed alert rule");
        }
        removed
    }

    /// Gets a rule by name.
    #[must_use]
    pub fn get_rule(&self, name: &str) -> Option<AlertRule> {
        self.rules.read().get(name).cloned()
    }

    /// Returns all rules, sorted by name.
    #[must_use]
    pub fn list_rules(&self) -> Vec<AlertRule> {
        self.rules.read().values().cloned().collect()
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.read().len()
    }

    // ============ Channel Management ============

    /// Adds a notification channel, replacing any with the same name.
    pub fn add_channel<C>(&self, name: impl Into<String>, channel: C)
    where
        C: NotificationChannel + 'static,
    {
        self.add_shared_channel(name, Arc::new(channel));
    }

    /// Adds a channel that is already shared.
    pub fn add_shared_channel(&self, name: impl Into<String>, channel: Arc<dyn NotificationChannel>) {
        let name = name.into();
        if self.channels.write().insert(name.clone(), channel).is_some() {
            info!(channel = %name, "replaced notification channel");
        } else {
            info!(channel = %name, "added notification channel");
        }
    }

    /// Removes a channel by name.
    ///
    /// Returns `true` if the channel was removed.
    pub fn remove_channel(&self, name: &str) -> bool {
        let removed = self.channels.write().remove(name).is_some();
        if removed {
            info!(channel = %name, "removed notification channel");
        }
        removed
    }

    /// Registered channel names, sorted.
    #[must_use]
    pub fn channel_names(&self) -> Vec<String> {
        self.channels.read().keys().cloned().collect()
    }

    /// Returns the number of channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.read().len()
    }

    // ============ Evaluation ============

    /// Evaluates every enabled rule against `data`.
    ///
    /// A rule whose condition holds and that passes its cooldown and hourly
    /// cap raises an active alert, which is dispatched to every channel
    /// accepting its severity. A rule whose condition fails to evaluate is
    /// logged and skipped. Returns the alerts raised.
    pub async fn evaluate_rules(&self, data: &AlertData) -> Vec<Alert> {
        let rules: Vec<AlertRule> = self
            .rules
            .read()
            .values()
            .filter(|r| r.enabled)
            .cloned()
            .collect();

        let mut raised = Vec::new();
        for rule in &rules {
            match rule.condition.evaluate(data) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    warn!(rule = %rule.name, error = %e, "rule evaluation failed, skipping");
                    continue;
                }
            }

            let now = self.clock.now();
            match self.limiter.lock().try_acquire(rule, now) {
                Admission::Admitted => {}
                Admission::Cooldown => {
                    debug!(rule = %rule.name, "alert suppressed by cooldown");
                    continue;
                }
                Admission::HourlyCap => {
                    debug!(rule = %rule.name, cap = rule.max_alerts_per_hour, "alert suppressed by hourly cap");
                    continue;
                }
            }

            let message = template::render(&rule.message_template, data);
            let alert = Alert::new(rule, message, data, now);
            info!(
                alert_id = %alert.id,
                rule = %rule.name,
                severity = %alert.severity,
                component = alert.component.as_deref().unwrap_or("-"),
                "alert raised"
            );
            self.active.write().insert(alert.id.clone(), alert.clone());
            raised.push(alert);
        }

        join_all(raised.iter().map(|alert| self.dispatch(alert))).await;
        raised
    }

    /// Sends `alert` to every channel accepting its severity.
    ///
    /// Returns the number of channels that reported delivery.
    async fn dispatch(&self, alert: &Alert) -> usize {
        let targets: Vec<(String, Arc<dyn NotificationChannel>)> = self
            .channels
            .read()
            .iter()
            .filter(|(_, channel)| channel.accepts(alert.severity))
            .map(|(name, channel)| (name.clone(), Arc::clone(channel)))
            .collect();

        if targets.is_empty() {
            debug!(alert_id = %alert.id, severity = %alert.severity, "no channel accepts alert");
            return 0;
        }

        let results = join_all(targets.iter().map(|(name, channel)| async move {
            match channel.send_alert(alert).await {
                Ok(true) => true,
                Ok(false) => {
                    warn!(alert_id = %alert.id, channel = %name, "channel did not accept alert");
                    false
                }
                Err(e) => {
                    error!(alert_id = %alert.id, channel = %name, error = %e, "notification failed");
                    false
                }
            }
        }))
        .await;

        results.into_iter().filter(|delivered| *delivered).count()
    }

    // ============ Alert Lifecycle ============

    /// Resolves an open alert and moves it to the resolved store.
    ///
    /// Returns `false`, changing nothing, if `id` is not an open alert. When
    /// `notify_on_resolve` is set the resolved alert is dispatched.
    pub async fn resolve_alert(&self, id: &str, reason: Option<&str>) -> bool {
        let resolved = {
            let mut active = self.active.write();
            let Some(mut alert) = active.remove(id) else {
                return false;
            };
            alert.resolve(reason, self.clock.now());
            alert
        };

        info!(alert_id = %id, rule = %resolved.name, "alert resolved");
        self.resolved
            .write()
            .insert(resolved.id.clone(), resolved.clone());

        if self.config.notify_on_resolve {
            self.dispatch(&resolved).await;
        }
        true
    }

    /// Acknowledges an `active` alert.
    ///
    /// Returns `false`, changing nothing, if `id` is not an open alert or
    /// the alert is not `active`.
    pub fn acknowledge_alert(&self, id: &str, reason: Option<&str>) -> bool {
        let mut active = self.active.write();
        let acknowledged = active
            .get_mut(id)
            .is_some_and(|alert| alert.acknowledge(reason, self.clock.now()));
        if acknowledged {
            info!(alert_id = %id, "alert acknowledged");
        }
        acknowledged
    }

    /// Suppresses an `active` or `acknowledged` alert.
    ///
    /// Returns `false`, changing nothing, otherwise.
    pub fn suppress_alert(&self, id: &str, reason: Option<&str>) -> bool {
        let mut active = self.active.write();
        let suppressed = active
            .get_mut(id)
            .is_some_and(|alert| alert.suppress(reason, self.clock.now()));
        if suppressed {
            info!(alert_id = %id, "alert suppressed");
        }
        suppressed
    }

    // ============ Queries ============

    /// Open alerts, newest first, optionally filtered by severity and
    /// component.
    #[must_use]
    pub fn get_active_alerts(
        &self,
        severity: Option<AlertSeverity>,
        component: Option<&str>,
    ) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self
            .active
            .read()
            .values()
            .filter(|a| severity.is_none_or(|s| a.severity == s))
            .filter(|a| component.is_none_or(|c| a.component.as_deref() == Some(c)))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        alerts
    }

    /// Looks an alert up in either store.
    #[must_use]
    pub fn get_alert(&self, id: &str) -> Option<Alert> {
        if let Some(alert) = self.active.read().get(id) {
            return Some(alert.clone());
        }
        self.resolved.read().get(id).cloned()
    }

    /// Up to `limit` resolved alerts, most recently resolved first.
    #[must_use]
    pub fn get_resolved_alerts(&self, limit: usize) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self.resolved.read().values().cloned().collect();
        alerts.sort_by(|a, b| b.resolved_at.cmp(&a.resolved_at));
        alerts.truncate(limit);
        alerts
    }

    /// Summarizes alerts, rules and channels.
    #[must_use]
    pub fn get_alert_summary(&self) -> AlertSummary {
        let mut summary = AlertSummary {
            by_status: [
                AlertStatus::Active,
                AlertStatus::Acknowledged,
                AlertStatus::Suppressed,
            ]
            .into_iter()
            .map(|s| (s, 0))
            .collect(),
            by_severity: AlertSeverity::ALL.into_iter().map(|s| (s, 0)).collect(),
            ..AlertSummary::default()
        };

        for alert in self.active.read().values() {
            summary.active += 1;
            *summary.by_status.entry(alert.status).or_default() += 1;
            *summary.by_severity.entry(alert.severity).or_default() += 1;
        }

        summary.resolved = self.resolved.read().len();
        {
            let rules = self.rules.read();
            summary.rules = rules.len();
            summary.enabled_rules = rules.values().filter(|r| r.enabled).count();
        }
        summary.channels = self.channels.read().len();
        summary
    }

    /// Runs every channel's health check concurrently.
    pub async fn check_channel_health(&self) -> BTreeMap<String, bool> {
        let channels: Vec<(String, Arc<dyn NotificationChannel>)> = self
            .channels
            .read()
            .iter()
            .map(|(name, channel)| (name.clone(), Arc::clone(channel)))
            .collect();

        let results = join_all(channels.iter().map(|(_, channel)| channel.health_check())).await;

        channels
            .into_iter()
            .map(|(name, _)| name)
            .zip(results)
            .inspect(|(name, healthy)| {
                if !healthy {
                    warn!(channel = %name, "notification channel unhealthy");
                }
            })
            .collect()
    }

    // ============ Retention ============

    /// Deletes resolved alerts older than the retention window, then the
    /// oldest resolved alerts beyond `max_resolved_alerts`.
    ///
    /// Open alerts are never touched. Returns the number removed.
    pub fn cleanup_old_alerts(&self) -> usize {
        let now = self.clock.now();
        // A window reaching past the representable date range keeps everything.
        let cutoff = now.checked_sub_signed(self.config.retention());

        let removed = {
            let mut resolved = self.resolved.write();
            let before = resolved.len();
            if let Some(cutoff) = cutoff {
                resolved.retain(|_, alert| alert.resolved_at.unwrap_or(alert.updated_at) >= cutoff);
            }

            if resolved.len() > self.config.max_resolved_alerts {
                let mut by_age: Vec<(chrono::DateTime<chrono::Utc>, String)> = resolved
                    .values()
                    .map(|a| (a.resolved_at.unwrap_or(a.updated_at), a.id.clone()))
                    .collect();
                by_age.sort();
                let excess = resolved.len() - self.config.max_resolved_alerts;
                for (_, id) in by_age.into_iter().take(excess) {
                    resolved.remove(&id);
                }
            }

            before - resolved.len()
        };

        let longest_cooldown = self
            .rules
            .read()
            .values()
            .map(AlertRule::cooldown)
            .max()
            .unwrap_or_else(ChronoDuration::zero);
        self.limiter
            .lock()
            .prune(now, longest_cooldown.max(ChronoDuration::hours(1)));

        if removed > 0 {
            info!(removed, "cleaned up resolved alerts");
        }
        removed
    }

    /// Starts the periodic retention loop.
    ///
    /// Returns `false` (and logs a warning) if it is already running.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start_monitoring(&self) -> bool {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            warn!("alert cleanup already running");
            return false;
        }

        let manager = self.clone();
        *task = Some(PeriodicTask::spawn(
            "alert-cleanup",
            Duration::from_secs(self.config.cleanup_interval_secs),
            move || {
                let manager = manager.clone();
                async move {
                    manager.cleanup_old_alerts();
                }
            },
        ));

        info!(
            interval_secs = self.config.cleanup_interval_secs,
            "alert cleanup started"
        );
        true
    }

    /// Stops the retention loop. Safe to call in any state.
    pub async fn stop_monitoring(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            task.stop(Duration::from_secs(5)).await;
            info!("alert cleanup stopped");
        }
    }

    /// Returns true while the retention loop is running.
    #[must_use]
    pub fn is_monitoring(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::build(AlertManagerConfig::default(), system_clock())
    }
}

impl Clone for AlertManager {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            clock: Arc::clone(&self.clock),
            rules: Arc::clone(&self.rules),
            channels: Arc::clone(&self.channels),
            active: Arc::clone(&self.active),
            resolved: Arc::clone(&self.resolved),
            limiter: Arc::clone(&self.limiter),
            task: Arc::clone(&self.task),
        }
    }
}
