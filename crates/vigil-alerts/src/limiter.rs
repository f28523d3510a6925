//! Per-rule deduplication and rate limiting.
//!
//! Every rule gets a cooldown (minimum spacing between two alerts) and an
//! hourly cap (maximum alerts in any rolling 60-minute window). State is
//! keyed by rule name and lives in memory only, so it starts empty after a
//! restart.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};

use crate::types::AlertRule;

/// Outcome of asking the limiter to admit an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The alert may be raised; its timestamp has been recorded.
    Admitted,
    /// The previous alert is more recent than the cooldown.
    Cooldown,
    /// The rule already raised its hourly maximum.
    HourlyCap,
}

#[derive(Debug, Default)]
struct RuleWindow {
    last_alert: Option<DateTime<Utc>>,
    recent: VecDeque<DateTime<Utc>>,
}

/// Tracks alert timestamps per rule.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: HashMap<String, RuleWindow>,
}

impl RateLimiter {
    /// Creates an empty limiter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks `rule` against its cooldown and hourly cap at `now`, recording
    /// `now` if the alert is admitted.
    pub fn try_acquire(&mut self, rule: &AlertRule, now: DateTime<Utc>) -> Admission {
        let window = self.windows.entry(rule.name.clone()).or_default();

        if let Some(last) = window.last_alert {
            if now - last < rule.cooldown() {
                return Admission::Cooldown;
            }
        }

        let horizon = now - Duration::hours(1);
        while window.recent.front().is_some_and(|t| *t <= horizon) {
            window.recent.pop_front();
        }

        let cap = usize::try_from(rule.max_alerts_per_hour).unwrap_or(usize::MAX);
        if window.recent.len() >= cap {
            return Admission::HourlyCap;
        }

        window.last_alert = Some(now);
        window.recent.push_back(now);
        Admission::Admitted
    }

    /// Drops windows whose last alert is older than `max_age`.
    pub fn prune(&mut self, now: DateTime<Utc>, max_age: Duration) {
        self.windows
            .retain(|_, w| w.last_alert.is_some_and(|last| now - last < max_age));
    }

    /// Number of rules with recorded state.
    #[must_use]
    pub fn tracked_rules(&self) -> usize {
        self.windows.len()
    }
}
