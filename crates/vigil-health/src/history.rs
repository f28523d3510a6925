//! Bounded per-component history and trend statistics.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

use crate::types::{ComponentHealth, HealthStatus, HealthTrend, TrendDirection};

/// A fixed-capacity ring of probe results, oldest first.
#[derive(Debug, Clone)]
pub struct HealthHistory {
    entries: VecDeque<ComponentHealth>,
    capacity: usize,
}

impl HealthHistory {
    /// Creates an empty history holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an entry, evicting the oldest when full.
    pub fn push(&mut self, entry: ComponentHealth) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentHealth> {
        self.entries.iter()
    }

    /// Computes trend statistics over entries checked within the last
    /// `hours` hours of `now`.
    ///
    /// Returns `None` when no entry falls inside the window. A window
    /// reaching past the representable date range covers every entry.
    #[must_use]
    pub fn trend(&self, name: &str, hours: u32, now: DateTime<Utc>) -> Option<HealthTrend> {
        let cutoff = Duration::try_hours(i64::from(hours)).and_then(|w| now.checked_sub_signed(w));
        let recent: Vec<&ComponentHealth> = self
            .entries
            .iter()
            .filter(|e| cutoff.is_none_or(|c| e.last_check >= c))
            .collect();

        let latest = recent.last()?;
        let n = recent.len() as f64;
        let healthy = recent
            .iter()
            .filter(|e| e.status == HealthStatus::Healthy)
            .count() as f64;
        let mean = |f: fn(&ComponentHealth) -> f64| recent.iter().map(|e| f(e)).sum::<f64>() / n;

        let trend = if latest.status == HealthStatus::Healthy {
            TrendDirection::Improving
        } else {
            TrendDirection::Degrading
        };

        Some(HealthTrend {
            component_name: name.to_string(),
            period_hours: hours,
            data_points: recent.len(),
            availability_percent: healthy / n * 100.0,
            avg_response_time_ms: mean(|e| e.response_time_ms),
            avg_success_rate: mean(|e| e.success_rate),
            avg_error_rate: mean(|e| e.error_rate),
            current_status: latest.status,
            trend,
        })
    }
}
