//! Notification channels for alert delivery.
//!
//! This module provides the [`NotificationChannel`] trait and two bundled
//! implementations: [`LogChannel`], which writes alerts to `tracing`, and
//! [`WebhookChannel`], which POSTs them as JSON.
//!
//! A channel declares the severities it accepts; the manager only hands it
//! alerts whose severity is in that set.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{AlertError, Result};
use crate::types::{Alert, AlertSeverity, AlertStatus};

/// Future returned by [`NotificationChannel::send_alert`].
pub type SendFuture<'a> = Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;

/// Future returned by [`NotificationChannel::health_check`].
pub type HealthFuture<'a> = Pin<Box<dyn Future<Output = bool> + Send + 'a>>;

/// Trait for notification channels.
///
/// Implement this trait to deliver alerts through other protocols or
/// services. Implementations own their timeouts: the manager awaits every
/// send to completion.
pub trait NotificationChannel: Send + Sync + fmt::Debug {
    /// Delivers one alert.
    ///
    /// Returns `Ok(false)` when the receiver was reached but rejected the
    /// alert.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::NotificationFailed` if the alert cannot be sent.
    fn send_alert<'a>(&'a self, alert: &'a Alert) -> SendFuture<'a>;

    /// Returns true if the channel can currently deliver.
    fn health_check(&self) -> HealthFuture<'_>;

    /// Severities this channel accepts.
    fn severities(&self) -> &HashSet<AlertSeverity>;

    /// Returns true if alerts of `severity` should be sent here.
    fn accepts(&self, severity: AlertSeverity) -> bool {
        self.severities().contains(&severity)
    }
}

/// Every severity, for channels that want everything.
#[must_use]
pub fn all_severities() -> HashSet<AlertSeverity> {
    AlertSeverity::ALL.into_iter().collect()
}

/// A channel that logs alerts through `tracing`.
#[derive(Debug, Clone)]
pub struct LogChannel {
    severities: HashSet<AlertSeverity>,
}

impl LogChannel {
    /// Creates a log channel accepting the given severities.
    #[must_use]
    pub const fn new(severities: HashSet<AlertSeverity>) -> Self {
        Self { severities }
    }
}

impl Default for LogChannel {
    fn default() -> Self {
        Self::new(all_severities())
    }
}

impl NotificationChannel for LogChannel {
    fn send_alert<'a>(&'a self, alert: &'a Alert) -> SendFuture<'a> {
        Box::pin(async move {
            if alert.status == AlertStatus::Resolved {
                info!(
                    alert_id = %alert.id,
                    rule = %alert.name,
                    severity = %alert.severity,
                    "RESOLVED: {}",
                    alert.message
                );
                return Ok(true);
            }

            let component = alert.component.as_deref().unwrap_or("-");
            match alert.severity {
                AlertSeverity::Critical | AlertSeverity::Error => error!(
                    alert_id = %alert.id,
                    rule = %alert.name,
                    severity = %alert.severity,
                    component,
                    "ALERT: {}",
                    alert.message
                ),
                AlertSeverity::Warning => warn!(
                    alert_id = %alert.id,
                    rule = %alert.name,
                    severity = %alert.severity,
                    component,
                    "ALERT: {}",
                    alert.message
                ),
                AlertSeverity::Info => info!(
                    alert_id = %alert.id,
                    rule = %alert.name,
                    severity = %alert.severity,
                    component,
                    "ALERT: {}",
                    alert.message
                ),
            }
            Ok(true)
        })
    }

    fn health_check(&self) -> HealthFuture<'_> {
        Box::pin(async { true })
    }

    fn severities(&self) -> &HashSet<AlertSeverity> {
        &self.severities
    }
}

/// Configuration for a webhook channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// The URL to POST alerts to.
    pub url: String,
    /// HTTP headers to include with requests.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Timeout in seconds for HTTP requests.
    #[serde(default = "WebhookConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    /// Severities delivered to this webhook.
    #[serde(default = "all_severities")]
    pub severities: HashSet<AlertSeverity>,
}

impl WebhookConfig {
    /// Creates a new webhook configuration accepting every severity.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidConfig` if the URL is empty or not HTTP(S).
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let config = Self {
            url: url.into(),
            headers: HashMap::new(),
            timeout_secs: Self::default_timeout_secs(),
            severities: all_severities(),
        };
        config.validate()?;
        Ok(config)
    }

    const fn default_timeout_secs() -> u64 {
        10
    }

    /// Checks the URL and timeout.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidConfig` describing the problem.
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(AlertError::InvalidConfig {
                reason: "webhook URL cannot be empty".to_string(),
            });
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(AlertError::InvalidConfig {
                reason: format!("webhook URL must be http or https: {}", self.url),
            });
        }
        if self.timeout_secs == 0 {
            return Err(AlertError::InvalidConfig {
                reason: "webhook timeout must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Adds a header to the configuration.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Restricts the accepted severities.
    #[must_use]
    pub fn with_severities(mut self, severities: impl IntoIterator<Item = AlertSeverity>) -> Self {
        self.severities = severities.into_iter().collect();
        self
    }
}

/// Body POSTed by [`WebhookChannel`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Always `"vigil"`.
    pub source: String,
    /// The alert's status at send time.
    pub status: AlertStatus,
    /// The alert itself.
    pub alert: Alert,
}

impl WebhookPayload {
    /// Builds the payload for an alert.
    #[must_use]
    pub fn from_alert(alert: &Alert) -> Self {
        Self {
            source: "vigil".to_string(),
            status: alert.status,
            alert: alert.clone(),
        }
    }
}

/// A webhook notification channel.
///
/// Sends each alert as a JSON POST. A 2xx response counts as delivered; any
/// other response is reported as `Ok(false)`.
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    config: WebhookConfig,
    client: reqwest::Client,
}

impl WebhookChannel {
    /// Creates a webhook channel.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidConfig` if the configuration is invalid
    /// or the HTTP client cannot be built.
    pub fn new(config: WebhookConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AlertError::InvalidConfig {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { config, client })
    }

    /// Returns the webhook URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Formats the alert as the JSON body that would be sent.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::SerializationError` if serialization fails.
    pub fn format_payload(&self, alert: &Alert) -> Result<String> {
        serde_json::to_string(&WebhookPayload::from_alert(alert)).map_err(AlertError::from)
    }
}

impl NotificationChannel for WebhookChannel {
    fn send_alert<'a>(&'a self, alert: &'a Alert) -> SendFuture<'a> {
        Box::pin(async move {
            let mut request = self
                .client
                .post(&self.config.url)
                .json(&WebhookPayload::from_alert(alert));
            for (key, value) in &self.config.headers {
                request = request.header(key, value);
            }

            let response = request.send().await?;
            let status = response.status();
            if status.is_success() {
                debug!(alert_id = %alert.id, url = %self.config.url, status = status.as_u16(), "webhook delivered");
                Ok(true)
            } else {
                warn!(alert_id = %alert.id, url = %self.config.url, status = status.as_u16(), "webhook rejected alert");
                Ok(false)
            }
        })
    }

    fn health_check(&self) -> HealthFuture<'_> {
        Box::pin(async move {
            match self.client.head(&self.config.url).send().await {
                Ok(response) => !response.status().is_server_error(),
                Err(e) => {
                    debug!(url = %self.config.url, error = %e, "webhook health check failed");
                    false
                }
            }
        })
    }

    fn severities(&self) -> &HashSet<AlertSeverity> {
        &self.config.severities
    }
}
