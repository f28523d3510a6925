//! Configuration file loading.
//!
//! The CLI reads a single JSON document:
//!
//! ```json
//! {
//!   "monitor": { "check_interval_secs": 30 },
//!   "alerts": { "retention_hours": 24 },
//!   "components": [
//!     { "name": "postgres", "type": "database",
//!       "probe": { "kind": "tcp", "address": "127.0.0.1:5432" } },
//!     { "name": "api", "type": "api",
//!       "probe": { "kind": "http", "url": "http://127.0.0.1:8080/health" },
//!       "threshold": { "response_time_ms": 500 } }
//!   ],
//!   "channels": [
//!     { "name": "log", "kind": "log" },
//!     { "name": "oncall", "kind": "webhook", "url": "https://hooks.example.com/vigil",
//!       "severities": ["error", "critical"] }
//!   ]
//! }
//! ```
//!
//! Every section is optional. Without any channels a log channel is added.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use vigil_alerts::{
    AlertManager, AlertManagerConfig, AlertSeverity, LogChannel, NotificationChannel,
    WebhookChannel, WebhookConfig, all_severities,
};
use vigil_health::{ComponentType, HealthCheck, HealthMonitor, HealthMonitorConfig, HealthThreshold};

use crate::error::{CliError, Result};
use crate::probes::{HttpProbe, TcpProbe};

/// Top-level configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VigilConfig {
    /// Health monitor settings.
    pub monitor: HealthMonitorConfig,
    /// Alert manager settings.
    pub alerts: AlertManagerConfig,
    /// Whether the built-in rules are installed.
    pub default_rules: bool,
    /// Components to probe.
    pub components: Vec<ComponentConfig>,
    /// Notification channels.
    pub channels: Vec<ChannelConfig>,
}

impl Default for VigilConfig {
    fn default() -> Self {
        Self {
            monitor: HealthMonitorConfig::default(),
            alerts: AlertManagerConfig::default(),
            default_rules: true,
            components: Vec::new(),
            channels: Vec::new(),
        }
    }
}

/// One monitored component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// Unique component name.
    pub name: String,
    /// Component type tag.
    #[serde(rename = "type", default = "default_component_type")]
    pub component_type: ComponentType,
    /// How to probe it.
    pub probe: ProbeConfig,
    /// Optional threshold overrides.
    #[serde(default)]
    pub threshold: Option<HealthThreshold>,
}

fn default_component_type() -> ComponentType {
    ComponentType::ExternalService
}

/// Probe selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProbeConfig {
    /// TCP connect to `host:port`.
    Tcp {
        /// Address to connect to.
        address: String,
    },
    /// HTTP GET.
    Http {
        /// URL to request.
        url: String,
    },
}

/// One notification channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Unique channel name.
    pub name: String,
    /// Channel kind and settings.
    #[serde(flatten)]
    pub kind: ChannelKind,
}

/// Supported channel kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChannelKind {
    /// Write alerts to the log.
    Log {
        /// Accepted severities.
        #[serde(default = "all_severities")]
        severities: HashSet<AlertSeverity>,
    },
    /// POST alerts as JSON.
    Webhook(WebhookConfig),
}

impl VigilConfig {
    /// Reads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Config` if the file cannot be read or parsed, or
    /// any section is invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config = Self::from_json(&text)
            .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))?;
        info!(path = %path.display(), components = config.components.len(), "loaded configuration");
        Ok(config)
    }

    /// Loads `path` if given, otherwise the defaults.
    ///
    /// # Errors
    ///
    /// See [`VigilConfig::load`].
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Config` describing the problem.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| CliError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Config` describing the first problem.
    pub fn validate(&self) -> Result<()> {
        self.monitor
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;
        self.alerts
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;

        let mut seen = HashSet::new();
        for component in &self.components {
            if !seen.insert(component.name.as_str()) {
                return Err(CliError::Config(format!(
                    "duplicate component: {}",
                    component.name
                )));
            }
        }

        let mut seen = HashSet::new();
        for channel in &self.channels {
            if !seen.insert(channel.name.as_str()) {
                return Err(CliError::Config(format!("duplicate channel: {}", channel.name)));
            }
            if let ChannelKind::Webhook(webhook) = &channel.kind {
                webhook
                    .validate()
                    .map_err(|e| CliError::Config(format!("channel {}: {e}", channel.name)))?;
            }
        }
        Ok(())
    }

    /// Builds a monitor with every component registered.
    ///
    /// # Errors
    ///
    /// Returns an error if a probe cannot be built or a registration fails.
    pub fn build_monitor(&self) -> Result<HealthMonitor> {
        let monitor = HealthMonitor::new(self.monitor.clone())?;
        for component in &self.components {
            let checker: Arc<dyn HealthCheck> = match &component.probe {
                ProbeConfig::Tcp { address } => Arc::new(TcpProbe::new(address.clone())),
                ProbeConfig::Http { url } => Arc::new(
                    HttpProbe::new(url.clone(), self.monitor.component_timeout()).map_err(|e| {
                        CliError::Config(format!("component {}: {e}", component.name))
                    })?,
                ),
            };
            monitor.register_shared(
                component.name.clone(),
                component.component_type.clone(),
                checker,
                component.threshold,
            )?;
        }
        Ok(monitor)
    }

    /// Builds an alert manager with rules and channels installed.
    ///
    /// # Errors
    ///
    /// Returns an error if a channel cannot be built.
    pub fn build_alert_manager(&self) -> Result<AlertManager> {
        let manager = AlertManager::new(self.alerts.clone())?;
        if self.default_rules {
            manager.add_default_rules()?;
        }

        if self.channels.is_empty() {
            manager.add_channel("log", LogChannel::default());
        }
        for channel in &self.channels {
            let built: Arc<dyn NotificationChannel> = match &channel.kind {
                ChannelKind::Log { severities } => Arc::new(LogChannel::new(severities.clone())),
                ChannelKind::Webhook(config) => Arc::new(WebhookChannel::new(config.clone())?),
            };
            manager.add_shared_channel(channel.name.clone(), built);
        }
        Ok(manager)
    }
}
