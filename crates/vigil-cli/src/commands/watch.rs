//! Watch command implementation.
//!
//! Runs the health monitor and the alert manager's retention loop, and feeds
//! every published snapshot to the alert rules: once as system data and
//! once per component. Stops on Ctrl-C or after `--duration`.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use tracing::{info, warn};
use vigil_alerts::{Alert, AlertData, AlertManager};
use vigil_health::{HealthMonitor, SystemHealth};

use crate::cli::WatchArgs;
use crate::config::VigilConfig;
use crate::error::Result;
use crate::output::{OutputFormat, WatchEvent};

/// Watch command executor.
#[derive(Debug)]
pub struct WatchCommand<'a> {
    config: &'a VigilConfig,
}

impl<'a> WatchCommand<'a> {
    /// Create a new watch command.
    #[must_use]
    pub const fn new(config: &'a VigilConfig) -> Self {
        Self { config }
    }

    /// Execute the watch command.
    ///
    /// # Errors
    ///
    /// Returns an error if the monitor or alert manager cannot be built, or
    /// output fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        args: &WatchArgs,
    ) -> Result<()> {
        let monitor = self.config.build_monitor()?;
        let alerts = self.config.build_alert_manager()?;

        let duration = args.duration;
        let shutdown = async move {
            match duration {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!(error = %e, "cannot listen for Ctrl-C, stopping");
                    }
                }
            }
        };

        Self::run(&monitor, &alerts, writer, format, shutdown).await
    }

    /// Drives both loops until `shutdown` completes, then stops them.
    ///
    /// # Errors
    ///
    /// Returns an error if output fails. Both loops are stopped either way.
    pub async fn run<W, S>(
        monitor: &HealthMonitor,
        alerts: &AlertManager,
        writer: &mut W,
        format: &OutputFormat,
        shutdown: S,
    ) -> Result<()>
    where
        W: Write,
        S: Future<Output = ()>,
    {
        let mut snapshots = monitor.subscribe();
        monitor.start_monitoring();
        alerts.start_monitoring();
        info!(
            components = monitor.component_count(),
            rules = alerts.rule_count(),
            channels = alerts.channel_count(),
            "watching"
        );

        tokio::pin!(shutdown);
        let result = loop {
            tokio::select! {
                () = &mut shutdown => break Ok(()),
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break Ok(());
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    let raised = evaluate_snapshot(alerts, &snapshot).await;
                    if let Err(e) = report(writer, format, &snapshot, raised) {
                        break Err(e);
                    }
                }
            }
        };

        monitor.stop_monitoring().await;
        alerts.stop_monitoring().await;
        info!("watch stopped");
        result
    }
}

/// Evaluates the rules against a snapshot and each of its components.
///
/// Components are visited in name order.
pub async fn evaluate_snapshot(alerts: &AlertManager, snapshot: &SystemHealth) -> Vec<Alert> {
    let mut raised = alerts
        .evaluate_rules(&AlertData::System(snapshot.clone()))
        .await;

    let mut names: Vec<&String> = snapshot.components.keys().collect();
    names.sort();
    for name in names {
        let component = snapshot.components[name].clone();
        raised.extend(alerts.evaluate_rules(&AlertData::Component(component)).await);
    }
    raised
}

fn report<W: Write>(
    writer: &mut W,
    format: &OutputFormat,
    snapshot: &SystemHealth,
    raised: Vec<Alert>,
) -> Result<()> {
    format.write_line(writer, &WatchEvent::cycle(snapshot))?;
    for alert in raised {
        format.write_line(writer, &WatchEvent::Alert(alert))?;
    }
    Ok(())
}
