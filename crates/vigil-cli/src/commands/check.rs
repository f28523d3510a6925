//! Check command implementation.
//!
//! Registers every configured component, runs a single check cycle and
//! prints the aggregated snapshot.

use std::io::Write;

use vigil_health::{HealthStatus, SystemHealth};

use crate::cli::CheckArgs;
use crate::config::VigilConfig;
use crate::error::{CliError, Result};
use crate::output::{HealthReport, OutputFormat};

/// Check command executor.
#[derive(Debug)]
pub struct CheckCommand<'a> {
    config: &'a VigilConfig,
}

impl<'a> CheckCommand<'a> {
    /// Create a new check command.
    #[must_use]
    pub const fn new(config: &'a VigilConfig) -> Self {
        Self { config }
    }

    /// Execute the check command.
    ///
    /// # Errors
    ///
    /// Returns an error if the monitor cannot be built, output fails, or
    /// `--strict` is set and the system is not healthy.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        args: &CheckArgs,
    ) -> Result<()> {
        let health = self.run_cycle().await?;
        let status = health.status;
        format.write(writer, &HealthReport(health))?;

        if args.strict && status != HealthStatus::Healthy {
            return Err(CliError::Unhealthy(status));
        }
        Ok(())
    }

    /// Probe every component once.
    ///
    /// # Errors
    ///
    /// Returns an error if the monitor cannot be built.
    pub async fn run_cycle(&self) -> Result<SystemHealth> {
        let monitor = self.config.build_monitor()?;
        Ok(monitor.check_all_components().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;
    use tokio::net::TcpListener;

    fn config_with(components: &str) -> VigilConfig {
        VigilConfig::from_json(&format!(r#"{{ "components": [{components}] }}"#)).unwrap()
    }

    #[tokio::test]
    async fn no_components_is_unknown() {
        let config = VigilConfig::default();
        let health = CheckCommand::new(&config).run_cycle().await.unwrap();
        assert_eq!(health.status, HealthStatus::Unknown);
        assert_eq!(health.total_components(), 0);
    }

    #[tokio::test]
    async fn listening_port_is_healthy() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = config_with(&format!(
            r#"{{ "name": "local", "probe": {{ "kind": "tcp", "address": "{addr}" }} }}"#
        ));

        let mut buf = Vec::new();
        CheckCommand::new(&config)
            .execute(&mut buf, &OutputFormat::new(Format::Json), &CheckArgs { strict: true })
            .await
            .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["status"], "healthy");
        assert_eq!(value["components"]["local"]["status"], "healthy");
    }

    #[tokio::test]
    async fn strict_fails_when_unhealthy() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let config = config_with(&format!(
            r#"{{ "name": "gone", "probe": {{ "kind": "tcp", "address": "{addr}" }} }}"#
        ));

        let mut buf = Vec::new();
        let err = CheckCommand::new(&config)
            .execute(&mut buf, &OutputFormat::default(), &CheckArgs { strict: true })
            .await
            .unwrap_err();

        assert!(matches!(err, CliError::Unhealthy(HealthStatus::Unhealthy)));
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("System Health: unhealthy"));
    }
}
