//! CLI error types.

use thiserror::Error;
use vigil_alerts::AlertError;
use vigil_health::{HealthError, HealthStatus};

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Health monitor rejected an operation.
    #[error("health error: {0}")]
    Health(#[from] HealthError),

    /// Alert manager rejected an operation.
    #[error("alert error: {0}")]
    Alert(#[from] AlertError),

    /// The system was not healthy under `--strict`.
    #[error("system is {0}")]
    Unhealthy(HealthStatus),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_error_display_config() {
        let err = CliError::Config("missing file".into());
        assert_eq!(err.to_string(), "configuration error: missing file");
    }

    #[test]
    fn cli_error_display_unhealthy() {
        let err = CliError::Unhealthy(HealthStatus::Degraded);
        assert_eq!(err.to_string(), "system is degraded");
    }

    #[test]
    fn cli_error_from_health_error() {
        let err = CliError::from(HealthError::DuplicateComponent { name: "db".into() });
        assert!(matches!(err, CliError::Health(_)));
        assert!(err.to_string().contains("db"));
    }

    #[test]
    fn cli_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err = CliError::from(io_err);
        assert!(matches!(cli_err, CliError::Io(_)));
    }
}
