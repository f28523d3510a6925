//! Error types for the vigil-health crate.

use thiserror::Error;

/// Errors surfaced by the health monitor.
///
/// Probe failures never appear here: a failing or hanging checker is folded
/// into an `unhealthy` [`ComponentHealth`](crate::ComponentHealth) instead.
/// These variants describe wiring mistakes made by the caller.
#[derive(Debug, Error)]
pub enum HealthError {
    /// A component with this name is already registered.
    #[error("component already registered: {name}")]
    DuplicateComponent {
        /// The duplicated component name.
        name: String,
    },

    /// No component with this name is registered.
    #[error("component not found: {name}")]
    ComponentNotFound {
        /// The component name that was not found.
        name: String,
    },

    /// The component name is empty or otherwise unusable.
    #[error("invalid component name: {reason}")]
    InvalidComponentName {
        /// Why the name was rejected.
        reason: String,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Why the configuration was rejected.
        reason: String,
    },
}

/// Result type for health monitor operations.
pub type Result<T> = std::result::Result<T, HealthError>;
