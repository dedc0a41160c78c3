//! Error types for the Failsafe core.

/// Core error type for Failsafe infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum FailsafeError {
    /// A configuration value could not be interpreted.
    #[error("invalid configuration value for {key}: {value}")]
    InvalidConfig {
        /// The environment variable or setting name.
        key: &'static str,
        /// The rejected value.
        value: String,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience result type for Failsafe core operations.
pub type FailsafeResult<T> = Result<T, FailsafeError>;
