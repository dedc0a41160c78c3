//! Repository error type and its mapping onto API errors.

use failsafe_model::ApiError;

/// Failures reported by the repositories.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{kind} {key} could not be found.")]
    NotFound { kind: &'static str, key: String },

    #[error("{kind} with name {name} already exists.")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("Marker {0} could not be found.")]
    InvalidMarker(String),

    #[error("{0}")]
    Invalid(String),
}

impl RepositoryError {
    pub(crate) fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match &err {
            RepositoryError::NotFound { .. } => ApiError::not_found(err.to_string()),
            RepositoryError::AlreadyExists { .. } => ApiError::conflict(err.to_string()),
            RepositoryError::InvalidMarker(marker) => ApiError::invalid_marker(marker),
            RepositoryError::Invalid(message) => ApiError::invalid(message.clone()),
        }
    }
}
