//! Failsafe API error types.
//!
//! Every failure that reaches a client is an [`ApiError`]. The HTTP layer
//! turns it into the fault envelope; this crate only decides the code, the
//! status, and the message.

use std::fmt;

use crate::version::VersionError;

/// Well-known API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ApiErrorCode {
    /// Body is not JSON, or the action body has the wrong shape.
    MalformedRequestBody,
    /// `Content-Type` is not one of the supported media types.
    InvalidContentType,
    /// The version header value could not be parsed.
    InvalidVersionString,
    /// The requested version is outside the supported window.
    UnsupportedGlobalVersion,
    /// No handler of the operation covers the requested version.
    VersionNotFoundForMethod,
    /// Request body failed schema validation.
    #[default]
    ValidationError,
    /// Policy check denied the caller.
    PolicyNotAuthorized,
    /// The resource has no handler for this HTTP method.
    BadMethod,
    /// The action endpoint named an unknown action.
    InvalidAction,
    /// Project in the URL does not match the caller's project.
    ProjectMismatch,
    /// Pagination marker not found.
    InvalidMarker,
    /// Requested entity does not exist.
    NotFound,
    /// Request conflicts with current state.
    Conflict,
    /// Request is semantically invalid.
    Invalid,
    /// Rate or size limit exceeded.
    OverLimit,
    /// Operation not implemented.
    NotImplemented,
    /// Service temporarily unavailable.
    ServiceUnavailable,
    /// A handler was called with arguments it cannot accept.
    BadArgument,
    /// Unexpected server-side failure.
    InternalError,
}

impl ApiErrorCode {
    /// Returns the short error code string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedRequestBody => "MalformedRequestBody",
            Self::InvalidContentType => "InvalidContentType",
            Self::InvalidVersionString => "InvalidVersionString",
            Self::UnsupportedGlobalVersion => "UnsupportedGlobalVersion",
            Self::VersionNotFoundForMethod => "VersionNotFoundForMethod",
            Self::ValidationError => "ValidationError",
            Self::PolicyNotAuthorized => "PolicyNotAuthorized",
            Self::BadMethod => "BadMethod",
            Self::InvalidAction => "InvalidAction",
            Self::ProjectMismatch => "ProjectMismatch",
            Self::InvalidMarker => "InvalidMarker",
            Self::NotFound => "NotFound",
            Self::Conflict => "Conflict",
            Self::Invalid => "Invalid",
            Self::OverLimit => "OverLimit",
            Self::NotImplemented => "NotImplemented",
            Self::ServiceUnavailable => "ServiceUnavailable",
            Self::BadArgument => "BadArgument",
            Self::InternalError => "InternalError",
        }
    }

    /// Returns the default HTTP status code for this error.
    #[must_use]
    pub fn default_status_code(&self) -> http::StatusCode {
        match self {
            Self::InvalidContentType => http::StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::UnsupportedGlobalVersion => http::StatusCode::NOT_ACCEPTABLE,
            Self::VersionNotFoundForMethod | Self::NotFound => http::StatusCode::NOT_FOUND,
            Self::PolicyNotAuthorized => http::StatusCode::FORBIDDEN,
            Self::BadMethod => http::StatusCode::METHOD_NOT_ALLOWED,
            Self::Conflict => http::StatusCode::CONFLICT,
            Self::OverLimit => http::StatusCode::TOO_MANY_REQUESTS,
            Self::NotImplemented => http::StatusCode::NOT_IMPLEMENTED,
            Self::ServiceUnavailable => http::StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalError => http::StatusCode::INTERNAL_SERVER_ERROR,
            Self::MalformedRequestBody
            | Self::InvalidVersionString
            | Self::ValidationError
            | Self::InvalidAction
            | Self::ProjectMismatch
            | Self::InvalidMarker
            | Self::Invalid
            | Self::BadArgument => http::StatusCode::BAD_REQUEST,
        }
    }

    /// Client-facing message replacing the real one, for codes whose detail
    /// must stay server-side.
    #[must_use]
    pub fn generic_message(&self) -> Option<&'static str> {
        match self {
            Self::VersionNotFoundForMethod => Some("The resource could not be found."),
            Self::BadArgument => Some(
                "The server could not comply with the request since it is either \
                 malformed or otherwise incorrect.",
            ),
            Self::InternalError => Some(
                "Unexpected API Error. Please report this at the service's bug \
                 tracker and attach the API log if possible.",
            ),
            _ => None,
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Failsafe API error.
#[derive(Debug)]
pub struct ApiError {
    /// The error code.
    pub code: ApiErrorCode,
    /// A human-readable error message (server-side detail).
    pub message: String,
    /// The HTTP status code.
    pub status_code: http::StatusCode,
    /// Value for `Retry-After`, when the client should back off.
    pub retry_after: Option<String>,
    /// The underlying source error, if any.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiError({}): {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl ApiError {
    /// Create a new `ApiError` from an error code.
    #[must_use]
    pub fn new(code: ApiErrorCode) -> Self {
        Self::with_message(code, code.as_str())
    }

    /// Create a new `ApiError` with a custom message.
    #[must_use]
    pub fn with_message(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            status_code: code.default_status_code(),
            message: message.into(),
            code,
            retry_after: None,
            source: None,
        }
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Override the HTTP status code.
    #[must_use]
    pub fn with_status(mut self, status: http::StatusCode) -> Self {
        self.status_code = status;
        self
    }

    /// Attach a `Retry-After` value.
    #[must_use]
    pub fn with_retry_after(mut self, retry_after: impl Into<String>) -> Self {
        self.retry_after = Some(retry_after.into());
        self
    }

    /// The message safe to show to the client.
    #[must_use]
    pub fn client_message(&self) -> &str {
        self.code.generic_message().unwrap_or(&self.message)
    }

    // -- Convenience constructors --

    #[must_use]
    pub fn malformed_body(message: impl Into<String>) -> Self {
        Self::with_message(ApiErrorCode::MalformedRequestBody, message)
    }

    #[must_use]
    pub fn invalid_content_type(content_type: &str) -> Self {
        Self::with_message(
            ApiErrorCode::InvalidContentType,
            format!("Invalid content type {content_type}."),
        )
    }

    #[must_use]
    pub fn version_not_found(method: &str) -> Self {
        Self::with_message(
            ApiErrorCode::VersionNotFoundForMethod,
            format!("API version request is not supported by method: {method}"),
        )
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_message(ApiErrorCode::ValidationError, message)
    }

    #[must_use]
    pub fn policy_not_authorized(action: &str) -> Self {
        Self::with_message(
            ApiErrorCode::PolicyNotAuthorized,
            format!("Policy doesn't allow {action} to be performed."),
        )
    }

    #[must_use]
    pub fn bad_method() -> Self {
        Self::with_message(
            ApiErrorCode::BadMethod,
            "The method specified is not allowed for this resource.",
        )
    }

    #[must_use]
    pub fn invalid_action(action: &str) -> Self {
        Self::with_message(
            ApiErrorCode::InvalidAction,
            format!("There is no such action: {action}"),
        )
    }

    #[must_use]
    pub fn project_mismatch(url_project: &str, caller_project: &str) -> Self {
        Self::with_message(
            ApiErrorCode::ProjectMismatch,
            format!(
                "Malformed request URL: URL's project_id '{url_project}' doesn't match \
                 Context's project_id '{caller_project}'"
            ),
        )
    }

    #[must_use]
    pub fn invalid_marker(marker: &str) -> Self {
        Self::with_message(
            ApiErrorCode::InvalidMarker,
            format!("Marker {marker} could not be found."),
        )
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_message(ApiErrorCode::NotFound, message)
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::with_message(ApiErrorCode::Conflict, message)
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::with_message(ApiErrorCode::Invalid, message)
    }

    #[must_use]
    pub fn bad_argument(message: impl Into<String>) -> Self {
        Self::with_message(ApiErrorCode::BadArgument, message)
    }

    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::with_message(ApiErrorCode::InternalError, message)
    }
}

impl From<VersionError> for ApiError {
    fn from(err: VersionError) -> Self {
        let code = match &err {
            VersionError::InvalidVersionString(_) => ApiErrorCode::InvalidVersionString,
            VersionError::UnsupportedGlobalVersion { .. } => ApiErrorCode::UnsupportedGlobalVersion,
            VersionError::InvalidWindow { .. } => ApiErrorCode::InternalError,
        };
        Self::with_message(code, err.to_string())
    }
}

/// Create an `ApiError` from an error code.
///
/// # Examples
///
/// ```
/// use failsafe_model::api_error;
/// use failsafe_model::error::ApiErrorCode;
///
/// let err = api_error!(Conflict);
/// assert_eq!(err.code, ApiErrorCode::Conflict);
///
/// let err = api_error!(NotFound, "Segment abc could not be found.");
/// assert_eq!(err.status_code, http::StatusCode::NOT_FOUND);
/// ```
#[macro_export]
macro_rules! api_error {
    ($code:ident) => {
        $crate::error::ApiError::new($crate::error::ApiErrorCode::$code)
    };
    ($code:ident, $msg:expr) => {
        $crate::error::ApiError::with_message($crate::error::ApiErrorCode::$code, $msg)
    };
}
