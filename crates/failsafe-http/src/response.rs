//! Response serialization and fault formatting.

use failsafe_model::ApiError;
use tracing::warn;

use crate::body::FailsafeResponseBody;
use crate::fault::{Fault, MessageCatalog};
use crate::negotiation::JSON_MEDIA_TYPE;
use crate::request::ApiResponse;

/// Serialize a structured response in the negotiated media type.
#[must_use]
pub fn api_response_to_http(
    response: ApiResponse,
    content_type: &str,
) -> http::Response<FailsafeResponseBody> {
    let ApiResponse {
        status,
        body,
        headers,
    } = response;

    let body = match body {
        Some(value) => match serde_json::to_vec(&value) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                let err = ApiError::internal_error(format!("failed to serialize response: {e}"));
                return fault_to_response(&err, None, None);
            }
        },
        None => None,
    };

    let mut http_response = http::Response::new(
        body.map_or_else(FailsafeResponseBody::empty, FailsafeResponseBody::from_bytes),
    );
    *http_response.status_mut() = status;
    let has_body = !matches!(http_response.body(), FailsafeResponseBody::Empty);

    let out = http_response.headers_mut();
    out.extend(headers);
    if has_body {
        if let Ok(value) = http::HeaderValue::from_str(content_type) {
            out.insert(http::header::CONTENT_TYPE, value);
        }
    }
    http_response
}

/// Render an error as a fault response.
#[must_use]
pub fn fault_to_response(
    error: &ApiError,
    language: Option<&str>,
    catalog: Option<&dyn MessageCatalog>,
) -> http::Response<FailsafeResponseBody> {
    let fault = Fault::from_error(error, language, catalog);
    let json = serde_json::to_vec(&fault.to_json()).unwrap_or_default();

    let mut response = http::Response::new(FailsafeResponseBody::from_bytes(json));
    *response.status_mut() = fault.status;
    let headers = response.headers_mut();
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static(JSON_MEDIA_TYPE),
    );
    if let Some(retry_after) = &fault.retry_after {
        match http::HeaderValue::from_str(retry_after) {
            Ok(value) => {
                headers.insert(http::header::RETRY_AFTER, value);
            }
            Err(e) => warn!(retry_after = %retry_after, error = %e, "invalid Retry-After value"),
        }
    }
    if let Some(language) = language.and_then(|l| http::HeaderValue::from_str(l).ok()) {
        headers.insert(http::header::CONTENT_LANGUAGE, language);
    }
    response
}
