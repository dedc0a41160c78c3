//! Failsafe HTTP service implementing the hyper `Service` trait.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use failsafe_model::ApiError;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use tracing::{debug, error};

use crate::body::FailsafeResponseBody;
use crate::dispatch::Dispatcher;
use crate::response::fault_to_response;

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-openstack-request-id";

/// Hyper `Service` implementation for the Failsafe API.
///
/// Collects each request body and hands the request to the shared
/// [`Dispatcher`].
#[derive(Debug, Clone)]
pub struct FailsafeHttpService {
    dispatcher: Arc<Dispatcher>,
}

impl FailsafeHttpService {
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl hyper::service::Service<http::Request<Incoming>> for FailsafeHttpService {
    type Response = http::Response<FailsafeResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let dispatcher = Arc::clone(&self.dispatcher);
        let request_id = format!("req-{}", uuid::Uuid::new_v4());

        Box::pin(async move {
            let response = process_request(req, &dispatcher, &request_id).await;
            Ok(add_common_headers(response, &request_id))
        })
    }
}

async fn process_request(
    req: http::Request<Incoming>,
    dispatcher: &Dispatcher,
    request_id: &str,
) -> http::Response<FailsafeResponseBody> {
    let (parts, incoming) = req.into_parts();
    debug!(request_id, method = %parts.method, path = parts.uri.path(), "received request");

    let body = match collect_body(incoming).await {
        Ok(body) => body,
        Err(err) => {
            error!(request_id, error = %err, "failed to read request body");
            return fault_to_response(&err, None, None);
        }
    };

    dispatcher.dispatch(http::Request::from_parts(parts, body))
}

/// Collect the incoming body into a single `Bytes` buffer.
async fn collect_body(incoming: Incoming) -> Result<Bytes, ApiError> {
    incoming
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .map_err(|e| ApiError::internal_error(format!("Failed to read request body: {e}")))
}

/// Add the headers every Failsafe response carries.
fn add_common_headers(
    mut response: http::Response<FailsafeResponseBody>,
    request_id: &str,
) -> http::Response<FailsafeResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.entry(REQUEST_ID_HEADER).or_insert(hv);
    }
    headers.insert("server", http::HeaderValue::from_static("Failsafe"));

    response
}
