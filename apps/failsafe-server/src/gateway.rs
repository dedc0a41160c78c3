//! Gateway service in front of the Failsafe API.
//!
//! Health-check endpoints (`/health`, `/_health`) are answered here; every
//! other request goes to the API dispatcher.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

use failsafe_http::{FailsafeHttpService, FailsafeResponseBody};
use hyper::body::Incoming;
use hyper::service::Service;

/// Routes health probes to the gateway and everything else to the API.
#[derive(Debug, Clone)]
pub struct GatewayService {
    api: FailsafeHttpService,
    version: &'static str,
}

impl GatewayService {
    pub fn new(api: FailsafeHttpService, version: &'static str) -> Self {
        Self { api, version }
    }
}

impl Service<http::Request<Incoming>> for GatewayService {
    type Response = http::Response<FailsafeResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        if is_health_check(req.method(), req.uri().path()) {
            let response = health_check_response(self.version);
            return Box::pin(async move { Ok(response) });
        }

        let api = self.api.clone();
        Box::pin(async move { api.call(req).await })
    }
}

/// Check if the request is a health check probe.
fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && (path == "/health" || path == "/_health")
}

fn health_check_response(version: &str) -> http::Response<FailsafeResponseBody> {
    let body = serde_json::json!({"status": "running", "version": version});
    let mut response = http::Response::new(FailsafeResponseBody::from_bytes(body.to_string()));
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    response
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    #[test]
    fn test_should_detect_health_check_paths() {
        assert!(is_health_check(&http::Method::GET, "/health"));
        assert!(is_health_check(&http::Method::GET, "/_health"));
        assert!(!is_health_check(&http::Method::POST, "/health"));
        assert!(!is_health_check(&http::Method::GET, "/v1/segments"));
    }

    #[test]
    fn test_should_report_running_status() {
        let response = health_check_response("0.3.0");
        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(response.headers()[http::header::CONTENT_TYPE], "application/json");

        let bytes = tokio_test::block_on(response.into_body().collect())
            .unwrap()
            .to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({"status": "running", "version": "0.3.0"}));
    }
}
