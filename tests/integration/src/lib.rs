//! Integration tests for the Failsafe server.
//!
//! These tests require a running Failsafe server at `localhost:15868`.
//! They are marked `#[ignore]` so they don't run during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! cargo test -p failsafe-integration -- --ignored
//! ```

use std::sync::Once;

use serde_json::Value;
use tracing::debug;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL for the server.
fn endpoint_url() -> String {
    std::env::var("FAILSAFE_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:15868".to_owned())
}

/// Header carrying the requested microversion.
pub const VERSION_HEADER: &str = "OpenStack-API-Version";

/// A response reduced to what the tests look at.
#[derive(Debug)]
pub struct ApiReply {
    pub status: reqwest::StatusCode,
    pub headers: reqwest::header::HeaderMap,
    pub body: Value,
}

/// Minimal client for the Failsafe API, calling as an admin.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
    version: Option<String>,
    roles: String,
}

impl ApiClient {
    #[must_use]
    pub fn new() -> Self {
        init_tracing();
        Self {
            http: reqwest::Client::new(),
            base: endpoint_url(),
            version: None,
            roles: "admin".to_owned(),
        }
    }

    /// Send `OpenStack-API-Version: instance-ha <version>` on every call.
    #[must_use]
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_owned());
        self
    }

    #[must_use]
    pub fn with_roles(mut self, roles: &str) -> Self {
        self.roles = roles.to_owned();
        self
    }

    pub async fn send(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> ApiReply {
        let url = format!("{}{path}", self.base);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .header("x-user-id", "integration")
            .header("x-project-id", "integration-project")
            .header("x-roles", &self.roles);
        if let Some(version) = &self.version {
            request = request.header(VERSION_HEADER, format!("instance-ha {version}"));
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .unwrap_or_else(|e| panic!("{method} {url} failed: {e}"));
        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await.unwrap_or_default();
        debug!(%method, %url, %status, "api call");
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        ApiReply {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, path: &str) -> ApiReply {
        self.send(reqwest::Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> ApiReply {
        self.send(reqwest::Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> ApiReply {
        self.send(reqwest::Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> ApiReply {
        self.send(reqwest::Method::DELETE, path, None).await
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a unique resource name for a test.
#[must_use]
pub fn unique_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Create a segment and return its uuid. Caller is responsible for cleanup.
pub async fn create_segment(client: &ApiClient, prefix: &str) -> String {
    let name = unique_name(prefix);
    let reply = client
        .post(
            "/v1/segments",
            serde_json::json!({"segment": {
                "name": name, "recovery_method": "auto", "service_type": "COMPUTE"
            }}),
        )
        .await;
    assert_eq!(reply.status, reqwest::StatusCode::CREATED, "{}", reply.body);
    reply.body["segment"]["uuid"]
        .as_str()
        .unwrap_or_else(|| panic!("no uuid in {}", reply.body))
        .to_owned()
}

/// Create a host in `segment` and return `(uuid, name)`.
pub async fn create_host(client: &ApiClient, segment: &str, prefix: &str) -> (String, String) {
    let name = unique_name(prefix);
    let reply = client
        .post(
            &format!("/v1/segments/{segment}/hosts"),
            serde_json::json!({"host": {
                "name": name, "type": "COMPUTE", "control_attributes": "SSH"
            }}),
        )
        .await;
    assert_eq!(reply.status, reqwest::StatusCode::CREATED, "{}", reply.body);
    let uuid = reply.body["host"]["uuid"]
        .as_str()
        .unwrap_or_else(|| panic!("no uuid in {}", reply.body))
        .to_owned();
    (uuid, name)
}

/// Delete a segment and, with it, its hosts.
pub async fn cleanup_segment(client: &ApiClient, segment: &str) {
    let _ = client.delete(&format!("/v1/segments/{segment}")).await;
}

mod test_discovery;
mod test_hosts;
mod test_notifications;
mod test_segments;
