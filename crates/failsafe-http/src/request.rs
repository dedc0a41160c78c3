//! Per-request context, handler outcomes and action bindings.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use failsafe_core::CallerContext;
use failsafe_model::{ApiError, ApiVersion, VersionToken, VersionWindow};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::body::FailsafeResponseBody;
use crate::schema::Schema;

/// Ephemeral per-request store for objects shared between a controller and
/// the extension hooks wrapping it.
///
/// Entries are keyed by `(cache name, lookup key)` and hold any `'static`
/// value; lookups downcast to the requested type.
#[derive(Default)]
pub struct RequestCache {
    items: HashMap<(String, String), Arc<dyn Any + Send + Sync>>,
}

impl RequestCache {
    /// Cache every item under `name`, keyed by `key_of(item)`.
    pub fn insert_items<T, I, F>(&mut self, name: &str, key_of: F, items: I)
    where
        T: Any + Send + Sync,
        I: IntoIterator<Item = T>,
        F: Fn(&T) -> String,
    {
        for item in items {
            let key = key_of(&item);
            self.items.insert((name.to_owned(), key), Arc::new(item));
        }
    }

    /// Look up an item previously cached under `name`.
    ///
    /// Returns `None` if nothing was cached or the cached value is not a `T`.
    #[must_use]
    pub fn get_item<T: Any + Send + Sync>(&self, name: &str, key: &str) -> Option<&T> {
        self.items
            .get(&(name.to_owned(), key.to_owned()))
            .and_then(|item| item.downcast_ref::<T>())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Debug for RequestCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCache")
            .field("keys", &self.items.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Everything a handler or hook may look at for one request.
#[derive(Debug)]
pub struct ApiRequest {
    pub method: http::Method,
    /// Request path without a format suffix.
    pub path: String,
    pub headers: http::HeaderMap,
    /// Resolved action name (`index`, `show`, `create`, `update`, `delete`,
    /// or the key of an action-endpoint body).
    pub action: String,
    /// `Null` for unversioned resources, otherwise the resolved version.
    pub version: VersionToken,
    /// The server's supported version window.
    pub window: VersionWindow,
    /// Negotiated response media type.
    pub response_type: String,
    /// Best matching available language, if any.
    pub language: Option<String>,
    pub caller: CallerContext,
    /// Project id embedded in the URL, if any.
    pub project_id: Option<String>,
    pub params: HashMap<String, String>,
    pub query: Vec<(String, String)>,
    /// Decoded body; `None` for an empty body.
    pub body: Option<Value>,
    /// Scheme and authority used when building links.
    pub base_url: String,
    pub cache: RequestCache,
}

impl ApiRequest {
    /// A path parameter captured by the router.
    pub fn param(&self, name: &str) -> Result<&str, ApiError> {
        self.params
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ApiError::bad_argument(format!("missing path parameter {name}")))
    }

    /// First value of a query parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a repeated query parameter.
    pub fn query_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.query
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the request was made at `min` or a later version.
    ///
    /// Unversioned requests never qualify.
    #[must_use]
    pub fn is_at_least(&self, min: ApiVersion) -> bool {
        self.version.as_version().is_some_and(|v| v >= min)
    }

    /// The version used to select handlers: the request version, or the
    /// default for unversioned requests.
    #[must_use]
    pub fn effective_version(&self) -> ApiVersion {
        self.version.as_version().unwrap_or(self.window.default)
    }

    /// Deserialize the (already validated) body.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let body = self.body.clone().unwrap_or(Value::Null);
        serde_json::from_value(body).map_err(|e| ApiError::bad_argument(e.to_string()).with_source(e))
    }

    /// The body of an action-endpoint request: the value under its single key.
    #[must_use]
    pub fn action_argument(&self) -> Option<&Value> {
        self.body.as_ref()?.as_object()?.get(&self.action)
    }
}

/// A structured response before serialization.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: http::StatusCode,
    pub body: Option<Value>,
    pub headers: http::HeaderMap,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: http::StatusCode, body: Option<Value>) -> Self {
        Self {
            status,
            body,
            headers: http::HeaderMap::new(),
        }
    }

    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::new(http::StatusCode::OK, Some(body))
    }

    #[must_use]
    pub fn with_header(mut self, name: http::HeaderName, value: http::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// What a handler produced.
#[derive(Debug)]
pub enum ActionOutcome {
    /// No body; the binding's success status applies.
    Empty,
    /// A body; the binding's success status applies.
    Value(Value),
    /// A complete structured response.
    Response(ApiResponse),
    /// A finished HTTP response, passed through untouched.
    Raw(http::Response<FailsafeResponseBody>),
}

impl From<Value> for ActionOutcome {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<ApiResponse> for ActionOutcome {
    fn from(response: ApiResponse) -> Self {
        Self::Response(response)
    }
}

/// Signature of every action handler.
pub type ActionHandler = Arc<dyn Fn(&mut ApiRequest) -> Result<ActionOutcome, ApiError> + Send + Sync>;

/// A handler together with the body schema and success status of its
/// version range.
#[derive(Clone)]
pub struct ActionBinding {
    handler: ActionHandler,
    schema: Option<Arc<Schema>>,
    success_status: http::StatusCode,
}

impl ActionBinding {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&mut ApiRequest) -> Result<ActionOutcome, ApiError> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            schema: None,
            success_status: http::StatusCode::OK,
        }
    }

    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<Schema>) -> Self {
        self.schema = Some(Arc::new(schema.into()));
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: http::StatusCode) -> Self {
        self.success_status = status;
        self
    }

    #[must_use]
    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_deref()
    }

    #[must_use]
    pub fn success_status(&self) -> http::StatusCode {
        self.success_status
    }

    pub fn invoke(&self, request: &mut ApiRequest) -> Result<ActionOutcome, ApiError> {
        (self.handler)(request)
    }
}

impl fmt::Debug for ActionBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionBinding")
            .field("has_schema", &self.schema.is_some())
            .field("success_status", &self.success_status)
            .finish_non_exhaustive()
    }
}
