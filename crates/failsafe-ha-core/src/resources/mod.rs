//! API resources and the extensions that provide them.
//!
//! Each resource is an [`Extension`](failsafe_http::Extension) whose
//! handlers are closures over the shared [`HaContext`].

pub mod extensions;
pub mod hosts;
pub mod notifications;
pub mod segment_actions;
pub mod segments;
pub mod versions;

use std::sync::Arc;

use failsafe_http::pagination::{PageParams, sort_params};
use failsafe_http::{ActionBinding, ActionOutcome, ApiRequest};
use failsafe_model::input::coerce_bool_str;
use failsafe_model::output::Link;
use failsafe_model::{ApiError, ApiVersion};
use serde::Serialize;
use serde_json::Value;

use crate::context::HaContext;
use crate::policy::policy_action;
use crate::storage::Page;

pub const V1_0: ApiVersion = ApiVersion::new(1, 0);
/// Notification show exposes recovery workflow details.
pub const V1_1: ApiVersion = ApiVersion::new(1, 1);
/// Segments carry `enabled`.
pub const V1_2: ApiVersion = ApiVersion::new(1, 2);

/// Request cache holding the segment a host request was made under.
pub const SEGMENT_CACHE: &str = "segments";

/// Date of the last change of the built-in extensions.
pub(crate) const UPDATED: &str = "2024-06-01T00:00:00Z";

/// Bind a controller function to the shared context.
pub(crate) fn bind<F>(ctx: &Arc<HaContext>, handler: F) -> ActionBinding
where
    F: Fn(&HaContext, &mut ApiRequest) -> Result<ActionOutcome, ApiError> + Send + Sync + 'static,
{
    let ctx = Arc::clone(ctx);
    ActionBinding::new(move |request| handler(&ctx, request))
}

pub(crate) fn authorize(
    ctx: &HaContext,
    request: &ApiRequest,
    resource: &str,
    action: &str,
) -> Result<(), ApiError> {
    ctx.policy
        .authorize(&request.caller, &policy_action(resource, action))
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value)
        .map_err(|e| ApiError::internal_error(format!("failed to serialize view: {e}")).with_source(e))
}

/// Page parameters of a listing, plus the repository page they translate to.
pub(crate) fn paging(
    ctx: &HaContext,
    request: &ApiRequest,
    sort_keys: &[&str],
    default_key: &str,
) -> Result<(PageParams, Page), ApiError> {
    let params = PageParams::from_request(request, ctx.config.api_max_limit)?;
    let page = Page {
        sort: sort_params(request, sort_keys, default_key)?,
        limit: params.limit,
        marker: params.marker.clone(),
    };
    Ok((params, page))
}

/// `{"<name>": [...], "<name>_links": [next]}`; the links key only when there
/// is a next page.
pub(crate) fn collection(name: &str, items: Vec<Value>, next: Option<Link>) -> Result<Value, ApiError> {
    let mut body = serde_json::Map::new();
    body.insert(name.to_owned(), Value::Array(items));
    if let Some(link) = next {
        body.insert(format!("{name}_links"), to_json(&[link])?);
    }
    Ok(Value::Object(body))
}

/// A boolean query filter in the closed token set.
pub(crate) fn query_bool(request: &ApiRequest, name: &str) -> Result<Option<bool>, ApiError> {
    request
        .query_param(name)
        .map(|raw| {
            coerce_bool_str(raw)
                .ok_or_else(|| ApiError::invalid(format!("Invalid value for {name} filter: {raw}")))
        })
        .transpose()
}

/// A query filter that must name one of an enumeration's values.
pub(crate) fn query_enum<T>(
    request: &ApiRequest,
    name: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, ApiError> {
    request
        .query_param(name)
        .map(|raw| parse(raw).ok_or_else(|| ApiError::invalid(format!("Invalid value for {name} filter: {raw}"))))
        .transpose()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use bytes::Bytes;
    use failsafe_core::FailsafeConfig;
    use failsafe_http::Dispatcher;
    use failsafe_model::Notification;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tokio::sync::mpsc;

    use crate::context::HaContext;
    use crate::loader::build_dispatcher;
    use crate::notifier::ChannelNotifier;

    pub(crate) const VERSION_HEADER: &str = "OpenStack-API-Version";

    pub(crate) struct TestApi {
        pub(crate) dispatcher: Dispatcher,
        pub(crate) ctx: Arc<HaContext>,
        pub(crate) recovery: mpsc::Receiver<Notification>,
    }

    pub(crate) fn api_with(config: FailsafeConfig) -> TestApi {
        let (notifier, recovery) = ChannelNotifier::new(16);
        let ctx = Arc::new(HaContext::in_memory(config, Arc::new(notifier)));
        let dispatcher = build_dispatcher(&ctx).unwrap();
        TestApi {
            dispatcher,
            ctx,
            recovery,
        }
    }

    pub(crate) fn api() -> TestApi {
        api_with(FailsafeConfig::default())
    }

    /// One API call as an admin.
    pub(crate) struct Call {
        builder: http::request::Builder,
        body: Option<Value>,
    }

    impl Call {
        pub(crate) fn new(method: &str, uri: &str) -> Self {
            Self {
                builder: http::Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("x-user-id", "operator")
                    .header("x-project-id", "admin-project"),
                body: None,
            }
        }

        pub(crate) fn roles(mut self, roles: &str) -> Self {
            self.builder = self.builder.header("x-roles", roles);
            self
        }

        pub(crate) fn admin(self) -> Self {
            self.roles("admin")
        }

        pub(crate) fn version(mut self, version: &str) -> Self {
            self.builder = self
                .builder
                .header(VERSION_HEADER, format!("instance-ha {version}"));
            self
        }

        pub(crate) fn json(mut self, body: Value) -> Self {
            self.body = Some(body);
            self
        }

        pub(crate) async fn send(self, api: &TestApi) -> (http::StatusCode, http::HeaderMap, Value) {
            let body = self
                .body
                .map(|b| Bytes::from(b.to_string()))
                .unwrap_or_default();
            let request = self
                .builder
                .header("content-type", "application/json")
                .body(body)
                .unwrap();
            let response = api.dispatcher.dispatch(request);
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, headers, value)
        }
    }

    pub(crate) async fn create_segment(api: &TestApi, name: &str) -> String {
        let (status, _, body) = Call::new("POST", "/v1/segments")
            .admin()
            .json(serde_json::json!({"segment": {
                "name": name, "recovery_method": "auto", "service_type": "COMPUTE"
            }}))
            .send(api)
            .await;
        assert_eq!(status, http::StatusCode::CREATED, "{body}");
        body["segment"]["uuid"].as_str().unwrap().to_owned()
    }

    pub(crate) async fn create_host(api: &TestApi, segment: &str, name: &str) -> String {
        let (status, _, body) = Call::new("POST", &format!("/v1/segments/{segment}/hosts"))
            .admin()
            .json(serde_json::json!({"host": {
                "name": name, "type": "COMPUTE", "control_attributes": "SSH"
            }}))
            .send(api)
            .await;
        assert_eq!(status, http::StatusCode::CREATED, "{body}");
        body["host"]["uuid"].as_str().unwrap().to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_build_collection_with_optional_links() {
        let body = collection("segments", vec![], None).unwrap();
        assert_eq!(body, serde_json::json!({"segments": []}));

        let body = collection(
            "hosts",
            vec![serde_json::json!({"name": "h1"})],
            Some(Link::new("next", "http://x/v1/hosts?limit=1&marker=m")),
        )
        .unwrap();
        assert_eq!(body["hosts_links"][0]["rel"], "next");
    }
}
