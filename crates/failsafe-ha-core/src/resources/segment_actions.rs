//! Segment enable/disable (`POST /v1/segments/{id}/action`), from 1.2.
//!
//! The extension also decorates host bodies: from 1.2 the segment embedded
//! in a host carries `enabled`, taken from the segment the host controller
//! cached for the request.

use std::sync::Arc;

use failsafe_http::router::ID_PARAM;
use failsafe_http::{
    ActionHook, ActionOutcome, ApiRequest, ApiResponse, ControllerExtension, Extension, RegistryError,
    VersionRange,
};
use failsafe_model::input::SegmentUpdate;
use failsafe_model::{ApiError, Segment};
use serde_json::{Value, json};
use tracing::info;

use super::segments::segment_json;
use super::{SEGMENT_CACHE, UPDATED, V1_2, authorize, bind};
use crate::context::HaContext;
use crate::schemas;

pub const ALIAS: &str = "segment-actions";

/// Host actions whose bodies embed the segment.
const DECORATED_ACTIONS: [&str; 4] = ["index", "show", "create", "update"];

#[derive(Debug)]
pub struct SegmentActionsExtension {
    ctx: Arc<HaContext>,
}

impl SegmentActionsExtension {
    #[must_use]
    pub fn new(ctx: Arc<HaContext>) -> Self {
        Self { ctx }
    }
}

impl Extension for SegmentActionsExtension {
    fn name(&self) -> &str {
        "SegmentActions"
    }

    fn alias(&self) -> &str {
        ALIAS
    }

    fn updated(&self) -> &str {
        UPDATED
    }

    fn description(&self) -> &str {
        "Enable and disable failover segments."
    }

    fn controller_extensions(&self) -> Result<Vec<ControllerExtension>, RegistryError> {
        let ctx = &self.ctx;
        let since = VersionRange::starting_at(V1_2);

        let mut controller = ControllerExtension::new("segments")
            .action(
                "enable",
                since,
                bind(ctx, |ctx, request| set_enabled(ctx, request, "enable", true))
                    .with_schema(schemas::segment_action("enable")),
            )?
            .action(
                "disable",
                since,
                bind(ctx, |ctx, request| set_enabled(ctx, request, "disable", false))
                    .with_schema(schemas::segment_action("disable")),
            )?;
        let hook: Arc<dyn ActionHook> = Arc::new(SegmentEnabledHook);
        for action in DECORATED_ACTIONS {
            controller = controller.hook(action, since, Arc::clone(&hook))?;
        }
        Ok(vec![controller])
    }
}

fn set_enabled(
    ctx: &HaContext,
    request: &mut ApiRequest,
    action: &str,
    enabled: bool,
) -> Result<ActionOutcome, ApiError> {
    authorize(ctx, request, "segments", action)?;
    let update = SegmentUpdate {
        enabled: Some(enabled),
        ..SegmentUpdate::default()
    };
    let segment = ctx.segments.update(request.param(ID_PARAM)?, update)?;
    info!(uuid = %segment.uuid, enabled, "changed failover segment state");
    Ok(json!({"segment": segment_json(request, &segment)?}).into())
}

/// Adds `failover_segment.enabled` to host bodies.
struct SegmentEnabledHook;

impl SegmentEnabledHook {
    fn decorate(request: &ApiRequest, host: &mut Value) {
        let Some(segment) = host
            .get("failover_segment_id")
            .and_then(Value::as_str)
            .and_then(|uuid| request.cache.get_item::<Segment>(SEGMENT_CACHE, uuid))
        else {
            return;
        };
        if let Some(embedded) = host.get_mut("failover_segment").and_then(Value::as_object_mut) {
            embedded.insert("enabled".to_owned(), Value::Bool(segment.enabled));
        }
    }
}

impl ActionHook for SegmentEnabledHook {
    fn after(
        &self,
        request: &mut ApiRequest,
        response: &ApiResponse,
    ) -> Result<Option<ApiResponse>, ApiError> {
        let Some(body) = &response.body else {
            return Ok(None);
        };
        let mut body = body.clone();
        if let Some(host) = body.get_mut("host") {
            Self::decorate(request, host);
        } else if let Some(hosts) = body.get_mut("hosts").and_then(Value::as_array_mut) {
            for host in hosts {
                Self::decorate(request, host);
            }
        } else {
            return Ok(None);
        }

        let mut decorated = ApiResponse::new(response.status, Some(body));
        decorated.headers = response.headers.clone();
        Ok(Some(decorated))
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use serde_json::json;

    use super::super::test_support::{Call, VERSION_HEADER, api, create_host, create_segment};

    #[tokio::test]
    async fn test_should_disable_and_enable_segment() {
        let api = api();
        let segment = create_segment(&api, "s1").await;
        let uri = format!("/v1/segments/{segment}/action");

        let (status, headers, body) = Call::new("POST", &uri)
            .admin()
            .version("1.2")
            .json(json!({"disable": null}))
            .send(&api)
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(headers[VERSION_HEADER], "instance-ha 1.2");
        assert_eq!(body["segment"]["enabled"], false);

        let (_, _, body) = Call::new("POST", &uri)
            .admin()
            .version("1.2")
            .json(json!({"enable": {}}))
            .send(&api)
            .await;
        assert_eq!(body["segment"]["enabled"], true);
    }

    #[tokio::test]
    async fn test_should_hide_actions_below_1_2() {
        let api = api();
        let segment = create_segment(&api, "s1").await;
        let (status, _, _) = Call::new("POST", &format!("/v1/segments/{segment}/action"))
            .admin()
            .version("1.1")
            .json(json!({"disable": null}))
            .send(&api)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_should_reject_unknown_action() {
        let api = api();
        let segment = create_segment(&api, "s1").await;
        let (status, _, body) = Call::new("POST", &format!("/v1/segments/{segment}/action"))
            .admin()
            .version("1.2")
            .json(json!({"reboot": null}))
            .send(&api)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["badRequest"]["message"], "There is no such action: reboot");
    }

    #[tokio::test]
    async fn test_should_add_segment_state_to_hosts_from_1_2() {
        let api = api();
        let segment = create_segment(&api, "s1").await;
        let host = create_host(&api, &segment, "h1").await;
        Call::new("POST", &format!("/v1/segments/{segment}/action"))
            .admin()
            .version("1.2")
            .json(json!({"disable": null}))
            .send(&api)
            .await;

        let (_, _, body) = Call::new("GET", &format!("/v1/segments/{segment}/hosts/{host}"))
            .admin()
            .version("1.2")
            .send(&api)
            .await;
        assert_eq!(body["host"]["failover_segment"]["enabled"], false);

        let (_, _, body) = Call::new("GET", &format!("/v1/segments/{segment}/hosts"))
            .admin()
            .version("1.2")
            .send(&api)
            .await;
        assert_eq!(body["hosts"][0]["failover_segment"]["enabled"], false);

        let (_, _, body) = Call::new("GET", &format!("/v1/segments/{segment}/hosts"))
            .admin()
            .version("1.1")
            .send(&api)
            .await;
        assert!(body["hosts"][0]["failover_segment"].get("enabled").is_none());
    }

    #[tokio::test]
    async fn test_should_forbid_non_admin_toggle() {
        let api = api();
        let segment = create_segment(&api, "s1").await;
        let (status, _, _) = Call::new("POST", &format!("/v1/segments/{segment}/action"))
            .roles("member")
            .version("1.2")
            .json(json!({"disable": null}))
            .send(&api)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
