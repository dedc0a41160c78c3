//! Hosts of a failover segment: `/v1/segments/{segment_id}/hosts`.
//!
//! Every action first loads the segment named in the URL and leaves it in
//! the request cache for hooks that decorate host bodies.

use std::sync::Arc;

use failsafe_http::router::ID_PARAM;
use failsafe_http::{ActionOutcome, ApiRequest, Extension, RegistryError, ResourceBinding, VersionRange};
use failsafe_model::input::{CreateHostRequest, UpdateHostRequest};
use failsafe_model::output::{HostView, SegmentView};
use failsafe_model::{ApiError, Host, Segment};
use serde_json::{Value, json};
use tracing::info;

use super::{SEGMENT_CACHE, UPDATED, authorize, bind, collection, paging, query_bool, to_json};
use crate::context::HaContext;
use crate::error::RepositoryError;
use crate::schemas;
use crate::storage::{HOST, HostFilters, NewHost};

pub const ALIAS: &str = "hosts";

/// URL parameter naming the parent segment.
pub const SEGMENT_PARAM: &str = "segment_id";

const SORT_KEYS: &[&str] = &[
    "created_at",
    "id",
    "name",
    "type",
    "updated_at",
    "uuid",
    "reserved",
    "on_maintenance",
];

#[derive(Debug)]
pub struct HostsExtension {
    ctx: Arc<HaContext>,
}

impl HostsExtension {
    #[must_use]
    pub fn new(ctx: Arc<HaContext>) -> Self {
        Self { ctx }
    }
}

impl Extension for HostsExtension {
    fn name(&self) -> &str {
        "Hosts"
    }

    fn alias(&self) -> &str {
        ALIAS
    }

    fn updated(&self) -> &str {
        UPDATED
    }

    fn description(&self) -> &str {
        "Host management within failover segments."
    }

    fn resources(&self) -> Result<Vec<ResourceBinding>, RegistryError> {
        let ctx = &self.ctx;
        Ok(vec![
            ResourceBinding::new("hosts", "host")
                .with_parent("segments", SEGMENT_PARAM)
                .inherits("segments")
                .action("index", VersionRange::ALL, bind(ctx, index))?
                .action("show", VersionRange::ALL, bind(ctx, show))?
                .action(
                    "create",
                    VersionRange::ALL,
                    bind(ctx, create)
                        .with_schema(schemas::create_host())
                        .with_status(http::StatusCode::CREATED),
                )?
                .action(
                    "update",
                    VersionRange::ALL,
                    bind(ctx, update).with_schema(schemas::update_host()),
                )?
                .action(
                    "delete",
                    VersionRange::ALL,
                    bind(ctx, delete).with_status(http::StatusCode::NO_CONTENT),
                )?,
        ])
    }
}

/// Fetch the URL's segment and cache it for the hooks.
fn load_segment(ctx: &HaContext, request: &mut ApiRequest) -> Result<Segment, ApiError> {
    let segment = ctx.segments.get_by_uuid(request.param(SEGMENT_PARAM)?)?;
    request
        .cache
        .insert_items(SEGMENT_CACHE, |s: &Segment| s.uuid.clone(), [segment.clone()]);
    Ok(segment)
}

/// The host named in the URL; hosts of other segments do not exist here.
fn load_host(ctx: &HaContext, request: &ApiRequest, segment: &Segment) -> Result<Host, ApiError> {
    let uuid = request.param(ID_PARAM)?;
    let host = ctx.hosts.get_by_uuid(uuid)?;
    if host.failover_segment_id != segment.uuid {
        return Err(RepositoryError::not_found(HOST, uuid).into());
    }
    Ok(host)
}

fn host_json(host: &Host, segment: &Segment) -> Result<Value, ApiError> {
    to_json(&HostView::new(host, SegmentView::new(segment, false)))
}

fn index(ctx: &HaContext, request: &mut ApiRequest) -> Result<ActionOutcome, ApiError> {
    authorize(ctx, request, ALIAS, "index")?;
    let segment = load_segment(ctx, request)?;

    let filters = HostFilters {
        segment_uuid: Some(segment.uuid.clone()),
        name: None,
        host_type: request.query_param("type").map(ToOwned::to_owned),
        control_attributes: request.query_param("control_attributes").map(ToOwned::to_owned),
        on_maintenance: query_bool(request, "on_maintenance")?,
        reserved: query_bool(request, "reserved")?,
    };
    let (params, page) = paging(ctx, request, SORT_KEYS, "created_at")?;
    let hosts = ctx.hosts.get_all(&filters, &page)?;

    let next = params.next_link(request, hosts.len(), hosts.last().map(|h| h.uuid.as_str()));
    let items = hosts
        .iter()
        .map(|h| host_json(h, &segment))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(collection("hosts", items, next)?.into())
}

fn show(ctx: &HaContext, request: &mut ApiRequest) -> Result<ActionOutcome, ApiError> {
    authorize(ctx, request, ALIAS, "show")?;
    let segment = load_segment(ctx, request)?;
    let host = load_host(ctx, request, &segment)?;
    Ok(json!({"host": host_json(&host, &segment)?}).into())
}

fn create(ctx: &HaContext, request: &mut ApiRequest) -> Result<ActionOutcome, ApiError> {
    authorize(ctx, request, ALIAS, "create")?;
    let segment = load_segment(ctx, request)?;
    let input: CreateHostRequest = request.body_as()?;
    let host = ctx.hosts.create(NewHost {
        segment_uuid: segment.uuid.clone(),
        host: input.host,
    })?;
    info!(uuid = %host.uuid, name = %host.name, segment = %segment.uuid, "created host");
    Ok(json!({"host": host_json(&host, &segment)?}).into())
}

fn update(ctx: &HaContext, request: &mut ApiRequest) -> Result<ActionOutcome, ApiError> {
    authorize(ctx, request, ALIAS, "update")?;
    let segment = load_segment(ctx, request)?;
    let host = load_host(ctx, request, &segment)?;
    let input: UpdateHostRequest = request.body_as()?;
    let host = ctx.hosts.update(&host.uuid, input.host)?;
    Ok(json!({"host": host_json(&host, &segment)?}).into())
}

fn delete(ctx: &HaContext, request: &mut ApiRequest) -> Result<ActionOutcome, ApiError> {
    authorize(ctx, request, ALIAS, "delete")?;
    let segment = load_segment(ctx, request)?;
    let host = load_host(ctx, request, &segment)?;
    ctx.hosts.destroy(&host.uuid)?;
    info!(uuid = %host.uuid, "deleted host");
    Ok(ActionOutcome::Empty)
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use serde_json::json;

    use super::super::test_support::{Call, api, create_host, create_segment};

    #[tokio::test]
    async fn test_should_create_host_with_embedded_segment() {
        let api = api();
        let segment = create_segment(&api, "s1").await;
        let host = create_host(&api, &segment, "compute-1").await;

        let (status, _, body) = Call::new("GET", &format!("/v1/segments/{segment}/hosts/{host}"))
            .admin()
            .send(&api)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["host"]["name"], "compute-1");
        assert_eq!(body["host"]["type"], "COMPUTE");
        assert_eq!(body["host"]["reserved"], false);
        assert_eq!(body["host"]["failover_segment_id"], segment.as_str());
        assert_eq!(body["host"]["failover_segment"]["name"], "s1");
        assert!(body["host"]["failover_segment"].get("enabled").is_none());
    }

    #[tokio::test]
    async fn test_should_hide_hosts_of_other_segments() {
        let api = api();
        let s1 = create_segment(&api, "s1").await;
        let s2 = create_segment(&api, "s2").await;
        let host = create_host(&api, &s1, "compute-1").await;

        let (status, _, body) = Call::new("GET", &format!("/v1/segments/{s2}/hosts/{host}"))
            .admin()
            .send(&api)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body["itemNotFound"]["message"],
            format!("Host {host} could not be found.")
        );
    }

    #[tokio::test]
    async fn test_should_require_existing_segment() {
        let api = api();
        let (status, _, body) = Call::new("POST", "/v1/segments/missing/hosts")
            .admin()
            .json(json!({"host": {"name": "h1", "type": "COMPUTE", "control_attributes": "SSH"}}))
            .send(&api)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body["itemNotFound"]["message"],
            "Failover segment missing could not be found."
        );
    }

    #[tokio::test]
    async fn test_should_filter_hosts() {
        let api = api();
        let segment = create_segment(&api, "s1").await;
        let h1 = create_host(&api, &segment, "h1").await;
        create_host(&api, &segment, "h2").await;

        let (status, _, _) = Call::new("PUT", &format!("/v1/segments/{segment}/hosts/{h1}"))
            .admin()
            .json(json!({"host": {"on_maintenance": "yes"}}))
            .send(&api)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, _, body) = Call::new("GET", &format!("/v1/segments/{segment}/hosts?on_maintenance=True"))
            .admin()
            .send(&api)
            .await;
        let hosts = body["hosts"].as_array().unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0]["name"], "h1");
        assert_eq!(hosts[0]["on_maintenance"], true);

        let (status, _, _) = Call::new("GET", &format!("/v1/segments/{segment}/hosts?reserved=maybe"))
            .admin()
            .send(&api)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_should_reject_duplicate_host_name() {
        let api = api();
        let segment = create_segment(&api, "s1").await;
        create_host(&api, &segment, "h1").await;
        let (status, _, body) = Call::new("POST", &format!("/v1/segments/{segment}/hosts"))
            .admin()
            .json(json!({"host": {"name": "h1", "type": "COMPUTE", "control_attributes": "SSH"}}))
            .send(&api)
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            body["conflictingRequest"]["message"],
            "Host with name h1 already exists."
        );
    }

    #[tokio::test]
    async fn test_should_delete_host() {
        let api = api();
        let segment = create_segment(&api, "s1").await;
        let host = create_host(&api, &segment, "h1").await;
        let uri = format!("/v1/segments/{segment}/hosts/{host}");

        let (status, _, _) = Call::new("DELETE", &uri).admin().send(&api).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _, _) = Call::new("GET", &uri).admin().send(&api).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
