//! Failover segments: `/v1/segments`.

use std::sync::Arc;

use failsafe_http::router::ID_PARAM;
use failsafe_http::{ActionOutcome, ApiRequest, Extension, RegistryError, ResourceBinding, VersionRange};
use failsafe_model::input::{CreateSegmentRequest, UpdateSegmentRequest};
use failsafe_model::output::SegmentView;
use failsafe_model::{ApiError, RecoveryMethod, Segment};
use serde_json::json;
use tracing::info;

use super::{UPDATED, V1_0, V1_1, V1_2, authorize, bind, collection, paging, query_bool, query_enum, to_json};
use crate::context::HaContext;
use crate::schemas;
use crate::storage::SegmentFilters;

pub const ALIAS: &str = "segments";

const SORT_KEYS: &[&str] = &[
    "created_at",
    "description",
    "id",
    "name",
    "recovery_method",
    "service_type",
    "updated_at",
    "uuid",
];

#[derive(Debug)]
pub struct SegmentsExtension {
    ctx: Arc<HaContext>,
}

impl SegmentsExtension {
    #[must_use]
    pub fn new(ctx: Arc<HaContext>) -> Self {
        Self { ctx }
    }
}

impl Extension for SegmentsExtension {
    fn name(&self) -> &str {
        "Segments"
    }

    fn alias(&self) -> &str {
        ALIAS
    }

    fn updated(&self) -> &str {
        UPDATED
    }

    fn description(&self) -> &str {
        "Failover segment support."
    }

    fn resources(&self) -> Result<Vec<ResourceBinding>, RegistryError> {
        let ctx = &self.ctx;
        let before_enabled = VersionRange::between(V1_0, V1_1);
        let with_enabled = VersionRange::starting_at(V1_2);
        let created = http::StatusCode::CREATED;

        Ok(vec![
            ResourceBinding::new("segments", "segment")
                .action("index", VersionRange::ALL, bind(ctx, index))?
                .action("show", VersionRange::ALL, bind(ctx, show))?
                .action(
                    "create",
                    before_enabled,
                    bind(ctx, create)
                        .with_schema(schemas::create_segment(false))
                        .with_status(created),
                )?
                .action(
                    "create",
                    with_enabled,
                    bind(ctx, create)
                        .with_schema(schemas::create_segment(true))
                        .with_status(created),
                )?
                .action(
                    "update",
                    before_enabled,
                    bind(ctx, update).with_schema(schemas::update_segment(false)),
                )?
                .action(
                    "update",
                    with_enabled,
                    bind(ctx, update).with_schema(schemas::update_segment(true)),
                )?
                .action(
                    "delete",
                    VersionRange::ALL,
                    bind(ctx, delete).with_status(http::StatusCode::NO_CONTENT),
                )?,
        ])
    }
}

/// The segment as rendered at the request's version.
pub(crate) fn segment_json(request: &ApiRequest, segment: &Segment) -> Result<serde_json::Value, ApiError> {
    to_json(&SegmentView::new(segment, request.is_at_least(V1_2)))
}

fn index(ctx: &HaContext, request: &mut ApiRequest) -> Result<ActionOutcome, ApiError> {
    authorize(ctx, request, ALIAS, "index")?;

    let filters = SegmentFilters {
        recovery_method: query_enum(request, "recovery_method", RecoveryMethod::from_name)?,
        service_type: request.query_param("service_type").map(ToOwned::to_owned),
        enabled: if request.is_at_least(V1_2) {
            query_bool(request, "enabled")?
        } else {
            None
        },
    };
    let (params, page) = paging(ctx, request, SORT_KEYS, "created_at")?;
    let segments = ctx.segments.get_all(&filters, &page)?;

    let next = params.next_link(
        request,
        segments.len(),
        segments.last().map(|s| s.uuid.as_str()),
    );
    let items = segments
        .iter()
        .map(|s| segment_json(request, s))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(collection("segments", items, next)?.into())
}

fn show(ctx: &HaContext, request: &mut ApiRequest) -> Result<ActionOutcome, ApiError> {
    authorize(ctx, request, ALIAS, "show")?;
    let segment = ctx.segments.get_by_uuid(request.param(ID_PARAM)?)?;
    Ok(json!({"segment": segment_json(request, &segment)?}).into())
}

fn create(ctx: &HaContext, request: &mut ApiRequest) -> Result<ActionOutcome, ApiError> {
    authorize(ctx, request, ALIAS, "create")?;
    let input: CreateSegmentRequest = request.body_as()?;
    let segment = ctx.segments.create(input.segment)?;
    info!(uuid = %segment.uuid, name = %segment.name, "created failover segment");
    Ok(json!({"segment": segment_json(request, &segment)?}).into())
}

fn update(ctx: &HaContext, request: &mut ApiRequest) -> Result<ActionOutcome, ApiError> {
    authorize(ctx, request, ALIAS, "update")?;
    let input: UpdateSegmentRequest = request.body_as()?;
    let segment = ctx.segments.update(request.param(ID_PARAM)?, input.segment)?;
    Ok(json!({"segment": segment_json(request, &segment)?}).into())
}

fn delete(ctx: &HaContext, request: &mut ApiRequest) -> Result<ActionOutcome, ApiError> {
    authorize(ctx, request, ALIAS, "delete")?;
    let uuid = request.param(ID_PARAM)?;
    ctx.segments.destroy(uuid)?;
    info!(uuid, "deleted failover segment");
    Ok(ActionOutcome::Empty)
}
