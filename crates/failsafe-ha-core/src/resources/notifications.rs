//! Failure notifications: `/v1/notifications`.
//!
//! A notification is accepted only for a known host that is not on
//! maintenance, and only once per detection interval for the same host,
//! type and payload. Accepted notifications are handed to the notifier.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use failsafe_http::router::ID_PARAM;
use failsafe_http::{ActionOutcome, ApiRequest, Extension, RegistryError, ResourceBinding, VersionRange};
use failsafe_model::input::{CreateNotificationRequest, NotificationCreate};
use failsafe_model::output::NotificationView;
use failsafe_model::{ApiError, Host, NotificationStatus, NotificationType, api_error};
use serde_json::json;
use tracing::{info, warn};

use super::{UPDATED, V1_0, V1_1, authorize, bind, collection, paging, query_enum, to_json};
use crate::context::HaContext;
use crate::schemas;
use crate::storage::{HostFilters, NewNotification, NotificationFilters, Page};

pub const ALIAS: &str = "notifications";

const SORT_KEYS: &[&str] = &[
    "created_at",
    "generated_time",
    "type",
    "status",
    "source_host_uuid",
];

#[derive(Debug)]
pub struct NotificationsExtension {
    ctx: Arc<HaContext>,
}

impl NotificationsExtension {
    #[must_use]
    pub fn new(ctx: Arc<HaContext>) -> Self {
        Self { ctx }
    }
}

impl Extension for NotificationsExtension {
    fn name(&self) -> &str {
        "Notifications"
    }

    fn alias(&self) -> &str {
        ALIAS
    }

    fn updated(&self) -> &str {
        UPDATED
    }

    fn description(&self) -> &str {
        "Host and instance failure notifications."
    }

    fn resources(&self) -> Result<Vec<ResourceBinding>, RegistryError> {
        let ctx = &self.ctx;
        Ok(vec![
            ResourceBinding::new("notifications", "notification")
                .action("index", VersionRange::ALL, bind(ctx, index))?
                .action("show", VersionRange::between(V1_0, V1_0), bind(ctx, show))?
                .action("show", VersionRange::starting_at(V1_1), bind(ctx, show_with_details))?
                .action(
                    "create",
                    VersionRange::ALL,
                    bind(ctx, create)
                        .with_schema(schemas::create_notification())
                        .with_status(http::StatusCode::ACCEPTED),
                )?,
        ])
    }
}

fn generated_since(request: &ApiRequest) -> Result<Option<DateTime<Utc>>, ApiError> {
    request
        .query_param("generated-since")
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|_| ApiError::invalid(format!("Invalid value for generated-since filter: {raw}")))
        })
        .transpose()
}

fn index(ctx: &HaContext, request: &mut ApiRequest) -> Result<ActionOutcome, ApiError> {
    authorize(ctx, request, ALIAS, "index")?;

    let filters = NotificationFilters {
        source_host_uuid: request.query_param("source_host_uuid").map(ToOwned::to_owned),
        notification_type: query_enum(request, "type", NotificationType::from_name)?,
        status: query_enum(request, "status", NotificationStatus::from_name)?,
        generated_since: generated_since(request)?,
    };
    let (params, page) = paging(ctx, request, SORT_KEYS, "generated_time")?;
    let notifications = ctx.notifications.get_all(&filters, &page)?;

    let next = params.next_link(
        request,
        notifications.len(),
        notifications.last().map(|n| n.notification_uuid.as_str()),
    );
    let items = notifications
        .iter()
        .map(|n| to_json(&NotificationView::new(n)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(collection("notifications", items, next)?.into())
}

fn show(ctx: &HaContext, request: &mut ApiRequest) -> Result<ActionOutcome, ApiError> {
    authorize(ctx, request, ALIAS, "show")?;
    let notification = ctx.notifications.get_by_uuid(request.param(ID_PARAM)?)?;
    Ok(json!({"notification": to_json(&NotificationView::new(&notification))?}).into())
}

/// Recovery runs outside this service, so the workflow details are empty.
fn show_with_details(ctx: &HaContext, request: &mut ApiRequest) -> Result<ActionOutcome, ApiError> {
    authorize(ctx, request, ALIAS, "show")?;
    let notification = ctx.notifications.get_by_uuid(request.param(ID_PARAM)?)?;
    let view = NotificationView::new(&notification).with_workflow_details(Vec::new());
    Ok(json!({"notification": to_json(&view)?}).into())
}

fn find_host(ctx: &HaContext, hostname: &str) -> Result<Host, ApiError> {
    let filters = HostFilters {
        name: Some(hostname.to_owned()),
        ..HostFilters::default()
    };
    ctx.hosts
        .get_all(&filters, &Page::all())?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found(format!("Host with name {hostname} could not be found.")))
}

/// Whether the same failure was already reported within the detection
/// interval before `input.generated_time`.
fn is_duplicate(ctx: &HaContext, host: &Host, input: &NotificationCreate) -> Result<bool, ApiError> {
    let interval = i64::try_from(ctx.config.duplicate_notification_detection_interval)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX);
    let since = input
        .generated_time
        .checked_sub_signed(interval)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let filters = NotificationFilters {
        source_host_uuid: Some(host.uuid.clone()),
        notification_type: Some(input.notification_type),
        status: None,
        generated_since: Some(since),
    };
    Ok(ctx
        .notifications
        .get_all(&filters, &Page::all())?
        .iter()
        .any(|n| n.payload == input.payload))
}

fn create(ctx: &HaContext, request: &mut ApiRequest) -> Result<ActionOutcome, ApiError> {
    authorize(ctx, request, ALIAS, "create")?;
    let CreateNotificationRequest { notification: input } = request.body_as()?;

    let host = find_host(ctx, &input.hostname)?;
    if host.on_maintenance {
        return Err(api_error!(Conflict, format!("Host '{}' is on maintenance.", host.name)));
    }
    if is_duplicate(ctx, &host, &input)? {
        return Err(api_error!(
            Conflict,
            format!(
                "Notification received from host {} of type '{}' is duplicate.",
                input.hostname,
                input.notification_type.as_str()
            )
        ));
    }

    let notification = ctx.notifications.create(NewNotification {
        notification_type: input.notification_type,
        generated_time: input.generated_time,
        payload: input.payload,
        source_host_uuid: host.uuid,
    })?;
    info!(
        uuid = %notification.notification_uuid,
        kind = notification.notification_type.as_str(),
        host = %input.hostname,
        "accepted notification"
    );
    if let Err(err) = ctx.notifier.notify(&notification) {
        warn!(uuid = %notification.notification_uuid, error = %err, "failed to hand notification to recovery");
    }

    Ok(json!({"notification": to_json(&NotificationView::new(&notification))?}).into())
}
