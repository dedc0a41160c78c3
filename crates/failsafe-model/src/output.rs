//! Response body shapes.
//!
//! Views decide which attributes a client sees for a given microversion;
//! attributes introduced by a later version are left out for older clients.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{Host, Notification, NotificationStatus, NotificationType, RecoveryMethod, Segment};

/// A hypermedia link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

impl Link {
    #[must_use]
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentView {
    pub id: u64,
    pub uuid: String,
    pub name: String,
    pub description: Option<String>,
    pub recovery_method: RecoveryMethod,
    pub service_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SegmentView {
    /// Build a view; `with_enabled` exposes the `enabled` attribute.
    #[must_use]
    pub fn new(segment: &Segment, with_enabled: bool) -> Self {
        Self {
            id: segment.id,
            uuid: segment.uuid.clone(),
            name: segment.name.clone(),
            description: segment.description.clone(),
            recovery_method: segment.recovery_method,
            service_type: segment.service_type.clone(),
            enabled: with_enabled.then_some(segment.enabled),
            created_at: segment.created_at,
            updated_at: segment.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HostView {
    pub id: u64,
    pub uuid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub host_type: String,
    pub control_attributes: String,
    pub reserved: bool,
    pub on_maintenance: bool,
    pub failover_segment_id: String,
    pub failover_segment: SegmentView,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl HostView {
    #[must_use]
    pub fn new(host: &Host, segment: SegmentView) -> Self {
        Self {
            id: host.id,
            uuid: host.uuid.clone(),
            name: host.name.clone(),
            host_type: host.host_type.clone(),
            control_attributes: host.control_attributes.clone(),
            reserved: host.reserved,
            on_maintenance: host.on_maintenance,
            failover_segment_id: host.failover_segment_id.clone(),
            failover_segment: segment,
            created_at: host.created_at,
            updated_at: host.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationView {
    pub id: u64,
    pub notification_uuid: String,
    pub generated_time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub payload: serde_json::Value,
    pub source_host_uuid: String,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_workflow_details: Option<Vec<serde_json::Value>>,
}

impl NotificationView {
    #[must_use]
    pub fn new(notification: &Notification) -> Self {
        Self {
            id: notification.id,
            notification_uuid: notification.notification_uuid.clone(),
            generated_time: notification.generated_time,
            notification_type: notification.notification_type,
            payload: notification.payload.clone(),
            source_host_uuid: notification.source_host_uuid.clone(),
            status: notification.status,
            created_at: notification.created_at,
            updated_at: notification.updated_at,
            recovery_workflow_details: None,
        }
    }

    /// Attach recovery workflow details (exposed from microversion 1.1).
    #[must_use]
    pub fn with_workflow_details(mut self, details: Vec<serde_json::Value>) -> Self {
        self.recovery_workflow_details = Some(details);
        self
    }
}

/// One entry of the API version discovery document.
#[derive(Debug, Clone, Serialize)]
pub struct VersionView {
    pub id: String,
    pub status: String,
    pub version: String,
    pub min_version: String,
    pub updated: String,
    pub links: Vec<Link>,
}

/// One entry of the extension discovery document.
#[derive(Debug, Clone, Serialize)]
pub struct ExtensionView {
    pub name: String,
    pub alias: String,
    pub description: String,
    pub updated: String,
    pub links: Vec<Link>,
}
