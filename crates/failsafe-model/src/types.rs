//! Failover segment, host, and notification domain types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How hosts of a segment are recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryMethod {
    Auto,
    ReservedHost,
    AutoPriority,
    RhPriority,
}

impl RecoveryMethod {
    pub const ALL: [Self; 4] = [
        Self::Auto,
        Self::ReservedHost,
        Self::AutoPriority,
        Self::RhPriority,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::ReservedHost => "reserved_host",
            Self::AutoPriority => "auto_priority",
            Self::RhPriority => "rh_priority",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }
}

impl fmt::Display for RecoveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of failure a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationType {
    #[serde(rename = "COMPUTE_HOST")]
    ComputeHost,
    #[serde(rename = "VM")]
    Vm,
    #[serde(rename = "PROCESS")]
    Process,
}

impl NotificationType {
    pub const ALL: [Self; 3] = [Self::ComputeHost, Self::Vm, Self::Process];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ComputeHost => "COMPUTE_HOST",
            Self::Vm => "VM",
            Self::Process => "PROCESS",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing state of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    New,
    Running,
    Error,
    Failed,
    Ignored,
    Finished,
}

impl NotificationStatus {
    pub const ALL: [Self; 6] = [
        Self::New,
        Self::Running,
        Self::Error,
        Self::Failed,
        Self::Ignored,
        Self::Finished,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Running => "running",
            Self::Error => "error",
            Self::Failed => "failed",
            Self::Ignored => "ignored",
            Self::Finished => "finished",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failover segment: hosts sharing one recovery policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: u64,
    pub uuid: String,
    pub name: String,
    pub description: Option<String>,
    pub recovery_method: RecoveryMethod,
    pub service_type: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A host registered in a failover segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub id: u64,
    pub uuid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub host_type: String,
    pub control_attributes: String,
    pub reserved: bool,
    pub on_maintenance: bool,
    pub failover_segment_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A failure event reported by a monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
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
}
