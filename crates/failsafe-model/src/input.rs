//! Request body shapes.
//!
//! Bodies are validated against a version-specific schema before they are
//! deserialized into these types, so deserialization failures here indicate a
//! schema/type mismatch rather than bad client input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::types::{NotificationType, RecoveryMethod};

/// String and integer tokens accepted as boolean `true`.
pub const BOOL_TRUE_TOKENS: [&str; 10] = [
    "True", "TRUE", "true", "1", "ON", "On", "on", "YES", "Yes", "yes",
];

/// String and integer tokens accepted as boolean `false`.
pub const BOOL_FALSE_TOKENS: [&str; 10] = [
    "False", "FALSE", "false", "0", "OFF", "Off", "off", "NO", "No", "no",
];

/// Interpret a JSON value as a boolean using the closed token set.
///
/// Real booleans are taken as-is, strings must be one of the listed tokens
/// verbatim, and the integers `1`/`0` map like their string forms. Everything
/// else is `None`.
#[must_use]
pub fn coerce_bool(value: &serde_json::Value) -> Option<bool> {
    match value {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::String(s) => coerce_bool_str(s),
        serde_json::Value::Number(n) => match n.as_u64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Interpret a raw string (e.g. a query parameter) with the closed token set.
#[must_use]
pub fn coerce_bool_str(raw: &str) -> Option<bool> {
    if BOOL_TRUE_TOKENS.contains(&raw) {
        Some(true)
    } else if BOOL_FALSE_TOKENS.contains(&raw) {
        Some(false)
    } else {
        None
    }
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => coerce_bool(&v)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("{v} is not a boolean token"))),
    }
}

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSegmentRequest {
    pub segment: SegmentCreate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentCreate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub recovery_method: RecoveryMethod,
    pub service_type: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateSegmentRequest {
    pub segment: SegmentUpdate,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SegmentUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub recovery_method: Option<RecoveryMethod>,
    #[serde(default)]
    pub service_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateHostRequest {
    pub host: HostCreate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostCreate {
    pub name: String,
    #[serde(rename = "type")]
    pub host_type: String,
    pub control_attributes: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub reserved: Option<bool>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub on_maintenance: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateHostRequest {
    pub host: HostUpdate,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub host_type: Option<String>,
    #[serde(default)]
    pub control_attributes: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub reserved: Option<bool>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub on_maintenance: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateNotificationRequest {
    pub notification: NotificationCreate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationCreate {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub hostname: String,
    pub generated_time: DateTime<Utc>,
    pub payload: serde_json::Value,
}
