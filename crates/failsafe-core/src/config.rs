//! Configuration management for Failsafe services.
//!
//! All configuration is driven by environment variables. Every field has a
//! default so the server starts with no environment at all.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{FailsafeError, FailsafeResult};

/// Global configuration for the Failsafe API server.
///
/// # Examples
///
/// ```
/// use failsafe_core::FailsafeConfig;
///
/// let config = FailsafeConfig::builder().api_max_limit(50).build();
/// assert_eq!(config.api_max_limit, 50);
/// assert_eq!(config.api_default_version, "1.0");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct FailsafeConfig {
    /// Bind address for the API listener.
    #[builder(default = String::from("0.0.0.0:15868"))]
    pub gateway_listen: String,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Oldest microversion the API still serves.
    #[builder(default = String::from("1.0"))]
    pub api_min_version: String,

    /// Microversion assumed when a request carries no version header.
    #[builder(default = String::from("1.0"))]
    pub api_default_version: String,

    /// Upper bound applied to the `limit` query parameter of list calls.
    #[builder(default = 1000)]
    pub api_max_limit: usize,

    /// Name of the request/response header carrying the microversion.
    #[builder(default = String::from("OpenStack-API-Version"))]
    pub api_version_header: String,

    /// Service token expected before the version in the version header.
    #[builder(default = String::from("instance-ha"))]
    pub api_service_name: String,

    /// Primary vendor media type served alongside `application/json`.
    #[builder(default = String::from("application/vnd.failsafe+json"))]
    pub api_primary_media_type: String,

    /// Languages fault messages can be translated into.
    #[builder(default = vec![String::from("en")])]
    pub available_languages: Vec<String>,

    /// Base URL used when building self and pagination links.
    #[builder(default)]
    pub public_endpoint: Option<String>,

    /// Window (seconds) in which an identical notification is rejected.
    #[builder(default = 180)]
    pub duplicate_notification_detection_interval: u64,

    /// Extension aliases that must not be loaded.
    #[builder(default)]
    pub disabled_extensions: Vec<String>,
}

impl Default for FailsafeConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl FailsafeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> FailsafeResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Unset keys keep their defaults; numeric keys that fail to parse are
    /// rejected rather than silently ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> FailsafeResult<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = lookup("API_MIN_VERSION") {
            config.api_min_version = v;
        }
        if let Some(v) = lookup("API_DEFAULT_VERSION") {
            config.api_default_version = v;
        }
        if let Some(v) = lookup("API_MAX_LIMIT") {
            config.api_max_limit = v.trim().parse().map_err(|_| FailsafeError::InvalidConfig {
                key: "API_MAX_LIMIT",
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup("API_VERSION_HEADER") {
            config.api_version_header = v;
        }
        if let Some(v) = lookup("API_SERVICE_NAME") {
            config.api_service_name = v;
        }
        if let Some(v) = lookup("API_PRIMARY_MEDIA_TYPE") {
            config.api_primary_media_type = v;
        }
        if let Some(v) = lookup("AVAILABLE_LANGUAGES") {
            config.available_languages = split_list(&v);
        }
        if let Some(v) = lookup("PUBLIC_ENDPOINT") {
            let v = v.trim().trim_end_matches('/').to_owned();
            config.public_endpoint = (!v.is_empty()).then_some(v);
        }
        if let Some(v) = lookup("DUPLICATE_NOTIFICATION_DETECTION_INTERVAL") {
            config.duplicate_notification_detection_interval =
                v.trim().parse().map_err(|_| FailsafeError::InvalidConfig {
                    key: "DUPLICATE_NOTIFICATION_DETECTION_INTERVAL",
                    value: v.clone(),
                })?;
        }
        if let Some(v) = lookup("DISABLED_EXTENSIONS") {
            config.disabled_extensions = split_list(&v);
        }

        Ok(config)
    }
}

/// Split a comma-separated list, dropping blanks.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
