//! Fault envelope.
//!
//! Every error reaching a client is rendered as
//! `{"<faultName>": {"code": <status>, "message": "..."[, "retryAfter": "..."]}}`
//! where the fault name is fixed per status code.

use std::collections::HashMap;

use failsafe_model::ApiError;
use serde_json::{Value, json};

/// Fault name used for statuses without a dedicated one.
pub const DEFAULT_FAULT_NAME: &str = "failsafeFault";

/// Fixed fault name for an HTTP status.
#[must_use]
pub fn fault_name(status: http::StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "badRequest",
        401 => "unauthorized",
        403 => "forbidden",
        404 => "itemNotFound",
        405 => "badMethod",
        406 => "notAcceptable",
        409 => "conflictingRequest",
        413 | 429 => "overLimit",
        415 => "badMediaType",
        501 => "notImplemented",
        503 => "serviceUnavailable",
        _ => DEFAULT_FAULT_NAME,
    }
}

/// Translates client messages into a negotiated language.
pub trait MessageCatalog: Send + Sync {
    /// The translation of `message` into `language`, if one is known.
    fn translate(&self, message: &str, language: &str) -> Option<String>;
}

/// An in-memory catalog: language → (message → translation).
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: HashMap<String, HashMap<String, String>>,
}

impl StaticCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_entry(
        mut self,
        language: impl Into<String>,
        message: impl Into<String>,
        translation: impl Into<String>,
    ) -> Self {
        self.entries
            .entry(language.into())
            .or_default()
            .insert(message.into(), translation.into());
        self
    }
}

impl MessageCatalog for StaticCatalog {
    fn translate(&self, message: &str, language: &str) -> Option<String> {
        self.entries.get(language)?.get(message).cloned()
    }
}

/// A client-facing fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub status: http::StatusCode,
    pub name: &'static str,
    pub message: String,
    pub retry_after: Option<String>,
}

impl Fault {
    /// Build the fault for `error`, translating its message when possible.
    #[must_use]
    pub fn from_error(
        error: &ApiError,
        language: Option<&str>,
        catalog: Option<&dyn MessageCatalog>,
    ) -> Self {
        let message = error.client_message();
        let message = language
            .zip(catalog)
            .and_then(|(lang, catalog)| catalog.translate(message, lang))
            .unwrap_or_else(|| message.to_owned());

        let retry_after = match error.status_code.as_u16() {
            413 | 429 => error.retry_after.clone(),
            _ => None,
        };

        Self {
            status: error.status_code,
            name: fault_name(error.status_code),
            message,
            retry_after,
        }
    }

    /// The JSON envelope.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut inner = json!({
            "code": self.status.as_u16(),
            "message": self.message,
        });
        if let (Some(retry_after), Some(map)) = (&self.retry_after, inner.as_object_mut()) {
            map.insert("retryAfter".to_owned(), Value::String(retry_after.clone()));
        }
        let mut envelope = serde_json::Map::new();
        envelope.insert(self.name.to_owned(), inner);
        Value::Object(envelope)
    }
}
