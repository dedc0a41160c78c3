//! Microversioned HTTP dispatch engine for Failsafe.
//!
//! This crate turns raw HTTP requests into calls on versioned action
//! handlers, providing:
//!
//! - **Router**: Maps `/v1/...` paths to resources and route targets
//! - **Microversions**: Parses the version header and checks it against the
//!   supported window
//! - **Registries**: Per-action handlers keyed by non-overlapping version
//!   ranges
//! - **Extensions**: Pluggable resources, action endpoints and hooks
//! - **Schema**: JSON body validation with client-facing messages
//! - **Negotiation**: Request/response media types and languages
//! - **Service**: Hyper `Service` implementation driving the dispatcher
#![allow(missing_docs)]

pub mod body;
pub mod dispatch;
pub mod extension;
pub mod fault;
pub mod hooks;
pub mod microversion;
pub mod negotiation;
pub mod pagination;
pub mod registry;
pub mod request;
pub mod response;
pub mod router;
pub mod schema;
pub mod service;

pub use body::FailsafeResponseBody;
pub use dispatch::{Dispatcher, DispatcherConfig, DispatcherError};
pub use extension::{ControllerExtension, Extension, ExtensionError, ExtensionRegistry, ResourceBinding};
pub use fault::{MessageCatalog, StaticCatalog};
pub use hooks::ActionHook;
pub use pagination::{PageParams, SortDir, sort_params};
pub use registry::{RegistryError, VersionRange, VersionedMethodRegistry};
pub use request::{ActionBinding, ActionOutcome, ApiRequest, ApiResponse, RequestCache};
pub use schema::{Schema, SchemaViolation, StringFormat};
pub use service::FailsafeHttpService;
