//! Instance-HA API for Failsafe.
//!
//! Failover segments, the hosts registered in them, and the failure
//! notifications monitors report about those hosts, served through the
//! `failsafe-http` dispatch engine as a set of extensions.
#![allow(missing_docs, clippy::module_name_repetitions)]

pub mod context;
pub mod error;
pub mod loader;
pub mod notifier;
pub mod policy;
pub mod resources;
pub mod schemas;
pub mod storage;

pub use context::HaContext;
pub use error::RepositoryError;
pub use loader::{build_dispatcher, load_extensions};
pub use notifier::{ChannelNotifier, Notifier};
pub use policy::{Policy, PolicyRule, RolePolicy};
