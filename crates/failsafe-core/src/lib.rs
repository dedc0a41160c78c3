//! Core configuration, error types, and shared identity types for Failsafe.
//!
//! This crate provides the building blocks shared by the model, HTTP engine,
//! and HA API crates: environment-driven configuration and the caller
//! identity that the fronting authentication layer attaches to each request.

mod config;
mod error;
mod types;

pub use config::FailsafeConfig;
pub use error::{FailsafeError, FailsafeResult};
pub use types::{CallerContext, ProjectId};
