//! Model types for the Failsafe instance-HA API.
//!
//! This crate holds everything that is shared between the HTTP engine and the
//! API resources without depending on either: the microversion token, the
//! wire error codes, and the segment/host/notification domain types with
//! their request and response shapes.
#![allow(clippy::module_name_repetitions)]
#![allow(missing_docs)]

pub mod error;
pub mod input;
pub mod output;
pub mod types;
pub mod version;

pub use error::{ApiError, ApiErrorCode};
pub use types::{Host, Notification, NotificationStatus, NotificationType, RecoveryMethod, Segment};
pub use version::{ApiVersion, VersionError, VersionToken, VersionWindow};
