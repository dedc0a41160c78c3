//! Shared collaborators of the API controllers.

use std::sync::Arc;

use failsafe_core::FailsafeConfig;

use crate::notifier::Notifier;
use crate::policy::{Policy, RolePolicy};
use crate::storage::{
    HostRepository, MemoryDatabase, MemoryHosts, MemoryNotifications, MemorySegments,
    NotificationRepository, SegmentRepository,
};

/// Everything a controller needs besides the request.
pub struct HaContext {
    pub config: FailsafeConfig,
    pub segments: Arc<SegmentRepository>,
    pub hosts: Arc<HostRepository>,
    pub notifications: Arc<NotificationRepository>,
    pub policy: Arc<dyn Policy>,
    pub notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for HaContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HaContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HaContext {
    /// A context backed by the in-memory repositories and the role policy.
    #[must_use]
    pub fn in_memory(config: FailsafeConfig, notifier: Arc<dyn Notifier>) -> Self {
        let db = MemoryDatabase::new();
        Self {
            config,
            segments: Arc::new(MemorySegments::new(Arc::clone(&db))),
            hosts: Arc::new(MemoryHosts::new(Arc::clone(&db))),
            notifications: Arc::new(MemoryNotifications::new(db)),
            policy: Arc::new(RolePolicy::new()),
            notifier,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn Policy>) -> Self {
        self.policy = policy;
        self
    }
}
