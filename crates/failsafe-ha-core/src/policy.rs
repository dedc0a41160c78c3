//! Access policy for API actions.
//!
//! Actions are named `failsafe_api:{resource}:{action}`. The default
//! [`RolePolicy`] lets admins do everything, lets every caller discover
//! extensions, and can be overridden per action.

use std::collections::HashMap;

use failsafe_core::CallerContext;
use failsafe_model::ApiError;
use tracing::debug;

/// Prefix of every policy action name.
pub const POLICY_ROOT: &str = "failsafe_api";

/// Suffix of the actions that decide whether an extension is listed.
pub const DISCOVERABLE: &str = "discoverable";

/// Policy action name for `action` on `resource`.
#[must_use]
pub fn policy_action(resource: &str, action: &str) -> String {
    format!("{POLICY_ROOT}:{resource}:{action}")
}

/// Decides whether a caller may perform an action.
pub trait Policy: Send + Sync {
    fn can(&self, caller: &CallerContext, action: &str) -> bool;

    /// Like [`Policy::can`], but fails with `PolicyNotAuthorized`.
    fn authorize(&self, caller: &CallerContext, action: &str) -> Result<(), ApiError> {
        if self.can(caller, action) {
            Ok(())
        } else {
            debug!(action, user = ?caller.user_id, "policy denied action");
            Err(ApiError::policy_not_authorized(action))
        }
    }
}

/// Who may perform an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyRule {
    /// Any caller.
    Anyone,
    /// Callers holding the admin role.
    AdminOnly,
    /// Nobody.
    Deny,
}

impl PolicyRule {
    fn allows(self, caller: &CallerContext) -> bool {
        match self {
            Self::Anyone => true,
            Self::AdminOnly => caller.is_admin(),
            Self::Deny => false,
        }
    }
}

/// Role based policy with per-action overrides.
#[derive(Debug, Clone, Default)]
pub struct RolePolicy {
    overrides: HashMap<String, PolicyRule>,
}

impl RolePolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_rule(mut self, action: impl Into<String>, rule: PolicyRule) -> Self {
        self.overrides.insert(action.into(), rule);
        self
    }

    fn default_rule(action: &str) -> PolicyRule {
        if action.ends_with(&format!(":{DISCOVERABLE}")) {
            PolicyRule::Anyone
        } else {
            PolicyRule::AdminOnly
        }
    }
}

impl Policy for RolePolicy {
    fn can(&self, caller: &CallerContext, action: &str) -> bool {
        self.overrides
            .get(action)
            .copied()
            .unwrap_or_else(|| Self::default_rule(action))
            .allows(caller)
    }
}
