//! Caller identity types shared across crates.

use std::fmt;

/// Project (tenant) identifier of an API caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ProjectId(String);

impl ProjectId {
    /// Create a project ID from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the project ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of the authenticated caller, as asserted by the fronting
/// authentication layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerContext {
    /// User identifier, if known.
    pub user_id: Option<String>,
    /// Project the caller is scoped to, if any.
    pub project_id: Option<ProjectId>,
    /// Role names granted to the caller (lowercased).
    pub roles: Vec<String>,
}

impl CallerContext {
    /// Role name granting administrative access.
    pub const ADMIN_ROLE: &str = "admin";

    /// Build a caller context from raw header values.
    ///
    /// `roles` is a comma-separated list; blank entries are dropped.
    #[must_use]
    pub fn from_parts(user_id: Option<&str>, project_id: Option<&str>, roles: Option<&str>) -> Self {
        let non_empty = |v: Option<&str>| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
        };
        Self {
            user_id: non_empty(user_id),
            project_id: non_empty(project_id).map(ProjectId),
            roles: roles
                .unwrap_or_default()
                .split(',')
                .map(|r| r.trim().to_ascii_lowercase())
                .filter(|r| !r.is_empty())
                .collect(),
        }
    }

    /// Whether the caller holds the given role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    /// Whether the caller holds the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.has_role(Self::ADMIN_ROLE)
    }
}
