//! Pluggable API extensions.
//!
//! An [`Extension`] contributes whole resources ([`ResourceBinding`]) and/or
//! additions to existing ones ([`ControllerExtension`]): extra action-endpoint
//! actions and hooks around standard actions. The [`ExtensionRegistry`] is
//! filled once at startup and only read afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::hooks::ActionHook;
use crate::registry::{RegistryError, VersionRange, VersionedMethodRegistry};
use crate::request::ActionBinding;

/// Errors raised while loading extensions.
#[derive(Debug, thiserror::Error)]
pub enum ExtensionError {
    #[error("Found duplicate extension: {0}")]
    DuplicateAlias(String),

    #[error("Found duplicate resource: {0}")]
    DuplicateResource(String),

    #[error("Resource {resource} names unknown parent {parent}")]
    UnknownParent { resource: String, parent: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Parent of a nested collection, e.g. hosts under `segments/{segment_id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentBinding {
    pub collection: String,
    /// Path parameter holding the parent id.
    pub param: String,
}

/// A resource served by the API.
#[derive(Debug, Clone)]
pub struct ResourceBinding {
    pub collection: String,
    pub member_name: String,
    pub parent: Option<ParentBinding>,
    /// Resource whose controller extensions also apply to this one.
    pub inherits: Option<String>,
    /// `false` for resources answered without version negotiation.
    pub versioned: bool,
    /// Served at the API root (`/` and `/v1`) instead of under a collection.
    pub root: bool,
    pub actions: VersionedMethodRegistry<ActionBinding>,
}

impl ResourceBinding {
    #[must_use]
    pub fn new(collection: impl Into<String>, member_name: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            member_name: member_name.into(),
            parent: None,
            inherits: None,
            versioned: true,
            root: false,
            actions: VersionedMethodRegistry::new(),
        }
    }

    /// The unversioned version-discovery resource at the API root.
    #[must_use]
    pub fn root(collection: impl Into<String>, member_name: impl Into<String>) -> Self {
        Self {
            versioned: false,
            root: true,
            ..Self::new(collection, member_name)
        }
    }

    #[must_use]
    pub fn with_parent(mut self, collection: impl Into<String>, param: impl Into<String>) -> Self {
        self.parent = Some(ParentBinding {
            collection: collection.into(),
            param: param.into(),
        });
        self
    }

    #[must_use]
    pub fn inherits(mut self, resource: impl Into<String>) -> Self {
        self.inherits = Some(resource.into());
        self
    }

    /// Register a standard action (`index`, `show`, `create`, ...).
    pub fn action(
        mut self,
        name: &str,
        range: VersionRange,
        binding: ActionBinding,
    ) -> Result<Self, RegistryError> {
        self.actions.register(name, range, binding)?;
        Ok(self)
    }
}

/// Additions an extension makes to an existing resource.
#[derive(Debug, Clone)]
pub struct ControllerExtension {
    pub resource: String,
    /// Action-endpoint actions (`POST {member}/action` with `{name: ...}`).
    pub actions: VersionedMethodRegistry<ActionBinding>,
    /// Hooks keyed by the action they wrap.
    pub hooks: VersionedMethodRegistry<Arc<dyn ActionHook>>,
}

impl ControllerExtension {
    #[must_use]
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            actions: VersionedMethodRegistry::new(),
            hooks: VersionedMethodRegistry::new(),
        }
    }

    pub fn action(
        mut self,
        name: &str,
        range: VersionRange,
        binding: ActionBinding,
    ) -> Result<Self, RegistryError> {
        self.actions.register(name, range, binding)?;
        Ok(self)
    }

    pub fn hook(
        mut self,
        action: &str,
        range: VersionRange,
        hook: Arc<dyn ActionHook>,
    ) -> Result<Self, RegistryError> {
        self.hooks.register(action, range, hook)?;
        Ok(self)
    }
}

/// A loadable API extension.
pub trait Extension: Send + Sync {
    fn name(&self) -> &str;

    /// Unique short name, used as the registry key.
    fn alias(&self) -> &str;

    /// Date of the last change, e.g. `"2024-03-01T00:00:00Z"`.
    fn updated(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Whether the extension is complete enough to be loaded.
    fn is_valid(&self) -> bool {
        !self.name().is_empty() && !self.alias().is_empty()
    }

    fn resources(&self) -> Result<Vec<ResourceBinding>, RegistryError> {
        Ok(Vec::new())
    }

    fn controller_extensions(&self) -> Result<Vec<ControllerExtension>, RegistryError> {
        Ok(Vec::new())
    }
}

/// Loaded extensions keyed by alias.
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: BTreeMap<String, Arc<dyn Extension>>,
    order: Vec<String>,
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("aliases", &self.extensions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ExtensionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extension.
    ///
    /// Invalid extensions are skipped with a warning and yield `Ok(false)`;
    /// an alias that is already registered is an error.
    pub fn register(&mut self, extension: Arc<dyn Extension>) -> Result<bool, ExtensionError> {
        if !extension.is_valid() {
            warn!(name = extension.name(), "skipping invalid extension");
            return Ok(false);
        }

        let alias = extension.alias().to_owned();
        if self.extensions.contains_key(&alias) {
            return Err(ExtensionError::DuplicateAlias(alias));
        }

        info!(alias = %alias, name = extension.name(), "loaded extension");
        self.order.push(alias.clone());
        self.extensions.insert(alias, extension);
        Ok(true)
    }

    /// Extensions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Extension>> {
        self.order.iter().filter_map(|alias| self.extensions.get(alias))
    }

    #[must_use]
    pub fn get_extensions(&self) -> &BTreeMap<String, Arc<dyn Extension>> {
        &self.extensions
    }

    #[must_use]
    pub fn get(&self, alias: &str) -> Option<&Arc<dyn Extension>> {
        self.extensions.get(alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named {
        name: &'static str,
        alias: &'static str,
    }

    impl Extension for Named {
        fn name(&self) -> &str {
            self.name
        }

        fn alias(&self) -> &str {
            self.alias
        }

        fn updated(&self) -> &str {
            "2024-01-01T00:00:00Z"
        }
    }

    fn ext(name: &'static str, alias: &'static str) -> Arc<dyn Extension> {
        Arc::new(Named { name, alias })
    }

    #[test]
    fn test_should_register_valid_extension() {
        let mut registry = ExtensionRegistry::new();
        assert!(registry.register(ext("Segments", "segments")).unwrap());
        assert!(registry.get("segments").is_some());
    }

    #[test]
    fn test_should_iterate_in_registration_order() {
        let mut registry = ExtensionRegistry::new();
        registry.register(ext("Zeta", "zeta")).unwrap();
        registry.register(ext("Alpha", "alpha")).unwrap();
        let aliases: Vec<&str> = registry.iter().map(|e| e.alias()).collect();
        assert_eq!(aliases, ["zeta", "alpha"]);
        let sorted: Vec<&String> = registry.get_extensions().keys().collect();
        assert_eq!(sorted, ["alpha", "zeta"]);
    }

    #[test]
    fn test_should_skip_invalid_extension() {
        let mut registry = ExtensionRegistry::new();
        assert!(!registry.register(ext("", "broken")).unwrap());
        assert!(registry.get_extensions().is_empty());
    }

    #[test]
    fn test_should_reject_duplicate_alias() {
        let mut registry = ExtensionRegistry::new();
        registry.register(ext("Hosts", "os-hosts")).unwrap();
        let err = registry.register(ext("Other hosts", "os-hosts")).unwrap_err();
        assert!(matches!(err, ExtensionError::DuplicateAlias(alias) if alias == "os-hosts"));
    }

    #[test]
    fn test_should_not_count_skipped_extension_as_duplicate() {
        let mut registry = ExtensionRegistry::new();
        assert!(!registry.register(ext("", "hosts")).unwrap());
        assert!(registry.register(ext("Hosts", "hosts")).unwrap());
    }

    #[test]
    fn test_should_reject_overlapping_extension_actions() {
        let binding = ActionBinding::new(|_| Ok(crate::request::ActionOutcome::Empty));
        let err = ControllerExtension::new("segments")
            .action("enable", VersionRange::ALL, binding.clone())
            .and_then(|c| c.action("enable", VersionRange::ALL, binding))
            .unwrap_err();
        assert!(matches!(err, RegistryError::OverlappingVersionRange { .. }));
    }
}
