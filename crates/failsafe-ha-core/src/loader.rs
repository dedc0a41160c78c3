//! Extension loading and dispatcher assembly.

use std::sync::Arc;

use failsafe_http::{Dispatcher, DispatcherConfig, DispatcherError, Extension, ExtensionError, ExtensionRegistry};
use tracing::info;

use crate::context::HaContext;
use crate::resources::extensions::{self, ExtensionInfo, ExtensionsExtension};
use crate::resources::hosts::HostsExtension;
use crate::resources::notifications::NotificationsExtension;
use crate::resources::segment_actions::SegmentActionsExtension;
use crate::resources::segments::SegmentsExtension;
use crate::resources::versions::VersionsExtension;

/// Load the built-in extensions, minus the configured `disabled_extensions`.
///
/// The extensions listing is registered last so it can describe every other
/// loaded extension.
pub fn load_extensions(ctx: &Arc<HaContext>) -> Result<ExtensionRegistry, ExtensionError> {
    let builtin: Vec<Arc<dyn Extension>> = vec![
        Arc::new(VersionsExtension),
        Arc::new(SegmentsExtension::new(Arc::clone(ctx))),
        Arc::new(HostsExtension::new(Arc::clone(ctx))),
        Arc::new(NotificationsExtension::new(Arc::clone(ctx))),
        Arc::new(SegmentActionsExtension::new(Arc::clone(ctx))),
    ];

    let disabled = &ctx.config.disabled_extensions;
    let mut registry = ExtensionRegistry::new();
    for extension in builtin {
        if disabled.iter().any(|alias| alias == extension.alias()) {
            info!(alias = extension.alias(), "extension disabled by configuration");
            continue;
        }
        registry.register(extension)?;
    }

    if disabled.iter().any(|alias| alias == extensions::ALIAS) {
        info!(alias = extensions::ALIAS, "extension disabled by configuration");
        return Ok(registry);
    }
    let infos = registry
        .iter()
        .map(|e| ExtensionInfo::of(e.as_ref()))
        .chain(std::iter::once(ExtensionsExtension::info()))
        .collect();
    registry.register(Arc::new(ExtensionsExtension::new(Arc::clone(ctx), infos)))?;
    Ok(registry)
}

/// The dispatcher serving every loaded extension under the context's config.
pub fn build_dispatcher(ctx: &Arc<HaContext>) -> Result<Dispatcher, DispatcherError> {
    let registry = load_extensions(ctx)?;
    let config = DispatcherConfig::from_config(&ctx.config)?;
    Dispatcher::build(config, &registry)
}
