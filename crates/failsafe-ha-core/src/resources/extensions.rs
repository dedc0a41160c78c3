//! Extension discovery: `/v1/extensions`.

use std::sync::Arc;

use failsafe_http::router::ID_PARAM;
use failsafe_http::{ActionOutcome, ApiRequest, Extension, RegistryError, ResourceBinding, VersionRange};
use failsafe_model::ApiError;
use failsafe_model::output::ExtensionView;
use serde_json::json;

use super::{UPDATED, authorize, bind, to_json};
use crate::context::HaContext;
use crate::policy::{DISCOVERABLE, policy_action};

pub const ALIAS: &str = "extensions";

/// What the listing says about one loaded extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionInfo {
    pub name: String,
    pub alias: String,
    pub description: String,
    pub updated: String,
}

impl ExtensionInfo {
    #[must_use]
    pub fn of(extension: &dyn Extension) -> Self {
        Self {
            name: extension.name().to_owned(),
            alias: extension.alias().to_owned(),
            description: extension.description().to_owned(),
            updated: extension.updated().to_owned(),
        }
    }

    fn view(&self) -> ExtensionView {
        ExtensionView {
            name: self.name.clone(),
            alias: self.alias.clone(),
            description: self.description.clone(),
            updated: self.updated.clone(),
            links: Vec::new(),
        }
    }
}

/// Lists the extensions loaded alongside it, itself included.
#[derive(Debug)]
pub struct ExtensionsExtension {
    ctx: Arc<HaContext>,
    infos: Arc<Vec<ExtensionInfo>>,
}

impl ExtensionsExtension {
    #[must_use]
    pub fn new(ctx: Arc<HaContext>, infos: Vec<ExtensionInfo>) -> Self {
        Self {
            ctx,
            infos: Arc::new(infos),
        }
    }

    const NAME: &'static str = "Extensions";
    const DESCRIPTION: &'static str = "Extension discovery.";

    /// The listing entry of this extension.
    #[must_use]
    pub fn info() -> ExtensionInfo {
        ExtensionInfo {
            name: Self::NAME.to_owned(),
            alias: ALIAS.to_owned(),
            description: Self::DESCRIPTION.to_owned(),
            updated: UPDATED.to_owned(),
        }
    }
}

impl Extension for ExtensionsExtension {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn alias(&self) -> &str {
        ALIAS
    }

    fn updated(&self) -> &str {
        UPDATED
    }

    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    fn resources(&self) -> Result<Vec<ResourceBinding>, RegistryError> {
        let index_infos = Arc::clone(&self.infos);
        let show_infos = Arc::clone(&self.infos);
        Ok(vec![
            ResourceBinding::new("extensions", "extension")
                .action(
                    "index",
                    VersionRange::ALL,
                    bind(&self.ctx, move |ctx, request| index(ctx, request, &index_infos)),
                )?
                .action(
                    "show",
                    VersionRange::ALL,
                    bind(&self.ctx, move |ctx, request| show(ctx, request, &show_infos)),
                )?,
        ])
    }
}

fn discoverable<'a>(
    ctx: &'a HaContext,
    request: &'a ApiRequest,
    infos: &'a [ExtensionInfo],
) -> impl Iterator<Item = &'a ExtensionInfo> + 'a {
    infos.iter().filter(move |info| {
        ctx.policy
            .can(&request.caller, &policy_action(&info.alias, DISCOVERABLE))
    })
}

fn index(ctx: &HaContext, request: &mut ApiRequest, infos: &[ExtensionInfo]) -> Result<ActionOutcome, ApiError> {
    authorize(ctx, request, ALIAS, "index")?;
    let views = discoverable(ctx, request, infos)
        .map(|info| to_json(&info.view()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({"extensions": views}).into())
}

fn show(ctx: &HaContext, request: &mut ApiRequest, infos: &[ExtensionInfo]) -> Result<ActionOutcome, ApiError> {
    authorize(ctx, request, ALIAS, "show")?;
    let alias = request.param(ID_PARAM)?;
    let info = discoverable(ctx, request, infos)
        .find(|info| info.alias == alias)
        .ok_or_else(|| ApiError::not_found(format!("Extension {alias} could not be found.")))?;
    Ok(json!({"extension": to_json(&info.view())?}).into())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use failsafe_core::FailsafeConfig;
    use http::StatusCode;

    use super::super::test_support::{Call, api};
    use crate::context::HaContext;
    use crate::loader::build_dispatcher;
    use crate::notifier::ChannelNotifier;
    use crate::policy::{PolicyRule, RolePolicy};

    #[tokio::test]
    async fn test_should_list_loaded_extensions() {
        let api = api();
        let (status, _, body) = Call::new("GET", "/v1/extensions").admin().send(&api).await;
        assert_eq!(status, StatusCode::OK);
        let aliases: Vec<_> = body["extensions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["alias"].as_str().unwrap())
            .collect();
        assert_eq!(
            aliases,
            ["versions", "segments", "hosts", "notifications", "segment-actions", "extensions"]
        );
        assert_eq!(body["extensions"][0]["links"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_should_show_extension_by_alias() {
        let api = api();
        let (status, _, body) = Call::new("GET", "/v1/extensions/segment-actions")
            .admin()
            .send(&api)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["extension"]["name"], "SegmentActions");

        let (status, _, body) = Call::new("GET", "/v1/extensions/nope").admin().send(&api).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["itemNotFound"]["message"], "Extension nope could not be found.");
    }

    #[tokio::test]
    async fn test_should_hide_undiscoverable_extensions() {
        let (notifier, recovery) = ChannelNotifier::new(1);
        let policy = RolePolicy::new().with_rule(
            "failsafe_api:segment-actions:discoverable",
            PolicyRule::Deny,
        );
        let ctx = Arc::new(
            HaContext::in_memory(FailsafeConfig::default(), Arc::new(notifier)).with_policy(Arc::new(policy)),
        );
        let api = super::super::test_support::TestApi {
            dispatcher: build_dispatcher(&ctx).unwrap(),
            ctx,
            recovery,
        };

        let (_, _, body) = Call::new("GET", "/v1/extensions").admin().send(&api).await;
        let listed = body["extensions"].as_array().unwrap();
        assert!(listed.iter().all(|e| e["alias"] != "segment-actions"));
        assert_eq!(listed.len(), 5);

        let (status, _, _) = Call::new("GET", "/v1/extensions/segment-actions")
            .admin()
            .send(&api)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
