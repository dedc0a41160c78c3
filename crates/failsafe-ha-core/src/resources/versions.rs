//! API version discovery at `/` and `/v1`.
//!
//! Unversioned: answered for any version header and never stamped with one.

use failsafe_http::router::{API_PREFIX, ID_PARAM};
use failsafe_http::{ActionBinding, ActionOutcome, ApiRequest, Extension, RegistryError, ResourceBinding, VersionRange};
use failsafe_model::ApiError;
use failsafe_model::output::{Link, VersionView};
use serde_json::json;

use super::{UPDATED, to_json};

pub const ALIAS: &str = "versions";

/// Release date of the v1 API.
const V1_UPDATED: &str = "2024-01-01T00:00:00Z";

#[derive(Debug, Default)]
pub struct VersionsExtension;

impl Extension for VersionsExtension {
    fn name(&self) -> &str {
        "Versions"
    }

    fn alias(&self) -> &str {
        ALIAS
    }

    fn updated(&self) -> &str {
        UPDATED
    }

    fn description(&self) -> &str {
        "API version discovery."
    }

    fn resources(&self) -> Result<Vec<ResourceBinding>, RegistryError> {
        Ok(vec![
            ResourceBinding::root("versions", "version")
                .action("index", VersionRange::ALL, ActionBinding::new(index))?
                .action("show", VersionRange::ALL, ActionBinding::new(show))?,
        ])
    }
}

fn current_version(request: &ApiRequest) -> VersionView {
    VersionView {
        id: "v1.0".to_owned(),
        status: "CURRENT".to_owned(),
        version: request.window.max.to_string(),
        min_version: request.window.min.to_string(),
        updated: V1_UPDATED.to_owned(),
        links: vec![Link::new("self", format!("{}/{API_PREFIX}/", request.base_url))],
    }
}

fn index(request: &mut ApiRequest) -> Result<ActionOutcome, ApiError> {
    Ok(json!({"versions": [to_json(&current_version(request))?]}).into())
}

fn show(request: &mut ApiRequest) -> Result<ActionOutcome, ApiError> {
    let id = request.param(ID_PARAM)?;
    if id != API_PREFIX {
        return Err(ApiError::not_found(format!("Version {id} could not be found.")));
    }
    Ok(json!({"version": to_json(&current_version(request))?}).into())
}
