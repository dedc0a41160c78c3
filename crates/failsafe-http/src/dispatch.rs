//! Request dispatch.
//!
//! The [`Dispatcher`] is built once from the loaded extensions and then
//! drives every request through the same pipeline:
//!
//! 1. route the path to a resource,
//! 2. resolve the API version (versioned resources only),
//! 3. negotiate request and response media types,
//! 4. resolve the action name and make sure the resource has it,
//! 5. decode the body and cross-check the URL project,
//! 6. run pre hooks, validate the body and invoke the version-selected
//!    handler, then run post hooks in reverse,
//! 7. serialize, stamping the version header for versioned responses.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use failsafe_core::{CallerContext, FailsafeConfig};
use failsafe_model::{ApiError, ApiErrorCode, ApiVersion, VersionError, VersionToken, VersionWindow};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::body::FailsafeResponseBody;
use crate::extension::{ExtensionError, ExtensionRegistry, ResourceBinding};
use crate::fault::MessageCatalog;
use crate::hooks::ActionHook;
use crate::microversion::{resolve_version, version_header_value};
use crate::negotiation::ContentNegotiator;
use crate::registry::VersionedMethodRegistry;
use crate::request::{ActionBinding, ActionOutcome, ApiRequest, ApiResponse, RequestCache};
use crate::response::{api_response_to_http, fault_to_response};
use crate::router::{RouteTarget, Router};

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the caller's project id.
pub const PROJECT_ID_HEADER: &str = "x-project-id";
/// Header carrying the caller's comma separated roles.
pub const ROLES_HEADER: &str = "x-roles";

/// Errors raised while building a dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum DispatcherError {
    /// An extension contributed conflicting resources or actions.
    #[error(transparent)]
    Extension(#[from] ExtensionError),

    /// The configured versions do not form a valid window.
    #[error("invalid API version configuration: {0}")]
    Version(#[from] VersionError),

    /// The configured version header is not a valid header name.
    #[error("invalid version header name: {0}")]
    InvalidHeaderName(String),
}

/// Settings of the dispatch engine.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Request and response header carrying the microversion.
    pub version_header: String,
    /// Service type naming this API inside the version header.
    pub service_name: String,
    /// Oldest supported version.
    pub min_version: ApiVersion,
    /// Version served when the client names none.
    pub default_version: ApiVersion,
    /// Vendor media type accepted besides plain JSON.
    pub primary_media_type: String,
    /// Languages fault messages can be translated into.
    pub available_languages: Vec<String>,
    /// Base URL for links; taken from the `Host` header when unset.
    pub public_endpoint: Option<String>,
}

impl DispatcherConfig {
    /// Extract the dispatcher settings from the service configuration.
    pub fn from_config(config: &FailsafeConfig) -> Result<Self, DispatcherError> {
        Ok(Self {
            version_header: config.api_version_header.clone(),
            service_name: config.api_service_name.clone(),
            min_version: ApiVersion::parse(&config.api_min_version)?,
            default_version: ApiVersion::parse(&config.api_default_version)?,
            primary_media_type: config.api_primary_media_type.clone(),
            available_languages: config.available_languages.clone(),
            public_endpoint: config.public_endpoint.clone(),
        })
    }
}

/// Pipeline position of a request, for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Nothing looked at yet.
    Received,
    /// Route found and version resolved.
    VersionResolved,
    /// Action name resolved against the resource.
    ActionResolved,
    /// Body decoded and request context built.
    BodyDeserialized,
    /// Pre hooks ran without answering the request.
    PreExtensionsRun,
    /// The version-selected handler returned.
    HandlerInvoked,
    /// Post hooks ran in reverse order.
    PostExtensionsRun,
    /// Response written.
    Serialized,
    /// An error was turned into a fault.
    Faulted,
}

fn advance(state: &mut DispatchState, next: DispatchState) {
    debug!(from = ?*state, to = ?next, "dispatch state");
    *state = next;
}

/// A resource with the controller extensions that apply to it.
#[derive(Debug)]
struct ResourceEntry {
    binding: ResourceBinding,
    /// Action-endpoint registries, own extensions first, then inherited.
    extension_actions: Vec<VersionedMethodRegistry<ActionBinding>>,
    /// Hook registries in extension registration order.
    hooks: Vec<VersionedMethodRegistry<Arc<dyn ActionHook>>>,
}

impl ResourceEntry {
    fn find_extension_action(&self, action: &str) -> Option<&VersionedMethodRegistry<ActionBinding>> {
        self.extension_actions.iter().find(|r| r.contains(action))
    }
}

/// Routes requests to versioned handlers.
pub struct Dispatcher {
    router: Router,
    resources: HashMap<String, ResourceEntry>,
    window: VersionWindow,
    negotiator: ContentNegotiator,
    version_header: http::HeaderName,
    service_name: String,
    public_endpoint: Option<String>,
    catalog: Option<Arc<dyn MessageCatalog>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("window", &self.window)
            .field("service_name", &self.service_name)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Build the dispatcher from every loaded extension.
    ///
    /// The newest supported version is the highest version mentioned by any
    /// registered action or hook, so `latest` follows the registrations.
    pub fn build(
        config: DispatcherConfig,
        extensions: &ExtensionRegistry,
    ) -> Result<Self, DispatcherError> {
        let mut bindings: Vec<ResourceBinding> = Vec::new();
        let mut controllers = Vec::new();
        for extension in extensions.iter() {
            for resource in extension.resources().map_err(ExtensionError::from)? {
                if bindings.iter().any(|b| b.collection == resource.collection) {
                    return Err(ExtensionError::DuplicateResource(resource.collection).into());
                }
                bindings.push(resource);
            }
            controllers.extend(
                extension
                    .controller_extensions()
                    .map_err(ExtensionError::from)?,
            );
        }

        let mut router = Router::new();
        for binding in &bindings {
            match (&binding.parent, binding.root) {
                (_, true) => router.add_root(&binding.collection),
                (None, false) => router.add_collection(&binding.collection),
                (Some(parent), false) => {
                    if !bindings.iter().any(|b| b.collection == parent.collection) {
                        return Err(ExtensionError::UnknownParent {
                            resource: binding.collection.clone(),
                            parent: parent.collection.clone(),
                        }
                        .into());
                    }
                    router.add_nested(&parent.collection, &parent.param, &binding.collection);
                }
            }
        }

        for controller in &controllers {
            if !bindings.iter().any(|b| b.collection == controller.resource) {
                warn!(resource = %controller.resource, "controller extension targets unknown resource, skipping");
            }
        }

        let chains: Vec<Vec<String>> = bindings
            .iter()
            .map(|b| inherit_chain(b, &bindings))
            .collect();

        let mut max_version = config.default_version.max(config.min_version);
        let mut resources = HashMap::new();
        for (binding, chain) in bindings.into_iter().zip(chains) {
            let mut entry = ResourceEntry {
                binding,
                extension_actions: Vec::new(),
                hooks: Vec::new(),
            };
            for target in chain {
                for controller in controllers.iter().filter(|c| c.resource == target) {
                    entry.extension_actions.push(controller.actions.clone());
                    entry.hooks.push(controller.hooks.clone());
                }
            }

            let known = std::iter::once(entry.binding.actions.max_known_version())
                .chain(entry.extension_actions.iter().map(VersionedMethodRegistry::max_known_version))
                .chain(entry.hooks.iter().map(VersionedMethodRegistry::max_known_version))
                .flatten()
                .max();
            if let Some(known) = known {
                max_version = max_version.max(known);
            }

            info!(
                resource = %entry.binding.collection,
                actions = entry.binding.actions.names().count(),
                extensions = entry.extension_actions.len(),
                "registered resource"
            );
            resources.insert(entry.binding.collection.clone(), entry);
        }

        let window = VersionWindow::new(config.min_version, max_version, config.default_version)?;
        let version_header = http::HeaderName::from_bytes(config.version_header.as_bytes())
            .map_err(|_| DispatcherError::InvalidHeaderName(config.version_header.clone()))?;

        info!(min = %window.min, max = %window.max, default = %window.default, "API version window");

        Ok(Self {
            router,
            resources,
            window,
            negotiator: ContentNegotiator::new(&config.primary_media_type, config.available_languages),
            version_header,
            service_name: config.service_name,
            public_endpoint: config.public_endpoint,
            catalog: None,
        })
    }

    /// Translate fault messages with `catalog`.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<dyn MessageCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    #[must_use]
    pub fn window(&self) -> &VersionWindow {
        &self.window
    }

    /// Dispatch one request with a fully collected body.
    #[must_use]
    pub fn dispatch(&self, request: http::Request<Bytes>) -> http::Response<FailsafeResponseBody> {
        let (parts, body) = request.into_parts();
        let language = self
            .negotiator
            .best_match_language(header_str(&parts.headers, http::header::ACCEPT_LANGUAGE.as_str()));

        let mut state = DispatchState::Received;
        let mut version = VersionToken::Null;
        match self.process(parts, body, language.clone(), &mut state, &mut version) {
            Ok(response) => response,
            Err(err) => {
                let failed_in = state;
                advance(&mut state, DispatchState::Faulted);
                match err.code {
                    ApiErrorCode::BadArgument | ApiErrorCode::InternalError => {
                        error!(code = %err.code, message = %err.message, state = ?failed_in, "request failed");
                    }
                    _ => {
                        warn!(code = %err.code, status = %err.status_code, message = %err.message, "client fault");
                    }
                }
                let mut response = fault_to_response(&err, language.as_deref(), self.catalog.as_deref());
                self.stamp_version(response.headers_mut(), version);
                response
            }
        }
    }

    fn process(
        &self,
        parts: http::request::Parts,
        body: Bytes,
        language: Option<String>,
        state: &mut DispatchState,
        resolved: &mut VersionToken,
    ) -> Result<http::Response<FailsafeResponseBody>, ApiError> {
        let route = self
            .router
            .route(parts.uri.path())
            .ok_or_else(|| ApiError::not_found("The resource could not be found."))?;
        let entry = self
            .resources
            .get(&route.resource)
            .ok_or_else(|| ApiError::not_found("The resource could not be found."))?;

        let version = if entry.binding.versioned {
            VersionToken::Version(resolve_version(
                &parts.headers,
                self.version_header.as_str(),
                &self.service_name,
                &self.window,
            )?)
        } else {
            VersionToken::Null
        };
        *resolved = version;
        advance(state, DispatchState::VersionResolved);

        self.negotiator.get_content_type(header_str(
            &parts.headers,
            http::header::CONTENT_TYPE.as_str(),
        ))?;
        let response_type = self.negotiator.best_match_content_type(
            route.suffix.as_deref(),
            header_str(&parts.headers, http::header::ACCEPT.as_str()),
        );

        let decoded = decode_body(&parts.method, &parts.headers, &body)?;
        let action = resolve_action(&parts.method, &route.target, decoded.as_ref())?;
        let from_extension = route.target == RouteTarget::Action;
        let registry = if from_extension {
            entry
                .find_extension_action(&action)
                .ok_or_else(|| ApiError::invalid_action(&action))?
        } else if entry.binding.actions.contains(&action) {
            &entry.binding.actions
        } else {
            return Err(ApiError::bad_method());
        };
        advance(state, DispatchState::ActionResolved);

        let caller = CallerContext::from_parts(
            header_str(&parts.headers, USER_ID_HEADER),
            header_str(&parts.headers, PROJECT_ID_HEADER),
            header_str(&parts.headers, ROLES_HEADER),
        );
        let query = parts
            .uri
            .query()
            .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        let mut request = ApiRequest {
            base_url: self.base_url(&parts.headers),
            method: parts.method,
            path: route.path,
            headers: parts.headers,
            action,
            version,
            window: self.window,
            response_type,
            language,
            caller,
            project_id: route.project_id,
            params: route.params,
            query,
            body: decoded,
            cache: RequestCache::default(),
        };
        advance(state, DispatchState::BodyDeserialized);

        if let Some(url_project) = &request.project_id {
            let caller_project = request.caller.project_id.as_ref().map(|p| p.as_str());
            if caller_project != Some(url_project.as_str()) {
                return Err(ApiError::project_mismatch(
                    url_project,
                    caller_project.unwrap_or("None"),
                ));
            }
        }

        let effective = request.effective_version();
        let mut post_hooks = Vec::new();
        for hooks in &entry.hooks {
            let Some(hook) = hooks.resolve(&request.action, effective) else {
                continue;
            };
            if let Some(response) = hook.before(&mut request)? {
                debug!(action = %request.action, "pre hook answered the request");
                return Ok(self.serialize(response, &request));
            }
            post_hooks.push(Arc::clone(hook));
        }
        advance(state, DispatchState::PreExtensionsRun);

        let binding = registry
            .resolve(&request.action, effective)
            .ok_or_else(|| ApiError::version_not_found(&request.action))?;
        if let Some(schema) = binding.schema() {
            schema.validate(request.body.as_ref().unwrap_or(&Value::Null))?;
        }
        let outcome = binding.invoke(&mut request)?;
        advance(state, DispatchState::HandlerInvoked);

        let mut response = match outcome {
            ActionOutcome::Empty => ApiResponse::new(binding.success_status(), None),
            ActionOutcome::Value(value) => ApiResponse::new(binding.success_status(), Some(value)),
            ActionOutcome::Response(response) => response,
            ActionOutcome::Raw(mut raw) => {
                self.stamp_version(raw.headers_mut(), request.version);
                return Ok(raw);
            }
        };

        for hook in post_hooks.iter().rev() {
            match hook.after(&mut request, &response) {
                Ok(Some(replaced)) => response = replaced,
                Ok(None) => {}
                Err(err) if err.code == ApiErrorCode::VersionNotFoundForMethod => {}
                Err(err) => return Err(err),
            }
        }
        advance(state, DispatchState::PostExtensionsRun);

        let http_response = self.serialize(response, &request);
        advance(state, DispatchState::Serialized);
        Ok(http_response)
    }

    fn serialize(&self, response: ApiResponse, request: &ApiRequest) -> http::Response<FailsafeResponseBody> {
        let mut http_response = api_response_to_http(response, &request.response_type);
        self.stamp_version(http_response.headers_mut(), request.version);
        http_response
    }

    /// Echo the served version and add `Vary`; unversioned responses get neither.
    fn stamp_version(&self, headers: &mut http::HeaderMap, version: VersionToken) {
        let VersionToken::Version(version) = version else {
            return;
        };
        if let Ok(value) = http::HeaderValue::from_str(&version_header_value(&self.service_name, version)) {
            headers.insert(self.version_header.clone(), value);
        }
        if let Ok(value) = http::HeaderValue::from_str(self.version_header.as_str()) {
            headers.append(http::header::VARY, value);
        }
    }

    fn base_url(&self, headers: &http::HeaderMap) -> String {
        if let Some(endpoint) = &self.public_endpoint {
            return endpoint.trim_end_matches('/').to_owned();
        }
        let host = header_str(headers, http::header::HOST.as_str()).unwrap_or("localhost");
        format!("http://{host}")
    }
}

/// The resource itself followed by the resources it inherits from.
fn inherit_chain(binding: &ResourceBinding, bindings: &[ResourceBinding]) -> Vec<String> {
    let mut chain = vec![binding.collection.clone()];
    let mut current = binding;
    while let Some(parent) = &current.inherits {
        if chain.contains(parent) {
            break;
        }
        chain.push(parent.clone());
        match bindings.iter().find(|b| b.collection == *parent) {
            Some(next) => current = next,
            None => break,
        }
    }
    chain
}

fn header_str<'a>(headers: &'a http::HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Decode a POST/PUT body; other methods ignore their body.
fn decode_body(
    method: &http::Method,
    headers: &http::HeaderMap,
    body: &Bytes,
) -> Result<Option<Value>, ApiError> {
    if *method != http::Method::POST && *method != http::Method::PUT {
        return Ok(None);
    }
    let declared_empty = header_str(headers, http::header::CONTENT_LENGTH.as_str()) == Some("0");
    if declared_empty || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| ApiError::malformed_body("Malformed request body").with_source(e))
}

/// Map the HTTP method and route target to an action name.
///
/// For `POST {member}/action` the action is the single top-level key of the
/// body.
fn resolve_action(
    method: &http::Method,
    target: &RouteTarget,
    body: Option<&Value>,
) -> Result<String, ApiError> {
    let name = match (method.as_str(), target) {
        ("GET", RouteTarget::Collection) => "index",
        ("GET", RouteTarget::Member) => "show",
        ("POST", RouteTarget::Collection) => "create",
        ("PUT", RouteTarget::Member) => "update",
        ("DELETE", RouteTarget::Member) => "delete",
        ("POST", RouteTarget::Action) => {
            let keys = body
                .and_then(Value::as_object)
                .ok_or_else(|| ApiError::malformed_body("Malformed request body"))?;
            let mut iter = keys.keys();
            return match (iter.next(), iter.next()) {
                (Some(key), None) => Ok(key.clone()),
                (None, _) => Err(ApiError::malformed_body("Malformed request body")),
                (Some(_), Some(_)) => Err(ApiError::malformed_body("too many body keys")),
            };
        }
        _ => return Err(ApiError::bad_method()),
    };
    Ok(name.to_owned())
}
