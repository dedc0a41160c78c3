//! URL routing.
//!
//! Routes are derived from the registered resources:
//!
//! | path                                        | target                       |
//! |---------------------------------------------|------------------------------|
//! | `/`                                         | root resource, collection    |
//! | `/v1`                                       | root resource, member `v1`   |
//! | `/v1[/{project}]/{coll}[/{id}[/action]]`     | top-level resource           |
//! | `/v1[/{project}]/{parent}/{pid}/{coll}[/{id}[/action]]` | nested resource   |
//!
//! A trailing `.json` selects the response format and is stripped first.

use std::collections::HashMap;

use percent_encoding::percent_decode_str;

/// First path segment of every versioned route.
pub const API_PREFIX: &str = "v1";

/// Path parameter holding the member id.
pub const ID_PARAM: &str = "id";

/// Which part of a resource a path addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    Collection,
    Member,
    /// `POST {member}/action`.
    Action,
}

/// A routed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// Collection name of the matched resource.
    pub resource: String,
    pub target: RouteTarget,
    pub params: HashMap<String, String>,
    pub project_id: Option<String>,
    /// Path without the format suffix.
    pub path: String,
    /// Format suffix (`json`) if one was given.
    pub suffix: Option<String>,
}

#[derive(Debug, Clone)]
struct NestedRoute {
    collection: String,
    parent_param: String,
}

/// Maps paths to resources.
#[derive(Debug, Clone, Default)]
pub struct Router {
    root: Option<String>,
    top_level: Vec<String>,
    /// Parent collection → nested collections.
    nested: HashMap<String, Vec<NestedRoute>>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_root(&mut self, collection: &str) {
        self.root = Some(collection.to_owned());
    }

    pub fn add_collection(&mut self, collection: &str) {
        self.top_level.push(collection.to_owned());
    }

    pub fn add_nested(&mut self, parent: &str, parent_param: &str, collection: &str) {
        self.nested
            .entry(parent.to_owned())
            .or_default()
            .push(NestedRoute {
                collection: collection.to_owned(),
                parent_param: parent_param.to_owned(),
            });
    }

    fn is_collection(&self, name: &str) -> bool {
        self.top_level.iter().any(|c| c == name)
    }

    /// Route a request path; `None` if nothing matches.
    #[must_use]
    pub fn route(&self, raw_path: &str) -> Option<RouteMatch> {
        let (path, suffix) = match raw_path.strip_suffix(".json") {
            Some(stripped) => (stripped, Some("json".to_owned())),
            None => (raw_path, None),
        };
        let segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
            .collect();

        let matched = |resource: &str, target: RouteTarget, params: HashMap<String, String>, project_id: Option<String>| {
            Some(RouteMatch {
                resource: resource.to_owned(),
                target,
                params,
                project_id,
                path: path.to_owned(),
                suffix: suffix.clone(),
            })
        };

        match segments.as_slice() {
            [] => return matched(self.root.as_deref()?, RouteTarget::Collection, HashMap::new(), None),
            [prefix] if prefix == API_PREFIX => {
                let params = HashMap::from([(ID_PARAM.to_owned(), API_PREFIX.to_owned())]);
                return matched(self.root.as_deref()?, RouteTarget::Member, params, None);
            }
            [prefix, ..] if prefix == API_PREFIX => {}
            _ => return None,
        }

        let mut rest = &segments[1..];
        let mut project_id = None;
        if rest.len() >= 2 && !self.is_collection(&rest[0]) && self.is_collection(&rest[1]) {
            project_id = Some(rest[0].clone());
            rest = &rest[1..];
        }

        let member = |id: &str| HashMap::from([(ID_PARAM.to_owned(), id.to_owned())]);

        match rest {
            [coll] if self.is_collection(coll) => {
                matched(coll, RouteTarget::Collection, HashMap::new(), project_id)
            }
            [coll, id] if self.is_collection(coll) => {
                matched(coll, RouteTarget::Member, member(id), project_id)
            }
            [coll, id, action] if self.is_collection(coll) && action == "action" => {
                matched(coll, RouteTarget::Action, member(id), project_id)
            }
            [parent, parent_id, coll, tail @ ..] if self.is_collection(parent) => {
                let nested = self
                    .nested
                    .get(parent.as_str())?
                    .iter()
                    .find(|n| n.collection == *coll)?;
                let mut params = HashMap::from([(nested.parent_param.clone(), parent_id.clone())]);
                let target = match tail {
                    [] => RouteTarget::Collection,
                    [id] => {
                        params.insert(ID_PARAM.to_owned(), id.clone());
                        RouteTarget::Member
                    }
                    [id, action] if action == "action" => {
                        params.insert(ID_PARAM.to_owned(), id.clone());
                        RouteTarget::Action
                    }
                    _ => return None,
                };
                matched(&nested.collection, target, params, project_id)
            }
            _ => None,
        }
    }
}
