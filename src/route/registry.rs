//! The live mounted route set.
//!
//! Constant routes are mounted at construction; authorized routes are
//! added by the materializer. Adding an already-present route name is a
//! no-op, so repeated materialization attempts cannot double-mount.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use super::{constant_routes, is_placeholder_route_name, RouteMeta, RouteNode, CATCH_ALL_PATH};

/// A location resolved against the registry, the guard's unit of work.
///
/// `matched` is the root-to-leaf name chain of a real mounted route;
/// it stays empty when only the catch-all captured the path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRoute {
    pub full_path: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub name: Option<String>,
    pub matched: Vec<String>,
    pub meta: RouteMeta,
    pub redirect: Option<String>,
}

impl ResolvedRoute {
    /// Error/exception placeholder, or a path nothing real matched.
    pub fn is_error_or_exception(&self) -> bool {
        match &self.name {
            Some(name) => is_placeholder_route_name(name) || self.matched.is_empty(),
            None => true,
        }
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

pub struct RouteRegistry {
    trees: RwLock<Vec<RouteNode>>,
}

impl Default for RouteRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteRegistry {
    /// Registry with the constant catalog mounted.
    pub fn new() -> Self {
        Self {
            trees: RwLock::new(constant_routes()),
        }
    }

    /// Mount authorized route trees. Re-adding a mounted name is a no-op.
    pub fn add_routes(&self, routes: &[RouteNode]) {
        let mut trees = self.trees.write().expect("registry lock");

        for route in routes {
            if contains_name(&trees, &route.name) {
                tracing::debug!("route '{}' already mounted, skipping", route.name);
                continue;
            }
            tracing::info!("mounting route '{}' at {}", route.name, route.path);
            trees.push(route.clone());
        }
    }

    pub fn has_route(&self, name: &str) -> bool {
        contains_name(&self.trees.read().expect("registry lock"), name)
    }

    /// Drop every non-constant tree, back to the compiled catalog.
    pub fn reset(&self) {
        let mut trees = self.trees.write().expect("registry lock");
        trees.retain(|route| route.meta.constant);
        tracing::debug!("registry reset to constant routes");
    }

    /// The mounted set, cloned: menu and cache derivations fold over this
    /// so they can never drift from what is actually mounted.
    pub fn snapshot(&self) -> Vec<RouteNode> {
        self.trees.read().expect("registry lock").clone()
    }

    pub fn path_of(&self, name: &str) -> Option<String> {
        fn find(routes: &[RouteNode], name: &str) -> Option<String> {
            for route in routes {
                if route.name == name {
                    return Some(route.path.clone());
                }
                if let Some(path) = find(&route.children, name) {
                    return Some(path);
                }
            }
            None
        }
        find(&self.trees.read().expect("registry lock"), name)
    }

    /// Resolve a location (`path?query`) against the mounted set.
    pub fn resolve(&self, location: &str) -> ResolvedRoute {
        let (path, query) = split_location(location);
        let trees = self.trees.read().expect("registry lock");

        if let Some(chain) = match_path(&trees, &path) {
            let leaf = chain.last().expect("non-empty match chain");
            return ResolvedRoute {
                full_path: location.to_string(),
                path,
                query,
                name: Some(leaf.name.clone()),
                matched: chain.iter().map(|r| r.name.clone()).collect(),
                meta: leaf.meta.clone(),
                redirect: leaf.redirect.clone(),
            };
        }

        if let Some(catch_all) = trees.iter().find(|r| r.path == CATCH_ALL_PATH) {
            return ResolvedRoute {
                full_path: location.to_string(),
                path,
                query,
                name: Some(catch_all.name.clone()),
                matched: Vec::new(),
                meta: catch_all.meta.clone(),
                redirect: catch_all.redirect.clone(),
            };
        }

        ResolvedRoute {
            full_path: location.to_string(),
            path,
            query,
            ..ResolvedRoute::default()
        }
    }
}

fn contains_name(routes: &[RouteNode], name: &str) -> bool {
    routes
        .iter()
        .any(|route| route.name == name || contains_name(&route.children, name))
}

fn split_location(location: &str) -> (String, Vec<(String, String)>) {
    let (raw_path, raw_query) = match location.split_once('?') {
        Some((p, q)) => (p, q),
        None => (location, ""),
    };

    let path = if raw_path.len() > 1 {
        raw_path.trim_end_matches('/').to_string()
    } else {
        raw_path.to_string()
    };

    let query = url::form_urlencoded::parse(raw_query.as_bytes())
        .into_owned()
        .collect();

    (path, query)
}

fn match_path<'a>(routes: &'a [RouteNode], path: &str) -> Option<Vec<&'a RouteNode>> {
    for route in routes {
        if route.path == CATCH_ALL_PATH {
            continue;
        }
        if route.path == path {
            return Some(vec![route]);
        }
        if let Some(mut chain) = match_path(&route.children, path) {
            chain.insert(0, route);
            return Some(chain);
        }
    }
    None
}
