//! Role filtering of route trees and resolution of backend manifests.
//!
//! Pure functions over immutable trees: callers get fresh filtered copies,
//! never in-place mutation, so derived views can be rebuilt at any time.

use std::collections::HashSet;

use super::{Component, ManifestRoute, RouteNode, LAYOUT_COMPONENT};

/// Filter a candidate tree down to what `roles` may access.
///
/// Rules: the super-role bypasses everything; a node without role
/// constraints passes unconditionally; otherwise a node passes when its
/// roles intersect the caller's. A failing parent still surfaces its
/// qualifying descendants, flattened into the parent's position.
pub fn filter_routes_by_roles(
    routes: &[RouteNode],
    roles: &[String],
    super_role: &str,
) -> Vec<RouteNode> {
    if roles.iter().any(|role| role == super_role) {
        return routes.to_vec();
    }

    routes
        .iter()
        .flat_map(|route| filter_route_by_roles(route, roles))
        .collect()
}

fn filter_route_by_roles(route: &RouteNode, roles: &[String]) -> Vec<RouteNode> {
    if route.meta.roles.is_empty() {
        return vec![route.clone()];
    }

    let has_permission = route.meta.roles.iter().any(|role| roles.contains(role));

    let children: Vec<RouteNode> = route
        .children
        .iter()
        .flat_map(|child| filter_route_by_roles(child, roles))
        .collect();

    if has_permission {
        let mut kept = route.clone();
        kept.children = children;
        vec![kept]
    } else {
        children
    }
}

/// Known view paths a manifest component string may resolve to.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    views: HashSet<String>,
}

impl ComponentRegistry {
    pub fn new(views: impl IntoIterator<Item = String>) -> Self {
        Self {
            views: views.into_iter().collect(),
        }
    }

    /// Registry over the views compiled into this build.
    pub fn builtin() -> Self {
        Self::new(super::builtin_view_paths())
    }

    pub fn register(&mut self, view: &str) {
        self.views.insert(view.to_string());
    }

    pub fn resolve(&self, marker: &str) -> Component {
        if marker == LAYOUT_COMPONENT {
            Component::Layout
        } else if self.views.contains(marker) {
            Component::View(marker.to_string())
        } else {
            tracing::warn!("unknown manifest component '{}', using not-found view", marker);
            Component::NotFound
        }
    }
}

/// Turn a backend manifest into an authorized route tree: resolve each
/// component path string, default missing names to the path, then apply
/// the same role rule as the static filter.
pub fn resolve_manifest(
    manifest: &[ManifestRoute],
    roles: &[String],
    super_role: &str,
    components: &ComponentRegistry,
) -> Vec<RouteNode> {
    let converted: Vec<RouteNode> = manifest
        .iter()
        .map(|route| convert_manifest_route(route, components))
        .collect();

    filter_routes_by_roles(&converted, roles, super_role)
}

fn convert_manifest_route(route: &ManifestRoute, components: &ComponentRegistry) -> RouteNode {
    let name = route
        .name
        .clone()
        .unwrap_or_else(|| route.path.trim_start_matches('/').replace('/', "_"));

    RouteNode {
        name,
        path: route.path.clone(),
        component: route.component.as_deref().map(|c| components.resolve(c)),
        redirect: route.redirect.clone(),
        meta: route.meta.clone(),
        children: route
            .children
            .iter()
            .map(|child| convert_manifest_route(child, components))
            .collect(),
    }
}
