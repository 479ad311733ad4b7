//! Views derived from the authorized route tree: the global menu, the
//! breadcrumb path, and the keep-alive cache-name list.
//!
//! All pure functions; the route store recomputes them wholesale whenever
//! the mounted set changes.

use serde::{Deserialize, Serialize};

use super::{RouteMeta, RouteNode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Menu {
    pub key: String,
    pub label: String,
    pub i18n_key: Option<String>,
    pub route_key: String,
    pub route_path: String,
    pub icon: String,
    pub children: Vec<Menu>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub key: String,
    pub label: String,
    pub i18n_key: Option<String>,
    pub route_key: String,
    pub route_path: String,
    pub icon: String,
    /// Sibling entries shown as a dropdown on group crumbs.
    pub options: Vec<Breadcrumb>,
}

/// Fold the authorized route tree into the menu tree.
///
/// A node with more than one child becomes a group; with exactly one
/// child it becomes a group when `always_show` (the default) and is
/// otherwise elided in favor of its child; a leaf becomes an item.
/// Hidden nodes are skipped.
pub fn build_menus(routes: &[RouteNode], default_icon: &str) -> Vec<Menu> {
    let mut menus = Vec::new();

    for route in routes {
        if route.meta.hidden {
            continue;
        }

        let mut menu = menu_from_parts(&route.name, &route.path, &route.meta, default_icon);

        match route.children.len() {
            0 => menus.push(menu),
            1 => {
                if route.meta.always_show() {
                    menu.children = build_menus(&route.children, default_icon);
                    menus.push(menu);
                } else {
                    menus.extend(build_menus(&route.children, default_icon));
                }
            }
            _ => {
                menu.children = build_menus(&route.children, default_icon);
                menus.push(menu);
            }
        }
    }

    menus
}

pub fn menu_from_parts(name: &str, path: &str, meta: &RouteMeta, default_icon: &str) -> Menu {
    let label = if meta.title.is_empty() {
        name.to_string()
    } else {
        meta.title.clone()
    };

    Menu {
        key: name.to_string(),
        label,
        i18n_key: meta.i18n_key.clone(),
        route_key: name.to_string(),
        route_path: path.to_string(),
        icon: meta.icon.clone().unwrap_or_else(|| default_icon.to_string()),
        children: Vec::new(),
    }
}

/// Names of second-level routes to keep mounted off-screen: a resolvable
/// component plus `keep_alive`.
pub fn cache_route_names(routes: &[RouteNode]) -> Vec<String> {
    let mut names = Vec::new();

    for route in routes {
        for child in &route.children {
            if child.component.is_some() && child.meta.keep_alive {
                names.push(child.name.clone());
            }
        }
    }

    names
}

/// Root-to-target breadcrumb chain for the active route key, honoring the
/// route's `active_menu` override. Empty when no menu node matches.
pub fn breadcrumbs_for(
    route_key: &str,
    active_menu: Option<&str>,
    route_menu: &Menu,
    menus: &[Menu],
) -> Vec<Breadcrumb> {
    let menu_key = active_menu.unwrap_or(route_key);

    for menu in menus {
        if menu.key == menu_key {
            // With an override the highlighted menu is not the route
            // itself, so the leaf crumb comes from the route.
            let leaf = if active_menu.is_some() { route_menu } else { menu };
            return vec![to_breadcrumb(leaf)];
        }

        if !menu.children.is_empty() {
            let rest = breadcrumbs_for(route_key, active_menu, route_menu, &menu.children);
            if !rest.is_empty() {
                let mut chain = vec![to_breadcrumb(menu)];
                chain.extend(rest);
                return chain;
            }
        }
    }

    Vec::new()
}

fn to_breadcrumb(menu: &Menu) -> Breadcrumb {
    Breadcrumb {
        key: menu.key.clone(),
        label: menu.label.clone(),
        i18n_key: menu.i18n_key.clone(),
        route_key: menu.route_key.clone(),
        route_path: menu.route_path.clone(),
        icon: menu.icon.clone(),
        options: menu.children.iter().map(to_breadcrumb).collect(),
    }
}

/// Key chain from the menu root down to `selected_key`, for expanding the
/// menu around the active item.
pub fn selected_key_path(selected_key: &str, menus: &[Menu]) -> Vec<String> {
    for menu in menus {
        let mut path = Vec::new();
        if find_key_path(selected_key, menu, &mut path) {
            return path;
        }
    }

    Vec::new()
}

fn find_key_path(target: &str, menu: &Menu, path: &mut Vec<String>) -> bool {
    path.push(menu.key.clone());

    if menu.key == target {
        return true;
    }

    for child in &menu.children {
        if find_key_path(target, child, path) {
            return true;
        }
    }

    path.pop();
    false
}
