//! Open page tabs. Peripheral to the guard/materializer pipeline: the
//! materializer pins the home tab after routes mount, the shell adds a
//! tab per allowed navigation.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::route::{ResolvedRoute, RouteRegistry};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    pub key: String,
    pub route_key: String,
    pub full_path: String,
    pub label: String,
    /// Pinned tabs survive `clear` and cannot be removed.
    pub pinned: bool,
}

#[derive(Default)]
pub struct TabStore {
    tabs: RwLock<Vec<Tab>>,
}

impl TabStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the home tab once the route set is mounted.
    pub fn init_home_tab(&self, home_key: &str, registry: &RouteRegistry) {
        let Some(path) = registry.path_of(home_key) else {
            tracing::warn!("home route '{}' not mounted, no home tab", home_key);
            return;
        };

        let resolved = registry.resolve(&path);
        let label = if resolved.meta.title.is_empty() {
            home_key.to_string()
        } else {
            resolved.meta.title.clone()
        };

        let mut tabs = self.tabs.write().expect("tab lock");
        if tabs.iter().any(|t| t.key == home_key) {
            return;
        }
        tabs.insert(
            0,
            Tab {
                key: home_key.to_string(),
                route_key: home_key.to_string(),
                full_path: resolved.full_path,
                label,
                pinned: true,
            },
        );
    }

    /// Track a navigated route. Hidden routes (login, error pages) do not
    /// get tabs.
    pub fn add_tab(&self, route: &ResolvedRoute) {
        if route.meta.hidden {
            return;
        }
        let Some(name) = route.name.clone() else {
            return;
        };

        let mut tabs = self.tabs.write().expect("tab lock");
        if tabs.iter().any(|t| t.key == name) {
            return;
        }
        let label = if route.meta.title.is_empty() {
            name.clone()
        } else {
            route.meta.title.clone()
        };
        tabs.push(Tab {
            key: name.clone(),
            route_key: name,
            full_path: route.full_path.clone(),
            label,
            pinned: route.meta.affix,
        });
    }

    pub fn remove_tab(&self, key: &str) {
        let mut tabs = self.tabs.write().expect("tab lock");
        tabs.retain(|t| t.pinned || t.key != key);
    }

    pub fn clear(&self) {
        let mut tabs = self.tabs.write().expect("tab lock");
        tabs.retain(|t| t.pinned);
    }

    pub fn tabs(&self) -> Vec<Tab> {
        self.tabs.read().expect("tab lock").clone()
    }
}
