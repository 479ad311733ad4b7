//! Route materializer.
//!
//! Turns the session's role list (static mode) or the backend route
//! manifest (dynamic mode) into mounted routes, then derives the menu
//! tree and keep-alive cache list from the same combined set in one step,
//! so the derived views can never drift from the registry.

use std::sync::{Arc, RwLock};

use crate::auth::UserInfo;
use crate::client::backend::BackendApi;
use crate::client::RequestError;
use crate::config::{AuthRouteMode, ShellConfig};
use crate::tab::TabStore;

use super::filter::{filter_routes_by_roles, resolve_manifest, ComponentRegistry};
use super::menu::{breadcrumbs_for, build_menus, cache_route_names, menu_from_parts, Breadcrumb, Menu};
use super::registry::{ResolvedRoute, RouteRegistry};
use super::RouteNode;

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// Treated as an authorization failure: the caller logs the session
    /// out, no retry.
    #[error("route manifest fetch failed: {0}")]
    ManifestFetch(#[from] RequestError),
}

#[derive(Default)]
struct RouteState {
    is_init: bool,
    menus: Vec<Menu>,
    cache_routes: Vec<String>,
}

pub struct RouteStore {
    mode: AuthRouteMode,
    route_home: String,
    menu_icon: String,
    super_role: String,
    registry: Arc<RouteRegistry>,
    components: ComponentRegistry,
    /// Compiled candidates for static mode.
    candidates: Vec<RouteNode>,
    api: Arc<dyn BackendApi>,
    tabs: Arc<TabStore>,
    state: RwLock<RouteState>,
}

impl RouteStore {
    pub fn new(
        config: &ShellConfig,
        registry: Arc<RouteRegistry>,
        components: ComponentRegistry,
        candidates: Vec<RouteNode>,
        api: Arc<dyn BackendApi>,
        tabs: Arc<TabStore>,
    ) -> Self {
        Self {
            mode: config.auth_route_mode,
            route_home: config.route_home.clone(),
            menu_icon: config.menu_icon.clone(),
            super_role: config.super_role.clone(),
            registry,
            components,
            candidates,
            api,
            tabs,
            state: RwLock::new(RouteState::default()),
        }
    }

    /// One-shot latch: true only after authorized routes are mounted and
    /// the derived views are built.
    pub fn is_init(&self) -> bool {
        self.state.read().expect("route state lock").is_init
    }

    pub fn route_home(&self) -> &str {
        &self.route_home
    }

    pub fn registry(&self) -> &RouteRegistry {
        &self.registry
    }

    /// Materialize the authorized route set for `user`.
    pub async fn init_auth_route(&self, user: &UserInfo) -> Result<(), RouteError> {
        if self.is_init() {
            tracing::debug!("auth routes already initialized");
            return Ok(());
        }

        match self.mode {
            AuthRouteMode::Static => self.init_static(user),
            AuthRouteMode::Dynamic => self.init_dynamic(user).await?,
        }

        self.tabs.init_home_tab(&self.route_home, &self.registry);
        tracing::info!("auth route initialization complete");
        Ok(())
    }

    fn init_static(&self, user: &UserInfo) {
        tracing::debug!("static route mode: filtering compiled candidates");
        let filtered = filter_routes_by_roles(&self.candidates, &user.roles, &self.super_role);
        self.handle_auth_routes(filtered);
    }

    async fn init_dynamic(&self, user: &UserInfo) -> Result<(), RouteError> {
        tracing::debug!("dynamic route mode: fetching manifest");
        let manifest = self.api.fetch_route_manifest().await?;
        let routes = resolve_manifest(&manifest, &user.roles, &self.super_role, &self.components);
        self.handle_auth_routes(routes);
        Ok(())
    }

    /// The fan-out: mount, then fold menus and scan cache names over the
    /// combined constant + authorized set. Always runs as one unit.
    fn handle_auth_routes(&self, routes: Vec<RouteNode>) {
        self.registry.add_routes(&routes);

        let combined = self.registry.snapshot();
        let mut state = self.state.write().expect("route state lock");
        state.menus = build_menus(&combined, &self.menu_icon);
        state.cache_routes = cache_route_names(&combined);
        state.is_init = true;
    }

    pub fn menus(&self) -> Vec<Menu> {
        self.state.read().expect("route state lock").menus.clone()
    }

    pub fn cache_routes(&self) -> Vec<String> {
        self.state
            .read()
            .expect("route state lock")
            .cache_routes
            .clone()
    }

    pub fn add_cache_route(&self, route_key: &str) {
        let mut state = self.state.write().expect("route state lock");
        if state.cache_routes.iter().any(|k| k == route_key) {
            return;
        }
        state.cache_routes.push(route_key.to_string());
    }

    pub fn remove_cache_route(&self, route_key: &str) {
        let mut state = self.state.write().expect("route state lock");
        state.cache_routes.retain(|k| k != route_key);
    }

    /// Breadcrumb chain for the current location.
    pub fn breadcrumbs(&self, current: &ResolvedRoute) -> Vec<Breadcrumb> {
        let Some(key) = current.name.clone() else {
            return Vec::new();
        };

        let route_menu = menu_from_parts(&key, &current.path, &current.meta, &self.menu_icon);
        let state = self.state.read().expect("route state lock");
        breadcrumbs_for(
            &key,
            current.meta.active_menu.as_deref(),
            &route_menu,
            &state.menus,
        )
    }

    pub fn selected_key_path(&self, selected_key: &str) -> Vec<String> {
        let state = self.state.read().expect("route state lock");
        super::menu::selected_key_path(selected_key, &state.menus)
    }

    /// Back to the pre-materialization state: constants mounted, latch
    /// open, derived views empty.
    pub fn reset(&self) {
        self.registry.reset();
        let mut state = self.state.write().expect("route state lock");
        *state = RouteState::default();
        tracing::debug!("route store reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::backend::{BackendApi, LoginData, LoginResult};
    use crate::client::{RequestErrorKind, RequestResult};
    use crate::route::{ManifestRoute, RouteMeta};
    use async_trait::async_trait;

    struct ManifestBackend {
        manifest: Option<Vec<ManifestRoute>>,
    }

    #[async_trait]
    impl BackendApi for ManifestBackend {
        async fn login(&self, _data: &LoginData) -> RequestResult<LoginResult> {
            unimplemented!("not used by route store tests")
        }

        async fn logout(&self) -> RequestResult<()> {
            Ok(())
        }

        async fn fetch_user_info(&self) -> RequestResult<UserInfo> {
            unimplemented!("not used by route store tests")
        }

        async fn fetch_route_manifest(&self) -> RequestResult<Vec<ManifestRoute>> {
            match &self.manifest {
                Some(manifest) => Ok(manifest.clone()),
                None => Err(RequestError::from_backend(
                    "A0001".into(),
                    "manifest unavailable".to_string(),
                )),
            }
        }
    }

    fn admin_user() -> UserInfo {
        UserInfo {
            roles: vec!["ADMIN".to_string()],
            username: Some("alice".to_string()),
            ..UserInfo::default()
        }
    }

    fn candidates() -> Vec<RouteNode> {
        vec![RouteNode::new("manage", "/manage")
            .with_meta(RouteMeta {
                title: "manage".to_string(),
                roles: vec!["ADMIN".to_string()],
                ..RouteMeta::default()
            })
            .with_children(vec![
                RouteNode::new("manage_user", "/manage/user").with_meta(RouteMeta {
                    title: "manage_user".to_string(),
                    roles: vec!["ADMIN".to_string()],
                    ..RouteMeta::default()
                }),
                RouteNode::new("manage_root", "/manage/root").with_meta(RouteMeta {
                    title: "manage_root".to_string(),
                    roles: vec!["ROOT".to_string()],
                    ..RouteMeta::default()
                }),
            ])]
    }

    fn static_store(config: &ShellConfig) -> RouteStore {
        RouteStore::new(
            config,
            Arc::new(RouteRegistry::new()),
            ComponentRegistry::builtin(),
            candidates(),
            Arc::new(ManifestBackend { manifest: None }),
            Arc::new(TabStore::new()),
        )
    }

    #[tokio::test]
    async fn static_init_mounts_filtered_routes_and_sets_latch() {
        let config = ShellConfig::default();
        let store = static_store(&config);
        assert!(!store.is_init());

        store.init_auth_route(&admin_user()).await.unwrap();

        assert!(store.is_init());
        assert!(store.registry().has_route("manage_user"));
        assert!(!store.registry().has_route("manage_root"));

        let menus = store.menus();
        assert!(menus.iter().any(|m| m.key == "manage"));

        // repeated init is a no-op behind the latch
        store.init_auth_route(&admin_user()).await.unwrap();
        assert!(store.is_init());
    }

    #[tokio::test]
    async fn dynamic_init_resolves_manifest() {
        let manifest: Vec<ManifestRoute> = serde_json::from_value(serde_json::json!([
            {
                "path": "/manage",
                "name": "manage",
                "component": "Layout",
                "meta": { "title": "manage", "roles": ["ADMIN"] },
                "children": [
                    {
                        "path": "/manage/user",
                        "name": "manage_user",
                        "component": "manage/user/index",
                        "meta": { "title": "user", "roles": ["ADMIN"], "keepAlive": true }
                    }
                ]
            }
        ]))
        .unwrap();

        let mut config = ShellConfig::default();
        config.auth_route_mode = AuthRouteMode::Dynamic;
        config.route_home = "dashboard".to_string();

        let mut components = ComponentRegistry::builtin();
        components.register("manage/user/index");

        let tabs = Arc::new(TabStore::new());
        let store = RouteStore::new(
            &config,
            Arc::new(RouteRegistry::new()),
            components,
            Vec::new(),
            Arc::new(ManifestBackend {
                manifest: Some(manifest),
            }),
            Arc::clone(&tabs),
        );

        store.init_auth_route(&admin_user()).await.unwrap();

        assert!(store.is_init());
        assert!(store.registry().has_route("manage_user"));
        assert!(store
            .cache_routes()
            .contains(&"manage_user".to_string()));

        // home tab pinned once routes exist
        assert_eq!(tabs.tabs()[0].key, "dashboard");
    }

    #[tokio::test]
    async fn dynamic_fetch_failure_leaves_latch_open() {
        let mut config = ShellConfig::default();
        config.auth_route_mode = AuthRouteMode::Dynamic;

        let store = RouteStore::new(
            &config,
            Arc::new(RouteRegistry::new()),
            ComponentRegistry::builtin(),
            Vec::new(),
            Arc::new(ManifestBackend { manifest: None }),
            Arc::new(TabStore::new()),
        );

        let err = store.init_auth_route(&admin_user()).await.unwrap_err();
        let RouteError::ManifestFetch(inner) = err;
        assert_eq!(inner.kind, RequestErrorKind::Backend);
        assert!(!store.is_init());
    }

    #[tokio::test]
    async fn reset_reopens_latch_and_unmounts() {
        let config = ShellConfig::default();
        let store = static_store(&config);
        store.init_auth_route(&admin_user()).await.unwrap();

        store.reset();

        assert!(!store.is_init());
        assert!(store.menus().is_empty());
        assert!(!store.registry().has_route("manage"));
    }

    #[tokio::test]
    async fn breadcrumbs_follow_menu_chain() {
        let config = ShellConfig::default();
        let store = static_store(&config);
        store.init_auth_route(&admin_user()).await.unwrap();

        let current = store.registry().resolve("/manage/user");
        let crumbs = store.breadcrumbs(&current);
        let keys: Vec<&str> = crumbs.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["manage", "manage_user"]);
    }

    #[tokio::test]
    async fn cache_route_list_can_be_adjusted() {
        let config = ShellConfig::default();
        let store = static_store(&config);
        store.init_auth_route(&admin_user()).await.unwrap();

        store.add_cache_route("manage_user");
        store.add_cache_route("manage_user");
        let count = store
            .cache_routes()
            .iter()
            .filter(|k| k.as_str() == "manage_user")
            .count();
        assert_eq!(count, 1);

        store.remove_cache_route("manage_user");
        assert!(!store.cache_routes().contains(&"manage_user".to_string()));
    }
}
