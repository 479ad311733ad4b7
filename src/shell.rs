//! Explicit context object wiring the stores together: config, storage,
//! backend handle, auth session, route materializer, tabs, guard, and a
//! memory history. This is the crate's composition root; hosts embed one
//! `Shell` instead of reaching for ambient singletons.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use crate::auth::{AuthError, AuthStore};
use crate::client::backend::{BackendApi, HttpBackend, LoginData};
use crate::client::{
    ClientBuildError, DedupPresenter, ExpiryHandler, ExpiryWatch, RequestClient, RequestError,
    TracingSink,
};
use crate::config::ShellConfig;
use crate::guard::{GuardOutcome, NavigationGuard, RedirectTarget, TargetRef};
use crate::route::{
    ComponentRegistry, Menu, ResolvedRoute, RouteError, RouteNode, RouteRegistry, RouteStore,
};
use crate::storage::KeyStore;
use crate::tab::TabStore;

const REDIRECT_LIMIT: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error(transparent)]
    Client(#[from] ClientBuildError),
}

/// Where a navigation attempt ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum Navigation {
    Allowed(ResolvedRoute),
    Blocked,
}

impl Navigation {
    pub fn route(&self) -> Option<&ResolvedRoute> {
        match self {
            Navigation::Allowed(route) => Some(route),
            Navigation::Blocked => None,
        }
    }
}

pub struct Shell {
    config: ShellConfig,
    auth: Arc<AuthStore>,
    routes: Arc<RouteStore>,
    tabs: Arc<TabStore>,
    guard: NavigationGuard,
    history: Mutex<Vec<ResolvedRoute>>,
    client: Option<Arc<RequestClient>>,
}

impl Shell {
    /// Shell talking to a real backend over HTTP. The default expiry
    /// wiring accepts the re-login prompt immediately; hosts that want a
    /// blocking confirmation install their own handler on the client.
    pub fn new(
        config: ShellConfig,
        storage: Arc<dyn KeyStore>,
        candidates: Vec<RouteNode>,
        components: ComponentRegistry,
    ) -> Result<Self, ShellError> {
        let client = RequestClient::new(
            config.service_url(),
            Duration::from_secs(config.timeout_secs),
            config.backend.clone(),
            storage.clone(),
        )?
        .with_presenter(DedupPresenter::new(
            Box::new(TracingSink),
            Duration::from_millis(config.error_msg_duration_ms),
        ));
        let client = Arc::new(client);

        let api: Arc<dyn BackendApi> = Arc::new(HttpBackend::new(client.clone()));
        let mut shell = Self::with_backend(config, storage, api, candidates, components);

        client.set_expiry_handler(Arc::new(SessionExpiryReset {
            auth: Arc::downgrade(&shell.auth),
            routes: Arc::downgrade(&shell.routes),
            tabs: Arc::downgrade(&shell.tabs),
            watch: client.expiry_watch(),
        }));

        shell.client = Some(client);
        Ok(shell)
    }

    /// Shell over any [`BackendApi`]; tests plug a mock in here.
    pub fn with_backend(
        config: ShellConfig,
        storage: Arc<dyn KeyStore>,
        api: Arc<dyn BackendApi>,
        candidates: Vec<RouteNode>,
        components: ComponentRegistry,
    ) -> Self {
        let registry = Arc::new(RouteRegistry::new());
        let tabs = Arc::new(TabStore::new());
        let auth = Arc::new(AuthStore::new(storage, api.clone()));
        let routes = Arc::new(RouteStore::new(
            &config,
            registry,
            components,
            candidates,
            api,
            tabs.clone(),
        ));
        let guard = NavigationGuard::new(auth.clone(), routes.clone(), &config.super_role);

        let initial = routes.registry().resolve("/");

        Self {
            config,
            auth,
            routes,
            tabs,
            guard,
            history: Mutex::new(vec![initial]),
            client: None,
        }
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn auth(&self) -> &AuthStore {
        &self.auth
    }

    pub fn routes(&self) -> &RouteStore {
        &self.routes
    }

    pub fn registry(&self) -> &RouteRegistry {
        self.routes.registry()
    }

    pub fn tabs(&self) -> &TabStore {
        &self.tabs
    }

    /// The underlying HTTP client, absent when built over a mock backend.
    pub fn client(&self) -> Option<&Arc<RequestClient>> {
        self.client.as_ref()
    }

    pub fn current_route(&self) -> ResolvedRoute {
        self.history
            .lock()
            .expect("history lock")
            .last()
            .cloned()
            .expect("history never empty")
    }

    pub fn menus(&self) -> Vec<Menu> {
        self.routes.menus()
    }

    pub fn breadcrumbs(&self) -> Vec<crate::route::Breadcrumb> {
        self.routes.breadcrumbs(&self.current_route())
    }

    /// Navigate to `location` (`path?query`), running the guard and
    /// following redirects until a terminal outcome.
    pub async fn navigate(&self, location: &str) -> Navigation {
        self.navigate_inner(location, false).await
    }

    async fn navigate_inner(&self, location: &str, replace: bool) -> Navigation {
        let mut location = location.to_string();
        let mut replace = replace;

        for _ in 0..REDIRECT_LIMIT {
            let target = self.registry().resolve(&location);

            // declared redirects resolve before the guard sees the target
            if let Some(redirect) = target.redirect.clone() {
                tracing::debug!("following declared redirect {} -> {}", location, redirect);
                location = redirect;
                continue;
            }

            let from = self.current_route();
            match self.guard.resolve_navigation(&target, &from).await {
                GuardOutcome::Allow => {
                    tracing::debug!("navigation allowed: {}", target.full_path);
                    self.push_history(target.clone(), replace);
                    self.tabs.add_tab(&target);
                    return Navigation::Allowed(target);
                }
                GuardOutcome::Redirect(redirect) => {
                    location = self.location_of(&redirect);
                    replace = redirect.replace;
                    tracing::debug!("navigation redirected to {}", location);
                }
                GuardOutcome::Block => {
                    tracing::debug!("navigation blocked: {}", target.full_path);
                    return Navigation::Blocked;
                }
            }
        }

        tracing::warn!("redirect limit reached near '{}'", location);
        Navigation::Blocked
    }

    /// Login, materialize routes, then replay the return target captured
    /// before login.
    pub async fn login(&self, data: &LoginData) -> Result<Navigation, ShellError> {
        let user = self.auth.login(data).await?;

        if let Err(e) = self.routes.init_auth_route(&user).await {
            self.auth.reset_session();
            self.routes.reset();
            return Err(e.into());
        }

        Ok(self.redirect_from_login().await)
    }

    /// Replay the `redirect` query captured on the login route, falling
    /// back to the root route.
    pub async fn redirect_from_login(&self) -> Navigation {
        let current = self.current_route();
        let target = current.query_value("redirect").unwrap_or("/").to_string();
        self.navigate_inner(&target, true).await
    }

    /// Backend logout (opportunistic), local reset, and back to the login
    /// page unless the user is already somewhere constant.
    pub async fn logout(&self) {
        let current = self.current_route();

        self.auth.logout().await;
        self.routes.reset();
        self.tabs.clear();

        if !current.meta.constant {
            self.navigate_inner("/login", false).await;
        }
    }

    fn push_history(&self, route: ResolvedRoute, replace: bool) {
        let mut history = self.history.lock().expect("history lock");
        if replace {
            history.pop();
        }
        history.push(route);
    }

    fn location_of(&self, target: &RedirectTarget) -> String {
        let path = match &target.target {
            TargetRef::Path(path) => path.clone(),
            TargetRef::Name(name) => self.registry().path_of(name).unwrap_or_else(|| {
                tracing::warn!("redirect to unmounted route '{}', using root", name);
                "/".to_string()
            }),
        };

        if target.query.is_empty() {
            path
        } else {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(target.query.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .finish();
            format!("{}?{}", path, query)
        }
    }
}

/// Default session-expiry reaction: clear everything and re-open the
/// prompt latch. Equivalent to the user accepting the re-login dialog.
struct SessionExpiryReset {
    auth: Weak<AuthStore>,
    routes: Weak<RouteStore>,
    tabs: Weak<TabStore>,
    watch: Arc<ExpiryWatch>,
}

impl ExpiryHandler for SessionExpiryReset {
    fn on_expired(&self, error: &RequestError) {
        tracing::warn!("session expired ({}), resetting stores", error.code);
        if let Some(auth) = self.auth.upgrade() {
            auth.reset_session();
        }
        if let Some(routes) = self.routes.upgrade() {
            routes.reset();
        }
        if let Some(tabs) = self.tabs.upgrade() {
            tabs.clear();
        }
        self.watch.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserInfo;
    use crate::client::backend::LoginResult;
    use crate::client::RequestResult;
    use crate::route::{ManifestRoute, RouteMeta};
    use crate::storage::MemoryStore;
    use async_trait::async_trait;

    struct MockBackend {
        roles: Vec<String>,
        accept_login: bool,
    }

    impl MockBackend {
        fn new(roles: &[&str]) -> Self {
            Self {
                roles: roles.iter().map(|r| r.to_string()).collect(),
                accept_login: true,
            }
        }
    }

    #[async_trait]
    impl BackendApi for MockBackend {
        async fn login(&self, _data: &LoginData) -> RequestResult<LoginResult> {
            if !self.accept_login {
                return Err(RequestError::from_backend(
                    "A0210".into(),
                    "bad credentials".to_string(),
                ));
            }
            Ok(LoginResult {
                access_token: "token".to_string(),
                token_type: "Bearer".to_string(),
                refresh_token: None,
            })
        }

        async fn logout(&self) -> RequestResult<()> {
            Ok(())
        }

        async fn fetch_user_info(&self) -> RequestResult<UserInfo> {
            Ok(UserInfo {
                username: Some("alice".to_string()),
                roles: self.roles.clone(),
                ..UserInfo::default()
            })
        }

        async fn fetch_route_manifest(&self) -> RequestResult<Vec<ManifestRoute>> {
            Ok(Vec::new())
        }
    }

    fn candidates() -> Vec<RouteNode> {
        vec![RouteNode::new("manage", "/manage")
            .with_meta(RouteMeta {
                title: "manage".to_string(),
                roles: vec!["ADMIN".to_string()],
                ..RouteMeta::default()
            })
            .with_children(vec![RouteNode::new("manage_user", "/manage/user").with_meta(
                RouteMeta {
                    title: "manage_user".to_string(),
                    roles: vec!["ADMIN".to_string()],
                    ..RouteMeta::default()
                },
            )])]
    }

    fn shell_with(roles: &[&str]) -> Shell {
        Shell::with_backend(
            ShellConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(MockBackend::new(roles)),
            candidates(),
            ComponentRegistry::builtin(),
        )
    }

    fn credentials() -> LoginData {
        LoginData {
            username: "alice".to_string(),
            password: "secret".to_string(),
            ..LoginData::default()
        }
    }

    #[tokio::test]
    async fn unauthenticated_navigation_lands_on_login_with_return_path() {
        let shell = shell_with(&["ADMIN"]);

        let nav = shell.navigate("/manage/user").await;
        let route = nav.route().expect("login should be reachable");

        assert_eq!(route.name.as_deref(), Some("login"));
        assert_eq!(route.query_value("redirect"), Some("/manage/user"));
        assert_eq!(shell.current_route().path, "/login");
    }

    #[tokio::test]
    async fn login_replays_captured_redirect_target() {
        let shell = shell_with(&["ADMIN"]);
        shell.navigate("/manage/user").await;

        let nav = shell.login(&credentials()).await.unwrap();
        let route = nav.route().expect("redirect target should be allowed");

        assert_eq!(route.path, "/manage/user");
        assert!(shell.routes().is_init());
        // the login entry was replaced, not stacked
        assert_eq!(shell.current_route().path, "/manage/user");
    }

    #[tokio::test]
    async fn login_without_captured_target_goes_home() {
        let shell = shell_with(&["ADMIN"]);
        shell.navigate("/login").await;

        let nav = shell.login(&credentials()).await.unwrap();
        assert_eq!(nav.route().unwrap().name.as_deref(), Some("dashboard"));
    }

    #[tokio::test]
    async fn root_follows_declared_redirect_chain() {
        let shell = shell_with(&[]);

        let nav = shell.navigate("/").await;
        assert_eq!(nav.route().unwrap().name.as_deref(), Some("dashboard"));
    }

    #[tokio::test]
    async fn logged_in_user_bounces_off_login_page() {
        let shell = shell_with(&["ADMIN"]);
        shell.navigate("/login").await;
        shell.login(&credentials()).await.unwrap();

        let nav = shell.navigate("/login").await;
        assert_eq!(nav.route().unwrap().name.as_deref(), Some("dashboard"));
    }

    #[tokio::test]
    async fn forbidden_role_redirects_to_403_page() {
        let shell = shell_with(&["GUEST"]);
        shell.navigate("/login").await;
        shell.login(&credentials()).await.unwrap();

        // mount an admin-only route directly so the path resolves
        shell.registry().add_routes(&[RouteNode::new("secret", "/secret").with_meta(
            RouteMeta {
                title: "secret".to_string(),
                roles: vec!["ADMIN".to_string()],
                ..RouteMeta::default()
            },
        )]);

        let nav = shell.navigate("/secret").await;
        assert_eq!(nav.route().unwrap().name.as_deref(), Some("error-403"));
    }

    #[tokio::test]
    async fn logout_from_protected_route_returns_to_login() {
        let shell = shell_with(&["ADMIN"]);
        shell.navigate("/manage/user").await;
        shell.login(&credentials()).await.unwrap();
        assert_eq!(shell.current_route().path, "/manage/user");

        shell.logout().await;

        assert!(!shell.auth().is_login());
        assert!(!shell.routes().is_init());
        assert_eq!(shell.current_route().path, "/login");
    }

    #[tokio::test]
    async fn logout_on_constant_route_stays_put() {
        let shell = shell_with(&["ADMIN"]);
        shell.navigate("/").await;
        shell.login(&credentials()).await.unwrap();

        shell.navigate("/").await;
        assert_eq!(shell.current_route().name.as_deref(), Some("dashboard"));

        shell.logout().await;
        assert_eq!(shell.current_route().name.as_deref(), Some("dashboard"));
    }

    #[tokio::test]
    async fn failed_login_leaves_session_clean() {
        let mut backend = MockBackend::new(&["ADMIN"]);
        backend.accept_login = false;

        let shell = Shell::with_backend(
            ShellConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(backend),
            candidates(),
            ComponentRegistry::builtin(),
        );

        let err = shell.login(&credentials()).await.unwrap_err();
        assert!(matches!(err, ShellError::Auth(AuthError::Login(_))));
        assert!(!shell.auth().is_login());
        assert!(!shell.routes().is_init());
    }

    #[tokio::test]
    async fn allowed_navigation_tracks_a_tab() {
        let shell = shell_with(&["ADMIN"]);
        shell.navigate("/login").await;
        shell.login(&credentials()).await.unwrap();

        shell.navigate("/manage/user").await;
        let tabs = shell.tabs().tabs();
        assert!(tabs.iter().any(|t| t.key == "manage_user"));
        // home tab pinned during materialization
        assert_eq!(tabs[0].key, "dashboard");
    }
}
