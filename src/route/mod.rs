//! Route tree model: the compiled constant catalog, the dynamic candidate
//! set, and the wire shape of backend-delivered route manifests.

pub mod filter;
pub mod menu;
pub mod registry;
pub mod store;

pub use filter::{filter_routes_by_roles, resolve_manifest, ComponentRegistry};
pub use menu::{Breadcrumb, Menu};
pub use registry::{ResolvedRoute, RouteRegistry};
pub use store::{RouteError, RouteStore};

use serde::{Deserialize, Serialize};

pub const ROOT_ROUTE_NAME: &str = "root";
pub const LOGIN_ROUTE_NAME: &str = "login";
pub const ANY_ROUTE_NAME: &str = "any";
/// Redirect target for role denial; constant so it is always mounted.
pub const FORBIDDEN_ROUTE_NAME: &str = "error-403";
pub const NOT_FOUND_ROUTE_NAME: &str = "error-404";

/// Catch-all path pattern understood by the registry.
pub const CATCH_ALL_PATH: &str = "/*";

/// Marker string backends use for a layout-level component.
pub const LAYOUT_COMPONENT: &str = "Layout";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Component {
    /// Structural layout wrapper around child views.
    Layout,
    /// A concrete view identified by its registry path.
    View(String),
    /// Fallback when a manifest component path cannot be resolved.
    NotFound,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouteMeta {
    pub title: String,
    pub i18n_key: Option<String>,
    /// Any of these roles grants access; empty means any authenticated
    /// user.
    pub roles: Vec<String>,
    pub constant: bool,
    pub hidden: bool,
    pub keep_alive: bool,
    /// Pinned into the tab bar.
    pub affix: bool,
    /// Unset means true: a lone child still renders under its group.
    pub always_show: Option<bool>,
    /// Menu key to highlight instead of the route's own key.
    pub active_menu: Option<String>,
    /// External link opened in a new browsing context instead of
    /// navigating.
    pub href: Option<String>,
    pub icon: Option<String>,
}

impl RouteMeta {
    /// Defaults to true when the manifest leaves it unset.
    pub fn always_show(&self) -> bool {
        self.always_show.unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteNode {
    pub name: String,
    pub path: String,
    pub component: Option<Component>,
    pub redirect: Option<String>,
    pub meta: RouteMeta,
    pub children: Vec<RouteNode>,
}

impl RouteNode {
    pub fn new(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            component: None,
            redirect: None,
            meta: RouteMeta::default(),
            children: Vec::new(),
        }
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.component = Some(component);
        self
    }

    pub fn with_redirect(mut self, redirect: &str) -> Self {
        self.redirect = Some(redirect.to_string());
        self
    }

    pub fn with_meta(mut self, meta: RouteMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_children(mut self, children: Vec<RouteNode>) -> Self {
        self.children = children;
        self
    }
}

/// Wire shape of one backend manifest entry: the component is a path
/// string to resolve, and the name may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManifestRoute {
    pub name: Option<String>,
    pub path: String,
    pub component: Option<String>,
    pub redirect: Option<String>,
    pub meta: RouteMeta,
    pub children: Vec<ManifestRoute>,
}

pub fn is_error_route_name(name: &str) -> bool {
    name == "error" || name.starts_with("error-")
}

pub fn is_exception_route_name(name: &str) -> bool {
    name == "exception" || name.starts_with("exception-")
}

/// Error/exception placeholder routes get special guard treatment: they
/// must not mask dynamic routes that simply are not mounted yet.
pub fn is_placeholder_route_name(name: &str) -> bool {
    is_error_route_name(name) || is_exception_route_name(name)
}

fn constant_meta(title: &str) -> RouteMeta {
    RouteMeta {
        title: title.to_string(),
        constant: true,
        hidden: true,
        ..RouteMeta::default()
    }
}

/// Always-mounted routes: root redirect, login, home tree, error pages
/// and the catch-all.
pub fn constant_routes() -> Vec<RouteNode> {
    let root = RouteNode::new(ROOT_ROUTE_NAME, "/")
        .with_redirect("/dashboard")
        .with_meta(constant_meta("root"));

    let login = RouteNode::new(LOGIN_ROUTE_NAME, "/login")
        .with_component(Component::View("_builtin/login/index".to_string()))
        .with_meta(RouteMeta {
            title: "login".to_string(),
            i18n_key: Some("route.login".to_string()),
            constant: true,
            hidden: true,
            keep_alive: true,
            ..RouteMeta::default()
        });

    let dashboard_meta = RouteMeta {
        title: "dashboard".to_string(),
        constant: true,
        keep_alive: true,
        affix: true,
        always_show: Some(false),
        icon: Some("mdi:monitor-dashboard".to_string()),
        ..RouteMeta::default()
    };

    let home = RouteNode::new("home", "/home")
        .with_component(Component::Layout)
        .with_redirect("/dashboard")
        .with_meta(RouteMeta {
            title: "home".to_string(),
            constant: true,
            ..RouteMeta::default()
        })
        .with_children(vec![RouteNode::new("dashboard", "/dashboard")
            .with_component(Component::View("home/index".to_string()))
            .with_meta(dashboard_meta)]);

    let error = RouteNode::new("error", "/error")
        .with_component(Component::Layout)
        .with_meta(constant_meta("error"))
        .with_children(vec![
            error_child(FORBIDDEN_ROUTE_NAME, "/error/403", "403"),
            error_child(NOT_FOUND_ROUTE_NAME, "/error/404", "404"),
            error_child("error-500", "/error/500", "500"),
        ]);

    let any = RouteNode::new(ANY_ROUTE_NAME, CATCH_ALL_PATH).with_meta(constant_meta("any"));

    vec![root, login, home, error, any]
}

fn error_child(name: &str, path: &str, title: &str) -> RouteNode {
    RouteNode::new(name, path)
        .with_component(Component::View(format!("_builtin/{}/index", title)))
        .with_meta(RouteMeta {
            title: title.to_string(),
            i18n_key: Some(format!("route.{}", title)),
            constant: true,
            hidden: true,
            ..RouteMeta::default()
        })
}

/// Exception pages compiled as a dynamic candidate group, mirroring the
/// split between always-mounted error pages and authorized exception
/// pages.
pub fn exception_routes() -> RouteNode {
    let child = |name: &str, path: &str, title: &str| {
        RouteNode::new(name, path)
            .with_component(Component::View(format!("_builtin/{}/index", title)))
            .with_meta(RouteMeta {
                title: title.to_string(),
                i18n_key: Some(format!("route.{}", title)),
                hidden: true,
                ..RouteMeta::default()
            })
    };

    RouteNode::new("exception", "/exception")
        .with_component(Component::Layout)
        .with_redirect("/exception/404")
        .with_meta(RouteMeta {
            title: "exception".to_string(),
            hidden: true,
            ..RouteMeta::default()
        })
        .with_children(vec![
            child("exception-403", "/exception/403", "403"),
            child("exception-404", "/exception/404", "404"),
            child("exception-500", "/exception/500", "500"),
        ])
}

/// View paths compiled into this build; manifests resolve against these.
pub fn builtin_view_paths() -> Vec<String> {
    [
        "home/index",
        "_builtin/login/index",
        "_builtin/403/index",
        "_builtin/404/index",
        "_builtin/500/index",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
