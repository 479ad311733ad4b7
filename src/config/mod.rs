use serde::{Deserialize, Serialize};
use std::env;

use crate::client::BackendConfig;

/// How the host binds navigation history. `Hash` and `History` are browser
/// bindings; `Memory` is the headless mode used by the CLI and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
    Hash,
    History,
    Memory,
}

/// How authorized routes are produced: role-filtered from the compiled
/// candidate list, or fetched as a manifest from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthRouteMode {
    Static,
    Dynamic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    pub history_mode: HistoryMode,
    pub auth_route_mode: AuthRouteMode,
    /// Route key the root route redirects to and the home tab pins.
    pub route_home: String,
    /// Fallback icon for menu entries without one.
    pub menu_icon: String,
    /// Base URL of the backend service.
    pub base_url: String,
    /// When set, requests go through the dev proxy pattern instead of
    /// `base_url`.
    pub http_proxy: bool,
    pub proxy_pattern: String,
    pub timeout_secs: u64,
    /// Role value that bypasses all route role constraints.
    pub super_role: String,
    /// How long a shown error suppresses identical codes, in milliseconds.
    pub error_msg_duration_ms: u64,
    pub backend: BackendConfig,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            history_mode: HistoryMode::History,
            auth_route_mode: AuthRouteMode::Static,
            route_home: "dashboard".to_string(),
            menu_icon: "carbon:menu".to_string(),
            base_url: "http://localhost:8989".to_string(),
            http_proxy: false,
            proxy_pattern: "/proxy".to_string(),
            timeout_secs: 30,
            super_role: "ROOT".to_string(),
            error_msg_duration_ms: 3000,
            backend: BackendConfig::default(),
        }
    }
}

impl ShellConfig {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("SHELL_HISTORY_MODE") {
            self.history_mode = match v.as_str() {
                "hash" => HistoryMode::Hash,
                "memory" => HistoryMode::Memory,
                _ => HistoryMode::History,
            };
        }
        if let Ok(v) = env::var("SHELL_AUTH_ROUTE_MODE") {
            self.auth_route_mode = match v.as_str() {
                "dynamic" => AuthRouteMode::Dynamic,
                _ => AuthRouteMode::Static,
            };
        }
        if let Ok(v) = env::var("SHELL_ROUTE_HOME") {
            self.route_home = v;
        }
        if let Ok(v) = env::var("SHELL_MENU_ICON") {
            self.menu_icon = v;
        }
        if let Ok(v) = env::var("SHELL_BASE_URL") {
            self.base_url = v;
        }
        if let Ok(v) = env::var("SHELL_HTTP_PROXY") {
            self.http_proxy = matches!(v.as_str(), "Y" | "y" | "true" | "1");
        }
        if let Ok(v) = env::var("SHELL_PROXY_PATTERN") {
            self.proxy_pattern = v;
        }
        if let Ok(v) = env::var("SHELL_TIMEOUT_SECS") {
            self.timeout_secs = v.parse().unwrap_or(self.timeout_secs);
        }
        if let Ok(v) = env::var("SHELL_SUPER_ROLE") {
            self.super_role = v;
        }
        if let Ok(v) = env::var("SHELL_ERROR_MSG_DURATION_MS") {
            self.error_msg_duration_ms = v.parse().unwrap_or(self.error_msg_duration_ms);
        }
        self
    }

    /// Effective service URL: the proxy pattern when the dev proxy is on,
    /// otherwise the configured base URL.
    pub fn service_url(&self) -> &str {
        if self.http_proxy {
            &self.proxy_pattern
        } else {
            &self.base_url
        }
    }
}
