//! Navigation guard: one evaluation per navigation attempt.
//!
//! Two phases, both first-match-wins. The initialization gate (rules 1-5)
//! orchestrates materialization ordering; a gate pass falls through to
//! the strategic list (an explicit ordered slice of condition/action
//! pairs) which settles login-page bounces, external links and the role
//! check.

use std::sync::Arc;

use crate::auth::AuthStore;
use crate::route::{
    ResolvedRoute, RouteStore, FORBIDDEN_ROUTE_NAME, LOGIN_ROUTE_NAME, ROOT_ROUTE_NAME,
};

#[derive(Debug, Clone, PartialEq)]
pub enum TargetRef {
    Name(String),
    Path(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RedirectTarget {
    pub target: TargetRef,
    pub query: Vec<(String, String)>,
    /// Replace the current history entry instead of pushing.
    pub replace: bool,
}

impl RedirectTarget {
    pub fn to_name(name: &str) -> Self {
        Self {
            target: TargetRef::Name(name.to_string()),
            query: Vec::new(),
            replace: false,
        }
    }

    pub fn to_path(path: &str) -> Self {
        Self {
            target: TargetRef::Path(path.to_string()),
            query: Vec::new(),
            replace: false,
        }
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn replacing(mut self) -> Self {
        self.replace = true;
        self
    }
}

/// Terminal outcome of one guard evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome {
    Allow,
    Redirect(RedirectTarget),
    Block,
}

/// Opens `meta.href` targets in a new browsing context. The default just
/// logs; browser hosts plug in a real opener.
pub trait LinkOpener: Send + Sync {
    fn open(&self, href: &str);
}

struct LogOpener;

impl LinkOpener for LogOpener {
    fn open(&self, href: &str) {
        tracing::info!("opening external link: {}", href);
    }
}

enum GatePass {
    Continue,
    Done(GuardOutcome),
}

pub struct NavigationGuard {
    auth: Arc<AuthStore>,
    routes: Arc<RouteStore>,
    super_role: String,
    link_opener: Box<dyn LinkOpener>,
}

impl NavigationGuard {
    pub fn new(auth: Arc<AuthStore>, routes: Arc<RouteStore>, super_role: &str) -> Self {
        Self {
            auth,
            routes,
            super_role: super_role.to_string(),
            link_opener: Box::new(LogOpener),
        }
    }

    pub fn with_link_opener(mut self, opener: Box<dyn LinkOpener>) -> Self {
        self.link_opener = opener;
        self
    }

    /// Evaluate one navigation from `from` to `to`.
    pub async fn resolve_navigation(
        &self,
        to: &ResolvedRoute,
        from: &ResolvedRoute,
    ) -> GuardOutcome {
        match self.auth_route_gate(to).await {
            GatePass::Done(outcome) => outcome,
            GatePass::Continue => self.apply_strategies(to, from),
        }
    }

    /// Rules 1-5: initialization ordering. `Continue` means the target is
    /// navigable as far as materialization is concerned and the strategic
    /// list decides the rest.
    async fn auth_route_gate(&self, to: &ResolvedRoute) -> GatePass {
        let is_placeholder = to.is_error_or_exception();
        let initialized = self.routes.is_init();

        // 1. constant target that is not an error/exception placeholder
        if to.meta.constant && !is_placeholder {
            tracing::debug!("gate: constant route, continue");
            return GatePass::Continue;
        }

        // 2. routes mounted, real target
        if initialized && !is_placeholder {
            tracing::debug!("gate: already initialized, continue");
            return GatePass::Continue;
        }

        // 3. routes mounted, placeholder target: only a real match may
        //    pass, otherwise this is a stale capture
        if initialized && is_placeholder {
            return if to.matched.is_empty() {
                tracing::debug!("gate: placeholder without a real match, block");
                GatePass::Done(GuardOutcome::Block)
            } else {
                tracing::debug!("gate: placeholder matched a mounted route, allow");
                GatePass::Done(GuardOutcome::Allow)
            };
        }

        // 4. not authenticated: to login, carrying the return path
        if !self.auth.is_login() {
            tracing::debug!("gate: unauthenticated, redirect to login");
            return GatePass::Done(GuardOutcome::Redirect(login_redirect(&to.full_path)));
        }

        // 5. authenticated but not initialized: materialize now
        let user = match self.auth.user_info() {
            Some(user) => user,
            None => match self.auth.update_info().await {
                Ok(user) => user,
                Err(e) => {
                    tracing::warn!("identity unavailable during materialization: {}", e);
                    return GatePass::Done(GuardOutcome::Redirect(login_redirect(&to.full_path)));
                }
            },
        };

        if let Err(e) = self.routes.init_auth_route(&user).await {
            // manifest failure is an authorization failure, not a blip
            tracing::warn!("route materialization failed, logging out: {}", e);
            self.auth.reset_session();
            self.routes.reset();
            return GatePass::Done(GuardOutcome::Redirect(login_redirect(&to.full_path)));
        }

        if is_placeholder {
            // the placeholder captured this path only because dynamic
            // routes were missing; retry the original location
            let path = if to.is_named(ROOT_ROUTE_NAME) {
                "/"
            } else {
                to.full_path.as_str()
            };
            tracing::debug!("gate: re-dispatching '{}' after materialization", path);
            return GatePass::Done(GuardOutcome::Redirect(
                RedirectTarget::to_path(path).replacing(),
            ));
        }

        GatePass::Continue
    }

    /// Rules 6-8 plus the unauthenticated safety net, scanned in declared
    /// order; only the first true condition's action runs.
    fn apply_strategies(&self, to: &ResolvedRoute, from: &ResolvedRoute) -> GuardOutcome {
        let is_login_user = self.auth.is_login();
        let user_roles = self
            .auth
            .user_info()
            .map(|user| user.roles)
            .unwrap_or_default();

        let required = &to.meta.roles;
        let has_permission = user_roles.iter().any(|role| role == &self.super_role)
            || required.is_empty()
            || required.iter().any(|role| user_roles.contains(role));

        struct Strategy<'a> {
            condition: bool,
            action: Box<dyn FnOnce() -> GuardOutcome + 'a>,
        }

        let strategies = vec![
            // already logged in, heading to the login page: back to root
            Strategy {
                condition: is_login_user && to.is_named(LOGIN_ROUTE_NAME),
                action: Box::new(|| {
                    GuardOutcome::Redirect(RedirectTarget::to_name(ROOT_ROUTE_NAME))
                }),
            },
            // needs login but the session is gone
            Strategy {
                condition: !is_login_user && !to.meta.constant,
                action: Box::new(|| GuardOutcome::Redirect(login_redirect(&to.full_path))),
            },
            // external link: open it elsewhere, stay where we came from
            Strategy {
                condition: to.meta.href.is_some(),
                action: Box::new(|| {
                    if let Some(href) = &to.meta.href {
                        self.link_opener.open(href);
                    }
                    GuardOutcome::Redirect(RedirectTarget::to_path(&from.full_path).replacing())
                }),
            },
            Strategy {
                condition: has_permission,
                action: Box::new(|| GuardOutcome::Allow),
            },
            Strategy {
                condition: !has_permission,
                action: Box::new(|| {
                    GuardOutcome::Redirect(RedirectTarget::to_name(FORBIDDEN_ROUTE_NAME))
                }),
            },
        ];

        for strategy in strategies {
            if strategy.condition {
                return (strategy.action)();
            }
        }

        GuardOutcome::Block
    }
}

fn login_redirect(return_path: &str) -> RedirectTarget {
    RedirectTarget::to_name(LOGIN_ROUTE_NAME).with_query("redirect", return_path)
}
