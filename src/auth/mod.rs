//! Auth session: token lifecycle and current-user identity.
//!
//! State lives here; every mutation is mirrored into the key-value store
//! so a restarted process picks the session back up. Any login sub-step
//! failure collapses into a full session reset (fail closed).

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::backend::{BackendApi, LoginData};
use crate::client::RequestError;
use crate::storage::{
    KeyStore, KeyStoreExt, KEY_REFRESH_TOKEN, KEY_TOKEN, KEY_TOKEN_TYPE, KEY_USER_INFO,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserInfo {
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub roles: Vec<String>,
    pub perms: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("login request failed: {0}")]
    Login(#[source] RequestError),
    #[error("login response carried no access token")]
    MissingToken,
    #[error("identity fetch failed: {0}")]
    Identity(#[source] RequestError),
    #[error("logout request failed: {0}")]
    Logout(#[source] RequestError),
}

#[derive(Debug, Clone, Default)]
struct SessionState {
    token: Option<String>,
    token_type: Option<String>,
    refresh_token: Option<String>,
    user_info: Option<UserInfo>,
    logged_in_at: Option<DateTime<Utc>>,
}

pub struct AuthStore {
    storage: Arc<dyn KeyStore>,
    api: Arc<dyn BackendApi>,
    state: RwLock<SessionState>,
}

impl AuthStore {
    /// Build the store, restoring any persisted session.
    pub fn new(storage: Arc<dyn KeyStore>, api: Arc<dyn BackendApi>) -> Self {
        let restored = SessionState {
            token: storage.get_json(KEY_TOKEN),
            token_type: storage.get_json(KEY_TOKEN_TYPE),
            refresh_token: storage.get_json(KEY_REFRESH_TOKEN),
            user_info: storage.get_json(KEY_USER_INFO),
            logged_in_at: None,
        };

        if restored.token.is_some() {
            tracing::debug!("restored session from storage");
        }

        Self {
            storage,
            api,
            state: RwLock::new(restored),
        }
    }

    /// Derived, never stored: a session is logged in iff it holds a token.
    pub fn is_login(&self) -> bool {
        self.state.read().expect("session lock").token.is_some()
    }

    pub fn token(&self) -> Option<String> {
        self.state.read().expect("session lock").token.clone()
    }

    pub fn user_info(&self) -> Option<UserInfo> {
        self.state.read().expect("session lock").user_info.clone()
    }

    pub fn logged_in_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().expect("session lock").logged_in_at
    }

    /// Authenticate and fetch identity. On any sub-step failure the whole
    /// session is reset before the error is returned.
    pub async fn login(&self, data: &LoginData) -> Result<UserInfo, AuthError> {
        let result = match self.api.login(data).await {
            Ok(result) => result,
            Err(e) => {
                self.reset_session();
                return Err(AuthError::Login(e));
            }
        };

        if result.access_token.is_empty() {
            self.reset_session();
            return Err(AuthError::MissingToken);
        }

        {
            let mut state = self.state.write().expect("session lock");
            state.token = Some(result.access_token);
            state.token_type = Some(result.token_type);
            state.refresh_token = result.refresh_token;
            state.logged_in_at = Some(Utc::now());
        }
        self.sync_to_storage();

        match self.update_info().await {
            Ok(user) => {
                tracing::info!(username = ?user.username, "login succeeded");
                Ok(user)
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch the current-user identity. Failure means the session cannot
    /// be trusted and resets it.
    pub async fn update_info(&self) -> Result<UserInfo, AuthError> {
        match self.api.fetch_user_info().await {
            Ok(user) => {
                self.state.write().expect("session lock").user_info = Some(user.clone());
                self.sync_to_storage();
                Ok(user)
            }
            Err(e) => {
                tracing::warn!("identity fetch failed, resetting session: {}", e);
                self.reset_session();
                Err(AuthError::Identity(e))
            }
        }
    }

    /// Tell the backend, then clear local state. The backend call is
    /// opportunistic: its failure does not keep the session alive.
    pub async fn logout(&self) {
        if let Err(e) = self.api.logout().await {
            tracing::debug!("logout request failed, clearing session anyway: {}", e);
        }
        self.reset_session();
    }

    /// Clear session state and its persisted mirror.
    pub fn reset_session(&self) {
        *self.state.write().expect("session lock") = SessionState::default();

        for key in [KEY_TOKEN, KEY_TOKEN_TYPE, KEY_REFRESH_TOKEN, KEY_USER_INFO] {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!("failed to clear stored '{}': {}", key, e);
            }
        }
        tracing::debug!("session reset");
    }

    /// Mirror the current state into the key-value store. Persistence is
    /// best effort; failures are logged and the in-memory session stays
    /// authoritative.
    fn sync_to_storage(&self) {
        let state = self.state.read().expect("session lock");

        let entries: [(&str, Option<serde_json::Value>); 4] = [
            (KEY_TOKEN, state.token.clone().map(Into::into)),
            (KEY_TOKEN_TYPE, state.token_type.clone().map(Into::into)),
            (KEY_REFRESH_TOKEN, state.refresh_token.clone().map(Into::into)),
            (
                KEY_USER_INFO,
                state
                    .user_info
                    .as_ref()
                    .and_then(|u| serde_json::to_value(u).ok()),
            ),
        ];

        for (key, value) in entries {
            let result = match value {
                Some(value) => self.storage.set_json(key, &value),
                None => self.storage.remove(key),
            };
            if let Err(e) = result {
                tracing::warn!("failed to persist '{}': {}", key, e);
            }
        }
    }
}
