//! Typed surface of the backend endpoints this crate calls itself.
//!
//! Behind a trait so the auth and route stores can be exercised against a
//! mock backend in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{RequestClient, RequestResult};
use crate::auth::UserInfo;
use crate::route::ManifestRoute;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginData {
    pub username: String,
    pub password: String,
    pub captcha_key: Option<String>,
    pub captcha_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn login(&self, data: &LoginData) -> RequestResult<LoginResult>;
    async fn logout(&self) -> RequestResult<()>;
    async fn fetch_user_info(&self) -> RequestResult<UserInfo>;
    async fn fetch_route_manifest(&self) -> RequestResult<Vec<ManifestRoute>>;
}

pub struct HttpBackend {
    client: std::sync::Arc<RequestClient>,
}

impl HttpBackend {
    pub fn new(client: std::sync::Arc<RequestClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn login(&self, data: &LoginData) -> RequestResult<LoginResult> {
        let fields = [
            ("username", data.username.as_str()),
            ("password", data.password.as_str()),
            ("captchaKey", data.captcha_key.as_deref().unwrap_or("")),
            ("captchaCode", data.captcha_code.as_deref().unwrap_or("")),
        ];
        self.client.post_form("/api/v1/auth/login", &fields).await
    }

    async fn logout(&self) -> RequestResult<()> {
        self.client.delete("/api/v1/auth/logout").await
    }

    async fn fetch_user_info(&self) -> RequestResult<UserInfo> {
        self.client.get("/api/v1/users/me").await
    }

    async fn fetch_route_manifest(&self) -> RequestResult<Vec<ManifestRoute>> {
        self.client.get("/api/v1/menus/routes").await
    }
}
