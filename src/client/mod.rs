//! REST client wrapper.
//!
//! Every call returns `Result<T, RequestError>`; transport failures, HTTP
//! status failures and backend business errors are all funneled into the
//! error arm, never panics or raw reqwest errors. Classified errors pass
//! through the de-duplicating presenter, and a configured set of backend
//! codes arms the session-expiry prompt.

pub mod backend;
pub mod error;
pub mod message;

pub use error::{Code, RequestError, RequestErrorKind};
pub use message::{DedupPresenter, ErrorSink, ExpiryHandler, ExpiryWatch, TracingSink};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use crate::storage::{KeyStore, KeyStoreExt, KEY_TOKEN, KEY_TOKEN_TYPE};

pub type RequestResult<T> = Result<T, RequestError>;

/// Field names and code sets of the backend response envelope
/// `{ [code_key]: …, [data_key]: …, [msg_key]: … }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub code_key: String,
    pub data_key: String,
    pub msg_key: String,
    pub success_codes: Vec<Code>,
    /// Codes meaning the session is no longer valid; they trigger the
    /// one-shot re-login prompt.
    pub expired_codes: Vec<Code>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            code_key: "code".to_string(),
            data_key: "data".to_string(),
            msg_key: "message".to_string(),
            success_codes: vec![Code::Num(200)],
            expired_codes: vec!["A0230".into(), "A0231".into()],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    #[error("invalid base url '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
}

enum Payload {
    None,
    Json(Value),
    Form(Vec<(String, String)>),
}

pub struct RequestClient {
    http: reqwest::Client,
    base_url: Url,
    backend: BackendConfig,
    storage: Arc<dyn KeyStore>,
    presenter: DedupPresenter,
    expiry: Arc<ExpiryWatch>,
    expiry_handler: Mutex<Option<Arc<dyn ExpiryHandler>>>,
}

impl RequestClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        backend: BackendConfig,
        storage: Arc<dyn KeyStore>,
    ) -> Result<Self, ClientBuildError> {
        let base_url = Url::parse(base_url).map_err(|source| ClientBuildError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let presenter = DedupPresenter::new(Box::new(TracingSink), Duration::from_secs(3));

        Ok(Self {
            http,
            base_url,
            backend,
            storage,
            presenter,
            expiry: Arc::new(ExpiryWatch::new()),
            expiry_handler: Mutex::new(None),
        })
    }

    /// Replace the default tracing presenter, e.g. with a UI toast sink.
    pub fn with_presenter(mut self, presenter: DedupPresenter) -> Self {
        self.presenter = presenter;
        self
    }

    /// Install the callback fired when the backend reports session expiry.
    /// Installed after construction because the handler usually closes
    /// over stores that are built around this client.
    pub fn set_expiry_handler(&self, handler: Arc<dyn ExpiryHandler>) {
        *self.expiry_handler.lock().expect("handler lock") = Some(handler);
    }

    pub fn expiry_watch(&self) -> Arc<ExpiryWatch> {
        Arc::clone(&self.expiry)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> RequestResult<T> {
        self.request(Method::GET, path, Payload::None).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> RequestResult<T> {
        let value = serde_json::to_value(body).map_err(|e| RequestError::other(&e.to_string()))?;
        self.request(Method::POST, path, Payload::Json(value)).await
    }

    /// Form-encoded POST, used by the login endpoint.
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        fields: &[(&str, &str)],
    ) -> RequestResult<T> {
        let fields = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.request(Method::POST, path, Payload::Form(fields)).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> RequestResult<T> {
        let value = serde_json::to_value(body).map_err(|e| RequestError::other(&e.to_string()))?;
        self.request(Method::PUT, path, Payload::Json(value)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> RequestResult<T> {
        self.request(Method::DELETE, path, Payload::None).await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
    ) -> RequestResult<T> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| self.fail(RequestError::other(&format!("invalid url '{}': {}", path, e))))?;

        let request_id = Uuid::new_v4();
        tracing::debug!(%request_id, %method, %url, "dispatching request");

        let mut builder = self.http.request(method, url);

        // Bearer header "{tokenType} {token}", read from the store per
        // request so a refreshed token is picked up immediately.
        let token: Option<String> = self.storage.get_json(KEY_TOKEN);
        let token_type: Option<String> = self.storage.get_json(KEY_TOKEN_TYPE);
        if let (Some(token), Some(token_type)) = (token, token_type) {
            if !token.is_empty() && !token_type.is_empty() {
                builder = builder.header(AUTHORIZATION, format!("{} {}", token_type, token));
            }
        }

        builder = match payload {
            Payload::None => builder,
            Payload::Json(value) => builder.json(&value),
            Payload::Form(fields) => builder.form(&fields),
        };

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(%request_id, "transport failure: {}", e);
                return Err(self.fail(RequestError::from_transport(&e)));
            }
        };

        let status = response.status();
        if !(status.is_success() || status == reqwest::StatusCode::NOT_MODIFIED) {
            tracing::debug!(%request_id, %status, "http failure");
            return Err(self.fail(RequestError::from_status(status.as_u16())));
        }

        let envelope: Value = match response.json().await {
            Ok(value) => value,
            Err(e) => return Err(self.fail(RequestError::other(&e.to_string()))),
        };

        let data = unwrap_envelope(envelope, &self.backend).map_err(|e| self.fail(e))?;
        serde_json::from_value(data).map_err(|e| self.fail(RequestError::other(&e.to_string())))
    }

    /// Single funnel for every classified failure: show it through the
    /// presenter and arm the expiry prompt for designated backend codes.
    fn fail(&self, error: RequestError) -> RequestError {
        self.presenter.show(&error);

        if error.kind == RequestErrorKind::Backend
            && self.backend.expired_codes.contains(&error.code)
            && self.expiry.try_begin()
        {
            let handler = self.expiry_handler.lock().expect("handler lock").clone();
            match handler {
                Some(handler) => handler.on_expired(&error),
                None => self.expiry.finish(),
            }
        }

        error
    }
}

/// Pull the payload out of a backend envelope, or classify the embedded
/// business error.
fn unwrap_envelope(envelope: Value, backend: &BackendConfig) -> Result<Value, RequestError> {
    let code = envelope
        .get(&backend.code_key)
        .map(Code::from_value)
        .unwrap_or_else(|| Code::Text("UNKNOWN".to_string()));

    if backend.success_codes.contains(&code) {
        return Ok(envelope
            .get(&backend.data_key)
            .cloned()
            .unwrap_or(Value::Null));
    }

    let msg = envelope
        .get(&backend.msg_key)
        .and_then(Value::as_str)
        .unwrap_or(error::DEFAULT_ERROR_MSG)
        .to_string();

    Err(RequestError::from_backend(code, msg))
}
