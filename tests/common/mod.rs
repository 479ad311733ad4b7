//! In-process mock backend serving the envelope contract the shell
//! expects, bound to a free port per test binary.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Form, Json, Router};
use serde_json::{json, Value};

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "secret";
pub const TOKEN: &str = "tok-alice";

#[derive(Default)]
pub struct BackendState {
    pub login_calls: AtomicUsize,
    pub manifest_calls: AtomicUsize,
    /// When set, identity requests answer with the expired-session code.
    pub expire_sessions: AtomicBool,
}

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<BackendState>,
}

pub async fn spawn() -> MockBackend {
    let state = Arc::new(BackendState::default());
    let app = router(state.clone());

    let port = portpicker::pick_unused_port().expect("failed to pick free port");
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .expect("failed to bind mock backend");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock backend");
    });

    MockBackend {
        base_url: format!("http://127.0.0.1:{}", port),
        state,
    }
}

fn router(state: Arc<BackendState>) -> Router {
    Router::new()
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/logout", delete(logout))
        .route("/api/v1/users/me", get(user_info))
        .route("/api/v1/menus/routes", get(route_manifest))
        .route("/api/v1/echo-auth", get(echo_auth))
        .route("/api/v1/boom", get(boom))
        .route("/api/v1/teapot", get(teapot))
        .with_state(state)
}

fn ok(data: Value) -> Json<Value> {
    Json(json!({ "code": 200, "data": data, "message": "ok" }))
}

fn err(code: &str, msg: &str) -> Json<Value> {
    Json(json!({ "code": code, "data": null, "message": msg }))
}

async fn login(
    State(state): State<Arc<BackendState>>,
    Form(fields): Form<HashMap<String, String>>,
) -> Json<Value> {
    state.login_calls.fetch_add(1, Ordering::SeqCst);

    let username = fields.get("username").map(String::as_str).unwrap_or("");
    let password = fields.get("password").map(String::as_str).unwrap_or("");

    if username == USERNAME && password == PASSWORD {
        ok(json!({
            "accessToken": TOKEN,
            "tokenType": "Bearer",
            "refreshToken": "refresh-alice"
        }))
    } else {
        err("A0210", "username or password is incorrect")
    }
}

async fn logout() -> Json<Value> {
    ok(Value::Null)
}

async fn user_info(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
) -> Json<Value> {
    if state.expire_sessions.load(Ordering::SeqCst) {
        return err("A0230", "token expired");
    }

    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TOKEN))
        .unwrap_or(false);

    if !authorized {
        return err("A0230", "token invalid");
    }

    ok(json!({
        "userId": "1",
        "username": USERNAME,
        "nickname": "Alice",
        "roles": ["ADMIN"],
        "perms": ["sys:user:query"]
    }))
}

async fn route_manifest(State(state): State<Arc<BackendState>>) -> Json<Value> {
    state.manifest_calls.fetch_add(1, Ordering::SeqCst);

    ok(json!([
        {
            "name": "manage",
            "path": "/manage",
            "component": "Layout",
            "redirect": "/manage/user",
            "meta": { "title": "manage", "roles": ["ADMIN"], "icon": "carbon:cloud-service-management" },
            "children": [
                {
                    "name": "manage_user",
                    "path": "/manage/user",
                    "component": "manage/user/index",
                    "meta": { "title": "manage_user", "roles": ["ADMIN"], "keepAlive": true }
                },
                {
                    "name": "manage_root",
                    "path": "/manage/root",
                    "component": "manage/root/index",
                    "meta": { "title": "manage_root", "roles": ["ROOT"] }
                }
            ]
        }
    ]))
}

async fn echo_auth(headers: HeaderMap) -> Json<Value> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    ok(json!({ "authorization": auth }))
}

async fn boom() -> Json<Value> {
    err("B0001", "backend exploded")
}

async fn teapot() -> (StatusCode, Json<Value>) {
    (StatusCode::IM_A_TEAPOT, Json(json!({ "short": "stout" })))
}
