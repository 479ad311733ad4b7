use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_ERROR_CODE: &str = "ERROR";
pub const DEFAULT_ERROR_MSG: &str = "Request error, please try again later";
pub const NETWORK_ERROR_CODE: &str = "NETWORK_ERROR";
pub const NETWORK_ERROR_MSG: &str = "Network unavailable, please check your connection";
pub const TIMEOUT_ERROR_CODE: &str = "REQUEST_TIMEOUT";
pub const TIMEOUT_ERROR_MSG: &str = "Request timed out";

/// Messages for failing HTTP status codes. Unmapped codes fall back to
/// [`DEFAULT_ERROR_MSG`].
pub static ERROR_STATUS: Lazy<HashMap<u16, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (400, "Bad request parameters"),
        (401, "Not authenticated"),
        (403, "Access denied"),
        (404, "Resource not found"),
        (405, "Method not allowed"),
        (408, "Request timed out"),
        (409, "Resource conflict"),
        (429, "Too many requests"),
        (500, "Server error"),
        (501, "Not implemented by the server"),
        (502, "Bad gateway"),
        (503, "Service unavailable"),
        (504, "Gateway timeout"),
        (505, "HTTP version not supported"),
    ])
});

/// Backend status codes are numbers on some backends and strings (e.g.
/// `"A0230"`) on others; keep both shapes envelope-faithful.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Code {
    Num(i64),
    Text(String),
}

impl Code {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(n) => Code::Num(n),
                None => Code::Text(n.to_string()),
            },
            Value::String(s) => Code::Text(s.clone()),
            other => Code::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::Num(n) => write!(f, "{}", n),
            Code::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Code {
    fn from(n: i64) -> Self {
        Code::Num(n)
    }
}

impl From<&str> for Code {
    fn from(s: &str) -> Self {
        Code::Text(s.to_string())
    }
}

/// Where a request failure was classified:
///
/// - `Transport`: no response reached us (offline, timeout, broken body)
/// - `Http`: a response arrived with a failing HTTP status
/// - `Backend`: HTTP succeeded but the envelope carried a business error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestErrorKind {
    Transport,
    Http,
    Backend,
}

impl fmt::Display for RequestErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestErrorKind::Transport => write!(f, "transport"),
            RequestErrorKind::Http => write!(f, "http"),
            RequestErrorKind::Backend => write!(f, "backend"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("[{kind}] {code}: {msg}")]
pub struct RequestError {
    pub kind: RequestErrorKind,
    pub code: Code,
    pub msg: String,
}

impl RequestError {
    /// Classify a transport-level failure: offline, timeout, or generic.
    pub fn from_transport(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self {
                kind: RequestErrorKind::Transport,
                code: TIMEOUT_ERROR_CODE.into(),
                msg: TIMEOUT_ERROR_MSG.to_string(),
            }
        } else if error.is_connect() {
            Self {
                kind: RequestErrorKind::Transport,
                code: NETWORK_ERROR_CODE.into(),
                msg: NETWORK_ERROR_MSG.to_string(),
            }
        } else {
            Self {
                kind: RequestErrorKind::Transport,
                code: DEFAULT_ERROR_CODE.into(),
                msg: DEFAULT_ERROR_MSG.to_string(),
            }
        }
    }

    /// A response arrived with a failing HTTP status; message comes from
    /// the status table with a default fallback.
    pub fn from_status(status: u16) -> Self {
        let msg = ERROR_STATUS
            .get(&status)
            .copied()
            .unwrap_or(DEFAULT_ERROR_MSG);
        Self {
            kind: RequestErrorKind::Http,
            code: Code::Num(i64::from(status)),
            msg: msg.to_string(),
        }
    }

    /// A 2xx response whose envelope code is outside the success set.
    pub fn from_backend(code: Code, msg: String) -> Self {
        Self {
            kind: RequestErrorKind::Backend,
            code,
            msg,
        }
    }

    /// Client-side failure: unbuildable request or unreadable body.
    pub fn other(detail: &str) -> Self {
        Self {
            kind: RequestErrorKind::Transport,
            code: DEFAULT_ERROR_CODE.into(),
            msg: format!("{}: {}", DEFAULT_ERROR_MSG, detail),
        }
    }
}
