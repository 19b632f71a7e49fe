// crates/api/src/error.rs
//! Error handling for the digest service client.

use serde_json::Value;
use thiserror::Error;

/// Errors returned by [`crate::DigestClient`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure: DNS, connect, TLS, or a body that could not
    /// be read or decoded. Carries no HTTP status.
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response. `message` is extracted from the error body where
    /// possible, otherwise a caller-supplied fallback naming the operation.
    #[error("{message}")]
    Server { status: u16, message: String },
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}

impl ApiError {
    /// HTTP status associated with the error; transport failures report 0.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Network(_) => 0,
            ApiError::Server { status, .. } => *status,
        }
    }

    /// Build a `Server` error from a non-2xx response, extracting the
    /// `detail` field from the body when present.
    pub(crate) async fn from_response(response: reqwest::Response, operation: &str) -> ApiError {
        let status = response.status().as_u16();
        let fallback = format!("Failed to {operation} ({status})");
        let body = response.json::<Value>().await.ok();
        ApiError::Server {
            status,
            message: parse_error_detail(body.as_ref(), &fallback),
        }
    }
}

/// Extract a human-readable message from a service error body.
///
/// The backend reports either `{"detail": "..."}` or
/// `{"detail": [{"msg": "..."}, ...]}` (field-validation form); both reduce
/// to one string. Anything else falls back to the supplied message.
pub fn parse_error_detail(body: Option<&Value>, fallback: &str) -> String {
    let Some(detail) = body.and_then(|b| b.get("detail")) else {
        return fallback.to_string();
    };
    match detail {
        Value::String(s) => s.clone(),
        Value::Array(entries) => {
            let msgs: Vec<&str> = entries
                .iter()
                .filter_map(|e| e.get("msg").and_then(Value::as_str))
                .collect();
            if msgs.is_empty() {
                fallback.to_string()
            } else {
                msgs.join("; ")
            }
        }
        _ => fallback.to_string(),
    }
}
