//! Per-request error mapping.
//!
//! # Responsibilities
//! - Map handler failures to HTTP status codes with structured JSON bodies
//! - Keep every error response carrying a short `error` message field
//! - Bound internal diagnostics; never a raw stack trace to the client
//!
//! # Design Decisions
//! - Errors never cross from one request into listener-wide state; only
//!   build/bind errors (lifecycle) touch shared status
//! - Structured payloads are pretty-printed JSON

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured failure payload carried by every error response.
#[derive(Debug, Serialize)]
pub struct Failure {
    pub error: String,
}

/// Structured success payload for built-in endpoints.
#[derive(Debug, Serialize)]
pub struct Success<T: Serialize> {
    pub data: T,
}

/// Build a pretty-printed JSON response. Serialization of these payloads
/// cannot fail; the fallback branch exists for the type system.
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response {
    match serde_json::to_string_pretty(value) {
        Ok(body) => (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

const MAX_INTERNAL_DETAIL: usize = 300;

/// Failure taxonomy for request handling.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    NotImplemented(String),
    #[error("{0}")]
    BadGateway(String),
    #[error("{0}")]
    Internal(String),
}

impl HandlerError {
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HandlerError::Forbidden(_) => StatusCode::FORBIDDEN,
            HandlerError::NotFound(_) => StatusCode::NOT_FOUND,
            HandlerError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            HandlerError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            HandlerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut message = self.to_string();
        if matches!(self, HandlerError::Internal(_)) {
            message.truncate(MAX_INTERNAL_DETAIL);
        }
        json_response(status, &Failure { error: message })
    }
}

/// Map an uncaught handler panic to the structured 500 payload. Installed
/// once per router build via the catch-panic layer.
pub fn panic_response(panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "panic of unknown type".to_string()
    };
    tracing::error!(%detail, "Handler panicked");
    HandlerError::Internal(format!("Unhandled error: {detail}")).into_response()
}

/// Fallback for requests no route matched.
pub async fn not_found_fallback() -> Response {
    json_response(
        StatusCode::NOT_FOUND,
        &Failure {
            error: "No matching route found".to_string(),
        },
    )
}
