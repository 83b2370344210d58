//! Built-in administrative routes: status, docs, notify.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use serde_json::json;

use crate::config::ServerConfiguration;
use crate::http::error::{json_response, HandlerError, Success};
use crate::notify::{NotificationRequest, StatusNotifier};
use crate::routes::model::{is_permanent_redirect, RouteKind};

/// Fixed success payload; honors global custom headers.
pub fn status_response(custom_headers: &BTreeMap<String, String>) -> Response {
    let mut response = json_response(StatusCode::OK, &Success {
        data: json!({ "status": "ok" }),
    });
    for (key, value) in custom_headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            response.headers_mut().insert(name, value);
        }
    }
    response
}

/// Machine-readable documentation synthesized from the installed route set.
pub fn docs_response(config: &ServerConfiguration) -> Response {
    let mut paths = serde_json::Map::new();
    for route in &config.routes {
        let entry = paths
            .entry(route.path.clone())
            .or_insert_with(|| json!({}));
        if let Some(methods) = entry.as_object_mut() {
            let mut operation = json!({
                "summary": route.description,
                "x-route-id": route.id,
                "x-route-type": route.kind.name(),
            });
            if let RouteKind::Redirect { status_code, .. } = &route.kind {
                operation["x-permanent"] = json!(is_permanent_redirect(*status_code));
            }
            methods.insert(route.method.as_str().to_lowercase(), operation);
        }
    }

    let document = json!({
        "openapi": "3.0.0",
        "info": {
            "title": "route-server",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "paths": paths,
    });
    json_response(StatusCode::OK, &document)
}

/// Device-notification trigger. The permission check runs before the body is
/// even parsed; validation failures carry the specific field message.
pub fn handle_notify(
    notifier: &dyn StatusNotifier,
    body: Bytes,
) -> Result<Response, HandlerError> {
    if !notifier.can_post_device_notification() {
        return Err(HandlerError::Forbidden(
            "Notification permission required. Enable notifications in device settings."
                .to_string(),
        ));
    }

    let request: NotificationRequest = serde_json::from_slice(&body)
        .map_err(|e| HandlerError::BadRequest(format!("Invalid request format: {e}")))?;

    request.validate().map_err(HandlerError::BadRequest)?;

    let notification_id = notifier
        .post_device_notification(&request)
        .map_err(|e| HandlerError::Internal(format!("Failed to send notification: {e}")))?;

    Ok(json_response(StatusCode::OK, &Success {
        data: json!({
            "message": "Notification sent successfully",
            "notification_id": notification_id,
        }),
    }))
}
