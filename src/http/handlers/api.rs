//! Fixed-response routes.

use std::collections::BTreeMap;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// Captured configuration of one api route.
#[derive(Debug, Clone)]
pub struct ApiRouteData {
    pub body: String,
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
}

/// Write global custom headers first, then per-route headers (so per-route
/// wins on conflict), then body and status verbatim. An empty body is valid.
pub fn api_response(
    data: &ApiRouteData,
    custom_headers: &BTreeMap<String, String>,
) -> Response {
    let status = StatusCode::from_u16(data.status_code).unwrap_or(StatusCode::OK);

    let mut headers = HeaderMap::new();
    append_headers(&mut headers, custom_headers);
    append_headers(&mut headers, &data.headers);
    if !headers.contains_key(header::CONTENT_TYPE) {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
    }

    (status, headers, data.body.clone()).into_response()
}

fn append_headers(target: &mut HeaderMap, source: &BTreeMap<String, String>) {
    for (key, value) in source {
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                target.insert(name, value);
            }
            _ => {
                tracing::warn!(header = %key, "Skipping unrepresentable custom header");
            }
        }
    }
}
