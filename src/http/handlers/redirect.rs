//! Redirect routes.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// Issue a redirect with the configured status code. Codes outside the
/// redirect range coerce to 302; permanence is whatever the code implies.
pub fn redirect_response(target_url: &str, status_code: u16) -> Response {
    let status = StatusCode::from_u16(status_code)
        .ok()
        .filter(StatusCode::is_redirection)
        .unwrap_or(StatusCode::FOUND);

    let location = HeaderValue::from_str(target_url)
        .unwrap_or_else(|_| HeaderValue::from_static("/"));

    (status, [(header::LOCATION, location)]).into_response()
}
