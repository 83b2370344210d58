//! Single-file serving.
//!
//! The file handle is resolved at request time, never at declaration time:
//! a file that disappeared or became unreadable between the route being
//! declared and the request arriving is a per-request 404, not a build error.

use std::path::Path;

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio_util::io::ReaderStream;

use crate::http::error::HandlerError;

/// Serve one configured file with a not-cacheable response.
pub async fn serve_static_file(
    file_path: &Path,
    mime_type: Option<&str>,
) -> Result<Response, HandlerError> {
    let metadata = tokio::fs::metadata(file_path).await.map_err(|_| {
        HandlerError::NotFound(format!(
            "File not found or unreadable: {}",
            file_path.display()
        ))
    })?;
    if !metadata.is_file() {
        return Err(HandlerError::NotFound(format!(
            "Not a regular file: {}",
            file_path.display()
        )));
    }

    let content_type = mime_type
        .map(String::from)
        .unwrap_or_else(|| guess_content_type(file_path));

    stream_file(file_path, metadata.len(), &content_type).await
}

/// Stream a file body with Content-Type, Content-Length and no-cache headers.
/// Shared by the static-file and directory handlers.
pub async fn stream_file(
    path: &Path,
    length: u64,
    content_type: &str,
) -> Result<Response, HandlerError> {
    let file = tokio::fs::File::open(path).await.map_err(|_| {
        HandlerError::NotFound(format!("File not found or unreadable: {}", path.display()))
    })?;

    let body = Body::from_stream(ReaderStream::new(file));
    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Ok(response)
}

pub fn guess_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string()
}
