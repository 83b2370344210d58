//! Directory serving with browsing and index-file resolution.
//!
//! The requested sub-path is resolved segment by segment against the
//! configured base directory; a missing intermediate segment anywhere is a
//! 404. Resolved files stream; resolved directories try the index file, then
//! an HTML listing (when browsing is allowed), then 403.

use std::path::{Path, PathBuf};

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::http::error::HandlerError;
use crate::http::handlers::static_file::{guess_content_type, stream_file};

/// Captured configuration of one directory route.
#[derive(Debug, Clone)]
pub struct DirectoryRouteData {
    /// Mount path of the route, e.g. `/files`.
    pub mount: String,
    pub dir_path: PathBuf,
    pub allow_browsing: bool,
    pub index_file: Option<String>,
}

/// Serve the given sub-path (already stripped of the mount prefix).
pub async fn serve_directory(
    data: &DirectoryRouteData,
    relative_path: &str,
) -> Result<Response, HandlerError> {
    let target = resolve_target(&data.dir_path, relative_path).await?;

    let metadata = tokio::fs::metadata(&target)
        .await
        .map_err(|_| HandlerError::NotFound("Path not found".to_string()))?;

    if metadata.is_file() {
        let content_type = guess_content_type(&target);
        return stream_file(&target, metadata.len(), &content_type).await;
    }

    // Directory: index file first, listing second, 403 otherwise.
    if let Some(index_name) = &data.index_file {
        if is_plain_name(index_name) {
            let index_path = target.join(index_name);
            if let Ok(index_meta) = tokio::fs::metadata(&index_path).await {
                if index_meta.is_file() {
                    let content_type = guess_content_type(&index_path);
                    return stream_file(&index_path, index_meta.len(), &content_type).await;
                }
            }
        }
    }

    if !data.allow_browsing {
        return Err(HandlerError::Forbidden(
            "Directory browsing is disabled".to_string(),
        ));
    }

    let listing = generate_listing(&target, &data.mount, relative_path)
        .await
        .map_err(|e| HandlerError::Internal(format!("Error accessing path: {e}")))?;

    let mut response = (StatusCode::OK, listing).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Ok(response)
}

/// Walk the sub-path segments below the base directory. Every segment must
/// be a plain name; `..`, `.` and empty segments are treated as missing.
async fn resolve_target(base: &Path, relative_path: &str) -> Result<PathBuf, HandlerError> {
    let mut current = base.to_path_buf();
    if relative_path.is_empty() {
        return Ok(current);
    }

    for segment in relative_path.split('/') {
        if !is_plain_name(segment) {
            return Err(HandlerError::NotFound("Path not found".to_string()));
        }
        current.push(segment);
        if tokio::fs::metadata(&current).await.is_err() {
            return Err(HandlerError::NotFound("Path not found".to_string()));
        }
    }
    Ok(current)
}

fn is_plain_name(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
}

struct ListingEntry {
    name: String,
    is_dir: bool,
    size: u64,
}

/// Render the HTML listing: directories first, then names ascending, with a
/// parent link when not at the route root and file sizes in bytes.
async fn generate_listing(
    directory: &Path,
    base_path: &str,
    relative_path: &str,
) -> std::io::Result<String> {
    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(directory).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let metadata = entry.metadata().await?;
        entries.push(ListingEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir: metadata.is_dir(),
            size: metadata.len(),
        });
    }
    entries.sort_by(|a, b| (!a.is_dir, &a.name).cmp(&(!b.is_dir, &b.name)));

    let current_path = if relative_path.is_empty() {
        base_path.to_string()
    } else {
        format!("{base_path}/{relative_path}")
    };

    let mut html = String::new();
    html.push_str("<!DOCTYPE html><html><head><title>Directory listing for ");
    html.push_str(&escape_html(&current_path));
    html.push_str("</title>");
    html.push_str(
        "<style>body{font-family:monospace;margin:40px;}\
         a{text-decoration:none;color:#0066cc;}a:hover{text-decoration:underline;}\
         .dir{font-weight:bold;}</style>",
    );
    html.push_str("</head><body><h1>Directory listing for ");
    html.push_str(&escape_html(&current_path));
    html.push_str("</h1><hr>");

    if !relative_path.is_empty() {
        let parent = match relative_path.rsplit_once('/') {
            Some((parent, _)) => format!("{base_path}/{parent}"),
            None => base_path.to_string(),
        };
        html.push_str(&format!(
            "<a href=\"{}/\">[Parent Directory]</a><br><br>",
            escape_html(&parent)
        ));
    }

    for entry in &entries {
        let href = if relative_path.is_empty() {
            format!("{base_path}/{}", entry.name)
        } else {
            format!("{base_path}/{relative_path}/{}", entry.name)
        };
        let display = if entry.is_dir {
            format!("{}/", entry.name)
        } else {
            entry.name.clone()
        };
        let css = if entry.is_dir { "dir" } else { "" };

        html.push_str(&format!(
            "<a href=\"{}\" class=\"{css}\">{}</a>",
            escape_html(&href),
            escape_html(&display)
        ));
        if !entry.is_dir {
            html.push_str(&format!(" ({} bytes)", entry.size));
        }
        html.push_str("<br>");
    }

    html.push_str("<hr></body></html>");
    Ok(html)
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
