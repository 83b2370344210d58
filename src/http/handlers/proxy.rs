//! Reverse-proxy routes.
//!
//! The effective target is the configured base URL with the request sub-path
//! appended, or, when no base is configured, the sub-path itself spelled as
//! an absolute URL (`/proxy/https://example.com/...`). Validation happens
//! before any network call; the upstream call runs under the per-call budget
//! (`timeout_ms`, overridable per request) inside a hard outer deadline with
//! a fixed margin, so a hung upstream can never pin the request. Dropping
//! the response future on timeout releases the outbound connection.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, Uri};
use axum::response::{IntoResponse, Response};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;

use crate::http::error::HandlerError;

pub type ProxyClient = Client<HttpConnector, Body>;

/// Captured configuration of one proxy route.
#[derive(Debug, Clone)]
pub struct ProxyRouteData {
    pub mount: String,
    pub target_url: String,
    pub preserve_host_header: bool,
    pub timeout_ms: u64,
}

/// Control headers understood (and consumed) by the proxy itself.
const PROXY_HEADER_PREFIX: &str = "x-proxy-";
const TIMEOUT_HEADER: &str = "x-proxy-timeout";
const RENDER_HEADER: &str = "x-proxy-render";

/// Margin added on top of the upstream budget for the hard outer timeout.
const OUTER_TIMEOUT_MARGIN_MS: u64 = 5_000;

/// Request body cap when forwarding mutating methods.
const MAX_FORWARD_BODY: usize = 10 * 1024 * 1024;

pub async fn handle_proxy(
    client: &ProxyClient,
    data: &ProxyRouteData,
    request: Request<Body>,
) -> Result<Response, HandlerError> {
    if header_flag(&request, RENDER_HEADER) {
        return Err(HandlerError::NotImplemented(
            "Rendering is not implemented".to_string(),
        ));
    }

    let timeout_ms = request
        .headers()
        .get(TIMEOUT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(data.timeout_ms);

    let target = resolve_target(data, request.uri())?;
    let target_uri: Uri = target.parse().map_err(|_| {
        HandlerError::BadRequest(format!("Invalid target URL: {target}"))
    })?;

    let method = request.method().clone();
    let forward_body = matches!(method, Method::POST | Method::PUT | Method::PATCH);

    let (parts, body) = request.into_parts();
    let body_bytes = if forward_body {
        Some(
            axum::body::to_bytes(body, MAX_FORWARD_BODY)
                .await
                .map_err(|e| HandlerError::BadRequest(format!("Unreadable request body: {e}")))?,
        )
    } else {
        None
    };

    let mut outbound = Request::builder().method(method).uri(target_uri);
    if let Some(headers) = outbound.headers_mut() {
        for (name, value) in parts.headers.iter() {
            let name_str = name.as_str();
            if name_str.starts_with(PROXY_HEADER_PREFIX) {
                continue;
            }
            if *name == header::CONNECTION || *name == header::CONTENT_LENGTH {
                continue;
            }
            if *name == header::HOST && !data.preserve_host_header {
                continue;
            }
            headers.insert(name.clone(), value.clone());
        }
    }
    let outbound = outbound
        .body(match body_bytes {
            Some(bytes) => Body::from(bytes),
            None => Body::empty(),
        })
        .map_err(|e| HandlerError::Internal(format!("Failed to build proxy request: {e}")))?;

    // Two bounds: the per-call budget is what the route (or the header)
    // asked for and expires as a 502 at exactly that budget; the outer
    // deadline with a fixed margin is the hard stop for everything else.
    let inner = Duration::from_millis(timeout_ms);
    let outer = Duration::from_millis(timeout_ms.saturating_add(OUTER_TIMEOUT_MARGIN_MS));
    let call = async {
        match tokio::time::timeout(inner, client.request(outbound)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(HandlerError::BadGateway(format!(
                "Proxy request failed: {e}"
            ))),
            Err(_) => Err(HandlerError::BadGateway(format!(
                "Proxy request timed out after {timeout_ms}ms"
            ))),
        }
    };
    let upstream = match tokio::time::timeout(outer, call).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(HandlerError::BadGateway(format!(
                "Proxy request timed out after {timeout_ms}ms"
            )))
        }
    };

    // Echo upstream status, headers and body, minus hop-by-hop headers.
    let (mut parts, body) = upstream.into_parts();
    parts.headers.remove(header::TRANSFER_ENCODING);
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.remove(header::CONNECTION);
    Ok(Response::from_parts(parts, Body::new(body)).into_response())
}

/// Resolve and validate the absolute target URL. Always runs before any
/// network activity; failures are 400s.
fn resolve_target(data: &ProxyRouteData, uri: &Uri) -> Result<String, HandlerError> {
    let sub_path = uri
        .path()
        .strip_prefix(data.mount.as_str())
        .unwrap_or(uri.path())
        .trim_start_matches('/');

    let mut target = if data.target_url.is_empty() {
        if sub_path.is_empty() {
            return Err(HandlerError::BadRequest(format!(
                "Target URL is required after {}/",
                data.mount
            )));
        }
        sub_path.to_string()
    } else if sub_path.is_empty() {
        data.target_url.clone()
    } else {
        format!("{}/{}", data.target_url.trim_end_matches('/'), sub_path)
    };

    if !target.starts_with("http://") && !target.starts_with("https://") {
        return Err(HandlerError::BadRequest(
            "Invalid target URL. Must start with http:// or https://".to_string(),
        ));
    }
    if url::Url::parse(&target).is_err() {
        return Err(HandlerError::BadRequest(format!(
            "Invalid target URL: {target}"
        )));
    }

    if let Some(query) = uri.query() {
        target.push('?');
        target.push_str(query);
    }
    Ok(target)
}

fn header_flag(request: &Request<Body>, name: &str) -> bool {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(mount: &str, target_url: &str) -> ProxyRouteData {
        ProxyRouteData {
            mount: mount.to_string(),
            target_url: target_url.to_string(),
            preserve_host_header: false,
            timeout_ms: 30_000,
        }
    }

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn test_path_spelled_target() {
        let target = resolve_target(
            &data("/api/proxy", ""),
            &uri("/api/proxy/https://example.com/x"),
        )
        .unwrap();
        assert_eq!(target, "https://example.com/x");
    }

    #[test]
    fn test_configured_base_plus_sub_path() {
        let target = resolve_target(
            &data("/upstream", "https://backend.internal/api"),
            &uri("/upstream/v1/things?limit=5"),
        )
        .unwrap();
        assert_eq!(target, "https://backend.internal/api/v1/things?limit=5");
    }

    #[test]
    fn test_missing_scheme_rejected_before_network() {
        let err = resolve_target(
            &data("/api/proxy", ""),
            &uri("/api/proxy/example.com/x"),
        )
        .unwrap_err();
        assert!(matches!(err, HandlerError::BadRequest(_)));

        let err = resolve_target(&data("/upstream", "ftp://backend"), &uri("/upstream/x"))
            .unwrap_err();
        assert!(matches!(err, HandlerError::BadRequest(_)));
    }

    #[test]
    fn test_empty_sub_path_without_base_rejected() {
        let err = resolve_target(&data("/api/proxy", ""), &uri("/api/proxy")).unwrap_err();
        match err {
            HandlerError::BadRequest(message) => {
                assert!(message.contains("Target URL is required"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upstream_budget_expires_as_bad_gateway() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept connections and hold them open without ever answering.
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let _socket = socket;
                    tokio::time::sleep(Duration::from_secs(30)).await;
                });
            }
        });

        let client: ProxyClient =
            Client::builder(hyper_util::rt::TokioExecutor::new()).build(HttpConnector::new());
        let mut route = data("/proxy", &format!("http://{addr}"));
        route.timeout_ms = 200;
        let request = Request::builder()
            .uri("/proxy/x")
            .body(Body::empty())
            .unwrap();

        let started = std::time::Instant::now();
        let err = handle_proxy(&client, &route, request).await.unwrap_err();
        assert!(matches!(err, HandlerError::BadGateway(_)));
        // The per-call budget fires, not the outer margin seconds later.
        assert!(
            started.elapsed() < Duration::from_secs(2),
            "502 took {:?}",
            started.elapsed()
        );
    }

    #[tokio::test]
    async fn test_render_mode_not_implemented() {
        let client: ProxyClient =
            Client::builder(hyper_util::rt::TokioExecutor::new()).build(HttpConnector::new());
        let request = Request::builder()
            .uri("/api/proxy/https://example.com")
            .header(RENDER_HEADER, "true")
            .body(Body::empty())
            .unwrap();

        let err = handle_proxy(&client, &data("/api/proxy", ""), request)
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::NotImplemented(_)));
    }
}
