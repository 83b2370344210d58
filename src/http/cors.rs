//! CORS policy installation.
//!
//! Built once per listener build from the snapshot's [`CorsConfiguration`].
//! Host entries are matched against the origin's host component, so one
//! configured host covers both schemes and any port.

use axum::http::{HeaderName, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::CorsConfiguration;

pub fn build_cors_layer(config: &CorsConfiguration) -> CorsLayer {
    let mut layer = CorsLayer::new();

    layer = if config.allow_any_host {
        if config.allow_credentials {
            // `Any` + credentials is rejected by tower-http; mirroring the
            // request origin keeps the permissive behavior valid.
            layer.allow_origin(AllowOrigin::mirror_request())
        } else {
            layer.allow_origin(Any)
        }
    } else {
        let hosts: Vec<String> = config
            .allowed_hosts
            .iter()
            .map(|h| h.to_ascii_lowercase())
            .collect();
        layer.allow_origin(AllowOrigin::predicate(move |origin, _| {
            origin
                .to_str()
                .ok()
                .map(|o| hosts.iter().any(|h| origin_matches_host(o, h)))
                .unwrap_or(false)
        }))
    };

    let methods: Vec<Method> = config
        .allowed_methods
        .iter()
        .filter_map(|m| Method::from_bytes(m.to_ascii_uppercase().as_bytes()).ok())
        .collect();
    if !methods.is_empty() {
        layer = layer.allow_methods(methods);
    }

    let headers: Vec<HeaderName> = config
        .allowed_headers
        .iter()
        .filter_map(|h| HeaderName::from_bytes(h.as_bytes()).ok())
        .collect();
    if !headers.is_empty() {
        layer = layer.allow_headers(headers);
    }

    if config.allow_credentials {
        layer = layer.allow_credentials(true);
    }

    layer
}

/// Compare an `Origin` header value against a configured host, ignoring
/// scheme and port.
fn origin_matches_host(origin: &str, host: &str) -> bool {
    let without_scheme = origin
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(origin);
    let origin_host = without_scheme
        .split(|c| c == ':' || c == '/')
        .next()
        .unwrap_or(without_scheme);
    origin_host.eq_ignore_ascii_case(host)
}
