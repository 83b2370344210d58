//! Core route types.
//!
//! A [`Route`] is an immutable value describing one routable endpoint. Its
//! behavior lives in [`RouteKind`], a closed sum type: installation matches
//! on it exhaustively, so adding a variant without a handler arm is a compile
//! error rather than a runtime surprise.

use std::collections::BTreeMap;
use std::path::PathBuf;

use axum::routing::MethodFilter;
use serde::{Deserialize, Serialize};

/// HTTP method a route responds to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RouteMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl RouteMethod {
    pub fn filter(self) -> MethodFilter {
        match self {
            RouteMethod::Get => MethodFilter::GET,
            RouteMethod::Post => MethodFilter::POST,
            RouteMethod::Put => MethodFilter::PUT,
            RouteMethod::Delete => MethodFilter::DELETE,
            RouteMethod::Patch => MethodFilter::PATCH,
            RouteMethod::Head => MethodFilter::HEAD,
            RouteMethod::Options => MethodFilter::OPTIONS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RouteMethod::Get => "GET",
            RouteMethod::Post => "POST",
            RouteMethod::Put => "PUT",
            RouteMethod::Delete => "DELETE",
            RouteMethod::Patch => "PATCH",
            RouteMethod::Head => "HEAD",
            RouteMethod::Options => "OPTIONS",
        }
    }
}

/// One routable endpoint.
///
/// `id` is globally unique and stable across edits; `order` decides
/// installation precedence (ascending). Built-in routes use negative orders
/// so they are installed first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    pub id: String,
    pub path: String,
    pub method: RouteMethod,
    #[serde(default)]
    pub description: String,
    pub kind: RouteKind,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub order: i32,
}

fn default_enabled() -> bool {
    true
}

impl Route {
    /// True when the path is usable as a routing-tree mount point.
    pub fn has_valid_path(&self) -> bool {
        self.path.starts_with('/') && !self.path.contains(['{', '}'])
    }
}

/// Behavior variant of a route. Exactly one per route; edits replace the
/// whole route.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouteKind {
    /// Fixed response: configured headers, then body + status verbatim.
    Api {
        #[serde(default)]
        body: String,
        #[serde(default = "default_status")]
        status_code: u16,
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
    /// Single file, resolved lazily at request time.
    StaticFile {
        file_path: PathBuf,
        #[serde(default)]
        mime_type: Option<String>,
    },
    /// Directory tree with optional browsing and index-file resolution.
    Directory {
        dir_path: PathBuf,
        #[serde(default = "default_enabled")]
        allow_browsing: bool,
        #[serde(default = "default_index")]
        index_file: Option<String>,
    },
    /// Redirect to a fixed URL; 301/308 mean permanent.
    Redirect {
        target_url: String,
        #[serde(default = "default_redirect_status")]
        status_code: u16,
    },
    /// Reverse proxy to an upstream URL.
    Proxy {
        #[serde(default)]
        target_url: String,
        #[serde(default)]
        preserve_host_header: bool,
        #[serde(default = "default_proxy_timeout")]
        timeout_ms: u64,
    },
    /// Built-in: fixed success payload.
    Status,
    /// Built-in: machine-readable API documentation.
    Docs,
    /// Built-in: device notification trigger.
    Notify,
}

fn default_status() -> u16 {
    200
}

fn default_redirect_status() -> u16 {
    302
}

fn default_proxy_timeout() -> u64 {
    30_000
}

fn default_index() -> Option<String> {
    Some("index.html".to_string())
}

impl RouteKind {
    /// Built-in variants have fixed identity and no payload.
    pub fn is_built_in(&self) -> bool {
        matches!(self, RouteKind::Status | RouteKind::Docs | RouteKind::Notify)
    }

    /// Short name used in documentation output.
    pub fn name(&self) -> &'static str {
        match self {
            RouteKind::Api { .. } => "api",
            RouteKind::StaticFile { .. } => "static_file",
            RouteKind::Directory { .. } => "directory",
            RouteKind::Redirect { .. } => "redirect",
            RouteKind::Proxy { .. } => "proxy",
            RouteKind::Status => "status",
            RouteKind::Docs => "docs",
            RouteKind::Notify => "notify",
        }
    }
}

/// Redirect permanence is derived from the configured status code.
pub fn is_permanent_redirect(status_code: u16) -> bool {
    status_code == 301 || status_code == 308
}
