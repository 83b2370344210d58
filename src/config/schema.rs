//! Configuration schema definitions.
//!
//! Two layers: [`Settings`] is the raw, independently-editable input shape
//! (port as a string, CORS hosts as one comma-separated string), exactly as
//! an external settings store hands it over. [`ServerConfiguration`] is the
//! fully-resolved immutable snapshot the listener is built from; it only
//! exists as an output of the assembler.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::routes::Route;

/// Fallback when the stored port is unparseable or out of range.
pub const DEFAULT_PORT: u16 = 8080;

/// Raw settings as stored/edited externally. All fields have defaults so a
/// minimal or missing settings file still yields a working server.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Listen port, kept as the raw string the user typed.
    pub port: String,

    /// Enable the request-logging interceptor.
    pub enable_logs: bool,

    /// CORS settings, raw.
    pub cors: CorsSettings,

    /// Per-built-in-route enablement.
    pub builtin: BuiltinToggles,

    /// Headers appended to every api/status response.
    pub custom_headers: BTreeMap<String, String>,

    /// User-declared routes.
    pub routes: Vec<Route>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            enable_logs: true,
            cors: CorsSettings::default(),
            builtin: BuiltinToggles::default(),
            custom_headers: BTreeMap::new(),
            routes: Vec::new(),
        }
    }
}

/// Raw CORS settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CorsSettings {
    pub allow_any_host: bool,

    /// Comma-separated host list; parsed and filtered during assembly.
    pub allowed_hosts: String,

    pub allowed_methods: Vec<String>,

    pub allowed_headers: Vec<String>,

    pub allow_credentials: bool,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allow_any_host: false,
            allowed_hosts: String::new(),
            allowed_methods: ["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"]
                .map(String::from)
                .to_vec(),
            allowed_headers: ["Content-Type", "Authorization"].map(String::from).to_vec(),
            allow_credentials: false,
        }
    }
}

/// Enablement toggles for the built-in catalog.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BuiltinToggles {
    pub enable_status: bool,
    pub enable_docs: bool,
    pub enable_notify: bool,
}

impl Default for BuiltinToggles {
    fn default() -> Self {
        Self {
            enable_status: true,
            enable_docs: true,
            enable_notify: true,
        }
    }
}

/// Resolved CORS policy carried by a configuration snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CorsConfiguration {
    pub allow_any_host: bool,
    pub allowed_hosts: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
}

/// Immutable listener configuration snapshot.
///
/// Recomputed whole on any input change, never mutated in place. `routes` is
/// already filtered by `enabled` and sorted by ascending `order`. `PartialEq`
/// lets the lifecycle manager decide whether a running listener needs a
/// restart.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfiguration {
    pub port: u16,
    pub enable_logs: bool,
    pub cors: CorsConfiguration,
    pub custom_headers: BTreeMap<String, String>,
    pub routes: Vec<Route>,
}

impl Default for ServerConfiguration {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            enable_logs: true,
            cors: CorsConfiguration::default(),
            custom_headers: BTreeMap::new(),
            routes: Vec::new(),
        }
    }
}
