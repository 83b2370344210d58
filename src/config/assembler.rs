//! Configuration assembly.
//!
//! # Data Flow
//! ```text
//! SettingsStore (one watch channel per independently-changing input)
//!     port ─┐
//!     logs ─┤
//!     cors ─┼─→ assembler task: pure fold over the latest values
//!  builtin ─┤        → new immutable ServerConfiguration snapshot
//!  headers ─┤        → emitted on the output watch channel
//!   routes ─┘          (latest value is the replay for new subscribers)
//! ```
//!
//! # Design Decisions
//! - Assembly is a pure function; no side effects, never fails
//! - Invalid user input (bad port, malformed CORS host) is coerced to a safe
//!   default, not surfaced as an error
//! - The snapshot is recomputed whole; no incremental config mutation

use std::collections::BTreeMap;

use tokio::sync::watch;

use crate::config::schema::{
    BuiltinToggles, CorsConfiguration, CorsSettings, ServerConfiguration, Settings, DEFAULT_PORT,
};
use crate::routes::catalog::built_in_routes;
use crate::routes::{Route, RouteKind};

/// Holder of the raw configuration inputs. Each setter updates exactly one
/// input channel; the assembler reacts to whichever one changed.
///
/// This is the boundary to the external settings/storage collaborator: route
/// create/update/delete happens out there and arrives here as a whole new
/// list via [`SettingsStore::set_routes`].
pub struct SettingsStore {
    port: watch::Sender<String>,
    enable_logs: watch::Sender<bool>,
    cors: watch::Sender<CorsSettings>,
    builtin: watch::Sender<BuiltinToggles>,
    custom_headers: watch::Sender<BTreeMap<String, String>>,
    routes: watch::Sender<Vec<Route>>,
}

impl SettingsStore {
    pub fn new(initial: Settings) -> Self {
        Self {
            port: watch::channel(initial.port).0,
            enable_logs: watch::channel(initial.enable_logs).0,
            cors: watch::channel(initial.cors).0,
            builtin: watch::channel(initial.builtin).0,
            custom_headers: watch::channel(initial.custom_headers).0,
            routes: watch::channel(initial.routes).0,
        }
    }

    pub fn set_port(&self, raw: impl Into<String>) {
        let _ = self.port.send(raw.into());
    }

    pub fn set_enable_logs(&self, enabled: bool) {
        let _ = self.enable_logs.send(enabled);
    }

    pub fn set_cors(&self, cors: CorsSettings) {
        let _ = self.cors.send(cors);
    }

    pub fn set_builtin_toggles(&self, toggles: BuiltinToggles) {
        let _ = self.builtin.send(toggles);
    }

    pub fn set_custom_headers(&self, headers: BTreeMap<String, String>) {
        let _ = self.custom_headers.send(headers);
    }

    pub fn set_routes(&self, routes: Vec<Route>) {
        let _ = self.routes.send(routes);
    }

    /// Replace every input at once, e.g. after a settings-file reload.
    pub fn apply(&self, settings: Settings) {
        let _ = self.port.send(settings.port);
        let _ = self.enable_logs.send(settings.enable_logs);
        let _ = self.cors.send(settings.cors);
        let _ = self.builtin.send(settings.builtin);
        let _ = self.custom_headers.send(settings.custom_headers);
        let _ = self.routes.send(settings.routes);
    }

    fn snapshot_inputs(&self) -> Settings {
        Settings {
            port: self.port.borrow().clone(),
            enable_logs: *self.enable_logs.borrow(),
            cors: self.cors.borrow().clone(),
            builtin: *self.builtin.borrow(),
            custom_headers: self.custom_headers.borrow().clone(),
            routes: self.routes.borrow().clone(),
        }
    }
}

/// Spawn the assembler task. Returns the continuously-updating configuration
/// stream; the receiver always holds the most recent snapshot.
pub fn spawn_assembler(store: &SettingsStore) -> watch::Receiver<ServerConfiguration> {
    let (out_tx, out_rx) = watch::channel(assemble(&store.snapshot_inputs()));

    let mut port_rx = store.port.subscribe();
    let mut logs_rx = store.enable_logs.subscribe();
    let mut cors_rx = store.cors.subscribe();
    let mut builtin_rx = store.builtin.subscribe();
    let mut headers_rx = store.custom_headers.subscribe();
    let mut routes_rx = store.routes.subscribe();

    tokio::spawn(async move {
        loop {
            let changed = tokio::select! {
                r = port_rx.changed() => r,
                r = logs_rx.changed() => r,
                r = cors_rx.changed() => r,
                r = builtin_rx.changed() => r,
                r = headers_rx.changed() => r,
                r = routes_rx.changed() => r,
            };
            if changed.is_err() {
                // Settings store dropped; the stream ends with it.
                break;
            }

            let inputs = Settings {
                port: port_rx.borrow_and_update().clone(),
                enable_logs: *logs_rx.borrow_and_update(),
                cors: cors_rx.borrow_and_update().clone(),
                builtin: *builtin_rx.borrow_and_update(),
                custom_headers: headers_rx.borrow_and_update().clone(),
                routes: routes_rx.borrow_and_update().clone(),
            };

            let next = assemble(&inputs);
            let modified = out_tx.send_if_modified(|current| {
                if *current != next {
                    *current = next;
                    true
                } else {
                    false
                }
            });
            if modified {
                tracing::debug!("Configuration snapshot reassembled");
            }
            if out_tx.is_closed() {
                break;
            }
        }
    });

    out_rx
}

/// Pure transformation of raw inputs into one consistent snapshot.
pub fn assemble(settings: &Settings) -> ServerConfiguration {
    let mut routes: Vec<Route> = built_in_routes()
        .into_iter()
        .map(|mut route| {
            route.enabled = match route.kind {
                RouteKind::Status => settings.builtin.enable_status,
                RouteKind::Docs => settings.builtin.enable_docs,
                RouteKind::Notify => settings.builtin.enable_notify,
                _ => route.enabled,
            };
            route
        })
        .collect();

    for route in &settings.routes {
        if !route.has_valid_path() {
            tracing::warn!(id = %route.id, path = %route.path, "Skipping route with invalid path");
            continue;
        }
        routes.push(route.clone());
    }

    routes.retain(|route| route.enabled);
    // Stable sort: declaration order breaks order ties deterministically.
    routes.sort_by_key(|route| route.order);

    ServerConfiguration {
        port: validate_port(&settings.port),
        enable_logs: settings.enable_logs,
        cors: build_cors_configuration(&settings.cors),
        custom_headers: settings.custom_headers.clone(),
        routes,
    }
}

/// Parse the stored port string, substituting the default for anything
/// unparseable or outside `[1024, 65535]`. Never an error.
pub fn validate_port(raw: &str) -> u16 {
    match raw.trim().parse::<u32>() {
        Ok(port) if (1024..=65535).contains(&port) => port as u16,
        _ => DEFAULT_PORT,
    }
}

fn build_cors_configuration(settings: &CorsSettings) -> CorsConfiguration {
    CorsConfiguration {
        allow_any_host: settings.allow_any_host,
        allowed_hosts: parse_cors_hosts(&settings.allowed_hosts),
        allowed_methods: settings.allowed_methods.clone(),
        allowed_headers: settings.allowed_headers.clone(),
        allow_credentials: settings.allow_credentials,
    }
}

/// Split a comma-separated host list, dropping blanks and invalid tokens.
pub fn parse_cors_hosts(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty() && is_valid_host(token))
        .map(String::from)
        .collect()
}

fn is_valid_host(host: &str) -> bool {
    host.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        && !host.starts_with('-')
        && !host.ends_with('-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::catalog::{DOCS_ROUTE_ID, NOTIFY_ROUTE_ID, STATUS_ROUTE_ID};
    use crate::routes::RouteMethod;

    fn user_route(id: &str, path: &str, order: i32, enabled: bool) -> Route {
        Route {
            id: id.to_string(),
            path: path.to_string(),
            method: RouteMethod::Get,
            description: String::new(),
            kind: RouteKind::Api {
                body: "ok".to_string(),
                status_code: 200,
                headers: BTreeMap::new(),
            },
            enabled,
            order,
        }
    }

    #[test]
    fn test_port_validation() {
        assert_eq!(validate_port("8080"), 8080);
        assert_eq!(validate_port(" 9000 "), 9000);
        assert_eq!(validate_port("1024"), 1024);
        assert_eq!(validate_port("65535"), 65535);
        assert_eq!(validate_port("1023"), DEFAULT_PORT);
        assert_eq!(validate_port("65536"), DEFAULT_PORT);
        assert_eq!(validate_port("80"), DEFAULT_PORT);
        assert_eq!(validate_port("not-a-port"), DEFAULT_PORT);
        assert_eq!(validate_port(""), DEFAULT_PORT);
        assert_eq!(validate_port("-1"), DEFAULT_PORT);
    }

    #[test]
    fn test_cors_host_parsing() {
        assert_eq!(
            parse_cors_hosts("example.com, api.example.com"),
            vec!["example.com", "api.example.com"]
        );
        // Blanks and invalid tokens are dropped, not rejected.
        assert_eq!(
            parse_cors_hosts("good.com,, -bad.com, also-bad-, spa ced"),
            vec!["good.com"]
        );
        assert!(parse_cors_hosts("").is_empty());
    }

    #[test]
    fn test_assembly_always_includes_catalog() {
        let config = assemble(&Settings::default());
        let ids: Vec<&str> = config.routes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![STATUS_ROUTE_ID, DOCS_ROUTE_ID, NOTIFY_ROUTE_ID]);
    }

    #[test]
    fn test_builtin_toggles_respected() {
        let settings = Settings {
            builtin: BuiltinToggles {
                enable_status: true,
                enable_docs: false,
                enable_notify: false,
            },
            ..Settings::default()
        };
        let config = assemble(&settings);
        let ids: Vec<&str> = config.routes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![STATUS_ROUTE_ID]);
    }

    #[test]
    fn test_disabled_and_invalid_user_routes_dropped() {
        let settings = Settings {
            routes: vec![
                user_route("a", "/a", 1, true),
                user_route("b", "/b", 2, false),
                user_route("c", "no-leading-slash", 3, true),
            ],
            ..Settings::default()
        };
        let config = assemble(&settings);
        assert!(config.routes.iter().any(|r| r.id == "a"));
        assert!(!config.routes.iter().any(|r| r.id == "b"));
        assert!(!config.routes.iter().any(|r| r.id == "c"));
    }

    #[test]
    fn test_routes_sorted_by_order_builtins_first() {
        let settings = Settings {
            routes: vec![
                user_route("late", "/late", 50, true),
                user_route("early", "/early", 10, true),
            ],
            ..Settings::default()
        };
        let config = assemble(&settings);
        let orders: Vec<i32> = config.routes.iter().map(|r| r.order).collect();
        let mut sorted = orders.clone();
        sorted.sort();
        assert_eq!(orders, sorted);
        assert_eq!(config.routes.first().unwrap().id, STATUS_ROUTE_ID);
    }

    #[test]
    fn test_assembly_never_panics_on_garbage() {
        let settings = Settings {
            port: "999999999999999999".to_string(),
            cors: CorsSettings {
                allowed_hosts: ",,,---,\u{0},".to_string(),
                ..CorsSettings::default()
            },
            ..Settings::default()
        };
        let config = assemble(&settings);
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.cors.allowed_hosts.is_empty());
        assert!((1024..=65535).contains(&config.port));
    }

    #[tokio::test]
    async fn test_assembler_reacts_to_single_input_change() {
        let store = SettingsStore::new(Settings::default());
        let mut config_rx = spawn_assembler(&store);
        assert_eq!(config_rx.borrow().port, DEFAULT_PORT);

        store.set_port("9123");
        config_rx.changed().await.unwrap();
        assert_eq!(config_rx.borrow().port, 9123);
    }

    #[tokio::test]
    async fn test_assembler_emits_on_route_list_change() {
        let store = SettingsStore::new(Settings::default());
        let mut config_rx = spawn_assembler(&store);

        store.set_routes(vec![user_route("hello", "/hello", 0, true)]);
        config_rx.changed().await.unwrap();
        assert!(config_rx.borrow().routes.iter().any(|r| r.id == "hello"));
    }
}
