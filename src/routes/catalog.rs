//! Built-in route catalog.
//!
//! Fixed administrative routes with stable identities. They are synthesized
//! on every configuration assembly rather than persisted; only their enabled
//! flags come from stored settings. Negative orders put them ahead of user
//! routes when path overlaps are resolved.

use crate::routes::model::{Route, RouteKind, RouteMethod};

pub const STATUS_ROUTE_ID: &str = "built-in-status";
pub const DOCS_ROUTE_ID: &str = "built-in-docs";
pub const NOTIFY_ROUTE_ID: &str = "built-in-notify";

/// The full catalog in default order. Presence in the assembled snapshot is
/// unconditional; `enabled` is overwritten from the per-route toggles.
pub fn built_in_routes() -> Vec<Route> {
    vec![
        Route {
            id: STATUS_ROUTE_ID.to_string(),
            path: "/api/status".to_string(),
            method: RouteMethod::Get,
            description: "Server health and status check".to_string(),
            kind: RouteKind::Status,
            enabled: true,
            order: -1000,
        },
        Route {
            id: DOCS_ROUTE_ID.to_string(),
            path: "/api/docs".to_string(),
            method: RouteMethod::Get,
            description: "Machine-readable API documentation".to_string(),
            kind: RouteKind::Docs,
            enabled: true,
            order: -999,
        },
        Route {
            id: NOTIFY_ROUTE_ID.to_string(),
            path: "/api/notify".to_string(),
            method: RouteMethod::Post,
            description: "Trigger device notifications".to_string(),
            kind: RouteKind::Notify,
            enabled: true,
            order: -998,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_identities_stable() {
        let routes = built_in_routes();
        let ids: Vec<&str> = routes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![STATUS_ROUTE_ID, DOCS_ROUTE_ID, NOTIFY_ROUTE_ID]);
    }

    #[test]
    fn test_catalog_orders_negative_and_ascending() {
        let routes = built_in_routes();
        let mut prev = i32::MIN;
        for route in &routes {
            assert!(route.order < 0);
            assert!(route.order > prev);
            prev = route.order;
        }
    }

    #[test]
    fn test_catalog_kinds_are_built_in() {
        for route in built_in_routes() {
            assert!(route.kind.is_built_in(), "{} is not built-in", route.id);
        }
    }
}
