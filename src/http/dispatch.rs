//! Route dispatcher.
//!
//! # Responsibilities
//! - Turn one configuration snapshot into a complete Axum router
//! - Install per-route handlers as closures over captured route data
//! - Wire CORS, request tracing, request logging and the 404 fallback
//!
//! # Design Decisions
//! - The router is built once per listener start and never mutated; config
//!   changes produce a new snapshot and a new router
//! - Routes are installed in ascending `order`, and a second registration of
//!   the same (path, method) pair is skipped with a warning, so overlapping
//!   declarations resolve deterministically to the earlier route
//! - Directory and proxy mounts get three installations: the bare mount, the
//!   mount with a trailing slash, and a catch-all for nested paths

use std::collections::HashSet;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::Path;
use axum::http::Request;
use axum::routing::{on, MethodRouter};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfiguration;
use crate::http::cors::build_cors_layer;
use crate::http::error::{not_found_fallback, panic_response};
use crate::http::handlers::api::{api_response, ApiRouteData};
use crate::http::handlers::builtin::{docs_response, handle_notify, status_response};
use crate::http::handlers::directory::{serve_directory, DirectoryRouteData};
use crate::http::handlers::proxy::{handle_proxy, ProxyRouteData};
use crate::http::handlers::redirect::redirect_response;
use crate::http::handlers::static_file::serve_static_file;
use crate::http::server::ServerDeps;
use crate::observability::RequestLogger;
use crate::routes::{Route, RouteKind, RouteMethod};

/// Build the full router for one configuration snapshot.
pub fn build_router(config: &ServerConfiguration, deps: &ServerDeps) -> Router {
    let custom_headers = Arc::new(config.custom_headers.clone());
    let snapshot = Arc::new(config.clone());
    let mut installed: HashSet<(String, &'static str)> = HashSet::new();

    let mut router = Router::new();
    for route in &config.routes {
        router = install_route(
            router,
            route,
            deps,
            &custom_headers,
            &snapshot,
            &mut installed,
        );
    }

    finish_router(router, config, deps)
}

/// Install the once-per-build layers: 404 fallback, CORS, tracing, the
/// panic-to-500 mapper, and (when enabled) request logging.
fn finish_router(router: Router, config: &ServerConfiguration, deps: &ServerDeps) -> Router {
    let mut router = router
        .fallback(not_found_fallback)
        .layer(build_cors_layer(&config.cors))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response));

    if config.enable_logs {
        let logger = RequestLogger::new(deps.log_sink.clone());
        router = router.layer(axum::middleware::from_fn(move |request, next| {
            let logger = logger.clone();
            async move { logger.handle(request, next).await }
        }));
    }

    router
}

fn install_route(
    router: Router,
    route: &Route,
    deps: &ServerDeps,
    custom_headers: &Arc<std::collections::BTreeMap<String, String>>,
    snapshot: &Arc<ServerConfiguration>,
    installed: &mut HashSet<(String, &'static str)>,
) -> Router {
    let method = route.method;
    match &route.kind {
        RouteKind::Api {
            body,
            status_code,
            headers,
        } => {
            let data = Arc::new(ApiRouteData {
                body: body.clone(),
                status_code: *status_code,
                headers: headers.clone(),
            });
            let global = custom_headers.clone();
            let handler = move || {
                let data = data.clone();
                let global = global.clone();
                async move { api_response(&data, &global) }
            };
            register(
                router,
                installed,
                &route.id,
                &route.path,
                method,
                on(method.filter(), handler),
            )
        }
        RouteKind::StaticFile {
            file_path,
            mime_type,
        } => {
            let file_path = Arc::new(file_path.clone());
            let mime_type = mime_type.clone();
            let handler = move || {
                let file_path = file_path.clone();
                let mime_type = mime_type.clone();
                async move { serve_static_file(&file_path, mime_type.as_deref()).await }
            };
            register(
                router,
                installed,
                &route.id,
                &route.path,
                method,
                on(method.filter(), handler),
            )
        }
        RouteKind::Directory {
            dir_path,
            allow_browsing,
            index_file,
        } => {
            let data = Arc::new(DirectoryRouteData {
                mount: route.path.clone(),
                dir_path: dir_path.clone(),
                allow_browsing: *allow_browsing,
                index_file: index_file.clone(),
            });
            let root = {
                let data = data.clone();
                move || {
                    let data = data.clone();
                    async move { serve_directory(&data, "").await }
                }
            };
            let nested = move |Path(subpath): Path<String>| {
                let data = data.clone();
                async move { serve_directory(&data, &subpath).await }
            };
            // The bare mount redirects to its slashed form, like any
            // filesystem-backed index.
            let at_mount = if route.path == "/" {
                on(method.filter(), root.clone())
            } else {
                let location = format!("{}/", route.path);
                on(method.filter(), move || {
                    let location = location.clone();
                    async move { redirect_response(&location, 307) }
                })
            };
            install_mount(
                router,
                installed,
                &route.id,
                &route.path,
                method,
                at_mount,
                on(method.filter(), root),
                on(method.filter(), nested),
            )
        }
        RouteKind::Redirect {
            target_url,
            status_code,
        } => {
            let target = target_url.clone();
            let status = *status_code;
            let handler = move || {
                let target = target.clone();
                async move { redirect_response(&target, status) }
            };
            // Browsers follow redirects on navigation, so these are always
            // installed for GET whatever the declared method says.
            register(
                router,
                installed,
                &route.id,
                &route.path,
                RouteMethod::Get,
                on(RouteMethod::Get.filter(), handler),
            )
        }
        RouteKind::Proxy {
            target_url,
            preserve_host_header,
            timeout_ms,
        } => {
            let data = Arc::new(ProxyRouteData {
                mount: route.path.clone(),
                target_url: target_url.clone(),
                preserve_host_header: *preserve_host_header,
                timeout_ms: *timeout_ms,
            });
            let client = deps.client.clone();
            let handler = move |request: Request<Body>| {
                let data = data.clone();
                let client = client.clone();
                async move { handle_proxy(&client, &data, request).await }
            };
            install_mount(
                router,
                installed,
                &route.id,
                &route.path,
                method,
                on(method.filter(), handler.clone()),
                on(method.filter(), handler.clone()),
                on(method.filter(), handler),
            )
        }
        RouteKind::Status => {
            let global = custom_headers.clone();
            let handler = move || {
                let global = global.clone();
                async move { status_response(&global) }
            };
            register(
                router,
                installed,
                &route.id,
                &route.path,
                method,
                on(method.filter(), handler),
            )
        }
        RouteKind::Docs => {
            let snapshot = snapshot.clone();
            let handler = move || {
                let snapshot = snapshot.clone();
                async move { docs_response(&snapshot) }
            };
            register(
                router,
                installed,
                &route.id,
                &route.path,
                method,
                on(method.filter(), handler),
            )
        }
        RouteKind::Notify => {
            let notifier = deps.notifier.clone();
            let handler = move |body: Bytes| {
                let notifier = notifier.clone();
                async move { handle_notify(notifier.as_ref(), body) }
            };
            register(
                router,
                installed,
                &route.id,
                &route.path,
                method,
                on(method.filter(), handler),
            )
        }
    }
}

/// Install a mount-style route at the bare mount, the trailing-slash variant
/// and a catch-all for nested paths.
#[allow(clippy::too_many_arguments)]
fn install_mount(
    mut router: Router,
    installed: &mut HashSet<(String, &'static str)>,
    route_id: &str,
    mount: &str,
    method: RouteMethod,
    at_mount: MethodRouter,
    at_slash: MethodRouter,
    at_nested: MethodRouter,
) -> Router {
    router = register(router, installed, route_id, mount, method, at_mount);
    if mount != "/" {
        let slashed = format!("{mount}/");
        router = register(router, installed, route_id, &slashed, method, at_slash);
    }
    let nested = catch_all_path(mount);
    register(router, installed, route_id, &nested, method, at_nested)
}

fn catch_all_path(mount: &str) -> String {
    if mount.ends_with('/') {
        format!("{mount}{{*subpath}}")
    } else {
        format!("{mount}/{{*subpath}}")
    }
}

/// Register unless the (path, method) pair is already taken; installation
/// order makes the earlier route win.
fn register(
    router: Router,
    installed: &mut HashSet<(String, &'static str)>,
    route_id: &str,
    path: &str,
    method: RouteMethod,
    method_router: MethodRouter,
) -> Router {
    if !installed.insert((path.to_string(), method.as_str())) {
        tracing::warn!(
            route_id,
            path,
            method = method.as_str(),
            "Skipping duplicate route registration"
        );
        return router;
    }
    router.route(path, method_router)
}
