//! End-to-end tests over a real listener.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use route_server::config::{spawn_assembler, ServerConfiguration, SettingsStore};
use route_server::lifecycle::{ListenerStatus, ServerManager};
use route_server::routes::{built_in_routes, Route, RouteKind, RouteMethod};
use route_server::{Settings, ServerDeps};

fn route(id: &str, path: &str, kind: RouteKind) -> Route {
    Route {
        id: id.to_string(),
        path: path.to_string(),
        method: RouteMethod::Get,
        description: String::new(),
        kind,
        enabled: true,
        order: 0,
    }
}

fn api_kind(body: &str, status: u16) -> RouteKind {
    RouteKind::Api {
        body: body.to_string(),
        status_code: status,
        headers: BTreeMap::new(),
    }
}

fn config_with(routes: Vec<Route>) -> ServerConfiguration {
    ServerConfiguration {
        port: 0,
        enable_logs: false,
        routes,
        ..ServerConfiguration::default()
    }
}

async fn started(routes: Vec<Route>) -> (ServerManager, u16) {
    let manager = ServerManager::new(ServerDeps::default());
    let port = manager.start(config_with(routes)).await.unwrap();
    (manager, port)
}

#[tokio::test]
async fn test_api_route_round_trip() {
    let (manager, port) = started(vec![route("r", "/hello", api_kind("hi", 200))]).await;

    let response = reqwest::get(format!("http://127.0.0.1:{port}/hello"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "hi");

    manager.stop().await;
}

#[tokio::test]
async fn test_custom_headers_applied_globally() {
    let mut config = config_with(vec![route("r", "/h", api_kind("", 204))]);
    config
        .custom_headers
        .insert("x-served-by".to_string(), "route-server".to_string());
    let manager = ServerManager::new(ServerDeps::default());
    let port = manager.start(config).await.unwrap();

    let response = reqwest::get(format!("http://127.0.0.1:{port}/h"))
        .await
        .unwrap();
    assert_eq!(response.status(), 204);
    assert_eq!(response.headers()["x-served-by"], "route-server");

    manager.stop().await;
}

#[tokio::test]
async fn test_redirect_route_is_not_followed_silently() {
    let kind = RouteKind::Redirect {
        target_url: "https://example.com/elsewhere".to_string(),
        status_code: 301,
    };
    let (manager, port) = started(vec![route("r", "/old", kind)]).await;

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();
    let response = client
        .get(format!("http://127.0.0.1:{port}/old"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 301);
    assert_eq!(response.headers()["location"], "https://example.com/elsewhere");

    manager.stop().await;
}

#[tokio::test]
async fn test_static_file_route_streams_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("greeting.txt");
    std::fs::write(&file, "file body").unwrap();

    let kind = RouteKind::StaticFile {
        file_path: file,
        mime_type: Some("text/plain".to_string()),
    };
    let (manager, port) = started(vec![route("r", "/file", kind)]).await;

    let response = reqwest::get(format!("http://127.0.0.1:{port}/file"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(response.text().await.unwrap(), "file body");

    manager.stop().await;
}

#[tokio::test]
async fn test_directory_route_listing_and_browsing_toggle() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "aaa").unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();

    let open = RouteKind::Directory {
        dir_path: dir.path().to_path_buf(),
        allow_browsing: true,
        index_file: None,
    };
    let (manager, port) = started(vec![route("r", "/files", open)]).await;

    let listing = reqwest::get(format!("http://127.0.0.1:{port}/files/"))
        .await
        .unwrap();
    assert_eq!(listing.status(), 200);
    let html = listing.text().await.unwrap();
    assert!(html.contains("a.txt"));
    assert!(html.contains("sub"));

    let nested = reqwest::get(format!("http://127.0.0.1:{port}/files/a.txt"))
        .await
        .unwrap();
    assert_eq!(nested.status(), 200);
    assert_eq!(nested.text().await.unwrap(), "aaa");

    manager.stop().await;

    let closed = RouteKind::Directory {
        dir_path: dir.path().to_path_buf(),
        allow_browsing: false,
        index_file: None,
    };
    let (manager, port) = started(vec![route("r", "/files", closed)]).await;
    let denied = reqwest::get(format!("http://127.0.0.1:{port}/files/"))
        .await
        .unwrap();
    assert_eq!(denied.status(), 403);
    manager.stop().await;
}

#[tokio::test]
async fn test_directory_route_rejects_traversal_segments() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "aaa").unwrap();

    let kind = RouteKind::Directory {
        dir_path: dir.path().to_path_buf(),
        allow_browsing: true,
        index_file: None,
    };
    let (manager, port) = started(vec![route("r", "/files", kind)]).await;

    let response = reqwest::get(format!("http://127.0.0.1:{port}/files/..%2Fsecret"))
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    manager.stop().await;
}

#[tokio::test]
async fn test_proxy_route_rejects_invalid_target_before_forwarding() {
    let kind = RouteKind::Proxy {
        target_url: String::new(),
        preserve_host_header: false,
        timeout_ms: 30_000,
    };
    let (manager, port) = started(vec![route("r", "/proxy", kind)]).await;

    // With no configured base, the sub-path must itself be an absolute URL.
    let response = reqwest::get(format!("http://127.0.0.1:{port}/proxy/not-a-url"))
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    manager.stop().await;
}

#[tokio::test]
async fn test_proxy_render_header_is_unsupported() {
    let kind = RouteKind::Proxy {
        target_url: "http://127.0.0.1:9".to_string(),
        preserve_host_header: false,
        timeout_ms: 1_000,
    };
    let (manager, port) = started(vec![route("r", "/proxy", kind)]).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://127.0.0.1:{port}/proxy/x"))
        .header("X-Proxy-Render", "true")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 501);

    manager.stop().await;
}

#[tokio::test]
async fn test_notify_validation_message() {
    let (manager, port) = started(built_in_routes()).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://127.0.0.1:{port}/api/notify"))
        .json(&serde_json::json!({ "title": "   ", "body": "b" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Title is required and cannot be blank");

    manager.stop().await;
}

#[tokio::test]
async fn test_stop_releases_port_for_reuse() {
    let (manager, port) = started(vec![route("r", "/x", api_kind("1", 200))]).await;
    manager.stop().await;

    let mut config = config_with(vec![route("r", "/x", api_kind("2", 200))]);
    config.port = port;
    let manager = ServerManager::new(ServerDeps::default());
    let rebound = manager.start(config).await.unwrap();
    assert_eq!(rebound, port);

    let response = reqwest::get(format!("http://127.0.0.1:{port}/x"))
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "2");

    manager.stop().await;
}

#[tokio::test]
async fn test_disabled_route_gone_after_restart() {
    let manager = ServerManager::new(ServerDeps::default());
    let enabled = route("r", "/toggle", api_kind("present", 200));
    let port = manager.start(config_with(vec![enabled])).await.unwrap();

    let response = reqwest::get(format!("http://127.0.0.1:{port}/toggle"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Assembly drops disabled routes, so the restarted listener has none.
    manager.apply(config_with(vec![])).await;
    let status = manager.status().borrow().clone();
    let ListenerStatus::Running { port } = status else {
        panic!("expected running listener, got {status:?}");
    };
    let response = reqwest::get(format!("http://127.0.0.1:{port}/toggle"))
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    manager.stop().await;
}

/// Reserve a currently-free port. Racy in principle, but good enough for a
/// test that needs a concrete port number in its settings.
fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::test]
async fn test_config_change_restarts_listener_with_new_routes() {
    let mut settings = Settings {
        port: free_port().to_string(),
        enable_logs: false,
        ..Settings::default()
    };
    settings.routes = vec![route("r", "/v", api_kind("one", 200))];

    let store = Arc::new(SettingsStore::new(settings));
    let mut config_rx = spawn_assembler(&store);

    let manager = Arc::new(ServerManager::new(ServerDeps::default()));
    let initial = config_rx.borrow_and_update().clone();
    manager.start(initial).await.unwrap();
    manager.spawn_config_watcher(config_rx);

    let mut updated = route("r", "/v", api_kind("two", 200));
    updated.id = "r2".to_string();
    store.set_routes(vec![updated]);

    // Debounce window plus restart time.
    tokio::time::sleep(Duration::from_millis(900)).await;

    let status = manager.status().borrow().clone();
    let ListenerStatus::Running { port } = status else {
        panic!("expected running listener, got {status:?}");
    };
    let response = reqwest::get(format!("http://127.0.0.1:{port}/v"))
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "two");

    manager.stop().await;
}
