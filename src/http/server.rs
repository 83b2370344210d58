//! Listener plumbing shared by the lifecycle manager.
//!
//! # Responsibilities
//! - Hold the collaborators every router build needs (upstream client,
//!   notifier, log sink)
//! - Bind the TCP listener and serve a router until shutdown is signalled

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::http::handlers::proxy::ProxyClient;
use crate::notify::{StatusNotifier, TracingNotifier};
use crate::observability::{LogSink, TracingLogSink};

/// Collaborators captured into route handlers at router-build time.
#[derive(Clone)]
pub struct ServerDeps {
    pub client: ProxyClient,
    pub notifier: Arc<dyn StatusNotifier>,
    pub log_sink: Arc<dyn LogSink>,
}

impl ServerDeps {
    pub fn new(notifier: Arc<dyn StatusNotifier>, log_sink: Arc<dyn LogSink>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            notifier,
            log_sink,
        }
    }
}

impl Default for ServerDeps {
    fn default() -> Self {
        Self::new(Arc::new(TracingNotifier), Arc::new(TracingLogSink))
    }
}

/// Bind the listener socket for one configuration snapshot.
pub async fn bind(port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await
}

/// Serve until the shutdown receiver fires, then stop accepting and drain
/// in-flight connections.
pub async fn run(
    listener: TcpListener,
    router: Router,
    shutdown: oneshot::Receiver<()>,
) -> std::io::Result<()> {
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = shutdown.await;
    })
    .await
}
