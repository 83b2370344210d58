//! Listener lifecycle manager.
//!
//! # Responsibilities
//! - Own the single in-process listener (at most one at a time)
//! - Drive the Stopped → Starting → Running → Stopping → Stopped machine
//! - Publish the current state on a watch channel for observers
//! - Restart the listener when the assembled configuration changes
//!
//! # Design Decisions
//! - Transitions run under a `try_lock`: a transition requested while another
//!   is in flight is dropped, not queued, so rapid toggling cannot pile up
//! - Shutdown is graceful with a bounded grace period; a listener that does
//!   not drain in time is aborted after a second, harder deadline
//! - Config changes are debounced before the compare-and-restart, so a burst
//!   of edits produces one restart

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;

use crate::config::ServerConfiguration;
use crate::http::{build_router, server, ServerDeps};

/// Time allowed for in-flight requests to drain on shutdown.
pub const GRACE_PERIOD: Duration = Duration::from_millis(1_000);

/// Deadline for the aborted serve task to actually finish.
const HARD_PERIOD: Duration = Duration::from_millis(2_000);

/// Quiet period after a config change before the compare-and-restart runs.
const RESTART_DEBOUNCE: Duration = Duration::from_millis(300);

/// Externally observable listener state.
#[derive(Debug, Clone, PartialEq)]
pub enum ListenerStatus {
    Stopped,
    Starting,
    Running { port: u16 },
    Stopping,
    Error(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
    /// Another transition holds the lock; this request was dropped.
    #[error("listener transition already in progress")]
    Busy,
}

struct RunningListener {
    config: ServerConfiguration,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<std::io::Result<()>>,
}

/// Owner of the single listener.
pub struct ServerManager {
    deps: ServerDeps,
    running: Mutex<Option<RunningListener>>,
    status_tx: watch::Sender<ListenerStatus>,
}

impl ServerManager {
    pub fn new(deps: ServerDeps) -> Self {
        let (status_tx, _) = watch::channel(ListenerStatus::Stopped);
        Self {
            deps,
            running: Mutex::new(None),
            status_tx,
        }
    }

    /// Subscribe to listener state transitions.
    pub fn status(&self) -> watch::Receiver<ListenerStatus> {
        self.status_tx.subscribe()
    }

    /// Start the listener with the given snapshot, stopping any listener that
    /// is already running. Returns the actually bound port (relevant when the
    /// snapshot asks for port 0).
    pub async fn start(&self, config: ServerConfiguration) -> Result<u16, LifecycleError> {
        let Ok(mut guard) = self.running.try_lock() else {
            tracing::debug!("Listener transition in progress; start request dropped");
            return Err(LifecycleError::Busy);
        };
        if let Some(existing) = guard.take() {
            self.shutdown_listener(existing).await;
        }
        self.start_locked(&mut guard, config).await
    }

    /// Explicit restart. `start` already replaces a running listener; this
    /// name exists for callers expressing intent.
    pub async fn restart(&self, config: ServerConfiguration) -> Result<u16, LifecycleError> {
        self.start(config).await
    }

    /// Stop the listener. Stopping an already stopped listener is a no-op.
    pub async fn stop(&self) {
        let Ok(mut guard) = self.running.try_lock() else {
            tracing::debug!("Listener transition in progress; stop request dropped");
            return;
        };
        if let Some(listener) = guard.take() {
            self.shutdown_listener(listener).await;
        }
    }

    /// React to a new configuration snapshot: restart a running listener if
    /// the snapshot differs from the one it was built with, otherwise leave
    /// it alone. A stopped listener stays stopped; the snapshot simply
    /// applies on the next start.
    pub async fn apply(&self, config: ServerConfiguration) {
        let Ok(mut guard) = self.running.try_lock() else {
            tracing::debug!("Listener transition in progress; config change dropped");
            return;
        };
        match guard.take() {
            Some(listener) if listener.config == config => {
                *guard = Some(listener);
            }
            Some(listener) => {
                tracing::info!("Configuration changed; restarting listener");
                self.shutdown_listener(listener).await;
                if let Err(e) = self.start_locked(&mut guard, config).await {
                    tracing::error!(error = %e, "Restart after config change failed");
                }
            }
            None => {}
        }
    }

    /// Debounced config-watcher task: coalesces bursts of snapshot changes
    /// into a single `apply`.
    pub fn spawn_config_watcher(
        self: &Arc<Self>,
        mut config_rx: watch::Receiver<ServerConfiguration>,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            while config_rx.changed().await.is_ok() {
                loop {
                    tokio::select! {
                        changed = config_rx.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                        _ = tokio::time::sleep(RESTART_DEBOUNCE) => break,
                    }
                }
                let snapshot = config_rx.borrow_and_update().clone();
                manager.apply(snapshot).await;
            }
        })
    }

    async fn start_locked(
        &self,
        guard: &mut Option<RunningListener>,
        config: ServerConfiguration,
    ) -> Result<u16, LifecycleError> {
        let port = config.port;
        self.status_tx.send_replace(ListenerStatus::Starting);

        let listener = match server::bind(port).await {
            Ok(listener) => listener,
            Err(source) => {
                let message = format!("Failed to bind port {port}: {source}");
                tracing::error!(port, error = %source, "Listener bind failed");
                self.status_tx.send_replace(ListenerStatus::Error(message));
                return Err(LifecycleError::Bind { port, source });
            }
        };
        let bound_port = match listener.local_addr() {
            Ok(addr) => addr.port(),
            Err(source) => {
                self.status_tx
                    .send_replace(ListenerStatus::Error(source.to_string()));
                return Err(LifecycleError::Bind { port, source });
            }
        };

        let router = build_router(&config, &self.deps);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(server::run(listener, router, shutdown_rx));

        *guard = Some(RunningListener {
            config,
            shutdown: shutdown_tx,
            handle,
        });
        self.status_tx
            .send_replace(ListenerStatus::Running { port: bound_port });
        self.deps
            .notifier
            .server_status(&format!("Server running on http://0.0.0.0:{bound_port}"));
        tracing::info!(port = bound_port, "Listener running");
        Ok(bound_port)
    }

    async fn shutdown_listener(&self, listener: RunningListener) {
        self.status_tx.send_replace(ListenerStatus::Stopping);
        let _ = listener.shutdown.send(());

        let mut handle = listener.handle;
        if tokio::time::timeout(GRACE_PERIOD, &mut handle).await.is_err() {
            tracing::warn!("Graceful shutdown deadline exceeded; aborting listener task");
            handle.abort();
            let _ = tokio::time::timeout(HARD_PERIOD, &mut handle).await;
        }

        self.status_tx.send_replace(ListenerStatus::Stopped);
        self.deps.notifier.clear_status();
        tracing::info!("Listener stopped");
    }
}
