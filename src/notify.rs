//! External notifier collaborator.
//!
//! The core reports human-readable status strings ("Server running on
//! http://…") and forwards device-notification requests through this seam.
//! It never depends on the notifier succeeding; every failure stays on the
//! notifier's side of the boundary.

use serde::{Deserialize, Serialize};

/// Priorities accepted by the notify endpoint.
pub const VALID_PRIORITIES: [&str; 5] = ["MIN", "LOW", "DEFAULT", "HIGH", "MAX"];

/// Body of a device-notification request. Unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default = "default_auto_cancel")]
    pub auto_cancel: bool,
    #[serde(default)]
    pub ongoing: bool,
}

fn default_priority() -> String {
    "DEFAULT".to_string()
}

fn default_auto_cancel() -> bool {
    true
}

impl NotificationRequest {
    /// Returns the first validation failure, if any.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title is required and cannot be blank".to_string());
        }
        if self.body.trim().is_empty() {
            return Err("Body is required and cannot be blank".to_string());
        }
        if !VALID_PRIORITIES.contains(&self.priority.as_str()) {
            return Err(format!(
                "Priority must be one of: {}",
                VALID_PRIORITIES.join(", ")
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct NotifyError(pub String);

/// Boundary to the platform notifier. Implementations must be cheap and
/// non-blocking; the server calls these inline.
pub trait StatusNotifier: Send + Sync {
    /// Report a server lifecycle status string.
    fn server_status(&self, message: &str);

    /// Clear any sticky status indication.
    fn clear_status(&self);

    /// Whether device notifications may be posted right now. Checked before
    /// the request body is even parsed.
    fn can_post_device_notification(&self) -> bool {
        true
    }

    /// Post a device notification, returning its assigned identifier.
    fn post_device_notification(&self, request: &NotificationRequest)
        -> Result<String, NotifyError>;
}

/// Default notifier: everything goes to the operational log.
pub struct TracingNotifier;

impl StatusNotifier for TracingNotifier {
    fn server_status(&self, message: &str) {
        tracing::info!(%message, "server status");
    }

    fn clear_status(&self) {}

    fn post_device_notification(
        &self,
        request: &NotificationRequest,
    ) -> Result<String, NotifyError> {
        let id = uuid::Uuid::new_v4().to_string();
        tracing::info!(title = %request.title, priority = %request.priority, id = %id, "device notification");
        Ok(id)
    }
}
