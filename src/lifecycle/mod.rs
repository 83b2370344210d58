//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! start/stop/restart requests ─┐
//!                              ▼
//! assembled config ──▶ manager.rs (one listener, try_lock transitions)
//!                              │
//!                              ▼
//!              status watch channel (Stopped/Starting/Running/...)
//! ```
//!
//! # Design Decisions
//! - At most one listener exists at any time
//! - Overlapping transition requests are dropped, not queued
//! - Shutdown drains with a grace deadline, then aborts

pub mod manager;

pub use manager::{ListenerStatus, LifecycleError, ServerManager, GRACE_PERIOD};
