//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request in → request_log interceptor (timing, metadata capture)
//!     → handler stack → response out
//!     → RequestLogRecord queued → writer task → LogSink
//! ```
//!
//! # Design Decisions
//! - Persistence happens off the response path (unbounded channel + task)
//! - The sink is a trait so storage backends are swappable
//! - Operational logging (tracing) is separate from the request log

pub mod request_log;

pub use request_log::{client_ip, LogSink, RequestLogRecord, RequestLogger, TracingLogSink};
