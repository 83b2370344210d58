//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! ServerConfiguration snapshot
//!     → dispatch.rs (build_router: one closure handler per route)
//!     → handlers/* (api, static_file, directory, redirect, proxy, builtin)
//!     → error.rs (JSON envelopes, status mapping, 404 fallback)
//!
//! server.rs binds the socket and serves the router until shutdown.
//! cors.rs turns the resolved CORS policy into a tower-http layer.
//! ```

pub mod cors;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod server;

pub use dispatch::build_router;
pub use error::HandlerError;
pub use server::ServerDeps;
