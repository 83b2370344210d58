//! Route Server Library
//!
//! An in-process HTTP server that exposes user-declared routes (fixed API
//! responses, static files, directory trees, redirects, reverse proxies and
//! a small set of built-in endpoints) through a single restartable listener.
//!
//! # Architecture Overview
//!
//! ```text
//! settings file ──▶ config (store → assembler) ──▶ ServerConfiguration
//!                                                        │
//!                           lifecycle (one listener) ◀───┘
//!                                    │
//!                          http (dispatcher → handlers)
//!                                    │
//!                     observability (request log sink)
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod notify;
pub mod observability;
pub mod routes;

pub use config::{ServerConfiguration, Settings};
pub use http::{build_router, ServerDeps};
pub use lifecycle::{ListenerStatus, ServerManager};
