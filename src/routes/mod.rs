//! Route data model.
//!
//! # Data Flow
//! ```text
//! stored user routes ──┐
//!                      ├─→ config::assembler → ServerConfiguration.routes
//! built-in catalog ────┘        (filtered by `enabled`, sorted by `order`)
//! ```
//!
//! # Design Decisions
//! - RouteKind is a closed tagged enum; dispatch matches it exhaustively
//! - Built-in routes are synthesized, never persisted; identity is fixed
//! - Overlapping paths are allowed; first match by ascending order wins

pub mod catalog;
pub mod model;

pub use catalog::built_in_routes;
pub use model::{Route, RouteKind, RouteMethod};
