//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → SettingsStore (one watch channel per input)
//!     → assembler.rs (pure fold over latest values)
//!     → ServerConfiguration (validated, immutable snapshot)
//!     → consumed once per (re)build by the lifecycle manager
//!
//! On reload signal:
//!     watcher.rs detects change
//!     → loader.rs loads new settings
//!     → SettingsStore.apply
//!     → assembler re-emits a snapshot
//!     → lifecycle manager restarts the listener if it differs
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable once assembled; changes produce a new one
//! - Invalid values coerce to documented defaults instead of failing
//! - All fields have defaults to allow minimal settings files

pub mod assembler;
pub mod loader;
pub mod schema;
pub mod watcher;

pub use assembler::{assemble, spawn_assembler, SettingsStore};
pub use schema::{
    BuiltinToggles, CorsConfiguration, CorsSettings, ServerConfiguration, Settings, DEFAULT_PORT,
};
