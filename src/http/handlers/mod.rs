//! One handler strategy per route variant.

pub mod api;
pub mod builtin;
pub mod directory;
pub mod proxy;
pub mod redirect;
pub mod static_file;
