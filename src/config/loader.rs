//! Settings loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::Settings;

/// Error type for settings loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Load settings from a TOML file.
///
/// Syntactic errors are returned to the caller (the watcher keeps the current
/// settings on failure); semantic coercion of the values themselves happens
/// later in the assembler and never fails.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let content = fs::read_to_string(path)?;
    let settings: Settings = toml::from_str(&content)?;
    Ok(settings)
}
