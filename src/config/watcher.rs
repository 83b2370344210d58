//! Settings file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::assembler::SettingsStore;
use crate::config::loader::load_settings;

/// Watches the settings file and pushes successfully reparsed values into
/// the settings store. A file that fails to parse keeps the current settings.
pub struct SettingsWatcher {
    path: PathBuf,
    store: Arc<SettingsStore>,
}

impl SettingsWatcher {
    pub fn new(path: &Path, store: Arc<SettingsStore>) -> Self {
        Self {
            path: path.to_path_buf(),
            store,
        }
    }

    /// Start watching the file in a background thread. The returned watcher
    /// must be kept alive for the watch to stay active.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();
        let store = self.store.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Settings file change detected, reloading...");
                        match load_settings(&path) {
                            Ok(settings) => store.apply(settings),
                            Err(e) => {
                                tracing::error!(
                                    "Failed to reload settings: {}. Keeping current configuration.",
                                    e
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Settings watcher started");
        Ok(watcher)
    }
}
