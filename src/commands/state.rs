//! Shared application state handed to every command.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config;
use crate::controller::{ErrorSink, LifecycleController};
use crate::core::{PathResolver, RuleCatalog, ServerRegistry};

/// File and directory names, resolved against the working directory.
#[derive(Debug, Clone)]
pub struct FileNames {
    pub config: PathBuf,
    pub servers: PathBuf,
    pub rules: PathBuf,
}

impl Default for FileNames {
    fn default() -> Self {
        Self {
            config: PathBuf::from(config::CONFIG_FILE),
            servers: PathBuf::from(config::SERVERS_FILE),
            rules: PathBuf::from(config::RULES_DIR),
        }
    }
}

/// Shared application state, built once by the adapter.
pub struct AppState {
    pub paths: PathResolver,
    pub files: FileNames,
    pub controller: LifecycleController,
    /// Modes offered for selection, refreshed by `load_rules`.
    pub rules: Mutex<RuleCatalog>,
    /// Servers offered for selection, refreshed by `load_servers`.
    pub servers: Mutex<ServerRegistry>,
    pub errors: Arc<dyn ErrorSink>,
}

impl AppState {
    pub fn new(
        paths: PathResolver,
        files: FileNames,
        controller: LifecycleController,
        errors: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            paths,
            files,
            controller,
            rules: Mutex::new(RuleCatalog::default()),
            servers: Mutex::new(ServerRegistry::default()),
            errors,
        }
    }

    pub(crate) fn rules(&self) -> MutexGuard<'_, RuleCatalog> {
        self.rules.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn servers(&self) -> MutexGuard<'_, ServerRegistry> {
        self.servers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
