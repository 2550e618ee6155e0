//! Rule catalog, server registry, and config generation commands.

use crate::core::{rule_parser, rule_store, ConfigGenerator, ServerRegistry};
use crate::error::AppError;

use super::logic::{resolve_mode, validate_selection};
use super::state::AppState;

/// Rescan the rule directory. A missing directory yields an empty catalog.
pub fn load_rules(state: &AppState) -> Result<Vec<String>, AppError> {
    let dir = match state.paths.resolve_dir(&state.files.rules) {
        Ok(dir) => dir,
        Err(e) => {
            tracing::info!("No rule directory available: {e}");
            *state.rules() = Default::default();
            return Ok(Vec::new());
        }
    };
    let catalog = rule_store::scan(&dir)?;
    let ids = catalog.ids.clone();
    *state.rules() = catalog;
    tracing::info!("Loaded {} rule modes from {}", ids.len(), dir.display());
    Ok(ids)
}

/// Reload the server registry and return the server names in file order.
pub fn load_servers(state: &AppState) -> Result<Vec<String>, AppError> {
    let path = state.paths.resolve_file(&state.files.servers)?;
    let registry = ServerRegistry::load(&path)?;
    let names = registry.names();
    *state.servers() = registry;
    tracing::info!("Loaded {} servers from {}", names.len(), path.display());
    Ok(names)
}

/// Write the selected server and mode into the engine config.
pub fn generate(state: &AppState, server: &str, mode: &str) -> Result<(), AppError> {
    validate_selection(server, mode)?;
    let rule_path = resolve_mode(&state.rules(), mode)?.to_path_buf();
    let rule = rule_parser::parse_file(&rule_path)?;

    let registry = state.servers();
    let config_path = state.paths.base().join(&state.files.config);
    ConfigGenerator::new(&registry, config_path).generate(server, &rule)?;
    Ok(())
}
