//! Pure decision functions extracted from the command handlers.
//!
//! These take plain parameters (no `AppState`) and can be unit-tested
//! without building a controller.

use std::path::Path;

use crate::controller::LifecycleState;
use crate::core::RuleCatalog;
use crate::error::AppError;

/// What a single Start/Stop button should do in the given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    Start,
    Stop,
}

/// Reject a generate request with no server or no mode selected.
pub fn validate_selection(server: &str, mode: &str) -> Result<(), AppError> {
    if server.trim().is_empty() {
        return Err(AppError::InvalidInput("Please select a server".into()));
    }
    if mode.trim().is_empty() {
        return Err(AppError::InvalidInput("Please select a mode".into()));
    }
    Ok(())
}

/// Look up the rule file for a selected mode.
pub fn resolve_mode<'a>(catalog: &'a RuleCatalog, mode: &str) -> Result<&'a Path, AppError> {
    catalog
        .path(mode)
        .ok_or_else(|| AppError::InvalidInput(format!("Unknown mode: {mode}")))
}

pub fn toggle_action(state: LifecycleState) -> ToggleAction {
    match state {
        LifecycleState::Running => ToggleAction::Stop,
        LifecycleState::Stopped => ToggleAction::Start,
    }
}

/// Status line shown next to the Start/Stop control.
pub fn status_label(state: LifecycleState) -> &'static str {
    match state {
        LifecycleState::Running => "Shadow is Running",
        LifecycleState::Stopped => "Shadow is not Running",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn catalog() -> RuleCatalog {
        let mut catalog = RuleCatalog::default();
        catalog.ids.push("games/steam".into());
        catalog
            .paths
            .insert("games/steam".into(), PathBuf::from("/rules/games/steam"));
        catalog
    }

    #[test]
    fn test_validate_selection_ok() {
        assert!(validate_selection("Tokyo", "global").is_ok());
    }

    #[test]
    fn test_validate_selection_missing_server() {
        let err = validate_selection("", "global").unwrap_err();
        assert_eq!(err.kind(), "InvalidInput");
        assert_eq!(err.to_string(), "Please select a server");
    }

    #[test]
    fn test_validate_selection_missing_mode() {
        let err = validate_selection("Tokyo", "  ").unwrap_err();
        assert_eq!(err.to_string(), "Please select a mode");
    }

    #[test]
    fn test_validate_selection_checks_server_first() {
        let err = validate_selection("", "").unwrap_err();
        assert_eq!(err.to_string(), "Please select a server");
    }

    #[test]
    fn test_resolve_mode_known() {
        let catalog = catalog();
        assert_eq!(
            resolve_mode(&catalog, "games/steam").unwrap(),
            Path::new("/rules/games/steam")
        );
    }

    #[test]
    fn test_resolve_mode_unknown() {
        let err = resolve_mode(&catalog(), "steam").unwrap_err();
        assert_eq!(err.kind(), "InvalidInput");
    }

    #[test]
    fn test_toggle_action() {
        assert_eq!(toggle_action(LifecycleState::Running), ToggleAction::Stop);
        assert_eq!(toggle_action(LifecycleState::Stopped), ToggleAction::Start);
    }

    #[test]
    fn test_status_label() {
        assert_eq!(status_label(LifecycleState::Running), "Shadow is Running");
        assert_eq!(status_label(LifecycleState::Stopped), "Shadow is not Running");
    }
}
