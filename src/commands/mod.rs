//! Command handlers, organized by functional domain.
//!
//! Each handler takes `&AppState` and plain arguments so that any adapter
//! (the CLI, a tray UI) can wire its events to them.
//!
//! - `rules`: rule catalog, server registry, config generation
//! - `system`: engine start/stop/toggle and exit
//! - `logic`: Pure business logic functions (unit-testable)
//! - `state`: Shared `AppState` definition

mod logic;
pub mod rules;
mod state;
pub mod system;

pub use logic::{status_label, ToggleAction};
pub use state::{AppState, FileNames};

use crate::error::AppError;

/// Forward a command error to the state's error sink and hand the result back.
pub fn report<T>(state: &AppState, result: Result<T, AppError>) -> Result<T, AppError> {
    if let Err(e) = &result {
        state.errors.report(e);
    }
    result
}
