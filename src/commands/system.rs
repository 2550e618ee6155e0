//! Engine start/stop commands.

use crate::controller::LifecycleState;
use crate::error::AppError;

use super::logic::{toggle_action, ToggleAction};
use super::state::AppState;

pub fn start(state: &AppState) -> Result<(), AppError> {
    state.controller.start()
}

pub fn stop(state: &AppState) -> Result<(), AppError> {
    state.controller.stop()
}

/// Stop if running, otherwise start. Returns the resulting state.
pub fn toggle(state: &AppState) -> Result<LifecycleState, AppError> {
    match toggle_action(state.controller.state()) {
        ToggleAction::Stop => state.controller.stop()?,
        ToggleAction::Start => state.controller.start()?,
    }
    Ok(state.controller.state())
}

pub fn status(state: &AppState) -> LifecycleState {
    state.controller.state()
}

/// Stop the engine ahead of process exit. The caller exits with status 0.
pub fn exit(state: &AppState) {
    if let Err(e) = state.controller.stop() {
        tracing::warn!("Stop before exit failed: {e}");
    }
    tracing::info!("Exiting");
}
