//! Editor commits and sandbox event handlers

use pageforge_core::prelude::*;
use pageforge_core::SandboxStatus;

use crate::sandbox::SandboxEvent;
use crate::state::AppState;

use super::{UpdateAction, UpdateResult};

/// Debounced preview update for the current buffer, when one applies.
pub(super) fn sync_action(state: &AppState) -> Option<UpdateAction> {
    let api_key = state.keys.require(pageforge_core::Provider::E2b)?;
    if state.code.is_empty() {
        return None;
    }
    Some(UpdateAction::SyncSandbox {
        code: state.code.clone(),
        api_key: api_key.to_string(),
    })
}

pub fn handle_code_committed(state: &mut AppState, text: String) -> UpdateResult {
    if state.active_generation().is_some() {
        debug!("Generation running; editor commit dropped");
        state.editor_draft = None;
        return UpdateResult::none();
    }
    if state.code == text {
        state.editor_draft = None;
        return UpdateResult::none();
    }
    state.code = text;
    state.editor_draft = None;
    match sync_action(state) {
        Some(action) => UpdateResult::action(action),
        None => UpdateResult::none(),
    }
}

/// Manual refresh: skipped while an update is running or there is no code.
pub fn handle_refresh(state: &mut AppState) -> UpdateResult {
    if state.sandbox_status == SandboxStatus::Connecting || state.code.is_empty() {
        return UpdateResult::none();
    }
    UpdateResult::action(UpdateAction::RefreshSandbox {
        code: state.code.clone(),
        api_key: state.keys.e2b.clone(),
    })
}

pub fn handle_sandbox_event(state: &mut AppState, event: SandboxEvent) -> UpdateResult {
    match event {
        SandboxEvent::Status(status) => state.sandbox_status = status,
        SandboxEvent::Url(url) => state.sandbox_url = url,
        SandboxEvent::Log(line) => state.add_log(line),
        SandboxEvent::Error(error) => state.set_sandbox_error(error),
    }
    UpdateResult::none()
}
