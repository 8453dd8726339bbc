//! Main update function - handles state transitions (TEA pattern)

use crate::message::Message;
use crate::state::AppState;

use super::{generation, preview, settings, UpdateAction, UpdateResult};

/// Process a message and update state
/// Returns optional follow-up message and/or action
pub fn update(state: &mut AppState, message: Message) -> UpdateResult {
    match message {
        Message::Quit => {
            state.request_quit();
            UpdateResult::none()
        }

        // ─────────────────────────────────────────────────────────
        // Generation Messages
        // ─────────────────────────────────────────────────────────
        Message::StartGeneration { mode, input } => generation::handle_start(state, mode, &input),
        Message::Refine { instruction } => generation::handle_refine(state, &instruction),
        Message::GenerationChunk { id, chunk } => generation::handle_chunk(state, id, &chunk),
        Message::GenerationLog { id, message } => {
            if state.active_generation().map(|g| g.id) == Some(id) {
                state.add_log(message);
            }
            UpdateResult::none()
        }
        Message::GenerationCompleted { id } => generation::handle_completed(state, id),
        Message::GenerationFailed {
            id,
            error,
            rejected_key,
        } => generation::handle_failed(state, id, error, rejected_key),

        // ─────────────────────────────────────────────────────────
        // Editor & Preview Messages
        // ─────────────────────────────────────────────────────────
        Message::EditorInput { text } => {
            state.editor_draft = Some(text.clone());
            UpdateResult::action(UpdateAction::EditorInput { text })
        }
        Message::CodeCommitted { text } => preview::handle_code_committed(state, text),
        Message::RefreshPreview => preview::handle_refresh(state),
        Message::StopPreview => UpdateResult::action(UpdateAction::StopSandbox),
        Message::Sandbox(event) => preview::handle_sandbox_event(state, event),

        Message::GoHome => generation::handle_go_home(state),

        // ─────────────────────────────────────────────────────────
        // Settings Messages
        // ─────────────────────────────────────────────────────────
        Message::SetApiKey { provider, value } => settings::handle_set_key(state, provider, value),
        Message::SaveApiKeys => UpdateResult::action(UpdateAction::SaveKeys {
            keys: state.key_drafts.clone(),
        }),
        Message::KeysSaved { keys } => settings::handle_keys_saved(state, keys),
        Message::KeysSaveFailed { error } => {
            let text = format!("Failed to save API keys: {}", error);
            state.add_log(text.clone());
            state.set_error(text);
            UpdateResult::none()
        }
        Message::ValidateKey { provider } => settings::handle_validate(state, provider),
        Message::KeyValidated {
            provider,
            seq,
            valid,
        } => {
            state.apply_validation(provider, seq, valid);
            UpdateResult::none()
        }

        // ─────────────────────────────────────────────────────────
        // Export Messages
        // ─────────────────────────────────────────────────────────
        Message::ExportCode { path } => {
            if state.code.is_empty() {
                state.set_error("No code to export yet.");
                return UpdateResult::none();
            }
            UpdateResult::action(UpdateAction::ExportCode {
                path,
                code: state.code.clone(),
            })
        }
        Message::CodeExported { path } => {
            state.add_log(format!("Code exported to {}", path.display()));
            UpdateResult::none()
        }
        Message::ExportFailed { path, error } => {
            let text = format!("Failed to export code to {}: {}", path.display(), error);
            state.add_log(text.clone());
            state.set_error(text);
            UpdateResult::none()
        }
    }
}
