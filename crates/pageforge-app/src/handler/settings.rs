//! Settings panel handlers: key drafts, saving and validation

use pageforge_core::prelude::*;
use pageforge_core::{ApiKeys, Provider};

use crate::state::AppState;

use super::preview::sync_action;
use super::{UpdateAction, UpdateResult};

/// Edit one drafted key; its validation result no longer applies.
pub fn handle_set_key(state: &mut AppState, provider: Provider, value: String) -> UpdateResult {
    state.key_drafts.set(provider, value.trim());
    state.reset_validation(provider);
    UpdateResult::none()
}

pub fn handle_keys_saved(state: &mut AppState, keys: ApiKeys) -> UpdateResult {
    let sandbox_key_changed = state.keys.e2b != keys.e2b;
    state.keys = keys.clone();
    state.key_drafts = keys;
    state.add_log("API Keys updated.");
    info!("API keys saved");

    // A new sandbox key counts as a change for the preview debounce.
    if sandbox_key_changed {
        if let Some(action) = sync_action(state) {
            return UpdateResult::action(action);
        }
    }
    UpdateResult::none()
}

pub fn handle_validate(state: &mut AppState, provider: Provider) -> UpdateResult {
    let seq = state.begin_validation(provider);
    UpdateResult::action(UpdateAction::ValidateKey {
        provider,
        key: state.key_drafts.get(provider).to_string(),
        seq,
    })
}
