//! Generation lifecycle handlers

use url::Url;

use pageforge_core::prelude::*;
use pageforge_core::{ChatMessage, GenerationMode, Provider, View};

use crate::message::{GenerationId, Message};
use crate::state::{AppState, GenerationKind, GenerationOutcome};

use super::preview::sync_action;
use super::{GenerationJob, GenerationRequest, UpdateAction, UpdateResult};

/// Absolute http(s) URL, or `None`.
fn parse_page_url(input: &str) -> Option<Url> {
    Url::parse(input)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

pub fn handle_start(state: &mut AppState, mode: GenerationMode, input: &str) -> UpdateResult {
    let input = input.trim();
    if input.is_empty() {
        return UpdateResult::none();
    }
    if state.is_loading {
        debug!("Generation already running; start ignored");
        return UpdateResult::none();
    }

    let (request, summary) = match mode {
        GenerationMode::Prompt => (
            GenerationRequest::Prompt {
                description: input.to_string(),
            },
            format!("New prompt: \"{}\"", input),
        ),
        GenerationMode::Url => {
            if parse_page_url(input).is_none() {
                let error = Error::invalid_url(input).to_string();
                state.add_log(format!("Error: {}", error));
                state.push_chat(ChatMessage::system(format!("Error: {}", error)));
                state.set_error(error);
                return UpdateResult::none();
            }
            (
                GenerationRequest::Url {
                    url: input.to_string(),
                },
                format!("Recreating from URL: \"{}\"", input),
            )
        }
    };

    state.view = View::Builder;
    state.clear_error();
    state.logs.clear();
    state.code.clear();
    state.editor_draft = None;
    state.chat = vec![ChatMessage::system("Starting new generation...")];

    let (id, cancel_rx) = state.begin_generation(GenerationKind::Create, Some(summary));
    info!("Starting generation {} ({:?})", id, mode);

    UpdateResult::action(UpdateAction::Generate(GenerationJob {
        id,
        request,
        gemini_key: state.keys.gemini.clone(),
        firecrawl_key: state.keys.firecrawl.clone(),
        cancel_rx,
        stop_sandbox: true,
    }))
}

pub fn handle_refine(state: &mut AppState, instruction: &str) -> UpdateResult {
    let instruction = instruction.trim();
    if instruction.is_empty() {
        return UpdateResult::none();
    }
    if state.is_loading {
        debug!("Generation already running; refine ignored");
        return UpdateResult::none();
    }

    state.clear_error();
    state.push_chat(ChatMessage::user(instruction));

    let (id, cancel_rx) = state.begin_generation(GenerationKind::Refine, None);
    info!("Starting refinement {}", id);

    UpdateResult::action(UpdateAction::Generate(GenerationJob {
        id,
        request: GenerationRequest::Refine {
            instruction: instruction.to_string(),
            current_code: state.code.clone(),
        },
        gemini_key: state.keys.gemini.clone(),
        firecrawl_key: String::new(),
        cancel_rx,
        stop_sandbox: false,
    }))
}

/// Apply one cleaned fragment.
///
/// The buffer always mirrors what this run has streamed, so the first fragment
/// replaces the previous document.
pub fn handle_chunk(state: &mut AppState, id: GenerationId, chunk: &str) -> UpdateResult {
    let Some(generation) = state.generation_mut(id) else {
        trace!("Dropping chunk from stale generation {}", id);
        return UpdateResult::none();
    };
    generation.received.push_str(chunk);
    let streamed = generation.received.clone();
    state.code = streamed;
    state.editor_draft = None;

    match sync_action(state) {
        Some(action) => UpdateResult::action(action),
        None => UpdateResult::none(),
    }
}

pub fn handle_completed(state: &mut AppState, id: GenerationId) -> UpdateResult {
    let Some(generation) = state.finish_generation(id, GenerationOutcome::Completed) else {
        return UpdateResult::none();
    };
    info!(
        "Generation {} complete ({} bytes)",
        id,
        generation.received.len()
    );
    if let Some(summary) = generation.summary {
        state.push_chat(ChatMessage::user(summary));
    }
    state.push_chat(ChatMessage::model(generation.kind.completion_text()));
    UpdateResult::none()
}

pub fn handle_failed(
    state: &mut AppState,
    id: GenerationId,
    error: String,
    rejected_key: Option<Provider>,
) -> UpdateResult {
    let outcome = GenerationOutcome::Failed {
        error: error.clone(),
        rejected_key,
    };
    let Some(generation) = state.finish_generation(id, outcome) else {
        return UpdateResult::none();
    };
    warn!("Generation {} failed: {}", id, error);
    state.add_log(format!("{}: {}", generation.kind.failure_log_prefix(), error));
    if let Some(provider) = rejected_key {
        state.add_log(format!("Update the {} in settings before retrying.", provider.label()));
    }
    state.push_chat(ChatMessage::system(format!("Error: {}", error)));
    state.set_error(error);
    UpdateResult::none()
}

/// Leave the builder: cancel the running generation and stop the preview.
pub fn handle_go_home(state: &mut AppState) -> UpdateResult {
    state.view = View::Home;
    if state.cancel_generation() {
        state.add_log("Generation cancelled.");
    }
    UpdateResult::message(Message::StopPreview)
}

/// Key the generation task will check before its first request.
pub fn required_keys(request: &GenerationRequest) -> &'static [Provider] {
    match request {
        GenerationRequest::Url { .. } => &[Provider::Gemini, Provider::Firecrawl],
        _ => &[Provider::Gemini],
    }
}
