//! Tests for the update function

use std::path::PathBuf;

use pageforge_core::{
    ApiKeys, ChatRole, GenerationMode, Provider, SandboxStatus, ValidationStatus, View,
};

use super::{update, GenerationJob, GenerationRequest, UpdateAction};
use crate::message::Message;
use crate::sandbox::SandboxEvent;
use crate::state::{AppState, GenerationOutcome};

fn keys(gemini: &str, e2b: &str) -> ApiKeys {
    ApiKeys {
        gemini: gemini.to_string(),
        e2b: e2b.to_string(),
        ..ApiKeys::default()
    }
}

fn start(state: &mut AppState, mode: GenerationMode, input: &str) -> Option<GenerationJob> {
    let result = update(
        state,
        Message::StartGeneration {
            mode,
            input: input.to_string(),
        },
    );
    match result.action {
        Some(UpdateAction::Generate(job)) => Some(job),
        _ => None,
    }
}

fn chunk(state: &mut AppState, id: u64, text: &str) -> Option<UpdateAction> {
    update(
        state,
        Message::GenerationChunk {
            id,
            chunk: text.to_string(),
        },
    )
    .action
}

#[test]
fn test_start_generation_resets_state_and_enters_builder() {
    let mut state = AppState::new(keys("g", ""));
    state.code = "old".to_string();
    state.add_log("old line");
    state.set_error("old error");

    let job = start(&mut state, GenerationMode::Prompt, "a todo app").unwrap();

    assert_eq!(state.view, View::Builder);
    assert!(state.is_loading);
    assert!(state.code.is_empty());
    assert!(state.logs.is_empty());
    assert!(state.error.is_none());
    assert_eq!(state.chat.len(), 1);
    assert_eq!(state.chat[0].role, ChatRole::System);
    assert_eq!(state.chat[0].content, "Starting new generation...");
    assert!(job.stop_sandbox);
    assert_eq!(job.gemini_key, "g");
    assert_eq!(
        job.request,
        GenerationRequest::Prompt {
            description: "a todo app".to_string()
        }
    );
}

#[test]
fn test_start_with_bad_url_stays_home() {
    let mut state = AppState::new(keys("g", ""));

    assert!(start(&mut state, GenerationMode::Url, "not a url").is_none());
    assert!(start(&mut state, GenerationMode::Url, "ftp://example.com").is_none());

    assert_eq!(state.view, View::Home);
    assert!(!state.is_loading);
    assert!(state.error.as_deref().unwrap().starts_with("Invalid URL"));
    assert_eq!(
        state.logs.last().unwrap().message,
        "Error: Invalid URL: ftp://example.com"
    );
    let last = state.chat.last().unwrap();
    assert_eq!(last.role, ChatRole::System);
    assert_eq!(last.content, "Error: Invalid URL: ftp://example.com");
}

#[test]
fn test_start_ignored_while_loading() {
    let mut state = AppState::new(keys("g", ""));
    start(&mut state, GenerationMode::Prompt, "first").unwrap();

    assert!(start(&mut state, GenerationMode::Prompt, "second").is_none());
    assert!(start(&mut state, GenerationMode::Prompt, "   ").is_none());
}

#[test]
fn test_chunks_append_and_completion_adds_turns() {
    let mut state = AppState::new(keys("g", ""));
    let job = start(&mut state, GenerationMode::Url, "https://example.com").unwrap();

    chunk(&mut state, job.id, "<!DOCTYPE html>");
    chunk(&mut state, job.id, "<html>");
    chunk(&mut state, job.id, "</html>");
    update(&mut state, Message::GenerationCompleted { id: job.id });

    assert_eq!(state.code, "<!DOCTYPE html><html></html>");
    assert!(!state.is_loading);
    let turns: Vec<(ChatRole, &str)> = state
        .chat
        .iter()
        .map(|m| (m.role, m.content.as_str()))
        .collect();
    assert_eq!(
        turns,
        vec![
            (ChatRole::System, "Starting new generation..."),
            (ChatRole::User, "Recreating from URL: \"https://example.com\""),
            (ChatRole::Model, "Code generation complete."),
        ]
    );
}

#[test]
fn test_editor_commit_during_stream_does_not_leak_into_buffer() {
    let mut state = AppState::new(keys("g", ""));
    let job = start(&mut state, GenerationMode::Prompt, "x").unwrap();

    chunk(&mut state, job.id, "<!DOCTYPE html>");
    update(
        &mut state,
        Message::CodeCommitted {
            text: "USER EDIT".to_string(),
        },
    );
    assert_eq!(state.code, "<!DOCTYPE html>");

    chunk(&mut state, job.id, "<html></html>");
    update(&mut state, Message::GenerationCompleted { id: job.id });
    assert_eq!(state.code, "<!DOCTYPE html><html></html>");

    // Edits apply again once the run is over
    update(
        &mut state,
        Message::CodeCommitted {
            text: "USER EDIT".to_string(),
        },
    );
    assert_eq!(state.code, "USER EDIT");
}

#[test]
fn test_chunks_overwrite_direct_buffer_changes() {
    let mut state = AppState::new(keys("g", ""));
    state.code = "<p>old</p>".to_string();
    let job = match update(
        &mut state,
        Message::Refine {
            instruction: "bigger".to_string(),
        },
    )
    .action
    {
        Some(UpdateAction::Generate(job)) => job,
        other => panic!("expected Generate, got {:?}", other),
    };

    chunk(&mut state, job.id, "<h1>");
    state.code.push_str("stray");
    chunk(&mut state, job.id, "big</h1>");
    assert_eq!(state.code, "<h1>big</h1>");
}

#[test]
fn test_rejected_key_failure_is_recorded() {
    let mut state = AppState::new(keys("bad", ""));
    let job = start(&mut state, GenerationMode::Prompt, "x").unwrap();

    update(
        &mut state,
        Message::GenerationFailed {
            id: job.id,
            error: "The provided Gemini API Key is invalid.".to_string(),
            rejected_key: Some(Provider::Gemini),
        },
    );

    assert_eq!(
        state.last_generation,
        Some(GenerationOutcome::Failed {
            error: "The provided Gemini API Key is invalid.".to_string(),
            rejected_key: Some(Provider::Gemini),
        })
    );
    assert_eq!(
        state.logs.last().unwrap().message,
        "Update the Gemini API Key in settings before retrying."
    );
    assert_eq!(
        state.error.as_deref(),
        Some("The provided Gemini API Key is invalid.")
    );
}

#[test]
fn test_sandbox_events_do_not_touch_generation_outcome() {
    let mut state = AppState::new(keys("g", "e2b"));
    let job = start(&mut state, GenerationMode::Prompt, "x").unwrap();
    chunk(&mut state, job.id, "<p>");
    update(&mut state, Message::GenerationCompleted { id: job.id });

    update(
        &mut state,
        Message::Sandbox(SandboxEvent::Error(Some(
            "The provided E2B API Key is invalid.".to_string(),
        ))),
    );
    assert_eq!(state.last_generation, Some(GenerationOutcome::Completed));
}

#[test]
fn test_sandbox_start_does_not_clear_generation_error() {
    let mut state = AppState::new(keys("g", "e2b"));
    let job = start(&mut state, GenerationMode::Prompt, "x").unwrap();
    chunk(&mut state, job.id, "<p>");
    update(
        &mut state,
        Message::GenerationFailed {
            id: job.id,
            error: "stream reset".to_string(),
            rejected_key: None,
        },
    );

    update(&mut state, Message::Sandbox(SandboxEvent::Error(None)));
    assert_eq!(state.error.as_deref(), Some("stream reset"));
}

#[test]
fn test_chunk_schedules_preview_only_with_sandbox_key() {
    let mut state = AppState::new(keys("g", ""));
    let job = start(&mut state, GenerationMode::Prompt, "x").unwrap();
    assert!(chunk(&mut state, job.id, "<p>").is_none());

    let mut state = AppState::new(keys("g", "e2b"));
    let job = start(&mut state, GenerationMode::Prompt, "x").unwrap();
    match chunk(&mut state, job.id, "<p>") {
        Some(UpdateAction::SyncSandbox { code, api_key }) => {
            assert_eq!(code, "<p>");
            assert_eq!(api_key, "e2b");
        }
        other => panic!("expected SyncSandbox, got {:?}", other),
    }
}

#[test]
fn test_go_home_cancels_and_drops_late_chunks() {
    let mut state = AppState::new(keys("g", ""));
    let job = start(&mut state, GenerationMode::Prompt, "x").unwrap();
    chunk(&mut state, job.id, "<html>");

    let result = update(&mut state, Message::GoHome);
    assert!(result.action.is_none());
    assert!(matches!(result.message, Some(Message::StopPreview)));
    assert!(matches!(
        update(&mut state, Message::StopPreview).action,
        Some(UpdateAction::StopSandbox)
    ));
    assert!(*job.cancel_rx.borrow());
    assert_eq!(state.view, View::Home);
    assert!(!state.is_loading);

    chunk(&mut state, job.id, "late");
    update(&mut state, Message::GenerationCompleted { id: job.id });
    assert_eq!(state.code, "<html>");
    assert_eq!(state.chat.len(), 1);
}

#[test]
fn test_generation_failure_records_error_everywhere() {
    let mut state = AppState::new(keys("", ""));
    let job = start(&mut state, GenerationMode::Prompt, "x").unwrap();

    let error = "Gemini API Key not found. Please add it in settings.";
    update(
        &mut state,
        Message::GenerationFailed {
            id: job.id,
            error: error.to_string(),
            rejected_key: None,
        },
    );

    assert_eq!(state.error.as_deref(), Some(error));
    assert!(!state.is_loading);
    assert_eq!(
        state.logs.last().unwrap().message,
        format!("Error during generation: {}", error)
    );
    let last = state.chat.last().unwrap();
    assert_eq!(last.role, ChatRole::System);
    assert_eq!(last.content, format!("Error: {}", error));
}

#[test]
fn test_refine_replaces_code_on_first_chunk() {
    let mut state = AppState::new(keys("g", ""));
    state.view = View::Builder;
    state.code = "<p>old</p>".to_string();

    let result = update(
        &mut state,
        Message::Refine {
            instruction: "make it blue".to_string(),
        },
    );
    let job = match result.action {
        Some(UpdateAction::Generate(job)) => job,
        other => panic!("expected Generate, got {:?}", other),
    };
    assert!(!job.stop_sandbox);
    assert_eq!(
        job.request,
        GenerationRequest::Refine {
            instruction: "make it blue".to_string(),
            current_code: "<p>old</p>".to_string(),
        }
    );
    assert_eq!(state.code, "<p>old</p>");

    chunk(&mut state, job.id, "<p class=\"blue\">");
    chunk(&mut state, job.id, "new</p>");
    update(&mut state, Message::GenerationCompleted { id: job.id });

    assert_eq!(state.code, "<p class=\"blue\">new</p>");
    assert_eq!(state.chat[0].content, "make it blue");
    assert_eq!(state.chat[1].content, "Refinement complete.");
}

#[test]
fn test_refine_failure_keeps_partial_code() {
    let mut state = AppState::new(keys("g", ""));
    state.code = "<p>old</p>".to_string();
    let job = match update(
        &mut state,
        Message::Refine {
            instruction: "shrink".to_string(),
        },
    )
    .action
    {
        Some(UpdateAction::Generate(job)) => job,
        other => panic!("expected Generate, got {:?}", other),
    };

    chunk(&mut state, job.id, "<p>par");
    update(
        &mut state,
        Message::GenerationFailed {
            id: job.id,
            error: "stream reset".to_string(),
            rejected_key: None,
        },
    );

    assert_eq!(state.code, "<p>par");
    assert_eq!(
        state.logs.last().unwrap().message,
        "Error during refinement: stream reset"
    );
}

#[test]
fn test_committed_edit_schedules_preview() {
    let mut state = AppState::new(keys("g", "e2b"));
    let result = update(
        &mut state,
        Message::EditorInput {
            text: "<h1>".to_string(),
        },
    );
    assert!(matches!(result.action, Some(UpdateAction::EditorInput { .. })));
    assert_eq!(state.editor_draft.as_deref(), Some("<h1>"));

    let result = update(
        &mut state,
        Message::CodeCommitted {
            text: "<h1>".to_string(),
        },
    );
    assert_eq!(state.code, "<h1>");
    assert!(state.editor_draft.is_none());
    assert!(matches!(result.action, Some(UpdateAction::SyncSandbox { .. })));
}

#[test]
fn test_refresh_skipped_while_connecting_or_empty() {
    let mut state = AppState::new(keys("g", "e2b"));
    assert!(update(&mut state, Message::RefreshPreview).action.is_none());

    state.code = "<p>".to_string();
    state.sandbox_status = SandboxStatus::Connecting;
    assert!(update(&mut state, Message::RefreshPreview).action.is_none());

    state.sandbox_status = SandboxStatus::Error;
    assert!(matches!(
        update(&mut state, Message::RefreshPreview).action,
        Some(UpdateAction::RefreshSandbox { .. })
    ));
}

#[test]
fn test_sandbox_events_update_state() {
    let mut state = AppState::new(ApiKeys::default());
    update(&mut state, Message::Sandbox(SandboxEvent::Status(SandboxStatus::Running)));
    update(
        &mut state,
        Message::Sandbox(SandboxEvent::Url(Some("https://8000-x.e2b.app?_=1".to_string()))),
    );
    update(
        &mut state,
        Message::Sandbox(SandboxEvent::Log("Sandbox preview updated.".to_string())),
    );

    assert_eq!(state.sandbox_status, SandboxStatus::Running);
    assert_eq!(state.sandbox_url.as_deref(), Some("https://8000-x.e2b.app?_=1"));
    assert_eq!(state.logs[0].message, "Sandbox preview updated.");

    update(&mut state, Message::Sandbox(SandboxEvent::Error(Some("boom".to_string()))));
    assert_eq!(state.error.as_deref(), Some("boom"));
    update(&mut state, Message::Sandbox(SandboxEvent::Url(None)));
    assert!(state.sandbox_url.is_none());
}

#[test]
fn test_save_keys_flow() {
    let mut state = AppState::new(ApiKeys::default());
    update(
        &mut state,
        Message::SetApiKey {
            provider: Provider::Gemini,
            value: "  g-key ".to_string(),
        },
    );
    assert_eq!(state.key_drafts.gemini, "g-key");
    assert_eq!(state.keys.gemini, "");

    let keys = match update(&mut state, Message::SaveApiKeys).action {
        Some(UpdateAction::SaveKeys { keys }) => keys,
        other => panic!("expected SaveKeys, got {:?}", other),
    };
    update(&mut state, Message::KeysSaved { keys });

    assert_eq!(state.keys.gemini, "g-key");
    assert_eq!(state.logs.last().unwrap().message, "API Keys updated.");
}

#[test]
fn test_new_sandbox_key_schedules_preview_for_existing_code() {
    let mut state = AppState::new(keys("g", ""));
    state.code = "<p>".to_string();

    let result = update(
        &mut state,
        Message::KeysSaved {
            keys: keys("g", "e2b"),
        },
    );
    assert!(matches!(result.action, Some(UpdateAction::SyncSandbox { .. })));
}

#[test]
fn test_validation_flow_ignores_superseded_result() {
    let mut state = AppState::new(ApiKeys::default());
    let first = match update(&mut state, Message::ValidateKey { provider: Provider::Groq }).action {
        Some(UpdateAction::ValidateKey { seq, .. }) => seq,
        other => panic!("expected ValidateKey, got {:?}", other),
    };
    let second = match update(&mut state, Message::ValidateKey { provider: Provider::Groq }).action {
        Some(UpdateAction::ValidateKey { seq, .. }) => seq,
        other => panic!("expected ValidateKey, got {:?}", other),
    };

    update(
        &mut state,
        Message::KeyValidated {
            provider: Provider::Groq,
            seq: second,
            valid: true,
        },
    );
    update(
        &mut state,
        Message::KeyValidated {
            provider: Provider::Groq,
            seq: first,
            valid: false,
        },
    );
    assert_eq!(state.validation_status(Provider::Groq), ValidationStatus::Valid);

    update(
        &mut state,
        Message::SetApiKey {
            provider: Provider::Groq,
            value: "new".to_string(),
        },
    );
    assert_eq!(state.validation_status(Provider::Groq), ValidationStatus::Idle);
}

#[test]
fn test_export_requires_code() {
    let mut state = AppState::new(ApiKeys::default());
    let result = update(
        &mut state,
        Message::ExportCode {
            path: PathBuf::from("out.html"),
        },
    );
    assert!(result.action.is_none());
    assert!(state.error.is_some());

    state.code = "<p>".to_string();
    let result = update(
        &mut state,
        Message::ExportCode {
            path: PathBuf::from("out.html"),
        },
    );
    assert!(matches!(result.action, Some(UpdateAction::ExportCode { .. })));
}

#[test]
fn test_quit_sets_flag() {
    let mut state = AppState::new(ApiKeys::default());
    update(&mut state, Message::Quit);
    assert!(state.should_quit());
}
