//! Application state (Model in TEA pattern)

use std::collections::HashMap;

use tokio::sync::watch;

use pageforge_core::{
    ApiKeys, ChatMessage, LogEntry, Provider, SandboxStatus, ValidationStatus, View,
};

use crate::message::GenerationId;

/// Which chat action a generation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationKind {
    /// Fresh generation from a prompt or URL
    Create,
    /// Rewrite of the current buffer
    Refine,
}

impl GenerationKind {
    /// Model turn appended when the stream completes.
    pub fn completion_text(&self) -> &'static str {
        match self {
            GenerationKind::Create => "Code generation complete.",
            GenerationKind::Refine => "Refinement complete.",
        }
    }

    /// Prefix of the log line written on failure.
    pub fn failure_log_prefix(&self) -> &'static str {
        match self {
            GenerationKind::Create => "Error during generation",
            GenerationKind::Refine => "Error during refinement",
        }
    }
}

/// How the most recent generation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Completed,
    Failed {
        error: String,
        /// Set when the provider rejected this key; fixing it beats retrying
        rejected_key: Option<Provider>,
    },
    Cancelled,
}

impl GenerationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationOutcome::Completed)
    }
}

/// The generation currently allowed to write to the buffer.
#[derive(Debug)]
pub struct ActiveGeneration {
    pub id: GenerationId,
    pub kind: GenerationKind,
    /// User turn appended on completion (create only)
    pub summary: Option<String>,
    /// Buffer contents written by this run so far
    pub received: String,
    cancel_tx: watch::Sender<bool>,
}

impl ActiveGeneration {
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }
}

/// Per-provider key check in the settings panel.
#[derive(Debug, Clone, Copy, Default)]
struct KeyCheck {
    status: ValidationStatus,
    seq: u64,
}

/// Complete application state (the Model in TEA)
#[derive(Debug)]
pub struct AppState {
    pub view: View,

    /// The generated document
    pub code: String,

    /// Editor content not yet committed to `code`
    pub editor_draft: Option<String>,

    pub chat: Vec<ChatMessage>,

    pub logs: Vec<LogEntry>,

    /// The single current error shown to the user
    pub error: Option<String>,

    pub is_loading: bool,

    /// Persisted credentials
    pub keys: ApiKeys,

    /// Settings panel copy of the credentials, saved on request
    pub key_drafts: ApiKeys,

    pub sandbox_status: SandboxStatus,

    pub sandbox_url: Option<String>,

    /// Outcome of the last finished generation, `None` while one runs
    pub last_generation: Option<GenerationOutcome>,

    /// `error` currently holds a sandbox failure
    sandbox_error: bool,

    generation: Option<ActiveGeneration>,

    next_generation_id: GenerationId,

    key_checks: HashMap<Provider, KeyCheck>,

    quitting: bool,
}

impl AppState {
    pub fn new(keys: ApiKeys) -> Self {
        Self {
            view: View::Home,
            code: String::new(),
            editor_draft: None,
            chat: Vec::new(),
            logs: Vec::new(),
            error: None,
            is_loading: false,
            key_drafts: keys.clone(),
            keys,
            sandbox_status: SandboxStatus::Idle,
            sandbox_url: None,
            last_generation: None,
            sandbox_error: false,
            generation: None,
            next_generation_id: 0,
            key_checks: HashMap::new(),
            quitting: false,
        }
    }

    // ─────────────────────────────────────────────────────────
    // Logs, chat, error
    // ─────────────────────────────────────────────────────────

    pub fn add_log(&mut self, message: impl Into<String>) {
        self.logs.push(LogEntry::new(message));
    }

    pub fn push_chat(&mut self, message: ChatMessage) {
        self.chat.push(message);
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.sandbox_error = false;
    }

    pub fn clear_error(&mut self) {
        self.error = None;
        self.sandbox_error = false;
    }

    /// Error reported by the preview sandbox.
    ///
    /// `None` clears only an error the sandbox set itself.
    pub fn set_sandbox_error(&mut self, error: Option<String>) {
        match error {
            Some(error) => {
                self.error = Some(error);
                self.sandbox_error = true;
            }
            None if self.sandbox_error => self.clear_error(),
            None => {}
        }
    }

    // ─────────────────────────────────────────────────────────
    // Generation
    // ─────────────────────────────────────────────────────────

    /// Register a new generation, cancelling any previous one.
    ///
    /// Returns the new id and the receiver the stream watches for cancellation.
    pub fn begin_generation(
        &mut self,
        kind: GenerationKind,
        summary: Option<String>,
    ) -> (GenerationId, watch::Receiver<bool>) {
        self.cancel_generation();
        self.next_generation_id += 1;
        let id = self.next_generation_id;
        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.generation = Some(ActiveGeneration {
            id,
            kind,
            summary,
            received: String::new(),
            cancel_tx,
        });
        self.is_loading = true;
        self.last_generation = None;
        (id, cancel_rx)
    }

    pub fn active_generation(&self) -> Option<&ActiveGeneration> {
        self.generation.as_ref()
    }

    /// The active generation if it is `id`, for writing.
    pub fn generation_mut(&mut self, id: GenerationId) -> Option<&mut ActiveGeneration> {
        self.generation.as_mut().filter(|g| g.id == id)
    }

    /// Retire generation `id` with `outcome`. `None` when it is not the active one.
    pub fn finish_generation(
        &mut self,
        id: GenerationId,
        outcome: GenerationOutcome,
    ) -> Option<ActiveGeneration> {
        if self.generation.as_ref().map(|g| g.id) != Some(id) {
            return None;
        }
        self.is_loading = false;
        self.last_generation = Some(outcome);
        self.generation.take()
    }

    /// Cancel and forget the active generation. Returns whether one was running.
    pub fn cancel_generation(&mut self) -> bool {
        match self.generation.take() {
            Some(generation) => {
                generation.cancel();
                self.is_loading = false;
                self.last_generation = Some(GenerationOutcome::Cancelled);
                true
            }
            None => false,
        }
    }

    // ─────────────────────────────────────────────────────────
    // Key validation
    // ─────────────────────────────────────────────────────────

    pub fn validation_status(&self, provider: Provider) -> ValidationStatus {
        self.key_checks
            .get(&provider)
            .map(|c| c.status)
            .unwrap_or_default()
    }

    /// Mark `provider` as validating and return the sequence number of this request.
    pub fn begin_validation(&mut self, provider: Provider) -> u64 {
        let check = self.key_checks.entry(provider).or_default();
        check.seq += 1;
        check.status = ValidationStatus::Validating;
        check.seq
    }

    /// Apply a probe result unless a newer request superseded it.
    pub fn apply_validation(&mut self, provider: Provider, seq: u64, valid: bool) -> bool {
        match self.key_checks.get_mut(&provider) {
            Some(check) if check.seq == seq && check.status == ValidationStatus::Validating => {
                check.status = ValidationStatus::from(valid);
                true
            }
            _ => false,
        }
    }

    /// Back to idle; in-flight results for the old key are then ignored.
    pub fn reset_validation(&mut self, provider: Provider) {
        if let Some(check) = self.key_checks.get_mut(&provider) {
            check.status = ValidationStatus::Idle;
        }
    }

    // ─────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────

    pub fn request_quit(&mut self) {
        self.quitting = true;
    }

    pub fn should_quit(&self) -> bool {
        self.quitting
    }
}
