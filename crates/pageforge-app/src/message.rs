//! Message types for the application (TEA pattern)

use std::path::PathBuf;

use pageforge_core::{ApiKeys, GenerationMode, Provider};

use crate::sandbox::SandboxEvent;

/// Identifies one generation run. Chunks from older runs are discarded.
pub type GenerationId = u64;

/// All possible messages/actions in the application
#[derive(Debug, Clone)]
pub enum Message {
    // ─────────────────────────────────────────────────────────
    // Generation Messages
    // ─────────────────────────────────────────────────────────
    /// Start a fresh generation from the home view
    StartGeneration { mode: GenerationMode, input: String },

    /// Refine the current buffer with a chat instruction
    Refine { instruction: String },

    /// Cleaned text fragment from a running generation
    GenerationChunk { id: GenerationId, chunk: String },

    /// Progress line from a running generation
    GenerationLog { id: GenerationId, message: String },

    /// Generation stream ended normally
    GenerationCompleted { id: GenerationId },

    /// Generation failed (credential, auth, transport or provider error)
    GenerationFailed {
        id: GenerationId,
        error: String,
        rejected_key: Option<Provider>,
    },

    // ─────────────────────────────────────────────────────────
    // Editor Messages
    // ─────────────────────────────────────────────────────────
    /// Raw editor content; committed after the editor quiet period
    EditorInput { text: String },

    /// Editor content that survived the quiet period
    CodeCommitted { text: String },

    // ─────────────────────────────────────────────────────────
    // Preview Messages
    // ─────────────────────────────────────────────────────────
    /// Update the preview now
    RefreshPreview,

    /// Tear the preview down
    StopPreview,

    /// Status, URL, log or error change from the sandbox layer
    Sandbox(SandboxEvent),

    // ─────────────────────────────────────────────────────────
    // Navigation
    // ─────────────────────────────────────────────────────────
    /// Leave the builder: cancels generation and stops the preview
    GoHome,

    // ─────────────────────────────────────────────────────────
    // Settings Messages
    // ─────────────────────────────────────────────────────────
    /// Edit a key in the settings draft
    SetApiKey { provider: Provider, value: String },

    /// Persist the settings draft
    SaveApiKeys,

    /// Credential record written
    KeysSaved { keys: ApiKeys },

    /// Credential record could not be written
    KeysSaveFailed { error: String },

    /// Probe the drafted key for `provider`
    ValidateKey { provider: Provider },

    /// Probe result; `seq` ties it to the request that produced it
    KeyValidated {
        provider: Provider,
        seq: u64,
        valid: bool,
    },

    // ─────────────────────────────────────────────────────────
    // Export Messages
    // ─────────────────────────────────────────────────────────
    /// Write the current buffer to `path`
    ExportCode { path: PathBuf },

    CodeExported { path: PathBuf },

    ExportFailed { path: PathBuf, error: String },

    /// Exit (signal handler, `quit` command, end of input)
    Quit,
}
