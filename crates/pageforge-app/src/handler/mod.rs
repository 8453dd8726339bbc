//! Handler module - TEA update function and event handlers
//!
//! Organized into submodules:
//! - `update`: Main update() function and message dispatch
//! - `generation`: Start, refine, streamed chunks and completion
//! - `preview`: Editor commits and sandbox events
//! - `settings`: Key drafts, saving and validation

pub(crate) mod generation;
pub(crate) mod preview;
pub(crate) mod settings;
pub(crate) mod update;

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use tokio::sync::watch;

use pageforge_core::{ApiKeys, Provider};

use crate::message::{GenerationId, Message};

// Re-export main entry point
pub use update::update;

/// What a generation run asks the model for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRequest {
    /// Free-text description
    Prompt { description: String },
    /// Page to scrape and recreate
    Url { url: String },
    /// Rewrite `current_code` following `instruction`
    Refine {
        instruction: String,
        current_code: String,
    },
}

/// Everything the generation task needs, captured at dispatch time
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub id: GenerationId,
    pub request: GenerationRequest,
    pub gemini_key: String,
    pub firecrawl_key: String,
    /// Flips to `true` when the run is cancelled
    pub cancel_rx: watch::Receiver<bool>,
    /// Tear the preview down (and wait for it) before generating
    pub stop_sandbox: bool,
}

/// Actions that the event loop should perform after update
#[derive(Debug, Clone)]
pub enum UpdateAction {
    /// Spawn a generation task
    Generate(GenerationJob),

    /// Schedule a preview update after the sandbox quiet period
    SyncSandbox { code: String, api_key: String },

    /// Update the preview immediately
    RefreshSandbox { code: String, api_key: String },

    /// Tear the preview down
    StopSandbox,

    /// Feed raw editor input to the editor debounce
    EditorInput { text: String },

    /// Write the credential record
    SaveKeys { keys: ApiKeys },

    /// Probe a key; the result comes back tagged with `seq`
    ValidateKey {
        provider: Provider,
        key: String,
        seq: u64,
    },

    /// Write `code` to `path`
    ExportCode { path: PathBuf, code: String },
}

/// Result of processing a message
#[derive(Debug, Default)]
pub struct UpdateResult {
    /// Optional follow-up message to process
    pub message: Option<Message>,
    /// Optional action for the event loop to perform
    pub action: Option<UpdateAction>,
}

impl UpdateResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn message(msg: Message) -> Self {
        Self {
            message: Some(msg),
            action: None,
        }
    }

    pub fn action(action: UpdateAction) -> Self {
        Self {
            message: None,
            action: Some(action),
        }
    }
}
