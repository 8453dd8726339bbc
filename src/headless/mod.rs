//! Headless mode - NDJSON event output for scripting and E2E testing
//!
//! Every state change the builder would show is written to stdout as one JSON
//! object per line. Commands are read from stdin, one per line.

pub mod runner;

use serde::Serialize;

use pageforge_app::GenerationOutcome;
use pageforge_core::{ChatRole, LogEntry, Provider, SandboxStatus, ValidationStatus};

/// Events emitted in headless mode
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    /// Engine is up and ready for commands
    Ready { timestamp: i64 },

    /// A new activity log line
    Log {
        message: String,
        time: String,
        timestamp: i64,
    },

    /// A new chat turn
    Chat {
        role: ChatRole,
        content: String,
        timestamp: i64,
    },

    /// The working document changed
    CodeUpdated { length: usize, timestamp: i64 },

    /// A generation or refinement started
    GenerationStarted { timestamp: i64 },

    /// The running generation ended
    GenerationFinished {
        success: bool,
        length: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Provider whose key was rejected; retrying will not help until it changes
        #[serde(skip_serializing_if = "Option::is_none")]
        rejected_key: Option<Provider>,
        #[serde(skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
        timestamp: i64,
    },

    /// Preview sandbox status changed
    SandboxStatus {
        status: SandboxStatus,
        timestamp: i64,
    },

    /// Preview URL appeared, changed or went away
    PreviewUrl {
        url: Option<String>,
        timestamp: i64,
    },

    /// The user-facing error text was set
    Error {
        message: String,
        fatal: bool,
        timestamp: i64,
    },

    /// A key validation finished
    KeyValidated {
        provider: Provider,
        status: ValidationStatus,
        timestamp: i64,
    },

    /// A stdin line could not be understood
    CommandRejected {
        line: String,
        reason: String,
        timestamp: i64,
    },
}

impl HeadlessEvent {
    /// Emit this event as JSON to stdout
    pub fn emit(&self) {
        use std::io::Write;

        let mut stdout = std::io::stdout().lock();
        match serde_json::to_string(self) {
            Ok(json) => {
                // Ignore write errors; the reader may have gone away
                let _ = writeln!(stdout, "{}", json);
                let _ = stdout.flush();
            }
            Err(e) => {
                // Log to stderr so stdout stays valid NDJSON
                eprintln!("Failed to serialize event: {}", e);
            }
        }
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    // Convenience constructors

    pub fn ready() -> Self {
        Self::Ready {
            timestamp: Self::now(),
        }
    }

    pub fn log(entry: &LogEntry) -> Self {
        Self::Log {
            message: entry.message.clone(),
            time: entry.formatted_time(),
            timestamp: entry.timestamp.timestamp_millis(),
        }
    }

    pub fn chat(role: ChatRole, content: &str) -> Self {
        Self::Chat {
            role,
            content: content.to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn code_updated(length: usize) -> Self {
        Self::CodeUpdated {
            length,
            timestamp: Self::now(),
        }
    }

    pub fn generation_started() -> Self {
        Self::GenerationStarted {
            timestamp: Self::now(),
        }
    }

    pub fn generation_finished(outcome: Option<&GenerationOutcome>, length: usize) -> Self {
        let (error, rejected_key) = match outcome {
            Some(GenerationOutcome::Failed {
                error,
                rejected_key,
            }) => (Some(error.clone()), *rejected_key),
            Some(GenerationOutcome::Cancelled) => {
                (Some("Generation cancelled.".to_string()), None)
            }
            _ => (None, None),
        };
        Self::GenerationFinished {
            success: outcome.is_some_and(GenerationOutcome::is_success),
            length,
            error,
            rejected_key,
            hint: rejected_key
                .map(|provider| format!("Run `pageforge keys set {} <key>` and retry.", provider)),
            timestamp: Self::now(),
        }
    }

    pub fn sandbox_status(status: SandboxStatus) -> Self {
        Self::SandboxStatus {
            status,
            timestamp: Self::now(),
        }
    }

    pub fn preview_url(url: Option<&str>) -> Self {
        Self::PreviewUrl {
            url: url.map(str::to_string),
            timestamp: Self::now(),
        }
    }

    pub fn error(message: &str, fatal: bool) -> Self {
        Self::Error {
            message: message.to_string(),
            fatal,
            timestamp: Self::now(),
        }
    }

    pub fn key_validated(provider: Provider, status: ValidationStatus) -> Self {
        Self::KeyValidated {
            provider,
            status,
            timestamp: Self::now(),
        }
    }

    pub fn command_rejected(line: &str, reason: impl Into<String>) -> Self {
        Self::CommandRejected {
            line: line.to_string(),
            reason: reason.into(),
            timestamp: Self::now(),
        }
    }
}
