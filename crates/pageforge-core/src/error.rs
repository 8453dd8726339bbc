//! Application error types with rich context

use std::path::PathBuf;
use thiserror::Error;

use crate::provider::Provider;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Credential Errors
    // ─────────────────────────────────────────────────────────────
    #[error("{} not found. {}", .provider.label(), .provider.missing_hint())]
    CredentialMissing { provider: Provider },

    #[error("The provided {} is invalid.", .provider.label())]
    Auth { provider: Provider },

    // ─────────────────────────────────────────────────────────────
    // Provider Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Network error: {message}")]
    Transport { message: String },

    #[error("Failed to generate content from AI: {message}")]
    Generation { message: String },

    #[error("Scrape failed: {message}")]
    Scrape { message: String },

    #[error("Sandbox error: {message}")]
    Sandbox { message: String },

    #[error("Sandbox connection lost. It may have timed out.")]
    RemoteSessionLost,

    #[error("Invalid URL: {input}")]
    InvalidUrl { input: String },

    #[error("Operation cancelled")]
    Cancelled,

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel send error: {message}")]
    ChannelSend { message: String },

    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn credential_missing(provider: Provider) -> Self {
        Self::CredentialMissing { provider }
    }

    pub fn auth(provider: Provider) -> Self {
        Self::Auth { provider }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }

    pub fn scrape(message: impl Into<String>) -> Self {
        Self::Scrape {
            message: message.into(),
        }
    }

    pub fn sandbox(message: impl Into<String>) -> Self {
        Self::Sandbox {
            message: message.into(),
        }
    }

    pub fn invalid_url(input: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn channel_send(message: impl Into<String>) -> Self {
        Self::ChannelSend {
            message: message.into(),
        }
    }

    /// True when the provider rejected the credential itself.
    ///
    /// The UI uses this to send the user to settings instead of suggesting a retry.
    pub fn is_auth(&self) -> bool {
        self.rejected_provider().is_some()
    }

    /// Provider whose key was rejected, for auth failures.
    pub fn rejected_provider(&self) -> Option<Provider> {
        match self {
            Error::Auth { provider } => Some(*provider),
            _ => None,
        }
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Transport { .. }
                | Error::Generation { .. }
                | Error::Scrape { .. }
                | Error::Sandbox { .. }
                | Error::RemoteSessionLost
                | Error::ChannelSend { .. }
                | Error::Cancelled
        )
    }

    /// Check if this error should trigger application exit
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ChannelClosed)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
