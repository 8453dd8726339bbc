//! Domain types shared by every pageforge crate

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────
// Chat Transcript
// ─────────────────────────────────────────────────────────────────

/// Who authored a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
    System,
}

/// One turn in the append-only chat transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Model, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }
}

// ─────────────────────────────────────────────────────────────────
// Activity Log
// ─────────────────────────────────────────────────────────────────

/// A timestamped activity line shown in the Logs tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
}

impl LogEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            message: message.into(),
        }
    }

    /// `HH:MM:SS` in local time
    pub fn formatted_time(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.formatted_time(), self.message)
    }
}

// ─────────────────────────────────────────────────────────────────
// Sandbox Preview
// ─────────────────────────────────────────────────────────────────

/// Externally visible status of the preview sandbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxStatus {
    #[default]
    Idle,
    Connecting,
    Running,
    Error,
}

impl SandboxStatus {
    /// Label shown next to the preview status light
    pub fn indicator(&self) -> &'static str {
        match self {
            SandboxStatus::Idle => "Idle",
            SandboxStatus::Connecting => "Updating...",
            SandboxStatus::Running => "Live Preview",
            SandboxStatus::Error => "Error",
        }
    }
}

impl fmt::Display for SandboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SandboxStatus::Idle => "idle",
            SandboxStatus::Connecting => "connecting",
            SandboxStatus::Running => "running",
            SandboxStatus::Error => "error",
        };
        f.write_str(s)
    }
}

// ─────────────────────────────────────────────────────────────────
// Generation & Navigation
// ─────────────────────────────────────────────────────────────────

/// How a new generation is seeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Free-text description of the app
    Prompt,
    /// Recreate an existing page from its URL
    Url,
}

/// Top-level screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    /// Generation-mode chooser
    #[default]
    Home,
    /// Chat / code / preview panes
    Builder,
}

/// Result of checking one API key from the settings panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    #[default]
    Idle,
    Validating,
    Valid,
    Invalid,
}

impl From<bool> for ValidationStatus {
    fn from(valid: bool) -> Self {
        if valid {
            ValidationStatus::Valid
        } else {
            ValidationStatus::Invalid
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_chat_constructors_set_role() {
        assert_eq!(ChatMessage::user("hi").role, ChatRole::User);
        assert_eq!(ChatMessage::model("done").role, ChatRole::Model);
        assert_eq!(ChatMessage::system("oops").role, ChatRole::System);
    }

    #[test]
    fn test_chat_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::model("x")).unwrap();
        assert_eq!(json, r#"{"role":"model","content":"x"}"#);
    }

    #[test]
    fn test_log_entry_display_prefixes_time() {
        let entry = LogEntry {
            timestamp: Local.with_ymd_and_hms(2024, 5, 1, 9, 4, 7).unwrap(),
            message: "Sandbox preview updated.".to_string(),
        };
        assert_eq!(entry.to_string(), "[09:04:07] Sandbox preview updated.");
    }

    #[test]
    fn test_sandbox_status_default_is_idle() {
        assert_eq!(SandboxStatus::default(), SandboxStatus::Idle);
        assert_eq!(SandboxStatus::Connecting.to_string(), "connecting");
        assert_eq!(SandboxStatus::Running.indicator(), "Live Preview");
    }

    #[test]
    fn test_validation_status_from_bool() {
        assert_eq!(ValidationStatus::from(true), ValidationStatus::Valid);
        assert_eq!(ValidationStatus::from(false), ValidationStatus::Invalid);
    }
}
