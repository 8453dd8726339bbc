//! Configuration types for pageforge
//!
//! `Settings` mirrors `config.toml` section by section. Every field has a
//! default, so a partial file only overrides what it names.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use pageforge_providers::gemini::DEFAULT_MODEL;
use pageforge_providers::Endpoints;

/// Global application settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub generation: GenerationSettings,
    pub sandbox: SandboxSettings,
    pub editor: EditorSettings,
    pub scrape: ScrapeSettings,
    pub network: NetworkSettings,
    pub endpoints: Endpoints,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Model name passed to the generation endpoint
    pub model: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Live preview sandbox settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSettings {
    /// Port the static file server listens on inside the sandbox
    pub port: u16,
    /// Command that serves the working directory on `port`
    pub serve_command: String,
    /// File the generated document is written to
    pub served_file: String,
    /// Quiet period after the last code change before the preview updates
    pub debounce_ms: u64,
    /// How often a live session is checked for remote exit
    pub liveness_interval_ms: u64,
    /// Sandbox template to boot
    pub template: String,
    /// Remote lifetime of a session before the host reclaims it
    pub session_timeout_secs: u64,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            port: 8000,
            serve_command: "python3 -m http.server 8000".to_string(),
            served_file: "index.html".to_string(),
            debounce_ms: 500,
            liveness_interval_ms: 5000,
            template: "base".to_string(),
            session_timeout_secs: 300,
        }
    }
}

impl SandboxSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Never below 250ms
    pub fn liveness_interval(&self) -> Duration {
        Duration::from_millis(self.liveness_interval_ms.max(250))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Quiet period before direct edits are committed to the shared buffer
    pub debounce_ms: u64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self { debounce_ms: 400 }
    }
}

impl EditorSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Where "recreate from URL" gets page content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeMode {
    /// Real scrape through Firecrawl
    #[default]
    Firecrawl,
    /// Fixed "Scraped content for <url>" text, no network
    Placeholder,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeSettings {
    pub mode: ScrapeMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Bound on unary requests (probes, file writes, control plane)
    pub request_timeout_secs: u64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
        }
    }
}

impl NetworkSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}
