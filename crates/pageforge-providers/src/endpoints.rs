//! Base URLs for every remote service
//!
//! All of them can be overridden from `[endpoints]` in `config.toml`, which is
//! also how tests point the clients at a local listener.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Generative Language API, up to and including the version segment
    pub gemini: String,
    pub openai: String,
    pub anthropic: String,
    /// OpenAI-compatible API root
    pub groq: String,
    pub firecrawl: String,
    /// Sandbox control plane
    pub e2b_api: String,
    /// Domain under which sandbox ports are exposed
    pub e2b_domain: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            gemini: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            openai: "https://api.openai.com/v1".to_string(),
            anthropic: "https://api.anthropic.com/v1".to_string(),
            groq: "https://api.groq.com/openai/v1".to_string(),
            firecrawl: "https://api.firecrawl.dev/v0".to_string(),
            e2b_api: "https://api.e2b.dev".to_string(),
            e2b_domain: "e2b.app".to_string(),
        }
    }
}

/// Join a base URL and a path without doubling or dropping the slash.
pub fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
