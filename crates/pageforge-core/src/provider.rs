//! Credential-bearing providers and the key record persisted for them

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Every third-party service that needs an API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Primary model provider, used for all code generation
    Gemini,
    /// OpenAI-style model provider
    OpenAi,
    /// Messages-style model provider
    Anthropic,
    /// OpenAI-compatible model provider
    Groq,
    /// Scraping service for "recreate from URL"
    Firecrawl,
    /// Remote sandbox host for the live preview
    E2b,
}

impl Provider {
    /// All providers in display order.
    pub const ALL: [Provider; 6] = [
        Provider::Gemini,
        Provider::OpenAi,
        Provider::Anthropic,
        Provider::Groq,
        Provider::Firecrawl,
        Provider::E2b,
    ];

    /// Stable identifier used in the credential record and on the command line.
    pub fn id(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Groq => "groq",
            Provider::Firecrawl => "firecrawl",
            Provider::E2b => "e2b",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini API Key",
            Provider::OpenAi => "OpenAI API Key",
            Provider::Anthropic => "Anthropic API Key",
            Provider::Groq => "Groq API Key",
            Provider::Firecrawl => "Firecrawl API Key",
            Provider::E2b => "E2B API Key",
        }
    }

    /// Short name shown in status summaries ("Gemini", "E2B", ...)
    pub fn short_name(&self) -> &'static str {
        self.label().trim_end_matches(" API Key")
    }

    /// What to tell the user when the key is needed but absent.
    pub fn missing_hint(&self) -> &'static str {
        match self {
            Provider::Firecrawl => "Please add it for URL recreation.",
            _ => "Please add it in settings.",
        }
    }

    pub fn placeholder(&self) -> &'static str {
        match self {
            Provider::Gemini => "Enter your Gemini API key",
            Provider::OpenAi => "Enter your OpenAI key",
            Provider::Anthropic => "Enter your Anthropic key",
            Provider::Groq => "Enter your Groq key",
            Provider::Firecrawl => "For URL recreation",
            Provider::E2b => "For sandbox preview (optional)",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Provider::ALL
            .into_iter()
            .find(|p| p.id() == needle)
            .ok_or_else(|| {
                let known: Vec<&str> = Provider::ALL.iter().map(|p| p.id()).collect();
                format!("unknown provider '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

/// API keys for every provider. Empty string means "not set".
///
/// Serialized as a flat JSON object keyed by [`Provider::id`]. Missing fields
/// deserialize to empty strings so older records keep loading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub gemini: String,
    pub openai: String,
    pub anthropic: String,
    pub groq: String,
    pub firecrawl: String,
    pub e2b: String,
}

impl ApiKeys {
    pub fn get(&self, provider: Provider) -> &str {
        match provider {
            Provider::Gemini => &self.gemini,
            Provider::OpenAi => &self.openai,
            Provider::Anthropic => &self.anthropic,
            Provider::Groq => &self.groq,
            Provider::Firecrawl => &self.firecrawl,
            Provider::E2b => &self.e2b,
        }
    }

    pub fn set(&mut self, provider: Provider, value: impl Into<String>) {
        let slot = match provider {
            Provider::Gemini => &mut self.gemini,
            Provider::OpenAi => &mut self.openai,
            Provider::Anthropic => &mut self.anthropic,
            Provider::Groq => &mut self.groq,
            Provider::Firecrawl => &mut self.firecrawl,
            Provider::E2b => &mut self.e2b,
        };
        *slot = value.into();
    }

    pub fn is_configured(&self, provider: Provider) -> bool {
        !self.get(provider).is_empty()
    }

    /// Key for `provider`, or `None` when unset.
    pub fn require(&self, provider: Provider) -> Option<&str> {
        Some(self.get(provider)).filter(|k| !k.is_empty())
    }

    /// The header status light: green only when the primary model key is set.
    pub fn primary_configured(&self) -> bool {
        self.is_configured(Provider::Gemini)
    }

    /// "Configured" / "Not Set" per provider, in display order.
    pub fn status_summary(&self) -> Vec<(Provider, &'static str)> {
        Provider::ALL
            .into_iter()
            .map(|p| {
                let status = if self.is_configured(p) {
                    "Configured"
                } else {
                    "Not Set"
                };
                (p, status)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_round_trips_through_id() {
        for provider in Provider::ALL {
            assert_eq!(provider.id().parse::<Provider>().unwrap(), provider);
        }
        assert_eq!(" E2B ".parse::<Provider>().unwrap(), Provider::E2b);
    }

    #[test]
    fn test_unknown_provider_lists_known_ids() {
        let err = "mistral".parse::<Provider>().unwrap_err();
        assert!(err.contains("gemini"));
        assert!(err.contains("e2b"));
    }

    #[test]
    fn test_short_name_strips_suffix() {
        assert_eq!(Provider::E2b.short_name(), "E2B");
        assert_eq!(Provider::OpenAi.short_name(), "OpenAI");
    }

    #[test]
    fn test_missing_hint_mentions_url_mode_for_scraper() {
        assert!(Provider::Firecrawl.missing_hint().contains("URL recreation"));
        assert_eq!(Provider::Gemini.missing_hint(), "Please add it in settings.");
    }

    #[test]
    fn test_keys_default_to_empty() {
        let keys = ApiKeys::default();
        for provider in Provider::ALL {
            assert_eq!(keys.get(provider), "");
            assert!(keys.require(provider).is_none());
        }
        assert!(!keys.primary_configured());
    }

    #[test]
    fn test_set_and_get() {
        let mut keys = ApiKeys::default();
        keys.set(Provider::Groq, "gsk_123");
        assert_eq!(keys.get(Provider::Groq), "gsk_123");
        assert!(keys.is_configured(Provider::Groq));
        assert!(!keys.is_configured(Provider::OpenAi));
    }

    #[test]
    fn test_partial_record_fills_missing_fields() {
        let keys: ApiKeys = serde_json::from_str(r#"{"gemini":"g","unknown":"x"}"#).unwrap();
        assert_eq!(keys.gemini, "g");
        assert_eq!(keys.e2b, "");
    }

    #[test]
    fn test_status_summary_in_display_order() {
        let mut keys = ApiKeys::default();
        keys.set(Provider::Gemini, "g");
        let summary = keys.status_summary();
        assert_eq!(summary.len(), 6);
        assert_eq!(summary[0], (Provider::Gemini, "Configured"));
        assert_eq!(summary[5], (Provider::E2b, "Not Set"));
        assert!(keys.primary_configured());
    }
}
