//! API key validation probes
//!
//! Each provider gets the cheapest request that tells a good key from a bad
//! one. How the response is judged differs per provider: list endpoints must
//! succeed, while message and scrape endpoints only rule out `401`, since a
//! valid key can still get a `400` for the deliberately tiny request.
//! Transport failures always count as invalid.

use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::json;

use pageforge_core::prelude::*;
use pageforge_core::Provider;

use crate::endpoints::{join, Endpoints};
use crate::gemini::GeminiClient;
use crate::http::transport_error;
use crate::sandbox::SandboxProvider;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_PROBE_MODEL: &str = "claude-3-haiku-20240307";
const PROBE_PAGE: &str = "https://example.com";

/// How a probe response is turned into valid / invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Any 2xx
    Success,
    /// Anything except 401
    NotUnauthorized,
    /// The probe call itself returning `Ok`
    CallSucceeds,
}

impl Verdict {
    pub fn for_provider(provider: Provider) -> Self {
        match provider {
            Provider::OpenAi | Provider::Groq => Verdict::Success,
            Provider::Anthropic | Provider::Firecrawl => Verdict::NotUnauthorized,
            Provider::Gemini | Provider::E2b => Verdict::CallSucceeds,
        }
    }

    /// Judge an HTTP status. Only meaningful for status-based verdicts.
    pub fn accepts(&self, status: StatusCode) -> bool {
        match self {
            Verdict::Success | Verdict::CallSucceeds => status.is_success(),
            Verdict::NotUnauthorized => status != StatusCode::UNAUTHORIZED,
        }
    }
}

/// Runs one probe per provider.
pub struct KeyValidator<S> {
    http: reqwest::Client,
    endpoints: Endpoints,
    gemini: GeminiClient,
    sandbox: Arc<S>,
}

impl<S: SandboxProvider + Sync> KeyValidator<S> {
    pub fn new(http: reqwest::Client, endpoints: Endpoints, gemini: GeminiClient, sandbox: Arc<S>) -> Self {
        Self {
            http,
            endpoints,
            gemini,
            sandbox,
        }
    }

    /// `true` iff `key` is accepted by `provider`.
    ///
    /// An empty key is invalid and sends nothing.
    pub async fn validate(&self, provider: Provider, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        let verdict = Verdict::for_provider(provider);
        let outcome = match provider {
            Provider::Gemini => self.gemini.probe(key).await.map(|_| true),
            Provider::E2b => self.probe_sandbox(key).await.map(|_| true),
            Provider::OpenAi => self
                .status_of(self.http.get(join(&self.endpoints.openai, "models")).bearer_auth(key))
                .await
                .map(|s| verdict.accepts(s)),
            Provider::Groq => self
                .status_of(self.http.get(join(&self.endpoints.groq, "models")).bearer_auth(key))
                .await
                .map(|s| verdict.accepts(s)),
            Provider::Anthropic => {
                let request = self
                    .http
                    .post(join(&self.endpoints.anthropic, "messages"))
                    .header("x-api-key", key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&json!({
                        "model": ANTHROPIC_PROBE_MODEL,
                        "max_tokens": 1,
                        "messages": [{ "role": "user", "content": "test" }],
                    }));
                self.status_of(request).await.map(|s| verdict.accepts(s))
            }
            Provider::Firecrawl => {
                let request = self
                    .http
                    .post(join(&self.endpoints.firecrawl, "scrape"))
                    .bearer_auth(key)
                    .json(&json!({ "url": PROBE_PAGE }));
                self.status_of(request).await.map(|s| verdict.accepts(s))
            }
        };

        match outcome {
            Ok(valid) => {
                debug!("{} key probe: valid={}", provider, valid);
                valid
            }
            Err(e) => {
                debug!("{} key probe failed: {}", provider, e);
                false
            }
        }
    }

    async fn status_of(&self, request: reqwest::RequestBuilder) -> Result<StatusCode> {
        let response = request.send().await.map_err(transport_error)?;
        Ok(response.status())
    }

    async fn probe_sandbox(&self, key: &str) -> Result<()> {
        let session = SandboxProvider::create_session(self.sandbox.as_ref(), key).await?;
        SandboxProvider::kill_session(self.sandbox.as_ref(), &session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_http::{MockResponse, MockServer};
    use crate::test_utils::FakeSandboxProvider;

    fn validator(base: &str, sandbox: FakeSandboxProvider) -> KeyValidator<FakeSandboxProvider> {
        let endpoints = Endpoints {
            gemini: base.to_string(),
            openai: base.to_string(),
            anthropic: base.to_string(),
            groq: base.to_string(),
            firecrawl: base.to_string(),
            ..Endpoints::default()
        };
        let http = reqwest::Client::new();
        let gemini = GeminiClient::new(http.clone(), base, "gemini-test");
        KeyValidator::new(http, endpoints, gemini, Arc::new(sandbox))
    }

    #[test]
    fn test_verdicts_per_provider() {
        let not_401 = Verdict::for_provider(Provider::Anthropic);
        assert!(not_401.accepts(StatusCode::BAD_REQUEST));
        assert!(!not_401.accepts(StatusCode::UNAUTHORIZED));

        let success = Verdict::for_provider(Provider::Groq);
        assert!(success.accepts(StatusCode::OK));
        assert!(!success.accepts(StatusCode::BAD_REQUEST));
        assert_eq!(Verdict::for_provider(Provider::Firecrawl), Verdict::NotUnauthorized);
    }

    #[tokio::test]
    async fn test_empty_key_is_invalid_without_request() {
        // Nothing listens on the discard port; any request would fail loudly.
        let v = validator("http://127.0.0.1:9", FakeSandboxProvider::new());
        for provider in Provider::ALL {
            assert!(!v.validate(provider, "").await);
        }
    }

    #[tokio::test]
    async fn test_anthropic_bad_request_still_counts_as_valid() {
        let server = MockServer::start(vec![
            MockResponse::json(400, r#"{"type":"error"}"#),
            MockResponse::json(401, r#"{"type":"error"}"#),
        ])
        .await;
        let v = validator(&server.base_url(), FakeSandboxProvider::new());

        assert!(v.validate(Provider::Anthropic, "sk-ant-good").await);
        assert!(!v.validate(Provider::Anthropic, "sk-ant-bad").await);

        let requests = server.requests().await;
        assert_eq!(requests[0].path, "/messages");
        assert_eq!(requests[0].header("anthropic-version"), Some(ANTHROPIC_VERSION));
        assert_eq!(requests[0].header("x-api-key"), Some("sk-ant-good"));
    }

    #[tokio::test]
    async fn test_openai_requires_success_status() {
        let server = MockServer::start(vec![
            MockResponse::json(200, r#"{"data":[]}"#),
            MockResponse::json(429, r#"{"error":{"message":"slow down"}}"#),
        ])
        .await;
        let v = validator(&server.base_url(), FakeSandboxProvider::new());

        assert!(v.validate(Provider::OpenAi, "sk-1").await);
        assert!(!v.validate(Provider::OpenAi, "sk-1").await);

        let requests = server.requests().await;
        assert_eq!(requests[0].path, "/models");
        assert_eq!(requests[0].header("authorization"), Some("Bearer sk-1"));
    }

    #[tokio::test]
    async fn test_firecrawl_probe_scrapes_example_page() {
        let server = MockServer::start(vec![MockResponse::json(402, r#"{"error":"payment"}"#)]).await;
        let v = validator(&server.base_url(), FakeSandboxProvider::new());

        assert!(v.validate(Provider::Firecrawl, "fc-1").await);
        let requests = server.requests().await;
        assert!(requests[0].body.contains(PROBE_PAGE));
    }

    #[tokio::test]
    async fn test_gemini_probe_uses_generate_content() {
        let server = MockServer::start(vec![
            MockResponse::json(200, r#"{"candidates":[]}"#),
            MockResponse::json(400, r#"{"error":{"code":400,"message":"API key not valid."}}"#),
        ])
        .await;
        let v = validator(&server.base_url(), FakeSandboxProvider::new());

        assert!(v.validate(Provider::Gemini, "g-good").await);
        assert!(!v.validate(Provider::Gemini, "g-bad").await);
        let requests = server.requests().await;
        assert_eq!(requests[0].path, "/models/gemini-test:generateContent");
    }

    #[tokio::test]
    async fn test_transport_failure_is_invalid() {
        let v = validator("http://127.0.0.1:9", FakeSandboxProvider::new());
        assert!(!v.validate(Provider::Groq, "gsk").await);
    }

    #[tokio::test]
    async fn test_sandbox_probe_creates_and_closes_session() {
        let sandbox = FakeSandboxProvider::new();
        let v = validator("http://127.0.0.1:9", sandbox.clone());

        assert!(v.validate(Provider::E2b, "e2b-key").await);
        assert_eq!(sandbox.creates(), 1);
        assert_eq!(sandbox.session_kills(), 1);

        sandbox.fail_create(true);
        assert!(!v.validate(Provider::E2b, "e2b-key").await);
    }
}
