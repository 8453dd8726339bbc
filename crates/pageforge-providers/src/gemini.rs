//! Gemini `streamGenerateContent` client

use std::collections::VecDeque;

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde_json::{json, Value};

use pageforge_core::prelude::*;
use pageforge_core::prompts::SYSTEM_PROMPT;
use pageforge_core::Provider;

use crate::endpoints::join;
use crate::generation::{classify_failure, CodeGenerator, TextStream};
use crate::http::{error_message, transport_error};
use crate::sse::SseDecoder;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// `http` should be a streaming client (no total timeout).
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn stream_url(&self) -> String {
        join(
            &self.base_url,
            &format!("models/{}:streamGenerateContent?alt=sse", self.model),
        )
    }

    fn generate_url(&self) -> String {
        join(&self.base_url, &format!("models/{}:generateContent", self.model))
    }

    /// Minimal non-streaming request. `Ok` means the key was accepted.
    pub async fn probe(&self, api_key: &str) -> Result<()> {
        let response = self
            .http
            .post(self.generate_url())
            .header(KEY_HEADER, api_key)
            .json(&json!({ "contents": [{ "role": "user", "parts": [{ "text": "test" }] }] }))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(
            Provider::Gemini,
            Some(status.as_u16()),
            &error_message(status, &body),
        ))
    }
}

/// Request body for one generation.
pub fn request_body(prompt: &str) -> Value {
    json!({
        "systemInstruction": { "parts": [{ "text": SYSTEM_PROMPT }] },
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
    })
}

/// Text carried by one streamed response object.
///
/// An object with an `error` member is a failure reported mid-stream.
pub fn chunk_text(data: &str) -> Result<String> {
    let value: Value = serde_json::from_str(data)?;

    if let Some(err) = value.get("error") {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        let status = err.get("code").and_then(Value::as_u64).map(|c| c as u16);
        return Err(classify_failure(Provider::Gemini, status, message));
    }

    let text = value
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default();
    Ok(text)
}

struct SseState {
    bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseDecoder,
    ready: VecDeque<String>,
    done: bool,
}

impl CodeGenerator for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn open_stream(&self, api_key: &str, prompt: &str) -> Result<TextStream> {
        debug!("Opening Gemini stream with model {}", self.model);
        let response = self
            .http
            .post(self.stream_url())
            .header(KEY_HEADER, api_key)
            .json(&request_body(prompt))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(status, &body);
            warn!("Gemini request failed: {}", message);
            return Err(classify_failure(Provider::Gemini, Some(status.as_u16()), &message));
        }

        let state = SseState {
            bytes: response
                .bytes_stream()
                .map(|r| r.map(|b| b.to_vec()))
                .boxed(),
            decoder: SseDecoder::new(),
            ready: VecDeque::new(),
            done: false,
        };

        let stream = futures_util::stream::unfold(state, |mut st| async move {
            loop {
                if let Some(data) = st.ready.pop_front() {
                    return Some((chunk_text(&data), st));
                }
                if st.done {
                    return None;
                }
                match st.bytes.next().await {
                    Some(Ok(chunk)) => st.ready.extend(st.decoder.feed(&chunk)),
                    Some(Err(e)) => {
                        st.done = true;
                        return Some((Err(transport_error(e)), st));
                    }
                    None => {
                        st.done = true;
                        st.ready.extend(st.decoder.finish());
                    }
                }
            }
        });

        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation;
    use crate::mock_http::{MockResponse, MockServer};

    #[test]
    fn test_stream_url_selects_model_and_sse() {
        let client = GeminiClient::new(reqwest::Client::new(), "http://localhost:1/v1beta/", "gemini-x");
        assert_eq!(
            client.stream_url(),
            "http://localhost:1/v1beta/models/gemini-x:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn test_request_body_carries_system_instruction() {
        let body = request_body("build a clock");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "build a clock");
        assert!(body["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("<!DOCTYPE html>"));
    }

    #[test]
    fn test_chunk_text_concatenates_parts() {
        let data = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"<ht"},{"text":"ml>"}]}}]}"#;
        assert_eq!(chunk_text(data).unwrap(), "<html>");
    }

    #[test]
    fn test_chunk_text_without_parts_is_empty() {
        let data = r#"{"candidates":[{"finishReason":"STOP"}],"usageMetadata":{}}"#;
        assert_eq!(chunk_text(data).unwrap(), "");
    }

    #[test]
    fn test_chunk_text_error_object_is_classified() {
        let data = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key."}}"#;
        assert!(chunk_text(data).unwrap_err().is_auth());

        let data = r#"{"error":{"code":500,"message":"Internal error"}}"#;
        assert!(matches!(chunk_text(data), Err(Error::Generation { .. })));
    }

    #[tokio::test]
    async fn test_open_stream_yields_cleaned_chunks() {
        let body = concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"```html\\n<html>\"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"</html>\\n```\"}]}}]}\r\n\r\n",
        );
        let server = MockServer::start(vec![MockResponse::sse(body)]).await;
        let client = GeminiClient::new(reqwest::Client::new(), server.base_url(), "gemini-test");

        let mut chunks = Vec::new();
        let full = generation::generate(&client, "g-key", "a page", |c| chunks.push(c.to_string()))
            .await
            .unwrap();

        assert_eq!(full, "\n<html></html>\n");
        assert_eq!(chunks.concat(), full);

        let requests = server.requests().await;
        assert_eq!(requests[0].path, "/models/gemini-test:streamGenerateContent");
        assert_eq!(requests[0].query.as_deref(), Some("alt=sse"));
        assert_eq!(requests[0].header("x-goog-api-key"), Some("g-key"));
    }

    #[tokio::test]
    async fn test_open_stream_rejected_key_is_auth_error() {
        let server = MockServer::start(vec![MockResponse::json(
            400,
            r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#,
        )])
        .await;
        let client = GeminiClient::new(reqwest::Client::new(), server.base_url(), "gemini-test");

        let err = generation::generate(&client, "bad", "a page", |_| {}).await.unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn test_empty_key_fails_without_request() {
        let client = GeminiClient::new(reqwest::Client::new(), "http://127.0.0.1:9", "gemini-test");
        let err = generation::generate(&client, "", "a page", |_| {}).await.unwrap_err();
        assert!(matches!(err, Error::CredentialMissing { provider: Provider::Gemini }));
    }
}
