//! Streaming code generation
//!
//! A [`CodeGenerator`] opens a raw text stream for a prompt. [`GenerationStream`]
//! wraps that stream with fence stripping and cancellation, so callers only
//! ever see cleaned fragments in arrival order.

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tokio::sync::watch;

use pageforge_core::prelude::*;
use pageforge_core::{FenceStripper, Provider};

/// Raw text fragments as the provider produces them.
pub type TextStream = BoxStream<'static, Result<String>>;

/// Streams model output for a single user prompt.
///
/// The system instruction is fixed by the implementation; callers pass only
/// the already-built user prompt (see `pageforge_core::prompts`).
#[trait_variant::make(CodeGenerator: Send)]
pub trait LocalCodeGenerator {
    /// Provider whose key authenticates requests.
    fn provider(&self) -> Provider;

    /// Start a generation and return its unprocessed text stream.
    ///
    /// Failures before the first byte (bad key, HTTP error) are returned here;
    /// failures mid-stream arrive as `Err` items.
    async fn open_stream(&self, api_key: &str, prompt: &str) -> Result<TextStream>;
}

// ─────────────────────────────────────────────────────────────────
// Failure classification
// ─────────────────────────────────────────────────────────────────

/// Whether a provider failure means the key itself was rejected.
pub fn is_invalid_key_failure(status: Option<u16>, message: &str) -> bool {
    matches!(status, Some(401) | Some(403))
        || message.contains("API key not valid")
        || message.contains("API_KEY_INVALID")
}

/// Turn a provider failure into either an auth error or a generation error.
pub fn classify_failure(provider: Provider, status: Option<u16>, message: &str) -> Error {
    if is_invalid_key_failure(status, message) {
        Error::auth(provider)
    } else {
        Error::generation(message)
    }
}

// ─────────────────────────────────────────────────────────────────
// Cleaned stream
// ─────────────────────────────────────────────────────────────────

/// Fence-stripped, cancellable view of a generation.
pub struct GenerationStream {
    inner: TextStream,
    stripper: FenceStripper,
    cancel_rx: Option<watch::Receiver<bool>>,
    received: String,
    finished: bool,
}

impl GenerationStream {
    pub fn new(inner: TextStream) -> Self {
        Self {
            inner,
            stripper: FenceStripper::new(),
            cancel_rx: None,
            received: String::new(),
            finished: false,
        }
    }

    /// Abort the stream once `true` is sent on the paired sender.
    ///
    /// Dropping the sender without sending does not cancel.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Everything emitted so far.
    pub fn received(&self) -> &str {
        &self.received
    }

    /// Next non-empty cleaned fragment.
    ///
    /// Returns `None` when the stream completed normally. After an `Err` item
    /// (including [`Error::Cancelled`]) the stream is finished.
    pub async fn next_chunk(&mut self) -> Option<Result<String>> {
        loop {
            if self.finished {
                return None;
            }

            let item = tokio::select! {
                biased;
                _ = wait_cancelled(&mut self.cancel_rx) => {
                    self.finished = true;
                    return Some(Err(Error::Cancelled));
                }
                item = self.inner.next() => item,
            };

            match item {
                Some(Ok(fragment)) => {
                    let text = self.stripper.push(&fragment);
                    if text.is_empty() {
                        continue;
                    }
                    self.received.push_str(&text);
                    return Some(Ok(text));
                }
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e));
                }
                None => {
                    self.finished = true;
                    let rest = self.stripper.finish();
                    if rest.is_empty() {
                        return None;
                    }
                    self.received.push_str(&rest);
                    return Some(Ok(rest));
                }
            }
        }
    }

    /// Drain the stream, handing each fragment to `on_chunk`.
    ///
    /// Returns the full cleaned text.
    pub async fn run<F>(mut self, mut on_chunk: F) -> Result<String>
    where
        F: FnMut(&str),
    {
        while let Some(item) = self.next_chunk().await {
            let chunk = item?;
            on_chunk(&chunk);
        }
        Ok(self.received)
    }
}

async fn wait_cancelled(cancel_rx: &mut Option<watch::Receiver<bool>>) {
    let Some(rx) = cancel_rx else {
        return std::future::pending().await;
    };
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}

/// Open a cleaned generation stream.
///
/// Fails with [`Error::CredentialMissing`] without touching the network when
/// `api_key` is empty.
pub async fn open<G: CodeGenerator>(
    generator: &G,
    api_key: &str,
    prompt: &str,
) -> Result<GenerationStream> {
    if api_key.is_empty() {
        return Err(Error::credential_missing(CodeGenerator::provider(generator)));
    }
    let inner = CodeGenerator::open_stream(generator, api_key, prompt).await?;
    Ok(GenerationStream::new(inner))
}

/// One-shot helper: stream `prompt`, calling `on_chunk` per cleaned fragment.
pub async fn generate<G, F>(generator: &G, api_key: &str, prompt: &str, on_chunk: F) -> Result<String>
where
    G: CodeGenerator,
    F: FnMut(&str),
{
    open(generator, api_key, prompt).await?.run(on_chunk).await
}
