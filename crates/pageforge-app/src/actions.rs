//! Action handlers: UpdateAction dispatch and background task spawning

use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use pageforge_core::prelude::*;
use pageforge_core::{prompts, ApiKeys, Provider};
use pageforge_providers::{
    generation, CodeGenerator, KeyValidator, PageScraper, SandboxProvider, Scraper,
};

use crate::credentials::CredentialStore;
use crate::editor::EditorHandle;
use crate::handler::generation::required_keys;
use crate::handler::{GenerationJob, GenerationRequest, UpdateAction};
use crate::message::{GenerationId, Message};
use crate::sandbox::SandboxHandle;

/// Long-lived services the actions run against.
pub struct ServiceContext<G, P> {
    pub generator: Arc<G>,
    pub scraper: Arc<Scraper>,
    pub validator: Arc<KeyValidator<P>>,
    pub credentials: Arc<Mutex<CredentialStore>>,
    pub sandbox: SandboxHandle,
    pub editor: EditorHandle,
}

impl<G, P> Clone for ServiceContext<G, P> {
    fn clone(&self) -> Self {
        Self {
            generator: self.generator.clone(),
            scraper: self.scraper.clone(),
            validator: self.validator.clone(),
            credentials: self.credentials.clone(),
            sandbox: self.sandbox.clone(),
            editor: self.editor.clone(),
        }
    }
}

/// Execute an action, spawning a background task where it needs one
pub fn handle_action<G, P>(
    action: UpdateAction,
    msg_tx: mpsc::Sender<Message>,
    ctx: &ServiceContext<G, P>,
) where
    G: CodeGenerator + Send + Sync + 'static,
    P: SandboxProvider + Send + Sync + 'static,
{
    match action {
        UpdateAction::Generate(job) => {
            ctx.editor.discard();
            let generator = ctx.generator.clone();
            let scraper = ctx.scraper.clone();
            let sandbox = ctx.sandbox.clone();
            tokio::spawn(async move {
                run_generation(job, generator, scraper, sandbox, msg_tx).await;
            });
        }

        UpdateAction::SyncSandbox { code, api_key } => ctx.sandbox.code_changed(code, api_key),

        UpdateAction::RefreshSandbox { code, api_key } => ctx.sandbox.refresh(code, api_key),

        UpdateAction::StopSandbox => ctx.sandbox.stop(),

        UpdateAction::EditorInput { text } => ctx.editor.input(text),

        UpdateAction::SaveKeys { keys } => {
            let credentials = ctx.credentials.clone();
            tokio::spawn(async move {
                let msg = match save_keys(credentials, keys).await {
                    Ok(keys) => Message::KeysSaved { keys },
                    Err(e) => Message::KeysSaveFailed {
                        error: e.to_string(),
                    },
                };
                let _ = msg_tx.send(msg).await;
            });
        }

        UpdateAction::ValidateKey { provider, key, seq } => {
            let validator = ctx.validator.clone();
            tokio::spawn(async move {
                let valid = validator.validate(provider, &key).await;
                info!("{} validation: {}", provider, if valid { "valid" } else { "invalid" });
                let _ = msg_tx
                    .send(Message::KeyValidated {
                        provider,
                        seq,
                        valid,
                    })
                    .await;
            });
        }

        UpdateAction::ExportCode { path, code } => {
            tokio::spawn(async move {
                let msg = match export_code(&path, &code).await {
                    Ok(()) => Message::CodeExported { path },
                    Err(e) => Message::ExportFailed {
                        path,
                        error: e.to_string(),
                    },
                };
                let _ = msg_tx.send(msg).await;
            });
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Generation
// ─────────────────────────────────────────────────────────────────

async fn run_generation<G: CodeGenerator + Sync>(
    job: GenerationJob,
    generator: Arc<G>,
    scraper: Arc<Scraper>,
    sandbox: SandboxHandle,
    msg_tx: mpsc::Sender<Message>,
) {
    let id = job.id;
    if job.stop_sandbox {
        sandbox.stop_and_wait().await;
    }

    let result = stream_generation(&job, generator.as_ref(), scraper.as_ref(), &msg_tx).await;
    if let Some(msg) = outcome_message(id, result) {
        let _ = msg_tx.send(msg).await;
    }
}

/// Message reporting how a run ended. `None` when nobody needs to hear about it.
fn outcome_message(id: GenerationId, result: Result<()>) -> Option<Message> {
    match result {
        Ok(()) => Some(Message::GenerationCompleted { id }),
        Err(Error::Cancelled) => {
            debug!("Generation {} cancelled", id);
            None
        }
        Err(e) if e.is_fatal() => {
            debug!("Generation {} abandoned: {}", id, e);
            None
        }
        Err(e) => {
            if e.is_recoverable() {
                warn!("Generation {} failed: {}", id, e);
            } else {
                error!("Generation {} failed: {}", id, e);
            }
            Some(Message::GenerationFailed {
                id,
                rejected_key: e.rejected_provider(),
                error: e.to_string(),
            })
        }
    }
}

fn job_key(job: &GenerationJob, provider: Provider) -> &str {
    match provider {
        Provider::Gemini => &job.gemini_key,
        Provider::Firecrawl => &job.firecrawl_key,
        _ => "",
    }
}

async fn progress(msg_tx: &mpsc::Sender<Message>, id: GenerationId, message: &str) {
    let _ = msg_tx
        .send(Message::GenerationLog {
            id,
            message: message.to_string(),
        })
        .await;
}

/// Check keys, build the prompt and forward every cleaned chunk.
async fn stream_generation<G: CodeGenerator + Sync>(
    job: &GenerationJob,
    generator: &G,
    scraper: &Scraper,
    msg_tx: &mpsc::Sender<Message>,
) -> Result<()> {
    for provider in required_keys(&job.request) {
        if job_key(job, *provider).is_empty() {
            return Err(Error::credential_missing(*provider));
        }
    }

    let prompt = match &job.request {
        GenerationRequest::Prompt { description } => prompts::from_description(description),
        GenerationRequest::Url { url } => {
            progress(msg_tx, job.id, "Fetching and scraping URL content...").await;
            let content = PageScraper::scrape(scraper, &job.firecrawl_key, url).await?;
            progress(msg_tx, job.id, "Scraping complete. Generating code...").await;
            prompts::from_url(url, &content)
        }
        GenerationRequest::Refine {
            instruction,
            current_code,
        } => prompts::from_description(&prompts::refinement(instruction, current_code)),
    };

    if *job.cancel_rx.borrow() {
        return Err(Error::Cancelled);
    }

    let mut stream = generation::open(generator, &job.gemini_key, &prompt)
        .await?
        .with_cancel(job.cancel_rx.clone());
    while let Some(item) = stream.next_chunk().await {
        let chunk = item?;
        msg_tx
            .send(Message::GenerationChunk { id: job.id, chunk })
            .await
            .map_err(|_| Error::ChannelClosed)?;
    }
    debug!("Generation {} streamed {} bytes", job.id, stream.received().len());
    Ok(())
}

// ─────────────────────────────────────────────────────────────────
// Credentials & export
// ─────────────────────────────────────────────────────────────────

async fn save_keys(credentials: Arc<Mutex<CredentialStore>>, keys: ApiKeys) -> Result<ApiKeys> {
    tokio::task::spawn_blocking(move || -> Result<ApiKeys> {
        let mut store = match credentials.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        store
            .save(keys.clone())
            .context("Failed to save API keys")?;
        Ok(keys)
    })
    .await
    .map_err(|e| Error::channel_send(format!("credential save task failed: {}", e)))?
}

async fn export_code(path: &Path, code: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, code).await?;
    info!("Exported {} bytes to {:?}", code.len(), path);
    Ok(())
}
