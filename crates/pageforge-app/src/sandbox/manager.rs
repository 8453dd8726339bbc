//! Lifecycle of the single preview session
//!
//! `SandboxManager` owns the session handle and the server process handle.
//! Every externally visible change is reported as a [`SandboxEvent`] on the
//! app message channel; the state container never touches the handles.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;

use pageforge_core::prelude::*;
use pageforge_core::SandboxStatus;
use pageforge_providers::{SandboxProvider, ServerOutput, ServerProcess, SessionHandle};

use crate::config::SandboxSettings;
use crate::message::Message;

/// Observable change produced by the sandbox layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxEvent {
    Status(SandboxStatus),
    /// Published preview URL, `None` once withdrawn
    Url(Option<String>),
    Log(String),
    /// Replace the shared error value (`None` clears it)
    Error(Option<String>),
}

/// Preview URL for `host`, with a timestamp that defeats iframe caching.
pub fn preview_url(host: &str, timestamp_ms: i64) -> String {
    format!("https://{}?_={}", host, timestamp_ms)
}

/// Human text for a sandbox failure, without a doubled "Sandbox error:" prefix.
fn failure_text(err: &Error) -> String {
    match err {
        Error::Sandbox { message } => message.clone(),
        other => other.to_string(),
    }
}

pub struct SandboxManager<P> {
    provider: Arc<P>,
    settings: SandboxSettings,
    msg_tx: mpsc::Sender<Message>,
    session: Option<SessionHandle>,
    server: Option<ServerProcess>,
    status: SandboxStatus,
    url: Option<String>,
}

impl<P: SandboxProvider + Sync + 'static> SandboxManager<P> {
    pub fn new(provider: Arc<P>, settings: SandboxSettings, msg_tx: mpsc::Sender<Message>) -> Self {
        Self {
            provider,
            settings,
            msg_tx,
            session: None,
            server: None,
            status: SandboxStatus::Idle,
            url: None,
        }
    }

    pub fn status(&self) -> SandboxStatus {
        self.status
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    async fn emit(&self, event: SandboxEvent) {
        if self.msg_tx.send(Message::Sandbox(event)).await.is_err() {
            debug!("Sandbox event dropped: message channel closed");
        }
    }

    async fn log(&self, message: impl Into<String>) {
        self.emit(SandboxEvent::Log(message.into())).await;
    }

    async fn set_status(&mut self, status: SandboxStatus) {
        self.status = status;
        self.emit(SandboxEvent::Status(status)).await;
    }

    async fn set_url(&mut self, url: Option<String>) {
        self.url = url.clone();
        self.emit(SandboxEvent::Url(url)).await;
    }

    /// Bring the preview up to date with `code`.
    ///
    /// Does nothing when `code` or `api_key` is empty. On failure the error is
    /// reported, status becomes `error` and remote resources are torn down.
    pub async fn start(&mut self, code: &str, api_key: &str) {
        if code.is_empty() || api_key.is_empty() {
            debug!("Sandbox start skipped: code or key missing");
            return;
        }

        self.set_status(SandboxStatus::Connecting).await;
        self.emit(SandboxEvent::Error(None)).await;
        self.log("Updating sandbox...").await;

        match self.sync(code, api_key).await {
            Ok(url) => {
                self.set_url(Some(url)).await;
                self.log("Sandbox preview updated.").await;
                self.set_status(SandboxStatus::Running).await;
            }
            Err(e) => {
                let text = format!("Sandbox error: {}", failure_text(&e));
                warn!("{}", text);
                self.emit(SandboxEvent::Error(Some(text.clone()))).await;
                self.log(text).await;
                self.set_status(SandboxStatus::Error).await;
                self.teardown().await;
            }
        }
    }

    async fn sync(&mut self, code: &str, api_key: &str) -> Result<String> {
        let session = match &self.session {
            Some(session) => session.clone(),
            None => {
                self.log("Creating new sandbox session...").await;
                let session = self.provider.create_session(api_key).await?;
                info!("Sandbox session {} created", session.sandbox_id);
                self.session = Some(session.clone());
                self.server = None;
                session
            }
        };

        if self.server.is_none() {
            self.log("Starting web server in sandbox...").await;
            let (out_tx, out_rx) = mpsc::channel(64);
            tokio::spawn(forward_server_output(out_rx, self.msg_tx.clone()));
            let process = self
                .provider
                .start_server(&session, &self.settings.serve_command, out_tx)
                .await?;
            self.server = Some(process);
        }

        self.provider
            .write_file(&session, &self.settings.served_file, code)
            .await?;

        Ok(preview_url(
            &session.host(self.settings.port),
            Utc::now().timestamp_millis(),
        ))
    }

    /// Tear the session down. A no-op without a session.
    pub async fn stop(&mut self) {
        if self.session.is_none() {
            return;
        }
        if self.teardown().await {
            self.set_status(SandboxStatus::Idle).await;
        }
    }

    /// Best-effort kill of server and session. Handles and URL are always
    /// cleared. Returns `false` if anything failed; the failure is reported
    /// and status becomes `error`.
    async fn teardown(&mut self) -> bool {
        let Some(session) = self.session.take() else {
            return true;
        };
        self.log("Closing sandbox connection...").await;

        let mut failure = None;
        if let Some(process) = self.server.take() {
            if let Err(e) = self.provider.kill_process(&session, process).await {
                debug!("Failed to kill server process: {}", e);
                failure = Some(e);
            }
        }
        if let Err(e) = self.provider.kill_session(&session).await {
            failure = Some(e);
        }
        self.set_url(None).await;

        match failure {
            None => {
                info!("Sandbox session {} closed", session.sandbox_id);
                self.log("Sandbox connection closed.").await;
                true
            }
            Some(e) => {
                let text = format!("Error closing sandbox: {}", failure_text(&e));
                warn!("{}", text);
                self.log(text.clone()).await;
                self.emit(SandboxEvent::Error(Some(text))).await;
                self.set_status(SandboxStatus::Error).await;
                false
            }
        }
    }

    /// The host reported the session gone.
    pub async fn on_remote_exit(&mut self) {
        if self.session.take().is_none() {
            return;
        }
        self.server = None;
        warn!("Sandbox session exited unexpectedly");
        self.log("Sandbox session exited unexpectedly.").await;
        self.emit(SandboxEvent::Error(Some(Error::RemoteSessionLost.to_string())))
            .await;
        self.set_url(None).await;
        self.set_status(SandboxStatus::Error).await;
    }

    /// Poll the host once; handles a remote exit if it happened.
    pub async fn check_alive(&mut self) {
        let Some(session) = self.session.clone() else {
            return;
        };
        match self.provider.is_alive(&session).await {
            Ok(true) => {}
            Ok(false) => self.on_remote_exit().await,
            Err(e) => debug!("Sandbox liveness check failed: {}", e),
        }
    }
}

async fn forward_server_output(mut out_rx: mpsc::Receiver<ServerOutput>, msg_tx: mpsc::Sender<Message>) {
    while let Some(output) = out_rx.recv().await {
        let line = match output {
            ServerOutput::Stdout(line) => format!("[Server]: {}", line),
            ServerOutput::Stderr(line) => format!("[Server Error]: {}", line),
        };
        if msg_tx
            .send(Message::Sandbox(SandboxEvent::Log(line)))
            .await
            .is_err()
        {
            break;
        }
    }
}
