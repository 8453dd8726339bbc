//! In-memory providers for tests
//!
//! Enabled for this crate's own tests and for dependents through the
//! `test-helpers` feature.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use tokio::sync::mpsc;

use pageforge_core::prelude::*;
use pageforge_core::Provider;

use crate::generation::{CodeGenerator, TextStream};
use crate::sandbox::{SandboxProvider, ServerOutput, ServerProcess, SessionHandle};

// ─────────────────────────────────────────────────────────────────
// Sandbox
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct FakeSandboxState {
    next_id: u32,
    creates: usize,
    session_kills: usize,
    process_kills: usize,
    live: Vec<String>,
    writes: Vec<(String, String, String)>,
    fail_create: bool,
    fail_write: bool,
    create_delay: Option<Duration>,
    server_output: Vec<ServerOutput>,
}

/// Sandbox host that keeps sessions in memory and records every call.
///
/// Clones share state, so a test can keep one handle while the code under
/// test owns another.
#[derive(Debug, Clone, Default)]
pub struct FakeSandboxProvider {
    state: Arc<Mutex<FakeSandboxState>>,
}

impl FakeSandboxProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeSandboxState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn creates(&self) -> usize {
        self.state().creates
    }

    pub fn session_kills(&self) -> usize {
        self.state().session_kills
    }

    pub fn process_kills(&self) -> usize {
        self.state().process_kills
    }

    /// Sessions created and not yet killed or expired.
    pub fn live_sessions(&self) -> Vec<String> {
        self.state().live.clone()
    }

    /// `(sandbox_id, path, content)` per write, oldest first.
    pub fn writes(&self) -> Vec<(String, String, String)> {
        self.state().writes.clone()
    }

    pub fn last_write(&self) -> Option<(String, String, String)> {
        self.state().writes.last().cloned()
    }

    pub fn fail_create(&self, fail: bool) {
        self.state().fail_create = fail;
    }

    pub fn fail_write(&self, fail: bool) {
        self.state().fail_write = fail;
    }

    /// Make every create take `delay` (virtual time under a paused clock).
    pub fn set_create_delay(&self, delay: Duration) {
        self.state().create_delay = Some(delay);
    }

    /// Lines every started server emits right away.
    pub fn set_server_output(&self, lines: Vec<ServerOutput>) {
        self.state().server_output = lines;
    }

    /// Expire every live session, as if the host reclaimed them.
    pub fn expire_sessions(&self) {
        self.state().live.clear();
    }
}

impl SandboxProvider for FakeSandboxProvider {
    async fn create_session(&self, api_key: &str) -> Result<SessionHandle> {
        let delay = self.state().create_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        state.creates += 1;
        if state.fail_create {
            return Err(Error::auth(Provider::E2b));
        }
        state.next_id += 1;
        let id = format!("fake-{}", state.next_id);
        state.live.push(id.clone());
        Ok(SessionHandle::new(id, "sandbox.test", api_key))
    }

    async fn write_file(&self, session: &SessionHandle, path: &str, content: &str) -> Result<()> {
        let mut state = self.state();
        if state.fail_write {
            return Err(Error::sandbox("write rejected"));
        }
        if !state.live.contains(&session.sandbox_id) {
            return Err(Error::sandbox(format!("session {} not found", session.sandbox_id)));
        }
        state.writes.push((
            session.sandbox_id.clone(),
            path.to_string(),
            content.to_string(),
        ));
        Ok(())
    }

    async fn start_server(
        &self,
        _session: &SessionHandle,
        _command: &str,
        output: mpsc::Sender<ServerOutput>,
    ) -> Result<ServerProcess> {
        let lines = self.state().server_output.clone();
        for line in lines {
            let _ = output.send(line).await;
        }
        Ok(ServerProcess { pid: 4242 })
    }

    async fn kill_process(&self, _session: &SessionHandle, _process: ServerProcess) -> Result<()> {
        self.state().process_kills += 1;
        Ok(())
    }

    async fn kill_session(&self, session: &SessionHandle) -> Result<()> {
        let mut state = self.state();
        state.session_kills += 1;
        state.live.retain(|id| *id != session.sandbox_id);
        Ok(())
    }

    async fn is_alive(&self, session: &SessionHandle) -> Result<bool> {
        Ok(self.state().live.contains(&session.sandbox_id))
    }
}

// ─────────────────────────────────────────────────────────────────
// Generator
// ─────────────────────────────────────────────────────────────────

/// What one generation request produces.
#[derive(Debug, Clone)]
pub enum Script {
    /// Stream these fragments, then end
    Chunks(Vec<String>),
    /// Stream these fragments, then never end
    ChunksThenHang(Vec<String>),
    /// Stream these fragments, then fail with a generation error
    ChunksThenFail(Vec<String>, String),
    /// Fail before streaming because the key was rejected
    RejectKey,
    /// Fail before streaming with a generation error
    Fail(String),
}

impl Script {
    pub fn chunks(fragments: &[&str]) -> Self {
        Script::Chunks(fragments.iter().map(|f| f.to_string()).collect())
    }
}

#[derive(Debug)]
struct ScriptedState {
    queue: VecDeque<Script>,
    fallback: Script,
    prompts: Vec<String>,
}

/// Generator that plays back queued [`Script`]s, one per request.
///
/// Once the queue is empty every request plays the fallback.
#[derive(Debug, Clone)]
pub struct ScriptedGenerator {
    state: Arc<Mutex<ScriptedState>>,
}

impl ScriptedGenerator {
    pub fn new(fallback: Script) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptedState {
                queue: VecDeque::new(),
                fallback,
                prompts: Vec::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, ScriptedState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn push(&self, script: Script) -> &Self {
        self.state().queue.push_back(script);
        self
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.state().prompts.clone()
    }
}

fn ok_items(fragments: Vec<String>) -> Vec<Result<String>> {
    fragments.into_iter().map(Ok).collect()
}

impl CodeGenerator for ScriptedGenerator {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn open_stream(&self, _api_key: &str, prompt: &str) -> Result<TextStream> {
        let script = {
            let mut state = self.state();
            state.prompts.push(prompt.to_string());
            let fallback = state.fallback.clone();
            state.queue.pop_front().unwrap_or(fallback)
        };

        match script {
            Script::Chunks(fragments) => Ok(stream::iter(ok_items(fragments)).boxed()),
            Script::ChunksThenHang(fragments) => Ok(stream::iter(ok_items(fragments))
                .chain(stream::pending())
                .boxed()),
            Script::ChunksThenFail(fragments, message) => {
                let mut items = ok_items(fragments);
                items.push(Err(Error::generation(message)));
                Ok(stream::iter(items).boxed())
            }
            Script::RejectKey => Err(Error::auth(Provider::Gemini)),
            Script::Fail(message) => Err(Error::generation(message)),
        }
    }
}
