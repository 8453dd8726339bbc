//! Remote sandbox hosting for the live preview
//!
//! [`SandboxProvider`] is the seam between preview orchestration and the
//! service that actually runs the sandbox. [`E2bProvider`] talks to E2B;
//! tests use `test_utils::FakeSandboxProvider`.

pub mod e2b;
pub mod envelope;

use std::fmt;

use tokio::sync::mpsc;

use pageforge_core::prelude::*;

pub use e2b::{E2bOptions, E2bProvider};

/// A live remote session.
#[derive(Clone)]
pub struct SessionHandle {
    pub sandbox_id: String,
    /// Domain under which the session's ports are exposed
    pub domain: String,
    api_key: String,
    access_token: Option<String>,
}

impl SessionHandle {
    pub fn new(
        sandbox_id: impl Into<String>,
        domain: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            sandbox_id: sandbox_id.into(),
            domain: domain.into(),
            api_key: api_key.into(),
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Public host for `port` inside this session.
    pub fn host(&self, port: u16) -> String {
        format!("{}-{}.{}", port, self.sandbox_id, self.domain)
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("sandbox_id", &self.sandbox_id)
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

/// A background process running in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerProcess {
    pub pid: u32,
}

/// One line of output from a server process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerOutput {
    Stdout(String),
    Stderr(String),
}

#[trait_variant::make(SandboxProvider: Send)]
pub trait LocalSandboxProvider {
    /// Open a new session authenticated by `api_key`.
    async fn create_session(&self, api_key: &str) -> Result<SessionHandle>;

    /// Write a text file inside the session.
    async fn write_file(&self, session: &SessionHandle, path: &str, content: &str) -> Result<()>;

    /// Launch `command` in the background and stream its output lines.
    ///
    /// Returns once the process has started. Output stops when the process
    /// ends or `output` is dropped.
    async fn start_server(
        &self,
        session: &SessionHandle,
        command: &str,
        output: mpsc::Sender<ServerOutput>,
    ) -> Result<ServerProcess>;

    async fn kill_process(&self, session: &SessionHandle, process: ServerProcess) -> Result<()>;

    /// Close the session. Closing one that is already gone is not an error.
    async fn kill_session(&self, session: &SessionHandle) -> Result<()>;

    /// `Ok(false)` once the session no longer exists remotely.
    async fn is_alive(&self, session: &SessionHandle) -> Result<bool>;
}
