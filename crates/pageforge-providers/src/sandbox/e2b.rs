//! E2B sandbox client
//!
//! The control plane (`api.e2b.dev`) creates, inspects and deletes sandboxes.
//! Files and processes go through the in-sandbox daemon, reachable at
//! `https://49983-<id>.<domain>`, which speaks Connect over HTTP.

use std::collections::VecDeque;

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;

use pageforge_core::prelude::*;
use pageforge_core::Provider;

use super::envelope::{self, EnvelopeDecoder, ProcessEvent};
use super::{SandboxProvider, ServerOutput, ServerProcess, SessionHandle};
use crate::endpoints::join;
use crate::http::{error_message, transport_error};

/// Port of the in-sandbox daemon.
pub const ENVD_PORT: u16 = 49983;

/// Working directory for launched processes.
pub const WORKDIR: &str = "/home/user";

const API_KEY_HEADER: &str = "X-API-Key";
const ACCESS_TOKEN_HEADER: &str = "X-Access-Token";
const CONNECT_VERSION_HEADER: &str = "Connect-Protocol-Version";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct E2bOptions {
    pub api_base: String,
    /// Used when the create response does not name a domain
    pub domain: String,
    pub template: String,
    /// Remote lifetime of a session before E2B reclaims it
    pub timeout_secs: u64,
}

impl Default for E2bOptions {
    fn default() -> Self {
        Self {
            api_base: "https://api.e2b.dev".to_string(),
            domain: "e2b.app".to_string(),
            template: "base".to_string(),
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(rename = "sandboxID")]
    sandbox_id: String,
    #[serde(rename = "envdAccessToken")]
    envd_access_token: Option<String>,
    domain: Option<String>,
}

#[derive(Debug, Clone)]
pub struct E2bProvider {
    http: reqwest::Client,
    stream_http: reqwest::Client,
    options: E2bOptions,
}

impl E2bProvider {
    /// `stream_http` carries the long-lived process output stream and must
    /// not have a total request timeout.
    pub fn new(http: reqwest::Client, stream_http: reqwest::Client, options: E2bOptions) -> Self {
        Self {
            http,
            stream_http,
            options,
        }
    }

    pub fn options(&self) -> &E2bOptions {
        &self.options
    }

    fn sandbox_url(&self, sandbox_id: &str) -> String {
        join(&self.options.api_base, &format!("sandboxes/{}", sandbox_id))
    }

    fn session_from(&self, body: &str, api_key: &str) -> Result<SessionHandle> {
        let created: CreateResponse = serde_json::from_str(body)?;
        let domain = created
            .domain
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| self.options.domain.clone());
        Ok(SessionHandle::new(created.sandbox_id, domain, api_key)
            .with_access_token(created.envd_access_token))
    }

    fn envd(&self, session: &SessionHandle, path: &str) -> String {
        join(&format!("https://{}", session.host(ENVD_PORT)), path)
    }

    fn with_access(
        builder: reqwest::RequestBuilder,
        session: &SessionHandle,
    ) -> reqwest::RequestBuilder {
        match session.access_token() {
            Some(token) => builder.header(ACCESS_TOKEN_HEADER, token),
            None => builder,
        }
    }
}

/// Body for `process.Process/Start`.
pub fn start_request(command: &str) -> serde_json::Value {
    json!({
        "process": {
            "cmd": "/bin/bash",
            "args": ["-l", "-c", command],
            "envs": {},
            "cwd": WORKDIR,
        }
    })
}

/// Body for `process.Process/SendSignal` with SIGKILL.
pub fn kill_request(pid: u32) -> serde_json::Value {
    json!({
        "process": { "pid": pid },
        "signal": "SIGNAL_SIGKILL",
    })
}

fn sandbox_failure(status: StatusCode, body: &str) -> Error {
    if status == StatusCode::UNAUTHORIZED {
        Error::auth(Provider::E2b)
    } else {
        Error::sandbox(error_message(status, body))
    }
}

impl SandboxProvider for E2bProvider {
    async fn create_session(&self, api_key: &str) -> Result<SessionHandle> {
        let response = self
            .http
            .post(join(&self.options.api_base, "sandboxes"))
            .header(API_KEY_HEADER, api_key)
            .json(&json!({
                "templateID": self.options.template,
                "timeout": self.options.timeout_secs,
            }))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(sandbox_failure(status, &body));
        }
        let session = self.session_from(&body, api_key)?;
        debug!("Created sandbox {}", session.sandbox_id);
        Ok(session)
    }

    async fn write_file(&self, session: &SessionHandle, path: &str, content: &str) -> Result<()> {
        let file_name = path.rsplit('/').next().unwrap_or(path).to_string();
        let form = Form::new().part("file", Part::text(content.to_string()).file_name(file_name));

        let request = self
            .http
            .post(self.envd(session, "files"))
            .query(&[("path", path), ("username", "user")])
            .multipart(form);
        let response = Self::with_access(request, session)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(sandbox_failure(status, &body));
        }
        Ok(())
    }

    async fn start_server(
        &self,
        session: &SessionHandle,
        command: &str,
        output: mpsc::Sender<ServerOutput>,
    ) -> Result<ServerProcess> {
        let payload = serde_json::to_vec(&start_request(command))?;
        let request = self
            .stream_http
            .post(self.envd(session, "process.Process/Start"))
            .header(CONTENT_TYPE, "application/connect+json")
            .header(CONNECT_VERSION_HEADER, "1")
            .body(envelope::encode(&payload));
        let response = Self::with_access(request, session)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(sandbox_failure(status, &body));
        }

        let mut events = ProcessStream::new(
            response
                .bytes_stream()
                .map(|r| r.map(|b| b.to_vec()))
                .boxed(),
        );
        let mut lines = OutputLines::default();

        let pid = loop {
            match events.next_event().await {
                Some(Ok(ProcessEvent::Start { pid })) => break pid,
                Some(Ok(event)) => {
                    for line in lines.push(event) {
                        let _ = output.send(line).await;
                    }
                }
                Some(Err(e)) => return Err(e),
                None => return Err(Error::sandbox("process stream ended before start")),
            }
        };
        debug!("Server process started with pid {}", pid);

        tokio::spawn(pump_output(events, lines, output));
        Ok(ServerProcess { pid })
    }

    async fn kill_process(&self, session: &SessionHandle, process: ServerProcess) -> Result<()> {
        let request = self
            .http
            .post(self.envd(session, "process.Process/SendSignal"))
            .header(CONNECT_VERSION_HEADER, "1")
            .json(&kill_request(process.pid));
        let response = Self::with_access(request, session)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(sandbox_failure(status, &body));
        }
        Ok(())
    }

    async fn kill_session(&self, session: &SessionHandle) -> Result<()> {
        let response = self
            .http
            .delete(self.sandbox_url(&session.sandbox_id))
            .header(API_KEY_HEADER, session.api_key())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(sandbox_failure(status, &body))
    }

    async fn is_alive(&self, session: &SessionHandle) -> Result<bool> {
        let response = self
            .http
            .get(self.sandbox_url(&session.sandbox_id))
            .header(API_KEY_HEADER, session.api_key())
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => {
                let body = response.text().await.unwrap_or_default();
                Err(sandbox_failure(s, &body))
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Process output
// ─────────────────────────────────────────────────────────────────

/// Decoded events from a process start stream.
struct ProcessStream {
    bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: EnvelopeDecoder,
    ready: VecDeque<Result<ProcessEvent>>,
    done: bool,
}

impl ProcessStream {
    fn new(bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>) -> Self {
        Self {
            bytes,
            decoder: EnvelopeDecoder::new(),
            ready: VecDeque::new(),
            done: false,
        }
    }

    async fn next_event(&mut self) -> Option<Result<ProcessEvent>> {
        loop {
            if let Some(event) = self.ready.pop_front() {
                return Some(event);
            }
            if self.done {
                return None;
            }
            match self.bytes.next().await {
                Some(Ok(chunk)) => {
                    for frame in self.decoder.feed(&chunk) {
                        if frame.is_end_stream() {
                            self.done = true;
                            if let Err(e) = envelope::parse_trailer(&frame.payload) {
                                self.ready.push_back(Err(e));
                            }
                            break;
                        }
                        self.ready
                            .push_back(envelope::parse_process_event(&frame.payload));
                    }
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(transport_error(e)));
                }
                None => self.done = true,
            }
        }
    }
}

/// Splits raw stdout/stderr bytes into lines, per stream.
#[derive(Debug, Default)]
pub struct OutputLines {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl OutputLines {
    /// Buffer one event, returning the lines it completed.
    pub fn push(&mut self, event: ProcessEvent) -> Vec<ServerOutput> {
        match event {
            ProcessEvent::Stdout(bytes) => {
                split_lines(&mut self.stdout, &bytes).map(ServerOutput::Stdout).collect()
            }
            ProcessEvent::Stderr(bytes) => {
                split_lines(&mut self.stderr, &bytes).map(ServerOutput::Stderr).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Unterminated trailing lines.
    pub fn flush(&mut self) -> Vec<ServerOutput> {
        let mut out = Vec::new();
        if !self.stdout.is_empty() {
            out.push(ServerOutput::Stdout(lossy(&std::mem::take(&mut self.stdout))));
        }
        if !self.stderr.is_empty() {
            out.push(ServerOutput::Stderr(lossy(&std::mem::take(&mut self.stderr))));
        }
        out
    }
}

fn split_lines(buffer: &mut Vec<u8>, bytes: &[u8]) -> std::vec::IntoIter<String> {
    buffer.extend_from_slice(bytes);
    let mut lines = Vec::new();
    while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=pos).collect();
        let line = lossy(&line[..line.len() - 1]);
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines.into_iter()
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end_matches('\r').to_string()
}

async fn pump_output(
    mut events: ProcessStream,
    mut lines: OutputLines,
    output: mpsc::Sender<ServerOutput>,
) {
    while let Some(event) = events.next_event().await {
        match event {
            Ok(ProcessEvent::End { exit_code }) => {
                debug!("Server process ended (exit code {:?})", exit_code);
                break;
            }
            Ok(event) => {
                for line in lines.push(event) {
                    if output.send(line).await.is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                warn!("Server output stream failed: {}", e);
                break;
            }
        }
    }
    for line in lines.flush() {
        let _ = output.send(line).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_http::{MockResponse, MockServer};

    fn provider(api_base: String) -> E2bProvider {
        E2bProvider::new(
            reqwest::Client::new(),
            reqwest::Client::new(),
            E2bOptions {
                api_base,
                ..E2bOptions::default()
            },
        )
    }

    #[test]
    fn test_start_request_runs_command_through_login_shell() {
        let body = start_request("python3 -m http.server 8000");
        assert_eq!(body["process"]["cmd"], "/bin/bash");
        assert_eq!(body["process"]["args"][2], "python3 -m http.server 8000");
        assert_eq!(body["process"]["cwd"], WORKDIR);
    }

    #[test]
    fn test_kill_request_selects_pid() {
        let body = kill_request(17);
        assert_eq!(body["process"]["pid"], 17);
        assert_eq!(body["signal"], "SIGNAL_SIGKILL");
    }

    #[test]
    fn test_session_uses_default_domain_when_absent() {
        let p = provider("http://unused".to_string());
        let session = p
            .session_from(r#"{"sandboxID":"abc","clientID":"c1","envdAccessToken":null}"#, "key")
            .unwrap();
        assert_eq!(session.host(8000), "8000-abc.e2b.app");
        assert_eq!(p.envd(&session, "files"), "https://49983-abc.e2b.app/files");

        let session = p
            .session_from(r#"{"sandboxID":"abc","domain":"custom.dev"}"#, "key")
            .unwrap();
        assert_eq!(session.host(8000), "8000-abc.custom.dev");
    }

    #[test]
    fn test_output_lines_split_per_stream() {
        let mut lines = OutputLines::default();
        assert!(lines.push(ProcessEvent::Stdout(b"Serving HTTP on 0.0.0.0 ".to_vec())).is_empty());
        assert_eq!(
            lines.push(ProcessEvent::Stdout(b"port 8000\r\nGET /\n".to_vec())),
            vec![
                ServerOutput::Stdout("Serving HTTP on 0.0.0.0 port 8000".to_string()),
                ServerOutput::Stdout("GET /".to_string()),
            ]
        );
        assert!(lines.push(ProcessEvent::Stderr(b"partial".to_vec())).is_empty());
        assert_eq!(lines.flush(), vec![ServerOutput::Stderr("partial".to_string())]);
    }

    #[tokio::test]
    async fn test_create_session_sends_key_and_template() {
        let server = MockServer::start(vec![MockResponse::json(
            201,
            r#"{"sandboxID":"sb1","clientID":"c","envdAccessToken":"tok"}"#,
        )])
        .await;
        let p = provider(server.base_url());

        let session = SandboxProvider::create_session(&p, "e2b_key").await.unwrap();
        assert_eq!(session.sandbox_id, "sb1");
        assert_eq!(session.access_token(), Some("tok"));

        let requests = server.requests().await;
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/sandboxes");
        assert_eq!(requests[0].header("x-api-key"), Some("e2b_key"));
        assert!(requests[0].body.contains(r#""templateID":"base""#));
    }

    #[tokio::test]
    async fn test_create_session_unauthorized_is_auth_error() {
        let server = MockServer::start(vec![MockResponse::json(401, r#"{"message":"bad key"}"#)]).await;
        let p = provider(server.base_url());
        let err = SandboxProvider::create_session(&p, "nope").await.unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn test_liveness_and_kill_treat_missing_session_as_gone() {
        let server = MockServer::start(vec![
            MockResponse::json(200, r#"{"sandboxID":"sb1"}"#),
            MockResponse::json(404, r#"{"message":"not found"}"#),
            MockResponse::json(404, r#"{"message":"not found"}"#),
        ])
        .await;
        let p = provider(server.base_url());
        let session = SessionHandle::new("sb1", "e2b.app", "key");

        assert!(SandboxProvider::is_alive(&p, &session).await.unwrap());
        assert!(!SandboxProvider::is_alive(&p, &session).await.unwrap());
        SandboxProvider::kill_session(&p, &session).await.unwrap();

        let requests = server.requests().await;
        assert_eq!(requests[2].method, "DELETE");
        assert_eq!(requests[2].path, "/sandboxes/sb1");
    }
}
