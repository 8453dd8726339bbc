//! Connect streaming envelopes and process events
//!
//! Each message on a Connect stream is framed as one flags byte, a big-endian
//! `u32` length, then the JSON payload. The final frame sets
//! [`END_STREAM`] and carries an optional error instead of a message.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;

use pageforge_core::prelude::*;

/// Flag bit marking the trailing end-of-stream frame.
pub const END_STREAM: u8 = 0x02;

const HEADER_LEN: usize = 5;

/// Frame one message for sending.
pub fn encode(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.push(0);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub flags: u8,
    pub payload: Vec<u8>,
}

impl Envelope {
    pub fn is_end_stream(&self) -> bool {
        self.flags & END_STREAM != 0
    }
}

/// Reassembles envelopes from arbitrarily chunked bytes.
#[derive(Debug, Default)]
pub struct EnvelopeDecoder {
    buffer: Vec<u8>,
}

impl EnvelopeDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Envelope> {
        self.buffer.extend_from_slice(chunk);

        let mut out = Vec::new();
        while self.buffer.len() >= HEADER_LEN {
            let len = u32::from_be_bytes([
                self.buffer[1],
                self.buffer[2],
                self.buffer[3],
                self.buffer[4],
            ]) as usize;
            if self.buffer.len() < HEADER_LEN + len {
                break;
            }
            let frame: Vec<u8> = self.buffer.drain(..HEADER_LEN + len).collect();
            out.push(Envelope {
                flags: frame[0],
                payload: frame[HEADER_LEN..].to_vec(),
            });
        }
        out
    }

    /// Bytes of an incomplete frame still waiting for more input.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

// ─────────────────────────────────────────────────────────────────
// Process events
// ─────────────────────────────────────────────────────────────────

/// One event from a process start stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Start { pid: u32 },
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
    End { exit_code: Option<i32> },
    KeepAlive,
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(default)]
    event: RawEvent,
}

#[derive(Deserialize, Default)]
struct RawEvent {
    start: Option<RawStart>,
    data: Option<RawData>,
    end: Option<RawEnd>,
}

#[derive(Deserialize)]
struct RawStart {
    pid: u32,
}

#[derive(Deserialize)]
struct RawData {
    stdout: Option<String>,
    stderr: Option<String>,
    pty: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnd {
    exit_code: Option<i32>,
}

#[derive(Deserialize)]
struct RawTrailer {
    error: Option<RawTrailerError>,
}

#[derive(Deserialize)]
struct RawTrailerError {
    code: Option<String>,
    message: Option<String>,
}

/// Decode the payload of a regular (non end-of-stream) frame.
pub fn parse_process_event(payload: &[u8]) -> Result<ProcessEvent> {
    let message: RawMessage = serde_json::from_slice(payload)?;
    let event = message.event;

    if let Some(start) = event.start {
        return Ok(ProcessEvent::Start { pid: start.pid });
    }
    if let Some(data) = event.data {
        if let Some(stdout) = data.stdout.or(data.pty) {
            return Ok(ProcessEvent::Stdout(decode_bytes(&stdout)?));
        }
        if let Some(stderr) = data.stderr {
            return Ok(ProcessEvent::Stderr(decode_bytes(&stderr)?));
        }
    }
    if let Some(end) = event.end {
        return Ok(ProcessEvent::End {
            exit_code: end.exit_code,
        });
    }
    Ok(ProcessEvent::KeepAlive)
}

/// Check an end-of-stream frame for a reported error.
pub fn parse_trailer(payload: &[u8]) -> Result<()> {
    if payload.is_empty() {
        return Ok(());
    }
    let trailer: RawTrailer = serde_json::from_slice(payload)?;
    match trailer.error {
        Some(err) => Err(Error::sandbox(format!(
            "{}: {}",
            err.code.as_deref().unwrap_or("unknown"),
            err.message.as_deref().unwrap_or("stream failed")
        ))),
        None => Ok(()),
    }
}

fn decode_bytes(encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoded)
        .map_err(|e| Error::sandbox(format!("invalid process output encoding: {}", e)))
}
