//! Headless mode runner - main event loop without a UI
//!
//! Starts one generation, streams state changes to stdout as NDJSON and
//! accepts follow-up commands on stdin.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{info, warn};

use pageforge_app::{AppState, Engine, Message};
use pageforge_core::prelude::*;
use pageforge_core::{
    ChatMessage, GenerationMode, LogEntry, Provider, SandboxStatus, ValidationStatus,
};
use pageforge_providers::{E2bProvider, GeminiClient};

use super::HeadlessEvent;

/// What the `build` command asked for
#[derive(Debug, Clone)]
pub struct HeadlessOptions {
    pub mode: GenerationMode,
    pub input: String,
    /// Write the finished document here
    pub output: Option<PathBuf>,
    /// Quit once the first generation (and export) is done
    pub exit_when_done: bool,
}

/// Run in headless mode.
///
/// Returns `false` when the last generation failed.
pub async fn run_headless(
    config_dir: &Path,
    data_dir: &Path,
    options: HeadlessOptions,
) -> Result<bool> {
    info!("═══════════════════════════════════════════════════════");
    info!("pageforge starting in HEADLESS mode");
    info!("Mode: {:?}, input: {}", options.mode, options.input);
    info!("═══════════════════════════════════════════════════════");

    let mut engine = match Engine::live(config_dir, data_dir) {
        Ok(engine) => engine,
        Err(e) => {
            HeadlessEvent::error(&e.to_string(), true).emit();
            return Err(e);
        }
    };

    let stdin_tx = engine.msg_sender();
    std::thread::spawn(move || {
        spawn_stdin_reader_blocking(stdin_tx);
    });

    HeadlessEvent::ready().emit();
    engine.process_message(Message::StartGeneration {
        mode: options.mode,
        input: options.input.clone(),
    });

    let result = headless_event_loop(&mut engine, &options).await;

    engine.shutdown().await;

    info!("pageforge headless mode exiting");
    result
}

/// Main headless event loop
async fn headless_event_loop(
    engine: &mut Engine<GeminiClient, E2bProvider>,
    options: &HeadlessOptions,
) -> Result<bool> {
    let mut observer = StateObserver::default();
    let mut last_ok = true;
    let mut awaiting_export = false;

    for event in observer.observe(&engine.state) {
        event.emit();
    }

    loop {
        if engine.should_quit() {
            info!("Quit requested");
            break;
        }

        let Some(msg) = engine.msg_rx.recv().await else {
            info!("Message channel closed");
            break;
        };

        let export_done = matches!(
            msg,
            Message::CodeExported { .. } | Message::ExportFailed { .. }
        );
        if matches!(msg, Message::ExportFailed { .. }) {
            last_ok = false;
        }

        engine.process_message(msg);

        let mut finished = false;
        for event in observer.observe(&engine.state) {
            if let HeadlessEvent::GenerationFinished { success, .. } = event {
                last_ok = success;
                finished = true;
            }
            event.emit();
        }

        if finished && last_ok {
            if let Some(path) = &options.output {
                engine.process_message(Message::ExportCode { path: path.clone() });
                awaiting_export = true;
            }
        }

        let ready_to_exit = if awaiting_export {
            export_done
        } else {
            finished
        };
        if export_done {
            awaiting_export = false;
        }
        if options.exit_when_done && ready_to_exit {
            engine.process_message(Message::Quit);
        }
    }

    Ok(last_ok)
}

// ─────────────────────────────────────────────────────────────────
// State diffing
// ─────────────────────────────────────────────────────────────────

/// Tracks how far an append-only list has been emitted.
///
/// The list may be cleared and refilled between observations; a changed tail
/// entry means it was, and emission restarts from the front.
#[derive(Debug)]
struct EmitCursor<T> {
    seen: usize,
    tail: Option<T>,
}

impl<T> Default for EmitCursor<T> {
    fn default() -> Self {
        Self {
            seen: 0,
            tail: None,
        }
    }
}

impl<T: Clone + PartialEq> EmitCursor<T> {
    fn advance<'a>(&mut self, items: &'a [T]) -> &'a [T] {
        let restart = self.seen > items.len()
            || (self.seen > 0 && items.get(self.seen - 1) != self.tail.as_ref());
        let start = if restart { 0 } else { self.seen };
        self.seen = items.len();
        self.tail = items.last().cloned();
        &items[start..]
    }
}

/// Remembers what has been reported so only changes are emitted.
#[derive(Debug, Default)]
struct StateObserver {
    logs: EmitCursor<LogEntry>,
    chat: EmitCursor<ChatMessage>,
    code: String,
    loading: bool,
    sandbox_status: SandboxStatus,
    sandbox_url: Option<String>,
    error: Option<String>,
    validation: [ValidationStatus; Provider::ALL.len()],
}

impl StateObserver {
    fn observe(&mut self, state: &AppState) -> Vec<HeadlessEvent> {
        let mut events = Vec::new();

        if state.is_loading && !self.loading {
            events.push(HeadlessEvent::generation_started());
        }

        for entry in self.logs.advance(&state.logs) {
            events.push(HeadlessEvent::log(entry));
        }
        for turn in self.chat.advance(&state.chat) {
            events.push(HeadlessEvent::chat(turn.role, &turn.content));
        }

        if state.code != self.code {
            self.code = state.code.clone();
            events.push(HeadlessEvent::code_updated(self.code.len()));
        }

        if state.error != self.error {
            self.error = state.error.clone();
            if let Some(message) = &self.error {
                events.push(HeadlessEvent::error(message, false));
            }
        }

        if !state.is_loading && self.loading {
            events.push(HeadlessEvent::generation_finished(
                state.last_generation.as_ref(),
                state.code.len(),
            ));
        }
        self.loading = state.is_loading;

        if state.sandbox_status != self.sandbox_status {
            self.sandbox_status = state.sandbox_status;
            events.push(HeadlessEvent::sandbox_status(self.sandbox_status));
        }
        if state.sandbox_url != self.sandbox_url {
            self.sandbox_url = state.sandbox_url.clone();
            events.push(HeadlessEvent::preview_url(self.sandbox_url.as_deref()));
        }

        for (slot, provider) in self.validation.iter_mut().zip(Provider::ALL) {
            let status = state.validation_status(provider);
            if status != *slot {
                *slot = status;
                if matches!(status, ValidationStatus::Valid | ValidationStatus::Invalid) {
                    events.push(HeadlessEvent::key_validated(provider, status));
                }
            }
        }

        events
    }
}

// ─────────────────────────────────────────────────────────────────
// Stdin commands
// ─────────────────────────────────────────────────────────────────

/// Spawn stdin reader that sends commands to the message channel (blocking version)
fn spawn_stdin_reader_blocking(msg_tx: mpsc::Sender<Message>) {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    let reader = stdin.lock();

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Stdin read error: {}", e);
                break;
            }
        };

        match parse_command(&line) {
            Ok(Some(msg)) => {
                let quit = matches!(msg, Message::Quit);
                if msg_tx.blocking_send(msg).is_err() || quit {
                    break;
                }
            }
            Ok(None) => {}
            Err(reason) => {
                warn!("Rejected stdin command {:?}: {}", line, reason);
                HeadlessEvent::command_rejected(&line, reason).emit();
            }
        }
    }

    info!("Stdin reader exiting");
}

/// Parse one stdin line into a message.
///
/// Blank lines yield `Ok(None)`. `edit <path>` reads the file here so the
/// engine only ever sees text.
fn parse_command(line: &str) -> std::result::Result<Option<Message>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, arg) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let require_arg = || {
        if arg.is_empty() {
            Err(format!("'{}' needs an argument", verb))
        } else {
            Ok(arg.to_string())
        }
    };

    let msg = match verb {
        "prompt" => Message::StartGeneration {
            mode: GenerationMode::Prompt,
            input: require_arg()?,
        },
        "url" => Message::StartGeneration {
            mode: GenerationMode::Url,
            input: require_arg()?,
        },
        "refine" => Message::Refine {
            instruction: require_arg()?,
        },
        "edit" => {
            let path = require_arg()?;
            let text = std::fs::read_to_string(&path)
                .map_err(|e| format!("cannot read {}: {}", path, e))?;
            Message::EditorInput { text }
        }
        "export" => Message::ExportCode {
            path: PathBuf::from(require_arg()?),
        },
        "validate" => Message::ValidateKey {
            provider: require_arg()?.parse()?,
        },
        "r" | "refresh" => Message::RefreshPreview,
        "stop" => Message::StopPreview,
        "home" => Message::GoHome,
        "q" | "quit" => Message::Quit,
        _ => return Err(format!("unknown command '{}'", verb)),
    };
    Ok(Some(msg))
}
