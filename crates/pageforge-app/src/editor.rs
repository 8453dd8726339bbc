//! Debounced commit of editor input into the code buffer
//!
//! Keystroke-level input goes to the editor task through [`EditorHandle`].
//! Once input has been quiet for the configured period the task sends
//! [`Message::CodeCommitted`] with the latest text.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use pageforge_core::prelude::*;

use crate::debounce::Debouncer;
use crate::message::Message;

#[derive(Debug)]
enum EditorCommand {
    Input(String),
    Discard,
}

/// Sender side of the editor task.
#[derive(Debug, Clone)]
pub struct EditorHandle {
    tx: mpsc::UnboundedSender<EditorCommand>,
}

impl EditorHandle {
    pub fn input(&self, text: impl Into<String>) {
        if self.tx.send(EditorCommand::Input(text.into())).is_err() {
            debug!("Editor task is gone; input dropped");
        }
    }

    /// Forget uncommitted input (the buffer is about to be regenerated).
    pub fn discard(&self) {
        let _ = self.tx.send(EditorCommand::Discard);
    }
}

pub fn spawn_editor(msg_tx: mpsc::Sender<Message>, debounce: Duration) -> (EditorHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(rx, msg_tx, debounce));
    (EditorHandle { tx }, task)
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<EditorCommand>,
    msg_tx: mpsc::Sender<Message>,
    debounce: Duration,
) {
    let mut pending = Debouncer::new(debounce);
    loop {
        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(EditorCommand::Input(text)) => pending.schedule(text),
                Some(EditorCommand::Discard) => {
                    pending.cancel();
                }
                None => break,
            },
            text = pending.fired() => {
                if msg_tx.send(Message::CodeCommitted { text }).await.is_err() {
                    break;
                }
            }
        }
    }
    debug!("Editor task stopped");
}
