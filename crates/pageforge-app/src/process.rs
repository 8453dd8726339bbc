//! Message processing: runs update() and dispatches the resulting actions

use tokio::sync::mpsc;

use pageforge_providers::{CodeGenerator, SandboxProvider};

use crate::actions::{handle_action, ServiceContext};
use crate::handler;
use crate::message::Message;
use crate::state::AppState;

/// Process a message through the TEA update function
pub fn process_message<G, P>(
    state: &mut AppState,
    message: Message,
    msg_tx: &mpsc::Sender<Message>,
    services: &ServiceContext<G, P>,
) where
    G: CodeGenerator + Send + Sync + 'static,
    P: SandboxProvider + Send + Sync + 'static,
{
    let mut msg = Some(message);
    while let Some(m) = msg {
        let result = handler::update(state, m);

        if let Some(action) = result.action {
            handle_action(action, msg_tx.clone(), services);
        }

        // Continue with follow-up message
        msg = result.message;
    }
}
