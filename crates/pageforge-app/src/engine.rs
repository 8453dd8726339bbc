//! Engine - orchestration shared by every frontend
//!
//! The Engine owns the TEA state, the message channel, the long-lived service
//! clients and the two background tasks (sandbox supervisor and editor
//! debounce). Frontends feed it messages and read `state` afterwards.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use pageforge_core::prelude::*;
use pageforge_providers::{CodeGenerator, E2bProvider, GeminiClient, KeyValidator, SandboxProvider, Scraper};

use crate::actions::ServiceContext;
use crate::config::{self, Settings};
use crate::credentials::CredentialStore;
use crate::editor::spawn_editor;
use crate::message::Message;
use crate::process;
use crate::sandbox::{spawn_supervisor, SandboxHandle, SandboxManager};
use crate::services::build_live_services;
use crate::signals;
use crate::state::AppState;

/// Capacity of the unified message channel
const MESSAGE_CHANNEL_CAPACITY: usize = 256;

/// Upper bound on sandbox teardown during shutdown
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Service implementations the engine runs against.
pub struct EngineParts<G, P> {
    pub generator: G,
    pub scraper: Scraper,
    pub sandbox: Arc<P>,
    pub validator: KeyValidator<P>,
    pub credentials: CredentialStore,
}

/// Orchestration engine for pageforge.
pub struct Engine<G, P> {
    /// TEA application state (the Model)
    pub state: AppState,

    /// Sender half of the unified message channel.
    /// Clone this to give to input sources (signal handler, stdin reader).
    pub msg_tx: mpsc::Sender<Message>,

    /// Receiver half of the unified message channel.
    pub msg_rx: mpsc::Receiver<Message>,

    /// Loaded settings
    pub settings: Settings,

    services: ServiceContext<G, P>,

    tasks: Vec<JoinHandle<()>>,
}

impl<G, P> Engine<G, P>
where
    G: CodeGenerator + Send + Sync + 'static,
    P: SandboxProvider + Send + Sync + 'static,
{
    /// Create an engine from explicit parts. Must run inside a tokio runtime.
    ///
    /// Spawns the sandbox supervisor and the editor debounce task.
    pub fn new(settings: Settings, parts: EngineParts<G, P>) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel::<Message>(MESSAGE_CHANNEL_CAPACITY);

        let state = AppState::new(parts.credentials.keys().clone());

        let manager = SandboxManager::new(parts.sandbox, settings.sandbox.clone(), msg_tx.clone());
        let (sandbox, supervisor_task) = spawn_supervisor(
            manager,
            settings.sandbox.debounce(),
            settings.sandbox.liveness_interval(),
        );
        let (editor, editor_task) = spawn_editor(msg_tx.clone(), settings.editor.debounce());

        let services = ServiceContext {
            generator: Arc::new(parts.generator),
            scraper: Arc::new(parts.scraper),
            validator: Arc::new(parts.validator),
            credentials: Arc::new(Mutex::new(parts.credentials)),
            sandbox,
            editor,
        };

        Self {
            state,
            msg_tx,
            msg_rx,
            settings,
            services,
            tasks: vec![supervisor_task, editor_task],
        }
    }

    /// Process a single message through the TEA update cycle.
    pub fn process_message(&mut self, msg: Message) {
        process::process_message(&mut self.state, msg, &self.msg_tx, &self.services);
    }

    /// Drain and process all pending messages from the channel.
    ///
    /// Returns the number of messages processed.
    pub fn drain_pending_messages(&mut self) -> usize {
        let mut count = 0;
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.process_message(msg);
            count += 1;
        }
        count
    }

    /// Get a clone of the message sender for spawning input sources.
    pub fn msg_sender(&self) -> mpsc::Sender<Message> {
        self.msg_tx.clone()
    }

    pub fn sandbox(&self) -> &SandboxHandle {
        &self.services.sandbox
    }

    /// Check if the application should quit.
    pub fn should_quit(&self) -> bool {
        self.state.should_quit()
    }

    /// Cancel generation, tear the preview down and stop background tasks.
    pub async fn shutdown(&mut self) {
        self.state.cancel_generation();

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.services.sandbox.shutdown()).await {
            Ok(()) => info!("Sandbox closed"),
            Err(_) => warn!("Sandbox teardown timed out"),
        }

        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Engine<GeminiClient, E2bProvider> {
    /// Engine wired to the real providers.
    ///
    /// Initializes the config directory, loads settings and credentials and
    /// installs the signal handler.
    pub fn live(config_dir: &Path, data_dir: &Path) -> Result<Self> {
        if let Err(e) = config::init_config_dir(config_dir) {
            warn!("Failed to initialize config directory: {}", e);
        }
        let settings = config::load_settings(config_dir);
        let credentials = CredentialStore::open(data_dir);
        let services =
            build_live_services(&settings).context("Failed to build service clients")?;

        let engine = Self::new(
            settings,
            EngineParts {
                generator: services.generator,
                scraper: services.scraper,
                sandbox: services.sandbox,
                validator: services.validator,
                credentials,
            },
        );
        signals::spawn_signal_handler(engine.msg_sender());
        Ok(engine)
    }
}
