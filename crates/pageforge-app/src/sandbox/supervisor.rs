//! Single owner of the [`SandboxManager`]
//!
//! The supervisor task receives [`SandboxCommand`]s, runs the trailing-edge
//! debounce for code changes and polls the host for liveness. It runs at most
//! one update at a time: while one is in flight, further update triggers are
//! dropped and a stop waits for the update to finish before tearing down.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use pageforge_core::prelude::*;
use pageforge_providers::SandboxProvider;

use super::manager::SandboxManager;
use crate::debounce::Debouncer;

#[derive(Debug)]
pub enum SandboxCommand {
    /// Code buffer changed; update after the quiet period
    CodeChanged { code: String, api_key: String },
    /// Update right away
    Refresh { code: String, api_key: String },
    /// Tear the session down
    Stop { done: Option<oneshot::Sender<()>> },
    /// Tear down and exit the supervisor
    Shutdown { done: Option<oneshot::Sender<()>> },
}

/// Cloneable sender side of the supervisor.
#[derive(Debug, Clone)]
pub struct SandboxHandle {
    tx: mpsc::UnboundedSender<SandboxCommand>,
}

impl SandboxHandle {
    fn send(&self, cmd: SandboxCommand) {
        if self.tx.send(cmd).is_err() {
            debug!("Sandbox supervisor is gone; command dropped");
        }
    }

    pub fn code_changed(&self, code: impl Into<String>, api_key: impl Into<String>) {
        self.send(SandboxCommand::CodeChanged {
            code: code.into(),
            api_key: api_key.into(),
        });
    }

    pub fn refresh(&self, code: impl Into<String>, api_key: impl Into<String>) {
        self.send(SandboxCommand::Refresh {
            code: code.into(),
            api_key: api_key.into(),
        });
    }

    pub fn stop(&self) {
        self.send(SandboxCommand::Stop { done: None });
    }

    /// Stop and wait until teardown has finished.
    pub async fn stop_and_wait(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        self.send(SandboxCommand::Stop {
            done: Some(done_tx),
        });
        let _ = done_rx.await;
    }

    /// Tear down and stop the supervisor, waiting for both.
    pub async fn shutdown(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        self.send(SandboxCommand::Shutdown {
            done: Some(done_tx),
        });
        let _ = done_rx.await;
    }
}

/// Spawn the supervisor task that owns `manager`.
pub fn spawn_supervisor<P>(
    manager: SandboxManager<P>,
    debounce: Duration,
    liveness_interval: Duration,
) -> (SandboxHandle, JoinHandle<()>)
where
    P: SandboxProvider + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(manager, rx, debounce, liveness_interval));
    (SandboxHandle { tx }, task)
}

/// What to do once an in-flight update has finished.
enum AfterUpdate {
    Resume,
    Stop(Vec<oneshot::Sender<()>>),
    Shutdown(Vec<oneshot::Sender<()>>),
}

impl AfterUpdate {
    fn with_stop(self, done: Option<oneshot::Sender<()>>) -> Self {
        match self {
            AfterUpdate::Resume => AfterUpdate::Stop(done.into_iter().collect()),
            AfterUpdate::Stop(mut waiters) => {
                waiters.extend(done);
                AfterUpdate::Stop(waiters)
            }
            AfterUpdate::Shutdown(mut waiters) => {
                waiters.extend(done);
                AfterUpdate::Shutdown(waiters)
            }
        }
    }

    fn with_shutdown(self, done: Option<oneshot::Sender<()>>) -> Self {
        let mut waiters = match self {
            AfterUpdate::Resume => Vec::new(),
            AfterUpdate::Stop(waiters) | AfterUpdate::Shutdown(waiters) => waiters,
        };
        waiters.extend(done);
        AfterUpdate::Shutdown(waiters)
    }
}

enum Step {
    Command(SandboxCommand),
    Fire(String, String),
    Liveness,
}

async fn run<P>(
    mut manager: SandboxManager<P>,
    mut rx: mpsc::UnboundedReceiver<SandboxCommand>,
    debounce: Duration,
    liveness_interval: Duration,
) where
    P: SandboxProvider + Send + Sync + 'static,
{
    let mut pending: Debouncer<(String, String)> = Debouncer::new(debounce);
    let mut liveness = interval_at(Instant::now() + liveness_interval, liveness_interval);
    liveness.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let step = tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(cmd) => Step::Command(cmd),
                None => Step::Command(SandboxCommand::Shutdown { done: None }),
            },
            (code, api_key) = pending.fired() => Step::Fire(code, api_key),
            _ = liveness.tick(), if manager.has_session() => Step::Liveness,
        };

        let after = match step {
            Step::Liveness => {
                manager.check_alive().await;
                AfterUpdate::Resume
            }
            Step::Fire(code, api_key) => {
                update(&mut manager, &mut rx, &mut pending, code, api_key).await
            }
            Step::Command(SandboxCommand::CodeChanged { code, api_key }) => {
                pending.schedule((code, api_key));
                AfterUpdate::Resume
            }
            Step::Command(SandboxCommand::Refresh { code, api_key }) => {
                pending.cancel();
                update(&mut manager, &mut rx, &mut pending, code, api_key).await
            }
            Step::Command(SandboxCommand::Stop { done }) => AfterUpdate::Resume.with_stop(done),
            Step::Command(SandboxCommand::Shutdown { done }) => {
                AfterUpdate::Resume.with_shutdown(done)
            }
        };

        match after {
            AfterUpdate::Resume => {}
            AfterUpdate::Stop(waiters) => {
                pending.cancel();
                manager.stop().await;
                notify(waiters);
            }
            AfterUpdate::Shutdown(waiters) => {
                pending.cancel();
                manager.stop().await;
                notify(waiters);
                info!("Sandbox supervisor stopped");
                return;
            }
        }
    }
}

/// Run one update while still draining commands.
///
/// Update triggers arriving meanwhile are dropped. Code changes keep feeding
/// the debouncer. Stop and shutdown requests are held until the update ends.
async fn update<P>(
    manager: &mut SandboxManager<P>,
    rx: &mut mpsc::UnboundedReceiver<SandboxCommand>,
    pending: &mut Debouncer<(String, String)>,
    code: String,
    api_key: String,
) -> AfterUpdate
where
    P: SandboxProvider + Send + Sync + 'static,
{
    let mut after = AfterUpdate::Resume;
    let mut closed = false;
    let start = manager.start(&code, &api_key);
    tokio::pin!(start);

    loop {
        tokio::select! {
            _ = &mut start => return after,
            _ = pending.fired() => {
                debug!("Sandbox update already in flight; debounced update dropped");
            }
            cmd = rx.recv(), if !closed => match cmd {
                Some(SandboxCommand::CodeChanged { code, api_key }) => {
                    pending.schedule((code, api_key));
                }
                Some(SandboxCommand::Refresh { .. }) => {
                    debug!("Sandbox update already in flight; refresh dropped");
                }
                Some(SandboxCommand::Stop { done }) => {
                    after = after.with_stop(done);
                }
                Some(SandboxCommand::Shutdown { done }) => {
                    after = after.with_shutdown(done);
                }
                None => {
                    closed = true;
                    after = after.with_shutdown(None);
                }
            },
        }
    }
}

fn notify(waiters: Vec<oneshot::Sender<()>>) {
    for done in waiters {
        let _ = done.send(());
    }
}
