//! Live preview sandbox
//!
//! - `manager`: session lifecycle against a [`SandboxProvider`](pageforge_providers::SandboxProvider)
//! - `supervisor`: task that owns the manager, debounces code changes and polls liveness

pub mod manager;
pub mod supervisor;

pub use manager::{preview_url, SandboxEvent, SandboxManager};
pub use supervisor::{spawn_supervisor, SandboxCommand, SandboxHandle};
