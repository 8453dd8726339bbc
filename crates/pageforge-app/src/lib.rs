//! pageforge-app - Application state and orchestration for pageforge
//!
//! This crate implements the TEA (The Elm Architecture) pattern for state management,
//! the Engine abstraction for shared orchestration, configuration and credential
//! storage, the live-preview sandbox supervisor and the editor debounce.

pub mod actions;
pub mod config;
pub mod credentials;
pub mod debounce;
pub mod editor;
pub mod engine;
pub mod handler;
pub mod message;
pub mod process;
pub mod sandbox;
pub mod services;
pub mod signals;
pub mod state;

// Re-export primary types
pub use credentials::CredentialStore;
pub use engine::{Engine, EngineParts};
pub use handler::{GenerationJob, GenerationRequest, UpdateAction, UpdateResult};
pub use message::{GenerationId, Message};
pub use sandbox::{SandboxEvent, SandboxHandle};
pub use state::{AppState, GenerationKind, GenerationOutcome};
