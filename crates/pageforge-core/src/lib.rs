//! # pageforge-core - Core Domain Types
//!
//! Foundation crate for pageforge. Provides domain types, error handling,
//! fence stripping for streamed model output, prompt construction, and logging.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, chrono, thiserror, tracing, dirs).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`ChatMessage`], [`ChatRole`] - Append-only chat transcript entries
//! - [`LogEntry`] - Timestamped activity line
//! - [`SandboxStatus`] - Preview sandbox status (idle, connecting, running, error)
//! - [`GenerationMode`], [`View`], [`ValidationStatus`]
//!
//! ### Credentials (`provider`)
//! - [`Provider`] - The six credential-bearing services
//! - [`ApiKeys`] - Key record persisted by the credential store
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Error enum with auth / recoverable / fatal classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ### Streaming (`fence`)
//! - [`FenceStripper`] - Removes markdown code fences from streamed fragments
//!
//! ## Prelude
//!
//! ```rust
//! use pageforge_core::prelude::*;
//! ```

pub mod error;
pub mod fence;
pub mod logging;
pub mod paths;
pub mod prompts;
pub mod provider;
pub mod types;

/// Prelude for common imports used throughout all pageforge crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use error::{Error, Result, ResultExt};
pub use fence::{strip_fences, FenceStripper};
pub use provider::{ApiKeys, Provider};
pub use types::{
    ChatMessage, ChatRole, GenerationMode, LogEntry, SandboxStatus, ValidationStatus, View,
};
