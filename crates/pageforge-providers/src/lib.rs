//! # pageforge-providers - Remote Service Clients
//!
//! HTTP clients for everything pageforge talks to: the model that writes the
//! page, the scraper behind "recreate from URL", the sandbox host that serves
//! the live preview, and the key-validation probes for all of them.
//!
//! Depends on [`pageforge_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Code Generation
//! - [`CodeGenerator`] - Opens a raw text stream for a prompt
//! - [`GenerationStream`] - Fence-stripped, cancellable view of that stream
//! - [`GeminiClient`] - `streamGenerateContent` over server-sent events
//!
//! ### Scraping
//! - [`PageScraper`] - Fetch page text for a URL
//! - [`Scraper`] - Firecrawl or offline placeholder, chosen from config
//!
//! ### Sandbox
//! - [`SandboxProvider`] - Create sessions, write files, run the preview server
//! - [`E2bProvider`] - E2B control plane plus the in-sandbox Connect daemon
//!
//! ### Validation
//! - [`KeyValidator`] - Cheapest accept/reject probe per provider

pub mod endpoints;
pub mod gemini;
pub mod generation;
pub mod http;
pub mod sandbox;
pub mod scrape;
pub mod sse;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;
pub mod validation;

#[cfg(test)]
mod mock_http;

pub use endpoints::Endpoints;
pub use gemini::GeminiClient;
pub use generation::{CodeGenerator, GenerationStream, LocalCodeGenerator, TextStream};
pub use sandbox::{
    E2bOptions, E2bProvider, LocalSandboxProvider, SandboxProvider, ServerOutput, ServerProcess,
    SessionHandle,
};
pub use scrape::{
    FirecrawlScraper, LocalPageScraper, PageScraper, PlaceholderScraper, Scraper,
};
pub use validation::{KeyValidator, Verdict};
