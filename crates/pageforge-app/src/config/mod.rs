//! Configuration file handling for pageforge
//!
//! Supports `config.toml` in the config home (see `pageforge_core::paths`).

pub mod settings;
pub mod types;

pub use settings::{init_config_dir, load_settings, save_settings, CONFIG_FILENAME};
pub use types::*;
