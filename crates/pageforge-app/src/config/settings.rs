//! Loading and saving `config.toml`

use std::path::Path;

use pageforge_core::prelude::*;

use super::types::Settings;

pub const CONFIG_FILENAME: &str = "config.toml";

const CONFIG_HEADER: &str = "# pageforge configuration\n# Every key is optional; missing keys use the defaults shown by `pageforge init`.\n\n";

/// Load settings from `<config_dir>/config.toml`.
///
/// A missing or unreadable file yields defaults; problems are logged, never raised.
pub fn load_settings(config_dir: &Path) -> Settings {
    let config_path = config_dir.join(CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Write a default `config.toml` unless one exists already.
///
/// Returns `true` when a file was created.
pub fn init_config_dir(config_dir: &Path) -> Result<bool> {
    let config_path = config_dir.join(CONFIG_FILENAME);
    if config_path.exists() {
        return Ok(false);
    }
    save_settings(config_dir, &Settings::default())?;
    Ok(true)
}

/// Save settings to `<config_dir>/config.toml`.
///
/// Uses atomic write (temp file + rename).
pub fn save_settings(config_dir: &Path, settings: &Settings) -> Result<()> {
    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir)
            .map_err(|e| Error::config(format!("Failed to create config dir: {}", e)))?;
    }

    let config_path = config_dir.join(CONFIG_FILENAME);
    let temp_path = config_dir.join(".config.toml.tmp");

    let content = toml::to_string_pretty(settings)
        .map_err(|e| Error::config(format!("Failed to serialize settings: {}", e)))?;

    std::fs::write(&temp_path, format!("{}{}", CONFIG_HEADER, content))
        .map_err(|e| Error::config(format!("Failed to write temp file: {}", e)))?;
    std::fs::rename(&temp_path, &config_path)
        .map_err(|e| Error::config(format!("Failed to rename temp file: {}", e)))?;

    info!("Saved settings to {:?}", config_path);
    Ok(())
}
