//! Filesystem locations for settings, credentials and logs
//!
//! Everything lives under the platform config/data directories unless
//! `PAGEFORGE_HOME` is set, in which case that single directory holds it all.

use std::path::PathBuf;

/// Environment variable that relocates every pageforge file.
pub const HOME_ENV: &str = "PAGEFORGE_HOME";

const APP_DIR: &str = "pageforge";

/// Directory holding `config.toml`.
pub fn config_home() -> PathBuf {
    home_override().unwrap_or_else(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    })
}

/// Directory holding the credential record and logs.
pub fn data_home() -> PathBuf {
    home_override().unwrap_or_else(|| {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    })
}

/// Directory for rolling log files.
pub fn log_dir() -> PathBuf {
    data_home().join("logs")
}

fn home_override() -> Option<PathBuf> {
    std::env::var_os(HOME_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
