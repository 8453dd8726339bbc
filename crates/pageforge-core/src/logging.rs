//! Logging configuration using tracing

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;
use crate::paths;

/// Environment variable holding the tracing filter directive.
pub const LOG_ENV: &str = "PAGEFORGE_LOG";

/// Initialize the logging subsystem
///
/// Logs are written to `<data dir>/pageforge/logs/` so stdout stays free for
/// the headless event stream. Log level is controlled by `PAGEFORGE_LOG`.
///
/// # Examples
/// ```bash
/// PAGEFORGE_LOG=debug pageforge build "a pomodoro timer"
/// PAGEFORGE_LOG=pageforge_providers=trace pageforge keys validate
/// ```
pub fn init() -> Result<()> {
    let log_dir = get_log_directory();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "pageforge.log");

    // Default to info for our crates, warn for everything else
    let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        EnvFilter::new(
            "pageforge=info,pageforge_core=info,pageforge_providers=info,pageforge_app=info,warn",
        )
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!("═══════════════════════════════════════════════════════");
    tracing::info!("pageforge starting");
    tracing::info!("Log directory: {}", log_dir.display());
    tracing::info!("═══════════════════════════════════════════════════════");

    Ok(())
}

/// Get the log directory path
fn get_log_directory() -> PathBuf {
    paths::log_dir()
}

