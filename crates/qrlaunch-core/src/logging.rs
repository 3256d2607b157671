//! Logging configuration using tracing

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Initialize the logging subsystem
///
/// Logs are written to `~/.local/share/qrlaunch/logs/` so stdout stays free
/// for NDJSON events. Log level is controlled by the `QRLAUNCH_LOG`
/// environment variable.
///
/// # Examples
/// ```bash
/// QRLAUNCH_LOG=debug qrlaunch --page-url https://bank.example.se/login
/// QRLAUNCH_LOG=qrlaunch_app=trace qrlaunch ...
/// ```
pub fn init() -> Result<()> {
    let log_dir = get_log_directory();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "qrlaunch.log");

    // Default to info for our crates, warn for everything else
    let env_filter = EnvFilter::try_from_env("QRLAUNCH_LOG")
        .unwrap_or_else(|_| EnvFilter::new("qrlaunch=info,qrlaunch_app=info,warn"));

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
    tracing::info!("qrlaunch starting");
    tracing::info!("Log directory: {}", log_dir.display());
    tracing::info!("═══════════════════════════════════════════════════════");

    Ok(())
}

/// Get the log directory path
fn get_log_directory() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("qrlaunch").join("logs")
}
