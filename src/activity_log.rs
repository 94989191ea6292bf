//! Activity Logging Module
//!
//! Console logging for the operator plus an optional JSON file log for
//! post-mortems of failed launches.
//! IMPORTANT: This module must NEVER log secret values from `.env`.
//!
//! What IS logged:
//! - Launch IDs and project paths
//! - Step transitions and their outcomes
//! - Application exit codes
//! - Error messages
//!
//! What is NOT logged:
//! - API keys or any other `.env` value

use std::path::Path;
use std::sync::OnceLock;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};
use uuid::Uuid;

use crate::launcher::{AppExit, LaunchError, LaunchState};

/// Guard that must be held for the duration of the launcher
/// to ensure logs are flushed before exit
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Initialize logging
///
/// Console output uses `RUST_LOG` when set, otherwise `console_level`.
/// With `log_dir`, a daily-rotated JSON file `launcher.log` is written too.
pub fn init_logging(console_level: &str, log_dir: Option<&Path>) -> anyhow::Result<()> {
    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "launcher.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            LOG_GUARD.set(guard).ok();

            Some(
                fmt::layer()
                    .json()
                    .with_timer(UtcTime::rfc_3339())
                    .with_writer(non_blocking)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_filter(EnvFilter::new("info,emovoice_launcher=debug")),
            )
        }
        None => None,
    };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(console_level)),
        );

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .init();

    if let Some(dir) = log_dir {
        info!(
            event = "logging_initialized",
            log_dir = %dir.display(),
            "File logging enabled"
        );
    }

    Ok(())
}

// ============================================================================
// Launch Lifecycle Events
// ============================================================================

pub fn log_launch_start(launch_id: &Uuid, project_dir: &Path) {
    info!(
        event = "launch_start",
        launch_id = %launch_id,
        project_dir = %project_dir.display(),
        "Launch started"
    );
}

pub fn log_step_complete(launch_id: &Uuid, state: LaunchState) {
    info!(
        event = "step_complete",
        launch_id = %launch_id,
        state = %state,
        "Launch step complete"
    );
}

pub fn log_app_exit(launch_id: &Uuid, exit: &AppExit) {
    info!(
        event = "app_exit",
        launch_id = %launch_id,
        interrupted = matches!(exit, AppExit::Interrupted),
        exit_code = exit.exit_code(),
        "Application stopped"
    );
}

pub fn log_launch_failed(launch_id: &Uuid, state: LaunchState, err: &LaunchError) {
    error!(
        event = "launch_failed",
        launch_id = %launch_id,
        last_state = %state,
        error = %err,
        "Launch failed"
    );
}
