use tracing::info;

use super::runner::{AppExit, Invocation, ToolRunner};
use super::sandbox::Activation;
use super::state::LaunchError;
use crate::config::LauncherConfig;
use crate::operator::Operator;

/// `python main.py --streamlit`, activated, from the project directory.
/// The selector flag is the only argument.
pub fn app_command(activation: &Activation, config: &LauncherConfig) -> Invocation {
    activation
        .python()
        .arg(config.entry_point.display().to_string())
        .arg(config.ui_flag.clone())
        .current_dir(&config.project_dir)
}

/// Start the application and block until it exits or is interrupted
pub async fn start_application(
    runner: &dyn ToolRunner,
    activation: &Activation,
    config: &LauncherConfig,
    operator: &dyn Operator,
) -> Result<AppExit, LaunchError> {
    let command = app_command(activation, config);

    operator.banner(&format!(
        "Starting EmoVoice at {} (Ctrl+C to stop)",
        config.app_url()
    ));
    info!(url = %config.app_url(), "Handing off to application");

    runner.serve(&command).await
}
