use tracing::{debug, info};

use super::runner::{Invocation, ToolRunner};
use super::sandbox::Activation;
use super::state::LaunchError;
use crate::config::LauncherConfig;

/// What ensure_dependencies had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyOutcome {
    AlreadyInstalled,
    Installed,
}

/// `python -c "import <module>"` inside the sandbox
pub fn import_probe(activation: &Activation, module: &str) -> Invocation {
    activation
        .python()
        .arg("-c")
        .arg(format!("import {}", module))
}

/// `python -m pip install -r <manifest>` inside the sandbox
pub fn install_command(activation: &Activation, config: &LauncherConfig) -> Invocation {
    activation
        .python()
        .args(["-m", "pip", "install", "-r"])
        .arg(config.manifest.display().to_string())
        .current_dir(&config.project_dir)
}

/// Whether the probe module imports in the sandbox
pub async fn dependencies_present(
    runner: &dyn ToolRunner,
    activation: &Activation,
    config: &LauncherConfig,
) -> bool {
    let probe = import_probe(activation, &config.probe_module).current_dir(&config.project_dir);
    runner.probe(&probe).await
}

/// Install from the manifest unless the probe module already imports
pub async fn ensure_dependencies(
    runner: &dyn ToolRunner,
    activation: &Activation,
    config: &LauncherConfig,
) -> Result<DependencyOutcome, LaunchError> {
    if dependencies_present(runner, activation, config).await {
        debug!("'{}' imports, skipping install", config.probe_module);
        return Ok(DependencyOutcome::AlreadyInstalled);
    }

    let manifest = config.manifest_path();
    if !manifest.is_file() {
        return Err(LaunchError::ManifestMissing(format!("{:?}", manifest)));
    }

    info!(
        "'{}' not importable, installing from {:?}",
        config.probe_module, manifest
    );
    let install = install_command(activation, config);
    let completion = runner.run(&install).await?;

    if !completion.success() {
        return Err(LaunchError::DependencyInstall(format!(
            "{} failed with {}",
            install.command_line(),
            completion.describe()
        )));
    }

    Ok(DependencyOutcome::Installed)
}
