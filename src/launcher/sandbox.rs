//! The isolated Python environment: creation, interpreter discovery and activation.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::runner::{Invocation, ToolRunner};
use super::state::LaunchError;
use crate::config::LauncherConfig;

#[cfg(windows)]
const BIN_DIR: &str = "Scripts";
#[cfg(not(windows))]
const BIN_DIR: &str = "bin";

#[cfg(windows)]
const PYTHON_EXE: &str = "python.exe";
#[cfg(not(windows))]
const PYTHON_EXE: &str = "python";

#[cfg(windows)]
const DEFAULT_INTERPRETERS: &[&str] = &["python", "py"];
#[cfg(not(windows))]
const DEFAULT_INTERPRETERS: &[&str] = &["python3", "python"];

/// What ensure_sandbox had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxOutcome {
    Existing,
    Created,
}

/// The environment overrides that make a sandbox "active" for a child process.
///
/// Shell activation mutates the shell; here it is a value applied to each
/// [`Invocation`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub root: PathBuf,
    pub bin_dir: PathBuf,
    pub python: PathBuf,
}

impl Activation {
    /// Layout of a sandbox rooted at `root`, without checking it.
    ///
    /// Paths are made absolute: children run from the project directory,
    /// so a relative interpreter path would resolve against the wrong base.
    pub fn for_sandbox(root: &Path) -> Self {
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        let bin_dir = root.join(BIN_DIR);
        let python = bin_dir.join(PYTHON_EXE);
        Self {
            root,
            bin_dir,
            python,
        }
    }

    /// `PATH` with the sandbox executables first
    fn search_path(&self) -> String {
        let inherited = std::env::var_os("PATH").unwrap_or_default();
        let paths = std::iter::once(self.bin_dir.clone())
            .chain(std::env::split_paths(&inherited));
        match std::env::join_paths(paths) {
            Ok(joined) => joined.to_string_lossy().into_owned(),
            // An inherited entry contains the separator; fall back to ours alone
            Err(_) => self.bin_dir.display().to_string(),
        }
    }

    /// Apply the activation environment to an invocation
    pub fn apply(&self, invocation: Invocation) -> Invocation {
        invocation
            .env("VIRTUAL_ENV", self.root.display().to_string())
            .env("PATH", self.search_path())
            .env_remove("PYTHONHOME")
    }

    /// The sandbox interpreter, activated
    pub fn python(&self) -> Invocation {
        self.apply(Invocation::new(&self.python))
    }
}

/// Interpreters to try, in order
pub fn interpreter_candidates(config: &LauncherConfig) -> Vec<String> {
    match config.interpreter {
        Some(ref interpreter) => vec![interpreter.clone()],
        None => DEFAULT_INTERPRETERS.iter().map(|s| s.to_string()).collect(),
    }
}

/// First candidate interpreter that answers `--version`
pub async fn discover_interpreter(
    runner: &dyn ToolRunner,
    config: &LauncherConfig,
) -> Result<String, LaunchError> {
    let candidates = interpreter_candidates(config);
    for candidate in &candidates {
        if runner.probe(&Invocation::new(candidate).arg("--version")).await {
            debug!("Using interpreter: {}", candidate);
            return Ok(candidate.clone());
        }
        debug!("Interpreter candidate not usable: {}", candidate);
    }
    Err(LaunchError::InterpreterNotFound(format!(
        "tried {}",
        candidates.join(", ")
    )))
}

/// Create the sandbox directory if it does not exist yet
pub async fn ensure_sandbox(
    runner: &dyn ToolRunner,
    config: &LauncherConfig,
) -> Result<SandboxOutcome, LaunchError> {
    let sandbox = config.sandbox_path();

    if sandbox.is_dir() {
        debug!("Sandbox already exists: {:?}", sandbox);
        return Ok(SandboxOutcome::Existing);
    }
    if sandbox.exists() {
        return Err(LaunchError::SandboxBroken(format!(
            "{:?} exists but is not a directory",
            sandbox
        )));
    }

    let interpreter = discover_interpreter(runner, config).await?;
    info!("Creating sandbox {:?} with {}", sandbox, interpreter);

    let invocation = Invocation::new(&interpreter)
        .args(["-m", "venv"])
        .arg(config.sandbox_dir.display().to_string())
        .current_dir(&config.project_dir);
    let completion = runner.run(&invocation).await?;

    if !completion.success() {
        return Err(LaunchError::SandboxCreation(format!(
            "{} failed with {}",
            invocation.command_line(),
            completion.describe()
        )));
    }
    if !sandbox.is_dir() {
        return Err(LaunchError::SandboxCreation(format!(
            "{:?} missing after {}",
            sandbox,
            invocation.command_line()
        )));
    }

    Ok(SandboxOutcome::Created)
}

/// Build the activation for the project's sandbox
pub fn activate(config: &LauncherConfig) -> Result<Activation, LaunchError> {
    let activation = Activation::for_sandbox(&config.sandbox_path());
    if !activation.python.exists() {
        return Err(LaunchError::SandboxBroken(format!(
            "interpreter {:?} not found, delete {:?} and relaunch",
            activation.python, activation.root
        )));
    }
    debug!("Activated sandbox {:?}", activation.root);
    Ok(activation)
}
