//! Process invocation.
//!
//! Every external program the launcher starts goes through [`ToolRunner`],
//! described by an [`Invocation`]. [`SystemRunner`] is the real
//! implementation on top of `tokio::process`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::state::LaunchError;

/// How long the application gets to exit on its own after Ctrl+C
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Exit code reported when the operator interrupts the application
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// A fully described process start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub env_remove: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            env: Vec::new(),
            env_remove: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn env_remove(mut self, key: impl Into<String>) -> Self {
        self.env_remove.push(key.into());
        self
    }

    /// Command line as the operator would type it
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(ref dir) = self.current_dir {
            command.current_dir(dir);
        }
        for key in &self.env_remove {
            command.env_remove(key);
        }
        for (key, value) in &self.env {
            command.env(key, value);
        }
        command
    }
}

/// Result of a tool that ran to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// `None` when the process was terminated by a signal
    pub code: Option<i32>,
}

impl Completion {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn describe(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// How the application process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppExit {
    Exited { code: Option<i32> },
    Interrupted,
}

impl AppExit {
    /// Exit code the launcher itself should return
    pub fn exit_code(&self) -> i32 {
        match self {
            AppExit::Exited { code: Some(code) } => *code,
            AppExit::Exited { code: None } => 1,
            AppExit::Interrupted => INTERRUPTED_EXIT_CODE,
        }
    }

    /// [`Self::exit_code`] squeezed into a process status byte.
    ///
    /// Codes that do not fit (Windows NTSTATUS crash codes arrive negative)
    /// become 1, so a failure never turns into success.
    pub fn process_status(&self) -> u8 {
        match self.exit_code() {
            0 => 0,
            code => u8::try_from(code).ok().filter(|c| *c != 0).unwrap_or(1),
        }
    }
}

/// Seam between the launch steps and the operating system
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run silently; only whether it succeeded matters.
    /// A program that cannot be started counts as failure.
    async fn probe(&self, invocation: &Invocation) -> bool;

    /// Run to completion with the console inherited
    async fn run(&self, invocation: &Invocation) -> Result<Completion, LaunchError>;

    /// Start the application and block until it exits or the operator interrupts it
    async fn serve(&self, invocation: &Invocation) -> Result<AppExit, LaunchError>;
}

/// Runs real processes
#[derive(Debug, Clone)]
pub struct SystemRunner {
    shutdown_grace: Duration,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self {
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    #[cfg(test)]
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_error(invocation: &Invocation, e: std::io::Error) -> LaunchError {
    LaunchError::Spawn(format!("{}: {}", invocation.command_line(), e))
}

#[async_trait]
impl ToolRunner for SystemRunner {
    async fn probe(&self, invocation: &Invocation) -> bool {
        debug!("Probing: {}", invocation.command_line());
        let status = invocation
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) => status.success(),
            Err(e) => {
                debug!("Probe could not start: {}", e);
                false
            }
        }
    }

    async fn run(&self, invocation: &Invocation) -> Result<Completion, LaunchError> {
        info!("Running: {}", invocation.command_line());
        let status = invocation
            .to_command()
            .status()
            .await
            .map_err(|e| spawn_error(invocation, e))?;

        Ok(Completion {
            code: status.code(),
        })
    }

    async fn serve(&self, invocation: &Invocation) -> Result<AppExit, LaunchError> {
        info!("Starting application: {}", invocation.command_line());
        let mut child = invocation
            .to_command()
            .spawn()
            .map_err(|e| spawn_error(invocation, e))?;

        tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|e| spawn_error(invocation, e))?;
                info!("Application exited with {:?}", status.code());
                Ok(AppExit::Exited { code: status.code() })
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, stopping application...");
                // The child shares the console and got the interrupt too
                match tokio::time::timeout(self.shutdown_grace, child.wait()).await {
                    Ok(_) => debug!("Application stopped within grace period"),
                    Err(_) => {
                        warn!(
                            "Application still running after {:?}, killing it",
                            self.shutdown_grace
                        );
                        if let Err(e) = child.kill().await {
                            warn!("Failed to kill application: {}", e);
                        }
                    }
                }
                Ok(AppExit::Interrupted)
            }
        }
    }
}
