use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Launch progress. Moves forward only, one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchState {
    Start,
    SandboxReady,
    Activated,
    DependenciesReady,
    SecretsReady,
    Running,
    Exited,
    Interrupted,
}

impl LaunchState {
    fn can_advance_to(&self, next: LaunchState) -> bool {
        use LaunchState::*;
        matches!(
            (self, next),
            (Start, SandboxReady)
                | (SandboxReady, Activated)
                | (Activated, DependenciesReady)
                | (DependenciesReady, SecretsReady)
                | (SecretsReady, Running)
                | (Running, Exited)
                | (Running, Interrupted)
        )
    }

    /// Move to `next`, rejecting skips, repeats and back-edges
    pub fn advance(&mut self, next: LaunchState) -> Result<(), LaunchError> {
        if !self.can_advance_to(next) {
            return Err(LaunchError::InvalidTransition(format!(
                "Cannot go from {} to {}",
                self, next
            )));
        }
        debug!("Launch transitioning {} -> {}", self, next);
        *self = next;
        Ok(())
    }
}

impl std::fmt::Display for LaunchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LaunchState::Start => write!(f, "start"),
            LaunchState::SandboxReady => write!(f, "sandbox_ready"),
            LaunchState::Activated => write!(f, "activated"),
            LaunchState::DependenciesReady => write!(f, "dependencies_ready"),
            LaunchState::SecretsReady => write!(f, "secrets_ready"),
            LaunchState::Running => write!(f, "running"),
            LaunchState::Exited => write!(f, "exited"),
            LaunchState::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Launcher error types. Every one of them stops the launch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LaunchError {
    #[error("No Python interpreter found: {0}")]
    InterpreterNotFound(String),
    #[error("Failed to create sandbox: {0}")]
    SandboxCreation(String),
    #[error("Sandbox is broken: {0}")]
    SandboxBroken(String),
    #[error("Dependency manifest not found: {0}")]
    ManifestMissing(String),
    #[error("Dependency installation failed: {0}")]
    DependencyInstall(String),
    #[error("Secrets template not found: {0}")]
    TemplateMissing(String),
    #[error("Failed to seed secrets file: {0}")]
    SecretsCopy(String),
    #[error("Failed to start process: {0}")]
    Spawn(String),
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),
    #[error("Operator prompt failed: {0}")]
    Operator(String),
}
