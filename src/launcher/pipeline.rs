//! Drives the launch steps in order.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::app::start_application;
use super::deps::{ensure_dependencies, DependencyOutcome};
use super::runner::{AppExit, ToolRunner};
use super::sandbox::{activate, ensure_sandbox, SandboxOutcome};
use super::secrets::{ensure_secrets_file, report_key_issues, KeyIssue, SecretsOutcome};
use super::state::{LaunchError, LaunchState};
use crate::activity_log;
use crate::config::LauncherConfig;
use crate::operator::Operator;

/// What a launch did, step by step
#[derive(Debug, Clone)]
pub struct LaunchReport {
    pub launch_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub state: LaunchState,
    pub sandbox: Option<SandboxOutcome>,
    pub dependencies: Option<DependencyOutcome>,
    pub secrets: Option<SecretsOutcome>,
    pub key_issues: Vec<KeyIssue>,
    pub app_exit: Option<AppExit>,
}

impl LaunchReport {
    fn new() -> Self {
        Self {
            launch_id: Uuid::new_v4(),
            started_at: Utc::now(),
            ended_at: None,
            state: LaunchState::Start,
            sandbox: None,
            dependencies: None,
            secrets: None,
            key_issues: Vec::new(),
            app_exit: None,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        self.ended_at
            .map(|end| (end - self.started_at).num_milliseconds())
            .unwrap_or(0)
    }
}

/// One launch of the application
pub struct Launcher {
    config: LauncherConfig,
    runner: Arc<dyn ToolRunner>,
    operator: Arc<dyn Operator>,
    report: LaunchReport,
}

impl Launcher {
    pub fn new(
        config: LauncherConfig,
        runner: Arc<dyn ToolRunner>,
        operator: Arc<dyn Operator>,
    ) -> Self {
        Self {
            config,
            runner,
            operator,
            report: LaunchReport::new(),
        }
    }

    fn advance(&mut self, next: LaunchState) -> Result<(), LaunchError> {
        self.report.state.advance(next)?;
        activity_log::log_step_complete(&self.report.launch_id, next);
        Ok(())
    }

    /// Run every step, then block on the application
    pub async fn run(mut self) -> Result<LaunchReport, LaunchError> {
        let span = info_span!("launch", id = %self.report.launch_id);
        let result = self.run_steps().instrument(span).await;
        self.report.ended_at = Some(Utc::now());

        match result {
            Ok(()) => Ok(self.report),
            Err(e) => {
                activity_log::log_launch_failed(&self.report.launch_id, self.report.state, &e);
                Err(e)
            }
        }
    }

    async fn run_steps(&mut self) -> Result<(), LaunchError> {
        activity_log::log_launch_start(&self.report.launch_id, &self.config.project_dir);
        let runner = Arc::clone(&self.runner);
        let operator = Arc::clone(&self.operator);

        operator.banner("Checking Python environment...");
        let sandbox = ensure_sandbox(runner.as_ref(), &self.config).await?;
        if sandbox == SandboxOutcome::Created {
            operator.banner(&format!(
                "Created virtual environment in {}",
                self.config.sandbox_dir.display()
            ));
        }
        self.report.sandbox = Some(sandbox);
        self.advance(LaunchState::SandboxReady)?;

        let activation = activate(&self.config)?;
        self.advance(LaunchState::Activated)?;

        operator.banner("Checking dependencies...");
        let dependencies = ensure_dependencies(runner.as_ref(), &activation, &self.config).await?;
        self.report.dependencies = Some(dependencies);
        self.advance(LaunchState::DependenciesReady)?;

        let secrets = ensure_secrets_file(&self.config, operator.as_ref())?;
        self.report.secrets = Some(secrets);
        self.report.key_issues = report_key_issues(&self.config, operator.as_ref());
        self.advance(LaunchState::SecretsReady)?;

        self.advance(LaunchState::Running)?;
        let exit = start_application(runner.as_ref(), &activation, &self.config, operator.as_ref())
            .await?;
        self.report.app_exit = Some(exit);
        activity_log::log_app_exit(&self.report.launch_id, &exit);

        match exit {
            AppExit::Exited { .. } => self.advance(LaunchState::Exited),
            AppExit::Interrupted => self.advance(LaunchState::Interrupted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::testing::{fake_sandbox, CallKind, RecordingRunner, ScriptedOperator};
    use std::path::Path;
    use tempfile::tempdir;

    const TEMPLATE: &str = "ANTHROPIC_API_KEY=your_anthropic_api_key_here\nHUME_API_KEY=your_hume_api_key_here\n";

    fn fresh_project(dir: &Path) -> LauncherConfig {
        let config = LauncherConfig {
            project_dir: dir.to_path_buf(),
            ..Default::default()
        };
        std::fs::write(config.manifest_path(), "streamlit\n").unwrap();
        std::fs::write(config.template_path(), TEMPLATE).unwrap();
        std::fs::write(dir.join("main.py"), "").unwrap();
        config
    }

    #[tokio::test]
    async fn test_fresh_project_runs_every_step_in_order() {
        let dir = tempdir().unwrap();
        let config = fresh_project(dir.path());
        let mut runner = RecordingRunner::new();
        runner.import_succeeds = false;
        let runner = Arc::new(runner);
        let operator = Arc::new(ScriptedOperator::default());

        let report = Launcher::new(config.clone(), runner.clone(), operator.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(report.state, LaunchState::Exited);
        assert_eq!(report.sandbox, Some(SandboxOutcome::Created));
        assert_eq!(report.dependencies, Some(DependencyOutcome::Installed));
        assert_eq!(report.secrets, Some(SecretsOutcome::Seeded));
        assert_eq!(report.key_issues.len(), 2);
        assert_eq!(report.app_exit, Some(AppExit::Exited { code: Some(0) }));
        assert!(report.ended_at.is_some());

        let kinds: Vec<CallKind> = runner.calls().iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds.last(), Some(&CallKind::Serve));

        let runs = runner.calls_of(CallKind::Run);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].args, vec!["-m", "venv", "venv"]);
        assert!(runs[1].args.contains(&"requirements.txt".to_string()));

        let serves = runner.calls_of(CallKind::Serve);
        assert_eq!(serves.len(), 1);
        assert_eq!(serves[0].args, vec!["main.py", "--streamlit"]);

        assert_eq!(
            std::fs::read(config.secrets_path()).unwrap(),
            TEMPLATE.as_bytes()
        );
        assert_eq!(operator.acknowledgment_count(), 1);
    }

    #[tokio::test]
    async fn test_ready_project_only_probes_and_serves() {
        let dir = tempdir().unwrap();
        let config = fresh_project(dir.path());
        fake_sandbox(&config.sandbox_path());
        std::fs::write(config.secrets_path(), "ANTHROPIC_API_KEY=sk-a\nHUME_API_KEY=h-b\n").unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let operator = Arc::new(ScriptedOperator::default());

        let report = Launcher::new(config.clone(), runner.clone(), operator.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(report.sandbox, Some(SandboxOutcome::Existing));
        assert_eq!(report.dependencies, Some(DependencyOutcome::AlreadyInstalled));
        assert_eq!(report.secrets, Some(SecretsOutcome::Present));
        assert!(report.key_issues.is_empty());

        let kinds: Vec<CallKind> = runner.calls().iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, vec![CallKind::Probe, CallKind::Serve]);
        assert_eq!(operator.acknowledgment_count(), 0);
        assert_eq!(
            std::fs::read_to_string(config.secrets_path()).unwrap(),
            "ANTHROPIC_API_KEY=sk-a\nHUME_API_KEY=h-b\n"
        );
    }

    #[tokio::test]
    async fn test_interrupt_is_terminal_state() {
        let dir = tempdir().unwrap();
        let config = fresh_project(dir.path());
        fake_sandbox(&config.sandbox_path());
        let mut runner = RecordingRunner::new();
        runner.app_exit = AppExit::Interrupted;

        let report = Launcher::new(config, Arc::new(runner), Arc::new(ScriptedOperator::default()))
            .run()
            .await
            .unwrap();

        assert_eq!(report.state, LaunchState::Interrupted);
        assert_eq!(report.app_exit.map(|e| e.exit_code()), Some(130));
    }

    #[tokio::test]
    async fn test_failure_stops_before_application() {
        let dir = tempdir().unwrap();
        let config = fresh_project(dir.path());
        let mut runner = RecordingRunner::new();
        runner.import_succeeds = false;
        let runner = Arc::new(runner);
        std::fs::remove_file(config.manifest_path()).unwrap();

        let err = Launcher::new(config.clone(), runner.clone(), Arc::new(ScriptedOperator::default()))
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, LaunchError::ManifestMissing(_)));
        assert!(runner.calls_of(CallKind::Serve).is_empty());
        assert!(!config.secrets_path().exists());
    }

    #[tokio::test]
    async fn test_broken_sandbox_is_fatal() {
        let dir = tempdir().unwrap();
        let config = fresh_project(dir.path());
        std::fs::create_dir(config.sandbox_path()).unwrap();
        let runner = Arc::new(RecordingRunner::new());

        let err = Launcher::new(config, runner.clone(), Arc::new(ScriptedOperator::default()))
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, LaunchError::SandboxBroken(_)));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_new_launcher_starts_at_start() {
        let launcher = Launcher::new(
            LauncherConfig::default(),
            Arc::new(RecordingRunner::new()),
            Arc::new(ScriptedOperator::default()),
        );
        assert_eq!(launcher.report.state, LaunchState::Start);
        assert!(launcher.report.app_exit.is_none());
        assert_eq!(launcher.report.duration_ms(), 0);
    }
}
