//! Test doubles for the launch steps.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

use super::runner::{AppExit, Completion, Invocation, ToolRunner};
use super::state::LaunchError;
use crate::operator::Operator;

/// Which entry point recorded an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Probe,
    Run,
    Serve,
}

/// Records every invocation and answers from a script.
///
/// `-m venv <dir>` is honoured by creating the directory (and an
/// interpreter file inside it), like the real tool would.
pub struct RecordingRunner {
    calls: Mutex<Vec<(CallKind, Invocation)>>,
    /// Programs whose `--version` probe succeeds
    pub interpreters: HashSet<String>,
    pub import_succeeds: bool,
    pub run_code: Option<i32>,
    pub venv_creates_dir: bool,
    pub app_exit: AppExit,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            interpreters: ["python3", "python"].iter().map(|s| s.to_string()).collect(),
            import_succeeds: true,
            run_code: Some(0),
            venv_creates_dir: true,
            app_exit: AppExit::Exited { code: Some(0) },
        }
    }

    pub fn calls(&self) -> Vec<(CallKind, Invocation)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_of(&self, kind: CallKind) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, inv)| inv)
            .collect()
    }

    fn record(&self, kind: CallKind, invocation: &Invocation) {
        self.calls.lock().unwrap().push((kind, invocation.clone()));
    }

    fn create_venv(&self, invocation: &Invocation) {
        let Some(pos) = invocation.args.iter().position(|a| a == "venv") else {
            return;
        };
        if pos == 0 || invocation.args[pos - 1] != "-m" {
            return;
        }
        let Some(target) = invocation.args.get(pos + 1) else {
            return;
        };
        let base = invocation.current_dir.clone().unwrap_or_default();
        let root = base.join(target);
        fake_sandbox(&root);
    }
}

/// Lay out a sandbox directory with an interpreter file in it
pub fn fake_sandbox(root: &std::path::Path) -> PathBuf {
    let bin = root.join(if cfg!(windows) { "Scripts" } else { "bin" });
    std::fs::create_dir_all(&bin).unwrap();
    let python = bin.join(if cfg!(windows) { "python.exe" } else { "python" });
    std::fs::write(&python, b"").unwrap();
    python
}

#[async_trait]
impl ToolRunner for RecordingRunner {
    async fn probe(&self, invocation: &Invocation) -> bool {
        self.record(CallKind::Probe, invocation);
        if invocation.args.first().map(String::as_str) == Some("--version") {
            let program = invocation.program.display().to_string();
            return self.interpreters.contains(&program);
        }
        self.import_succeeds
    }

    async fn run(&self, invocation: &Invocation) -> Result<Completion, LaunchError> {
        self.record(CallKind::Run, invocation);
        if self.venv_creates_dir && self.run_code == Some(0) {
            self.create_venv(invocation);
        }
        Ok(Completion {
            code: self.run_code,
        })
    }

    async fn serve(&self, invocation: &Invocation) -> Result<AppExit, LaunchError> {
        self.record(CallKind::Serve, invocation);
        Ok(self.app_exit)
    }
}

/// Operator that never blocks and counts what it was asked
#[derive(Default)]
pub struct ScriptedOperator {
    pub banners: Mutex<Vec<String>>,
    pub acknowledgments: Mutex<usize>,
}

impl ScriptedOperator {
    pub fn acknowledgment_count(&self) -> usize {
        *self.acknowledgments.lock().unwrap()
    }
}

impl Operator for ScriptedOperator {
    fn banner(&self, message: &str) {
        self.banners.lock().unwrap().push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.banners.lock().unwrap().push(message.to_string());
    }

    fn acknowledge(&self, _prompt: &str) -> Result<(), LaunchError> {
        *self.acknowledgments.lock().unwrap() += 1;
        Ok(())
    }
}
