//! Read-only diagnosis of a project, for `--check`.

use tracing::debug;

use super::deps::dependencies_present;
use super::runner::ToolRunner;
use super::sandbox::Activation;
use super::secrets::{audit_keys, KeyIssue};
use crate::config::LauncherConfig;

/// One line of the diagnosis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckItem {
    pub name: &'static str,
    pub ok: bool,
    pub detail: String,
    /// Whether a failure here means the next launch has work to do
    pub blocking: bool,
    /// Whether the launcher can repair a failure here on its own
    pub fixable: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Diagnosis {
    pub items: Vec<CheckItem>,
    pub key_issues: Vec<KeyIssue>,
}

impl Diagnosis {
    /// Nothing left for the launcher to set up
    pub fn ready(&self) -> bool {
        self.items.iter().all(|item| item.ok || !item.blocking)
            && self.key_issues.is_empty()
    }

    /// Failed items the next launch would stop on
    pub fn blockers(&self) -> Vec<&CheckItem> {
        self.items
            .iter()
            .filter(|item| !item.ok && item.blocking && !item.fixable)
            .collect()
    }

    fn push(&mut self, name: &'static str, ok: bool, detail: String, blocking: bool, fixable: bool) {
        self.items.push(CheckItem {
            name,
            ok,
            detail,
            blocking,
            fixable,
        });
    }
}

/// Inspect every artifact without creating or installing anything
pub async fn diagnose(runner: &dyn ToolRunner, config: &LauncherConfig) -> Diagnosis {
    let mut diagnosis = Diagnosis::default();

    let sandbox = config.sandbox_path();
    let has_sandbox = sandbox.is_dir();
    diagnosis.push(
        "sandbox",
        has_sandbox,
        sandbox.display().to_string(),
        true,
        true,
    );

    // A sandbox directory without an interpreter is not recreated
    let activation = Activation::for_sandbox(&sandbox);
    let has_python = activation.python.is_file();
    diagnosis.push(
        "sandbox interpreter",
        has_python,
        activation.python.display().to_string(),
        true,
        !has_sandbox,
    );

    let (deps_ok, deps_detail) = if has_python {
        let present = dependencies_present(runner, &activation, config).await;
        (present, format!("import {}", config.probe_module))
    } else {
        debug!("Skipping import check, no sandbox interpreter");
        (false, "not checked (no sandbox)".to_string())
    };

    // Only needed when there is something to install
    let manifest = config.manifest_path();
    diagnosis.push(
        "manifest",
        manifest.is_file(),
        manifest.display().to_string(),
        !deps_ok,
        false,
    );
    diagnosis.push("dependencies", deps_ok, deps_detail, true, true);

    let secrets = config.secrets_path();
    let has_secrets = secrets.is_file();
    diagnosis.push(
        "secrets file",
        has_secrets,
        secrets.display().to_string(),
        true,
        true,
    );

    let template = config.template_path();
    diagnosis.push(
        "secrets template",
        template.is_file(),
        template.display().to_string(),
        !has_secrets,
        false,
    );

    if has_secrets {
        match audit_keys(&secrets, &config.required_keys) {
            Ok(issues) => diagnosis.key_issues = issues,
            Err(e) => diagnosis.push("secrets syntax", false, e.to_string(), true, false),
        }
    }

    diagnosis
}
