//! The `.env` secrets file.
//!
//! The launcher only guarantees the file exists. Contents are the
//! operator's job; [`audit_keys`] merely points out required keys that
//! still look unset. Secret values never reach the logs.

use std::path::Path;
use tracing::{debug, info, warn};

use super::state::LaunchError;
use crate::config::LauncherConfig;
use crate::operator::Operator;

/// What ensure_secrets_file had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretsOutcome {
    Present,
    Seeded,
}

/// Why a required key needs attention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyProblem {
    Missing,
    Empty,
    Placeholder,
}

impl std::fmt::Display for KeyProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyProblem::Missing => write!(f, "missing"),
            KeyProblem::Empty => write!(f, "empty"),
            KeyProblem::Placeholder => write!(f, "still the template placeholder"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyIssue {
    pub key: String,
    pub problem: KeyProblem,
}

/// Template values look like `your_openai_api_key_here`
fn is_placeholder(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    lower.starts_with("your_") || lower.starts_with("your-") || lower.ends_with("_here")
}

/// Copy the template into place if the secrets file is missing.
///
/// An existing file is never touched. After seeding, the operator is asked
/// to fill in the required keys and the launch pauses until they confirm.
pub fn ensure_secrets_file(
    config: &LauncherConfig,
    operator: &dyn Operator,
) -> Result<SecretsOutcome, LaunchError> {
    let secrets = config.secrets_path();
    if secrets.exists() {
        debug!("Secrets file present: {:?}", secrets);
        return Ok(SecretsOutcome::Present);
    }

    let template = config.template_path();
    if !template.is_file() {
        return Err(LaunchError::TemplateMissing(format!(
            "{:?} (needed to create {:?})",
            template, secrets
        )));
    }

    std::fs::copy(&template, &secrets)
        .map_err(|e| LaunchError::SecretsCopy(format!("{:?} -> {:?}: {}", template, secrets, e)))?;
    info!("Seeded {:?} from {:?}", secrets, template);

    operator.warn(&format!(
        "Created {} from {}. Add your API keys before continuing:",
        config.secrets_file.display(),
        config.secrets_template.display()
    ));
    for key in &config.required_keys {
        operator.warn(&format!("  {}=...", key));
    }
    operator.acknowledge("Press Enter once the keys are in place...")?;

    Ok(SecretsOutcome::Seeded)
}

/// Required keys that are missing, empty or left as placeholders
pub fn audit_keys(path: &Path, required: &[String]) -> Result<Vec<KeyIssue>, dotenvy::Error> {
    let mut values = std::collections::HashMap::new();
    for item in dotenvy::from_path_iter(path)? {
        let (key, value) = item?;
        values.insert(key, value);
    }

    let issues = required
        .iter()
        .filter_map(|key| {
            let problem = match values.get(key) {
                None => KeyProblem::Missing,
                Some(value) if value.trim().is_empty() => KeyProblem::Empty,
                Some(value) if is_placeholder(value) => KeyProblem::Placeholder,
                Some(_) => return None,
            };
            Some(KeyIssue {
                key: key.clone(),
                problem,
            })
        })
        .collect();

    Ok(issues)
}

/// Run the audit and tell the operator about anything unset. Never fails the launch.
pub fn report_key_issues(config: &LauncherConfig, operator: &dyn Operator) -> Vec<KeyIssue> {
    match audit_keys(&config.secrets_path(), &config.required_keys) {
        Ok(issues) => {
            for issue in &issues {
                warn!(key = %issue.key, problem = %issue.problem, "Required key needs attention");
                operator.warn(&format!(
                    "{} is {} in {}; the app will fail to reach its provider",
                    issue.key,
                    issue.problem,
                    config.secrets_file.display()
                ));
            }
            issues
        }
        Err(e) => {
            warn!("Could not parse {:?}: {}", config.secrets_path(), e);
            operator.warn(&format!(
                "Could not parse {}: {}",
                config.secrets_file.display(),
                e
            ));
            Vec::new()
        }
    }
}
