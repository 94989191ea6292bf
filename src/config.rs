use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Port the Streamlit front end binds to. `main.py` hardcodes it.
pub const APP_PORT: u16 = 8501;

/// Name of the optional per-project config file
pub const CONFIG_FILE_NAME: &str = "launcher.json";

/// Launcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    pub schema_version: u32,
    pub project_dir: PathBuf,

    // Artifacts, relative to project_dir
    pub sandbox_dir: PathBuf,
    pub manifest: PathBuf,
    pub secrets_file: PathBuf,
    pub secrets_template: PathBuf,
    pub entry_point: PathBuf,

    /// Selector flag passed to the entry point
    pub ui_flag: String,
    /// Package whose import stands in for "dependencies installed"
    pub probe_module: String,
    /// Base interpreter override (otherwise discovered)
    pub interpreter: Option<String>,
    /// Keys the operator has to fill in after `.env` is seeded
    pub required_keys: Vec<String>,
    pub pause_on_seed: bool,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            project_dir: PathBuf::from("."),
            sandbox_dir: PathBuf::from("venv"),
            manifest: PathBuf::from("requirements.txt"),
            secrets_file: PathBuf::from(".env"),
            secrets_template: PathBuf::from(".env.example"),
            entry_point: PathBuf::from("main.py"),
            ui_flag: "--streamlit".to_string(),
            probe_module: "streamlit".to_string(),
            interpreter: None,
            required_keys: vec!["ANTHROPIC_API_KEY".to_string(), "HUME_API_KEY".to_string()],
            pause_on_seed: true,
        }
    }
}

impl LauncherConfig {
    /// Load config from file, or create default
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {:?}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file {:?}", path))
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        std::fs::write(path, content)
            .context("Failed to write config file")
    }

    /// Get the default config directory
    pub fn default_config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Failed to get home directory")?;
        Ok(home.join(".emovoice"))
    }

    /// Resolve which config file applies to a project.
    ///
    /// An explicit path wins; then `<project>/launcher.json`; then the
    /// user-level file. Returns `None` when nothing exists.
    pub fn locate(explicit: Option<&Path>, project_dir: &Path) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        let project_file = project_dir.join(CONFIG_FILE_NAME);
        if project_file.exists() {
            return Some(project_file);
        }

        Self::default_config_dir()
            .ok()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }

    fn resolve(&self, relative: &Path) -> PathBuf {
        self.project_dir.join(relative)
    }

    pub fn sandbox_path(&self) -> PathBuf {
        self.resolve(&self.sandbox_dir)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.resolve(&self.manifest)
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.resolve(&self.secrets_file)
    }

    pub fn template_path(&self) -> PathBuf {
        self.resolve(&self.secrets_template)
    }

    pub fn app_url(&self) -> String {
        format!("http://localhost:{}", APP_PORT)
    }
}
