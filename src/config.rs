use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::model::RemoteFileLocation;
use crate::remote::github::DEFAULT_API_BASE;
use crate::remote::DEFAULT_COMMIT_MESSAGE;

pub const DEFAULT_CONFIG_PATH: &str = "kanban-config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
    /// Where the app config JSON lives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<AppLocation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppLocation {
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_config_path")]
    pub path: String,
}

impl From<&AppLocation> for RemoteFileLocation {
    fn from(app: &AppLocation) -> Self {
        RemoteFileLocation::new(app.owner.clone(), app.repo.clone(), &app.path)
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_config_path() -> String {
    DEFAULT_CONFIG_PATH.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            commit_message: None,
            app: None,
        }
    }
}

impl Settings {
    pub fn commit_message(&self) -> &str {
        self.commit_message.as_deref().unwrap_or(DEFAULT_COMMIT_MESSAGE)
    }

    pub fn app_location(&self) -> Option<RemoteFileLocation> {
        self.app.as_ref().map(RemoteFileLocation::from)
    }
}

/// `$GITBOARD_HOME`, or `~/.gitboard`.
pub fn data_dir() -> PathBuf {
    if let Some(home) = std::env::var_os("GITBOARD_HOME") {
        return PathBuf::from(home);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".gitboard")
}

pub fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

pub fn load_settings() -> Result<Settings> {
    load_settings_from(&config_path())
}

pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let settings: Settings = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(settings)
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(&config_path(), settings)
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let contents = toml::to_string_pretty(settings).context("Failed to serialize settings")?;
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    Ok(())
}
