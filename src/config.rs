//! User configuration.
//!
//! Config file location: `~/.config/git-linewise/config.toml` (XDG_CONFIG_HOME)
//!
//! ```toml
//! [diff]
//! context_lines = 3
//!
//! [render]
//! color = true
//!
//! [editor]
//! command = "nvim"
//! ```

use error_set::error_set;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "git-linewise";
const FILE_NAME: &str = "config.toml";

error_set! {
    /// Errors from reading an explicitly requested config file
    ConfigError := {
        #[display("Could not read config {path}: {message}")]
        Unreadable { path: String, message: String },
        #[display("Invalid config {path}: {message}")]
        Invalid { path: String, message: String },
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Lines of context requested from `git diff`
    pub context_lines: u32,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self { context_lines: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub color: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub command: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub diff: DiffConfig,
    pub render: RenderConfig,
    pub editor: EditorConfig,
}

impl Config {
    /// Get all possible config file paths in priority order
    fn config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join(APP_DIR).join(FILE_NAME));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join(APP_DIR).join(FILE_NAME));
        }

        // ~/Library/Application Support on macOS
        if let Some(config_dir) = dirs::config_dir() {
            let platform_path = config_dir.join(APP_DIR).join(FILE_NAME);
            if !paths.contains(&platform_path) {
                paths.push(platform_path);
            }
        }

        paths
    }

    /// Get the first existing config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_paths().into_iter().find(|p| p.exists())
    }

    /// Load the implicit config file.
    ///
    /// Falls back to defaults when there is none or it cannot be used.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        Self::from_path(&path).unwrap_or_else(|e| {
            tracing::warn!("{e}; using default configuration");
            Self::default()
        })
    }

    /// Load a specific config file
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| match e {
            ConfigError::Invalid { message, .. } => ConfigError::Invalid {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Invalid {
            path: "<inline>".to_string(),
            message: e.message().to_string(),
        })
    }

    /// Editor command: the configured one, then `$GIT_EDITOR`, `$VISUAL`, `$EDITOR`, `vi`
    pub fn editor_command(&self) -> String {
        self.editor
            .command
            .clone()
            .filter(|command| !command.trim().is_empty())
            .or_else(|| {
                ["GIT_EDITOR", "VISUAL", "EDITOR"]
                    .iter()
                    .filter_map(|var| std::env::var(var).ok())
                    .find(|value| !value.trim().is_empty())
            })
            .unwrap_or_else(|| "vi".to_string())
    }
}
