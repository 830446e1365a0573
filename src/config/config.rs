use crate::git::GitError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variables naming the repos root, in priority order
pub const REPOS_ROOT_ENV_VARS: [&str; 3] = ["MCP_REPOS_DIR", "REPOS_DIR", "REPOS_ROOT"];

/// Main configuration structure for git-committer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory whose children are the repositories that may be opened
    pub repos_root: Option<PathBuf>,
    /// How the git binary is invoked
    pub git: GitSettings,
    /// Default byte budgets for returned diffs
    pub limits: Limits,
    /// Branch resolution when open_repo gets no branch
    pub checkout: CheckoutSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GitSettings {
    /// Name or path of the git executable
    pub binary: String,
    /// Kill git after this many seconds; unset means wait indefinitely
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Limits {
    /// Default max_bytes for list_changes
    pub list_max_bytes: usize,
    /// Default max_bytes for get_file_diff
    pub file_max_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CheckoutSettings {
    /// Tried in order until one checks out
    pub default_branches: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            repos_root: None,
            git: GitSettings::default(),
            limits: Limits::default(),
            checkout: CheckoutSettings::default(),
        }
    }
}

impl Default for GitSettings {
    fn default() -> Self {
        GitSettings {
            binary: "git".to_string(),
            timeout_secs: None,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            list_max_bytes: 120_000,
            file_max_bytes: 60_000,
        }
    }
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            default_branches: vec!["main".to_string(), "master".to_string()],
        }
    }
}

impl GitSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Get the default configuration file path
    /// Returns ~/.config/git-committer/config.yaml on Unix-like systems
    /// Returns %APPDATA%\git-committer\config.yaml on Windows
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("git-committer");

        Ok(config_dir.join("config.yaml"))
    }

    /// Load configuration from a YAML file
    /// If the file doesn't exist, returns the default configuration
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration from the default path, then apply the environment
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        let mut config = Self::load_from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override the repos root with the first non-empty of [`REPOS_ROOT_ENV_VARS`]
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let root = REPOS_ROOT_ENV_VARS
            .iter()
            .filter_map(|key| lookup(key))
            .find(|value| !value.trim().is_empty());

        if let Some(root) = root {
            self.repos_root = Some(PathBuf::from(root));
        }
    }

    /// The configured repos root, or [`GitError::Configuration`] when unset
    pub fn repos_root(&self) -> std::result::Result<&Path, GitError> {
        self.repos_root.as_deref().ok_or_else(|| {
            GitError::Configuration(format!(
                "Set {} (or {}/{}) to your repos directory",
                REPOS_ROOT_ENV_VARS[0], REPOS_ROOT_ENV_VARS[1], REPOS_ROOT_ENV_VARS[2]
            ))
        })
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let yaml = serde_yaml::to_string(self)
            .context("Failed to serialize configuration")?;

        fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Create a new default configuration file at the default path
    /// Only creates the file if it doesn't already exist
    pub fn init_default() -> Result<PathBuf> {
        let path = Self::default_path()?;

        if path.exists() {
            return Ok(path);
        }

        let config = Config::default();
        config.save_to_file(&path)?;

        Ok(path)
    }
}
