//! Configuration handling for agmd
//!
//! Configuration is stored in `agmd.toml` (project root) and
//! `~/.config/agmd/config.toml` (global, platform dependent).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Project configuration file name
pub const PROJECT_CONFIG_FILE: &str = "agmd.toml";

/// Registry directory used when nothing else is configured
pub const DEFAULT_REGISTRY_DIR: &str = ".agmd";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProjectConfig {
    /// Directive document, relative to the project root
    pub source: PathBuf,

    /// Rendered document, relative to the project root
    pub output: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("directives.md"),
            output: PathBuf::from("AGENTS.md"),
        }
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,

    /// Registry directory; `~/` is expanded
    pub registry: Option<PathBuf>,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
    pub project_root: PathBuf,
}

impl Config {
    /// Loads configuration for the project containing the current directory
    pub fn load() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to determine current directory")?;
        let root = Self::find_project_root(&cwd).unwrap_or(cwd);
        Self::for_project(&root)
    }

    /// Loads configuration for a specific project
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(project_root)?;

        Ok(Self {
            project,
            global,
            project_root: project_root.to_path_buf(),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "agmd", "agmd").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads project configuration from a specific root
    fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
        let config_path = project_root.join(PROJECT_CONFIG_FILE);

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")?;

        if config.source == config.output {
            return Err(ConfigError::Invalid(format!(
                "source and output are both '{}'",
                config.source.display()
            ))
            .into());
        }

        Ok(config)
    }

    /// Finds the project root by walking up from `start`.
    ///
    /// The root is the nearest directory holding `agmd.toml` or the default
    /// directive document.
    pub fn find_project_root(start: &Path) -> Option<PathBuf> {
        let source = ProjectConfig::default().source;
        let mut current = start.to_path_buf();

        loop {
            if current.join(PROJECT_CONFIG_FILE).is_file() || current.join(&source).is_file() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Resolves the registry directory.
    ///
    /// An explicit path (flag or `AGMD_REGISTRY`) wins, then the global
    /// config, then `~/.agmd`.
    pub fn registry_path(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }

        if let Some(path) = &self.global.registry {
            return expand_home(path);
        }

        Ok(home_dir()?.join(DEFAULT_REGISTRY_DIR))
    }

    /// Saves the project configuration
    pub fn save_project(&self) -> Result<()> {
        let config_path = self.project_root.join(PROJECT_CONFIG_FILE);

        let content =
            toml::to_string_pretty(&self.project).context("Failed to serialize project config")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write project config: {}", config_path.display()))
    }
}

fn home_dir() -> Result<PathBuf> {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or_else(|| ConfigError::Invalid("Could not determine home directory".to_string()).into())
}

fn expand_home(path: &Path) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => Ok(home_dir()?.join(rest)),
        Err(_) => Ok(path.to_path_buf()),
    }
}
