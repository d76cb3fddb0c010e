//! Project management
//!
//! A project is a directory holding a directive document (the source) and
//! the document rendered from it (the output).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::config::PROJECT_CONFIG_FILE;
use super::Config;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Directive document already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("No directive document at {0}. Run 'agmd init' first.")]
    SourceNotFound(PathBuf),

    #[error("No rendered document at {0}. Run 'agmd sync' or pass --rendered.")]
    OutputNotFound(PathBuf),
}

/// Starting content for `agmd init`
const DIRECTIVES_TEMPLATE: &str = "\
# Project Guidelines

Instructions for AI coding agents working in this repository.

## Rules

<!-- One rule name per line; run 'agmd list rule' to see what is available -->
:::list rule
:::end

## Workflows

<!-- Reference a single item with :::include workflow:<name> -->
";

/// An agmd project
#[derive(Debug)]
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens the project at the given root
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project containing the current directory
    pub fn open_current() -> Result<Self> {
        let config = Config::load()?;
        Ok(Self {
            root: config.project_root.clone(),
            config,
        })
    }

    /// Creates a directive document from the starter template.
    ///
    /// `agmd.toml` is written with the defaults unless one already exists.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let project = Self::open(root)?;
        let source = project.source_path();

        if source.exists() {
            return Err(ProjectError::AlreadyExists(source).into());
        }

        write_atomic(&source, DIRECTIVES_TEMPLATE)?;
        if !project.root.join(PROJECT_CONFIG_FILE).exists() {
            project.config.save_project()?;
        }
        Ok(project)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Path of the directive document
    pub fn source_path(&self) -> PathBuf {
        self.root.join(&self.config.project.source)
    }

    /// Path of the rendered document
    pub fn output_path(&self) -> PathBuf {
        self.root.join(&self.config.project.output)
    }

    /// Reads the directive document
    pub fn read_source(&self) -> Result<String> {
        let path = self.source_path();
        if !path.is_file() {
            return Err(ProjectError::SourceNotFound(path).into());
        }

        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read directive document: {}", path.display()))
    }

    /// Replaces the directive document
    pub fn write_source(&self, content: &str) -> Result<()> {
        write_atomic(&self.source_path(), content)
    }

    /// Reads a rendered document; defaults to the configured output
    pub fn read_rendered(&self, path: Option<&Path>) -> Result<String> {
        let path = match path {
            Some(path) => self.root.join(path),
            None => self.output_path(),
        };
        if !path.is_file() {
            return Err(ProjectError::OutputNotFound(path).into());
        }

        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read rendered document: {}", path.display()))
    }

    /// Replaces the rendered document
    pub fn write_output(&self, content: &str) -> Result<()> {
        write_atomic(&self.output_path(), content)
    }

    /// Returns a path relative to the project root, for display
    pub fn relative_path(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Writes a file atomically (temp file + rename)
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, content)
        .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;

    fs::rename(&temp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;

    Ok(())
}
