//! # Storage Layer
//!
//! Persistence for agmd in plain, hand-editable files.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Items | Markdown + YAML frontmatter | `<registry>/<kind>/<name>.md` |
//! | Directive document | Markdown + directives | `directives.md` |
//! | Rendered document | Markdown | `AGENTS.md` |
//! | Config | TOML | `agmd.toml`, `~/.config/agmd/config.toml` |
//!
//! All writes are atomic (temp file + rename). There is no locking; the
//! last writer wins.
//!
//! ## Registry Layout
//!
//! ```text
//! ~/.agmd/
//! ├── rule/
//! │   ├── typescript.md
//! │   └── auth/
//! │       └── custom-auth.md    # rule:auth/custom-auth
//! └── workflow/
//!     └── deploy.md
//! ```
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for a project's source and output documents
//! - [`RegistryStore`] - File-backed [`crate::domain::Registry`]
//! - [`Config`] - Project and global configuration

mod config;
mod project;
mod registry;

pub use config::{Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig};
pub use project::{Project, ProjectError};
pub use registry::{parse_item, render_item, RegistryStore};
