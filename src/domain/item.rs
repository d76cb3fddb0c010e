//! Registry item model
//!
//! Items are named, typed fragments of markdown. They are addressed by an
//! [`ItemKey`] written as `kind:name` (e.g. `rule:typescript`).
//!
//! Key format:
//! - Kind: `[a-z0-9_-]+` (e.g. `rule`, `workflow`, `code_style`)
//! - Name: one or more `[a-z0-9_-]+` segments joined by `/`
//!   (e.g. `typescript`, `auth/custom-auth`)
//!
//! The `/` in a name only groups files on disk; it carries no nesting
//! semantics.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("Invalid item reference: expected 'kind:name', got '{0}'")]
    MissingSeparator(String),

    #[error("Invalid kind '{0}': use lowercase letters, digits, '-' or '_'")]
    InvalidKind(String),

    #[error("Invalid name '{0}': use lowercase letters, digits, '-', '_' and '/' between segments")]
    InvalidName(String),
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_'
}

/// Returns true if `kind` is a valid item kind
pub fn is_valid_kind(kind: &str) -> bool {
    !kind.is_empty() && kind.chars().all(is_key_char)
}

/// Returns true if `name` is a valid item name
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .split('/')
            .all(|segment| !segment.is_empty() && segment.chars().all(is_key_char))
}

/// Identifies an item in the registry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemKey {
    kind: String,
    name: String,
}

impl ItemKey {
    /// Creates a key after validating both parts
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Result<Self, KeyError> {
        let kind = kind.into();
        let name = name.into();

        if !is_valid_kind(&kind) {
            return Err(KeyError::InvalidKind(kind));
        }
        if !is_valid_name(&name) {
            return Err(KeyError::InvalidName(name));
        }

        Ok(Self { kind, name })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Final `/`-separated segment of the name (the file stem on disk)
    pub fn leaf(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// The `:::include` line that references this key
    pub fn include_line(&self) -> String {
        format!(":::include {}:{}", self.kind, self.name)
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

impl FromStr for ItemKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (kind, name) = s
            .split_once(':')
            .ok_or_else(|| KeyError::MissingSeparator(s.to_string()))?;

        Self::new(kind.to_lowercase(), name)
    }
}

impl TryFrom<String> for ItemKey {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ItemKey> for String {
    fn from(key: ItemKey) -> Self {
        key.to_string()
    }
}

/// A registry item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Category, e.g. "rule" or "workflow"
    pub kind: String,

    /// Identifier within the kind; may contain `/`
    pub name: String,

    /// Optional one-line summary from frontmatter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Markdown body (excluding frontmatter)
    pub body: String,

    /// File the item was loaded from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
}

impl Item {
    /// Creates an item for the given key with an empty description
    pub fn new(key: &ItemKey, body: impl Into<String>) -> Self {
        Self {
            kind: key.kind().to_string(),
            name: key.name().to_string(),
            description: Some(String::new()),
            body: body.into(),
            source_path: None,
        }
    }

    /// Returns the key for this item
    pub fn key(&self) -> Result<ItemKey, KeyError> {
        ItemKey::new(self.kind.as_str(), self.name.as_str())
    }

    /// Sets the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Metadata header of an item file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFrontmatter {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&Item> for ItemFrontmatter {
    fn from(item: &Item) -> Self {
        Self {
            name: item.name.clone(),
            description: item.description.clone(),
        }
    }
}
