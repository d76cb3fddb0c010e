//! File-backed registry
//!
//! Items are stored as markdown files under `<root>/<kind>/<name>.md`.
//! A `/` in a name becomes a subdirectory, so `rule:auth/custom` lives at
//! `<root>/rule/auth/custom.md`.
//!
//! Each file may start with a YAML frontmatter block holding `name` and
//! `description`, followed by a blank line and the body.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::domain::{is_valid_kind, Item, ItemFrontmatter, ItemKey, KeyError, Registry, RegistryError};

const FRONTMATTER_DELIMITER: &str = "---";

/// Store for registry items as markdown files
#[derive(Debug, Clone)]
pub struct RegistryStore {
    root: PathBuf,
}

impl RegistryStore {
    /// Creates a store rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the registry root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path of an item file
    pub fn item_path(&self, key: &ItemKey) -> PathBuf {
        let mut path = self.root.join(key.kind());
        for segment in key.name().split('/') {
            path.push(segment);
        }
        path.set_extension("md");
        path
    }

    /// Reads the item file verbatim
    pub fn read_raw(&self, key: &ItemKey) -> Result<Option<String>, RegistryError> {
        let path = self.item_path(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(RegistryError::Io { path, source }),
        }
    }

    /// Lists kinds that have a directory in the registry
    pub fn kinds(&self) -> Result<Vec<String>, RegistryError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut kinds = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| walk_error(&self.root, e))?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if is_valid_kind(&name) {
                kinds.push(name.into_owned());
            }
        }

        Ok(kinds)
    }

    fn read_item(&self, key: &ItemKey, path: &Path) -> Result<Item, RegistryError> {
        let content = fs::read_to_string(path).map_err(io_error(path))?;

        let mut item = parse_item(key, &content).map_err(|message| RegistryError::Malformed {
            path: path.to_path_buf(),
            message,
        })?;
        item.source_path = Some(path.to_path_buf());
        Ok(item)
    }

    fn list_kind(&self, kind: &str, items: &mut Vec<Item>) -> Result<(), RegistryError> {
        let dir = self.root.join(kind);
        if !dir.is_dir() {
            return Ok(());
        }

        for entry in WalkDir::new(&dir).min_depth(1).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable registry entry");
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() || !path.extension().is_some_and(|e| e == "md") {
                continue;
            }

            let key = match key_from_path(kind, &dir, path) {
                Ok(key) => key,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping file with invalid item name");
                    continue;
                }
            };

            match self.read_item(&key, path) {
                Ok(item) => items.push(item),
                Err(e) => tracing::warn!(error = %e, "skipping unreadable item"),
            }
        }

        Ok(())
    }
}

impl Registry for RegistryStore {
    fn get(&self, key: &ItemKey) -> Result<Option<Item>, RegistryError> {
        let path = self.item_path(key);
        if !path.is_file() {
            return Ok(None);
        }

        self.read_item(key, &path).map(Some)
    }

    fn contains(&self, key: &ItemKey) -> Result<bool, RegistryError> {
        Ok(self.item_path(key).is_file())
    }

    fn create(&mut self, mut item: Item) -> Result<Item, RegistryError> {
        let key = item.key()?;
        let path = self.item_path(&key);
        if path.exists() {
            return Err(RegistryError::DuplicateItem(key));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }

        let content = render_item(&item).map_err(|message| RegistryError::Malformed {
            path: path.clone(),
            message,
        })?;

        // Write to temp file first, then rename into place
        let temp_path = path.with_extension("md.tmp");
        fs::write(&temp_path, content).map_err(io_error(&temp_path))?;
        fs::rename(&temp_path, &path).map_err(io_error(&path))?;

        tracing::debug!(key = %key, path = %path.display(), "created item");
        item.source_path = Some(path);
        Ok(item)
    }

    fn list(&self, kind: Option<&str>) -> Result<Vec<Item>, RegistryError> {
        let kinds = match kind {
            Some(kind) if !is_valid_kind(kind) => {
                return Err(KeyError::InvalidKind(kind.to_string()).into());
            }
            Some(kind) => vec![kind.to_string()],
            None => self.kinds()?,
        };

        let mut items = Vec::new();
        for kind in &kinds {
            self.list_kind(kind, &mut items)?;
        }

        items.sort_by(|a, b| (&a.kind, &a.name).cmp(&(&b.kind, &b.name)));
        Ok(items)
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> RegistryError {
    let path = path.to_path_buf();
    move |source| RegistryError::Io { path, source }
}

fn walk_error(root: &Path, error: walkdir::Error) -> RegistryError {
    let path = error.path().unwrap_or(root).to_path_buf();
    let source = error
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop"));
    RegistryError::Io { path, source }
}

/// Derives `kind:name` from a file path relative to the kind directory
fn key_from_path(kind: &str, kind_dir: &Path, path: &Path) -> Result<ItemKey, KeyError> {
    let relative = path.strip_prefix(kind_dir).unwrap_or(path).with_extension("");
    let name = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    ItemKey::new(kind, name)
}

/// Splits an item file into its frontmatter YAML (if any) and body
fn split_frontmatter(content: &str) -> Result<(Option<&str>, &str), String> {
    let mut lines = content.split_inclusive('\n');
    let first = lines.next().unwrap_or_default();
    if first.trim_end() != FRONTMATTER_DELIMITER {
        return Ok((None, content));
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end() == FRONTMATTER_DELIMITER {
            let yaml = &content[yaml_start..offset];
            let body = &content[offset + line.len()..];
            return Ok((Some(yaml), body));
        }
        offset += line.len();
    }

    Err("Missing frontmatter end delimiter (---)".to_string())
}

/// Parses item file content; the key comes from the file location
pub fn parse_item(key: &ItemKey, content: &str) -> Result<Item, String> {
    let (yaml, body) = split_frontmatter(content)?;

    let mut item = Item::new(key, body.trim_start_matches(['\r', '\n']).trim_end());
    item.description = None;

    if let Some(yaml) = yaml.filter(|y| !y.trim().is_empty()) {
        let fm: ItemFrontmatter =
            serde_yaml::from_str(yaml).map_err(|e| format!("Failed to parse frontmatter: {}", e))?;

        if !fm.name.is_empty() && fm.name != key.name() {
            tracing::warn!(key = %key, frontmatter_name = %fm.name, "frontmatter name differs from file path, using path");
        }
        item.description = fm.description;
    }

    Ok(item)
}

/// Renders an item to file content
pub fn render_item(item: &Item) -> Result<String, String> {
    let frontmatter = ItemFrontmatter::from(item);
    let yaml = serde_yaml::to_string(&frontmatter)
        .map_err(|e| format!("Failed to serialize frontmatter: {}", e))?;

    let mut content = String::new();
    content.push_str(FRONTMATTER_DELIMITER);
    content.push('\n');
    content.push_str(&yaml);
    content.push_str(FRONTMATTER_DELIMITER);
    content.push_str("\n\n");
    content.push_str(&item.body);

    if !content.ends_with('\n') {
        content.push('\n');
    }

    Ok(content)
}
