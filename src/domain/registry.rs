//! Registry abstraction
//!
//! Every engine operation receives its registry explicitly. The file-backed
//! store lives in [`crate::storage::RegistryStore`]; [`MemoryRegistry`]
//! keeps items in memory for tests and dry runs.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use super::item::{Item, ItemKey, KeyError};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{0} already exists in registry")]
    DuplicateItem(ItemKey),

    #[error(transparent)]
    InvalidKey(#[from] KeyError),

    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid item file {}: {message}", .path.display())]
    Malformed { path: PathBuf, message: String },
}

impl RegistryError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, RegistryError::DuplicateItem(_))
    }
}

/// Keyed storage for items
pub trait Registry {
    /// Looks up an item; `Ok(None)` when absent
    fn get(&self, key: &ItemKey) -> Result<Option<Item>, RegistryError>;

    /// Stores a new item; fails with [`RegistryError::DuplicateItem`] if the key exists
    fn create(&mut self, item: Item) -> Result<Item, RegistryError>;

    /// Lists items, optionally restricted to one kind, sorted by key
    fn list(&self, kind: Option<&str>) -> Result<Vec<Item>, RegistryError>;

    /// Returns true if the key exists
    fn contains(&self, key: &ItemKey) -> Result<bool, RegistryError> {
        Ok(self.get(key)?.is_some())
    }
}

/// In-memory registry
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    items: BTreeMap<ItemKey, Item>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from `(key, body)` pairs
    pub fn with_items<'a>(items: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for (key, body) in items {
            let key: ItemKey = key.parse()?;
            registry.create(Item::new(&key, body))?;
        }
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Registry for MemoryRegistry {
    fn get(&self, key: &ItemKey) -> Result<Option<Item>, RegistryError> {
        Ok(self.items.get(key).cloned())
    }

    fn create(&mut self, item: Item) -> Result<Item, RegistryError> {
        let key = item.key()?;
        if self.items.contains_key(&key) {
            return Err(RegistryError::DuplicateItem(key));
        }

        self.items.insert(key, item.clone());
        Ok(item)
    }

    fn list(&self, kind: Option<&str>) -> Result<Vec<Item>, RegistryError> {
        Ok(self
            .items
            .iter()
            .filter(|(key, _)| kind.map_or(true, |k| key.kind() == k))
            .map(|(_, item)| item.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_get() {
        let mut registry = MemoryRegistry::new();
        let key: ItemKey = "rule:x".parse().unwrap();

        registry.create(Item::new(&key, "BODY")).unwrap();

        let item = registry.get(&key).unwrap().unwrap();
        assert_eq!(item.body, "BODY");
        assert!(registry.contains(&key).unwrap());
    }

    #[test]
    fn create_rejects_duplicates() {
        let mut registry = MemoryRegistry::with_items([("rule:x", "one")]).unwrap();
        let key: ItemKey = "rule:x".parse().unwrap();

        let err = registry.create(Item::new(&key, "two")).unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(registry.get(&key).unwrap().unwrap().body, "one");
    }

    #[test]
    fn list_filters_by_kind() {
        let registry =
            MemoryRegistry::with_items([("rule:b", ""), ("rule:a", ""), ("workflow:deploy", "")])
                .unwrap();

        let rules: Vec<_> = registry
            .list(Some("rule"))
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(rules, vec!["a", "b"]);
        assert_eq!(registry.list(None).unwrap().len(), 3);
    }

    #[test]
    fn missing_key_is_none() {
        let registry = MemoryRegistry::new();
        let key: ItemKey = "rule:missing".parse().unwrap();
        assert!(registry.get(&key).unwrap().is_none());
    }
}
