//! Registry item commands

use anyhow::{bail, Result};

use super::output::Output;
use crate::domain::{Item, ItemKey, Registry};
use crate::storage::RegistryStore;

pub fn show(registry: &RegistryStore, output: &Output, key: &str, raw: bool) -> Result<()> {
    let key: ItemKey = key.parse()?;

    if raw {
        match registry.read_raw(&key)? {
            Some(content) => print!("{}", content),
            None => bail!("{} not found in registry", key),
        }
        return Ok(());
    }

    let Some(item) = registry.get(&key)? else {
        bail!("{} not found in registry", key);
    };

    if output.is_json() {
        output.data(&item);
        return Ok(());
    }

    println!("{}", key);
    if let Some(description) = item.description.as_deref().filter(|d| !d.is_empty()) {
        println!("{}", description);
    }
    if let Some(path) = &item.source_path {
        output.verbose_ctx("show", &format!("file: {}", path.display()));
    }
    println!();
    println!("{}", item.body);

    Ok(())
}

pub fn list<R: Registry>(registry: &R, output: &Output, kind: Option<&str>) -> Result<()> {
    let items = registry.list(kind)?;

    if output.is_json() {
        let items: Vec<_> = items
            .iter()
            .map(|item| {
                serde_json::json!({
                    "kind": item.kind,
                    "name": item.name,
                    "description": item.description,
                })
            })
            .collect();
        output.data(&items);
    } else if items.is_empty() {
        println!("No items found.");
    } else {
        let width = items
            .iter()
            .map(|item| item.kind.len() + item.name.len() + 1)
            .max()
            .unwrap_or(0)
            .max(3);
        println!("{:<width$}  DESCRIPTION", "KEY", width = width);
        println!("{}", "-".repeat(width + 13));
        for item in &items {
            let key = format!("{}:{}", item.kind, item.name);
            println!(
                "{:<width$}  {}",
                key,
                item.description.as_deref().unwrap_or_default(),
                width = width
            );
        }
    }

    Ok(())
}

pub fn new_item<R: Registry>(
    registry: &mut R,
    output: &Output,
    key: &str,
    content: Option<&str>,
    description: Option<&str>,
) -> Result<()> {
    let key: ItemKey = key.parse()?;

    let mut item = Item::new(&key, content.unwrap_or_default().trim());
    if let Some(description) = description {
        item = item.with_description(description);
    }

    let item = registry.create(item)?;

    if output.is_json() {
        output.data(&item);
    } else {
        match &item.source_path {
            Some(path) => output.success(&format!("Created {} at {}", key, path.display())),
            None => output.success(&format!("Created {}", key)),
        }
    }

    Ok(())
}
