//! Promote command

use anyhow::{Context, Result};

use super::output::Output;
use crate::domain::{self, ItemKey, Registry};
use crate::storage::Project;

/// Promotes the first `:::new` block for `key`
pub fn promote_one<R: Registry>(project: &Project, registry: &mut R, output: &Output, key: &str) -> Result<()> {
    let key: ItemKey = key.parse()?;
    let source = project.read_source()?;

    let promotion = domain::promote_one(&source, &key, registry)
        .with_context(|| format!("Failed to promote {}", key))?;
    project.write_source(&promotion.text)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "created": [promotion.item],
            "skipped": [],
        }));
    } else {
        output.success(&format!("Promoted {} to the registry", key));
    }

    Ok(())
}

/// Promotes every `:::new` block, skipping the ones the registry rejects
pub fn promote_all<R: Registry>(project: &Project, registry: &mut R, output: &Output) -> Result<()> {
    let source = project.read_source()?;

    let report = domain::promote_all(&source, registry)?;
    if report.changed() {
        project.write_source(&report.text)?;
    }

    if output.is_json() {
        let skipped: Vec<_> = report
            .skipped
            .iter()
            .map(|s| {
                serde_json::json!({
                    "key": s.key,
                    "line": s.line,
                    "error": s.error.to_string(),
                })
            })
            .collect();
        output.data(&serde_json::json!({
            "created": report.created,
            "skipped": skipped,
        }));
        return Ok(());
    }

    for skipped in &report.skipped {
        output.warning(&format!(
            "Skipped {} (line {}): {}",
            skipped.key, skipped.line, skipped.error
        ));
    }

    if report.created.is_empty() && report.skipped.is_empty() {
        output.success("No ':::new' blocks to promote");
    } else {
        for item in &report.created {
            output.verbose_ctx("promote", &format!("created {}:{}", item.kind, item.name));
        }
        output.success(&format!(
            "Promoted {} item(s), skipped {}",
            report.created.len(),
            report.skipped.len()
        ));
    }

    Ok(())
}
