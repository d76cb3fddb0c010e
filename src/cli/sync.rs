//! Rendering and validation commands

use anyhow::{bail, Context, Result};
use serde::Serialize;

use super::output::Output;
use crate::domain::{expand, parse, unresolved, Document, LookupMiss, Registry};
use crate::storage::Project;

/// A `:::new` block that still needs promoting
#[derive(Debug, Serialize)]
struct PendingBlock {
    key: String,
    line: usize,
}

fn load_document(project: &Project) -> Result<Document> {
    let source = project.read_source()?;
    parse(&source).with_context(|| {
        format!(
            "Failed to parse {}",
            project.relative_path(&project.source_path()).display()
        )
    })
}

fn pending_blocks(doc: &Document) -> Vec<PendingBlock> {
    doc.pending_new_items()
        .into_iter()
        .map(|(key, lines)| PendingBlock {
            key: key.to_string(),
            line: lines.start,
        })
        .collect()
}

/// Expands the directive document into the output document
pub fn sync<R: Registry>(project: &Project, registry: &R, output: &Output, stdout: bool) -> Result<()> {
    let doc = load_document(project)?;

    let pending = pending_blocks(&doc);
    if let Some(first) = pending.first() {
        bail!(
            "{} unpromoted ':::new' block(s), first is {} at line {}. Run 'agmd promote --all' first.",
            pending.len(),
            first.key,
            first.line
        );
    }

    let rendered = expand(&doc, registry)?;
    let misses = unresolved(&doc, registry)?;
    output.verbose_ctx("sync", &format!("{} directives, {} unresolved", doc.directives().count(), misses.len()));

    if stdout {
        print!("{}", rendered);
        for miss in &misses {
            output.warning(&miss.to_string());
        }
        return Ok(());
    }

    project.write_output(&rendered)?;
    let output_path = project.relative_path(&project.output_path());

    if output.is_json() {
        output.data(&serde_json::json!({
            "output": output_path,
            "bytes": rendered.len(),
            "unresolved": misses,
        }));
    } else {
        for miss in &misses {
            output.warning(&miss.to_string());
        }
        output.success(&format!("Synced {}", output_path.display()));
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct ValidationReport {
    valid: bool,
    unresolved: Vec<LookupMiss>,
    pending: Vec<PendingBlock>,
}

/// Reports unresolved references and pending `:::new` blocks
pub fn validate<R: Registry>(project: &Project, registry: &R, output: &Output) -> Result<()> {
    let doc = load_document(project)?;

    let misses = unresolved(&doc, registry)?;
    let pending = pending_blocks(&doc);
    let report = ValidationReport {
        valid: misses.is_empty() && pending.is_empty(),
        unresolved: misses,
        pending,
    };

    if output.is_json() {
        output.data(&report);
    } else {
        for miss in &report.unresolved {
            println!("unresolved  {}", miss);
        }
        for block in &report.pending {
            println!("pending     :::new {} (line {})", block.key, block.line);
        }
    }

    if !report.valid {
        bail!(
            "Validation failed: {} unresolved reference(s), {} pending block(s)",
            report.unresolved.len(),
            report.pending.len()
        );
    }

    if !output.is_json() {
        output.success("All references resolve");
    }

    Ok(())
}
