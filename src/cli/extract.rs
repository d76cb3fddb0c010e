//! Extract command
//!
//! Recovers items from a rendered document that were never captured in
//! the registry, using the directive document as a map.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use super::output::Output;
use crate::domain::{align, AlignmentMismatch, Registry};
use crate::storage::Project;

#[derive(Debug, Serialize)]
struct FailedItem {
    key: String,
    error: String,
}

#[derive(Debug, Default, Serialize)]
struct ExtractReport {
    created: Vec<String>,
    existing: Vec<String>,
    failed: Vec<FailedItem>,
    warnings: Vec<AlignmentMismatch>,
    dry_run: bool,
}

pub fn run<R: Registry>(
    project: &Project,
    registry: &mut R,
    output: &Output,
    rendered: Option<&Path>,
    dry_run: bool,
) -> Result<()> {
    let source = project.read_source()?;
    let rendered = project.read_rendered(rendered)?;

    let alignment = align(&source, &rendered).with_context(|| {
        format!(
            "Failed to parse {}",
            project.relative_path(&project.source_path()).display()
        )
    })?;
    output.verbose_ctx("extract", &format!("{} items found in rendered document", alignment.len()));

    let mut report = ExtractReport {
        dry_run,
        ..ExtractReport::default()
    };

    // A failing item is reported and the rest of the batch still runs
    for item in alignment.iter() {
        let key = item.key()?;
        let outcome = registry.contains(&key).and_then(|exists| {
            if !exists && !dry_run {
                registry.create(item.clone())?;
            }
            Ok(exists)
        });

        match outcome {
            Ok(true) => report.existing.push(key.to_string()),
            Ok(false) => report.created.push(key.to_string()),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to extract item");
                report.failed.push(FailedItem {
                    key: key.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }
    report.warnings = alignment.warnings;

    if output.is_json() {
        output.data(&report);
        return check_failures(&report);
    }

    for warning in &report.warnings {
        output.warning(&warning.to_string());
    }
    for failed in &report.failed {
        output.warning(&format!("Failed to create {}: {}", failed.key, failed.error));
    }
    for key in &report.existing {
        output.verbose_ctx("extract", &format!("{} already in registry", key));
    }

    let verb = if dry_run { "Would create" } else { "Created" };
    for key in &report.created {
        println!("{} {}", verb, key);
    }
    output.success(&format!(
        "{} {} item(s), {} already in registry, {} failed",
        verb,
        report.created.len(),
        report.existing.len(),
        report.failed.len()
    ));

    check_failures(&report)
}

fn check_failures(report: &ExtractReport) -> Result<()> {
    if !report.failed.is_empty() {
        bail!("Failed to extract {} item(s)", report.failed.len());
    }
    Ok(())
}
