//! Promotion of inline `:::new` blocks
//!
//! Promoting a block stores its body in the registry and rewrites the
//! document so the block becomes a single `:::include kind:name` line.
//!
//! Blocks are located by structural position (the Nth `:::new` block for a
//! key) in the *current* text before every edit. Offsets are never carried
//! across rewrites, so identical blocks cannot be confused with each other.

use thiserror::Error;

use super::directive::{parse, Directive, DirectiveBlock, Document, ParseError, Segment};
use super::item::{Item, ItemKey};
use super::registry::{Registry, RegistryError};

#[derive(Debug, Error)]
pub enum PromoteError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Could not find ':::new {key}' block (occurrence {})", .occurrence + 1)]
    NotFound { key: ItemKey, occurrence: usize },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl PromoteError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, PromoteError::Registry(e) if e.is_duplicate())
    }
}

/// Result of promoting a single block
#[derive(Debug, Clone)]
pub struct Promotion {
    /// Rewritten document text
    pub text: String,

    /// Item stored in the registry
    pub item: Item,
}

/// A block `promote_all` left in place
#[derive(Debug)]
pub struct SkippedBlock {
    pub key: ItemKey,
    pub line: usize,
    pub error: RegistryError,
}

/// Outcome of `promote_all`
#[derive(Debug)]
pub struct PromoteReport {
    pub text: String,
    pub created: Vec<Item>,
    pub skipped: Vec<SkippedBlock>,
}

impl PromoteReport {
    /// Returns true if the document text changed
    pub fn changed(&self) -> bool {
        !self.created.is_empty()
    }
}

/// Promotes the first `:::new kind:name` block
pub fn promote_one<R>(text: &str, key: &ItemKey, registry: &mut R) -> Result<Promotion, PromoteError>
where
    R: Registry + ?Sized,
{
    promote_nth(text, key, 0, registry)
}

/// Promotes the `occurrence`-th (0-based) `:::new kind:name` block
pub fn promote_nth<R>(
    text: &str,
    key: &ItemKey,
    occurrence: usize,
    registry: &mut R,
) -> Result<Promotion, PromoteError>
where
    R: Registry + ?Sized,
{
    let doc = parse(text)?;

    let target = new_item_blocks(&doc)
        .filter(|target| target.key == key)
        .nth(occurrence)
        .ok_or_else(|| PromoteError::NotFound {
            key: key.clone(),
            occurrence,
        })?;

    promote_at(&doc, &target, registry)
}

/// Promotes every `:::new` block in document order.
///
/// Each step re-parses the text produced by the previous step. A block that
/// cannot be stored (e.g. the key already exists) is left in place and
/// reported; the remaining blocks are still promoted.
pub fn promote_all<R>(text: &str, registry: &mut R) -> Result<PromoteReport, PromoteError>
where
    R: Registry + ?Sized,
{
    let mut text = text.to_string();
    let mut created = Vec::new();
    let mut skipped = Vec::new();

    loop {
        let doc = parse(&text)?;

        // Skipped blocks stay in the text ahead of the remaining candidates
        let Some(target) = new_item_blocks(&doc).nth(skipped.len()) else {
            break;
        };
        let key = target.key.clone();
        let line = target.directive.lines.start;

        match promote_at(&doc, &target, registry) {
            Ok(promotion) => {
                tracing::debug!(key = %key, line, "promoted block");
                text = promotion.text;
                created.push(promotion.item);
            }
            Err(PromoteError::Registry(error)) => {
                tracing::warn!(key = %key, line, error = %error, "leaving block in place");
                skipped.push(SkippedBlock { key, line, error });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(PromoteReport {
        text,
        created,
        skipped,
    })
}

/// A `:::new` block located in a parsed document
struct Target<'a> {
    index: usize,
    key: &'a ItemKey,
    raw_body: &'a str,
    directive: &'a Directive,
}

fn new_item_blocks(doc: &Document) -> impl Iterator<Item = Target<'_>> {
    doc.segments()
        .iter()
        .enumerate()
        .filter_map(|(index, segment)| match segment {
            Segment::Directive(directive) => match &directive.block {
                DirectiveBlock::NewItem { key, raw_body } => Some(Target {
                    index,
                    key,
                    raw_body,
                    directive,
                }),
                _ => None,
            },
            Segment::Literal(_) => None,
        })
}

fn promote_at<R>(doc: &Document, target: &Target<'_>, registry: &mut R) -> Result<Promotion, PromoteError>
where
    R: Registry + ?Sized,
{
    let item = registry.create(Item::new(target.key, trim_blank_lines(target.raw_body)))?;

    let mut text = String::new();
    for (i, segment) in doc.segments().iter().enumerate() {
        if i == target.index {
            text.push_str(&target.key.include_line());
            text.push_str(target.directive.line_ending());
        } else {
            text.push_str(segment.source());
        }
    }

    Ok(Promotion { text, item })
}

/// Drops leading and trailing blank lines
fn trim_blank_lines(body: &str) -> String {
    let lines: Vec<&str> = body.lines().collect();
    let Some(start) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return String::new();
    };
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .unwrap_or(start);

    lines[start..=end].join("\n")
}
