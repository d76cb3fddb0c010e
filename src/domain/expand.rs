//! Directive expansion
//!
//! Replaces `:::include` and `:::list` blocks with registry content. Each
//! resolved item renders as a `### name` heading followed by its body.
//! Literal text and `:::new` blocks pass through untouched.
//!
//! References missing from the registry are skipped silently; run
//! [`unresolved`] to enumerate them.

use std::fmt;

use serde::Serialize;

use super::directive::{line_content, Directive, DirectiveBlock, Document, Segment, CLOSER};
use super::item::{ItemKey, KeyError};
use super::registry::{Registry, RegistryError};

/// Renders a document against a registry
pub fn expand<R>(doc: &Document, registry: &R) -> Result<String, RegistryError>
where
    R: Registry + ?Sized,
{
    let mut out = String::new();

    for segment in doc.segments() {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Directive(directive) => match &directive.block {
                DirectiveBlock::Include(key) => {
                    out.push_str(&render_keys(registry, directive, [Ok(key.clone())])?);
                }
                DirectiveBlock::List { kind, members } => {
                    let keys = members
                        .iter()
                        .map(|name| ItemKey::new(kind.as_str(), name.as_str()));
                    out.push_str(&render_keys(registry, directive, keys)?);
                }
                DirectiveBlock::NewItem { .. } => out.push_str(&directive.raw),
            },
        }
    }

    Ok(out)
}

fn render_keys<R>(
    registry: &R,
    directive: &Directive,
    keys: impl IntoIterator<Item = Result<ItemKey, KeyError>>,
) -> Result<String, RegistryError>
where
    R: Registry + ?Sized,
{
    // Rendered chunks follow the directive's own line endings
    let eol = match directive.line_ending() {
        "" => "\n",
        eol => eol,
    };
    let mut chunks = Vec::new();

    for key in keys {
        let key = match key {
            Ok(key) => key,
            Err(e) => {
                tracing::debug!(line = directive.lines.start, error = %e, "skipping invalid reference");
                continue;
            }
        };

        match registry.get(&key)? {
            Some(item) => chunks.push(render_item(key.name(), &item.body, eol)),
            None => {
                tracing::debug!(key = %key, line = directive.lines.start, "reference not in registry, skipping");
            }
        }
    }

    Ok(chunks.join(eol))
}

fn render_item(name: &str, body: &str, eol: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        format!("### {name}{eol}")
    } else {
        let body = body.lines().collect::<Vec<_>>().join(eol);
        format!("### {name}{eol}{eol}{body}{eol}")
    }
}

/// A reference to a registry item found in a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub kind: String,
    pub name: String,
    pub line: usize,
}

impl Reference {
    pub fn key(&self) -> Result<ItemKey, KeyError> {
        ItemKey::new(self.kind.as_str(), self.name.as_str())
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} (line {})", self.kind, self.name, self.line)
    }
}

/// Enumerates every include and list reference in document order
pub fn references(doc: &Document) -> Vec<Reference> {
    let mut refs = Vec::new();

    for directive in doc.directives() {
        match &directive.block {
            DirectiveBlock::Include(key) => refs.push(Reference {
                kind: key.kind().to_string(),
                name: key.name().to_string(),
                line: directive.lines.start,
            }),
            DirectiveBlock::List { kind, .. } => {
                // Member lines are re-read from source to recover their line numbers
                for (offset, line) in directive.raw.split_inclusive('\n').enumerate().skip(1) {
                    let content = line_content(line);
                    let name = content.trim();
                    if name.is_empty() || content.trim_end() == CLOSER {
                        continue;
                    }
                    refs.push(Reference {
                        kind: kind.clone(),
                        name: name.to_string(),
                        line: directive.lines.start + offset,
                    });
                }
            }
            DirectiveBlock::NewItem { .. } => {}
        }
    }

    refs
}

/// Why a reference did not resolve
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum MissReason {
    NotInRegistry,
    InvalidName(String),
}

/// A reference that expansion would skip
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupMiss {
    pub reference: Reference,
    #[serde(flatten)]
    pub reason: MissReason,
}

impl fmt::Display for LookupMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            MissReason::NotInRegistry => write!(f, "{} not found in registry", self.reference),
            MissReason::InvalidName(e) => write!(f, "{}: {}", self.reference, e),
        }
    }
}

/// Lists the references that do not resolve against the registry
pub fn unresolved<R>(doc: &Document, registry: &R) -> Result<Vec<LookupMiss>, RegistryError>
where
    R: Registry + ?Sized,
{
    let mut misses = Vec::new();

    for reference in references(doc) {
        let reason = match reference.key() {
            Ok(key) if registry.contains(&key)? => continue,
            Ok(_) => MissReason::NotInRegistry,
            Err(e) => MissReason::InvalidName(e.to_string()),
        };
        misses.push(LookupMiss { reference, reason });
    }

    Ok(misses)
}
