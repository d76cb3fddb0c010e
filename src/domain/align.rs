//! Alignment of rendered documents with their directive source
//!
//! A rendered document has lost its directive markup. The directive document
//! still says which `##` sections hold which items, so the two together are
//! enough to cut the rendered text back into `kind:name -> body` pairs.
//!
//! Only `##` headings whose text matches a template section are section
//! boundaries. Any other heading, at any level, is content of the item being
//! captured; items routinely carry their own `## Purpose` style headings.
//!
//! Section titles may repeat. The Nth rendered `## Title` is the Nth template
//! section with that title; occurrences past the last one are content.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::directive::{line_content, parse, DirectiveBlock, Document, FenceTracker, ParseError, Segment};
use super::item::{Item, ItemKey};

static ITEM_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9/_-]*$").unwrap());

/// A `##` section of a directive document and the items declared under it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSection {
    pub header_text: String,

    /// Kind of the last include or list in the section
    pub item_kind: Option<String>,

    /// Declared item names in document order
    pub item_names: Vec<String>,

    declared: HashMap<String, String>,
}

impl TemplateSection {
    fn new(header_text: &str) -> Self {
        Self {
            header_text: header_text.to_string(),
            item_kind: None,
            item_names: Vec::new(),
            declared: HashMap::new(),
        }
    }

    fn declare(&mut self, kind: &str, name: &str) {
        self.item_kind = Some(kind.to_string());
        if !self.declared.contains_key(name) {
            self.item_names.push(name.to_string());
        }
        self.declared.insert(name.to_string(), kind.to_string());
    }

    /// Kind for a captured heading: the declared kind, else the section kind
    pub fn kind_of(&self, name: &str) -> Option<&str> {
        self.declared
            .get(name)
            .map(String::as_str)
            .or(self.item_kind.as_deref())
    }
}

/// Non-fatal alignment problems
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlignmentMismatch {
    /// A declared item has no `###` heading in its rendered section
    MissingItem {
        section: String,
        kind: String,
        name: String,
    },

    /// A section that declares items never appears in the rendered text
    MissingSection { header: String },
}

impl fmt::Display for AlignmentMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignmentMismatch::MissingItem { section, kind, name } => {
                write!(f, "{}:{} not found under '## {}'", kind, name, section)
            }
            AlignmentMismatch::MissingSection { header } => {
                write!(f, "section '## {}' not found in rendered document", header)
            }
        }
    }
}

/// Items recovered from a rendered document, grouped by kind
#[derive(Debug, Clone, Default)]
pub struct Alignment {
    pub items: BTreeMap<String, Vec<Item>>,
    pub warnings: Vec<AlignmentMismatch>,
}

impl Alignment {
    /// Iterates over all recovered items, kinds in order
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.items.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Splits heading lines into `(level, text)`
fn heading(content: &str) -> Option<(usize, &str)> {
    let level = content.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }

    let rest = &content[level..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }

    Some((level, rest.trim()))
}

/// Collects the `##` sections of a parsed directive document
pub fn template_sections(doc: &Document) -> Vec<TemplateSection> {
    let mut sections: Vec<TemplateSection> = Vec::new();

    for segment in doc.segments() {
        match segment {
            Segment::Literal(text) => {
                let mut fence = FenceTracker::default();
                for line in text.lines() {
                    let in_code = fence.in_fence();
                    if fence.update(line) || in_code {
                        continue;
                    }
                    if let Some((2, header)) = heading(line) {
                        sections.push(TemplateSection::new(header));
                    }
                }
            }
            Segment::Directive(directive) => {
                let Some(section) = sections.last_mut() else {
                    tracing::debug!(line = directive.lines.start, "directive before first section, ignoring");
                    continue;
                };
                match &directive.block {
                    DirectiveBlock::Include(key) => section.declare(key.kind(), key.name()),
                    DirectiveBlock::List { kind, members } => {
                        for name in members {
                            section.declare(kind, name);
                        }
                    }
                    DirectiveBlock::NewItem { .. } => {}
                }
            }
        }
    }

    sections
}

/// Hands out template sections for rendered headings in document order
struct SectionCursor<'a> {
    pending: HashMap<&'a str, VecDeque<usize>>,
}

impl<'a> SectionCursor<'a> {
    fn new(sections: &'a [TemplateSection]) -> Self {
        let mut pending: HashMap<&str, VecDeque<usize>> = HashMap::new();
        for (index, section) in sections.iter().enumerate() {
            pending
                .entry(section.header_text.as_str())
                .or_default()
                .push_back(index);
        }
        Self { pending }
    }

    /// Next unvisited section titled `text`
    fn next(&mut self, text: &str) -> Option<usize> {
        self.pending.get_mut(text)?.pop_front()
    }
}

struct Capture<'a> {
    section: usize,
    kind: String,
    name: String,
    lines: Vec<&'a str>,
}

struct Scan<'a> {
    alignment: Alignment,
    found: BTreeSet<(usize, String)>,
    open: Option<Capture<'a>>,
}

impl Scan<'_> {
    fn close(&mut self) {
        let Some(capture) = self.open.take() else {
            return;
        };

        let key = match ItemKey::new(capture.kind.as_str(), capture.name.as_str()) {
            Ok(key) => key,
            Err(e) => {
                tracing::debug!(error = %e, "skipping heading that is not a valid item name");
                return;
            }
        };

        self.found.insert((capture.section, capture.name.clone()));

        let items = self.alignment.items.entry(capture.kind).or_default();
        if items.iter().any(|item| item.name == capture.name) {
            tracing::debug!(key = %key, "item captured twice, keeping first");
            return;
        }

        let body = capture.lines.join("\n").trim().to_string();
        items.push(Item::new(&key, body));
    }
}

/// Recovers items from `rendered_text` using `directive_text` as the map
pub fn align(directive_text: &str, rendered_text: &str) -> Result<Alignment, ParseError> {
    let sections = template_sections(&parse(directive_text)?);

    let mut cursor = SectionCursor::new(&sections);

    let mut scan = Scan {
        alignment: Alignment::default(),
        found: BTreeSet::new(),
        open: None,
    };
    let mut seen = BTreeSet::new();
    let mut active: Option<usize> = None;
    let mut fence = FenceTracker::default();

    for line in rendered_text.split_inclusive('\n') {
        let content = line_content(line);

        let in_code = fence.in_fence();
        let marker = fence.update(content);
        if !in_code && !marker {
            match heading(content) {
                Some((2, text)) => {
                    if let Some(index) = cursor.next(text) {
                        scan.close();
                        seen.insert(index);
                        active = Some(index);
                        continue;
                    }
                }
                Some((3, text)) if ITEM_HEADING_RE.is_match(text) => {
                    let kind = active.and_then(|index| sections[index].kind_of(text));
                    if let (Some(section), Some(kind)) = (active, kind) {
                        let kind = kind.to_string();
                        scan.close();
                        scan.open = Some(Capture {
                            section,
                            kind,
                            name: text.to_string(),
                            lines: Vec::new(),
                        });
                        continue;
                    }
                }
                _ => {}
            }
        }

        if let Some(capture) = scan.open.as_mut() {
            capture.lines.push(content);
        }
    }
    scan.close();

    let mut alignment = scan.alignment;
    for (index, section) in sections.iter().enumerate() {
        if section.item_names.is_empty() {
            continue;
        }
        if !seen.contains(&index) {
            alignment.warnings.push(AlignmentMismatch::MissingSection {
                header: section.header_text.clone(),
            });
            continue;
        }
        for name in &section.item_names {
            if !scan.found.contains(&(index, name.clone())) {
                alignment.warnings.push(AlignmentMismatch::MissingItem {
                    section: section.header_text.clone(),
                    kind: section.kind_of(name).unwrap_or_default().to_string(),
                    name: name.clone(),
                });
            }
        }
    }

    for warning in &alignment.warnings {
        tracing::warn!("{}", warning);
    }

    Ok(alignment)
}
