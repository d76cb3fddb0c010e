//! Directive document parser
//!
//! Splits a directive document into literal spans and directive blocks.
//!
//! ## Grammar
//!
//! All directives are line-anchored and case-sensitive:
//!
//! ```text
//! :::include <kind>:<name>      single line, no closer
//!
//! :::list <kind>                one member name per non-blank line
//! <name>
//! :::end
//!
//! :::new <kind>:<name>          body captured verbatim
//! <arbitrary body>
//! :::end
//! ```
//!
//! Blocks close on `:::end` only. A bare `:::` is body text; if a block is
//! left open the error points at the first bare `:::` seen inside it.
//! Inside a list, `:::` lines that are not openers are skipped rather than
//! read as member names.
//!
//! Directive-looking lines inside fenced code blocks (```` ``` ```` or `~~~`)
//! are literal text.
//!
//! The segments of a parsed [`Document`] concatenate back to the input
//! byte-for-byte, so callers can rewrite one block without disturbing
//! anything else.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use super::item::ItemKey;

/// Closing token for `:::list` and `:::new` blocks
pub const CLOSER: &str = ":::end";

/// Closer used by older documents; recognised only to improve error messages
const BARE_CLOSER: &str = ":::";

static INCLUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^:::include\s+([a-z0-9_-]+):([a-z0-9_-]+(?:/[a-z0-9_-]+)*)\s*$").unwrap()
});

static LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:::list\s+([a-z0-9_-]+)\s*$").unwrap());

static NEW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^:::new\s+([a-z0-9_-]+):([a-z0-9_-]+(?:/[a-z0-9_-]+)*)\s*$").unwrap()
});

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unterminated block '{opener}' at line {line}: expected ':::end'{}", bare_closer_hint(.bare_closer))]
    UnterminatedBlock {
        line: usize,
        opener: String,
        bare_closer: Option<usize>,
    },

    #[error("Directive at line {line} is inside the block opened at line {outer_line}; blocks cannot be nested")]
    NestedBlock { line: usize, outer_line: usize },
}

fn bare_closer_hint(bare_closer: &Option<usize>) -> String {
    match bare_closer {
        Some(line) => format!(" (line {} has a bare '{}'; blocks close with '{}')", line, BARE_CLOSER, CLOSER),
        None => String::new(),
    }
}

/// A parsed directive block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveBlock {
    /// `:::include kind:name`
    Include(ItemKey),

    /// `:::list kind` with one member name per line
    List { kind: String, members: Vec<String> },

    /// `:::new kind:name` with its body captured verbatim
    NewItem { key: ItemKey, raw_body: String },
}

/// Inclusive, 1-based line range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

/// A directive block together with its source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub block: DirectiveBlock,
    pub lines: LineSpan,

    /// Source text from the opener through the closer, line endings included
    pub raw: String,
}

impl Directive {
    /// Line ending of the last source line ("\n", "\r\n" or "" at end of input)
    pub fn line_ending(&self) -> &'static str {
        if self.raw.ends_with("\r\n") {
            "\r\n"
        } else if self.raw.ends_with('\n') {
            "\n"
        } else {
            ""
        }
    }
}

/// One piece of a parsed document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Directive(Directive),
}

impl Segment {
    /// Source text of this segment
    pub fn source(&self) -> &str {
        match self {
            Segment::Literal(text) => text,
            Segment::Directive(directive) => &directive.raw,
        }
    }
}

/// A directive document split into segments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    segments: Vec<Segment>,
}

impl Document {
    /// Parses document text
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        parse(text)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Iterates over directive blocks in document order
    pub fn directives(&self) -> impl Iterator<Item = &Directive> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Directive(directive) => Some(directive),
            Segment::Literal(_) => None,
        })
    }

    /// `:::new` blocks that have not been promoted yet
    pub fn pending_new_items(&self) -> Vec<(&ItemKey, LineSpan)> {
        self.directives()
            .filter_map(|directive| match &directive.block {
                DirectiveBlock::NewItem { key, .. } => Some((key, directive.lines)),
                _ => None,
            })
            .collect()
    }

    /// Reassembles the original text
    pub fn to_text(&self) -> String {
        self.segments.iter().map(Segment::source).collect()
    }
}

/// Parses document text into segments
pub fn parse(text: &str) -> Result<Document, ParseError> {
    let mut parser = Parser::default();

    for (index, line) in text.split_inclusive('\n').enumerate() {
        parser.feed(index + 1, line)?;
    }

    parser.finish()
}

/// Strips the line terminator
pub(crate) fn line_content(line: &str) -> &str {
    line.trim_end_matches(&['\n', '\r'][..])
}

fn is_closer(content: &str) -> bool {
    content.trim_end() == CLOSER
}

/// Directive openers recognised on a single line
enum Opener {
    Include(ItemKey),
    List(String),
    New(ItemKey),
}

impl Opener {
    fn detect(content: &str) -> Option<Self> {
        if !content.starts_with(":::") {
            return None;
        }

        if let Some(caps) = INCLUDE_RE.captures(content) {
            return ItemKey::new(&caps[1], &caps[2]).ok().map(Opener::Include);
        }
        if let Some(caps) = LIST_RE.captures(content) {
            return Some(Opener::List(caps[1].to_string()));
        }
        if let Some(caps) = NEW_RE.captures(content) {
            return ItemKey::new(&caps[1], &caps[2]).ok().map(Opener::New);
        }

        None
    }
}

enum OpenBody {
    List { kind: String, members: Vec<String> },
    NewItem { key: ItemKey, body: String },
}

/// A `:::list` or `:::new` block still waiting for its closer
struct OpenBlock {
    start_line: usize,
    raw: String,
    bare_closer: Option<usize>,
    body: OpenBody,
}

impl OpenBlock {
    fn new(start_line: usize, line: &str, body: OpenBody) -> Self {
        Self {
            start_line,
            raw: line.to_string(),
            bare_closer: None,
            body,
        }
    }

    fn opener(&self) -> String {
        self.raw.lines().next().unwrap_or_default().trim().to_string()
    }

    fn close(self, end_line: usize) -> Directive {
        let block = match self.body {
            OpenBody::List { kind, members } => DirectiveBlock::List { kind, members },
            OpenBody::NewItem { key, body } => DirectiveBlock::NewItem {
                key,
                raw_body: body,
            },
        };

        Directive {
            block,
            lines: LineSpan {
                start: self.start_line,
                end: end_line,
            },
            raw: self.raw,
        }
    }
}

#[derive(Default)]
struct Parser {
    segments: Vec<Segment>,
    literal: String,
    fence: FenceTracker,
    open: Option<OpenBlock>,
}

impl Parser {
    fn feed(&mut self, line_no: usize, line: &str) -> Result<(), ParseError> {
        match self.open.take() {
            Some(block) => self.continue_block(block, line_no, line),
            None => {
                self.scan_literal(line_no, line);
                Ok(())
            }
        }
    }

    fn scan_literal(&mut self, line_no: usize, line: &str) {
        let content = line_content(line);

        if !self.fence.in_fence() {
            if let Some(opener) = Opener::detect(content) {
                self.flush_literal();
                match opener {
                    Opener::Include(key) => {
                        self.segments.push(Segment::Directive(Directive {
                            block: DirectiveBlock::Include(key),
                            lines: LineSpan {
                                start: line_no,
                                end: line_no,
                            },
                            raw: line.to_string(),
                        }));
                    }
                    Opener::List(kind) => {
                        let body = OpenBody::List {
                            kind,
                            members: Vec::new(),
                        };
                        self.open = Some(OpenBlock::new(line_no, line, body));
                    }
                    Opener::New(key) => {
                        let body = OpenBody::NewItem {
                            key,
                            body: String::new(),
                        };
                        self.open = Some(OpenBlock::new(line_no, line, body));
                    }
                }
                return;
            }
        }

        self.fence.update(content);
        self.literal.push_str(line);
    }

    fn continue_block(
        &mut self,
        mut block: OpenBlock,
        line_no: usize,
        line: &str,
    ) -> Result<(), ParseError> {
        let content = line_content(line);
        block.raw.push_str(line);

        if is_closer(content) {
            self.segments.push(Segment::Directive(block.close(line_no)));
            return Ok(());
        }

        if block.bare_closer.is_none() && content.trim_end() == BARE_CLOSER {
            block.bare_closer = Some(line_no);
        }

        match &mut block.body {
            OpenBody::List { members, .. } => {
                if Opener::detect(content).is_some() {
                    return Err(ParseError::NestedBlock {
                        line: line_no,
                        outer_line: block.start_line,
                    });
                }

                let name = content.trim();
                if name.starts_with(BARE_CLOSER) {
                    tracing::debug!(line = line_no, "skipping ':::' line inside list");
                } else if !name.is_empty() {
                    members.push(name.to_string());
                }
            }
            OpenBody::NewItem { body, .. } => body.push_str(line),
        }

        self.open = Some(block);
        Ok(())
    }

    fn flush_literal(&mut self) {
        if !self.literal.is_empty() {
            self.segments
                .push(Segment::Literal(std::mem::take(&mut self.literal)));
        }
    }

    fn finish(mut self) -> Result<Document, ParseError> {
        if let Some(block) = self.open.take() {
            return Err(ParseError::UnterminatedBlock {
                line: block.start_line,
                opener: block.opener(),
                bare_closer: block.bare_closer,
            });
        }

        self.flush_literal();
        Ok(Document {
            segments: self.segments,
        })
    }
}

/// Tracks whether a line-by-line scan is inside a fenced code block.
///
/// A fence opens with three or more backticks or tildes and closes with a
/// run of the same character at least as long.
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    fence: Option<(char, usize)>,
}

impl FenceTracker {
    pub(crate) fn in_fence(&self) -> bool {
        self.fence.is_some()
    }

    /// Updates state for a line; returns true if the line is a fence marker
    pub(crate) fn update(&mut self, content: &str) -> bool {
        let trimmed = content.trim_start();
        let Some(first) = trimmed.chars().next().filter(|c| *c == '`' || *c == '~') else {
            return false;
        };
        let run = trimmed.chars().take_while(|c| *c == first).count();
        if run < 3 {
            return false;
        }

        match self.fence {
            Some((ch, len)) => {
                let closes = ch == first && run >= len && trimmed[run..].trim().is_empty();
                if closes {
                    self.fence = None;
                }
                closes
            }
            None => {
                self.fence = Some((first, run));
                true
            }
        }
    }
}
