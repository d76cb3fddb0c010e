//! Domain models for agmd
//!
//! The directive engine: parsing, expansion, promotion and alignment.
//! Contains no filesystem access; registries are passed in explicitly.

pub mod align;
pub mod directive;
pub mod expand;
pub mod item;
pub mod promote;
pub mod registry;

pub use align::{align, template_sections, Alignment, AlignmentMismatch, TemplateSection};
pub use directive::{parse, Directive, DirectiveBlock, Document, LineSpan, ParseError, Segment, CLOSER};
pub use expand::{expand, references, unresolved, LookupMiss, MissReason, Reference};
pub use item::{is_valid_kind, is_valid_name, Item, ItemFrontmatter, ItemKey, KeyError};
pub use promote::{promote_all, promote_nth, promote_one, PromoteError, PromoteReport, Promotion, SkippedBlock};
pub use registry::{MemoryRegistry, Registry, RegistryError};
