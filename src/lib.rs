//! agmd - Agent instruction documents from a personal registry
//!
//! Reusable rules, workflows and other fragments live in a registry of
//! markdown files. A directive document references them with `:::include`
//! and `:::list` blocks and is expanded into the document agents read.
//! Inline `:::new` blocks can be promoted into the registry, and a rendered
//! document can be aligned back against its directives to recover items.

pub mod cli;
pub mod domain;
pub mod storage;

pub use domain::{Document, Item, ItemKey, MemoryRegistry, Registry};
pub use storage::RegistryStore;
