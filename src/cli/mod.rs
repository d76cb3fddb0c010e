//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Commands
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Document | Render and check the directive document | `init`, `sync`, `validate` |
//! | Capture | Move content into the registry | `promote`, `extract` |
//! | Registry | Inspect and author items | `list`, `show`, `new` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output and `agmd=debug` logging:
//! ```bash
//! agmd --verbose sync
//! ```
//!
//! `AGMD_LOG` takes a full filter directive and overrides the default.
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod extract;
mod item;
mod output;
mod promote;
mod sync;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
