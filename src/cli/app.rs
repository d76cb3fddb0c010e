//! Main CLI application structure

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::output::{Output, OutputFormat};
use super::{extract, item, promote, sync};
use crate::storage::{Project, RegistryStore};

#[derive(Parser)]
#[command(name = "agmd")]
#[command(author, version, about = "Build agent instruction files from reusable rules and workflows")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Registry directory (defaults to ~/.agmd)
    #[arg(long, global = true, env = "AGMD_REGISTRY")]
    pub registry: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create directives.md in the current directory
    Init,

    /// Render the directive document into the output document
    Sync {
        /// Print the rendered document instead of writing it
        #[arg(long)]
        stdout: bool,
    },

    /// Move ':::new' blocks into the registry
    Promote {
        /// Block to promote (kind:name)
        #[arg(required_unless_present = "all")]
        key: Option<String>,

        /// Promote every ':::new' block
        #[arg(long, conflicts_with = "key")]
        all: bool,
    },

    /// Recover items from a rendered document into the registry
    Extract {
        /// Rendered document to read (defaults to the configured output)
        #[arg(long)]
        rendered: Option<PathBuf>,

        /// Report what would be created without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Check references and pending ':::new' blocks
    Validate,

    /// Show a registry item
    Show {
        /// Item reference (kind:name)
        key: String,

        /// Print the item file verbatim
        #[arg(long)]
        raw: bool,
    },

    /// List registry items
    List {
        /// Only list this kind
        kind: Option<String>,
    },

    /// Create a registry item
    New {
        /// Item reference (kind:name)
        key: String,

        /// Item body
        #[arg(long, short = 'c')]
        content: Option<String>,

        /// One-line description
        #[arg(long, short = 'd')]
        description: Option<String>,
    },
}

/// Installs the stderr log subscriber; `AGMD_LOG` overrides the default filter
fn init_tracing(verbose: bool) {
    let default = if verbose { "agmd=debug" } else { "agmd=warn" };
    let filter = EnvFilter::try_from_env("AGMD_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project = Project::open_current()?;
    let format = cli
        .format
        .unwrap_or_else(|| project.config().global.default_format.into());
    let output = Output::new(format, cli.verbose);

    let registry_path = project.config().registry_path(cli.registry.as_deref())?;
    let mut registry = RegistryStore::new(registry_path);

    output.verbose(&format!("Project root: {}", project.root().display()));
    output.verbose(&format!("Registry: {}", registry.root().display()));

    match cli.command {
        Commands::Init => {
            let cwd = std::env::current_dir().context("Failed to determine current directory")?;
            let project = Project::init(&cwd)?;
            output.verbose_ctx("init", &format!("Project root: {}", project.root().display()));
            output.success(&format!(
                "Created {}. Run 'agmd sync' to render it.",
                project.relative_path(&project.source_path()).display()
            ));
        }

        Commands::Sync { stdout } => sync::sync(&project, &registry, &output, stdout)?,
        Commands::Validate => sync::validate(&project, &registry, &output)?,

        Commands::Promote { key, all } => {
            output.verbose_ctx("promote", &format!("key={:?}, all={}", key, all));
            match key {
                Some(key) if !all => promote::promote_one(&project, &mut registry, &output, &key)?,
                _ => promote::promote_all(&project, &mut registry, &output)?,
            }
        }

        Commands::Extract { rendered, dry_run } => {
            extract::run(&project, &mut registry, &output, rendered.as_deref(), dry_run)?
        }

        Commands::Show { key, raw } => item::show(&registry, &output, &key, raw)?,
        Commands::List { kind } => item::list(&registry, &output, kind.as_deref())?,
        Commands::New { key, content, description } => item::new_item(
            &mut registry,
            &output,
            &key,
            content.as_deref(),
            description.as_deref(),
        )?,
    }

    Ok(())
}
