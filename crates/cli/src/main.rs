//! Storyloom CLI: the main entry point.
//!
//! Commands:
//! - `init`: Write a default config and create the novel directory
//! - `assemble`: Print the budgeted context
//! - `estimate`: Estimate the tokens in a file or stdin
//! - `allocate`: Show how the budget divides across categories
//! - `status`: Per-category size and budget fit
//! - `update`: Replace a category's content
//! - `append`: Add to a category's content
//! - `character`: Add or rewrite one character's section
//! - `summary`: Record a chapter summary in the index
//! - `title`: Set the novel title

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::Workspace;
use storyloom_core::Estimator;

#[derive(Parser)]
#[command(
    name = "storyloom",
    about = "Storyloom: token-budgeted context assembly for long-form writing",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.storyloom/config.toml)
    #[arg(short, long, global = true, env = "STORYLOOM_CONFIG")]
    config: Option<PathBuf>,

    /// Novel directory, overriding the config
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file and create the novel directory
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Assemble the context and print it
    Assemble {
        /// Print the structured result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Estimate the tokens in a file (or stdin)
    Estimate {
        /// Use the single-pass estimate
        #[arg(long)]
        fast: bool,

        file: Option<PathBuf>,
    },

    /// Show the per-category allocation
    Allocate {
        /// Override the configured total
        #[arg(short, long)]
        total: Option<usize>,
    },

    /// Show every category's size and budget fit
    Status,

    /// Replace a category's content with a file (or stdin)
    Update {
        category: String,

        file: Option<PathBuf>,

        /// Copy the current file aside first
        #[arg(long)]
        backup: bool,
    },

    /// Append a file (or stdin) to a category
    Append {
        category: String,

        file: Option<PathBuf>,
    },

    /// Add or rewrite one character's section of the character notes
    Character {
        name: String,

        /// Description file (stdin when omitted)
        file: Option<PathBuf>,

        /// Always append a new section, even if the name exists
        #[arg(long)]
        add: bool,
    },

    /// Record a chapter summary in the index
    Summary {
        chapter_id: String,

        text: String,

        /// Chapter title
        #[arg(long)]
        title: Option<String>,
    },

    /// Set the novel title
    Title { text: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    let dir = cli.dir.as_deref();

    match cli.command {
        Commands::Init { force } => commands::init::run(config, dir, force).await?,
        Commands::Estimate { fast, file } => {
            let estimator = if fast {
                Estimator::Fast
            } else {
                Estimator::Detailed
            };
            commands::estimate::run(file.as_deref(), estimator).await?
        }
        Commands::Allocate { total } => {
            let ws = Workspace::open(config, dir)?;
            commands::allocate::run(&ws, total)?
        }
        Commands::Assemble { json } => {
            let ws = Workspace::open(config, dir)?;
            commands::assemble::run(ws, json).await?
        }
        Commands::Status => {
            let ws = Workspace::open(config, dir)?;
            commands::status::run(&ws).await?
        }
        Commands::Update {
            category,
            file,
            backup,
        } => {
            let ws = Workspace::open(config, dir)?;
            commands::write::update(&ws, &category, file.as_deref(), backup).await?
        }
        Commands::Append { category, file } => {
            let ws = Workspace::open(config, dir)?;
            commands::write::append(&ws, &category, file.as_deref()).await?
        }
        Commands::Character { name, file, add } => {
            let ws = Workspace::open(config, dir)?;
            commands::character::run(&ws, &name, file.as_deref(), add).await?
        }
        Commands::Summary {
            chapter_id,
            text,
            title,
        } => {
            let ws = Workspace::open(config, dir)?;
            commands::index::summary(&ws, chapter_id, text, title).await?
        }
        Commands::Title { text } => {
            let ws = Workspace::open(config, dir)?;
            commands::index::title(&ws, &text).await?
        }
    }

    Ok(())
}
