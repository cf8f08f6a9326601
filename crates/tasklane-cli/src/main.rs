//! tasklane - consume task events and reconcile archived documents.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;

#[derive(Parser)]
#[command(name = "tasklane")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (can also be set via TASKLANE_CONFIG)
    #[arg(long, env = "TASKLANE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay broker records (one JSON object per line) through the consumer lanes
    Consume {
        /// JSONL file with {topic, partition, offset, payload}; "-" reads stdin
        #[arg(long, default_value = "-")]
        input: String,
    },

    /// Run one reconciliation sweep and print the report as JSON
    Reconcile {
        /// File with one document id per line (defaults to the configured list)
        #[arg(long)]
        candidates: Option<PathBuf>,
    },

    /// Print the task a create event would produce
    Describe {
        /// Create event as JSON
        event: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Consume { input } => {
            commands::consume::run(cli.config.as_deref(), &input).await?;
        }
        Commands::Reconcile { candidates } => {
            commands::reconcile::run(cli.config.as_deref(), candidates.as_deref()).await?;
        }
        Commands::Describe { event } => {
            commands::describe::run(&event).await?;
        }
    }

    Ok(())
}
