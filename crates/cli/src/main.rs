//! ragchat CLI — the main entry point.
//!
//! Commands:
//! - `chat`    — Interactive chat or single-message mode
//! - `ingest`  — Load JSON documents into the document store and index
//! - `search`  — Show the fused context for a query, without the model
//! - `doctor`  — Diagnose configuration and backend health
//! - `config`  — Show the effective configuration or write a starter file

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod backends;
mod commands;

#[derive(Parser)]
#[command(
    name = "ragchat",
    about = "ragchat — retrieval-augmented conversational question answering",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat over the indexed documents
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Similarity matches to retrieve per question
        #[arg(short = 'k', long)]
        num_results: Option<usize>,

        /// Print the full result as JSON (single-message mode)
        #[arg(long, requires = "message")]
        json: bool,
    },

    /// Ingest JSON documents (files or directories)
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Run retrieval and fusion for a query and print the ranked context
    Search {
        query: String,

        #[arg(short = 'k', long)]
        num_results: Option<usize>,
    },

    /// Diagnose configuration and backend health
    Doctor,

    /// Show the effective configuration
    Config {
        /// Write a starter config file instead
        #[arg(long)]
        init: bool,

        /// Overwrite an existing file with --init
        #[arg(long, requires = "init")]
        force: bool,
    },
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

    match cli.command {
        Commands::Chat {
            message,
            num_results,
            json,
        } => commands::chat::run(message, num_results, json).await?,
        Commands::Ingest { paths } => commands::ingest::run(paths).await?,
        Commands::Search { query, num_results } => commands::search::run(query, num_results).await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Config { init, force } => commands::config_cmd::run(init, force)?,
    }

    Ok(())
}
