//! Hearth CLI — run context assembly and chat housekeeping against fixtures.
//!
//! Commands:
//! - `budget`    — Show the token budget for a model
//! - `assemble`  — Assemble the context for a new message in a fixture chat
//! - `maintain`  — Run the summary and title passes on a fixture chat
//! - `config`    — Show the effective configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod fixture;
mod runtime;

#[derive(Parser)]
#[command(
    name = "hearth",
    about = "Hearth — token-budgeted context assembly for character chats",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.hearth/config.toml)
    #[arg(short, long, global = true, env = "HEARTH_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the token budget for a model
    Budget {
        /// Provider of the conversational model (defaults to config)
        #[arg(short, long)]
        provider: Option<String>,

        /// Model name (defaults to config)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Assemble the context for a new user message
    Assemble {
        /// Chat fixture (JSON)
        #[arg(short, long)]
        fixture: PathBuf,

        /// The new user message
        #[arg(short, long)]
        message: String,
    },

    /// Run summarization and title maintenance on a chat
    Maintain {
        /// Chat fixture (JSON)
        #[arg(short, long)]
        fixture: PathBuf,

        /// Regenerate the summary from scratch, bypassing the trigger
        #[arg(long)]
        force: bool,

        /// Write the updated chat back to the fixture file
        #[arg(short, long)]
        write: bool,
    },

    /// Show the effective configuration
    Config {
        /// Print only the config file path
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
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

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Budget { provider, model } => {
            commands::budget::run(config_path, provider, model).await?
        }
        Commands::Assemble { fixture, message } => {
            commands::assemble::run(config_path, &fixture, &message).await?
        }
        Commands::Maintain {
            fixture,
            force,
            write,
        } => commands::maintain::run(config_path, &fixture, force, write).await?,
        Commands::Config { path } => commands::config_cmd::run(config_path, path).await?,
    }

    Ok(())
}
