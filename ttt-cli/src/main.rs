//! # ttt-cli
//!
//! CLI tool for the two-party tic-tac-toe protocol.
//!
//! ## Commands
//!
//! - `demo`: Play a full game between two in-process agents
//! - `board`: Replay moves and print the board
//!
//! ## Example
//!
//! ```bash
//! # Alice (X) against Bob (O), in memory
//! ttt-cli demo
//!
//! # Same game, records kept in SQLite (games-alice.db, games-bob.db)
//! ttt-cli demo --backend sqlite
//!
//! # Inspect a position
//! ttt-cli board X:A1 O:B1 X:A2 O:B2 X:A3
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use ttt_agent::{AgentConfig, StorageBackend};

mod commands;

use commands::{board, demo};

/// CLI tool for the two-party tic-tac-toe protocol.
#[derive(Parser, Debug)]
#[command(name = "ttt-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a game between two agents joined by a loopback network
    Demo {
        /// Agent configuration file (TOML)
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Storage backend, overriding the configuration file
        #[arg(long)]
        backend: Option<StorageBackend>,

        /// Seconds to wait for the other player before giving up
        #[arg(long, default_value = "10")]
        timeout: u64,
    },

    /// Replay moves and print the board
    Board {
        /// Moves in play order, e.g. X:A1 O:B2
        #[arg(required = true)]
        moves: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo {
            config,
            backend,
            timeout,
        } => {
            let mut config = match config {
                Some(path) => AgentConfig::from_file(&path)
                    .with_context(|| format!("Failed to load {}", path.display()))?,
                None => AgentConfig::default(),
            };
            if let Some(backend) = backend {
                config.storage.backend = backend;
            }
            demo::run(&config, Duration::from_secs(timeout)).await?;
        }
        Commands::Board { moves } => {
            board::run(&moves)?;
        }
    }

    Ok(())
}
