//! SCORM sync CLI
//!
//! Command-line tools for the durable snapshots a sync engine leaves on disk.
//!
//! # Commands
//!
//! - `inspect` - Display pending batches per session
//! - `verify` - Check that every snapshot decodes and is well formed
//! - `clear` - Delete the snapshot of one session

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Durable snapshot tools for the SCORM sync engine.
#[derive(Parser)]
#[command(name = "scorm-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the durable store directory
    #[arg(global = true, short, long)]
    dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display pending batches per session
    Inspect {
        /// Only show this session
        #[arg(short, long)]
        session: Option<String>,

        /// List the data model keys each snapshot touches
        #[arg(short, long)]
        keys: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Verify snapshot integrity
    Verify,

    /// Delete the snapshot of one session
    Clear {
        /// Session whose snapshot is removed
        #[arg(short, long)]
        session: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect {
            session,
            keys,
            format,
        } => {
            let dir = cli.dir.ok_or("Store directory required for inspect")?;
            commands::inspect::run(&dir, session.as_deref(), keys, &format)?;
        }
        Commands::Verify => {
            let dir = cli.dir.ok_or("Store directory required for verify")?;
            commands::verify::run(&dir)?;
        }
        Commands::Clear { session } => {
            let dir = cli.dir.ok_or("Store directory required for clear")?;
            commands::clear::run(&dir, &session)?;
        }
        Commands::Version => {
            println!("scorm-sync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
