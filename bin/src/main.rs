//! barwire CLI - minute data ingestion, multi-level bars and indicators.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod context;
mod display;
mod logging;

#[derive(Parser)]
#[command(name = "barwire")]
#[command(about = "Minute data ingestion, multi-level bars and indicators", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (warnings and errors only, no progress output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file
    #[arg(short, long, global = true, default_value = "barwire.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Download and store minute data until caught up
    Ingest {
        /// Asset symbols (defaults to every configured asset)
        assets: Vec<String>,

        /// Maximum assets ingested at once
        #[arg(long, default_value = "4")]
        parallel: usize,
    },

    /// Aggregate stored data through the indicator sink
    Replay {
        /// Asset symbols (defaults to every configured asset)
        assets: Vec<String>,

        /// Samples between checkpoints (overrides the configuration)
        #[arg(long)]
        checkpoint_every: Option<u64>,
    },

    /// Keep one asset current, polling every minute until Ctrl-C
    Live {
        /// Asset symbol
        asset: String,

        /// Levels whose closed bars are logged (defaults to all)
        #[arg(short, long, value_delimiter = ',')]
        levels: Vec<String>,
    },

    /// Drop invalid and duplicate rows from stored data
    Sanitize {
        /// Asset symbols (defaults to every configured asset)
        assets: Vec<String>,
    },

    /// Show the bucket containing a timestamp
    Period {
        /// Level (m1, m5, m15, m30, h1, d1, w1, mo1)
        level: String,

        /// Timestamp (RFC 3339 or YYYY-MM-DD HH:MM, UTC). Defaults to now.
        time: Option<String>,
    },

    /// List aggregation levels
    Levels,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Ingest { assets, parallel } => {
            commands::ingest::ingest(&cli.config, &assets, parallel, cli.quiet).await
        }
        Commands::Replay {
            assets,
            checkpoint_every,
        } => commands::replay::replay(&cli.config, &assets, checkpoint_every).await,
        Commands::Live { asset, levels } => {
            commands::live::live(&cli.config, &asset, &levels).await
        }
        Commands::Sanitize { assets } => commands::sanitize::sanitize(&cli.config, &assets).await,
        Commands::Period { level, time } => {
            commands::period::show_period(&cli.config, &level, time.as_deref())
        }
        Commands::Levels => {
            commands::levels::list_levels();
            Ok(())
        }
    }
}
