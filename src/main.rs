//! ERC-20 Ledger CLI Application
//!
//! A command-line interface for deploying token ledgers and invoking them.

use clap::{Parser, Subcommand};
use erc20_ledger::cli::{self, AppState};
use erc20_ledger::host::{HostConfig, DEFAULT_SCOPE};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ledger")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "An ERC-20 style token ledger over a key-value world state", long_about = None)]
struct Cli {
    /// Data directory for world state storage
    #[arg(short, long, default_value = ".ledger_data")]
    data_dir: PathBuf,

    /// Scope forwarded on cross-ledger calls
    #[arg(long, default_value = DEFAULT_SCOPE)]
    scope: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a new, empty token ledger
    Deploy {
        /// Ledger name
        name: String,
    },

    /// List deployed ledgers
    List,

    /// Invoke a function and commit its effects
    Invoke {
        /// Ledger name
        ledger: String,

        /// Function name (init, transfer, approve, ...)
        function: String,

        /// Ordered function parameters
        #[arg(allow_hyphen_values = true)]
        params: Vec<String>,
    },

    /// Evaluate a function without committing anything
    Query {
        /// Ledger name
        ledger: String,

        /// Function name (balanceOf, totalSupply, allowance, ...)
        function: String,

        /// Ordered function parameters
        #[arg(allow_hyphen_values = true)]
        params: Vec<String>,
    },

    /// Show emitted events of a ledger
    Events {
        /// Ledger name
        ledger: String,

        /// Number of events to show
        #[arg(short, long, default_value = "20")]
        count: usize,
    },

    /// Export world state to file
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import world state from file
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// List saved world state backups
    Backups,

    /// Restore the world state from a backup
    Restore {
        /// Backup index (0 is the most recent)
        index: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let host_config = HostConfig { scope: cli.scope };
    let mut state = AppState::new(cli.data_dir, host_config)?;

    match cli.command {
        Commands::Deploy { name } => {
            cli::cmd_deploy(&mut state, &name)?;
        }

        Commands::List => {
            cli::cmd_list(&state)?;
        }

        Commands::Invoke {
            ledger,
            function,
            params,
        } => {
            cli::cmd_invoke(&mut state, &ledger, &function, &params)?;
        }

        Commands::Query {
            ledger,
            function,
            params,
        } => {
            cli::cmd_query(&state, &ledger, &function, &params)?;
        }

        Commands::Events { ledger, count } => {
            cli::cmd_events(&state, &ledger, count)?;
        }

        Commands::Export { output } => {
            cli::cmd_export(&state, &output)?;
        }

        Commands::Import { input } => {
            cli::cmd_import(&mut state, &input)?;
        }

        Commands::Backups => {
            cli::cmd_backups(&state)?;
        }

        Commands::Restore { index } => {
            cli::cmd_restore(&mut state, index)?;
        }
    }

    Ok(())
}
