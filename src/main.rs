//! nbverify - re-execute notebooks and validate their outputs
//!
//! Runs every cell of a notebook, scrubs non-deterministic output and
//! compares the result with the outputs saved in the notebook.

use std::path::PathBuf;

use clap::Parser;
use nbverify::cli::{self, GlobalOptions};
use nbverify::commands::Commands;
use nbverify::common::logging;

#[derive(Parser)]
#[command(name = "nbverify", about = "Notebook output validator")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging and executor output
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.verbose);

    let global = GlobalOptions {
        config: cli.config,
        verbose: cli.verbose,
    };

    match cli::dispatch(cli.command, global).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
