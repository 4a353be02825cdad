//! CLI command definitions
//!
//! Defines the clap commands for the nbverify CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Re-execute a notebook and validate its outputs against the saved ones
    Run {
        /// Path to the .ipynb file
        notebook: PathBuf,

        /// Record/replay kernel HTTP traffic in a cassette next to the notebook
        #[arg(long)]
        vcr: bool,

        /// URL query string to read flags from (e.g. "?vcr=1")
        #[arg(long)]
        query: Option<String>,

        /// Give up after this many seconds (default: wait indefinitely)
        #[arg(long)]
        timeout: Option<u64>,

        /// Delay between kernel status checks, in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare the outputs of two saved notebooks
    Compare {
        /// Notebook holding the expected outputs
        baseline: PathBuf,

        /// Notebook holding the outputs to check
        actual: PathBuf,

        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
    },

    /// Scrub non-deterministic parts of output text
    Scrub {
        /// File to read (default: stdin)
        file: Option<PathBuf>,
    },

    /// Run a YAML suite of notebooks
    Suite {
        /// Path to the YAML suite file
        path: PathBuf,

        /// Record/replay kernel HTTP traffic for every notebook
        #[arg(long)]
        vcr: bool,
    },
}
