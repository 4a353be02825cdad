//! CLI command handling
//!
//! Dispatches CLI commands and formats output. Every command reports
//! whether everything it checked passed; `main` turns that into the exit code.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use colored::Colorize;
use serde_json::json;
use tokio::sync::watch;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::driver::{Driver, DriverOptions};
use crate::fixture;
use crate::host::{ConsolePage, NotebookHost, Page, ProcessHost, RecordingPage};
use crate::notebook::Notebook;
use crate::testing::{self, SuiteOptions};
use crate::validator::{self, Verdict};

/// Global options shared by every command
#[derive(Debug, Default)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub verbose: bool,
}

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, global: GlobalOptions) -> Result<bool> {
    match command {
        Commands::Run {
            notebook,
            vcr,
            query,
            timeout,
            interval_ms,
            json,
        } => {
            let config = load_config(global.config.as_deref())?;
            let vcr = vcr || query.as_deref().is_some_and(fixture::enabled_in_query);

            let mut host =
                ProcessHost::open(&notebook, config.executor.clone())?.verbose(global.verbose);
            if !host.is_connected().await {
                return Err(Error::ExecutorNotFound {
                    program: config.executor.program.clone(),
                });
            }

            let fixture = vcr.then(|| host.fixture(&config.fixture.extension));
            let options = DriverOptions {
                poll_interval: interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or_else(|| config.polling.interval()),
                timeout: timeout
                    .map(Duration::from_secs)
                    .or_else(|| config.run_timeout()),
                fixture,
            };

            if json {
                let (verdict, page) = drive(host, RecordingPage::new(), options).await?;
                print_json(&notebook, &verdict, &page)?;
                Ok(verdict.passed)
            } else {
                println!("{} {}", "Running:".blue().bold(), notebook.display());
                let (verdict, _) = drive(host, ConsolePage::new(), options).await?;
                Ok(verdict.passed)
            }
        }

        Commands::Compare {
            baseline,
            actual,
            json,
        } => {
            let old = validator::capture_cells(&Notebook::load(&baseline)?.host_cells());
            let new = validator::capture_cells(&Notebook::load(&actual)?.host_cells());

            if json {
                let mut page = RecordingPage::new();
                let verdict = validator::validate(&old, &new, &mut page);
                print_json(&actual, &verdict, &page)?;
                Ok(verdict.passed)
            } else {
                println!(
                    "{} {} {} {}",
                    "Comparing:".blue().bold(),
                    baseline.display(),
                    "->".dimmed(),
                    actual.display()
                );
                let verdict = validator::validate(&old, &new, &mut ConsolePage::new());
                Ok(verdict.passed)
            }
        }

        Commands::Scrub { file } => {
            let input = match &file {
                Some(path) => std::fs::read_to_string(path).map_err(|e| Error::FileRead {
                    path: path.display().to_string(),
                    error: e.to_string(),
                })?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            print!("{}", validator::scrub(&input));
            Ok(true)
        }

        Commands::Suite { path, vcr } => {
            let config = load_config(global.config.as_deref())?;
            let options = SuiteOptions {
                vcr,
                verbose: global.verbose,
            };
            let results = testing::run_suite(&path, &config, &options).await?;

            let failed = results.iter().filter(|r| !r.passed).count();
            if failed == 0 {
                println!(
                    "\n{} {}\n",
                    "✓".green().bold(),
                    format!("{} notebooks passed", results.len()).green().bold()
                );
            } else {
                println!(
                    "\n{} {}\n",
                    "✗".red().bold(),
                    format!("{} of {} notebooks failed", failed, results.len())
                        .red()
                        .bold()
                );
            }
            Ok(failed == 0)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Run the driver, cancelling on Ctrl+C
async fn drive<H: NotebookHost, P: Page>(
    host: H,
    page: P,
    options: DriverOptions,
) -> Result<(Verdict, P)> {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, stopping after the current poll");
            let _ = cancel_tx.send(true);
        }
    });

    let mut driver = Driver::new(host, page, options).with_cancellation(cancel_rx);
    let result = driver.run().await;
    interrupt.abort();

    let verdict = result?;
    let (_, page) = driver.into_parts();
    Ok((verdict, page))
}

fn print_json(notebook: &Path, verdict: &Verdict, page: &RecordingPage) -> Result<()> {
    let report = json!({
        "notebook": notebook.display().to_string(),
        "status": verdict.status(),
        "passed": verdict.passed,
        "cells": verdict.cells,
        "painted": page.painted,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
