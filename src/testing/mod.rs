//! Notebook test suites
//!
//! Reads YAML suites of notebooks, runs each one and checks the status
//! line against per-notebook ignore lists and expected failures.

mod config;
mod runner;

pub use config::*;
pub use runner::{check_status, run_suite, status_parts, SuiteOptions, TestResult};
