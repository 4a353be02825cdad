//! nbverify - notebook output validator
//!
//! Captures the outputs of every notebook cell, re-executes the notebook,
//! scrubs non-deterministic text from both captures and compares them cell
//! by cell. The notebook runtime and the page receiving the verdict are
//! traits, so the validator runs against any host.

pub mod cli;
pub mod commands;
pub mod common;
pub mod driver;
pub mod fixture;
pub mod host;
pub mod notebook;
pub mod testing;
pub mod validator;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use driver::{Driver, DriverOptions, Phase};
pub use validator::{CellOutputSnapshot, Verdict};
