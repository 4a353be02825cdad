//! Error types for nbverify
//!
//! Output mismatches are never errors: they end up in the verdict's
//! diagnostic string. The variants below cover infrastructure failures only.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for nbverify
#[derive(Error, Debug)]
pub enum Error {
    // === Notebook Errors ===
    #[error("Failed to read notebook '{path}': {error}")]
    NotebookRead { path: String, error: String },

    #[error("Invalid notebook '{path}': {error}")]
    NotebookParse { path: String, error: String },

    // === Executor Errors ===
    #[error("Executor '{program}' not found on PATH. Configure [executor] in the config file")]
    ExecutorNotFound { program: String },

    #[error("Failed to start executor '{program}': {error}")]
    ExecutorSpawn { program: String, error: String },

    #[error("Executor finished without writing '{0}'")]
    ExecutorOutputMissing(String),

    #[error("Cannot {action} while the notebook is {state}")]
    InvalidState { action: String, state: String },

    // === Driver Errors ===
    #[error("Timed out after {secs} seconds while {phase}")]
    Timeout { phase: String, secs: u64 },

    #[error("Run cancelled while {0}")]
    Cancelled(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid state error
    pub fn invalid_state(action: &str, state: &str) -> Self {
        Self::InvalidState {
            action: action.to_string(),
            state: state.to_string(),
        }
    }

    /// Create a timeout error for the given waiting phase
    pub fn timeout(phase: &str, secs: u64) -> Self {
        Self::Timeout {
            phase: phase.to_string(),
            secs,
        }
    }

    /// Create a notebook read error from an IO failure
    pub fn notebook_read(path: &std::path::Path, error: &io::Error) -> Self {
        Self::NotebookRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}
