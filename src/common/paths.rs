//! Configuration paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/nbverify/`
//! - macOS: `~/Library/Application Support/nbverify/`
//! - Windows: `%APPDATA%\nbverify\`

use std::path::PathBuf;

/// Application name used for directory lookups
const APP_NAME: &str = "nbverify";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
