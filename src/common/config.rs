//! Configuration file handling

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Polling settings for the execution driver
    #[serde(default)]
    pub polling: PollingConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// External notebook executor
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Recorded-interaction fixture settings
    #[serde(default)]
    pub fixture: FixtureConfig,
}

/// Polling settings
#[derive(Debug, Deserialize)]
pub struct PollingConfig {
    /// Delay between connection and busy checks
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

fn default_interval_ms() -> u64 {
    1000
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Timeout settings in seconds
///
/// Unset means the driver waits forever for the kernel to connect and go idle.
#[derive(Debug, Deserialize, Default)]
pub struct Timeouts {
    /// Upper bound for a whole notebook run
    #[serde(default)]
    pub run_secs: Option<u64>,
}

/// Executor configuration
///
/// `{input}` and `{output}` in `args` are replaced with the working copy
/// and the executed notebook paths.
#[derive(Debug, Deserialize, Clone)]
pub struct ExecutorConfig {
    #[serde(default = "default_executor_program")]
    pub program: String,

    #[serde(default = "default_executor_args")]
    pub args: Vec<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            program: default_executor_program(),
            args: default_executor_args(),
        }
    }
}

fn default_executor_program() -> String {
    "jupyter".to_string()
}

fn default_executor_args() -> Vec<String> {
    [
        "nbconvert",
        "--to",
        "notebook",
        "--execute",
        // a raising cell is recorded as an error output, not a failed run
        "--allow-errors",
        "--output",
        "{output}",
        "{input}",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Fixture (cassette) configuration
#[derive(Debug, Deserialize, Clone)]
pub struct FixtureConfig {
    /// Appended to the notebook path to name the cassette file
    #[serde(default = "default_fixture_extension")]
    pub extension: String,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            extension: default_fixture_extension(),
        }
    }
}

fn default_fixture_extension() -> String {
    ".yaml".to_string()
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }

    /// Run timeout, if one is configured
    pub fn run_timeout(&self) -> Option<Duration> {
        self.timeouts.run_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.polling.interval_ms, 1000);
        assert!(config.run_timeout().is_none());
        assert_eq!(config.executor.program, "jupyter");
        assert!(config.executor.args.contains(&"{input}".to_string()));
        assert_eq!(config.fixture.extension, ".yaml");
    }

    #[test]
    fn test_partial_override() {
        let config: Config = toml::from_str(
            r#"
            [polling]
            interval_ms = 250

            [timeouts]
            run_secs = 600

            [executor]
            program = "papermill"
            args = ["{input}", "{output}"]
            "#,
        )
        .unwrap();
        assert_eq!(config.polling.interval(), Duration::from_millis(250));
        assert_eq!(config.run_timeout(), Some(Duration::from_secs(600)));
        assert_eq!(config.executor.program, "papermill");
        assert_eq!(config.executor.args.len(), 2);
        assert_eq!(config.fixture.extension, ".yaml");
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[polling]\ninterval_ms = \"soon\"\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, super::super::Error::ConfigParse(_)));
    }
}
