//! Test suite configuration types
//!
//! A suite is a YAML list of notebooks:
//!
//! ```yaml
//! - notebook: samples/Hello World.ipynb
//! - notebook: samples/BigQuery.ipynb
//!   ignore: [4, 7]          # cells whose failures do not count
//!   expect: ["12/text/html:F"]
//! - notebook: samples/Slow.ipynb
//!   disabled: true
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::common::{Error, Result};

/// One notebook entry of a suite
#[derive(Deserialize, Debug, Clone)]
pub struct NotebookTest {
    /// Notebook path, relative to the suite file
    pub notebook: PathBuf,
    /// Cell indices whose diagnostics are dropped
    #[serde(default)]
    pub ignore: Vec<usize>,
    /// Diagnostic parts the run is expected to produce
    #[serde(default)]
    pub expect: Vec<String>,
    /// Skip this notebook
    #[serde(default)]
    pub disabled: bool,
    /// Per-notebook run timeout in seconds
    pub timeout: Option<u64>,
}

/// Load a suite from a YAML file
pub fn load_suite(path: &Path) -> Result<Vec<NotebookTest>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read test suite '{}': {}",
            path.display(),
            e
        ))
    })?;

    serde_yaml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse test suite: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_suite() {
        let tests: Vec<NotebookTest> = serde_yaml::from_str(
            r#"
- notebook: samples/Hello World.ipynb
- notebook: samples/BigQuery.ipynb
  ignore: [4, 7]
  expect: ["12/text/html:F"]
  timeout: 120
- notebook: samples/Slow.ipynb
  disabled: true
"#,
        )
        .unwrap();

        assert_eq!(tests.len(), 3);
        assert_eq!(tests[0].notebook, PathBuf::from("samples/Hello World.ipynb"));
        assert!(tests[0].ignore.is_empty());
        assert!(!tests[0].disabled);
        assert_eq!(tests[1].ignore, vec![4, 7]);
        assert_eq!(tests[1].expect, vec!["12/text/html:F".to_string()]);
        assert_eq!(tests[1].timeout, Some(120));
        assert!(tests[2].disabled);
    }

    #[test]
    fn test_load_suite_missing_file() {
        let err = load_suite(Path::new("/nonexistent/suite.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read test suite"));
    }
}
