//! Suite runner
//!
//! Runs every enabled notebook of a suite through the driver and checks its
//! status line against the suite's expectations. A notebook passes when the
//! diagnostic parts left after dropping ignored cells are exactly the
//! expected ones, in any order.

use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use colored::Colorize;
use regex::Regex;

use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::driver::{Driver, DriverOptions};
use crate::host::{NotebookHost, ProcessHost, RecordingPage};

use super::config::{load_suite, NotebookTest};

static CELL_PART_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)[/:]").ok());

static CELL_MESSAGE_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^Cell ([0-9]+) ").ok());

/// Result of one notebook
#[derive(Debug)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    /// Sorted, `#`-joined diagnostic parts that counted
    pub actual: String,
    /// Sorted, `#`-joined expected parts
    pub expected: String,
    pub error: Option<String>,
}

/// Suite-wide settings
#[derive(Debug, Default)]
pub struct SuiteOptions {
    pub vcr: bool,
    pub verbose: bool,
}

fn cell_index(regex: &LazyLock<Option<Regex>>, part: &str) -> Option<usize> {
    regex
        .as_ref()?
        .captures(part)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// Diagnostic parts of a status line, minus those of ignored cells
pub fn status_parts(status: &str, ignore: &[usize]) -> Vec<String> {
    status
        .split('#')
        .filter(|part| *part != "PASS" && *part != "FAIL")
        .filter(|part| {
            let index = cell_index(&CELL_PART_REGEX, part)
                .or_else(|| cell_index(&CELL_MESSAGE_REGEX, part));
            !matches!(index, Some(i) if ignore.contains(&i))
        })
        .map(str::to_string)
        .collect()
}

fn sorted_join(mut parts: Vec<String>) -> String {
    parts.sort();
    parts.join("#")
}

/// Compare a status line with a test's expectations
pub fn check_status(test: &NotebookTest, status: &str) -> TestResult {
    let actual = sorted_join(status_parts(status, &test.ignore));
    let expected = sorted_join(test.expect.clone());
    TestResult {
        name: test.notebook.display().to_string(),
        passed: actual == expected,
        actual,
        expected,
        error: None,
    }
}

/// Run every enabled notebook of the suite at `path`
pub async fn run_suite(path: &Path, config: &Config, options: &SuiteOptions) -> Result<Vec<TestResult>> {
    let tests = load_suite(path)?;
    let suite_dir = path.parent().unwrap_or(Path::new("."));

    println!(
        "\n{} {}",
        "Running Suite:".blue().bold(),
        path.display().to_string().white().bold()
    );

    let mut results = Vec::new();
    for test in tests.iter().filter(|t| !t.disabled) {
        let result = match run_notebook(suite_dir, test, config, options).await {
            Ok(status) => check_status(test, &status),
            Err(e) => TestResult {
                name: test.notebook.display().to_string(),
                passed: false,
                actual: String::new(),
                expected: String::new(),
                error: Some(e.to_string()),
            },
        };
        print_result(&result);
        results.push(result);
    }

    let skipped = tests.len() - results.len();
    if skipped > 0 {
        println!("  {} disabled", skipped.to_string().dimmed());
    }
    Ok(results)
}

async fn run_notebook(
    suite_dir: &Path,
    test: &NotebookTest,
    config: &Config,
    options: &SuiteOptions,
) -> Result<String> {
    // Resolve notebook path relative to the suite file
    let notebook = if test.notebook.is_relative() {
        suite_dir.join(&test.notebook)
    } else {
        test.notebook.clone()
    };

    let mut host = ProcessHost::open(&notebook, config.executor.clone())?.verbose(options.verbose);
    if !host.is_connected().await {
        return Err(Error::ExecutorNotFound {
            program: config.executor.program.clone(),
        });
    }

    let fixture = options.vcr.then(|| host.fixture(&config.fixture.extension));
    let driver_options = DriverOptions {
        poll_interval: config.polling.interval(),
        timeout: test
            .timeout
            .map(Duration::from_secs)
            .or_else(|| config.run_timeout()),
        fixture,
    };

    let mut driver = Driver::new(host, RecordingPage::new(), driver_options);
    let verdict = driver.run().await?;
    Ok(verdict.status())
}

fn print_result(result: &TestResult) {
    if let Some(error) = &result.error {
        println!("  {} {}: {}", "✗".red(), result.name.red(), error);
    } else if result.passed {
        println!("  {} {}: pass", "✓".green(), result.name.green());
    } else {
        println!("  {} {}: fail", "✗".red(), result.name.red());
        println!("    {} {}", "Expected:".blue(), result.expected);
        println!("    {} {}", "  Actual:".yellow(), result.actual);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_entry(ignore: Vec<usize>, expect: Vec<&str>) -> NotebookTest {
        NotebookTest {
            notebook: PathBuf::from("nb.ipynb"),
            ignore,
            expect: expect.into_iter().map(str::to_string).collect(),
            disabled: false,
            timeout: None,
        }
    }

    #[test]
    fn test_pass_status_has_no_parts() {
        assert!(status_parts("PASS", &[]).is_empty());
    }

    #[test]
    fn test_ignored_cells_are_dropped() {
        let status = "FAIL#Cell 3 had 1 outputs but now has 2#3:F#4/text/html:F#5:F";
        assert_eq!(
            status_parts(status, &[3, 5]),
            vec!["4/text/html:F".to_string()]
        );
    }

    #[test]
    fn test_length_message_is_never_ignored() {
        let status = "FAIL#Old output had 2 entries but new output has 3 entries#2:F";
        assert_eq!(
            status_parts(status, &[2]),
            vec!["Old output had 2 entries but new output has 3 entries".to_string()]
        );
    }

    #[test]
    fn test_expectations_match_in_any_order() {
        let test = test_entry(vec![], vec!["2:F", "1/text/plain:F"]);
        let result = check_status(&test, "FAIL#2:F#1/text/plain:F");
        assert!(result.passed);
        assert_eq!(result.actual, "1/text/plain:F#2:F");
    }

    #[test]
    fn test_unexpected_failure() {
        let test = test_entry(vec![1], vec![]);
        let result = check_status(&test, "FAIL#1:F#2/text/plain:F");
        assert!(!result.passed);
        assert_eq!(result.expected, "");
        assert_eq!(result.actual, "2/text/plain:F");
    }

    #[test]
    fn test_fully_ignored_failure_passes() {
        let test = test_entry(vec![0], vec![]);
        assert!(check_status(&test, "FAIL#Cell 0 had no outputs but now has 0#0:F").passed);
    }
}
