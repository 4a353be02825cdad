//! Notebook host abstraction
//!
//! The validator never talks to a notebook front-end directly. A
//! [`NotebookHost`] exposes the runtime (cells, kernel state, execution) and
//! a [`Page`] receives the per-cell colors and the final status line.

pub mod page;
pub mod process;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::common::Result;

pub use page::{ConsolePage, RecordingPage};
pub use process::ProcessHost;

/// Kind of a notebook cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Code,
    Markdown,
    Raw,
}

/// Handle to the element that displays a cell's output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementRef(String);

impl ElementRef {
    /// Element of the output area of cell `index`
    pub fn cell(index: usize) -> Self {
        Self(format!("cell-{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One unscrubbed output entry: MIME type to payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOutput {
    pub data: Map<String, Value>,
}

impl RawOutput {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    /// Build from a JSON object; anything else yields an entry with no data
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(data) => Self { data },
            _ => Self::default(),
        }
    }

    /// Single `text/plain` entry
    pub fn text(text: impl Into<String>) -> Self {
        let mut data = Map::new();
        data.insert("text/plain".to_string(), Value::String(text.into()));
        Self { data }
    }
}

/// A cell as the host reports it
#[derive(Debug, Clone, PartialEq)]
pub struct HostCell {
    pub kind: CellKind,
    pub outputs: Vec<RawOutput>,
    pub element: Option<ElementRef>,
}

impl HostCell {
    pub fn code(outputs: Vec<RawOutput>, element: Option<ElementRef>) -> Self {
        Self {
            kind: CellKind::Code,
            outputs,
            element,
        }
    }

    pub fn markdown() -> Self {
        Self {
            kind: CellKind::Markdown,
            outputs: Vec::new(),
            element: None,
        }
    }
}

/// Background color applied to a cell's output element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellColor {
    Green,
    Red,
}

impl CellColor {
    pub fn for_verdict(passed: bool) -> Self {
        if passed {
            Self::Green
        } else {
            Self::Red
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Red => "red",
        }
    }
}

/// Runtime of the notebook under test
#[async_trait]
pub trait NotebookHost: Send + Sync {
    /// Path identifying the notebook
    fn notebook_path(&self) -> &str;

    /// Whether a live execution backend is attached
    async fn is_connected(&mut self) -> bool;

    /// Whether the backend is still executing
    async fn is_busy(&mut self) -> Result<bool>;

    /// Every cell, in notebook order, with its current outputs
    async fn cells(&self) -> Result<Vec<HostCell>>;

    /// Submit code to the backend without waiting for its result
    async fn execute(&mut self, code: &str) -> Result<()>;

    /// Clear the displayed output of every cell
    async fn clear_all_output(&mut self) -> Result<()>;

    /// Request execution of every cell
    async fn execute_all_cells(&mut self) -> Result<()>;
}

/// Surface that receives the validation result
pub trait Page {
    /// Set the background color of a cell's output element
    fn paint(&mut self, element: &ElementRef, color: CellColor);

    /// Append the status line (`PASS` or `FAIL#...`)
    fn append_status(&mut self, status: &str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_output_from_non_object() {
        assert!(RawOutput::from_value(json!("text")).data.is_empty());
        let output = RawOutput::from_value(json!({"text/plain": "x"}));
        assert_eq!(output, RawOutput::text("x"));
    }

    #[test]
    fn test_color_for_verdict() {
        assert_eq!(CellColor::for_verdict(true).as_str(), "green");
        assert_eq!(CellColor::for_verdict(false).as_str(), "red");
    }
}
