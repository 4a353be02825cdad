//! nbformat v4 documents
//!
//! Only the parts the validator reads are typed; every other field is kept
//! in `extra` so that a notebook survives a load/save round trip.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::common::{Error, Result};
use crate::host::{CellKind, ElementRef, HostCell, RawOutput};

/// Metadata key marking cells injected by nbverify
const INJECTED_KEY: &str = "nbverify_injected";

/// A notebook document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    pub cells: Vec<Cell>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A notebook cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub cell_type: CellKind,

    #[serde(default)]
    pub metadata: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<Output>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A code cell output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub output_type: String,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Output {
    /// MIME bundle as the front-end displays it
    ///
    /// Streams and errors have no MIME bundle of their own; they are exposed
    /// as `text/plain` so that they take part in the comparison.
    pub fn to_raw(&self) -> RawOutput {
        match self.output_type.as_str() {
            "execute_result" | "display_data" => self
                .fields
                .get("data")
                .cloned()
                .map(RawOutput::from_value)
                .unwrap_or_default(),
            "stream" => {
                let mut data = Map::new();
                if let Some(text) = self.fields.get("text") {
                    data.insert("text/plain".to_string(), text.clone());
                }
                RawOutput::new(data)
            }
            "error" => RawOutput::text(self.error_text()),
            other => {
                tracing::debug!("Ignoring output of type '{}'", other);
                RawOutput::default()
            }
        }
    }

    fn error_text(&self) -> String {
        let field = |name: &str| {
            self.fields
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let mut text = format!("{}: {}", field("ename"), field("evalue"));
        if let Some(Value::Array(lines)) = self.fields.get("traceback") {
            for line in lines.iter().filter_map(Value::as_str) {
                text.push('\n');
                text.push_str(line);
            }
        }
        text
    }
}

impl Cell {
    /// New code cell with no outputs
    pub fn code(source: &str) -> Self {
        let mut extra = Map::new();
        extra.insert("source".to_string(), Value::String(source.to_string()));
        extra.insert("execution_count".to_string(), Value::Null);
        Self {
            cell_type: CellKind::Code,
            metadata: Map::new(),
            outputs: Some(Vec::new()),
            extra,
        }
    }

    pub fn is_injected(&self) -> bool {
        self.metadata
            .get(INJECTED_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    fn clear_outputs(&mut self) {
        if self.cell_type == CellKind::Code {
            self.outputs = Some(Vec::new());
            self.extra
                .insert("execution_count".to_string(), Value::Null);
        }
    }
}

impl Notebook {
    /// Load a notebook from an `.ipynb` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::notebook_read(path, &e))?;
        Self::parse(&content).map_err(|e| match e {
            Error::Json(json) => Error::NotebookParse {
                path: path.display().to_string(),
                error: json.to_string(),
            },
            other => other,
        })
    }

    /// Parse notebook JSON
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Write the notebook as indented JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Cells as a host reports them; code cell `i` displays in `cell-i`
    pub fn host_cells(&self) -> Vec<HostCell> {
        self.cells
            .iter()
            .enumerate()
            .map(|(index, cell)| match cell.cell_type {
                CellKind::Code => HostCell::code(
                    cell.outputs
                        .iter()
                        .flatten()
                        .map(Output::to_raw)
                        .collect(),
                    Some(ElementRef::cell(index)),
                ),
                kind => HostCell {
                    kind,
                    outputs: Vec::new(),
                    element: None,
                },
            })
            .collect()
    }

    /// Drop the outputs and execution counts of every code cell
    pub fn clear_outputs(&mut self) {
        for cell in &mut self.cells {
            cell.clear_outputs();
        }
    }

    /// Put code cells in front of the notebook, marked as injected
    pub fn inject_leading_cells(&mut self, sources: &[String]) {
        let with_ids = self.cells_have_ids();
        let injected = sources.iter().enumerate().map(|(n, source)| {
            let mut cell = Cell::code(source);
            cell.metadata.insert(INJECTED_KEY.to_string(), json!(true));
            if with_ids {
                cell.extra
                    .insert("id".to_string(), json!(format!("nbverify-setup-{n}")));
            }
            cell
        });
        self.cells.splice(0..0, injected);
    }

    /// Remove every cell added by [`Notebook::inject_leading_cells`]
    pub fn remove_injected_cells(&mut self) {
        self.cells.retain(|cell| !cell.is_injected());
    }

    // nbformat 4.5 requires an id on every cell
    fn cells_have_ids(&self) -> bool {
        let minor = self
            .extra
            .get("nbformat_minor")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        minor >= 5
    }
}
