//! Cell output snapshots
//!
//! A snapshot is the scrubbed output of every cell at one point in time.
//! Index `i` of a snapshot is cell `i` of the notebook.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::Result;
use crate::host::{CellKind, ElementRef, HostCell, NotebookHost, RawOutput};

use super::scrub::scrub;

/// One output entry: MIME type to scrubbed content
///
/// Keys iterate in sorted order. `None` marks a MIME type whose payload was absent.
pub type OutputRecord = BTreeMap<String, Option<String>>;

/// Captured outputs of a single cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRecord {
    /// `None` for non-code cells, possibly empty for code cells
    pub outputs: Option<Vec<OutputRecord>>,

    /// Display element of a code cell, painted after comparison
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<ElementRef>,
}

impl CellRecord {
    /// Record for a markdown/raw cell
    pub fn non_code() -> Self {
        Self {
            outputs: None,
            element: None,
        }
    }

    /// Record for a code cell
    pub fn code(outputs: Vec<OutputRecord>, element: Option<ElementRef>) -> Self {
        Self {
            outputs: Some(outputs),
            element,
        }
    }
}

/// Ordered per-cell records captured at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellOutputSnapshot {
    cells: Vec<CellRecord>,
}

impl CellOutputSnapshot {
    pub fn new(cells: Vec<CellRecord>) -> Self {
        Self { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CellRecord> {
        self.cells.get(index)
    }

    pub fn cells(&self) -> &[CellRecord] {
        &self.cells
    }
}

/// Scrub one MIME payload
///
/// Strings and nbformat multi-line strings (arrays of strings) are scrubbed;
/// any other JSON value is kept as its compact JSON text.
pub fn normalize_payload(payload: &Value) -> Option<String> {
    match payload {
        Value::Null => None,
        Value::String(text) => Some(scrub(text)),
        Value::Array(lines) if lines.iter().all(Value::is_string) => {
            let joined: String = lines.iter().filter_map(Value::as_str).collect();
            Some(scrub(&joined))
        }
        other => Some(other.to_string()),
    }
}

fn normalize_output(output: &RawOutput) -> OutputRecord {
    output
        .data
        .iter()
        .map(|(mime, payload)| (mime.clone(), normalize_payload(payload)))
        .collect()
}

/// Build a snapshot from cells already read from a host
pub fn capture_cells(cells: &[HostCell]) -> CellOutputSnapshot {
    let records = cells
        .iter()
        .map(|cell| match cell.kind {
            CellKind::Code => CellRecord::code(
                cell.outputs.iter().map(normalize_output).collect(),
                cell.element.clone(),
            ),
            CellKind::Markdown | CellKind::Raw => CellRecord::non_code(),
        })
        .collect();
    CellOutputSnapshot::new(records)
}

/// Capture the current output of every cell of the host notebook
///
/// Reads only; the host's outputs are left untouched.
pub async fn capture<H: NotebookHost + ?Sized>(host: &H) -> Result<CellOutputSnapshot> {
    let cells = host.cells().await?;
    let snapshot = capture_cells(&cells);
    tracing::debug!(cells = snapshot.len(), "Captured cell outputs");
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawOutput {
        RawOutput::from_value(value)
    }

    #[test]
    fn test_normalize_payload_variants() {
        assert_eq!(normalize_payload(&Value::Null), None);
        assert_eq!(
            normalize_payload(&json!("job_x1 done")),
            Some("job_ done".to_string())
        );
        assert_eq!(
            normalize_payload(&json!(["line job_a\n", "second\n"])),
            Some("line job_\nsecond\n".to_string())
        );
        // structured payloads are compared as JSON, unscrubbed
        assert_eq!(
            normalize_payload(&json!({"job": "job_a"})),
            Some(r#"{"job":"job_a"}"#.to_string())
        );
    }

    #[test]
    fn test_capture_cells_shapes() {
        let cells = vec![
            HostCell::markdown(),
            HostCell::code(
                vec![raw(json!({"text/plain": "<obj at 0xabc>", "text/html": null}))],
                Some(ElementRef::cell(1)),
            ),
            HostCell::code(Vec::new(), Some(ElementRef::cell(2))),
        ];
        let snapshot = capture_cells(&cells);

        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.get(0), Some(&CellRecord::non_code()));

        let code = snapshot.get(1).unwrap();
        let outputs = code.outputs.as_ref().unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0]["text/plain"], Some("<obj>".to_string()));
        assert_eq!(outputs[0]["text/html"], None);
        assert_eq!(code.element, Some(ElementRef::cell(1)));

        assert_eq!(snapshot.get(2).unwrap().outputs, Some(Vec::new()));
    }

    #[test]
    fn test_capture_is_deterministic() {
        let cells = vec![HostCell::code(
            vec![raw(json!({"text/html": "<tbody><td>1</td></tbody>", "text/plain": "job_q"}))],
            None,
        )];
        assert_eq!(capture_cells(&cells), capture_cells(&cells));
    }

    #[test]
    fn test_snapshot_serializes_as_list() {
        let snapshot = CellOutputSnapshot::new(vec![CellRecord::non_code()]);
        assert_eq!(
            serde_json::to_string(&snapshot).unwrap(),
            r#"[{"outputs":null}]"#
        );
    }
}
