//! Snapshot comparison
//!
//! Compares the baseline snapshot with the one taken after execution, cell
//! by cell at the same index. Mismatches are collected into a diagnostic
//! string of `#`-separated parts:
//!
//! - `#<i>:F` for a cell whose shape changed
//! - `#<i>/<mime>:F` for an output whose content changed
//! - `#Cell <i> ...` and `#Old output had ...` for human-readable context

use serde::Serialize;

use crate::host::{CellColor, ElementRef, Page};

use super::snapshot::{CellOutputSnapshot, CellRecord, OutputRecord};

/// Outcome for a single cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellVerdict {
    pub index: usize,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<ElementRef>,
}

/// Overall outcome of a comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub passed: bool,
    /// Concatenated `#...` parts, empty on success
    pub diagnostics: String,
    pub cells: Vec<CellVerdict>,
}

impl Verdict {
    /// `PASS`, or `FAIL` followed by the diagnostics
    pub fn status(&self) -> String {
        if self.passed {
            "PASS".to_string()
        } else {
            format!("FAIL{}", self.diagnostics)
        }
    }

    /// Indices of the cells that did not match
    pub fn failed_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells.iter().filter(|c| !c.passed).map(|c| c.index)
    }
}

/// Compare two snapshots without touching any page
pub fn compare(old: &CellOutputSnapshot, new: &CellOutputSnapshot) -> Verdict {
    let mut diagnostics = String::new();
    let mut failed = false;

    if old.len() != new.len() {
        let msg = format!(
            "Old output had {} entries but new output has {} entries",
            old.len(),
            new.len()
        );
        tracing::warn!("FAIL: {}", msg);
        push_part(&mut diagnostics, &msg);
        failed = true;
    }

    let mut cells = Vec::with_capacity(new.len());
    for (index, new_cell) in new.cells().iter().enumerate() {
        let passed = compare_cell(index, old.get(index), new_cell, &mut diagnostics);
        if !passed {
            failed = true;
        }
        cells.push(CellVerdict {
            index,
            passed,
            element: new_cell.element.clone(),
        });
    }

    Verdict {
        passed: !failed,
        diagnostics,
        cells,
    }
}

/// Compare, paint every cell element and append the status to the page
pub fn validate<P: Page + ?Sized>(
    old: &CellOutputSnapshot,
    new: &CellOutputSnapshot,
    page: &mut P,
) -> Verdict {
    tracing::debug!("Validating {} cells", new.len());
    let verdict = compare(old, new);

    for cell in &verdict.cells {
        if let Some(element) = &cell.element {
            page.paint(element, CellColor::for_verdict(cell.passed));
        }
    }
    page.append_status(&verdict.status());
    verdict
}

fn push_part(diagnostics: &mut String, part: &str) {
    diagnostics.push('#');
    diagnostics.push_str(part);
}

fn compare_cell(
    index: usize,
    old: Option<&CellRecord>,
    new: &CellRecord,
    diagnostics: &mut String,
) -> bool {
    let Some(old) = old else {
        tracing::warn!("FAIL: Cell {} has no counterpart in the old output", index);
        push_part(diagnostics, &format!("{index}:F"));
        return false;
    };

    let (old_outputs, new_outputs) = match (&old.outputs, &new.outputs) {
        (None, None) => return true,
        (None, Some(new_outputs)) => {
            let msg = format!(
                "Cell {} had no outputs but now has {}",
                index,
                new_outputs.len()
            );
            tracing::warn!("FAIL: {}", msg);
            push_part(diagnostics, &msg);
            push_part(diagnostics, &format!("{index}:F"));
            return false;
        }
        (Some(_), None) => {
            tracing::warn!("FAIL: Cell {} now has no code output but did before", index);
            push_part(diagnostics, &format!("{index}:F"));
            return false;
        }
        (Some(old_outputs), Some(new_outputs)) => (old_outputs, new_outputs),
    };

    if old_outputs.len() != new_outputs.len() {
        let msg = format!(
            "Cell {} had {} outputs but now has {}",
            index,
            old_outputs.len(),
            new_outputs.len()
        );
        tracing::warn!("FAIL: {}", msg);
        push_part(diagnostics, &msg);
        push_part(diagnostics, &format!("{index}:F"));
        return false;
    }

    let mut passed = true;
    for (old_set, new_set) in old_outputs.iter().zip(new_outputs) {
        if old_set.len() != new_set.len() {
            tracing::warn!(
                "FAIL: Cell {} output has {} MIME types, expected {}",
                index,
                new_set.len(),
                old_set.len()
            );
            push_part(diagnostics, &format!("{index}:F"));
            return false;
        }
        if let Some(mime) = first_mismatch(old_set, new_set) {
            passed = false;
            push_part(diagnostics, &format!("{index}/{mime}:F"));
        }
    }
    passed
}

/// First MIME type of `new` whose content differs from `old`
fn first_mismatch<'a>(old: &OutputRecord, new: &'a OutputRecord) -> Option<&'a str> {
    for (mime, content) in new {
        let expected = old.get(mime).and_then(Option::as_ref);
        if expected != content.as_ref() {
            tracing::warn!(
                "FAIL: Failed at {}\nExpected: {}\nbut got: {}",
                mime,
                expected.map(String::as_str).unwrap_or("<absent>"),
                content.as_deref().unwrap_or("<absent>")
            );
            return Some(mime);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RecordingPage;

    fn record(pairs: &[(&str, &str)]) -> OutputRecord {
        pairs
            .iter()
            .map(|(mime, content)| (mime.to_string(), Some(content.to_string())))
            .collect()
    }

    fn code(index: usize, outputs: Vec<OutputRecord>) -> CellRecord {
        CellRecord::code(outputs, Some(ElementRef::cell(index)))
    }

    fn snapshot(cells: Vec<CellRecord>) -> CellOutputSnapshot {
        CellOutputSnapshot::new(cells)
    }

    #[test]
    fn test_identical_snapshots_pass_and_paint_green() {
        let cells = vec![
            CellRecord::non_code(),
            code(1, vec![record(&[("text/plain", "42")])]),
            code(2, Vec::new()),
        ];
        let mut page = RecordingPage::new();
        let verdict = validate(&snapshot(cells.clone()), &snapshot(cells), &mut page);

        assert!(verdict.passed);
        assert_eq!(page.status(), Some("PASS"));
        assert_eq!(page.painted.len(), 2);
        assert!(page.painted.iter().all(|(_, c)| *c == CellColor::Green));
    }

    #[test]
    fn test_null_to_empty_outputs_fails() {
        let old = snapshot(vec![CellRecord::non_code()]);
        let new = snapshot(vec![CellRecord::code(Vec::new(), None)]);
        let verdict = compare(&old, &new);

        assert!(!verdict.passed);
        assert_eq!(verdict.failed_cells().collect::<Vec<_>>(), vec![0]);
        assert_eq!(
            verdict.status(),
            "FAIL#Cell 0 had no outputs but now has 0#0:F"
        );
    }

    #[test]
    fn test_code_to_non_code_fails() {
        let old = snapshot(vec![code(0, Vec::new())]);
        let new = snapshot(vec![CellRecord::non_code()]);
        assert_eq!(compare(&old, &new).status(), "FAIL#0:F");
    }

    #[test]
    fn test_output_count_mismatch() {
        let old = snapshot(vec![code(0, vec![record(&[("text/plain", "a")])])]);
        let new = snapshot(vec![code(0, Vec::new())]);
        assert_eq!(
            compare(&old, &new).status(),
            "FAIL#Cell 0 had 1 outputs but now has 0#0:F"
        );
    }

    #[test]
    fn test_mime_mismatch_reports_first_type_per_entry() {
        let old = snapshot(vec![code(
            0,
            vec![
                record(&[("text/html", "<b>a</b>"), ("text/plain", "a")]),
                record(&[("text/plain", "b")]),
            ],
        )]);
        let new = snapshot(vec![code(
            0,
            vec![
                record(&[("text/html", "<b>x</b>"), ("text/plain", "x")]),
                record(&[("text/plain", "y")]),
            ],
        )]);
        let mut page = RecordingPage::new();
        let verdict = validate(&old, &new, &mut page);

        assert_eq!(verdict.status(), "FAIL#0/text/html:F#0/text/plain:F");
        assert_eq!(page.color_of(&ElementRef::cell(0)), Some(CellColor::Red));
    }

    #[test]
    fn test_mime_key_count_mismatch_stops_cell() {
        let old = snapshot(vec![code(
            0,
            vec![record(&[("text/plain", "a")]), record(&[("text/plain", "b")])],
        )]);
        let new = snapshot(vec![code(
            0,
            vec![
                record(&[("text/plain", "a"), ("text/html", "a")]),
                record(&[("text/plain", "changed")]),
            ],
        )]);
        assert_eq!(compare(&old, &new).status(), "FAIL#0:F");
    }

    #[test]
    fn test_length_mismatch_keeps_comparing() {
        let old = snapshot(vec![code(0, vec![record(&[("text/plain", "a")])])]);
        let new = snapshot(vec![
            code(0, vec![record(&[("text/plain", "a")])]),
            code(1, Vec::new()),
        ]);
        let verdict = compare(&old, &new);

        assert!(!verdict.passed);
        assert_eq!(
            verdict.diagnostics,
            "#Old output had 1 entries but new output has 2 entries#1:F"
        );
        assert!(verdict.cells[0].passed);
        assert!(!verdict.cells[1].passed);
    }

    #[test]
    fn test_equal_lengths_never_report_length() {
        let old = snapshot(vec![code(0, vec![record(&[("text/plain", "a")])])]);
        let new = snapshot(vec![code(0, vec![record(&[("text/plain", "b")])])]);
        let verdict = compare(&old, &new);
        assert!(!verdict.diagnostics.contains("entries"));
    }

    #[test]
    fn test_absent_payload_equals_missing_key() {
        let mut with_absent = record(&[("text/plain", "a")]);
        with_absent.insert("text/html".to_string(), None);
        let old = snapshot(vec![code(
            0,
            vec![record(&[("text/plain", "a"), ("image/png", "...")])],
        )]);
        let new = snapshot(vec![code(0, vec![with_absent])]);
        assert!(compare(&old, &new).passed);
    }

    #[test]
    fn test_cells_without_element_are_not_painted() {
        let cells = vec![CellRecord::code(Vec::new(), None)];
        let mut page = RecordingPage::new();
        validate(&snapshot(cells.clone()), &snapshot(cells), &mut page);
        assert!(page.painted.is_empty());
        assert_eq!(page.statuses, vec!["PASS".to_string()]);
    }
}
