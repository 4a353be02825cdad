//! Output scrubbing
//!
//! Removes substrings that change from run to run (job ids, DOM ids, memory
//! addresses, chart cache indices, query row payloads, table contents) so
//! that two executions of the same notebook compare equal.
//!
//! Every rule is a separate function; [`scrub`] applies them in [`RULES`] order.

use regex::Regex;
use std::sync::LazyLock;

static JOB_ID_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"job_[A-Za-z0-9_\-]+").ok());

static ELEMENT_BINDING_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"element![0-9_]+").ok());

static DOM_ID_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#""[0-9][0-9]?_[0-9]+""#).ok());

static MEMORY_ADDRESS_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r" at 0x[0-9abcdef]+>").ok());

static CHART_INDEX_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"dataName:"[0-9]+""#).ok());

// `.` stops at newlines, so a payload never swallows the following lines
static QUERY_ROWS_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"\{"rows": \[.*\]\}\);"#).ok());

static ROW_COUNT_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"<br />\(rows: ([0-9]+),[^<]*<").ok());

static TABLE_HEADER_CELL_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"<th>[^<]*</th>").ok());

static TABLE_DATA_CELL_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"<td>[^<]*</td>").ok());

const TABLE_BODY_TAG: &str = "<tbody>";

/// A named scrubbing rule
pub type Rule = fn(&str) -> String;

/// All rules, in the order they are applied
pub const RULES: &[(&str, Rule)] = &[
    ("job_ids", scrub_job_ids),
    ("element_bindings", scrub_element_bindings),
    ("dom_ids", scrub_dom_ids),
    ("memory_addresses", scrub_memory_addresses),
    ("chart_indices", scrub_chart_indices),
    ("query_rows", scrub_query_rows),
    ("row_counts", scrub_row_counts),
    ("table_body", scrub_table_body),
];

fn replace_all(regex: &LazyLock<Option<Regex>>, input: &str, replacement: &str) -> String {
    match regex.as_ref() {
        Some(re) => re.replace_all(input, replacement).into_owned(),
        None => input.to_string(),
    }
}

/// `job_AbC123_xyz` → `job_`
pub fn scrub_job_ids(input: &str) -> String {
    replace_all(&JOB_ID_REGEX, input, "job_")
}

/// `element!42` → `element!`
pub fn scrub_element_bindings(input: &str) -> String {
    replace_all(&ELEMENT_BINDING_REGEX, input, "element!")
}

/// `"3_1700000000"` → `id`
pub fn scrub_dom_ids(input: &str) -> String {
    replace_all(&DOM_ID_REGEX, input, "id")
}

/// `<Foo object at 0x7fabf12>` → `<Foo object>`
pub fn scrub_memory_addresses(input: &str) -> String {
    replace_all(&MEMORY_ADDRESS_REGEX, input, ">")
}

/// `dataName:"482910"` → `dataName`
pub fn scrub_chart_indices(input: &str) -> String {
    replace_all(&CHART_INDEX_REGEX, input, "dataName")
}

/// `render({"rows": [...]});` → `render(ROWS);`
pub fn scrub_query_rows(input: &str) -> String {
    replace_all(&QUERY_ROWS_REGEX, input, "ROWS);")
}

/// `<br />(rows: 5, time: 1.2s, cached)<` → `<br />(rows: 5)<`
pub fn scrub_row_counts(input: &str) -> String {
    replace_all(&ROW_COUNT_REGEX, input, "<br />(rows: ${1})<")
}

/// Blank out `<th>`/`<td>` elements from the first `<tbody>` onwards.
///
/// Everything before the tag, including a `<thead>`, is left as is.
pub fn scrub_table_body(input: &str) -> String {
    let Some(start) = input.find(TABLE_BODY_TAG) else {
        return input.to_string();
    };
    let (head, body) = input.split_at(start);
    let body = replace_all(&TABLE_HEADER_CELL_REGEX, body, "<TH>");
    let body = replace_all(&TABLE_DATA_CELL_REGEX, &body, "<TD>");
    format!("{head}{body}")
}

fn apply_rules(input: &str) -> String {
    RULES
        .iter()
        .fold(input.to_string(), |acc, (_, rule)| rule(&acc))
}

/// Apply every rule, in order, until the text stops changing.
///
/// A rule's replacement can expose a match for an earlier rule
/// (`job_"12_345"` → `job_id` → `job_`). Every replacement is shorter than
/// what it matched, so the loop ends.
pub fn scrub(input: &str) -> String {
    let mut current = apply_rules(input);
    loop {
        let next = apply_rules(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_ids() {
        assert_eq!(scrub_job_ids("job_AbC123_xyz finished"), "job_ finished");
        assert_eq!(scrub_job_ids("job_a-b job_c"), "job_ job_");
    }

    #[test]
    fn test_element_bindings() {
        assert_eq!(
            scrub_element_bindings("require(['element!12_3'])"),
            "require(['element!'])"
        );
    }

    #[test]
    fn test_dom_ids() {
        assert_eq!(
            scrub_dom_ids(r#"<div id="3_1449772934">"#),
            "<div id=id>"
        );
        // three leading digits is not a generated id
        assert_eq!(scrub_dom_ids(r#""123_4""#), r#""123_4""#);
    }

    #[test]
    fn test_memory_addresses() {
        assert_eq!(scrub_memory_addresses("<div>... at 0x7fabf12>"), "<div>...>");
        assert_eq!(
            scrub_memory_addresses("<Table object at 0x10a2b3c4d>"),
            "<Table object>"
        );
    }

    #[test]
    fn test_chart_indices() {
        assert_eq!(scrub_chart_indices(r#"dataName:"482910""#), "dataName");
    }

    #[test]
    fn test_query_rows() {
        let input = "charts.render({\"rows\": [{\"a\": 1}, {\"a\": 2}]});\nnext line";
        assert_eq!(scrub_query_rows(input), "charts.render(ROWS);\nnext line");
    }

    #[test]
    fn test_query_rows_does_not_cross_lines() {
        let input = "{\"rows\": [1,\n2]});";
        assert_eq!(scrub_query_rows(input), input);
    }

    #[test]
    fn test_row_counts() {
        assert_eq!(
            scrub_row_counts("<br />(rows: 12, time: 3.1s, 10KB processed, job: x)</div>"),
            "<br />(rows: 12)</div>"
        );
    }

    #[test]
    fn test_table_body_keeps_head() {
        let input = "<thead><th>Name</th></thead><tbody><td>Alice</td></tbody>";
        assert_eq!(
            scrub_table_body(input),
            "<thead><th>Name</th></thead><tbody><TD></tbody>"
        );
    }

    #[test]
    fn test_table_body_header_cells() {
        let input = "<table><tbody><tr><th>0</th><td>x</td><td>y</td></tr></tbody></table>";
        assert_eq!(
            scrub_table_body(input),
            "<table><tbody><tr><TH><TD><TD></tr></tbody></table>"
        );
    }

    #[test]
    fn test_table_body_without_tbody_untouched() {
        let input = "<table><tr><td>x</td></tr></table>";
        assert_eq!(scrub_table_body(input), input);
    }

    #[test]
    fn test_scrub_applies_all_rules() {
        let input = concat!(
            "Job job_Zx9 done <Result at 0xdeadbeef>\n",
            "<div id=\"1_99\"></div><script>require(['element!7'], dataName:\"5\")</script>"
        );
        assert_eq!(
            scrub(input),
            "Job job_ done <Result>\n<div id=id></div><script>require(['element!'], dataName)</script>"
        );
    }

    #[test]
    fn test_scrub_is_idempotent() {
        let samples = [
            "job_AbC123_xyz finished",
            "<div>... at 0x7fabf12>",
            r#"dataName:"482910""#,
            "<thead><th>Name</th></thead><tbody><td>Alice</td></tbody>",
            "x({\"rows\": [1, 2, 3]}); <br />(rows: 3, 1s)<b>",
            "plain text with nothing to scrub",
            // replacements that expose an earlier rule's pattern
            "job_\"12_345\"",
            "job_{\"rows\": [1]});",
        ];
        for sample in samples {
            let once = scrub(sample);
            assert_eq!(scrub(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_scrub_reaches_fixpoint() {
        assert_eq!(scrub("job_\"12_345\""), "job_");
        assert_eq!(scrub("job_{\"rows\": [1]});"), "job_);");
    }

    #[test]
    fn test_rule_names_are_unique() {
        let mut names: Vec<&str> = RULES.iter().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), RULES.len());
    }
}
