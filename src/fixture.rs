//! Recorded-interaction fixtures (cassettes)
//!
//! When enabled, the kernel wraps its HTTP traffic in a vcrpy cassette
//! stored next to the notebook. Requests are matched on their URI with the
//! project id removed, so recordings replay under any project.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// Query parameter that turns fixtures on (`?vcr=1`)
pub const QUERY_FLAG: &str = "vcr";

/// Closes the cassette opened by [`Fixture::setup_code`] and writes it out
pub const TEARDOWN_CODE: &str = "cassette.__exit__(None, None, None)\n";

static PROJECT_SEGMENT_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"/v2/projects/[^/]*/").ok());

/// Cassette bound to one notebook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    cassette_file: String,
}

impl Fixture {
    /// Cassette named after the notebook path plus `extension`
    pub fn for_notebook(notebook_path: &str, extension: &str) -> Self {
        Self {
            cassette_file: format!("{notebook_path}{extension}"),
        }
    }

    pub fn cassette_file(&self) -> &str {
        &self.cassette_file
    }

    /// Kernel code that opens the cassette
    pub fn setup_code(&self) -> String {
        format!(
            concat!(
                "import vcr\n",
                "import re\n",
                "\n",
                "cassette_file = '{}'\n",
                "def scrub_project(uri):\n",
                "  return re.sub(r'/v2/projects/[^/]*/', '/v2/projects//', uri)\n",
                "def datalab_matcher(r1, r2):\n",
                "  return scrub_project(r1.uri) == scrub_project(r2.uri)\n",
                "\n",
                "myvcr = vcr.VCR()\n",
                "myvcr.register_matcher('datalab', datalab_matcher)\n",
                "myvcr.match_on = ['datalab']\n",
                "cassette = myvcr.use_cassette(cassette_file)\n",
                "cassette.__enter__()\n",
            ),
            python_quote(&self.cassette_file)
        )
    }

    pub fn teardown_code(&self) -> &'static str {
        TEARDOWN_CODE
    }
}

/// Escape a value for a single-quoted Python string literal
fn python_quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Request key used to match recorded interactions: the URI without its project id
pub fn scrub_project(uri: &str) -> String {
    match PROJECT_SEGMENT_REGEX.as_ref() {
        Some(re) => re.replace_all(uri, "/v2/projects//").into_owned(),
        None => uri.to_string(),
    }
}

/// Read `name` from a URL query string such as `?vcr=1&x=2`
///
/// `+` decodes to a space and `%XX` escapes are decoded. Malformed escapes
/// leave the raw value.
pub fn parse_query_param(query: &str, name: &str) -> Option<String> {
    let pattern = format!("[?&]{}=([^&]*)", regex::escape(name));
    let re = Regex::new(&pattern).ok()?;
    let raw = re.captures(query)?.get(1)?.as_str().replace('+', " ");
    let decoded = urlencoding::decode(&raw)
        .map(Cow::into_owned)
        .unwrap_or(raw);
    Some(decoded)
}

/// Whether the query string enables fixtures
pub fn enabled_in_query(query: &str) -> bool {
    parse_query_param(query, QUERY_FLAG).as_deref() == Some("1")
}
