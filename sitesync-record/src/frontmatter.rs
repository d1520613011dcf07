//! Frontmatter extraction.
//!
//! A header block looks like:
//!
//! ```text
//! ---
//! title: "Hello"
//! tags: [rust, 'sync']
//! draft: false
//! ---
//! body…
//! ```
//!
//! Values are flat: strings, `true`/`false`, or a bracketed list of strings.
//! Nested YAML is not supported; anything that is not a boolean or a list is
//! kept verbatim as a string.

use std::fmt;

use serde::Serialize;

use sitesync_core::{ExtractedRecord, FieldValue};

const MARKER: &str = "---";

/// Result of [`extract`]: the record plus the lines that were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub record: ExtractedRecord,
    pub issues: Vec<ExtractIssue>,
    /// `false` when the text has no header block at all.
    pub has_header: bool,
}

/// A header line that could not be turned into a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractIssue {
    /// 1-based line number within the header body.
    pub line: usize,
    pub kind: ExtractIssueKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractIssueKind {
    MissingColon,
    EmptyKey,
}

impl fmt::Display for ExtractIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.kind {
            ExtractIssueKind::MissingColon => "no `key: value` separator",
            ExtractIssueKind::EmptyKey => "empty key",
        };
        write!(f, "line {}: {reason}: {:?}", self.line, self.text)
    }
}

/// Parse the header block at the top of `text`.
///
/// Returns an empty record (and no issues) when there is no header.
pub fn extract(text: &str) -> Extraction {
    let Some(body) = header_body(text) else {
        return Extraction::default();
    };

    let mut extraction = Extraction {
        has_header: true,
        ..Extraction::default()
    };

    for (idx, raw) in body.split('\n').enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            extraction.issues.push(ExtractIssue {
                line: idx + 1,
                kind: ExtractIssueKind::MissingColon,
                text: line.to_string(),
            });
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            extraction.issues.push(ExtractIssue {
                line: idx + 1,
                kind: ExtractIssueKind::EmptyKey,
                text: line.to_string(),
            });
            continue;
        }
        extraction
            .record
            .insert(key.to_string(), parse_value(value.trim()));
    }

    extraction
}

/// Slice between the opening marker line and the next line starting with
/// the marker. The body must hold at least one character.
fn header_body(text: &str) -> Option<&str> {
    let rest = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))?;
    let first = rest.chars().next()?.len_utf8();
    let close = rest[first..].find(&format!("\n{MARKER}"))? + first;
    let body = &rest[..close];
    Some(body.strip_suffix('\r').unwrap_or(body))
}

fn parse_value(raw: &str) -> FieldValue {
    let value = unquote(raw);
    match value {
        "true" => return FieldValue::Bool(true),
        "false" => return FieldValue::Bool(false),
        _ => {}
    }
    if value.len() >= 2 && value.starts_with('[') && value.ends_with(']') {
        let inner = &value[1..value.len() - 1];
        if inner.trim().is_empty() {
            return FieldValue::List(Vec::new());
        }
        return FieldValue::List(
            inner
                .split(',')
                .map(|item| unquote(item.trim()).to_string())
                .collect(),
        );
    }
    FieldValue::Str(value.to_string())
}

/// Drop one leading and one trailing quote, independently.
fn unquote(s: &str) -> &str {
    let is_quote = |c: char| c == '"' || c == '\'';
    let s = s.strip_prefix(is_quote).unwrap_or(s);
    s.strip_suffix(is_quote).unwrap_or(s)
}
