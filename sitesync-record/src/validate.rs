//! Blog-post schema validation.
//!
//! | Field         | Type         | Required |
//! |---------------|--------------|----------|
//! | `title`       | string       | yes      |
//! | `date`        | string       | yes      |
//! | `description` | string       | yes      |
//! | `slug`        | string       | yes      |
//! | `excerpt`     | string       | no       |
//! | `author`      | string       | no       |
//! | `tags`        | string list  | no       |
//! | `draft`       | boolean      | no (defaults to `false`) |
//!
//! Unknown fields are dropped. `path` is never read from the record; it is
//! computed from `slug`.

use sitesync_core::{
    config::DEFAULT_PATH_PREFIX, BlogPost, ExtractedRecord, FieldKind, FieldValue,
};

use crate::error::{ValidationIssue, ValidationIssues};

/// Schema parameters that vary per site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Prefix joined with the slug to form the public path.
    pub path_prefix: String,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            path_prefix: DEFAULT_PATH_PREFIX.to_string(),
        }
    }
}

impl Schema {
    pub fn new(path_prefix: impl Into<String>) -> Self {
        Self {
            path_prefix: path_prefix.into(),
        }
    }

    /// `/blog` + `hello-world` → `/blog/hello-world`.
    pub fn path_for(&self, slug: &str) -> String {
        format!("{}/{}", self.path_prefix.trim_end_matches('/'), slug)
    }
}

/// Validate an extracted record, collecting every issue before failing.
pub fn validate(record: &ExtractedRecord, schema: &Schema) -> Result<BlogPost, ValidationIssues> {
    let mut issues = Vec::new();

    let title = required_str(record, "title", &mut issues);
    let date = required_str(record, "date", &mut issues);
    let description = required_str(record, "description", &mut issues);
    let slug = required_str(record, "slug", &mut issues);
    let excerpt = optional_str(record, "excerpt", &mut issues);
    let author = optional_str(record, "author", &mut issues);
    let tags = optional_list(record, "tags", &mut issues);
    let draft = optional_bool(record, "draft", &mut issues);

    if matches!(&slug, Some(s) if s.trim().is_empty()) {
        issues.push(ValidationIssue::Empty { field: "slug" });
    }

    match (title, date, description, slug) {
        (Some(title), Some(date), Some(description), Some(slug)) if issues.is_empty() => {
            Ok(BlogPost {
                path: schema.path_for(&slug),
                title,
                date,
                description,
                slug,
                excerpt,
                author,
                tags,
                draft: draft.unwrap_or(false),
            })
        }
        _ => Err(ValidationIssues(issues)),
    }
}

fn required_str(
    record: &ExtractedRecord,
    field: &'static str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<String> {
    if !record.contains_key(field) {
        issues.push(ValidationIssue::Missing { field });
        return None;
    }
    optional_str(record, field, issues)
}

fn optional_str(
    record: &ExtractedRecord,
    field: &'static str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<String> {
    match record.get(field)? {
        FieldValue::Str(s) => Some(s.clone()),
        other => {
            issues.push(wrong_type(field, FieldKind::String, other));
            None
        }
    }
}

fn optional_list(
    record: &ExtractedRecord,
    field: &'static str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<Vec<String>> {
    match record.get(field)? {
        FieldValue::List(items) => Some(items.clone()),
        other => {
            issues.push(wrong_type(field, FieldKind::List, other));
            None
        }
    }
}

fn optional_bool(
    record: &ExtractedRecord,
    field: &'static str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<bool> {
    match record.get(field)? {
        FieldValue::Bool(b) => Some(*b),
        other => {
            issues.push(wrong_type(field, FieldKind::Boolean, other));
            None
        }
    }
}

fn wrong_type(field: &'static str, expected: FieldKind, found: &FieldValue) -> ValidationIssue {
    ValidationIssue::WrongType {
        field,
        expected,
        found: found.kind(),
    }
}
