//! Domain types for the sitesync engine.
//!
//! Filesystem locations stay `PathBuf`; a document's identity inside the
//! engine is its [`CanonicalPath`], which is location-derived and
//! `/`-separated regardless of platform.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

/// Collection NSID of the records this engine publishes.
pub const DOCUMENT_COLLECTION: &str = "site.standard.document";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// The site identifier stamped on every published record (a URI such as
/// `https://example.dev`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(pub String);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for SiteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SiteId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Stable identity of a source document: its path relative to the content
/// root, joined with `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalPath(pub String);

impl CanonicalPath {
    /// Build from a path relative to the content root.
    ///
    /// Returns `None` for paths that escape the root (`..`), are absolute, or
    /// are empty.
    pub fn from_relative(path: &Path) -> Option<Self> {
        let mut parts = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => return None,
            }
        }
        if parts.is_empty() {
            return None;
        }
        Some(Self(parts.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for CanonicalPath {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Record key (`rkey`) under which a record is stored in its collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(pub String);

impl RecordKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Extracted frontmatter
// ---------------------------------------------------------------------------

/// A single frontmatter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    List(Vec<String>),
    Str(String),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Bool(_) => FieldKind::Boolean,
            FieldValue::List(_) => FieldKind::List,
            FieldValue::Str(_) => FieldKind::String,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_owned())
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(items: Vec<&str>) -> Self {
        FieldValue::List(items.into_iter().map(str::to_owned).collect())
    }
}

/// Shape of a [`FieldValue`], used in validation diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Boolean,
    List,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::String => write!(f, "string"),
            FieldKind::Boolean => write!(f, "boolean"),
            FieldKind::List => write!(f, "list of strings"),
        }
    }
}

/// Flat frontmatter record. Sorted keys keep diagnostics and hashing stable.
pub type ExtractedRecord = BTreeMap<String, FieldValue>;

// ---------------------------------------------------------------------------
// Validated and wire records
// ---------------------------------------------------------------------------

/// A blog post whose frontmatter passed schema validation.
///
/// Field order is part of the content hash; do not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPost {
    pub title: String,
    pub date: String,
    pub description: String,
    pub slug: String,
    /// Always derived from `slug`; a raw `path` field is never trusted.
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub draft: bool,
}

/// Wire shape of a `site.standard.document` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    #[serde(rename = "$type")]
    pub record_type: String,
    pub site: SiteId,
    pub path: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub published_at: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn newtype_display() {
        assert_eq!(SiteId::from("https://example.dev").to_string(), "https://example.dev");
        assert_eq!(CanonicalPath::from("2024/hello.md").to_string(), "2024/hello.md");
        assert_eq!(RecordKey("3knoysa7s2225".into()).to_string(), "3knoysa7s2225");
    }

    #[test]
    fn canonical_path_joins_components_with_slash() {
        let path = PathBuf::from("2024").join("march").join("hello.md");
        let canonical = CanonicalPath::from_relative(&path).expect("relative path");
        assert_eq!(canonical.as_str(), "2024/march/hello.md");
    }

    #[test]
    fn canonical_path_rejects_escaping_paths() {
        assert!(CanonicalPath::from_relative(Path::new("../outside.md")).is_none());
        assert!(CanonicalPath::from_relative(Path::new("/abs/post.md")).is_none());
        assert!(CanonicalPath::from_relative(Path::new("")).is_none());
    }

    #[test]
    fn field_kind_display() {
        assert_eq!(FieldValue::from("x").kind().to_string(), "string");
        assert_eq!(FieldValue::from(true).kind().to_string(), "boolean");
        assert_eq!(FieldValue::from(vec!["a"]).kind().to_string(), "list of strings");
    }

    #[test]
    fn remote_record_uses_wire_field_names() {
        let record = RemoteRecord {
            record_type: DOCUMENT_COLLECTION.to_string(),
            site: SiteId::from("https://example.dev"),
            path: "/blog/hello".to_string(),
            title: "Hello".to_string(),
            description: None,
            tags: None,
            published_at: "2024-03-15T00:00:00.000Z".to_string(),
        };
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["$type"], "site.standard.document");
        assert_eq!(json["publishedAt"], "2024-03-15T00:00:00.000Z");
        assert!(json.get("description").is_none());
        assert!(json.get("tags").is_none());
    }
}
