//! Error types for sitesync-record.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use sitesync_core::FieldKind;

/// Failures deriving a key or timestamp from a validated record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// `date` is neither `YYYY-MM-DD` nor an RFC 3339 date-time.
    #[error("unparsable publish date '{value}'")]
    InvalidDate { value: String },

    /// Record keys count microseconds from the Unix epoch.
    #[error("publish date '{value}' is outside the representable key range")]
    DateOutOfRange { value: String },

    #[error("clock id {clock_id} exceeds the 10-bit key field")]
    ClockIdOutOfRange { clock_id: u16 },
}

/// One schema violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ValidationIssue {
    Missing {
        field: &'static str,
    },
    WrongType {
        field: &'static str,
        expected: FieldKind,
        found: FieldKind,
    },
    Empty {
        field: &'static str,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::Missing { field } => write!(f, "`{field}` is required"),
            ValidationIssue::WrongType {
                field,
                expected,
                found,
            } => write!(f, "`{field}` must be a {expected}, found {found}"),
            ValidationIssue::Empty { field } => write!(f, "`{field}` must not be empty"),
        }
    }
}

/// Every violation found in one record, in schema field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(transparent)]
pub struct ValidationIssues(pub Vec<ValidationIssue>);

impl ValidationIssues {
    pub fn iter(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationIssues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}
