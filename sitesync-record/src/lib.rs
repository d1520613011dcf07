//! # sitesync-record
//!
//! Pure transformations from document text to a publishable record:
//!
//! text → [`frontmatter::extract`] → [`validate::validate`] →
//! [`key::derive_key`] + [`builder::build_record`]
//!
//! Nothing in this crate performs I/O.

pub mod builder;
pub mod error;
pub mod frontmatter;
pub mod key;
pub mod validate;

pub use builder::build_record;
pub use error::{RecordError, ValidationIssue, ValidationIssues};
pub use frontmatter::{extract, ExtractIssue, Extraction};
pub use key::derive_key;
pub use validate::{validate, Schema};
