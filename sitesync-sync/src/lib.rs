//! # sitesync-sync
//!
//! Hash-gated publishing of source documents to a remote record store.
//!
//! Build an [`Orchestrator`] from a content source, a record store and
//! [`Settings`], then call [`Orchestrator::full_pass`] for the whole document
//! set or [`Orchestrator::sync_changed`] for one file-change notification.

pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod source;
pub mod state;
pub mod store;

pub use error::{DocumentError, PublishError, SyncError};
pub use pipeline::SyncScope;
pub use orchestrator::{
    CheckReport, CheckStatus, DocumentOutcome, DocumentReport, Orchestrator, PassReport, Settings,
};
pub use source::{collect_dirs, ContentSource, FsContentSource};
pub use state::{content_hash, SyncState};
pub use store::{DryRunStore, MemoryStore, RecordStore, XrpcStore};
