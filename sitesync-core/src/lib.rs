//! sitesync core library: domain types, configuration, errors.
//!
//! - [`types`]: newtypes, extracted/validated/wire records
//! - [`error`]: [`ConfigError`]
//! - [`config`]: load / save / init of `~/.sitesync/config.yaml`

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, StoreConfig, StoreKind};
pub use error::ConfigError;
pub use types::{
    BlogPost, CanonicalPath, ExtractedRecord, FieldKind, FieldValue, RecordKey, RemoteRecord,
    SiteId, DOCUMENT_COLLECTION,
};
