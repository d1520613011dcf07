//! Remote record stores.
//!
//! The engine relies on one property only: `put` with an existing key
//! overwrites the record stored under it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::json;

use sitesync_core::{config::StoreConfig, RecordKey, RemoteRecord, StoreKind};

use crate::error::{PublishError, SyncError};

/// Overwrite-by-key record store.
pub trait RecordStore: Send + Sync {
    fn put(
        &self,
        collection: &str,
        record: &RemoteRecord,
        key: &RecordKey,
    ) -> Result<(), PublishError>;
}

/// Build the store described by `config`. `dry_run` forces [`DryRunStore`].
pub fn from_config(config: &StoreConfig, dry_run: bool) -> Result<Arc<dyn RecordStore>, SyncError> {
    if dry_run {
        return Ok(Arc::new(DryRunStore));
    }
    match config.kind {
        StoreKind::DryRun => Ok(Arc::new(DryRunStore)),
        StoreKind::Xrpc => Ok(Arc::new(XrpcStore::from_config(config)?)),
    }
}

// ---------------------------------------------------------------------------
// DryRunStore
// ---------------------------------------------------------------------------

/// Logs each record instead of sending it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunStore;

impl RecordStore for DryRunStore {
    fn put(
        &self,
        collection: &str,
        record: &RemoteRecord,
        key: &RecordKey,
    ) -> Result<(), PublishError> {
        let body = serde_json::to_string_pretty(record)?;
        tracing::info!("[dry-run] would put {collection}/{key}:\n{body}");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-process store keyed by `(collection, key)`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<(String, RecordKey), RemoteRecord>>,
    puts: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `put` calls accepted so far, overwrites included.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn get(&self, collection: &str, key: &RecordKey) -> Option<RemoteRecord> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records
            .get(&(collection.to_string(), key.clone()))
            .cloned()
    }

    /// Number of distinct records held.
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for MemoryStore {
    fn put(
        &self,
        collection: &str,
        record: &RemoteRecord,
        key: &RecordKey,
    ) -> Result<(), PublishError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.insert((collection.to_string(), key.clone()), record.clone());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// XrpcStore
// ---------------------------------------------------------------------------

const PUT_RECORD_METHOD: &str = "com.atproto.repo.putRecord";

/// `com.atproto.repo.putRecord` over HTTP.
///
/// Authenticates with a pre-issued bearer token taken from the environment;
/// creating or refreshing sessions is left to whoever issues that token.
pub struct XrpcStore {
    agent: ureq::Agent,
    endpoint: String,
    repo: String,
    token: Option<String>,
}

impl XrpcStore {
    pub fn new(
        endpoint: impl Into<String>,
        repo: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            endpoint: endpoint.into(),
            repo: repo.into(),
            token,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self, SyncError> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| SyncError::Store("store.endpoint is not set".to_string()))?;
        let repo = config
            .repo
            .clone()
            .ok_or_else(|| SyncError::Store("store.repo is not set".to_string()))?;
        let token = std::env::var(&config.token_env).ok().filter(|t| !t.is_empty());
        if token.is_none() {
            tracing::warn!(
                "${} is not set; publishing without an access token",
                config.token_env
            );
        }
        Ok(Self::new(
            endpoint,
            repo,
            token,
            Duration::from_secs(config.timeout_secs),
        ))
    }

    fn url(&self) -> String {
        format!("{}/xrpc/{PUT_RECORD_METHOD}", self.endpoint.trim_end_matches('/'))
    }
}

impl std::fmt::Debug for XrpcStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XrpcStore")
            .field("endpoint", &self.endpoint)
            .field("repo", &self.repo)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl RecordStore for XrpcStore {
    fn put(
        &self,
        collection: &str,
        record: &RemoteRecord,
        key: &RecordKey,
    ) -> Result<(), PublishError> {
        let body = json!({
            "repo": self.repo,
            "collection": collection,
            "rkey": key.as_str(),
            "record": serde_json::to_value(record)?,
        });

        let mut request = self.agent.post(&self.url());
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        match request.send_json(body) {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(status, response)) => Err(PublishError::Rejected {
                status,
                body: response.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(transport)) => {
                Err(PublishError::Transport(transport.to_string()))
            }
        }
    }
}
