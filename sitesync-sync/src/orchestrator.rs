//! Sync orchestration.
//!
//! ## Per-document pipeline
//!
//! 1. Read the raw text from the content source.
//! 2. Extract frontmatter.
//! 3. Validate against the blog-post schema → abort this document on failure.
//! 4. Skip drafts.
//! 5. Hash the validated post; skip if SyncState holds the same hash.
//! 6. Derive the record key and build the wire record.
//! 7. `put` into the record store.
//! 8. Record the hash in SyncState.
//!
//! Errors from any step end the document, never the pass.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use sitesync_core::{
    BlogPost, CanonicalPath, Config, RecordKey, RemoteRecord, SiteId, DOCUMENT_COLLECTION,
};
use sitesync_record::{
    build_record, derive_key, extract, validate, ExtractIssue, Schema, ValidationIssues,
};

use crate::error::{DocumentError, SyncError};
use crate::source::{ContentSource, FsContentSource};
use crate::state::{content_hash, SyncState};
use crate::store::{self, RecordStore};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Per-site parameters of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub site: SiteId,
    pub collection: String,
    pub schema: Schema,
    pub clock_id: u16,
    /// Worker threads for a full pass.
    pub concurrency: usize,
}

impl Settings {
    pub fn new(site: SiteId) -> Self {
        Self {
            site,
            collection: DOCUMENT_COLLECTION.to_string(),
            schema: Schema::default(),
            clock_id: sitesync_core::config::DEFAULT_CLOCK_ID,
            concurrency: 1,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            site: config.site.clone(),
            collection: config.collection.clone(),
            schema: Schema::new(config.path_prefix.clone()),
            clock_id: config.clock_id,
            concurrency: config.concurrency.max(1),
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Terminal state of one document in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DocumentOutcome {
    /// The store accepted the record under `key`.
    Published { key: RecordKey, record_path: String },
    SkippedDraft { record_path: String },
    /// Same content as the last successful publish.
    SkippedUnchanged { record_path: String },
    Invalid { issues: ValidationIssues },
    /// Read, key derivation or publish failed; retried on the next trigger.
    Failed { error: String },
}

/// One document's result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    pub path: CanonicalPath,
    #[serde(flatten)]
    pub outcome: DocumentOutcome,
}

/// Result of a full or incremental pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassReport {
    pub documents: Vec<DocumentReport>,
    pub duration_ms: u128,
}

impl PassReport {
    fn count(&self, pred: impl Fn(&DocumentOutcome) -> bool) -> usize {
        self.documents.iter().filter(|d| pred(&d.outcome)).count()
    }

    pub fn published(&self) -> usize {
        self.count(|o| matches!(o, DocumentOutcome::Published { .. }))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, DocumentOutcome::SkippedUnchanged { .. }))
    }

    pub fn drafts(&self) -> usize {
        self.count(|o| matches!(o, DocumentOutcome::SkippedDraft { .. }))
    }

    pub fn invalid(&self) -> usize {
        self.count(|o| matches!(o, DocumentOutcome::Invalid { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DocumentOutcome::Failed { .. }))
    }
}

/// Read-only inspection of one document (no hashing, no store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub path: CanonicalPath,
    pub frontmatter_issues: Vec<ExtractIssue>,
    pub status: CheckStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckStatus {
    Ready { key: RecordKey, record: RemoteRecord },
    Draft { record_path: String },
    Invalid { issues: ValidationIssues },
    Failed { error: String },
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives documents from a [`ContentSource`] into a [`RecordStore`].
///
/// Owns its [`SyncState`]; clones of the orchestrator's `Arc` share it.
pub struct Orchestrator {
    source: Arc<dyn ContentSource>,
    store: Arc<dyn RecordStore>,
    state: SyncState,
    settings: Settings,
}

impl Orchestrator {
    pub fn new(
        source: Arc<dyn ContentSource>,
        store: Arc<dyn RecordStore>,
        settings: Settings,
    ) -> Self {
        Self {
            source,
            store,
            state: SyncState::new(),
            settings,
        }
    }

    /// Filesystem source + configured store. `dry_run` only logs records.
    pub fn from_config(config: &Config, dry_run: bool) -> Result<Self, SyncError> {
        let source = FsContentSource::new(config.content_root.clone(), config.extension.clone());
        let store = store::from_config(&config.store, dry_run)?;
        Ok(Self::new(
            Arc::new(source),
            store,
            Settings::from_config(config),
        ))
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn content_root(&self) -> &Path {
        self.source.root()
    }

    /// The document a change notification refers to, if any.
    pub fn resolve(&self, changed: &Path) -> Option<CanonicalPath> {
        self.source.resolve(changed)
    }

    /// Run the pipeline over every document of the source.
    ///
    /// Only a failure to enumerate the source is returned as an error.
    pub fn full_pass(&self) -> Result<PassReport, SyncError> {
        let started = Instant::now();
        let paths = self.source.list_documents()?;

        let documents: Vec<DocumentReport> = if self.settings.concurrency <= 1 || paths.len() <= 1 {
            paths.iter().map(|path| self.sync_document(path)).collect()
        } else {
            self.sync_parallel(&paths)
        };

        warn_on_key_collisions(&documents);

        let report = PassReport {
            documents,
            duration_ms: started.elapsed().as_millis(),
        };
        tracing::info!(
            "full pass over {} documents: {} published, {} unchanged, {} drafts, {} invalid, {} failed",
            report.documents.len(),
            report.published(),
            report.unchanged(),
            report.drafts(),
            report.invalid(),
            report.failed(),
        );
        Ok(report)
    }

    /// React to one file-change notification.
    ///
    /// Returns `None` when the path is not a document of this source.
    pub fn sync_changed(&self, changed: &Path) -> Option<DocumentReport> {
        let Some(path) = self.source.resolve(changed) else {
            tracing::debug!("ignoring change outside content set: {}", changed.display());
            return None;
        };
        Some(self.sync_document(&path))
    }

    /// Run the pipeline for one document, folding every error into the report.
    pub fn sync_document(&self, path: &CanonicalPath) -> DocumentReport {
        let outcome = match self.process(path) {
            Ok(outcome) => outcome,
            Err(DocumentError::Validation(issues)) => {
                tracing::warn!("validation failed for {path}: {issues}");
                DocumentOutcome::Invalid { issues }
            }
            Err(err) => {
                tracing::error!("error syncing {path}: {err}");
                DocumentOutcome::Failed {
                    error: err.to_string(),
                }
            }
        };
        DocumentReport {
            path: path.clone(),
            outcome,
        }
    }

    /// Extract, validate and build every document without publishing.
    pub fn check_all(&self) -> Result<Vec<CheckReport>, SyncError> {
        let paths = self.source.list_documents()?;
        Ok(paths.iter().map(|path| self.check_document(path)).collect())
    }

    pub fn check_document(&self, path: &CanonicalPath) -> CheckReport {
        let text = match self.source.read_document(path) {
            Ok(text) => text,
            Err(err) => {
                return CheckReport {
                    path: path.clone(),
                    frontmatter_issues: Vec::new(),
                    status: CheckStatus::Failed {
                        error: err.to_string(),
                    },
                }
            }
        };
        let extraction = extract(&text);
        let status = match validate(&extraction.record, &self.settings.schema) {
            Err(issues) => CheckStatus::Invalid { issues },
            Ok(post) if post.draft => CheckStatus::Draft {
                record_path: post.path,
            },
            Ok(post) => match self.derive(&post) {
                Ok((key, record)) => CheckStatus::Ready { key, record },
                Err(err) => CheckStatus::Failed {
                    error: err.to_string(),
                },
            },
        };
        CheckReport {
            path: path.clone(),
            frontmatter_issues: extraction.issues,
            status,
        }
    }

    fn process(&self, path: &CanonicalPath) -> Result<DocumentOutcome, DocumentError> {
        let text = self
            .source
            .read_document(path)
            .map_err(DocumentError::Read)?;

        let extraction = extract(&text);
        for issue in &extraction.issues {
            tracing::debug!("{path}: dropped frontmatter {issue}");
        }

        let post = validate(&extraction.record, &self.settings.schema)?;
        if post.draft {
            tracing::debug!("skipping draft: {}", post.path);
            return Ok(DocumentOutcome::SkippedDraft {
                record_path: post.path,
            });
        }

        let hash = content_hash(&post)?;
        if !self.state.is_changed(path, &hash) {
            tracing::debug!("unchanged: {path}");
            return Ok(DocumentOutcome::SkippedUnchanged {
                record_path: post.path,
            });
        }

        let (key, record) = self.derive(&post)?;
        let rendered = serde_json::to_string_pretty(&record)?;
        self.store.put(&self.settings.collection, &record, &key)?;
        self.state.record(path.clone(), hash);

        tracing::info!("published {path} as {key}:\n{rendered}");
        Ok(DocumentOutcome::Published {
            key,
            record_path: post.path,
        })
    }

    fn derive(&self, post: &BlogPost) -> Result<(RecordKey, RemoteRecord), DocumentError> {
        let key = derive_key(&post.date, self.settings.clock_id)?;
        let record = build_record(post, &self.settings.site)?;
        Ok((key, record))
    }

    /// Scoped worker threads pull paths from a shared cursor; reports keep
    /// enumeration order.
    fn sync_parallel(&self, paths: &[CanonicalPath]) -> Vec<DocumentReport> {
        let workers = self.settings.concurrency.min(paths.len());
        let cursor = AtomicUsize::new(0);
        let cursor = &cursor;

        let mut indexed: Vec<(usize, DocumentReport)> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(move || {
                        let mut done = Vec::new();
                        loop {
                            let i = cursor.fetch_add(1, Ordering::Relaxed);
                            let Some(path) = paths.get(i) else { break };
                            done.push((i, self.sync_document(path)));
                        }
                        done
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        });

        indexed.sort_by_key(|(i, _)| *i);
        indexed.into_iter().map(|(_, report)| report).collect()
    }
}

/// Two documents published on the same date share a key; the later `put`
/// replaces the earlier record.
fn warn_on_key_collisions(documents: &[DocumentReport]) {
    let mut by_key: BTreeMap<&RecordKey, Vec<&CanonicalPath>> = BTreeMap::new();
    for doc in documents {
        if let DocumentOutcome::Published { key, .. } = &doc.outcome {
            by_key.entry(key).or_default().push(&doc.path);
        }
    }
    for (key, paths) in by_key {
        if paths.len() > 1 {
            let names: Vec<&str> = paths.iter().map(|p| p.as_str()).collect();
            tracing::warn!(
                "record key {key} shared by {}; only the last publish is kept",
                names.join(", ")
            );
        }
    }
}
