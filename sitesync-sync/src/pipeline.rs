//! Shared sync entrypoint used by CLI and daemon.

use std::path::PathBuf;
use std::time::Instant;

use crate::{Orchestrator, PassReport, SyncError};

/// Scope for a sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncScope {
    /// Every document under the content root.
    All,
    /// One changed file, as reported by a watcher or the user.
    Document(PathBuf),
}

/// Run the pipeline for a scope.
///
/// A `Document` scope that does not name a document of the source yields an
/// empty report.
pub fn run(orchestrator: &Orchestrator, scope: SyncScope) -> Result<PassReport, SyncError> {
    match scope {
        SyncScope::All => orchestrator.full_pass(),
        SyncScope::Document(path) => {
            let started = Instant::now();
            let documents = orchestrator.sync_changed(&path).into_iter().collect();
            Ok(PassReport {
                documents,
                duration_ms: started.elapsed().as_millis(),
            })
        }
    }
}
