use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::time::Instant;

use sitesync_core::config::sitesync_root;
use sitesync_sync::{
    collect_dirs,
    pipeline::{self, SyncScope},
    DocumentReport, Orchestrator, PassReport, SyncError,
};

use crate::error::{io_err, DaemonError};
use crate::paths::{socket_path, DEBOUNCE_WINDOW};
use crate::protocol::{DaemonRequest, DaemonResponse};

struct SyncJob {
    scope: SyncScope,
    source: &'static str,
    respond_to: oneshot::Sender<Result<SyncSummary, SyncError>>,
}

/// Outcome of one queued job, as returned over the socket.
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub target: String,
    pub source: String,
    pub published: usize,
    pub unchanged: usize,
    pub drafts: usize,
    pub invalid: usize,
    pub failed: usize,
    pub duration_ms: u128,
    pub documents: Vec<DocumentReport>,
}

#[derive(Debug, Default)]
struct DaemonStats {
    last_sync_at_unix: u64,
    jobs: u64,
    last_summary: Option<SyncSummary>,
}

type SharedStats = Arc<RwLock<DaemonStats>>;

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path, orchestrator: Orchestrator) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf(), Arc::new(orchestrator)))
}

/// Run the daemon: one full pass, then incremental passes on file changes
/// until a `stop` request or ctrl-c.
pub async fn run(home: PathBuf, orchestrator: Arc<Orchestrator>) -> Result<(), DaemonError> {
    ensure_runtime_dirs(&home)?;

    let stats: SharedStats = Arc::new(RwLock::new(DaemonStats::default()));
    let started_at_unix = unix_seconds_now();

    let (sync_tx, sync_rx) = mpsc::channel::<SyncJob>(64);
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    // Queued before anything else so the startup pass runs first.
    let startup = {
        let sync_tx = sync_tx.clone();
        tokio::spawn(async move {
            match enqueue_sync(&sync_tx, SyncScope::All, "startup").await {
                Ok(summary) => log_summary(&summary),
                Err(err) => tracing::error!(error = %err, "startup sync failed"),
            }
        })
    };

    let watcher_handle = {
        let shutdown = shutdown_tx.clone();
        let orchestrator = orchestrator.clone();
        let sync_tx = sync_tx.clone();
        tokio::spawn(async move {
            let result = watcher_task(orchestrator, sync_tx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let processor_handle = {
        let shutdown = shutdown_tx.clone();
        let orchestrator = orchestrator.clone();
        let stats = stats.clone();
        tokio::spawn(async move {
            let result =
                sync_processor_task(orchestrator, stats, sync_rx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let socket_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let orchestrator = orchestrator.clone();
        let stats = stats.clone();
        let sync_tx = sync_tx.clone();
        tokio::spawn(async move {
            let result = socket_server_task(
                SocketContext {
                    home,
                    orchestrator,
                    stats,
                    sync_tx,
                    shutdown_tx: shutdown.clone(),
                    started_at_unix,
                },
                shutdown.subscribe(),
            )
            .await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Protocol(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    drop(sync_tx);

    let (watcher_result, processor_result, socket_result, signal_result) =
        tokio::join!(watcher_handle, processor_handle, socket_handle, signal_handle);
    startup.abort();

    handle_join("watcher", watcher_result)?;
    handle_join("sync_processor", processor_result)?;
    handle_join("socket_server", socket_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Watcher
// ---------------------------------------------------------------------------

async fn watcher_task(
    orchestrator: Arc<Orchestrator>,
    sync_tx: mpsc::Sender<SyncJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let root = orchestrator.content_root().to_path_buf();
    // Events arrive as real paths (e.g. /private/var/... on macOS).
    let root = fs::canonicalize(&root).map_err(|e| io_err(&root, e))?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;

    let mut watched_dirs = HashSet::new();
    register_content_tree(&mut watcher, &mut watched_dirs, &root)?;
    tracing::info!(root = %root.display(), dirs = watched_dirs.len(), "watching content root");

    let mut pending = HashMap::<PathBuf, Instant>::new();

    loop {
        let next_deadline = pending.values().min().copied();
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = sleep_until_deadline(next_deadline), if next_deadline.is_some() => {
                for path in take_due(&mut pending, Instant::now()) {
                    if !path.exists() {
                        tracing::debug!(path = %path.display(), "changed file vanished before sync");
                        continue;
                    }
                    let sync_tx = sync_tx.clone();
                    tokio::spawn(async move {
                        match enqueue_sync(&sync_tx, SyncScope::Document(path), "watcher").await {
                            Ok(summary) => log_summary(&summary),
                            Err(err) => tracing::error!(error = %err, "watcher-triggered sync failed"),
                        }
                    });
                }
            }
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "watcher event error");
                        continue;
                    }
                };
                if !is_relevant_event_kind(&event.kind) {
                    continue;
                }

                for path in event.paths {
                    if path.is_dir() && path.starts_with(&root) {
                        let registered =
                            register_content_tree(&mut watcher, &mut watched_dirs, &path);
                        if let Err(err) = registered {
                            tracing::warn!(
                                path = %path.display(),
                                error = %err,
                                "cannot watch new directory",
                            );
                        }
                        continue;
                    }
                    if orchestrator.resolve(&path).is_none() {
                        continue;
                    }
                    schedule(&mut pending, path, Instant::now(), DEBOUNCE_WINDOW);
                }
            }
        }
    }

    Ok(())
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    if let Some(deadline) = deadline {
        tokio::time::sleep_until(deadline).await;
    }
}

/// Push `path`'s deadline to `now + window`; repeated saves keep deferring it.
fn schedule(pending: &mut HashMap<PathBuf, Instant>, path: PathBuf, now: Instant, window: Duration) {
    pending.insert(path, now + window);
}

/// Remove and return every path whose quiet window has elapsed, sorted.
fn take_due(pending: &mut HashMap<PathBuf, Instant>, now: Instant) -> Vec<PathBuf> {
    let mut due: Vec<PathBuf> = pending
        .iter()
        .filter(|(_, deadline)| **deadline <= now)
        .map(|(path, _)| path.clone())
        .collect();
    for path in &due {
        pending.remove(path);
    }
    due.sort();
    due
}

fn register_content_tree(
    watcher: &mut RecommendedWatcher,
    watched_dirs: &mut HashSet<PathBuf>,
    root: &Path,
) -> Result<(), DaemonError> {
    for dir in collect_dirs(root)? {
        let canonical = match fs::canonicalize(&dir) {
            Ok(path) => path,
            Err(err) if err.kind() == ErrorKind::NotFound => continue,
            Err(err) => return Err(io_err(&dir, err)),
        };
        if watched_dirs.insert(canonical.clone()) {
            watcher.watch(&canonical, RecursiveMode::NonRecursive)?;
            tracing::debug!(path = %canonical.display(), "watching content directory");
        }
    }
    Ok(())
}

fn is_relevant_event_kind(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

async fn sync_processor_task(
    orchestrator: Arc<Orchestrator>,
    stats: SharedStats,
    mut sync_rx: mpsc::Receiver<SyncJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            maybe_job = sync_rx.recv() => {
                let Some(job) = maybe_job else { break };

                let target = scope_label(&job.scope);
                let orchestrator = orchestrator.clone();
                let scope = job.scope;
                let sync_result = tokio::task::spawn_blocking(move || {
                    pipeline::run(&orchestrator, scope)
                })
                .await
                .map_err(|err| DaemonError::Protocol(format!("sync task join error: {err}")))?;

                let outcome = match sync_result {
                    Ok(report) => {
                        let summary = build_sync_summary(target, job.source, report);
                        let mut guard = stats.write().await;
                        guard.last_sync_at_unix = unix_seconds_now();
                        guard.jobs += 1;
                        guard.last_summary = Some(summary.clone());
                        drop(guard);
                        Ok(summary)
                    }
                    Err(err) => {
                        tracing::warn!(target = %target, error = %err, "sync job failed");
                        Err(err)
                    }
                };

                let _ = job.respond_to.send(outcome);
            }
        }
    }

    Ok(())
}

async fn enqueue_sync(
    sync_tx: &mpsc::Sender<SyncJob>,
    scope: SyncScope,
    source: &'static str,
) -> Result<SyncSummary, DaemonError> {
    let (tx, rx) = oneshot::channel();
    sync_tx
        .send(SyncJob {
            scope,
            source,
            respond_to: tx,
        })
        .await
        .map_err(|_| DaemonError::ChannelClosed("sync queue"))?;

    let outcome = rx
        .await
        .map_err(|_| DaemonError::ChannelClosed("sync response"))?;
    Ok(outcome?)
}

fn scope_label(scope: &SyncScope) -> String {
    match scope {
        SyncScope::All => "all".to_string(),
        SyncScope::Document(path) => path.display().to_string(),
    }
}

fn build_sync_summary(target: String, source: &'static str, report: PassReport) -> SyncSummary {
    SyncSummary {
        target,
        source: source.to_string(),
        published: report.published(),
        unchanged: report.unchanged(),
        drafts: report.drafts(),
        invalid: report.invalid(),
        failed: report.failed(),
        duration_ms: report.duration_ms,
        documents: report.documents,
    }
}

fn log_summary(summary: &SyncSummary) {
    tracing::info!(
        target = %summary.target,
        source = %summary.source,
        published = summary.published,
        unchanged = summary.unchanged,
        invalid = summary.invalid,
        failed = summary.failed,
        duration_ms = summary.duration_ms,
        "sync completed",
    );
}

// ---------------------------------------------------------------------------
// Socket server
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct SocketContext {
    home: PathBuf,
    orchestrator: Arc<Orchestrator>,
    stats: SharedStats,
    sync_tx: mpsc::Sender<SyncJob>,
    shutdown_tx: broadcast::Sender<()>,
    started_at_unix: u64,
}

async fn socket_server_task(
    ctx: SocketContext,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let socket = socket_path(&ctx.home);
    prepare_socket_for_bind(&socket)?;

    let listener = UnixListener::bind(&socket).map_err(|e| io_err(&socket, e))?;
    set_socket_permissions(&socket)?;
    tracing::info!(socket = %socket.display(), "daemon listening");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.map_err(|e| io_err(&socket, e))?;
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_socket_client(stream, ctx).await {
                        tracing::error!(error = %err, "socket client error");
                    }
                });
            }
        }
    }

    if socket.exists() {
        let _ = fs::remove_file(&socket);
    }
    Ok(())
}

async fn handle_socket_client(stream: UnixStream, ctx: SocketContext) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("daemon socket read", e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let request: DaemonRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(err) => {
                write_response(
                    &mut writer,
                    &DaemonResponse::error(format!("invalid request JSON: {err}")),
                )
                .await?;
                continue;
            }
        };

        let response = match request.cmd.as_str() {
            "status" => DaemonResponse::ok(build_status_payload(&ctx).await),
            "sync" => handle_sync_request(&ctx, request.path.as_deref()).await,
            "stop" => {
                let _ = ctx.shutdown_tx.send(());
                DaemonResponse::ok(json!({ "stopping": true }))
            }
            other => DaemonResponse::error(format!("unknown command '{other}'")),
        };

        write_response(&mut writer, &response).await?;
        if request.cmd == "stop" {
            break;
        }
    }

    Ok(())
}

async fn handle_sync_request(ctx: &SocketContext, path: Option<&str>) -> DaemonResponse {
    let scope = match path {
        None => SyncScope::All,
        Some(path) => {
            let path = PathBuf::from(path);
            if ctx.orchestrator.resolve(&path).is_none() {
                return DaemonResponse::error(format!(
                    "{} is not a document under {}",
                    path.display(),
                    ctx.orchestrator.content_root().display()
                ));
            }
            SyncScope::Document(path)
        }
    };
    match enqueue_sync(&ctx.sync_tx, scope, "socket").await {
        Ok(summary) => DaemonResponse::ok(json!(summary)),
        Err(err) => DaemonResponse::error(err.to_string()),
    }
}

async fn build_status_payload(ctx: &SocketContext) -> Value {
    let (last_sync_at_unix, jobs, last_sync) = {
        let stats = ctx.stats.read().await;
        (
            stats.last_sync_at_unix,
            stats.jobs,
            stats.last_summary.as_ref().map(|s| {
                json!({
                    "target": s.target,
                    "source": s.source,
                    "published": s.published,
                    "unchanged": s.unchanged,
                    "drafts": s.drafts,
                    "invalid": s.invalid,
                    "failed": s.failed,
                    "duration_ms": s.duration_ms,
                })
            }),
        )
    };

    let settings = ctx.orchestrator.settings();
    json!({
        "running": true,
        "site": settings.site.to_string(),
        "collection": settings.collection,
        "content_root": ctx.orchestrator.content_root().display().to_string(),
        "started_at_unix": ctx.started_at_unix,
        "last_sync_at_unix": last_sync_at_unix,
        "jobs": jobs,
        "tracked_documents": ctx.orchestrator.state().len(),
        "last_sync": last_sync,
        "socket": socket_path(&ctx.home).display().to_string(),
    })
}

fn prepare_socket_for_bind(socket: &Path) -> Result<(), DaemonError> {
    if !socket.exists() {
        return Ok(());
    }

    match StdUnixStream::connect(socket) {
        Ok(_) => {
            return Err(DaemonError::Protocol(format!(
                "daemon socket already in use: {}",
                socket.display()
            )));
        }
        Err(err) => {
            tracing::warn!(
                socket = %socket.display(),
                error = %err,
                "removing stale daemon socket before bind",
            );
        }
    }

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}

async fn write_response(
    writer: &mut OwnedWriteHalf,
    response: &DaemonResponse,
) -> Result<(), DaemonError> {
    let mut payload = serde_json::to_string(response)?;
    payload.push('\n');
    writer
        .write_all(payload.as_bytes())
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .flush()
        .await
        .map_err(|e| io_err("daemon socket flush", e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ensure_runtime_dirs(home: &Path) -> Result<(), DaemonError> {
    let root = sitesync_root(home);
    if !root.exists() {
        fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
    }
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[cfg(unix)]
fn set_socket_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_socket_permissions(_path: &Path) -> Result<(), DaemonError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use sitesync_core::SiteId;
    use sitesync_sync::{FsContentSource, MemoryStore, Settings};
    use tempfile::TempDir;
    use tokio::time::advance;

    const POST: &str = "---\ntitle: T\ndate: 2024-03-15\ndescription: D\nslug: t\n---\n";

    fn orchestrator(root: &Path) -> (Arc<MemoryStore>, Arc<Orchestrator>) {
        let store = Arc::new(MemoryStore::new());
        let orch = Orchestrator::new(
            Arc::new(FsContentSource::new(root, "md")),
            store.clone(),
            Settings::new(SiteId::from("https://example.dev")),
        );
        (store, Arc::new(orch))
    }

    fn context(home: &Path, orchestrator: Arc<Orchestrator>) -> SocketContext {
        let (sync_tx, _) = mpsc::channel(1);
        let (shutdown_tx, _) = broadcast::channel(1);
        SocketContext {
            home: home.to_path_buf(),
            orchestrator,
            stats: Arc::new(RwLock::new(DaemonStats::default())),
            sync_tx,
            shutdown_tx,
            started_at_unix: 1_000_000,
        }
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn rapid_saves_collapse_into_one_trailing_sync() {
        let window = Duration::from_millis(100);
        let mut pending = HashMap::<PathBuf, Instant>::new();
        let path = PathBuf::from("/content/post.md");

        for _ in 0..5 {
            schedule(&mut pending, path.clone(), Instant::now(), window);
            assert!(take_due(&mut pending, Instant::now()).is_empty());
            advance(Duration::from_millis(10)).await;
        }

        advance(Duration::from_millis(150)).await;
        assert_eq!(take_due(&mut pending, Instant::now()), vec![path]);
        assert!(pending.is_empty());
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn independent_paths_have_independent_windows() {
        let window = Duration::from_millis(100);
        let mut pending = HashMap::<PathBuf, Instant>::new();
        let a = PathBuf::from("/content/a.md");
        let b = PathBuf::from("/content/b.md");

        schedule(&mut pending, a.clone(), Instant::now(), window);
        advance(Duration::from_millis(60)).await;
        schedule(&mut pending, b.clone(), Instant::now(), window);
        advance(Duration::from_millis(50)).await;

        assert_eq!(take_due(&mut pending, Instant::now()), vec![a]);
        advance(Duration::from_millis(60)).await;
        assert_eq!(take_due(&mut pending, Instant::now()), vec![b]);
    }

    #[tokio::test]
    async fn status_payload_before_any_sync() {
        let home = TempDir::new().expect("home");
        let root = TempDir::new().expect("root");
        let (_, orch) = orchestrator(root.path());

        let payload = build_status_payload(&context(home.path(), orch)).await;

        assert_eq!(payload["running"], json!(true));
        assert_eq!(payload["site"], json!("https://example.dev"));
        assert_eq!(payload["started_at_unix"], json!(1_000_000u64));
        assert_eq!(payload["last_sync_at_unix"], json!(0u64));
        assert_eq!(payload["tracked_documents"], json!(0));
        assert!(payload["last_sync"].is_null());
    }

    #[tokio::test]
    async fn processor_runs_jobs_and_records_stats() {
        let root = TempDir::new().expect("root");
        fs::write(root.path().join("t.md"), POST).expect("write");
        let (store, orch) = orchestrator(root.path());
        let stats: SharedStats = Arc::new(RwLock::new(DaemonStats::default()));

        let (sync_tx, sync_rx) = mpsc::channel(4);
        let (shutdown_tx, _) = broadcast::channel(1);
        let processor = tokio::spawn(sync_processor_task(
            orch.clone(),
            stats.clone(),
            sync_rx,
            shutdown_tx.subscribe(),
        ));

        let first = enqueue_sync(&sync_tx, SyncScope::All, "test").await.expect("sync");
        assert_eq!(first.published, 1);
        let second = enqueue_sync(&sync_tx, SyncScope::Document(root.path().join("t.md")), "test")
            .await
            .expect("sync");
        assert_eq!(second.unchanged, 1);
        assert_eq!(store.put_count(), 1);

        {
            let stats = stats.read().await;
            assert_eq!(stats.jobs, 2);
            assert!(stats.last_sync_at_unix > 0);
        }

        let _ = shutdown_tx.send(());
        processor.await.expect("join").expect("processor");
    }

    #[tokio::test]
    async fn failed_pass_reaches_the_caller_as_a_sync_error() {
        let root = TempDir::new().expect("root");
        let (store, orch) = orchestrator(&root.path().join("gone"));
        let stats: SharedStats = Arc::new(RwLock::new(DaemonStats::default()));

        let (sync_tx, sync_rx) = mpsc::channel(1);
        let (shutdown_tx, _) = broadcast::channel(1);
        let processor = tokio::spawn(sync_processor_task(
            orch,
            stats.clone(),
            sync_rx,
            shutdown_tx.subscribe(),
        ));

        let result = enqueue_sync(&sync_tx, SyncScope::All, "test").await;
        assert!(matches!(result, Err(DaemonError::Sync(SyncError::Io { .. }))));
        assert_eq!(store.put_count(), 0);
        assert_eq!(stats.read().await.jobs, 0);

        let _ = shutdown_tx.send(());
        processor.await.expect("join").expect("processor");
    }

    #[tokio::test]
    async fn sync_request_for_foreign_path_is_rejected() {
        let home = TempDir::new().expect("home");
        let root = TempDir::new().expect("root");
        let (_, orch) = orchestrator(root.path());

        let response =
            handle_sync_request(&context(home.path(), orch), Some("/elsewhere/notes.txt")).await;
        assert!(!response.ok);
        assert!(response.error.expect("message").contains("not a document"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn daemon_serves_status_sync_and_stop_over_socket() {
        let home = TempDir::new().expect("home");
        let root = TempDir::new().expect("root");
        fs::write(root.path().join("t.md"), POST).expect("write");
        let (store, orch) = orchestrator(root.path());

        let daemon = tokio::spawn(run(home.path().to_path_buf(), orch));

        let home_path = home.path().to_path_buf();
        let (status, synced) = tokio::task::spawn_blocking(move || {
            let status = crate::protocol::request_status(&home_path).expect("status");
            let synced = crate::protocol::request_sync(&home_path, None).expect("sync");
            crate::protocol::request_stop(&home_path).expect("stop");
            (status, synced)
        })
        .await
        .expect("client");

        assert_eq!(status["running"], json!(true));
        assert_eq!(synced["target"], json!("all"));
        daemon.await.expect("join").expect("daemon");
        assert_eq!(store.put_count(), 1, "startup pass publishes once");
        assert!(!socket_path(home.path()).exists());
    }
}
