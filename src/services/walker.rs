use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tokio::fs;
use tokio::sync::{watch, Notify};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::models::{CopiedFile, CopyTask, EntryKind, SourceEntry, WalkError, WalkReport};
use crate::services::transfer::{classify_and_copy, CopyOutcome, TransferConfig};

/// Configuration for the tree walk.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Size of the worker pool. Bounds concurrent directory listings and
    /// file transfers together, which bounds open file descriptors.
    pub max_workers: usize,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            max_workers: worker_limit(None),
        }
    }
}

/// Resolve the worker pool size from an optional override.
pub fn worker_limit(requested: Option<usize>) -> usize {
    let n_cpu = std::thread::available_parallelism()
        .map(|v| v.get())
        .unwrap_or(1);

    match requested {
        Some(n) => n.max(1),
        None => n_cpu.clamp(1, 8),
    }
}

/// One unit of pending work. Directory listings and file transfers share the
/// queue, so sibling subtree walks and independent transfers interleave
/// freely under the same concurrency bound.
#[derive(Debug)]
enum WorkItem {
    Dir(PathBuf),
    File(PathBuf),
}

/// Pending work shared by the pool. `in_flight` counts items popped but not
/// yet completed; the walk is drained only when the queue is empty and
/// nothing is in flight, which is exactly when every discovered subtree has
/// been fully processed.
struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

struct QueueState {
    items: VecDeque<WorkItem>,
    in_flight: usize,
}

impl WorkQueue {
    fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                in_flight: 0,
            }),
            notify: Notify::new(),
        }
    }

    fn push(&self, item: WorkItem) {
        self.state.lock().unwrap().items.push_back(item);
        self.notify.notify_one();
    }

    /// Pop the next item, waiting while other workers may still enqueue
    /// more. Returns `None` once the walk has drained.
    async fn next(&self) -> Option<WorkItem> {
        loop {
            // Register for a wakeup before checking the queue, otherwise a
            // push between the check and the await is lost.
            let waiter = self.notify.notified();
            {
                let mut state = self.state.lock().unwrap();
                if let Some(item) = state.items.pop_front() {
                    state.in_flight += 1;
                    return Some(item);
                }
                if state.in_flight == 0 {
                    self.notify.notify_waiters();
                    return None;
                }
            }
            waiter.await;
        }
    }

    /// Mark one popped item finished.
    fn complete(&self) {
        let mut state = self.state.lock().unwrap();
        state.in_flight -= 1;
        if state.in_flight == 0 && state.items.is_empty() {
            self.notify.notify_waiters();
        }
    }
}

/// Walk `source_root` and dispatch every regular file to the transfer unit,
/// flattening the tree into per-extension buckets under `destination_root`.
///
/// Traversal is an explicit work queue consumed by a fixed pool of workers
/// rather than unbounded recursion. Per-item failures are accumulated on the
/// returned report and never abort the run; only a missing or unreadable
/// source root is fatal.
///
/// Flipping `shutdown` to true stops workers from taking new queue items;
/// transfers already in flight finish their current file cleanly.
pub async fn walk_and_dispatch(
    source_root: &Path,
    destination_root: &Path,
    walker_config: &WalkerConfig,
    transfer_config: &TransferConfig,
    shutdown: watch::Receiver<bool>,
) -> Result<WalkReport> {
    let metadata = fs::metadata(source_root).await.with_context(|| {
        format!("source folder does not exist: {}", source_root.display())
    })?;
    if !metadata.is_dir() {
        anyhow::bail!("source path is not a directory: {}", source_root.display());
    }
    if destination_root.starts_with(source_root) {
        anyhow::bail!(
            "destination folder must not be inside the source folder: {}",
            destination_root.display()
        );
    }

    let queue = Arc::new(WorkQueue::new());
    queue.push(WorkItem::Dir(source_root.to_path_buf()));

    let destination_root = Arc::new(destination_root.to_path_buf());
    let mut pool = JoinSet::new();
    for _ in 0..walker_config.max_workers.max(1) {
        pool.spawn(run_worker(
            Arc::clone(&queue),
            Arc::clone(&destination_root),
            transfer_config.clone(),
            shutdown.clone(),
        ));
    }

    let mut report = WalkReport::empty();
    while let Some(joined) = pool.join_next().await {
        match joined {
            Ok(partial) => report.merge(partial),
            Err(err) => {
                error!("Walk worker failed: {}", err);
                report.errors.push(WalkError {
                    path: source_root.to_string_lossy().to_string(),
                    operation: "worker".to_string(),
                    error: err.to_string(),
                });
            }
        }
    }

    info!(
        "Walk completed. Dirs: {}, copied: {}, skipped: {}, ignored: {}, errors: {}",
        report.dirs_walked,
        report.files_copied,
        report.files_skipped,
        report.entries_ignored,
        report.errors.len()
    );

    Ok(report)
}

/// One pool worker: take queue items until the walk drains or shutdown
/// fires, accumulating a local report that the pool merges at join time.
async fn run_worker(
    queue: Arc<WorkQueue>,
    destination_root: Arc<PathBuf>,
    transfer_config: TransferConfig,
    mut shutdown: watch::Receiver<bool>,
) -> WalkReport {
    let mut report = WalkReport::empty();
    let mut shutdown_gone = false;

    loop {
        if *shutdown.borrow() {
            report.cancelled = true;
            break;
        }

        let item = tokio::select! {
            item = queue.next() => match item {
                Some(item) => item,
                None => break,
            },
            changed = shutdown.changed(), if !shutdown_gone => {
                if changed.is_err() {
                    // Signal source dropped; keep draining the queue.
                    shutdown_gone = true;
                }
                continue;
            }
        };

        match item {
            WorkItem::Dir(path) => process_directory(&queue, &path, &mut report).await,
            WorkItem::File(path) => {
                let task = CopyTask::new(&destination_root, path);
                process_file(&task, &transfer_config, &mut report).await;
            }
        }
        queue.complete();
    }

    report
}

/// List one directory and enqueue its children. An unlistable directory is
/// recorded and skipped; sibling subtrees are unaffected.
async fn process_directory(queue: &WorkQueue, path: &Path, report: &mut WalkReport) {
    let mut entries = match fs::read_dir(path).await {
        Ok(entries) => entries,
        Err(err) => {
            error!("Cannot list directory {}: {}", path.display(), err);
            report.errors.push(WalkError {
                path: path.to_string_lossy().to_string(),
                operation: "list".to_string(),
                error: err.to_string(),
            });
            return;
        }
    };
    report.dirs_walked += 1;

    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => match SourceEntry::from_dir_entry(&entry).await {
                Ok(source_entry) => match source_entry.kind {
                    EntryKind::Directory => queue.push(WorkItem::Dir(source_entry.path)),
                    EntryKind::File => queue.push(WorkItem::File(source_entry.path)),
                    EntryKind::Other => {
                        warn!("Unsupported entry type: {}", source_entry.path.display());
                        report.entries_ignored += 1;
                    }
                },
                Err(err) => {
                    warn!(
                        "Cannot classify entry {}: {}",
                        entry.path().display(),
                        err
                    );
                    report.errors.push(WalkError {
                        path: entry.path().to_string_lossy().to_string(),
                        operation: "classify".to_string(),
                        error: err.to_string(),
                    });
                }
            },
            Ok(None) => break,
            Err(err) => {
                error!("Listing of {} aborted: {}", path.display(), err);
                report.errors.push(WalkError {
                    path: path.to_string_lossy().to_string(),
                    operation: "list".to_string(),
                    error: err.to_string(),
                });
                break;
            }
        }
    }
}

/// Run one transfer and fold the outcome into the report. Transfer failures
/// are file-local: logged, recorded, and the walk continues.
async fn process_file(task: &CopyTask, config: &TransferConfig, report: &mut WalkReport) {
    match classify_and_copy(task, config).await {
        Ok(CopyOutcome::Copied { bytes }) => {
            report.files_copied += 1;
            report.copied_files.push(CopiedFile {
                source: task.source.to_string_lossy().to_string(),
                destination: task.target.to_string_lossy().to_string(),
                bytes,
            });
        }
        Ok(CopyOutcome::SkippedExisting) => {
            report.files_skipped += 1;
        }
        Err(err) => {
            error!("Failed to copy {}: {}", task.source.display(), err);
            report.errors.push(WalkError {
                path: task.source.to_string_lossy().to_string(),
                operation: "copy".to_string(),
                error: err.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
        for (rel, content) in files {
            let path = root.join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await.unwrap();
            }
            fs::write(&path, content).await.unwrap();
        }
    }

    fn test_configs() -> (WalkerConfig, TransferConfig) {
        (WalkerConfig { max_workers: 4 }, TransferConfig::default())
    }

    #[tokio::test]
    async fn test_walk_flattens_tree_by_extension() {
        let src = tempdir().unwrap();
        let dest = tempdir().unwrap();
        write_tree(
            src.path(),
            &[
                ("a.txt", b"alpha"),
                ("sub/b.txt", b"bravo"),
                ("sub/c.md", b"charlie"),
                ("sub/deep/nested/d.log", b"delta"),
            ],
        )
        .await;

        let (walker_config, transfer_config) = test_configs();
        let (_tx, shutdown) = watch::channel(false);
        let report = walk_and_dispatch(
            src.path(),
            dest.path(),
            &walker_config,
            &transfer_config,
            shutdown,
        )
        .await
        .unwrap();

        assert_eq!(report.files_copied, 4);
        assert_eq!(report.dirs_walked, 4);
        assert!(report.errors.is_empty());
        assert!(!report.cancelled);

        assert_eq!(fs::read(dest.path().join("txt/a.txt")).await.unwrap(), b"alpha");
        assert_eq!(fs::read(dest.path().join("txt/b.txt")).await.unwrap(), b"bravo");
        assert_eq!(fs::read(dest.path().join("md/c.md")).await.unwrap(), b"charlie");
        assert_eq!(fs::read(dest.path().join("log/d.log")).await.unwrap(), b"delta");

        // The destination never mirrors the source structure.
        assert!(fs::metadata(dest.path().join("sub")).await.is_err());
    }

    #[tokio::test]
    async fn test_no_extension_files_use_fallback_bucket() {
        let src = tempdir().unwrap();
        let dest = tempdir().unwrap();
        write_tree(src.path(), &[("noext", b"raw")]).await;

        let (walker_config, transfer_config) = test_configs();
        let (_tx, shutdown) = watch::channel(false);
        let report = walk_and_dispatch(
            src.path(),
            dest.path(),
            &walker_config,
            &transfer_config,
            shutdown,
        )
        .await
        .unwrap();

        assert_eq!(report.files_copied, 1);
        assert_eq!(
            fs::read(dest.path().join("_noext/noext")).await.unwrap(),
            b"raw"
        );
    }

    #[tokio::test]
    async fn test_missing_source_root_is_fatal() {
        let dest = tempdir().unwrap();
        let (walker_config, transfer_config) = test_configs();
        let (_tx, shutdown) = watch::channel(false);

        let result = walk_and_dispatch(
            Path::new("/definitely/not/a/folder"),
            dest.path(),
            &walker_config,
            &transfer_config,
            shutdown,
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_rerun_against_same_destination_succeeds() {
        let src = tempdir().unwrap();
        let dest = tempdir().unwrap();
        write_tree(src.path(), &[("a.txt", b"one"), ("b.md", b"two")]).await;

        let (walker_config, transfer_config) = test_configs();
        for _ in 0..2 {
            let (_tx, shutdown) = watch::channel(false);
            let report = walk_and_dispatch(
                src.path(),
                dest.path(),
                &walker_config,
                &transfer_config,
                shutdown,
            )
            .await
            .unwrap();
            // Existing bucket folders are never an error on rerun.
            assert_eq!(report.files_copied, 2);
            assert!(report.errors.is_empty());
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_is_skipped_with_warning() {
        let src = tempdir().unwrap();
        let dest = tempdir().unwrap();
        write_tree(src.path(), &[("real.txt", b"data")]).await;
        std::os::unix::fs::symlink(src.path().join("real.txt"), src.path().join("link.txt"))
            .unwrap();

        let (walker_config, transfer_config) = test_configs();
        let (_tx, shutdown) = watch::channel(false);
        let report = walk_and_dispatch(
            src.path(),
            dest.path(),
            &walker_config,
            &transfer_config,
            shutdown,
        )
        .await
        .unwrap();

        assert_eq!(report.files_copied, 1);
        assert_eq!(report.entries_ignored, 1);
        assert!(fs::metadata(dest.path().join("txt/link.txt")).await.is_err());
    }

    #[tokio::test]
    async fn test_failing_transfers_do_not_abort_siblings() {
        let src = tempdir().unwrap();
        let dest = tempdir().unwrap();
        write_tree(
            src.path(),
            &[("a.txt", b"one"), ("b.txt", b"two"), ("c.md", b"three")],
        )
        .await;
        // A regular file squatting on the txt bucket path makes every txt
        // transfer fail at category folder creation.
        fs::write(dest.path().join("txt"), b"in the way").await.unwrap();

        let (walker_config, transfer_config) = test_configs();
        let (_tx, shutdown) = watch::channel(false);
        let report = walk_and_dispatch(
            src.path(),
            dest.path(),
            &walker_config,
            &transfer_config,
            shutdown,
        )
        .await
        .unwrap();

        assert_eq!(report.files_copied, 1);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().all(|e| e.operation == "copy"));
        assert_eq!(fs::read(dest.path().join("md/c.md")).await.unwrap(), b"three");
    }

    #[tokio::test]
    async fn test_destination_inside_source_is_rejected() {
        let src = tempdir().unwrap();
        write_tree(src.path(), &[("a.txt", b"alpha")]).await;

        let (walker_config, transfer_config) = test_configs();
        let (_tx, shutdown) = watch::channel(false);
        let result = walk_and_dispatch(
            src.path(),
            &src.path().join("sorted"),
            &walker_config,
            &transfer_config,
            shutdown,
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_before_start_copies_nothing() {
        let src = tempdir().unwrap();
        let dest = tempdir().unwrap();
        write_tree(src.path(), &[("a.txt", b"alpha")]).await;

        let (walker_config, transfer_config) = test_configs();
        let (tx, shutdown) = watch::channel(false);
        tx.send(true).unwrap();

        let report = walk_and_dispatch(
            src.path(),
            dest.path(),
            &walker_config,
            &transfer_config,
            shutdown,
        )
        .await
        .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.files_copied, 0);
    }

    #[test]
    fn test_worker_limit_bounds() {
        assert_eq!(worker_limit(Some(0)), 1);
        assert_eq!(worker_limit(Some(3)), 3);
        assert!(worker_limit(None) >= 1);
        assert!(worker_limit(None) <= 8);
    }
}
