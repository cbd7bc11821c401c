//! Bounded-parallel directory scanning with cooperative cancellation.
//!
//! `list` fans each candidate file out to a tokio task gated by a semaphore
//! (fixed ceiling, independent of file count), fans results back in over an
//! mpsc channel, and joins every worker through a supervisor task before the
//! channel closes. A single `CancellationToken` is observed by every worker
//! and by the consumer; on cancellation the consumer drains the channel
//! asynchronously so no worker is left blocked on a send, waits for the
//! supervisor, and returns `Error::Cancelled` with no partial data.

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

use super::backend::StoreBackend;
use super::filter::DiscoveryFilter;
use crate::models::Discovery;
use crate::{Error, Result};

/// Default concurrency ceiling for the scan worker pool.
pub const DEFAULT_SCAN_WORKERS: usize = 8;

/// Outcome of a `list` scan: the matching records plus advisory warnings
/// for files that could not be loaded.
#[derive(Debug, Default)]
pub struct ListOutcome {
    /// Matching records, sorted by `discovered_at` descending.
    pub discoveries: Vec<Discovery>,
    /// Human-readable warnings, one per unreadable file.
    pub warnings: Vec<String>,
}

/// Per-file result emitted by a scan worker.
enum ScanEvent {
    Matched(Box<Discovery>),
    Skipped,
    Failed { file: String, reason: String },
    Cancelled,
}

/// Load one record file through the backend.
pub(super) fn load_record(backend: &dyn StoreBackend, name: &str) -> Result<Discovery> {
    let bytes = backend.read(name)?;
    serde_json::from_slice(&bytes).map_err(|e| Error::Malformed {
        file: name.to_string(),
        reason: e.to_string(),
    })
}

/// Scan `files` through a pool of at most `workers` concurrent loads,
/// keeping records that satisfy `filter`.
///
/// Per-file failures become warnings, not errors: one corrupt file must not
/// hide the healthy majority. Output ordering is deterministic regardless
/// of directory iteration order.
pub(super) async fn scan(
    backend: Arc<dyn StoreBackend>,
    files: Vec<String>,
    filter: DiscoveryFilter,
    workers: usize,
    cancel: CancellationToken,
) -> Result<ListOutcome> {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let (tx, mut rx) = mpsc::channel::<ScanEvent>(workers.max(1));

    let mut handles = Vec::with_capacity(files.len());
    for name in files {
        let semaphore = Arc::clone(&semaphore);
        let backend = Arc::clone(&backend);
        let filter = filter.clone();
        let cancel = cancel.clone();
        let tx = tx.clone();

        handles.push(tokio::spawn(async move {
            // The permit bounds in-flight loads; workers queue here.
            let Ok(_permit) = semaphore.acquire().await else {
                return;
            };
            if cancel.is_cancelled() {
                let _ = tx.send(ScanEvent::Cancelled).await;
                return;
            }

            let file = name.clone();
            let loaded =
                tokio::task::spawn_blocking(move || load_record(backend.as_ref(), &name)).await;

            let event = match loaded {
                Ok(Ok(record)) => {
                    if filter.matches(&record) {
                        ScanEvent::Matched(Box::new(record))
                    } else {
                        ScanEvent::Skipped
                    }
                }
                Ok(Err(e)) => ScanEvent::Failed {
                    file,
                    reason: match e {
                        Error::Malformed { reason, .. } => reason,
                        other => other.to_string(),
                    },
                },
                Err(join_err) => ScanEvent::Failed {
                    file,
                    reason: join_err.to_string(),
                },
            };
            let _ = tx.send(event).await;
        }));
    }
    drop(tx);

    // Supervisor: the channel must not close until every worker has finished,
    // and someone must observe worker panics.
    let supervisor = tokio::spawn(async move {
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("scan worker panicked: {}", e);
            }
        }
    });

    let mut outcome = ListOutcome::default();
    let mut cancelled = false;
    loop {
        tokio::select! {
            // Cancellation wins over a ready result so the caller never
            // receives partial data after the token fires.
            biased;
            _ = cancel.cancelled() => {
                cancelled = true;
                break;
            }
            event = rx.recv() => match event {
                Some(ScanEvent::Matched(discovery)) => outcome.discoveries.push(*discovery),
                Some(ScanEvent::Skipped) | Some(ScanEvent::Cancelled) => {}
                Some(ScanEvent::Failed { file, reason }) => {
                    tracing::warn!(file = %file, "skipping unreadable record: {}", reason);
                    outcome.warnings.push(format!("skipping {}: {}", file, reason));
                }
                None => break,
            },
        }
    }

    if cancelled {
        // Unblock any worker still waiting to send, then wait for all of
        // them to wind down before reporting cancellation: no leaked tasks,
        // no permanently held semaphore permits.
        let drainer = tokio::spawn(async move {
            while rx.recv().await.is_some() {}
        });
        let _ = supervisor.await;
        let _ = drainer.await;
        return Err(Error::Cancelled);
    }
    let _ = supervisor.await;

    // Stable sort: repeated scans over an unchanged directory are
    // reproducible even though read completion order is not.
    outcome
        .discoveries
        .sort_by(|a, b| b.context.discovered_at.cmp(&a.context.discovered_at));
    if let Some(limit) = filter.limit {
        outcome.discoveries.truncate(limit);
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::backend::{FileBackend, StoreBackend};
    use crate::storage::file_name;
    use chrono::{Duration, Utc};
    use std::sync::{Condvar, Mutex};
    use tempfile::TempDir;

    fn seed_records(backend: &FileBackend, count: usize) {
        let base = Utc::now();
        for i in 0..count {
            let (guid, id) = crate::id::generate_id().unwrap();
            let mut d = Discovery::new(format!("Discovery {}", i));
            d.id = id;
            d.guid = Some(guid);
            d.context.discovered_by = "scanner".to_string();
            d.context.discovered_at = base - Duration::seconds(i as i64);
            backend
                .create_new(&file_name(&d.id), &serde_json::to_vec_pretty(&d).unwrap())
                .unwrap();
        }
    }

    fn seeded_backend(count: usize) -> (TempDir, Arc<dyn StoreBackend>) {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::new(dir.path().join("discoveries"));
        backend.ensure_dir().unwrap();
        seed_records(&backend, count);
        (dir, Arc::new(backend))
    }

    fn record_files(backend: &Arc<dyn StoreBackend>) -> Vec<String> {
        let mut files = backend.list_files().unwrap();
        files.retain(|f| f.ends_with(".json"));
        files
    }

    #[tokio::test]
    async fn test_scan_returns_all_sorted_descending() {
        let (_dir, backend) = seeded_backend(20);
        let files = record_files(&backend);
        // Pool ceiling far below file count.
        let outcome = scan(
            backend,
            files,
            DiscoveryFilter::all(),
            3,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.discoveries.len(), 20);
        assert!(outcome.warnings.is_empty());
        for pair in outcome.discoveries.windows(2) {
            assert!(pair[0].context.discovered_at >= pair[1].context.discovered_at);
        }
        // Newest first: the seed made "Discovery 0" the most recent.
        assert_eq!(outcome.discoveries[0].title, "Discovery 0");
    }

    #[tokio::test]
    async fn test_scan_applies_limit_after_sort() {
        let (_dir, backend) = seeded_backend(10);
        let files = record_files(&backend);
        let filter = DiscoveryFilter {
            limit: Some(3),
            ..Default::default()
        };
        let outcome = scan(backend, files, filter, 4, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.discoveries.len(), 3);
        assert_eq!(outcome.discoveries[0].title, "Discovery 0");
        assert_eq!(outcome.discoveries[2].title, "Discovery 2");
    }

    #[tokio::test]
    async fn test_corrupt_file_becomes_warning() {
        let (_dir, backend) = seeded_backend(1);
        backend
            .create_new("sgd-BROKEN.json", b"{ this is not json")
            .unwrap();
        let files = record_files(&backend);
        let outcome = scan(
            backend,
            files,
            DiscoveryFilter::all(),
            4,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.discoveries.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("sgd-BROKEN.json"));
    }

    #[tokio::test]
    async fn test_cancelled_scan_returns_cancelled_without_partial_data() {
        let (_dir, backend) = seeded_backend(50);
        let files = record_files(&backend);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = scan(backend, files, DiscoveryFilter::all(), 2, cancel).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    /// Backend whose reads block on a shared gate, reporting each entry.
    /// Lets a test hold workers mid-load while it fires the token.
    struct GatedBackend {
        inner: FileBackend,
        entered: tokio::sync::mpsc::UnboundedSender<()>,
        gate: Arc<(Mutex<bool>, Condvar)>,
    }

    impl GatedBackend {
        fn open(gate: &(Mutex<bool>, Condvar)) {
            let (lock, cvar) = gate;
            *lock.lock().unwrap() = true;
            cvar.notify_all();
        }
    }

    impl StoreBackend for GatedBackend {
        fn ensure_dir(&self) -> crate::Result<()> {
            self.inner.ensure_dir()
        }

        fn initialized(&self) -> bool {
            self.inner.initialized()
        }

        fn create_new(&self, name: &str, bytes: &[u8]) -> crate::Result<()> {
            self.inner.create_new(name, bytes)
        }

        fn read(&self, name: &str) -> crate::Result<Vec<u8>> {
            let _ = self.entered.send(());
            let (lock, cvar) = &*self.gate;
            let mut open = lock.lock().unwrap();
            while !*open {
                open = cvar.wait(open).unwrap();
            }
            drop(open);
            self.inner.read(name)
        }

        fn overwrite(&self, name: &str, bytes: &[u8]) -> crate::Result<()> {
            self.inner.overwrite(name, bytes)
        }

        fn delete(&self, name: &str) -> crate::Result<()> {
            self.inner.delete(name)
        }

        fn exists(&self, name: &str) -> bool {
            self.inner.exists(name)
        }

        fn list_files(&self) -> crate::Result<Vec<String>> {
            self.inner.list_files()
        }

        fn location(&self) -> String {
            self.inner.location()
        }
    }

    #[tokio::test]
    async fn test_cancel_mid_scan_drains_in_flight_workers() {
        let dir = TempDir::new().unwrap();
        let plain = FileBackend::new(dir.path().join("discoveries"));
        plain.ensure_dir().unwrap();
        seed_records(&plain, 20);

        let (entered_tx, mut entered_rx) = tokio::sync::mpsc::unbounded_channel();
        let gate = Arc::new((Mutex::new(false), Condvar::new()));
        let backend: Arc<dyn StoreBackend> = Arc::new(GatedBackend {
            inner: plain,
            entered: entered_tx,
            gate: Arc::clone(&gate),
        });
        let files = record_files(&backend);

        let cancel = CancellationToken::new();
        let scan_task = tokio::spawn(scan(
            Arc::clone(&backend),
            files.clone(),
            DiscoveryFilter::all(),
            2,
            cancel.clone(),
        ));

        // Fire the token only once a load is actually in flight, while the
        // active workers are still blocked inside a read.
        entered_rx.recv().await.unwrap();
        cancel.cancel();
        GatedBackend::open(&gate);

        let result = scan_task.await.unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));

        // Nothing leaked: the same pool over the open gate still completes.
        let outcome = scan(
            backend,
            files,
            DiscoveryFilter::all(),
            2,
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(outcome.discoveries.len(), 20);
    }

    #[tokio::test]
    async fn test_repeated_cancelled_scans_do_not_leak_workers() {
        let (_dir, backend) = seeded_backend(30);
        let files = record_files(&backend);
        for _ in 0..10 {
            let cancel = CancellationToken::new();
            cancel.cancel();
            let result = scan(
                Arc::clone(&backend),
                files.clone(),
                DiscoveryFilter::all(),
                2,
                cancel,
            )
            .await;
            assert!(matches!(result, Err(Error::Cancelled)));
        }

        // The pool must be fully released: a fresh scan still completes.
        let outcome = scan(
            backend,
            files,
            DiscoveryFilter::all(),
            2,
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(outcome.discoveries.len(), 30);
    }

    #[tokio::test]
    async fn test_scan_of_empty_file_list() {
        let (_dir, backend) = seeded_backend(0);
        let outcome = scan(
            backend,
            Vec::new(),
            DiscoveryFilter::all(),
            4,
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(outcome.discoveries.is_empty());
        assert!(outcome.warnings.is_empty());
    }
}
