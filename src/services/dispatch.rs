//! Concurrency-bounded fan-out of resolve-then-download units.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, warn};

use super::download::{DownloadEvent, FileTransfer};
use super::resolve::DownloadResolver;
use crate::models::{DownloadOutcome, DownloadResult, DownloadTask, Session, VideoRecord};
use crate::storage::{destination_path, CollisionPolicy};

/// Runs one unit per record under a counting semaphore and joins them all.
pub struct ConcurrencyDispatcher {
    resolver: DownloadResolver,
    transfer: Arc<dyn FileTransfer>,
    output_dir: PathBuf,
    collision: CollisionPolicy,
    events: Option<mpsc::Sender<DownloadEvent>>,
}

/// State shared by every unit of one run.
struct UnitContext {
    resolver: DownloadResolver,
    transfer: Arc<dyn FileTransfer>,
    output_dir: PathBuf,
    collision: CollisionPolicy,
    events: Option<mpsc::Sender<DownloadEvent>>,
    session: Arc<Session>,
}

impl UnitContext {
    async fn emit(&self, event: DownloadEvent) {
        if let Some(ref tx) = self.events {
            let _ = tx.send(event).await;
        }
    }

    /// Run one unit and report its terminal event as soon as it ends.
    async fn run(&self, task: &DownloadTask) -> DownloadOutcome {
        let outcome = self.resolve_and_transfer(task).await;
        self.emit(terminal_event(&task.record, &outcome)).await;
        outcome
    }

    async fn resolve_and_transfer(&self, task: &DownloadTask) -> DownloadOutcome {
        let record = &task.record;
        self.emit(DownloadEvent::Started {
            url: record.source_url.clone(),
        })
        .await;

        let direct_url = match self.resolver.resolve(record, &self.session).await {
            Ok(url) => url,
            Err(failure) => return DownloadOutcome::ResolutionFailed(failure.to_string()),
        };
        self.emit(DownloadEvent::Resolved {
            url: record.source_url.clone(),
            direct_url: direct_url.clone(),
        })
        .await;

        let destination = destination_path(&self.output_dir, record, &direct_url, self.collision);
        match self.transfer.download(&direct_url, &destination).await {
            Ok(path) => DownloadOutcome::Success(path),
            Err(e) => {
                warn!("Transfer failed for {}: {}", record.source_url, e);
                DownloadOutcome::TransferFailed(e.to_string())
            }
        }
    }
}

fn terminal_event(record: &VideoRecord, outcome: &DownloadOutcome) -> DownloadEvent {
    match outcome {
        DownloadOutcome::Success(path) => DownloadEvent::Completed {
            url: record.source_url.clone(),
            path: path.clone(),
        },
        failed => DownloadEvent::Failed {
            url: record.source_url.clone(),
            error: failed.to_string(),
        },
    }
}

impl ConcurrencyDispatcher {
    pub fn new(
        resolver: DownloadResolver,
        transfer: Arc<dyn FileTransfer>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            resolver,
            transfer,
            output_dir: output_dir.into(),
            collision: CollisionPolicy::default(),
            events: None,
        }
    }

    pub fn with_collision(mut self, collision: CollisionPolicy) -> Self {
        self.collision = collision;
        self
    }

    /// Report unit progress on `tx`.
    pub fn with_events(mut self, tx: mpsc::Sender<DownloadEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Resolve and download every record, at most `limit` at a time.
    ///
    /// Returns exactly one result per record, in no particular order. A unit
    /// that fails or panics does not affect its siblings.
    pub async fn run(
        &self,
        records: Vec<VideoRecord>,
        session: Arc<Session>,
        limit: usize,
    ) -> Vec<DownloadResult> {
        let semaphore = Arc::new(Semaphore::new(limit.max(1)));
        let context = Arc::new(UnitContext {
            resolver: self.resolver.clone(),
            transfer: self.transfer.clone(),
            output_dir: self.output_dir.clone(),
            collision: self.collision,
            events: self.events.clone(),
            session,
        });

        let mut handles = Vec::with_capacity(records.len());
        for record in records {
            let task = DownloadTask {
                record: record.clone(),
            };
            let semaphore = semaphore.clone();
            let context = context.clone();

            let handle = tokio::spawn(async move {
                // Held until the transfer finishes
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        let outcome = DownloadOutcome::TransferFailed(format!("not admitted: {}", e));
                        context.emit(terminal_event(&task.record, &outcome)).await;
                        return outcome;
                    }
                };
                context.run(&task).await
            });
            handles.push((record, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (record, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    // The unit never got to report itself
                    let outcome = DownloadOutcome::TransferFailed(format!("task aborted: {}", e));
                    context.emit(terminal_event(&record, &outcome)).await;
                    outcome
                }
            };

            debug!("{}: {}", record.source_url, outcome);
            results.push(DownloadResult { record, outcome });
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransferError;
    use crate::scrapers::LinkResolver;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Tracks how many units are between resolution start and transfer end.
    #[derive(Default)]
    struct Gauge {
        active: AtomicUsize,
        peak: AtomicUsize,
        transfers: AtomicUsize,
    }

    impl Gauge {
        fn enter(&self) {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn leave(&self) {
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    struct SlowResolver {
        gauge: Arc<Gauge>,
        hang_on: Option<&'static str>,
    }

    #[async_trait]
    impl LinkResolver for SlowResolver {
        async fn resolve(
            &self,
            source_url: &str,
            _session: &Session,
            _timeout: Duration,
        ) -> anyhow::Result<Option<String>> {
            self.gauge.enter();
            if self.hang_on.is_some_and(|u| source_url.ends_with(u)) {
                self.gauge.leave();
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            if source_url.ends_with("/missing") {
                self.gauge.leave();
                return Ok(None);
            }
            Ok(Some(format!("{}.mp4", source_url)))
        }
    }

    struct SlowTransfer {
        gauge: Arc<Gauge>,
        panic_on: Option<&'static str>,
    }

    #[async_trait]
    impl FileTransfer for SlowTransfer {
        async fn download(
            &self,
            direct_url: &str,
            destination: &Path,
        ) -> Result<PathBuf, TransferError> {
            self.gauge.transfers.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.gauge.leave();
            if self.panic_on.is_some_and(|u| direct_url.contains(u)) {
                panic!("transfer blew up");
            }
            Ok(destination.to_path_buf())
        }
    }

    fn records(n: usize) -> Vec<VideoRecord> {
        (0..n)
            .map(|i| VideoRecord {
                source_url: format!("https://site.test/videos/{}", i),
                title: format!("Clip_{}", i),
                rating: "N/A".to_string(),
            })
            .collect()
    }

    fn dispatcher(gauge: &Arc<Gauge>, hang_on: Option<&'static str>) -> ConcurrencyDispatcher {
        let resolver = DownloadResolver::new(Arc::new(SlowResolver {
            gauge: gauge.clone(),
            hang_on,
        }))
        .with_timeout(Duration::from_millis(100))
        .with_teardown_grace(Duration::ZERO);
        let transfer = Arc::new(SlowTransfer {
            gauge: gauge.clone(),
            panic_on: None,
        });
        ConcurrencyDispatcher::new(resolver, transfer, "/out")
    }

    #[tokio::test]
    async fn test_ten_records_limit_five() {
        let gauge = Arc::new(Gauge::default());
        let input = records(10);
        let results = dispatcher(&gauge, None)
            .run(input.clone(), Arc::new(Session::new(Vec::new())), 5)
            .await;

        assert_eq!(results.len(), 10);
        let seen: HashSet<_> = results.iter().map(|r| r.record.source_url.clone()).collect();
        let expected: HashSet<_> = input.into_iter().map(|r| r.source_url).collect();
        assert_eq!(seen, expected);
        assert!(results.iter().all(|r| r.outcome.is_success()));
        assert!(gauge.peak.load(Ordering::SeqCst) <= 5);
    }

    #[tokio::test]
    async fn test_never_exceeds_limit() {
        for limit in [1, 2, 3] {
            let gauge = Arc::new(Gauge::default());
            let results = dispatcher(&gauge, None)
                .run(records(8), Arc::new(Session::new(Vec::new())), limit)
                .await;
            assert_eq!(results.len(), 8);
            assert!(gauge.peak.load(Ordering::SeqCst) <= limit);
        }
    }

    #[tokio::test]
    async fn test_empty_input() {
        let gauge = Arc::new(Gauge::default());
        for limit in [0, 1, 5] {
            let results = dispatcher(&gauge, None)
                .run(Vec::new(), Arc::new(Session::new(Vec::new())), limit)
                .await;
            assert!(results.is_empty());
        }
    }

    #[tokio::test]
    async fn test_timeout_yields_one_failure_and_no_transfer() {
        let gauge = Arc::new(Gauge::default());
        let results = dispatcher(&gauge, Some("/videos/0"))
            .run(records(1), Arc::new(Session::new(Vec::new())), 5)
            .await;

        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0].outcome,
            DownloadOutcome::ResolutionFailed(_)
        ));
        assert_eq!(gauge.transfers.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_panicking_unit_does_not_affect_siblings() {
        let gauge = Arc::new(Gauge::default());
        let resolver = DownloadResolver::new(Arc::new(SlowResolver {
            gauge: gauge.clone(),
            hang_on: None,
        }))
        .with_teardown_grace(Duration::ZERO);
        let transfer = Arc::new(SlowTransfer {
            gauge: gauge.clone(),
            panic_on: Some("/videos/2."),
        });
        let results = ConcurrencyDispatcher::new(resolver, transfer, "/out")
            .run(records(4), Arc::new(Session::new(Vec::new())), 2)
            .await;

        assert_eq!(results.len(), 4);
        let failed: Vec<_> = results.iter().filter(|r| !r.outcome.is_success()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].record.source_url, "https://site.test/videos/2");
        assert!(matches!(
            failed[0].outcome,
            DownloadOutcome::TransferFailed(ref reason) if reason.contains("task aborted")
        ));
    }

    /// Resolver that holds one record back and answers the rest at once.
    struct HoldBack {
        slow: &'static str,
    }

    #[async_trait]
    impl LinkResolver for HoldBack {
        async fn resolve(
            &self,
            source_url: &str,
            _session: &Session,
            _timeout: Duration,
        ) -> anyhow::Result<Option<String>> {
            if source_url.ends_with(self.slow) {
                tokio::time::sleep(Duration::from_millis(400)).await;
            }
            Ok(Some(format!("{}.mp4", source_url)))
        }
    }

    struct InstantTransfer;

    #[async_trait]
    impl FileTransfer for InstantTransfer {
        async fn download(
            &self,
            _direct_url: &str,
            destination: &Path,
        ) -> Result<PathBuf, TransferError> {
            Ok(destination.to_path_buf())
        }
    }

    #[tokio::test]
    async fn test_completion_reported_when_unit_finishes() {
        let (tx, mut rx) = mpsc::channel(64);
        let resolver = DownloadResolver::new(Arc::new(HoldBack { slow: "/videos/0" }));
        let dispatcher = ConcurrencyDispatcher::new(resolver, Arc::new(InstantTransfer), "/out")
            .with_events(tx);

        let results = dispatcher
            .run(records(3), Arc::new(Session::new(Vec::new())), 3)
            .await;
        assert_eq!(results.len(), 3);

        let mut completed = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let DownloadEvent::Completed { url, .. } = event {
                completed.push(url);
            }
        }
        assert_eq!(completed.len(), 3);
        assert_eq!(completed[2], "https://site.test/videos/0");
    }

    #[tokio::test]
    async fn test_events_reported() {
        let gauge = Arc::new(Gauge::default());
        let (tx, mut rx) = mpsc::channel(64);
        let mut input = records(2);
        input[1].source_url = "https://site.test/videos/missing".to_string();

        let results = dispatcher(&gauge, None)
            .with_events(tx)
            .run(input, Arc::new(Session::new(Vec::new())), 2)
            .await;
        assert_eq!(results.len(), 2);

        let mut completed = 0;
        let mut failed = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                DownloadEvent::Completed { .. } => completed += 1,
                DownloadEvent::Failed { url, error } => {
                    failed += 1;
                    assert!(url.ends_with("/missing"));
                    assert!(error.contains("no download link obtained"));
                }
                _ => {}
            }
        }
        assert_eq!((completed, failed), (1, 1));
    }
}
