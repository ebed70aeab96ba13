//! Per-record link resolution.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::DEFAULT_RESOLVE_TIMEOUT_SECS;
use crate::error::ResolutionFailure;
use crate::models::{Session, VideoRecord};
use crate::scrapers::LinkResolver;

/// Extra time the resolver gets past its own timeout to tear down its context.
pub const DEFAULT_TEARDOWN_GRACE: Duration = Duration::from_secs(5);

/// Turns a record's source URL into a direct download URL.
///
/// Never fails the caller: every problem becomes a [`ResolutionFailure`].
#[derive(Clone)]
pub struct DownloadResolver {
    resolver: Arc<dyn LinkResolver>,
    timeout: Duration,
    teardown_grace: Duration,
}

impl DownloadResolver {
    pub fn new(resolver: Arc<dyn LinkResolver>) -> Self {
        Self {
            resolver,
            timeout: Duration::from_secs(DEFAULT_RESOLVE_TIMEOUT_SECS),
            teardown_grace: DEFAULT_TEARDOWN_GRACE,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_teardown_grace(mut self, grace: Duration) -> Self {
        self.teardown_grace = grace;
        self
    }

    /// Resolve one record.
    ///
    /// The attempt runs on its own task. Hitting the outer bound stops the
    /// wait, not the attempt, so the resolver still releases its context.
    pub async fn resolve(
        &self,
        record: &VideoRecord,
        session: &Session,
    ) -> Result<String, ResolutionFailure> {
        let bound = self.timeout + self.teardown_grace;
        let resolver = self.resolver.clone();
        let source_url = record.source_url.clone();
        let session = session.clone();
        let timeout = self.timeout;
        let attempt =
            tokio::spawn(async move { resolver.resolve(&source_url, &session, timeout).await });

        match tokio::time::timeout(bound, attempt).await {
            Ok(Ok(Ok(Some(url)))) => {
                debug!("Resolved {} -> {}", record.source_url, url);
                Ok(url)
            }
            Ok(Ok(Ok(None))) => {
                warn!("No download link exposed for {}", record.source_url);
                Err(ResolutionFailure::NoReadyControl)
            }
            Ok(Ok(Err(e))) => {
                warn!("Resolver failed for {}: {:#}", record.source_url, e);
                match e.downcast::<ResolutionFailure>() {
                    Ok(failure) => Err(failure),
                    Err(e) => Err(ResolutionFailure::Resolver(format!("{:#}", e))),
                }
            }
            Ok(Err(e)) => {
                warn!("Resolver task for {} aborted: {}", record.source_url, e);
                Err(ResolutionFailure::Resolver(format!("resolver task aborted: {}", e)))
            }
            Err(_) => {
                warn!(
                    "Resolver timed out after {}s for {}",
                    self.timeout.as_secs(),
                    record.source_url
                );
                Err(ResolutionFailure::TimedOut(self.timeout.as_secs()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Link(&'static str),
        NoLink,
        Fail,
        Hang,
    }

    struct FixedResolver(Behavior);

    #[async_trait]
    impl LinkResolver for FixedResolver {
        async fn resolve(
            &self,
            _source_url: &str,
            _session: &Session,
            _timeout: Duration,
        ) -> anyhow::Result<Option<String>> {
            match self.0 {
                Behavior::Link(url) => Ok(Some(url.to_string())),
                Behavior::NoLink => Ok(None),
                Behavior::Fail => anyhow::bail!("resolver page returned 502"),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(None)
                }
            }
        }
    }

    fn resolver(behavior: Behavior) -> DownloadResolver {
        DownloadResolver::new(Arc::new(FixedResolver(behavior)))
            .with_timeout(Duration::from_millis(50))
            .with_teardown_grace(Duration::ZERO)
    }

    fn record() -> VideoRecord {
        VideoRecord {
            source_url: "https://site.test/videos/1/".to_string(),
            title: "Clip".to_string(),
            rating: "90%".to_string(),
        }
    }

    #[tokio::test]
    async fn test_link_returned() {
        let session = Session::new(Vec::new());
        let url = resolver(Behavior::Link("https://cdn.test/1.mp4"))
            .resolve(&record(), &session)
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.test/1.mp4");
    }

    /// Resolver whose submission overruns the budget before it tears down.
    struct SlowSubmit {
        open: Arc<AtomicUsize>,
        submit: Duration,
    }

    #[async_trait]
    impl LinkResolver for SlowSubmit {
        async fn resolve(
            &self,
            _source_url: &str,
            _session: &Session,
            timeout: Duration,
        ) -> anyhow::Result<Option<String>> {
            self.open.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.submit).await;
            let link = tokio::time::timeout(timeout, std::future::pending::<String>())
                .await
                .ok();
            self.open.fetch_sub(1, Ordering::SeqCst);
            Ok(link)
        }
    }

    #[tokio::test]
    async fn test_outer_bound_does_not_cancel_teardown() {
        let open = Arc::new(AtomicUsize::new(0));
        let resolver = DownloadResolver::new(Arc::new(SlowSubmit {
            open: open.clone(),
            submit: Duration::from_millis(300),
        }))
        .with_timeout(Duration::from_millis(100))
        .with_teardown_grace(Duration::from_millis(50));

        let session = Session::new(Vec::new());
        assert_eq!(
            resolver.resolve(&record(), &session).await,
            Err(ResolutionFailure::TimedOut(0))
        );

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(open.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_typed_failure_passes_through() {
        struct Expired;

        #[async_trait]
        impl LinkResolver for Expired {
            async fn resolve(
                &self,
                _source_url: &str,
                _session: &Session,
                timeout: Duration,
            ) -> anyhow::Result<Option<String>> {
                Err(ResolutionFailure::TimedOut(timeout.as_secs()).into())
            }
        }

        let session = Session::new(Vec::new());
        let result = DownloadResolver::new(Arc::new(Expired))
            .with_timeout(Duration::from_secs(7))
            .resolve(&record(), &session)
            .await;
        assert_eq!(result, Err(ResolutionFailure::TimedOut(7)));
    }

    #[tokio::test]
    async fn test_failures_are_outcomes() {
        let session = Session::new(Vec::new());
        assert_eq!(
            resolver(Behavior::NoLink).resolve(&record(), &session).await,
            Err(ResolutionFailure::NoReadyControl)
        );
        assert!(matches!(
            resolver(Behavior::Fail).resolve(&record(), &session).await,
            Err(ResolutionFailure::Resolver(msg)) if msg.contains("502")
        ));
        assert_eq!(
            resolver(Behavior::Hang).resolve(&record(), &session).await,
            Err(ResolutionFailure::TimedOut(0))
        );
    }
}
