/// Snapshot service: cache read state machine + refresh coordination
///
/// Serves the shared profitability snapshot with stale-while-revalidate
/// semantics. A stale read returns the cached value immediately and launches
/// a detached background refresh; concurrent stale reads collapse into a
/// single refresh (single-flight) via one process-wide atomic flag. The
/// deliberately-unawaited background task is the design, not an oversight:
/// callers never block on revalidation.
use crate::cache::TtlCache;
use crate::constants::SNAPSHOT_CACHE_KEY;
use crate::errors::JarError;
use crate::jar::types::{CacheStatus, ProfitabilitySnapshot};
use crate::logger::{log, LogTag};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Anything that can compute a fresh snapshot. The aggregator is the real
/// producer; tests inject counting/failing fakes.
#[async_trait]
pub trait SnapshotProducer: Send + Sync + 'static {
    async fn produce(
        &self,
        force_refresh_analytics: bool,
    ) -> Result<ProfitabilitySnapshot, JarError>;
}

/// A snapshot plus how it was served
#[derive(Debug, Clone)]
pub struct ServedSnapshot {
    pub snapshot: ProfitabilitySnapshot,
    pub cache_status: CacheStatus,
    pub data_age_seconds: i64,
}

pub struct SnapshotService<P: SnapshotProducer> {
    producer: Arc<P>,
    cache: Arc<TtlCache<ProfitabilitySnapshot>>,
    refreshing: Arc<AtomicBool>,
    ttl: Duration,
}

impl<P: SnapshotProducer> SnapshotService<P> {
    pub fn new(producer: Arc<P>, ttl: Duration) -> Self {
        Self {
            producer,
            cache: Arc::new(TtlCache::new()),
            refreshing: Arc::new(AtomicBool::new(false)),
            ttl,
        }
    }

    /// Serve a snapshot per the cache state machine:
    /// - forced: synchronous live run (write-through), cached fallback on error
    /// - miss:   synchronous run, hard error only if it fails (nothing cached)
    /// - fresh:  cached value, no refresh
    /// - stale:  cached value immediately + detached single-flight refresh
    pub async fn get_snapshot(&self, force_refresh: bool) -> Result<ServedSnapshot, JarError> {
        if force_refresh {
            return self.run_live(true).await;
        }

        match self.cache.get_entry(SNAPSHOT_CACHE_KEY) {
            None => {
                log(LogTag::Jar, "MISS", "no cached snapshot, computing inline");
                self.run_live(false).await
            }
            Some(entry) if !entry.is_expired() => {
                let age = entry.age_seconds();
                Ok(ServedSnapshot {
                    snapshot: entry.value,
                    cache_status: CacheStatus::Fresh,
                    data_age_seconds: age,
                })
            }
            Some(entry) => {
                let age = entry.age_seconds();
                log(
                    LogTag::Jar,
                    "STALE",
                    &format!("serving {}s-old snapshot, refreshing in background", age),
                );
                self.request_background_refresh();
                Ok(ServedSnapshot {
                    snapshot: entry.value,
                    cache_status: CacheStatus::Stale,
                    data_age_seconds: age,
                })
            }
        }
    }

    /// Launch a detached refresh unless one is already in flight. Losers of
    /// the flag race return immediately - no queuing, no waiting.
    pub fn request_background_refresh(&self) {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log(LogTag::Jar, "DEBUG", "refresh already in flight, skipping");
            return;
        }

        let producer = Arc::clone(&self.producer);
        let cache = Arc::clone(&self.cache);
        let refreshing = Arc::clone(&self.refreshing);
        let ttl = self.ttl;

        tokio::spawn(async move {
            // The guard resets the flag on every exit path, including panics
            // inside the producer - a stuck flag would block refreshes forever.
            let _guard = RefreshFlagGuard(refreshing);

            match producer.produce(false).await {
                Ok(snapshot) => {
                    cache.set(SNAPSHOT_CACHE_KEY, snapshot, ttl);
                    log(LogTag::Jar, "REFRESH", "background refresh completed");
                }
                Err(e) => {
                    log(
                        LogTag::Jar,
                        "WARN",
                        &format!("background refresh failed (discarded): {}", e),
                    );
                }
            }
        });
    }

    /// Synchronous producer run with write-through. On failure the last
    /// cached value is served (marked stale) if one exists at all.
    async fn run_live(&self, force_refresh_analytics: bool) -> Result<ServedSnapshot, JarError> {
        match self.producer.produce(force_refresh_analytics).await {
            Ok(snapshot) => {
                self.cache.set(SNAPSHOT_CACHE_KEY, snapshot.clone(), self.ttl);
                Ok(ServedSnapshot {
                    snapshot,
                    cache_status: if force_refresh_analytics {
                        CacheStatus::Live
                    } else {
                        CacheStatus::Miss
                    },
                    data_age_seconds: 0,
                })
            }
            Err(e) => match self.cache.get_entry(SNAPSHOT_CACHE_KEY) {
                Some(entry) => {
                    log(
                        LogTag::Jar,
                        "WARN",
                        &format!("live run failed, serving cached snapshot: {}", e),
                    );
                    let age = entry.age_seconds();
                    Ok(ServedSnapshot {
                        snapshot: entry.value,
                        cache_status: CacheStatus::Stale,
                        data_age_seconds: age,
                    })
                }
                None => Err(e),
            },
        }
    }
}

struct RefreshFlagGuard(Arc<AtomicBool>);

impl Drop for RefreshFlagGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jar::calculator::{self, CalculatorParams};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;

    const PARAMS: CalculatorParams = CalculatorParams {
        burn_threshold_units: 4_000.0,
        gas_estimate_usd: 50.0,
        display_floor_usd: 10.0,
    };

    fn empty_snapshot() -> ProfitabilitySnapshot {
        calculator::compute(vec![], Some(5.0), &PARAMS)
    }

    /// Producer that counts invocations and takes a while, so concurrent
    /// refresh requests overlap deterministically.
    struct CountingProducer {
        runs: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl SnapshotProducer for CountingProducer {
        async fn produce(&self, _force: bool) -> Result<ProfitabilitySnapshot, JarError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(empty_snapshot())
        }
    }

    struct FailingProducer;

    #[async_trait]
    impl SnapshotProducer for FailingProducer {
        async fn produce(&self, _force: bool) -> Result<ProfitabilitySnapshot, JarError> {
            Err(JarError::NoSnapshot("all sources down".to_string()))
        }
    }

    #[tokio::test]
    async fn concurrent_refresh_requests_collapse_into_one_run() {
        let producer = Arc::new(CountingProducer {
            runs: AtomicUsize::new(0),
            delay: Duration::from_millis(100),
        });
        let service = SnapshotService::new(Arc::clone(&producer), Duration::from_secs(60));

        service.request_background_refresh();
        service.request_background_refresh();
        service.request_background_refresh();

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(producer.runs.load(Ordering::SeqCst), 1);

        // Flag must be reset after completion so the next request proceeds.
        service.request_background_refresh();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(producer.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn miss_runs_inline_and_writes_through() {
        let producer = Arc::new(CountingProducer {
            runs: AtomicUsize::new(0),
            delay: Duration::from_millis(1),
        });
        let service = SnapshotService::new(Arc::clone(&producer), Duration::from_secs(60));

        let served = service.get_snapshot(false).await.unwrap();
        assert_eq!(served.cache_status, CacheStatus::Miss);
        assert_eq!(producer.runs.load(Ordering::SeqCst), 1);

        // Second read is a pure cache hit.
        let served = service.get_snapshot(false).await.unwrap();
        assert_eq!(served.cache_status, CacheStatus::Fresh);
        assert_eq!(producer.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_read_serves_immediately_and_refreshes_behind() {
        let producer = Arc::new(CountingProducer {
            runs: AtomicUsize::new(0),
            delay: Duration::from_millis(50),
        });
        let service = SnapshotService::new(Arc::clone(&producer), Duration::from_millis(50));

        service.get_snapshot(false).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;

        // Entry is now expired: read must serve it anyway and refresh behind.
        let served = service.get_snapshot(false).await.unwrap();
        assert_eq!(served.cache_status, CacheStatus::Stale);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(producer.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn forced_refresh_bypasses_fresh_cache() {
        let producer = Arc::new(CountingProducer {
            runs: AtomicUsize::new(0),
            delay: Duration::from_millis(1),
        });
        let service = SnapshotService::new(Arc::clone(&producer), Duration::from_secs(60));

        service.get_snapshot(false).await.unwrap();
        let served = service.get_snapshot(true).await.unwrap();
        assert_eq!(served.cache_status, CacheStatus::Live);
        assert_eq!(producer.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn first_ever_failure_is_a_hard_error() {
        let service = SnapshotService::new(Arc::new(FailingProducer), Duration::from_secs(60));
        assert!(service.get_snapshot(false).await.is_err());
    }

    #[tokio::test]
    async fn failure_with_cached_value_serves_stale() {
        let service = SnapshotService::new(Arc::new(FailingProducer), Duration::from_secs(60));
        service
            .cache
            .set(SNAPSHOT_CACHE_KEY, empty_snapshot(), Duration::from_secs(60));

        let served = service.get_snapshot(true).await.unwrap();
        assert_eq!(served.cache_status, CacheStatus::Stale);
    }

    #[tokio::test]
    async fn cached_reads_report_age_alongside_the_value() {
        let producer = Arc::new(CountingProducer {
            runs: AtomicUsize::new(0),
            delay: Duration::from_millis(1),
        });
        let service = SnapshotService::new(producer, Duration::from_millis(50));

        service.get_snapshot(false).await.unwrap();

        // Fresh read: both the value and its age come from the same entry.
        let fresh = service.get_snapshot(false).await.unwrap();
        assert_eq!(fresh.cache_status, CacheStatus::Fresh);
        assert!(fresh.data_age_seconds >= 0);

        tokio::time::sleep(Duration::from_millis(80)).await;
        let stale = service.get_snapshot(false).await.unwrap();
        assert_eq!(stale.cache_status, CacheStatus::Stale);
        assert!(stale.data_age_seconds >= 0);
    }

    #[tokio::test]
    async fn failed_live_run_reports_age_of_the_served_entry() {
        let service = SnapshotService::new(Arc::new(FailingProducer), Duration::from_secs(60));
        service
            .cache
            .set(SNAPSHOT_CACHE_KEY, empty_snapshot(), Duration::from_secs(60));

        let served = service.get_snapshot(true).await.unwrap();
        assert_eq!(served.cache_status, CacheStatus::Stale);
        assert!(served.data_age_seconds >= 0);
    }

    #[tokio::test]
    async fn failed_background_refresh_resets_the_flag() {
        let service = SnapshotService::new(Arc::new(FailingProducer), Duration::from_secs(60));

        service.request_background_refresh();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // A stuck flag would make this second request a silent no-op forever;
        // the guard must have reset it.
        assert!(!service.refreshing.load(Ordering::SeqCst));
        service.request_background_refresh();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!service.refreshing.load(Ordering::SeqCst));
    }
}
