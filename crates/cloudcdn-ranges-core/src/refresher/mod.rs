//! Background range refresher
//!
//! The RangeRefresher is responsible for:
//! - Fetching the prefix list once, synchronously, on start
//! - Re-fetching on every tick of a fixed interval
//! - Swapping in the new set only when a fetch succeeds
//! - Serving the current set to any number of readers without blocking
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   lookup_txt    ┌───────────────────┐
//! │ TxtResolver │◀────────────────│   refresh task    │◀── tick / cancel
//! └─────────────┘                 └───────────────────┘
//!                                           │ store (on success only)
//!                                           ▼
//!                                 ┌───────────────────┐
//!                                 │ ArcSwap<Snapshot> │──▶ ranges(), last_refresh()
//!                                 └───────────────────┘
//! ```
//!
//! ## Failure Handling
//!
//! A failed fetch (resolution or parse) is logged and dropped; the previous
//! set remains in place. There is no backoff: the next tick is the retry.

mod lifecycle;

pub use lifecycle::Lifecycle;

use crate::config::RefresherConfig;
use crate::error::{Error, Result};
use crate::fetch::fetch_prefixes;
use crate::prefix::PrefixSet;
use crate::traits::{IpRangeSource, SOURCE_ID, TxtResolver};
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// First-tick offset used when `now + interval` overflows
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// A successful fetch and the moment it was stored
///
/// Swapped as one unit, so a reader never pairs a set with another fetch's
/// timestamp.
struct Snapshot {
    ranges: Arc<PrefixSet>,
    refreshed_at: Option<DateTime<Utc>>,
}

/// State shared between the refresher handle and its background task
struct Shared {
    resolver: Arc<dyn TxtResolver>,
    hostname: String,
    current: ArcSwap<Snapshot>,
}

impl Shared {
    /// Fetch once and store the result if it succeeded
    async fn refresh(&self) -> Result<usize> {
        let prefixes = fetch_prefixes(self.resolver.as_ref(), &self.hostname).await?;
        let count = prefixes.len();
        self.current.store(Arc::new(Snapshot {
            ranges: Arc::new(prefixes),
            refreshed_at: Some(Utc::now()),
        }));
        Ok(count)
    }
}

/// Keeps the Cloud CDN edge ranges fresh
///
/// ## Lifecycle
///
/// 1. Create with [`RangeRefresher::new()`]
/// 2. Optionally tie to a host shutdown signal with [`RangeRefresher::with_cancellation()`]
/// 3. [`RangeRefresher::start()`] performs the first fetch and spawns the refresh task
/// 4. [`RangeRefresher::stop()`] (or host cancellation) ends the task; [`RangeRefresher::wait()`] joins it
///
/// Dropping the refresher stops its task but never cancels the host token.
///
/// ## Threading
///
/// [`RangeRefresher::ranges()`] is lock-free and may be called from any
/// thread while a refresh is in flight. Readers get either the old or the
/// new set in full.
pub struct RangeRefresher {
    shared: Arc<Shared>,

    /// Effective interval (already defaulted)
    interval: Duration,

    /// Child of the host token, cancelled by `stop()` and on drop
    shutdown: CancellationToken,

    lifecycle: Mutex<Lifecycle>,

    task: Mutex<Option<JoinHandle<()>>>,
}

impl RangeRefresher {
    /// Create a new refresher
    ///
    /// # Parameters
    ///
    /// - `resolver`: TXT resolver implementation
    /// - `config`: Refresher configuration
    pub fn new(resolver: Arc<dyn TxtResolver>, config: RefresherConfig) -> Result<Self> {
        config.validate()?;

        let interval = config.effective_interval();

        Ok(Self {
            shared: Arc::new(Shared {
                resolver,
                hostname: config.hostname,
                current: ArcSwap::from_pointee(Snapshot {
                    ranges: Arc::new(PrefixSet::empty()),
                    refreshed_at: None,
                }),
            }),
            interval,
            shutdown: CancellationToken::new(),
            lifecycle: Mutex::new(Lifecycle::NotStarted),
            task: Mutex::new(None),
        })
    }

    /// Tie the refresher to an externally owned shutdown signal
    ///
    /// Cancelling `token` stops the refresher. Stopping the refresher does
    /// not cancel `token`.
    pub fn with_cancellation(mut self, token: &CancellationToken) -> Self {
        self.shutdown = token.child_token();
        self
    }

    /// Start refreshing
    ///
    /// Awaits one fetch before returning, so the first read after `start()`
    /// sees data unless that fetch failed. A failed initial fetch is logged
    /// and leaves the set empty; it never fails startup.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Running (or already cancelled, in which case `Stopped`)
    /// - `Err(Error::Lifecycle)`: Called twice, or after stop
    pub async fn start(&self) -> Result<()> {
        {
            let mut lifecycle = self.lock_lifecycle();
            match *lifecycle {
                Lifecycle::NotStarted => {}
                other => {
                    return Err(Error::lifecycle(format!(
                        "cannot start a refresher that is {}",
                        other
                    )));
                }
            }

            if self.shutdown.is_cancelled() {
                info!("Shutdown already signaled, refresher not started");
                *lifecycle = Lifecycle::Stopped;
                return Ok(());
            }

            *lifecycle = Lifecycle::Running;
        }

        info!(
            "Starting range refresher (source={}, hostname={}, interval={:?}, resolver={})",
            SOURCE_ID,
            self.shared.hostname,
            self.interval,
            self.shared.resolver.resolver_name()
        );

        match self.shared.refresh().await {
            Ok(count) => info!("Initial fetch loaded {} prefix(es)", count),
            Err(e) => warn!("Initial fetch failed, starting with no ranges: {}", e),
        }

        let now = Instant::now();
        let first_tick = now
            .checked_add(self.interval)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        let handle = tokio::spawn(run_refresh_loop(
            Arc::clone(&self.shared),
            first_tick,
            self.interval,
            self.shutdown.clone(),
        ));
        *self.lock_task() = Some(handle);

        Ok(())
    }

    /// Signal the background task to exit
    ///
    /// Idempotent. An in-flight lookup is not interrupted; the task exits at
    /// its next wait point. The cached ranges are kept.
    pub fn stop(&self) {
        let mut lifecycle = self.lock_lifecycle();
        if !lifecycle.is_stopped() {
            info!("Stopping range refresher");
        }
        *lifecycle = Lifecycle::Stopped;
        self.shutdown.cancel();
    }

    /// Wait for the background task to exit
    ///
    /// Returns immediately if the task was never spawned or was already
    /// joined. Call after [`RangeRefresher::stop()`] or host cancellation.
    pub async fn wait(&self) {
        let handle = self.lock_task().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Refresh task ended abnormally: {}", e);
            }
        }
    }

    /// Current prefixes, without blocking on any in-flight fetch
    ///
    /// Empty until the first successful fetch.
    pub fn ranges(&self) -> Arc<PrefixSet> {
        Arc::clone(&self.shared.current.load().ranges)
    }

    /// Fetch without touching the cache
    pub async fn fetch(&self) -> Result<PrefixSet> {
        fetch_prefixes(self.shared.resolver.as_ref(), &self.shared.hostname).await
    }

    /// Current lifecycle state
    ///
    /// A running refresher whose host token was cancelled reports `Stopped`.
    pub fn state(&self) -> Lifecycle {
        let lifecycle = *self.lock_lifecycle();
        if lifecycle.is_running() && self.shutdown.is_cancelled() {
            Lifecycle::Stopped
        } else {
            lifecycle
        }
    }

    /// Time of the last successful fetch
    ///
    /// Stored together with the set it belongs to.
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.shared.current.load().refreshed_at
    }

    /// Effective refresh interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn hostname(&self) -> &str {
        &self.shared.hostname
    }

    fn lock_lifecycle(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_task(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl IpRangeSource for RangeRefresher {
    fn ranges(&self) -> Arc<PrefixSet> {
        RangeRefresher::ranges(self)
    }
}

impl Drop for RangeRefresher {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for RangeRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeRefresher")
            .field("hostname", &self.shared.hostname)
            .field("interval", &self.interval)
            .field("state", &self.state())
            .field("prefixes", &self.shared.current.load().ranges.len())
            .finish()
    }
}

/// Refresh on every tick until `shutdown` fires
///
/// `first_tick` is one full interval after the initial fetch in `start()`.
/// Ticks missed during a slow lookup are skipped rather than replayed.
async fn run_refresh_loop(
    shared: Arc<Shared>,
    first_tick: Instant,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(first_tick, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Range refresher stopped");
                break;
            }

            _ = ticker.tick() => {
                // Both branches may be ready at once; cancellation wins
                if shutdown.is_cancelled() {
                    info!("Range refresher stopped");
                    break;
                }

                debug!("Refreshing ranges from {}", shared.hostname);
                match shared.refresh().await {
                    Ok(count) => info!("Refreshed ranges: {} prefix(es)", count),
                    Err(e) => warn!("Refresh failed, keeping previous ranges: {}", e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingResolver {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl TxtResolver for CountingResolver {
        async fn lookup_txt(&self, _hostname: &str) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["v=spf1 ip4:34.96.0.0/20 ~all".to_string()])
        }

        fn resolver_name(&self) -> &'static str {
            "counting"
        }
    }

    fn refresher() -> (RangeRefresher, Arc<CountingResolver>) {
        let resolver = Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
        });
        let refresher = RangeRefresher::new(resolver.clone(), RefresherConfig::new())
            .expect("default config is valid");
        (refresher, resolver)
    }

    #[test]
    fn new_refresher_is_idle_and_empty() {
        let (refresher, resolver) = refresher();

        assert_eq!(refresher.state(), Lifecycle::NotStarted);
        assert!(refresher.ranges().is_empty());
        assert!(refresher.last_refresh().is_none());
        assert_eq!(refresher.interval(), crate::config::DEFAULT_INTERVAL);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn longest_interval_starts_without_overflow() {
        let resolver = Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
        });
        let config = RefresherConfig::new().with_interval(crate::config::MAX_INTERVAL);
        let refresher = RangeRefresher::new(resolver.clone(), config).unwrap();

        refresher.start().await.unwrap();
        assert_eq!(refresher.state(), Lifecycle::Running);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);

        refresher.stop();
        refresher.wait().await;
    }

    #[test]
    fn oversized_interval_is_rejected() {
        let resolver = Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
        });
        let config = RefresherConfig::new().with_interval(Duration::MAX);
        let result = RangeRefresher::new(resolver, config);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn timestamp_moves_with_the_set() {
        let (refresher, _resolver) = refresher();
        let before = refresher.shared.current.load_full();
        assert!(before.refreshed_at.is_none());

        refresher.start().await.unwrap();

        let after = refresher.shared.current.load_full();
        assert_eq!(after.ranges.len(), 1);
        assert_eq!(after.refreshed_at, refresher.last_refresh());
        assert!(Arc::ptr_eq(&after.ranges, &refresher.ranges()));

        refresher.stop();
        refresher.wait().await;
    }

    #[test]
    fn empty_hostname_is_rejected() {
        let resolver = Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
        });
        let result = RangeRefresher::new(resolver, RefresherConfig::new().with_hostname(" "));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn start_twice_is_a_lifecycle_error() {
        let (refresher, _resolver) = refresher();

        refresher.start().await.unwrap();
        let err = refresher.start().await.unwrap_err();
        assert!(matches!(err, Error::Lifecycle(_)));

        refresher.stop();
        refresher.wait().await;
    }

    #[tokio::test]
    async fn stop_before_start_is_terminal() {
        let (refresher, resolver) = refresher();

        refresher.stop();
        assert_eq!(refresher.state(), Lifecycle::Stopped);
        assert!(refresher.start().await.is_err());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_does_not_touch_the_cache() {
        let (refresher, _resolver) = refresher();

        let fetched = refresher.fetch().await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert!(refresher.ranges().is_empty());
    }

    #[tokio::test]
    async fn dropping_the_refresher_leaves_the_host_token_alone() {
        let host = CancellationToken::new();
        let (refresher, _resolver) = refresher();
        let refresher = refresher.with_cancellation(&host);

        refresher.start().await.unwrap();
        drop(refresher);

        assert!(!host.is_cancelled());
    }
}
