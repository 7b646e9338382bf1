use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, error, info, warn, Instrument};
use crate::config::loader::AppConfig;
use crate::config::MarketConfig;
use crate::error::{Error, Result};
use crate::market_data::merge::{merge_by_priority, SourceSnapshot};
use crate::market_data::scheduler::RefreshScheduler;
use crate::market_data::source::MarketDataSource;
use crate::market_data::sources::build_sources;
use crate::observability::metrics::{
    ACTIVE_SOURCES, MARKET_REFRESH_ATTEMPTS, MARKET_REFRESH_FAILURES, MARKET_REFRESH_LATENCY,
    MARKET_REFRESH_SUCCESSES, SNAPSHOT_HITS, SNAPSHOT_MISSES,
};
use crate::observability::tracing::trace_market_refresh;
use crate::types::ids::ListenerId;
use crate::types::market::MarketData;
use crate::utils::clock::Clock;

/// Called with every new merged snapshot.
pub type SnapshotListener = Arc<dyn Fn(&MarketData) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotState {
    /// No snapshot yet.
    Cold,
    /// Snapshot younger than the update interval.
    Warm,
    /// Snapshot older than the update interval.
    Stale,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatorStats {
    pub refresh_attempts: u64,
    pub refresh_successes: u64,
    pub refresh_failures: u64,
    /// Mean latency of successful refreshes.
    pub average_refresh_ms: f64,
    pub last_refresh_ms: u64,
    pub active_sources: usize,
    pub snapshot_hits: u64,
    pub snapshot_misses: u64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatorStatus {
    pub state: SnapshotState,
    pub last_updated: Option<DateTime<Utc>>,
    pub age_secs: Option<i64>,
    pub update_interval_secs: u64,
    pub is_outdated: bool,
    pub scheduler_running: bool,
    /// False when the refresh task died without being stopped.
    pub scheduler_healthy: bool,
    pub listener_count: usize,
    pub contributing_sources: Vec<String>,
    pub stats: AggregatorStats,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    pub id: String,
    pub name: String,
    pub priority: i32,
    pub enabled: bool,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub success_count: u64,
    pub failure_count: u64,
}

#[derive(Clone, Debug, Default)]
struct SourceHealth {
    last_success: Option<DateTime<Utc>>,
    last_error: Option<String>,
    success_count: u64,
    failure_count: u64,
}

struct RegisteredSource {
    source: Arc<dyn MarketDataSource>,
    enabled: AtomicBool,
}

struct CachedSnapshot {
    data: Arc<MarketData>,
    refreshed_at: DateTime<Utc>,
    contributing_sources: Vec<String>,
}

#[derive(Default)]
struct Counters {
    refresh_attempts: AtomicU64,
    refresh_successes: AtomicU64,
    refresh_failures: AtomicU64,
    total_refresh_ms: AtomicU64,
    last_refresh_ms: AtomicU64,
    active_sources: AtomicUsize,
    snapshot_hits: AtomicU64,
    snapshot_misses: AtomicU64,
}

/// Merges the configured feeds into one shared snapshot.
///
/// Readers get an `Arc<MarketData>` and never block on a refresh unless the
/// snapshot is missing or stale. Concurrent readers of a missing or stale
/// snapshot share a single refresh.
pub struct MarketDataAggregator {
    sources: Vec<RegisteredSource>,
    snapshot: RwLock<Option<Arc<CachedSnapshot>>>,
    refresh_lock: tokio::sync::Mutex<()>,
    listeners: RwLock<Vec<(ListenerId, SnapshotListener)>>,
    next_listener_id: AtomicU64,
    update_interval_ms: AtomicU64,
    fetch_timeout: Duration,
    health: DashMap<String, SourceHealth>,
    counters: Counters,
    scheduler: RefreshScheduler,
    clock: Arc<dyn Clock>,
}

impl MarketDataAggregator {
    pub fn new(config: &MarketConfig, clock: Arc<dyn Clock>) -> Self {
        MarketDataAggregator {
            sources: Vec::new(),
            snapshot: RwLock::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
            listeners: RwLock::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
            update_interval_ms: AtomicU64::new(config.update_interval().as_millis() as u64),
            fetch_timeout: config.fetch_timeout(),
            health: DashMap::new(),
            counters: Counters::default(),
            scheduler: RefreshScheduler::new(),
            clock,
        }
    }

    /// Aggregator over the sources listed in `config`.
    pub fn from_config(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let aggregator = build_sources(&config.sources)?
            .into_iter()
            .fold(Self::new(&config.market, clock), |aggregator, (source, enabled)| {
                aggregator.with_source(source, enabled)
            });
        Ok(aggregator)
    }

    /// Adds a source. A source with the same id is replaced.
    pub fn with_source(mut self, source: Arc<dyn MarketDataSource>, enabled: bool) -> Self {
        if let Some(pos) = self.sources.iter().position(|s| s.source.id() == source.id()) {
            warn!(source = %source.id(), "Replacing market data source with duplicate id");
            self.sources.remove(pos);
        }
        self.health.insert(source.id().to_string(), SourceHealth::default());
        self.sources.push(RegisteredSource {
            source,
            enabled: AtomicBool::new(enabled),
        });
        self
    }

    fn cached(&self) -> Option<Arc<CachedSnapshot>> {
        match self.snapshot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn store(&self, snapshot: Option<Arc<CachedSnapshot>>) {
        match self.snapshot.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    fn is_fresh(&self, snapshot: &CachedSnapshot) -> bool {
        let age = self.clock.now() - snapshot.refreshed_at;
        age.num_milliseconds() < self.update_interval_ms.load(Ordering::Relaxed) as i64
    }

    fn fresh_snapshot(&self) -> Option<Arc<MarketData>> {
        self.cached()
            .filter(|s| self.is_fresh(s))
            .map(|s| s.data.clone())
    }

    pub fn state(&self) -> SnapshotState {
        match self.cached() {
            None => SnapshotState::Cold,
            Some(s) if self.is_fresh(&s) => SnapshotState::Warm,
            Some(_) => SnapshotState::Stale,
        }
    }

    /// The merged snapshot, refreshing first if it is missing or stale.
    ///
    /// If that refresh fails a stale snapshot is still served; with no
    /// snapshot at all the refresh error is returned.
    pub async fn snapshot(&self) -> Result<Arc<MarketData>> {
        if let Some(data) = self.fresh_snapshot() {
            self.counters.snapshot_hits.fetch_add(1, Ordering::Relaxed);
            SNAPSHOT_HITS.inc();
            return Ok(data);
        }
        self.counters.snapshot_misses.fetch_add(1, Ordering::Relaxed);
        SNAPSHOT_MISSES.inc();

        let _guard = self.refresh_lock.lock().await;
        // Someone else may have refreshed while we waited.
        if let Some(data) = self.fresh_snapshot() {
            return Ok(data);
        }

        match self.refresh_locked().await {
            Ok(data) => Ok(data),
            Err(e) => match self.cached() {
                Some(stale) => {
                    warn!(error = %e, "Refresh failed, serving stale market snapshot");
                    Ok(stale.data.clone())
                }
                None => Err(e),
            },
        }
    }

    /// The current snapshot without triggering a refresh.
    pub fn current(&self) -> Option<Arc<MarketData>> {
        self.cached().map(|s| s.data.clone())
    }

    /// Refreshes now, regardless of the snapshot's age. On failure the
    /// previous snapshot is kept.
    pub async fn force_refresh(&self) -> Result<Arc<MarketData>> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Drops the snapshot. The next read refreshes.
    pub fn reset(&self) {
        self.store(None);
        info!("Market data snapshot reset");
    }

    async fn refresh_locked(&self) -> Result<Arc<MarketData>> {
        let enabled: Vec<Arc<dyn MarketDataSource>> = self
            .sources
            .iter()
            .filter(|s| s.enabled.load(Ordering::Relaxed))
            .map(|s| s.source.clone())
            .collect();

        let span = trace_market_refresh(enabled.len());
        self.refresh_sources(enabled).instrument(span).await
    }

    async fn refresh_sources(&self, enabled: Vec<Arc<dyn MarketDataSource>>) -> Result<Arc<MarketData>> {
        let started = Instant::now();
        self.counters.refresh_attempts.fetch_add(1, Ordering::Relaxed);
        MARKET_REFRESH_ATTEMPTS.inc();
        self.counters.active_sources.store(enabled.len(), Ordering::Relaxed);
        ACTIVE_SOURCES.set(enabled.len() as i64);

        if enabled.is_empty() {
            self.counters.refresh_failures.fetch_add(1, Ordering::Relaxed);
            MARKET_REFRESH_FAILURES.inc();
            warn!("No enabled market data sources");
            return Err(Error::NoEnabledSources);
        }

        let timeout = self.fetch_timeout;
        let handles = enabled.iter().map(|source| {
            let source = source.clone();
            tokio::spawn(async move {
                match tokio::time::timeout(timeout, source.fetch_data()).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::SourceTimeout {
                        source_id: source.id().to_string(),
                        timeout_ms: timeout.as_millis() as u64,
                    }),
                }
            })
        });
        let outcomes = join_all(handles).await;

        let mut fetched = Vec::with_capacity(enabled.len());
        for (source, outcome) in enabled.iter().zip(outcomes) {
            let outcome = outcome.unwrap_or_else(|join_error| {
                Err(Error::SourceFetch {
                    source_id: source.id().to_string(),
                    reason: format!("fetch task aborted: {}", join_error),
                })
            });
            match outcome {
                Ok(data) => {
                    self.record_success(source.id());
                    fetched.push(SourceSnapshot {
                        source_id: source.id().to_string(),
                        priority: source.priority(),
                        data,
                    });
                }
                Err(e) => {
                    warn!(source = %source.id(), error = %e, "Market data source failed");
                    self.record_failure(source.id(), &e);
                }
            }
        }

        if fetched.is_empty() {
            self.counters.refresh_failures.fetch_add(1, Ordering::Relaxed);
            MARKET_REFRESH_FAILURES.inc();
            error!(attempted = enabled.len(), "Every market data source failed, keeping previous snapshot");
            return Err(Error::AllSourcesFailed {
                attempted: enabled.len(),
            });
        }

        let contributing_sources: Vec<String> = fetched.iter().map(|s| s.source_id.clone()).collect();
        let data = Arc::new(merge_by_priority(fetched));
        self.store(Some(Arc::new(CachedSnapshot {
            data: data.clone(),
            refreshed_at: self.clock.now(),
            contributing_sources: contributing_sources.clone(),
        })));

        let elapsed = started.elapsed();
        let elapsed_ms = elapsed.as_millis() as u64;
        self.counters.refresh_successes.fetch_add(1, Ordering::Relaxed);
        self.counters.total_refresh_ms.fetch_add(elapsed_ms, Ordering::Relaxed);
        self.counters.last_refresh_ms.store(elapsed_ms, Ordering::Relaxed);
        MARKET_REFRESH_SUCCESSES.inc();
        MARKET_REFRESH_LATENCY.observe(elapsed.as_secs_f64());

        info!(
            sources = ?contributing_sources,
            elapsed_ms = elapsed_ms,
            "Market data snapshot refreshed"
        );

        self.notify_listeners(&data);
        Ok(data)
    }

    fn record_success(&self, source_id: &str) {
        let mut health = self.health.entry(source_id.to_string()).or_default();
        health.last_success = Some(self.clock.now());
        health.last_error = None;
        health.success_count += 1;
    }

    fn record_failure(&self, source_id: &str, error: &Error) {
        let mut health = self.health.entry(source_id.to_string()).or_default();
        health.last_error = Some(error.to_string());
        health.failure_count += 1;
    }

    fn listeners(&self) -> Vec<(ListenerId, SnapshotListener)> {
        match self.listeners.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn notify_listeners(&self, data: &MarketData) {
        for (id, listener) in self.listeners() {
            if catch_unwind(AssertUnwindSafe(|| listener(data))).is_err() {
                error!(listener = %id, "Market data listener panicked");
            }
        }
    }

    /// Registers a callback run after each successful refresh, in
    /// registration order.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&MarketData) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        let listener: SnapshotListener = Arc::new(listener);
        match self.listeners.write() {
            Ok(mut guard) => guard.push((id, listener)),
            Err(poisoned) => poisoned.into_inner().push((id, listener)),
        }
        debug!(listener = %id, "Market data listener added");
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut guard = match self.listeners.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = guard.len();
        guard.retain(|(listener_id, _)| *listener_id != id);
        guard.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    /// Takes effect at the next refresh.
    pub fn set_source_enabled(&self, source_id: &str, enabled: bool) -> Result<()> {
        let registered = self
            .sources
            .iter()
            .find(|s| s.source.id() == source_id)
            .ok_or_else(|| Error::SourceNotFound(source_id.to_string()))?;
        registered.enabled.store(enabled, Ordering::Relaxed);
        info!(source = %source_id, enabled = enabled, "Market data source toggled");
        Ok(())
    }

    pub fn source_status(&self) -> Vec<SourceStatus> {
        self.sources
            .iter()
            .map(|registered| {
                let source = &registered.source;
                let health = self
                    .health
                    .get(source.id())
                    .map(|h| h.value().clone())
                    .unwrap_or_default();
                SourceStatus {
                    id: source.id().to_string(),
                    name: source.name().to_string(),
                    priority: source.priority(),
                    enabled: registered.enabled.load(Ordering::Relaxed),
                    last_success: health.last_success,
                    last_error: health.last_error,
                    success_count: health.success_count,
                    failure_count: health.failure_count,
                }
            })
            .collect()
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms.load(Ordering::Relaxed))
    }

    /// Changes the staleness threshold and, if the schedule is running,
    /// restarts it on the new period.
    pub fn set_update_interval(self: &Arc<Self>, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(Error::ConfigError("update interval must be positive".to_string()));
        }
        self.update_interval_ms
            .store(interval.as_millis() as u64, Ordering::Relaxed);
        self.scheduler.restart(Arc::downgrade(self), interval);
        info!(interval_secs = interval.as_secs_f64(), "Market data update interval changed");
        Ok(())
    }

    /// Starts the background refresh. The first refresh runs immediately.
    pub fn start(self: &Arc<Self>) -> bool {
        self.scheduler.start(Arc::downgrade(self), self.update_interval())
    }

    pub fn stop(&self) -> bool {
        self.scheduler.stop()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn stats(&self) -> AggregatorStats {
        let successes = self.counters.refresh_successes.load(Ordering::Relaxed);
        let total_ms = self.counters.total_refresh_ms.load(Ordering::Relaxed);
        AggregatorStats {
            refresh_attempts: self.counters.refresh_attempts.load(Ordering::Relaxed),
            refresh_successes: successes,
            refresh_failures: self.counters.refresh_failures.load(Ordering::Relaxed),
            average_refresh_ms: if successes == 0 {
                0.0
            } else {
                total_ms as f64 / successes as f64
            },
            last_refresh_ms: self.counters.last_refresh_ms.load(Ordering::Relaxed),
            active_sources: self.counters.active_sources.load(Ordering::Relaxed),
            snapshot_hits: self.counters.snapshot_hits.load(Ordering::Relaxed),
            snapshot_misses: self.counters.snapshot_misses.load(Ordering::Relaxed),
        }
    }

    pub fn status(&self) -> AggregatorStatus {
        let cached = self.cached();
        let now = self.clock.now();
        let state = self.state();
        AggregatorStatus {
            state,
            last_updated: cached.as_ref().map(|s| s.refreshed_at),
            age_secs: cached.as_ref().map(|s| (now - s.refreshed_at).num_seconds()),
            update_interval_secs: self.update_interval().as_secs(),
            is_outdated: state != SnapshotState::Warm,
            scheduler_running: self.is_running(),
            scheduler_healthy: self.scheduler.check_health().is_ok(),
            listener_count: self.listener_count(),
            contributing_sources: cached
                .map(|s| s.contributing_sources.clone())
                .unwrap_or_default(),
            stats: self.stats(),
        }
    }
}

impl Drop for MarketDataAggregator {
    fn drop(&mut self) {
        self.scheduler.shutdown();
    }
}
