use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use valuhub_engine::config::MarketConfig;
use valuhub_engine::error::{Error, Result};
use valuhub_engine::market_data::{
    MarketDataAggregator, MarketDataSource, SnapshotState, StaticMarketDataSource,
};
use valuhub_engine::types::market::{MarketData, MERGED_SOURCE_ID};
use valuhub_engine::utils::clock::ManualClock;

enum Behaviour {
    Quote(f64),
    Fail,
    Hang,
}

/// Source that quotes a furong index, fails or never answers.
struct ScriptedSource {
    id: String,
    priority: i32,
    behaviour: Behaviour,
    calls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    fn new(id: &str, priority: i32, behaviour: Behaviour) -> (Arc<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = Arc::new(ScriptedSource {
            id: id.to_string(),
            priority,
            behaviour,
            calls: calls.clone(),
        });
        (source, calls)
    }
}

#[async_trait]
impl MarketDataSource for ScriptedSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn fetch_data(&self) -> Result<MarketData> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Quote(index) => {
                let mut data = MarketData::empty(&self.id);
                data.area_indexes.insert("furong".to_string(), index);
                data.area_indexes.insert(format!("{}-only", self.id), index);
                Ok(data)
            }
            Behaviour::Fail => Err(Error::SourceFetch {
                source_id: self.id.clone(),
                reason: "upstream returned 503".to_string(),
            }),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(MarketData::empty(&self.id))
            }
        }
    }
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()))
}

fn config(update_interval_secs: u64) -> MarketConfig {
    MarketConfig {
        update_interval_secs,
        fetch_timeout_ms: 5000,
    }
}

#[tokio::test]
async fn higher_priority_source_wins_conflicts() {
    let (low, _) = ScriptedSource::new("low", 1, Behaviour::Quote(0.9));
    let (high, _) = ScriptedSource::new("high", 5, Behaviour::Quote(1.3));
    let aggregator = MarketDataAggregator::new(&config(3600), clock())
        .with_source(high, true)
        .with_source(low, true);

    let snapshot = aggregator.snapshot().await.unwrap();

    assert_eq!(snapshot.area_index("furong"), Some(1.3));
    assert_eq!(snapshot.area_index("low-only"), Some(0.9));
    assert_eq!(snapshot.area_index("high-only"), Some(1.3));
    assert_eq!(snapshot.source_id, MERGED_SOURCE_ID);
}

#[tokio::test]
async fn failing_source_is_skipped() {
    let (broken, broken_calls) = ScriptedSource::new("broken", 9, Behaviour::Fail);
    let (primary, _) = ScriptedSource::new("primary", 5, Behaviour::Quote(1.2));
    let (backup, _) = ScriptedSource::new("backup", 1, Behaviour::Quote(1.1));
    let aggregator = MarketDataAggregator::new(&config(3600), clock())
        .with_source(backup, true)
        .with_source(broken, true)
        .with_source(primary, true);

    let snapshot = aggregator.snapshot().await.unwrap();

    assert_eq!(broken_calls.load(Ordering::SeqCst), 1);
    assert_eq!(snapshot.area_index("furong"), Some(1.2));
    assert_eq!(snapshot.area_index("primary-only"), Some(1.2));
    assert_eq!(snapshot.area_index("backup-only"), Some(1.1));
    assert_eq!(snapshot.area_index("broken-only"), None);

    let status = aggregator.status();
    let mut contributing = status.contributing_sources.clone();
    contributing.sort();
    assert_eq!(contributing, vec!["backup".to_string(), "primary".to_string()]);
    assert_eq!(status.stats.refresh_successes, 1);
    assert_eq!(status.stats.active_sources, 3);
}

#[tokio::test(start_paused = true)]
async fn hung_source_times_out() {
    let (hung, _) = ScriptedSource::new("hung", 9, Behaviour::Hang);
    let (quick, _) = ScriptedSource::new("quick", 1, Behaviour::Quote(1.2));
    let aggregator = MarketDataAggregator::new(&config(3600), clock())
        .with_source(hung, true)
        .with_source(quick, true);

    let started = tokio::time::Instant::now();
    let snapshot = aggregator.force_refresh().await.unwrap();

    assert_eq!(snapshot.area_index("furong"), Some(1.2));
    assert!(started.elapsed() >= Duration::from_millis(5000));
    assert!(started.elapsed() < Duration::from_secs(3600));

    let hung_status = aggregator
        .source_status()
        .into_iter()
        .find(|s| s.id == "hung")
        .unwrap();
    assert_eq!(hung_status.failure_count, 1);
    assert!(hung_status.last_error.unwrap().contains("timed out"));
}

#[tokio::test]
async fn total_failure_keeps_previous_snapshot() {
    let clock = clock();
    let (feed, _) = ScriptedSource::new("feed", 1, Behaviour::Quote(1.05));
    let (broken, _) = ScriptedSource::new("broken", 2, Behaviour::Fail);
    let aggregator = MarketDataAggregator::new(&config(3600), clock.clone())
        .with_source(feed, true)
        .with_source(broken, false);

    let first = aggregator.force_refresh().await.unwrap();

    aggregator.set_source_enabled("feed", false).unwrap();
    aggregator.set_source_enabled("broken", true).unwrap();
    let err = aggregator.force_refresh().await.unwrap_err();
    assert!(matches!(err, Error::AllSourcesFailed { attempted: 1 }));
    assert_eq!(aggregator.current().unwrap(), first);

    clock.advance(chrono::Duration::hours(2));
    assert_eq!(aggregator.state(), SnapshotState::Stale);
    assert_eq!(aggregator.snapshot().await.unwrap(), first);
    assert_eq!(aggregator.stats().refresh_failures, 2);
}

#[tokio::test]
async fn static_presets_merge_with_gis_on_top() {
    let gis = StaticMarketDataSource::preset("gis", "GIS", 3, "gis").unwrap();
    let fallback = StaticMarketDataSource::preset("default", "Default", 1, "default").unwrap();
    let aggregator = MarketDataAggregator::new(&config(3600), clock())
        .with_source(Arc::new(fallback), true)
        .with_source(Arc::new(gis), true);

    let snapshot = aggregator.snapshot().await.unwrap();
    assert_eq!(snapshot.area_index("furong"), Some(1.28));
    assert_eq!(snapshot.base_price("住宅"), Some(13500.0));
}

#[tokio::test(start_paused = true)]
async fn scheduler_refreshes_on_its_period() {
    let (feed, calls) = ScriptedSource::new("feed", 1, Behaviour::Quote(1.0));
    let aggregator = Arc::new(MarketDataAggregator::new(&config(60), clock()).with_source(feed, true));

    assert!(aggregator.start());
    assert!(!aggregator.start());
    assert!(aggregator.is_running());
    assert!(aggregator.status().scheduler_healthy);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    assert!(aggregator.stop());
    assert!(!aggregator.is_running());
    assert!(aggregator.status().scheduler_healthy);
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn new_interval_restarts_schedule() {
    let (feed, calls) = ScriptedSource::new("feed", 1, Behaviour::Quote(1.0));
    let aggregator = Arc::new(MarketDataAggregator::new(&config(3600), clock()).with_source(feed, true));

    aggregator.start();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    aggregator.set_update_interval(Duration::from_secs(10)).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(aggregator.status().update_interval_secs, 10);
    aggregator.stop();
}

#[tokio::test(start_paused = true)]
async fn interval_change_while_stopped_does_not_start() {
    let (feed, calls) = ScriptedSource::new("feed", 1, Behaviour::Quote(1.0));
    let aggregator = Arc::new(MarketDataAggregator::new(&config(3600), clock()).with_source(feed, true));

    aggregator.set_update_interval(Duration::from_secs(5)).unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert!(!aggregator.is_running());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
