use std::sync::Once;
use lazy_static::lazy_static;
use prometheus::{
    Counter, Encoder, Histogram, HistogramOpts, IntGauge, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Valuation metrics
    pub static ref VALUATIONS_COMPUTED: Counter = Counter::new(
        "valuations_computed_total",
        "Total number of valuations computed by an algorithm"
    ).unwrap();

    pub static ref VALUATIONS_FAILED: Counter = Counter::new(
        "valuations_failed_total",
        "Total number of valuations that failed after validation"
    ).unwrap();

    pub static ref VALUATIONS_REJECTED: Counter = Counter::new(
        "valuations_rejected_total",
        "Total number of valuation requests rejected by validation"
    ).unwrap();

    // Result cache metrics
    pub static ref RESULT_CACHE_HITS: Counter = Counter::new(
        "result_cache_hits_total",
        "Valuation result cache hits"
    ).unwrap();

    pub static ref RESULT_CACHE_MISSES: Counter = Counter::new(
        "result_cache_misses_total",
        "Valuation result cache misses"
    ).unwrap();

    // Market data metrics
    pub static ref MARKET_REFRESH_ATTEMPTS: Counter = Counter::new(
        "market_refresh_attempts_total",
        "Market data refresh attempts"
    ).unwrap();

    pub static ref MARKET_REFRESH_SUCCESSES: Counter = Counter::new(
        "market_refresh_successes_total",
        "Market data refreshes that produced a snapshot"
    ).unwrap();

    pub static ref MARKET_REFRESH_FAILURES: Counter = Counter::new(
        "market_refresh_failures_total",
        "Market data refreshes where no source succeeded"
    ).unwrap();

    pub static ref SNAPSHOT_HITS: Counter = Counter::new(
        "market_snapshot_hits_total",
        "Snapshot reads served without a refresh"
    ).unwrap();

    pub static ref SNAPSHOT_MISSES: Counter = Counter::new(
        "market_snapshot_misses_total",
        "Snapshot reads that required a refresh"
    ).unwrap();

    pub static ref ACTIVE_SOURCES: IntGauge = IntGauge::new(
        "market_active_sources",
        "Enabled market data sources at the last refresh"
    ).unwrap();

    // Latency metrics
    pub static ref MARKET_REFRESH_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "market_refresh_latency_seconds",
            "Market data refresh latency"
        ).buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0])
    ).unwrap();

    pub static ref VALUATION_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "valuation_latency_seconds",
            "End to end valuation latency"
        ).buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.1, 1.0])
    ).unwrap();
}

static REGISTER: Once = Once::new();

/// Registers every metric with [`REGISTRY`]. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        REGISTRY.register(Box::new(VALUATIONS_COMPUTED.clone())).unwrap();
        REGISTRY.register(Box::new(VALUATIONS_FAILED.clone())).unwrap();
        REGISTRY.register(Box::new(VALUATIONS_REJECTED.clone())).unwrap();
        REGISTRY.register(Box::new(RESULT_CACHE_HITS.clone())).unwrap();
        REGISTRY.register(Box::new(RESULT_CACHE_MISSES.clone())).unwrap();
        REGISTRY.register(Box::new(MARKET_REFRESH_ATTEMPTS.clone())).unwrap();
        REGISTRY.register(Box::new(MARKET_REFRESH_SUCCESSES.clone())).unwrap();
        REGISTRY.register(Box::new(MARKET_REFRESH_FAILURES.clone())).unwrap();
        REGISTRY.register(Box::new(SNAPSHOT_HITS.clone())).unwrap();
        REGISTRY.register(Box::new(SNAPSHOT_MISSES.clone())).unwrap();
        REGISTRY.register(Box::new(ACTIVE_SOURCES.clone())).unwrap();
        REGISTRY.register(Box::new(MARKET_REFRESH_LATENCY.clone())).unwrap();
        REGISTRY.register(Box::new(VALUATION_LATENCY.clone())).unwrap();
    });
}

/// Renders [`REGISTRY`] in the Prometheus text exposition format.
pub fn gather_text() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if encoder.encode(&REGISTRY.gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
