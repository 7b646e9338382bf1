use tracing::Span;
use tracing_subscriber::EnvFilter;

pub fn trace_valuation(location: &str, method: &str) -> Span {
    tracing::info_span!(
        "valuation",
        location = %location,
        method = %method,
    )
}

pub fn trace_market_refresh(enabled_sources: usize) -> Span {
    tracing::info_span!(
        "market_refresh",
        enabled_sources = enabled_sources,
    )
}

/// Installs the global subscriber. Filtering follows `RUST_LOG`, defaulting
/// to `info`. Does nothing if a subscriber is already installed.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
