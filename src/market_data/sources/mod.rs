pub mod http_source;
pub mod static_source;

use std::sync::Arc;
use crate::config::{SourceConfig, SourceKind};
use crate::error::Result;
use crate::market_data::source::MarketDataSource;

pub use http_source::HttpMarketDataSource;
pub use static_source::StaticMarketDataSource;

/// Builds the configured sources, paired with their initial enabled flag.
pub fn build_sources(configs: &[SourceConfig]) -> Result<Vec<(Arc<dyn MarketDataSource>, bool)>> {
    configs
        .iter()
        .map(|config| {
            let source: Arc<dyn MarketDataSource> = match &config.kind {
                SourceKind::Static { preset } => Arc::new(StaticMarketDataSource::preset(
                    config.id.clone(),
                    config.name.clone(),
                    config.priority,
                    preset,
                )?),
                SourceKind::Http { url, api_key } => Arc::new(HttpMarketDataSource::new(
                    config.id.clone(),
                    config.name.clone(),
                    config.priority,
                    url.clone(),
                    api_key.clone(),
                )),
            };
            Ok((source, config.enabled))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_source_configs_build() {
        let sources = build_sources(&SourceConfig::defaults()).unwrap();
        let ids: Vec<&str> = sources.iter().map(|(s, _)| s.id()).collect();
        assert_eq!(ids, vec!["gis-data-source", "real-estate-api", "default"]);

        let enabled: Vec<bool> = sources.iter().map(|(_, e)| *e).collect();
        assert_eq!(enabled, vec![true, false, true]);
    }
}
