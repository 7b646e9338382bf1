use crate::config::{CacheConfig, MarketConfig, SourceConfig, ValuationConfig};
use crate::error::{Error, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub valuation: ValuationConfig,
    #[serde(default = "SourceConfig::defaults")]
    pub sources: Vec<SourceConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            cache: CacheConfig::default(),
            market: MarketConfig::default(),
            valuation: ValuationConfig::default(),
            sources: SourceConfig::defaults(),
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("VALUHUB").separator("__"))
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        config.try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))
    }

    /// Parses a TOML document. Sections it omits keep their defaults.
    pub fn from_toml(toml: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        config.try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceKind;

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [cache]
            capacity = 50

            [market]
            fetch_timeout_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.capacity, 50);
        assert_eq!(config.cache.ttl_secs, 86_400);
        assert_eq!(config.market.fetch_timeout_ms, 250);
        assert_eq!(config.market.update_interval_secs, 3600);
        assert_eq!(config.valuation.default_monthly_rent, 25.0);
        assert_eq!(config.sources.len(), 3);
    }

    #[test]
    fn test_tagged_source_kinds() {
        let config = AppConfig::from_toml(
            r#"
            [[sources]]
            id = "feed"
            name = "Feed"
            priority = 7
            kind = { type = "http", url = "http://localhost:9000/market" }

            [[sources]]
            id = "fallback"
            name = "Fallback"
            priority = 1
            enabled = false
            kind = { type = "static", preset = "default" }
            "#,
        )
        .unwrap();

        assert_eq!(config.sources.len(), 2);
        assert!(config.sources[0].enabled);
        assert_eq!(
            config.sources[0].kind,
            SourceKind::Http {
                url: "http://localhost:9000/market".to_string(),
                api_key: None,
            }
        );
        assert!(!config.sources[1].enabled);
    }
}
