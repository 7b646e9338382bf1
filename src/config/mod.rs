use serde::{Deserialize, Serialize};

pub mod cache;
pub mod market;
pub mod sources;
pub mod loader;

pub use cache::CacheConfig;
pub use loader::AppConfig;
pub use market::MarketConfig;
pub use sources::{SourceConfig, SourceKind};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ValuationConfig {
    /// Market rent per m² per month fed to the income approach.
    pub default_monthly_rent: f64,
    /// Confidence reported for a comprehensive valuation on fresh market data.
    pub default_confidence: f64,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        ValuationConfig {
            default_monthly_rent: 25.0,
            default_confidence: 85.0,
        }
    }
}
