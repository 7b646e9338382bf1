use std::collections::BTreeMap;
use std::time::Duration;
use async_trait::async_trait;
use crate::error::{Error, Result};
use crate::market_data::source::MarketDataSource;
use crate::types::market::{MarketData, MarketSentiment, MarketTrend, PolicyImpact};

pub const DEFAULT_PRESET: &str = "default";
pub const GIS_PRESET: &str = "gis";

const AREAS: [&str; 10] = [
    "xjang",
    "furong",
    "yuelu",
    "tianxin",
    "kaifu",
    "yuhua",
    "wangcheng",
    "changsha_county",
    "ningxiang",
    "liuyang",
];

const BUILDING_TYPES: [&str; 10] = [
    "住宅", "商业", "办公", "工业", "别墅", "公寓", "写字楼", "商铺", "仓库", "厂房",
];

const DEFAULT_AREA_INDEXES: [f64; 10] = [1.0, 1.26, 0.896, 1.088, 1.136, 1.12, 0.85, 0.92, 0.78, 0.75];
const DEFAULT_TYPE_INDEXES: [f64; 10] = [1.0, 1.8, 1.5, 0.8, 2.0, 0.95, 1.45, 2.2, 0.7, 0.75];
const DEFAULT_BASE_PRICES: [f64; 10] = [
    12500.0, 22500.0, 18750.0, 10000.0, 25000.0, 11875.0, 22500.0, 27500.0, 8750.0, 9375.0,
];

const GIS_AREA_INDEXES: [f64; 10] = [1.05, 1.28, 0.92, 1.10, 1.15, 1.14, 0.87, 0.94, 0.80, 0.77];
const GIS_TYPE_INDEXES: [f64; 10] = [1.0, 1.85, 1.55, 0.82, 2.05, 0.97, 1.48, 2.25, 0.72, 0.78];
const GIS_BASE_PRICES: [f64; 10] = [
    13500.0, 24500.0, 20750.0, 11000.0, 27000.0, 12875.0, 24500.0, 29500.0, 9750.0, 10375.0,
];

fn table(keys: &[&str], values: &[f64]) -> BTreeMap<String, f64> {
    keys.iter()
        .zip(values)
        .map(|(k, v)| (k.to_string(), *v))
        .collect()
}

fn neutral_trend() -> MarketTrend {
    MarketTrend {
        monthly_growth: 0.15,
        annual_growth: 1.5,
        market_sentiment: MarketSentiment::Neutral,
    }
}

fn stable_policy(mortgage_rate: f64) -> PolicyImpact {
    PolicyImpact {
        mortgage_rate,
        tax_policy: "稳定".to_string(),
        regulatory_policy: "中性".to_string(),
    }
}

/// Built-in snapshot of the Changsha market as served by the fallback feed.
pub fn default_market_data(source_id: &str) -> MarketData {
    MarketData {
        area_indexes: table(&AREAS, &DEFAULT_AREA_INDEXES),
        building_type_indexes: table(&BUILDING_TYPES, &DEFAULT_TYPE_INDEXES),
        trends: Some(neutral_trend()),
        base_prices: table(&BUILDING_TYPES, &DEFAULT_BASE_PRICES),
        liquidity_index: Some(0.85),
        policy_impact: Some(stable_policy(4.45)),
        market_activity: None,
        bank_assessment: None,
        government_data: None,
        source_id: source_id.to_string(),
    }
}

/// Built-in snapshot derived from the GIS cost survey.
pub fn gis_market_data(source_id: &str) -> MarketData {
    MarketData {
        area_indexes: table(&AREAS, &GIS_AREA_INDEXES),
        building_type_indexes: table(&BUILDING_TYPES, &GIS_TYPE_INDEXES),
        trends: Some(neutral_trend()),
        base_prices: table(&BUILDING_TYPES, &GIS_BASE_PRICES),
        liquidity_index: Some(0.855),
        policy_impact: Some(stable_policy(4.5)),
        market_activity: None,
        bank_assessment: None,
        government_data: None,
        source_id: source_id.to_string(),
    }
}

/// Source serving a fixed snapshot, optionally after a delay.
#[derive(Clone, Debug)]
pub struct StaticMarketDataSource {
    id: String,
    name: String,
    priority: i32,
    data: MarketData,
    latency: Option<Duration>,
}

impl StaticMarketDataSource {
    pub fn new(id: impl Into<String>, name: impl Into<String>, priority: i32, data: MarketData) -> Self {
        StaticMarketDataSource {
            id: id.into(),
            name: name.into(),
            priority,
            data,
            latency: None,
        }
    }

    /// Source backed by one of the built-in presets (`default` or `gis`).
    pub fn preset(
        id: impl Into<String>,
        name: impl Into<String>,
        priority: i32,
        preset: &str,
    ) -> Result<Self> {
        let id = id.into();
        let data = match preset {
            DEFAULT_PRESET => default_market_data(&id),
            GIS_PRESET => gis_market_data(&id),
            other => {
                return Err(Error::ConfigError(format!(
                    "unknown market data preset '{}' for source {}",
                    other, id
                )));
            }
        };
        Ok(Self::new(id, name, priority, data))
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl MarketDataSource for StaticMarketDataSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn fetch_data(&self) -> Result<MarketData> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.data.clone())
    }
}
