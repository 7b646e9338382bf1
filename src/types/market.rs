use std::collections::BTreeMap;
use std::fmt;
use serde::{Deserialize, Serialize};

/// Source id carried by a snapshot produced by merging several feeds.
pub const MERGED_SOURCE_ID: &str = "merged";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketSentiment {
    #[serde(alias = "看涨")]
    Bullish,
    #[serde(alias = "看平")]
    Neutral,
    #[serde(alias = "看跌")]
    Bearish,
    #[serde(alias = "未知")]
    Unknown,
}

impl fmt::Display for MarketSentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MarketSentiment::Bullish => "看涨",
            MarketSentiment::Neutral => "看平",
            MarketSentiment::Bearish => "看跌",
            MarketSentiment::Unknown => "未知",
        };
        write!(f, "{}", label)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketTrend {
    /// Month over month growth, percent.
    pub monthly_growth: f64,
    /// Year over year growth, percent.
    pub annual_growth: f64,
    pub market_sentiment: MarketSentiment,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyImpact {
    pub mortgage_rate: f64,
    pub tax_policy: String,
    pub regulatory_policy: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketActivity {
    pub transaction_volume: u64,
    pub average_days_on_market: f64,
    pub price_negotiation_space: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAssessment {
    pub loan_to_value_ratio: f64,
    pub assessment_confidence: f64,
    pub risk_level: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernmentData {
    pub benchmark_land_price: f64,
    pub transaction_tax_rate: f64,
    pub regulatory_zone: String,
}

/// One feed's view of the market, or the merged view of all feeds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketData {
    #[serde(default)]
    pub area_indexes: BTreeMap<String, f64>,
    #[serde(default)]
    pub building_type_indexes: BTreeMap<String, f64>,
    #[serde(default)]
    pub trends: Option<MarketTrend>,
    #[serde(default)]
    pub base_prices: BTreeMap<String, f64>,
    #[serde(default)]
    pub liquidity_index: Option<f64>,
    #[serde(default)]
    pub policy_impact: Option<PolicyImpact>,
    #[serde(default)]
    pub market_activity: Option<MarketActivity>,
    #[serde(default)]
    pub bank_assessment: Option<BankAssessment>,
    #[serde(default)]
    pub government_data: Option<GovernmentData>,
    #[serde(default)]
    pub source_id: String,
}

impl MarketData {
    pub fn empty(source_id: impl Into<String>) -> Self {
        MarketData {
            area_indexes: BTreeMap::new(),
            building_type_indexes: BTreeMap::new(),
            trends: None,
            base_prices: BTreeMap::new(),
            liquidity_index: None,
            policy_impact: None,
            market_activity: None,
            bank_assessment: None,
            government_data: None,
            source_id: source_id.into(),
        }
    }

    pub fn area_index(&self, location: &str) -> Option<f64> {
        self.area_indexes.get(location).copied()
    }

    pub fn building_type_index(&self, building_type: &str) -> Option<f64> {
        self.building_type_indexes.get(building_type).copied()
    }

    pub fn base_price(&self, building_type: &str) -> Option<f64> {
        self.base_prices.get(building_type).copied()
    }

    pub fn sentiment(&self) -> MarketSentiment {
        self.trends
            .as_ref()
            .map(|t| t.market_sentiment)
            .unwrap_or(MarketSentiment::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentiment_accepts_chinese_labels() {
        let sentiment: MarketSentiment = serde_json::from_str("\"看涨\"").unwrap();
        assert_eq!(sentiment, MarketSentiment::Bullish);
        assert_eq!(MarketSentiment::Bearish.to_string(), "看跌");
    }

    #[test]
    fn test_partial_payload_deserializes() {
        let data: MarketData =
            serde_json::from_str(r#"{"areaIndexes":{"furong":1.2},"sourceId":"feed"}"#).unwrap();
        assert_eq!(data.area_index("furong"), Some(1.2));
        assert!(data.trends.is_none());
        assert_eq!(data.sentiment(), MarketSentiment::Unknown);
    }
}
