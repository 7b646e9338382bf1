use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::algorithms::{AlgorithmKind, AlgorithmResult, Factor};
use crate::types::ids::{PropertyId, ValuationId};
use crate::types::market::{
    BankAssessment, GovernmentData, MarketActivity, MarketData, MarketSentiment, MarketTrend,
    PolicyImpact,
};
use crate::types::property::ValuationParams;
use crate::utils::helper::{generate_property_id, generate_valuation_id};
use crate::valuation::matrix::MatrixEvaluation;

/// Base price reported when no snapshot quotes one for the building type.
pub const NEUTRAL_BASE_PRICE: f64 = 12500.0;

/// Market context attached to a valuation. It describes the snapshot the
/// valuation saw; it does not feed back into the price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDataImpact {
    pub area_index: f64,
    pub building_type_index: f64,
    pub market_trend: Option<MarketTrend>,
    pub used_base_price: f64,
    pub market_sentiment: MarketSentiment,
    pub liquidity_index: f64,
    pub policy_impact: Option<PolicyImpact>,
    pub market_activity: Option<MarketActivity>,
    pub bank_assessment: Option<BankAssessment>,
    pub government_data: Option<GovernmentData>,
    /// False when no snapshot was available.
    pub market_data_available: bool,
}

impl MarketDataImpact {
    pub fn neutral() -> Self {
        MarketDataImpact {
            area_index: 1.0,
            building_type_index: 1.0,
            market_trend: None,
            used_base_price: NEUTRAL_BASE_PRICE,
            market_sentiment: MarketSentiment::Unknown,
            liquidity_index: 0.0,
            policy_impact: None,
            market_activity: None,
            bank_assessment: None,
            government_data: None,
            market_data_available: false,
        }
    }

    pub fn from_snapshot(data: &MarketData, params: &ValuationParams) -> Self {
        MarketDataImpact {
            area_index: data.area_index(&params.location).unwrap_or(1.0),
            building_type_index: data.building_type_index(&params.building_type).unwrap_or(1.0),
            market_trend: data.trends.clone(),
            used_base_price: data.base_price(&params.building_type).unwrap_or(NEUTRAL_BASE_PRICE),
            market_sentiment: data.sentiment(),
            liquidity_index: data.liquidity_index.unwrap_or(0.0),
            policy_impact: data.policy_impact.clone(),
            market_activity: data.market_activity.clone(),
            bank_assessment: data.bank_assessment.clone(),
            government_data: data.government_data.clone(),
            market_data_available: true,
        }
    }
}

/// Output of one orchestrated valuation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationResult {
    pub id: ValuationId,
    pub property_id: PropertyId,
    pub valuation_date: DateTime<Utc>,
    pub total_value: i64,
    pub unit_price: i64,
    /// In (0, 100].
    pub confidence: f64,
    pub valuation_method: AlgorithmKind,
    pub factor_analysis: Vec<Factor>,
    pub pricing: AlgorithmResult,
    pub market_data_impact: MarketDataImpact,
    pub matrix_evaluation: MatrixEvaluation,
    pub valuation_params: ValuationParams,
    pub degraded: bool,
    /// Set on results served from the result cache.
    pub from_cache: bool,
}

impl ValuationResult {
    /// Copy of a cached result under a fresh identity.
    pub fn reissue(&self, at: DateTime<Utc>) -> Self {
        ValuationResult {
            id: generate_valuation_id(),
            property_id: generate_property_id(),
            valuation_date: at,
            from_cache: true,
            ..self.clone()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationMethodInfo {
    pub id: AlgorithmKind,
    pub name: String,
    pub description: String,
}

/// Spread of several algorithm results for the same property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmComparison {
    pub average_price: i64,
    pub average_unit_price: i64,
    pub min_price: i64,
    pub max_price: i64,
    pub results: Vec<AlgorithmResult>,
}

impl AlgorithmComparison {
    /// `None` for an empty slice.
    pub fn of(results: &[AlgorithmResult]) -> Option<Self> {
        if results.is_empty() {
            return None;
        }
        let n = results.len() as f64;
        let price_sum: f64 = results.iter().map(|r| r.price as f64).sum();
        let unit_sum: f64 = results.iter().map(|r| r.unit_price as f64).sum();

        Some(AlgorithmComparison {
            average_price: (price_sum / n).round() as i64,
            average_unit_price: (unit_sum / n).round() as i64,
            min_price: results.iter().map(|r| r.price).min()?,
            max_price: results.iter().map(|r| r.price).max()?,
            results: results.to_vec(),
        })
    }

    pub fn spread(&self) -> i64 {
        self.max_price - self.min_price
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::market_data::sources::static_source::default_market_data;

    fn result(price: i64) -> AlgorithmResult {
        AlgorithmResult {
            price,
            unit_price: price / 100,
            algorithm: AlgorithmKind::Basic,
            factors: vec![],
            algorithm_weights: None,
            degraded: false,
            computed_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_impact_reads_snapshot_with_fallbacks() {
        let data = default_market_data("default");
        let mut params = ValuationParams::defaults_for_year(2025);
        params.location = "furong".to_string();
        params.building_type = "商业".to_string();

        let impact = MarketDataImpact::from_snapshot(&data, &params);
        assert_eq!(impact.area_index, 1.26);
        assert_eq!(impact.building_type_index, 1.8);
        assert_eq!(impact.used_base_price, 22500.0);
        assert!(impact.market_data_available);

        params.location = "atlantis".to_string();
        params.building_type = "城堡".to_string();
        let impact = MarketDataImpact::from_snapshot(&data, &params);
        assert_eq!(impact.area_index, 1.0);
        assert_eq!(impact.used_base_price, NEUTRAL_BASE_PRICE);
    }

    #[test]
    fn test_neutral_impact() {
        let impact = MarketDataImpact::neutral();
        assert_eq!(impact.market_sentiment, MarketSentiment::Unknown);
        assert!(!impact.market_data_available);
    }

    #[test]
    fn test_comparison_spread() {
        let comparison = AlgorithmComparison::of(&[result(900_000), result(1_100_000), result(1_000_000)]).unwrap();
        assert_eq!(comparison.average_price, 1_000_000);
        assert_eq!(comparison.min_price, 900_000);
        assert_eq!(comparison.spread(), 200_000);
        assert!(AlgorithmComparison::of(&[]).is_none());
    }
}
