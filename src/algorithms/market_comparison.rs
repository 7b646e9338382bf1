use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::algorithms::basic::BasicAlgorithm;
use crate::algorithms::{AlgorithmInputs, AlgorithmKind, AlgorithmResult, Factor, ValuationAlgorithm};
use crate::error::Result;
use crate::types::property::PropertyInfo;

/// Distance at which the distance weight bottoms out at 0.5.
const DISTANCE_HORIZON: f64 = 2000.0;
/// Age in days at which the recency weight bottoms out at 0.5.
const RECENCY_HORIZON_DAYS: f64 = 365.0;

/// A previously transacted property used as evidence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparable {
    pub id: String,
    pub price: f64,
    pub unit_price: f64,
    pub area: f64,
    #[serde(default)]
    pub building_type: Option<String>,
    pub distance: f64,
    pub similarity: f64,
    pub transaction_date: NaiveDate,
}

impl Comparable {
    /// `0.4 × distance + 0.4 × similarity + 0.2 × recency`.
    pub fn weight(&self, valuation_date: NaiveDate) -> f64 {
        let distance_weight = (1.0 - self.distance / DISTANCE_HORIZON).clamp(0.5, 1.0);
        let similarity_weight = self.similarity.clamp(0.0, 1.0);
        let days = (valuation_date - self.transaction_date).num_days() as f64;
        let recency_weight = (1.0 - days / RECENCY_HORIZON_DAYS).clamp(0.5, 1.0);

        0.4 * distance_weight + 0.4 * similarity_weight + 0.2 * recency_weight
    }

    fn is_usable(&self) -> bool {
        self.area > 0.0 && self.unit_price > 0.0 && self.area.is_finite() && self.unit_price.is_finite()
    }
}

/// Built-in evidence used when the caller supplies none.
pub fn default_comparables(subject_area: f64, valuation_date: NaiveDate) -> Vec<Comparable> {
    vec![
        Comparable {
            id: "1".to_string(),
            price: 850_000.0,
            unit_price: 7083.0,
            area: subject_area * 0.95,
            building_type: None,
            distance: 500.0,
            similarity: 0.92,
            transaction_date: valuation_date - Duration::days(30),
        },
        Comparable {
            id: "2".to_string(),
            price: 920_000.0,
            unit_price: 7109.0,
            area: subject_area * 1.05,
            building_type: None,
            distance: 800.0,
            similarity: 0.88,
            transaction_date: valuation_date - Duration::days(45),
        },
        Comparable {
            id: "3".to_string(),
            price: 880_000.0,
            unit_price: 7213.0,
            area: subject_area * 0.98,
            building_type: None,
            distance: 300.0,
            similarity: 0.95,
            transaction_date: valuation_date - Duration::days(15),
        },
    ]
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MarketComparisonAlgorithm;

impl MarketComparisonAlgorithm {
    pub fn new() -> Self {
        MarketComparisonAlgorithm
    }
}

impl ValuationAlgorithm for MarketComparisonAlgorithm {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::MarketComparison
    }

    fn description(&self) -> &'static str {
        "基于市场成交案例的比较估价算法"
    }

    fn calculate(&self, property: &PropertyInfo, inputs: &AlgorithmInputs) -> Result<AlgorithmResult> {
        let valuation_date = inputs.valuation_time.date_naive();
        let comparables = match &inputs.comparables {
            Some(supplied) => supplied.clone(),
            None => default_comparables(property.area, valuation_date),
        };

        let weighted: Vec<(&Comparable, f64)> = comparables
            .iter()
            .filter(|c| c.is_usable())
            .map(|c| (c, c.weight(valuation_date)))
            .collect();

        if weighted.is_empty() {
            debug!(location = %property.location, "No usable comparables, pricing with basic algorithm");
            return BasicAlgorithm
                .calculate(property, inputs)
                .map(|r| r.degraded_as(AlgorithmKind::MarketComparison));
        }

        let total_weight: f64 = weighted.iter().map(|(_, w)| w).sum();
        let weighted_unit_price =
            weighted.iter().map(|(c, w)| c.unit_price * w).sum::<f64>() / total_weight;
        let weighted_area = weighted.iter().map(|(c, w)| c.area * w).sum::<f64>() / total_weight;
        let area_adjustment = property.area / weighted_area;

        AlgorithmResult::from_unit_price(
            AlgorithmKind::MarketComparison,
            weighted_unit_price * area_adjustment,
            property.area,
            vec![
                Factor::new("加权平均单价", weighted_unit_price, 0.6),
                Factor::new("面积调整系数", area_adjustment, 0.4),
            ],
            inputs.valuation_time,
        )
    }
}
