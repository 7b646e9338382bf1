use crate::algorithms::{
    AlgorithmInputs, AlgorithmKind, AlgorithmResult, AlgorithmWeight, BasicAlgorithm,
    CostApproachAlgorithm, Factor, IncomeCapitalizationAlgorithm, MarketComparisonAlgorithm,
    ValuationAlgorithm,
};
use crate::error::Result;
use crate::types::property::PropertyInfo;

/// Blend weights. They sum to 1.0, so the blend is a convex combination.
pub const BLEND_WEIGHTS: [(AlgorithmKind, f64); 4] = [
    (AlgorithmKind::Basic, 0.30),
    (AlgorithmKind::MarketComparison, 0.35),
    (AlgorithmKind::IncomeCapitalization, 0.20),
    (AlgorithmKind::Cost, 0.15),
];

/// Weighted blend of the basic, market, income and cost approaches.
#[derive(Debug, Default, Clone, Copy)]
pub struct ComprehensiveAlgorithm {
    basic: BasicAlgorithm,
    market: MarketComparisonAlgorithm,
    income: IncomeCapitalizationAlgorithm,
    cost: CostApproachAlgorithm,
}

impl ComprehensiveAlgorithm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs each component in `BLEND_WEIGHTS` order.
    pub fn components(&self, property: &PropertyInfo, inputs: &AlgorithmInputs) -> Result<Vec<AlgorithmResult>> {
        Ok(vec![
            self.basic.calculate(property, inputs)?,
            self.market.calculate(property, inputs)?,
            self.income.calculate(property, inputs)?,
            self.cost.calculate(property, inputs)?,
        ])
    }
}

impl ValuationAlgorithm for ComprehensiveAlgorithm {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::Comprehensive
    }

    fn description(&self) -> &'static str {
        "结合多种估价方法的综合估价算法"
    }

    fn calculate(&self, property: &PropertyInfo, inputs: &AlgorithmInputs) -> Result<AlgorithmResult> {
        let components = self.components(property, inputs)?;
        let total_weight: f64 = BLEND_WEIGHTS.iter().map(|(_, w)| w).sum();

        let mut price = 0.0;
        let mut unit_price = 0.0;
        let mut factors = Vec::with_capacity(components.len());
        let mut weights = Vec::with_capacity(components.len());

        for ((kind, weight), result) in BLEND_WEIGHTS.iter().zip(&components) {
            price += result.price as f64 * weight;
            unit_price += result.unit_price as f64 * weight;
            factors.push(Factor::new(kind.display_name(), result.unit_price as f64, *weight));
            weights.push(AlgorithmWeight {
                algorithm: *kind,
                weight: *weight,
                result_price: result.price,
            });
        }

        Ok(AlgorithmResult {
            price: (price / total_weight).round() as i64,
            unit_price: (unit_price / total_weight).round() as i64,
            algorithm: AlgorithmKind::Comprehensive,
            factors,
            algorithm_weights: Some(weights),
            degraded: components.iter().any(|r| r.degraded),
            computed_at: inputs.valuation_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::algorithms::RentData;
    use crate::types::property::ValuationParams;

    fn inputs() -> AlgorithmInputs {
        AlgorithmInputs::at(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap())
            .with_rent(RentData::market(25.0))
    }

    #[test]
    fn test_blend_weights_sum_to_one() {
        let sum: f64 = BLEND_WEIGHTS.iter().map(|(_, w)| w).sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_blend_lies_within_component_range() {
        let property = PropertyInfo::from(&ValuationParams::defaults_for_year(2025));
        let algorithm = ComprehensiveAlgorithm::new();
        let components = algorithm.components(&property, &inputs()).unwrap();
        let result = algorithm.calculate(&property, &inputs()).unwrap();

        let min = components.iter().map(|r| r.price).min().unwrap();
        let max = components.iter().map(|r| r.price).max().unwrap();
        assert!(min <= result.price && result.price <= max);

        let breakdown = result.algorithm_weights.unwrap();
        assert_eq!(breakdown.len(), 4);
        assert_eq!(breakdown[2].algorithm, AlgorithmKind::IncomeCapitalization);
        assert_eq!(breakdown[2].result_price, components[2].price);
        assert!(!result.degraded);
    }

    #[test]
    fn test_degraded_component_marks_blend() {
        let property = PropertyInfo::from(&ValuationParams::defaults_for_year(2025));
        let no_rent = AlgorithmInputs::at(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());
        let result = ComprehensiveAlgorithm::new().calculate(&property, &no_rent).unwrap();
        assert!(result.degraded);
    }
}
