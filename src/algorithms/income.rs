use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::algorithms::basic::BasicAlgorithm;
use crate::algorithms::{AlgorithmInputs, AlgorithmKind, AlgorithmResult, Factor, ValuationAlgorithm};
use crate::error::Result;
use crate::types::property::PropertyInfo;

/// Economic life assumed for a building, in years.
const ECONOMIC_LIFE_YEARS: f64 = 70.0;
/// Remaining life at or above which no life discount applies.
const FULL_VALUE_REMAINING_YEARS: f64 = 50.0;

/// Rent and yield assumptions for the income approach.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentData {
    pub monthly_rent_per_sqm: f64,
    pub vacancy_rate: f64,
    pub operating_expense_rate: f64,
    pub capitalization_rate: f64,
}

impl RentData {
    /// Market rent with the standard vacancy, expense and cap-rate assumptions.
    pub fn market(monthly_rent_per_sqm: f64) -> Self {
        RentData {
            monthly_rent_per_sqm,
            vacancy_rate: 0.1,
            operating_expense_rate: 0.3,
            capitalization_rate: 0.06,
        }
    }

    fn is_usable(&self) -> bool {
        self.monthly_rent_per_sqm > 0.0
            && self.capitalization_rate > 0.0
            && (0.0..1.0).contains(&self.vacancy_rate)
            && (0.0..1.0).contains(&self.operating_expense_rate)
    }

    /// `gross × (1 − vacancy) × (1 − opex)` for `area` square metres.
    pub fn net_operating_income(&self, area: f64) -> f64 {
        let gross = area * self.monthly_rent_per_sqm * 12.0;
        gross * (1.0 - self.vacancy_rate) * (1.0 - self.operating_expense_rate)
    }
}

/// `min(1, max(0, 70 − age) / 50)`.
pub fn remaining_life_factor(age: i32) -> f64 {
    let remaining = (ECONOMIC_LIFE_YEARS - age as f64).max(0.0);
    (remaining / FULL_VALUE_REMAINING_YEARS).min(1.0)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct IncomeCapitalizationAlgorithm;

impl IncomeCapitalizationAlgorithm {
    pub fn new() -> Self {
        IncomeCapitalizationAlgorithm
    }
}

impl ValuationAlgorithm for IncomeCapitalizationAlgorithm {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::IncomeCapitalization
    }

    fn description(&self) -> &'static str {
        "基于预期收益的估价算法"
    }

    fn calculate(&self, property: &PropertyInfo, inputs: &AlgorithmInputs) -> Result<AlgorithmResult> {
        let rent = match inputs.rent.as_ref().filter(|r| r.is_usable()) {
            Some(rent) => rent,
            None => {
                debug!(location = %property.location, "No rent data, pricing with basic algorithm");
                return BasicAlgorithm
                    .calculate(property, inputs)
                    .map(|r| r.degraded_as(AlgorithmKind::IncomeCapitalization));
            }
        };

        let noi = rent.net_operating_income(property.area);
        let life_factor = remaining_life_factor(property.age_at(inputs.current_year()));
        let value = noi / rent.capitalization_rate * life_factor;

        AlgorithmResult::from_unit_price(
            AlgorithmKind::IncomeCapitalization,
            value / property.area,
            property.area,
            vec![
                Factor::new("净运营收入", noi, 0.5),
                Factor::new("资本化率", rent.capitalization_rate, 0.3),
                Factor::new("剩余经济寿命系数", life_factor, 0.2),
            ],
            inputs.valuation_time,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::types::property::ValuationParams;

    fn inputs() -> AlgorithmInputs {
        AlgorithmInputs::at(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_life_factor() {
        assert_eq!(remaining_life_factor(0), 1.0);
        assert_eq!(remaining_life_factor(20), 1.0);
        assert!((remaining_life_factor(45) - 0.5).abs() < 1e-12);
        assert_eq!(remaining_life_factor(80), 0.0);
    }

    #[test]
    fn test_capitalized_value() {
        // 100 m² × 25 × 12 = 30 000 gross; × 0.9 × 0.7 = 18 900 NOI; / 0.06 = 315 000.
        let property = PropertyInfo::from(&ValuationParams::defaults_for_year(2025));
        let inputs = inputs().with_rent(RentData::market(25.0));

        let result = IncomeCapitalizationAlgorithm.calculate(&property, &inputs).unwrap();
        assert_eq!(result.price, 315_000);
        assert_eq!(result.unit_price, 3150);
        assert!(!result.degraded);
        assert!((result.weight_sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_rent_degrades_to_basic() {
        let property = PropertyInfo::from(&ValuationParams::defaults_for_year(2025));
        let result = IncomeCapitalizationAlgorithm.calculate(&property, &inputs()).unwrap();
        let basic = BasicAlgorithm.calculate(&property, &inputs()).unwrap();

        assert!(result.degraded);
        assert_eq!(result.price, basic.price);

        let zero_rent = inputs().with_rent(RentData::market(0.0));
        assert!(IncomeCapitalizationAlgorithm.calculate(&property, &zero_rent).unwrap().degraded);
    }
}
