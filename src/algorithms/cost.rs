use crate::algorithms::{AlgorithmInputs, AlgorithmKind, AlgorithmResult, Factor, ValuationAlgorithm};
use crate::error::Result;
use crate::types::property::PropertyInfo;

const DEFAULT_LAND_COST: f64 = 2600.0;
const DEFAULT_CONSTRUCTION_COST: f64 = 2000.0;
const INFRASTRUCTURE_COST: f64 = 800.0;
const MANAGEMENT_FEE_RATE: f64 = 0.05;
const FINANCING_RATE: f64 = 0.04;
const FINANCING_YEARS: f64 = 2.0;
const DEVELOPER_PROFIT_RATE: f64 = 0.15;
const USEFUL_LIFE_YEARS: f64 = 50.0;
const MAX_DEPRECIATION: f64 = 0.8;
const SALES_TAX_RATE: f64 = 0.05;

const LAND_COSTS: &[(&str, f64)] = &[
    ("湘潭-雨湖", 3000.0),
    ("湘潭-岳塘", 2800.0),
    ("湘潭-湘潭县", 2200.0),
];

/// Per-m² cost breakdown for replacing the building new.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplacementCost {
    pub land: f64,
    pub construction: f64,
    pub infrastructure: f64,
    pub management: f64,
    pub financing: f64,
    pub profit: f64,
}

impl ReplacementCost {
    pub fn for_property(property: &PropertyInfo) -> Self {
        let key = property.location.key();
        let land = LAND_COSTS
            .iter()
            .find(|(location, _)| *location == key)
            .map(|(_, cost)| *cost)
            .unwrap_or(DEFAULT_LAND_COST);
        let construction = match property.decoration_level.as_str() {
            "豪华装修" => 5000.0,
            "精装修" => 3500.0,
            "简装修" => 2000.0,
            "毛坯" => 1200.0,
            _ => DEFAULT_CONSTRUCTION_COST,
        };

        let direct = land + construction + INFRASTRUCTURE_COST;
        let management = direct * MANAGEMENT_FEE_RATE;
        let development = direct + management;

        ReplacementCost {
            land,
            construction,
            infrastructure: INFRASTRUCTURE_COST,
            management,
            financing: development * FINANCING_RATE * FINANCING_YEARS,
            profit: development * DEVELOPER_PROFIT_RATE,
        }
    }

    pub fn total(&self) -> f64 {
        self.land + self.construction + self.infrastructure + self.management + self.financing + self.profit
    }
}

/// Straight-line over the useful life, capped.
pub fn depreciation_rate(age: i32) -> f64 {
    (age as f64 / USEFUL_LIFE_YEARS).clamp(0.0, MAX_DEPRECIATION)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CostApproachAlgorithm;

impl CostApproachAlgorithm {
    pub fn new() -> Self {
        CostApproachAlgorithm
    }
}

impl ValuationAlgorithm for CostApproachAlgorithm {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::Cost
    }

    fn description(&self) -> &'static str {
        "基于重置成本的估价算法"
    }

    fn calculate(&self, property: &PropertyInfo, inputs: &AlgorithmInputs) -> Result<AlgorithmResult> {
        let replacement = ReplacementCost::for_property(property).total();
        let depreciation = depreciation_rate(property.age_at(inputs.current_year()));
        let depreciated = replacement * (1.0 - depreciation);
        let unit_price = depreciated / (1.0 - SALES_TAX_RATE);

        AlgorithmResult::from_unit_price(
            AlgorithmKind::Cost,
            unit_price,
            property.area,
            vec![
                Factor::new("重置成本", replacement, 0.4),
                Factor::new("折旧率", depreciation, 0.4),
                Factor::new("销售税费率", SALES_TAX_RATE, 0.2),
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

    #[test]
    fn test_replacement_cost_components() {
        let mut params = ValuationParams::defaults_for_year(2025);
        params.location = "湘潭-雨湖".to_string();
        params.decoration_level = "精装修".to_string();
        let cost = ReplacementCost::for_property(&PropertyInfo::from(&params));

        // direct 3000 + 3500 + 800 = 7300; management 365; development 7665
        assert_eq!(cost.land, 3000.0);
        assert!((cost.management - 365.0).abs() < 1e-9);
        assert!((cost.financing - 613.2).abs() < 1e-9);
        assert!((cost.profit - 1149.75).abs() < 1e-9);
        assert!((cost.total() - 9427.95).abs() < 1e-9);
    }

    #[test]
    fn test_depreciation_is_capped() {
        assert_eq!(depreciation_rate(0), 0.0);
        assert!((depreciation_rate(10) - 0.2).abs() < 1e-12);
        assert_eq!(depreciation_rate(60), MAX_DEPRECIATION);
    }

    #[test]
    fn test_new_building_grossed_up_for_tax() {
        let params = ValuationParams::defaults_for_year(2025);
        let mut property = PropertyInfo::from(&params);
        property.construction_year = 2025;
        let inputs = AlgorithmInputs::at(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());

        let result = CostApproachAlgorithm.calculate(&property, &inputs).unwrap();
        let expected_unit = ReplacementCost::for_property(&property).total() / 0.95;
        assert_eq!(result.unit_price, expected_unit.round() as i64);
        assert!((result.weight_sum() - 1.0).abs() < 1e-9);
    }
}
