use crate::algorithms::{AlgorithmInputs, AlgorithmKind, AlgorithmResult, Factor, ValuationAlgorithm};
use crate::error::Result;
use crate::types::property::{GisScores, PropertyInfo};

/// Base unit price for locations missing from the table.
pub const DEFAULT_BASE_PRICE: f64 = 7000.0;

const BASE_PRICES: &[(&str, f64)] = &[
    ("湘潭-雨湖", 8000.0),
    ("湘潭-岳塘", 7500.0),
    ("湘潭-湘潭县", 6500.0),
];

// Relative importance of each factor. Normalized to sum to 1.0 before use.
const AGE_WEIGHT: f64 = 0.12;
const FLOOR_WEIGHT: f64 = 0.08;
const ORIENTATION_WEIGHT: f64 = 0.06;
const DECORATION_WEIGHT: f64 = 0.08;
const LOT_RATIO_WEIGHT: f64 = 0.06;
const GREEN_RATIO_WEIGHT: f64 = 0.06;
const PROPERTY_TYPE_WEIGHT: f64 = 0.07;
const COMMUNITY_WEIGHT: f64 = 0.08;
const SCHOOL_DISTRICT_WEIGHT: f64 = 0.09;
const TRANSPORTATION_WEIGHT: f64 = 0.08;
const CONVENIENCE_WEIGHT: f64 = 0.05;
const GIS_COST_INDEX_WEIGHT: f64 = 0.08;
const GIS_INFRASTRUCTURE_WEIGHT: f64 = 0.05;
const GIS_ENVIRONMENTAL_WEIGHT: f64 = 0.05;
const GIS_TRANSPORTATION_WEIGHT: f64 = 0.06;
const GIS_COMMERCIAL_WEIGHT: f64 = 0.05;
const GIS_EDUCATIONAL_WEIGHT: f64 = 0.09;
const GIS_MEDICAL_WEIGHT: f64 = 0.05;
const GIS_GREEN_SPACE_WEIGHT: f64 = 0.04;

/// Multiplicative factor model over a location base price.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicAlgorithm;

impl BasicAlgorithm {
    pub fn new() -> Self {
        BasicAlgorithm
    }

    /// Base unit price for the location, blended 40/60 with the GIS land price
    /// when one is known.
    pub fn base_price(property: &PropertyInfo) -> f64 {
        let key = property.location.key();
        let table_price = BASE_PRICES
            .iter()
            .find(|(location, _)| *location == key)
            .map(|(_, price)| *price)
            .unwrap_or(DEFAULT_BASE_PRICE);

        match property.gis.land_price {
            Some(land_price) if land_price > 0.0 => (table_price * 0.4 + land_price * 0.6).round(),
            _ => table_price,
        }
    }

    /// Unrounded unit price together with the normalized factor breakdown.
    pub fn unit_price(property: &PropertyInfo, inputs: &AlgorithmInputs) -> (f64, Vec<Factor>) {
        let factors = Self::factors(property, inputs.current_year());
        let multiplier: f64 = factors.iter().map(|f| f.value * f.weight).sum();
        (Self::base_price(property) * multiplier, factors)
    }

    fn factors(property: &PropertyInfo, current_year: i32) -> Vec<Factor> {
        let gis = &property.gis;
        let raw = vec![
            Factor::new("房龄", age_factor(property.age_at(current_year)), AGE_WEIGHT),
            Factor::new("楼层", floor_factor(property.floor, property.total_floors), FLOOR_WEIGHT),
            Factor::new("朝向", orientation_factor(&property.orientation), ORIENTATION_WEIGHT),
            Factor::new("装修", decoration_factor(&property.decoration_level), DECORATION_WEIGHT),
            Factor::new("容积率", lot_ratio_factor(property.lot_ratio), LOT_RATIO_WEIGHT),
            Factor::new("绿化率", green_ratio_factor(property.green_ratio), GREEN_RATIO_WEIGHT),
            Factor::new("物业类型", property_type_factor(&property.property_type), PROPERTY_TYPE_WEIGHT),
            Factor::new(
                "社区品质",
                community_quality_factor(&property.amenities.community_quality),
                COMMUNITY_WEIGHT,
            ),
            Factor::new(
                "学区房",
                if property.amenities.school_district { 1.2 } else { 1.0 },
                SCHOOL_DISTRICT_WEIGHT,
            ),
            Factor::new("交通便利度", transportation_factor(property), TRANSPORTATION_WEIGHT),
            Factor::new("生活便利性", living_convenience_factor(property), CONVENIENCE_WEIGHT),
            Factor::new("GIS造价指数", gis_cost_index_factor(gis), GIS_COST_INDEX_WEIGHT),
            Factor::new("GIS基础设施评分", score_factor(gis.infrastructure, 0.3), GIS_INFRASTRUCTURE_WEIGHT),
            Factor::new("GIS环境评分", score_factor(gis.environmental, 0.2), GIS_ENVIRONMENTAL_WEIGHT),
            Factor::new("GIS交通便利度评分", score_factor(gis.transportation, 0.25), GIS_TRANSPORTATION_WEIGHT),
            Factor::new("GIS商业配套评分", score_factor(gis.commercial, 0.3), GIS_COMMERCIAL_WEIGHT),
            Factor::new("GIS教育配套评分", score_factor(gis.educational, 0.4), GIS_EDUCATIONAL_WEIGHT),
            Factor::new("GIS医疗配套评分", score_factor(gis.medical, 0.25), GIS_MEDICAL_WEIGHT),
            Factor::new("GIS绿地率", score_factor(gis.green_space_ratio, 0.15), GIS_GREEN_SPACE_WEIGHT),
        ];

        normalize_weights(raw)
    }
}

impl ValuationAlgorithm for BasicAlgorithm {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::Basic
    }

    fn description(&self) -> &'static str {
        "基于基础参数的简单估价算法"
    }

    fn calculate(&self, property: &PropertyInfo, inputs: &AlgorithmInputs) -> Result<AlgorithmResult> {
        let (unit_price, factors) = Self::unit_price(property, inputs);
        AlgorithmResult::from_unit_price(
            AlgorithmKind::Basic,
            unit_price,
            property.area,
            factors,
            inputs.valuation_time,
        )
    }
}

fn normalize_weights(mut factors: Vec<Factor>) -> Vec<Factor> {
    let total: f64 = factors.iter().map(|f| f.weight).sum();
    for factor in &mut factors {
        factor.weight /= total;
    }
    factors
}

fn age_factor(age: i32) -> f64 {
    match age {
        a if a < 5 => 1.1,
        a if a < 10 => 1.0,
        a if a < 20 => 0.9,
        a if a < 30 => 0.8,
        _ => 0.7,
    }
}

fn floor_factor(floor: i32, total_floors: i32) -> f64 {
    if total_floors <= 6 {
        return match floor {
            3 | 4 => 1.1,
            2 | 5 => 1.0,
            1 | 6 => 0.9,
            _ => 1.0,
        };
    }

    let middle = total_floors / 2;
    if (middle - 2..=middle + 2).contains(&floor) {
        1.1
    } else if floor >= 2 && floor <= total_floors - 1 {
        1.0
    } else {
        0.9
    }
}

fn orientation_factor(orientation: &str) -> f64 {
    match orientation {
        "南北" | "南" => 1.1,
        "东西" | "东" => 1.0,
        "西" | "北" => 0.9,
        _ => 1.0,
    }
}

fn decoration_factor(level: &str) -> f64 {
    match level {
        "豪华装修" => 1.2,
        "精装修" => 1.1,
        "简装修" => 1.0,
        "毛坯" => 0.8,
        _ => 1.0,
    }
}

// Lower density scores higher.
fn lot_ratio_factor(lot_ratio: f64) -> f64 {
    match lot_ratio {
        r if r < 1.5 => 1.15,
        r if r < 2.5 => 1.05,
        r if r < 3.5 => 1.0,
        r if r < 4.5 => 0.95,
        _ => 0.9,
    }
}

fn green_ratio_factor(green_ratio: f64) -> f64 {
    match green_ratio {
        g if g >= 40.0 => 1.2,
        g if g >= 30.0 => 1.1,
        g if g >= 20.0 => 1.0,
        g if g >= 10.0 => 0.9,
        _ => 0.8,
    }
}

fn property_type_factor(property_type: &str) -> f64 {
    match property_type {
        "住宅" => 1.0,
        "别墅" => 1.3,
        "公寓" => 0.95,
        "写字楼" => 1.2,
        "商铺" => 1.4,
        "工业" => 0.7,
        "仓库" => 0.65,
        "厂房" => 0.75,
        _ => 1.0,
    }
}

fn community_quality_factor(quality: &str) -> f64 {
    match quality {
        "高档" => 1.2,
        "中档" => 1.0,
        "普通" => 0.9,
        "较差" => 0.8,
        _ => 1.0,
    }
}

fn transportation_factor(property: &PropertyInfo) -> f64 {
    let amenities = &property.amenities;
    let mut score = 1.0;

    score += match amenities.subway_distance {
        Some(d) if d < 500.0 => 0.15,
        Some(d) if d < 1000.0 => 0.1,
        Some(d) if d < 2000.0 => 0.05,
        _ => 0.0,
    };
    score += match amenities.bus_stop_distance {
        Some(d) if d < 200.0 => 0.08,
        Some(d) if d < 500.0 => 0.05,
        _ => 0.0,
    };
    score += amenities.transportation.len() as f64 * 0.03;

    score.min(1.3)
}

fn living_convenience_factor(property: &PropertyInfo) -> f64 {
    let amenities = &property.amenities;
    let mut score = 1.0;

    score += match amenities.hospital_distance {
        Some(d) if d < 1000.0 => 0.08,
        Some(d) if d < 2000.0 => 0.05,
        _ => 0.0,
    };
    score += match amenities.shopping_distance {
        Some(d) if d < 500.0 => 0.1,
        Some(d) if d < 1000.0 => 0.07,
        _ => 0.0,
    };
    score += match amenities.park_distance {
        Some(d) if d < 500.0 => 0.08,
        Some(d) if d < 1000.0 => 0.05,
        _ => 0.0,
    };
    score += property.nearby_facilities.len() as f64 * 0.03;

    score.min(1.3)
}

fn gis_cost_index_factor(gis: &GisScores) -> f64 {
    match gis.cost_index {
        Some(index) if index > 0.0 => index.clamp(0.8, 1.5),
        _ => 1.0,
    }
}

/// Maps a 0–100 score onto `1.0..=1.0 + span`.
fn score_factor(score: Option<f64>, span: f64) -> f64 {
    match score {
        Some(s) if s > 0.0 => 1.0 + (s.clamp(0.0, 100.0) / 100.0) * span,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::algorithms::WEIGHT_SUM_TOLERANCE;
    use crate::types::property::ValuationParams;

    fn inputs() -> AlgorithmInputs {
        AlgorithmInputs::at(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap())
    }

    fn property() -> PropertyInfo {
        PropertyInfo::from(&ValuationParams::defaults_for_year(2025))
    }

    #[test]
    fn test_age_bands() {
        assert_eq!(age_factor(0), 1.1);
        assert_eq!(age_factor(4), 1.1);
        assert_eq!(age_factor(5), 1.0);
        assert_eq!(age_factor(15), 0.9);
        assert_eq!(age_factor(25), 0.8);
        assert_eq!(age_factor(30), 0.7);
    }

    #[test]
    fn test_floor_factor_prefers_middle_of_high_rise() {
        assert_eq!(floor_factor(10, 20), 1.1);
        assert_eq!(floor_factor(3, 20), 1.0);
        assert_eq!(floor_factor(1, 20), 0.9);
        assert_eq!(floor_factor(20, 20), 0.9);
        assert_eq!(floor_factor(3, 6), 1.1);
        assert_eq!(floor_factor(6, 6), 0.9);
    }

    #[test]
    fn test_lot_ratio_inverse_and_green_ratio_direct() {
        assert!(lot_ratio_factor(1.0) > lot_ratio_factor(5.0));
        assert!(green_ratio_factor(45.0) > green_ratio_factor(5.0));
    }

    #[test]
    fn test_gis_scores_are_bounded() {
        assert_eq!(score_factor(None, 0.4), 1.0);
        assert!((score_factor(Some(100.0), 0.4) - 1.4).abs() < 1e-12);
        assert!((score_factor(Some(250.0), 0.15) - 1.15).abs() < 1e-12);
        assert!((score_factor(Some(50.0), 0.15) - 1.075).abs() < 1e-12);
    }

    #[test]
    fn test_weights_sum_to_one() {
        let result = BasicAlgorithm.calculate(&property(), &inputs()).unwrap();
        assert_eq!(result.factors.len(), 19);
        assert!((result.weight_sum() - 1.0).abs() < WEIGHT_SUM_TOLERANCE);
    }

    #[test]
    fn test_price_is_unit_price_times_area() {
        let property = property();
        let result = BasicAlgorithm.calculate(&property, &inputs()).unwrap();
        let (unit, _) = BasicAlgorithm::unit_price(&property, &inputs());
        assert_eq!(result.price, (unit * property.area).round() as i64);
        assert!(result.price > 0);
    }

    #[test]
    fn test_land_price_blends_into_base() {
        let mut property = property();
        assert_eq!(BasicAlgorithm::base_price(&property), DEFAULT_BASE_PRICE);

        property.gis.land_price = Some(10_000.0);
        assert_eq!(BasicAlgorithm::base_price(&property), 8800.0);
    }

    #[test]
    fn test_better_gis_scores_raise_price() {
        let plain = property();
        let mut scored = plain.clone();
        scored.gis.educational = Some(90.0);
        scored.gis.green_space_ratio = Some(60.0);

        let a = BasicAlgorithm.calculate(&plain, &inputs()).unwrap();
        let b = BasicAlgorithm.calculate(&scored, &inputs()).unwrap();
        assert!(b.price > a.price);
    }
}
