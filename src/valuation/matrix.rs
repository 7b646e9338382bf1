//! Multi-dimensional scoring matrix attached to every valuation.
//!
//! Twenty factors are scored on a 1–5 scale and grouped into five weighted
//! dimensions. Dimension scores and the total are rounded to one decimal.
//! The matrix describes the property; it does not change the price.

use serde::{Deserialize, Serialize};
use crate::types::property::ValuationParams;
use crate::utils::helper::round_to;
use crate::valuation::result::MarketDataImpact;

const MIN_SCORE: f64 = 1.0;
const MAX_SCORE: f64 = 5.0;

/// Score for qualitative factors no input describes.
const UNOBSERVED_QUALITY_SCORE: f64 = 4.3;
/// Score for location and market factors when neither GIS nor market data covers them.
const UNOBSERVED_CONTEXT_SCORE: f64 = 4.0;
/// Reinforced concrete, the assumed structure.
const STRUCTURE_SCORE: f64 = 4.5;
/// Supply and demand in balance.
const SUPPLY_DEMAND_SCORE: f64 = 3.5;

const BASE_CONFIDENCE: f64 = 85.0;
const CONFIDENCE_STEP: f64 = 5.0;
const MAX_CONFIDENCE: f64 = 100.0;

const AREA_LEVELS: &[(&str, f64)] = &[
    ("市中心", 5.0),
    ("城市中心区", 4.5),
    ("城市副中心", 4.0),
    ("城市新区", 3.5),
    ("城市郊区", 3.0),
    ("远郊区", 2.5),
    ("乡镇", 2.0),
    ("农村", 1.0),
];

const BUILDING_TYPES: &[(&str, f64)] = &[
    ("别墅", 5.0),
    ("花园洋房", 4.5),
    ("高层住宅", 4.0),
    ("小高层住宅", 4.0),
    ("多层住宅", 3.5),
    ("商业", 4.0),
    ("办公", 3.5),
    ("工业", 2.5),
];

const DECORATION_LEVELS: &[(&str, f64)] = &[
    ("豪华装修", 5.0),
    ("豪华", 5.0),
    ("精装修", 4.5),
    ("精装", 4.5),
    ("中装修", 3.5),
    ("中等", 3.5),
    ("简装修", 2.5),
    ("简装", 2.5),
    ("毛坯", 1.5),
];

const ORIENTATIONS: &[(&str, f64)] = &[
    ("南北通透", 5.0),
    ("南北", 5.0),
    ("朝南", 4.5),
    ("南", 4.5),
    ("东南", 4.0),
    ("西南", 3.5),
    ("朝北", 3.0),
    ("北", 3.0),
    ("朝东", 3.5),
    ("东", 3.5),
    ("朝西", 2.5),
    ("西", 2.5),
    ("东西通透", 3.5),
    ("东西", 3.5),
];

/// Optimal floor area band per building type, m².
const OPTIMAL_AREAS: &[(&str, (f64, f64))] = &[
    ("住宅", (90.0, 140.0)),
    ("商业", (50.0, 100.0)),
    ("办公", (80.0, 150.0)),
    ("别墅", (200.0, 300.0)),
];
const DEFAULT_OPTIMAL_AREA: (f64, f64) = (90.0, 140.0);

fn lookup(table: &[(&str, f64)], key: &str, default: f64) -> f64 {
    table
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, score)| *score)
        .unwrap_or(default)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatrixDimension {
    Location,
    Building,
    Layout,
    Market,
    Other,
}

impl MatrixDimension {
    pub const ALL: [MatrixDimension; 5] = [
        MatrixDimension::Location,
        MatrixDimension::Building,
        MatrixDimension::Layout,
        MatrixDimension::Market,
        MatrixDimension::Other,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            MatrixDimension::Location => "位置因素",
            MatrixDimension::Building => "建筑因素",
            MatrixDimension::Layout => "户型因素",
            MatrixDimension::Market => "市场因素",
            MatrixDimension::Other => "其他因素",
        }
    }

    pub fn weight(self) -> f64 {
        match self {
            MatrixDimension::Location | MatrixDimension::Building => 0.25,
            MatrixDimension::Market => 0.20,
            MatrixDimension::Layout | MatrixDimension::Other => 0.15,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatrixRating {
    #[serde(rename = "优秀")]
    Excellent,
    #[serde(rename = "良好")]
    Good,
    #[serde(rename = "中等")]
    Average,
    #[serde(rename = "较差")]
    Poor,
    #[serde(rename = "差")]
    VeryPoor,
}

impl MatrixRating {
    /// Bands over a score already rounded to one decimal. Anything below the
    /// scale is rated average.
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 4.5 => MatrixRating::Excellent,
            s if s >= 3.5 => MatrixRating::Good,
            s if s >= 2.5 => MatrixRating::Average,
            s if s >= 1.5 => MatrixRating::Poor,
            s if s >= 1.0 => MatrixRating::VeryPoor,
            _ => MatrixRating::Average,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MatrixRating::Excellent => "优秀",
            MatrixRating::Good => "良好",
            MatrixRating::Average => "中等",
            MatrixRating::Poor => "较差",
            MatrixRating::VeryPoor => "差",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorScore {
    pub id: String,
    pub name: String,
    pub dimension: MatrixDimension,
    /// Weight within its dimension.
    pub weight: f64,
    pub score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionScore {
    pub dimension: MatrixDimension,
    pub name: String,
    pub weight: f64,
    pub score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixEvaluation {
    pub total_score: f64,
    pub rating: MatrixRating,
    /// Percent, 85–100 depending on how much of the input was observed.
    pub confidence: f64,
    pub dimension_scores: Vec<DimensionScore>,
    pub factor_scores: Vec<FactorScore>,
}

impl MatrixEvaluation {
    pub fn dimension(&self, dimension: MatrixDimension) -> Option<f64> {
        self.dimension_scores
            .iter()
            .find(|d| d.dimension == dimension)
            .map(|d| d.score)
    }

    pub fn factor(&self, id: &str) -> Option<f64> {
        self.factor_scores.iter().find(|f| f.id == id).map(|f| f.score)
    }
}

struct MatrixInputs<'a> {
    params: &'a ValuationParams,
    market: &'a MarketDataImpact,
    age: i32,
}

struct FactorDef {
    dimension: MatrixDimension,
    id: &'static str,
    name: &'static str,
    weight: f64,
    score: fn(&MatrixInputs<'_>) -> f64,
}

const FACTORS: [FactorDef; 20] = [
    FactorDef {
        dimension: MatrixDimension::Location,
        id: "areaLevel",
        name: "区域等级",
        weight: 0.30,
        score: |i| lookup(AREA_LEVELS, &i.params.location, 3.0),
    },
    FactorDef {
        dimension: MatrixDimension::Location,
        id: "transportation",
        name: "交通便利度",
        weight: 0.25,
        score: |i| gis_score(i.params.gis.transportation),
    },
    FactorDef {
        dimension: MatrixDimension::Location,
        id: "surroundingFacilities",
        name: "周边配套",
        weight: 0.25,
        score: |i| facilities_score(i.params.nearby_facilities.len()),
    },
    FactorDef {
        dimension: MatrixDimension::Location,
        id: "environment",
        name: "环境质量",
        weight: 0.20,
        score: |i| gis_score(i.params.gis.environmental),
    },
    FactorDef {
        dimension: MatrixDimension::Building,
        id: "buildingType",
        name: "建筑类型",
        weight: 0.30,
        score: |i| lookup(BUILDING_TYPES, &i.params.building_type, 3.0),
    },
    FactorDef {
        dimension: MatrixDimension::Building,
        id: "decorationLevel",
        name: "装修等级",
        weight: 0.25,
        score: |i| lookup(DECORATION_LEVELS, &i.params.decoration_level, 3.0),
    },
    FactorDef {
        dimension: MatrixDimension::Building,
        id: "structure",
        name: "建筑结构",
        weight: 0.25,
        score: |_| STRUCTURE_SCORE,
    },
    FactorDef {
        dimension: MatrixDimension::Building,
        id: "buildingQuality",
        name: "建筑质量",
        weight: 0.20,
        score: |_| UNOBSERVED_QUALITY_SCORE,
    },
    FactorDef {
        dimension: MatrixDimension::Layout,
        id: "area",
        name: "面积",
        weight: 0.25,
        score: |i| area_score(i.params.area, &i.params.building_type),
    },
    FactorDef {
        dimension: MatrixDimension::Layout,
        id: "layoutStructure",
        name: "户型结构",
        weight: 0.25,
        score: |_| UNOBSERVED_QUALITY_SCORE,
    },
    FactorDef {
        dimension: MatrixDimension::Layout,
        id: "orientation",
        name: "朝向",
        weight: 0.25,
        score: |i| lookup(ORIENTATIONS, &i.params.orientation, 3.0),
    },
    FactorDef {
        dimension: MatrixDimension::Layout,
        id: "lightingVentilation",
        name: "采光通风",
        weight: 0.25,
        score: |_| UNOBSERVED_QUALITY_SCORE,
    },
    FactorDef {
        dimension: MatrixDimension::Market,
        id: "marketActivity",
        name: "市场活跃度",
        weight: 0.30,
        score: |i| market_activity_score(i.market),
    },
    FactorDef {
        dimension: MatrixDimension::Market,
        id: "priceTrend",
        name: "价格趋势",
        weight: 0.30,
        score: |i| price_trend_score(i.market),
    },
    FactorDef {
        dimension: MatrixDimension::Market,
        id: "supplyDemand",
        name: "供需关系",
        weight: 0.20,
        score: |_| SUPPLY_DEMAND_SCORE,
    },
    FactorDef {
        dimension: MatrixDimension::Market,
        id: "areaPopularity",
        name: "区域热度",
        weight: 0.20,
        score: |i| area_popularity_score(i.market),
    },
    FactorDef {
        dimension: MatrixDimension::Other,
        id: "propertyRight",
        name: "产权状况",
        weight: 0.30,
        score: |i| property_right_score(&i.params.building_type),
    },
    FactorDef {
        dimension: MatrixDimension::Other,
        id: "propertyManagement",
        name: "物业管理",
        weight: 0.25,
        score: |_| UNOBSERVED_QUALITY_SCORE,
    },
    FactorDef {
        dimension: MatrixDimension::Other,
        id: "floor",
        name: "楼层",
        weight: 0.25,
        score: |i| floor_score(i.params.floor, i.params.total_floors),
    },
    FactorDef {
        dimension: MatrixDimension::Other,
        id: "constructionYear",
        name: "建成年限",
        weight: 0.20,
        score: |i| age_score(i.age),
    },
];

/// Maps a 0–100 GIS score onto the 1–5 scale.
fn gis_score(value: Option<f64>) -> f64 {
    match value.filter(|v| v.is_finite()) {
        Some(v) => round_to(MIN_SCORE + v.clamp(0.0, 100.0) / 100.0 * (MAX_SCORE - MIN_SCORE), 1),
        None => UNOBSERVED_CONTEXT_SCORE,
    }
}

fn facilities_score(count: usize) -> f64 {
    if count == 0 {
        return 2.0;
    }
    round_to(2.0 + count as f64 / 10.0 * 3.0, 1).min(MAX_SCORE)
}

pub fn area_score(area: f64, building_type: &str) -> f64 {
    let (min, max) = OPTIMAL_AREAS
        .iter()
        .find(|(name, _)| *name == building_type)
        .map(|(_, band)| *band)
        .unwrap_or(DEFAULT_OPTIMAL_AREA);

    let within = |low: f64, high: f64| area >= min * low && area <= max * high;
    if within(1.0, 1.0) {
        5.0
    } else if within(0.8, 1.2) {
        4.0
    } else if within(0.6, 1.4) {
        3.0
    } else if within(0.4, 1.6) {
        2.0
    } else {
        1.0
    }
}

/// Middle floors (30%–70% of the building) score best, ground and top floors worst.
pub fn floor_score(floor: i32, total_floors: i32) -> f64 {
    if total_floors <= 1 {
        return 5.0;
    }
    let optimal_min = (total_floors as f64 * 0.3).ceil() as i32;
    let optimal_max = (total_floors as f64 * 0.7).floor() as i32;

    if (optimal_min..=optimal_max).contains(&floor) {
        5.0
    } else if (optimal_min - 2..=optimal_max + 2).contains(&floor) {
        4.0
    } else if (2..total_floors).contains(&floor) {
        3.0
    } else if floor == 1 || floor == total_floors {
        2.0
    } else {
        1.0
    }
}

fn age_score(age: i32) -> f64 {
    match age {
        a if a <= 5 => 5.0,
        a if a <= 10 => 4.5,
        a if a <= 15 => 4.0,
        a if a <= 20 => 3.5,
        a if a <= 30 => 3.0,
        a if a <= 40 => 2.5,
        _ => 2.0,
    }
}

fn market_activity_score(market: &MarketDataImpact) -> f64 {
    if !market.market_data_available {
        return UNOBSERVED_CONTEXT_SCORE;
    }
    round_to((3.0 + 2.0 * market.liquidity_index).clamp(MIN_SCORE, MAX_SCORE), 1)
}

fn area_popularity_score(market: &MarketDataImpact) -> f64 {
    if !market.market_data_available {
        return UNOBSERVED_CONTEXT_SCORE;
    }
    round_to((4.0 * market.area_index).clamp(MIN_SCORE, MAX_SCORE), 1)
}

/// Annual growth bands, percent. Without a trend the market is taken as rising steadily.
fn price_trend_score(market: &MarketDataImpact) -> f64 {
    let Some(trend) = market.market_trend.as_ref() else {
        return 4.5;
    };
    match trend.annual_growth {
        g if g >= 10.0 => 5.0,
        g if g >= 3.0 => 4.5,
        g if g > 0.0 => 4.0,
        g if g == 0.0 => 3.5,
        g if g > -3.0 => 3.0,
        g if g > -10.0 => 2.5,
        g if g <= -10.0 => 2.0,
        _ => 3.5,
    }
}

/// Commercial and office land carries a shorter title than residential.
fn property_right_score(building_type: &str) -> f64 {
    match building_type {
        "商业" | "办公" => 4.5,
        _ => 5.0,
    }
}

/// Scores every factor, then rolls them up into dimension and total scores.
pub fn evaluate_matrix(params: &ValuationParams, market: &MarketDataImpact, current_year: i32) -> MatrixEvaluation {
    let inputs = MatrixInputs {
        params,
        market,
        age: current_year.saturating_sub(params.construction_year).max(0),
    };

    let factor_scores: Vec<FactorScore> = FACTORS
        .iter()
        .map(|factor| FactorScore {
            id: factor.id.to_string(),
            name: factor.name.to_string(),
            dimension: factor.dimension,
            weight: factor.weight,
            score: (factor.score)(&inputs).clamp(MIN_SCORE, MAX_SCORE),
        })
        .collect();

    let dimension_scores: Vec<DimensionScore> = MatrixDimension::ALL
        .iter()
        .map(|&dimension| {
            let weighted: f64 = factor_scores
                .iter()
                .filter(|f| f.dimension == dimension)
                .map(|f| f.score * f.weight)
                .sum();
            DimensionScore {
                dimension,
                name: dimension.display_name().to_string(),
                weight: dimension.weight(),
                score: round_to(weighted, 1),
            }
        })
        .collect();

    let total_score = round_to(dimension_scores.iter().map(|d| d.score * d.weight).sum(), 1);

    MatrixEvaluation {
        total_score,
        rating: MatrixRating::from_score(total_score),
        confidence: matrix_confidence(params, market),
        dimension_scores,
        factor_scores,
    }
}

fn matrix_confidence(params: &ValuationParams, market: &MarketDataImpact) -> f64 {
    let gis = &params.gis;
    let has_gis = [
        gis.infrastructure,
        gis.environmental,
        gis.transportation,
        gis.commercial,
        gis.educational,
        gis.medical,
    ]
    .iter()
    .any(Option::is_some);

    let observed = [market.market_data_available, has_gis, !params.nearby_facilities.is_empty()]
        .iter()
        .filter(|&&o| o)
        .count();
    (BASE_CONFIDENCE + CONFIDENCE_STEP * observed as f64).min(MAX_CONFIDENCE)
}
