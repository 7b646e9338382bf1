//! Pricing algorithms and the typed registry that dispatches them.
//!
//! Every algorithm is a pure function of a [`PropertyInfo`] and the
//! [`AlgorithmInputs`] for the run. The valuation time travels in the inputs
//! so that two runs with the same inputs price identically.

pub mod basic;
pub mod comprehensive;
pub mod cost;
pub mod income;
pub mod market_comparison;
pub mod registry;

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::types::property::PropertyInfo;

pub use basic::BasicAlgorithm;
pub use comprehensive::ComprehensiveAlgorithm;
pub use cost::CostApproachAlgorithm;
pub use income::{IncomeCapitalizationAlgorithm, RentData};
pub use market_comparison::{Comparable, MarketComparisonAlgorithm};
pub use registry::AlgorithmRegistry;

/// Tolerance used when checking that factor weights sum to one.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlgorithmKind {
    #[serde(rename = "basic")]
    Basic,
    #[serde(rename = "market-comparison")]
    MarketComparison,
    #[serde(rename = "income")]
    IncomeCapitalization,
    #[serde(rename = "cost")]
    Cost,
    #[serde(rename = "comprehensive")]
    Comprehensive,
}

impl AlgorithmKind {
    pub const ALL: [AlgorithmKind; 5] = [
        AlgorithmKind::Basic,
        AlgorithmKind::MarketComparison,
        AlgorithmKind::IncomeCapitalization,
        AlgorithmKind::Cost,
        AlgorithmKind::Comprehensive,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            AlgorithmKind::Basic => "basic",
            AlgorithmKind::MarketComparison => "market-comparison",
            AlgorithmKind::IncomeCapitalization => "income",
            AlgorithmKind::Cost => "cost",
            AlgorithmKind::Comprehensive => "comprehensive",
        }
    }

    /// Display name used by the product.
    pub fn display_name(&self) -> &'static str {
        match self {
            AlgorithmKind::Basic => "基础估价法",
            AlgorithmKind::MarketComparison => "市场比较法",
            AlgorithmKind::IncomeCapitalization => "收益法",
            AlgorithmKind::Cost => "成本法",
            AlgorithmKind::Comprehensive => "综合估价法",
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for AlgorithmKind {
    type Err = String;

    /// Accepts either the id (`market-comparison`) or the display name (`市场比较法`).
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        AlgorithmKind::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(s) || kind.display_name() == s)
            .ok_or_else(|| format!("unknown valuation method: {}", s))
    }
}

/// Per-run inputs that are not attributes of the property itself.
#[derive(Clone, Debug)]
pub struct AlgorithmInputs {
    pub valuation_time: DateTime<Utc>,
    /// Comparable transactions. `None` selects the built-in default set.
    pub comparables: Option<Vec<Comparable>>,
    /// Rent assumptions. `None` makes the income approach degrade.
    pub rent: Option<RentData>,
}

impl AlgorithmInputs {
    pub fn at(valuation_time: DateTime<Utc>) -> Self {
        AlgorithmInputs {
            valuation_time,
            comparables: None,
            rent: None,
        }
    }

    pub fn with_comparables(mut self, comparables: Vec<Comparable>) -> Self {
        self.comparables = Some(comparables);
        self
    }

    pub fn with_rent(mut self, rent: RentData) -> Self {
        self.rent = Some(rent);
        self
    }

    pub fn current_year(&self) -> i32 {
        self.valuation_time.year()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Factor {
    pub name: String,
    pub value: f64,
    pub weight: f64,
}

impl Factor {
    pub fn new(name: impl Into<String>, value: f64, weight: f64) -> Self {
        Factor {
            name: name.into(),
            value,
            weight,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmWeight {
    pub algorithm: AlgorithmKind,
    pub weight: f64,
    pub result_price: i64,
}

/// Priced output of one algorithm run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmResult {
    pub price: i64,
    pub unit_price: i64,
    pub algorithm: AlgorithmKind,
    pub factors: Vec<Factor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm_weights: Option<Vec<AlgorithmWeight>>,
    /// Set when the algorithm lacked optional data and priced with the basic
    /// algorithm instead.
    pub degraded: bool,
    pub computed_at: DateTime<Utc>,
}

impl AlgorithmResult {
    /// Builds a result from an unrounded unit price: `price = round(unit × area)`.
    pub fn from_unit_price(
        algorithm: AlgorithmKind,
        unit_price: f64,
        area: f64,
        factors: Vec<Factor>,
        computed_at: DateTime<Utc>,
    ) -> Result<Self> {
        ensure_finite(algorithm, "unit price", unit_price)?;
        if unit_price < 0.0 {
            return Err(Error::Computation {
                algorithm,
                reason: format!("negative unit price {}", unit_price),
            });
        }
        for factor in &factors {
            ensure_finite(algorithm, &factor.name, factor.value)?;
        }

        Ok(AlgorithmResult {
            price: (unit_price * area).round() as i64,
            unit_price: unit_price.round() as i64,
            algorithm,
            factors,
            algorithm_weights: None,
            degraded: false,
            computed_at,
        })
    }

    /// Re-labels a basic result as the output of `algorithm` running degraded.
    pub fn degraded_as(mut self, algorithm: AlgorithmKind) -> Self {
        self.algorithm = algorithm;
        self.degraded = true;
        self
    }

    pub fn weight_sum(&self) -> f64 {
        self.factors.iter().map(|f| f.weight).sum()
    }
}

pub trait ValuationAlgorithm: Send + Sync {
    fn kind(&self) -> AlgorithmKind;

    fn description(&self) -> &'static str;

    fn calculate(&self, property: &PropertyInfo, inputs: &AlgorithmInputs) -> Result<AlgorithmResult>;
}

pub(crate) fn ensure_finite(algorithm: AlgorithmKind, what: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::Computation {
            algorithm,
            reason: format!("{} is not finite ({})", what, value),
        })
    }
}
