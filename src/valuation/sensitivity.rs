use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use crate::error::Result;
use crate::types::property::{ValuationParams, ValuationRequest};
use crate::utils::helper::round_to;
use crate::valuation::orchestrator::ValuationOrchestrator;
use crate::valuation::result::ValuationResult;

/// Numeric inputs that can be varied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SensitivityParameter {
    Area,
    ConstructionYear,
    Floor,
    TotalFloors,
    LotRatio,
    GreenRatio,
}

impl SensitivityParameter {
    pub fn name(&self) -> &'static str {
        match self {
            SensitivityParameter::Area => "area",
            SensitivityParameter::ConstructionYear => "constructionYear",
            SensitivityParameter::Floor => "floor",
            SensitivityParameter::TotalFloors => "totalFloors",
            SensitivityParameter::LotRatio => "lotRatio",
            SensitivityParameter::GreenRatio => "greenRatio",
        }
    }

    pub fn read(&self, params: &ValuationParams) -> f64 {
        match self {
            SensitivityParameter::Area => params.area,
            SensitivityParameter::ConstructionYear => params.construction_year as f64,
            SensitivityParameter::Floor => params.floor as f64,
            SensitivityParameter::TotalFloors => params.total_floors as f64,
            SensitivityParameter::LotRatio => params.lot_ratio,
            SensitivityParameter::GreenRatio => params.green_ratio,
        }
    }

    /// Integer fields take the rounded value.
    pub fn apply(&self, params: &mut ValuationParams, value: f64) {
        match self {
            SensitivityParameter::Area => params.area = value,
            SensitivityParameter::ConstructionYear => params.construction_year = value.round() as i32,
            SensitivityParameter::Floor => params.floor = value.round() as i32,
            SensitivityParameter::TotalFloors => params.total_floors = value.round() as i32,
            SensitivityParameter::LotRatio => params.lot_ratio = value,
            SensitivityParameter::GreenRatio => params.green_ratio = value,
        }
    }
}

impl fmt::Display for SensitivityParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SensitivityParameter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        const ALL: [SensitivityParameter; 6] = [
            SensitivityParameter::Area,
            SensitivityParameter::ConstructionYear,
            SensitivityParameter::Floor,
            SensitivityParameter::TotalFloors,
            SensitivityParameter::LotRatio,
            SensitivityParameter::GreenRatio,
        ];
        ALL.into_iter()
            .find(|p| p.name() == s.trim())
            .ok_or_else(|| format!("parameter '{}' cannot be varied", s))
    }
}

/// Alternative values for one parameter. `base` overrides the reference
/// value used for `change_percent`; by default it is the base request's value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterVariation {
    #[serde(default)]
    pub base: Option<f64>,
    pub variations: Vec<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SensitivityPlan {
    pub parameters: BTreeMap<SensitivityParameter, ParameterVariation>,
}

impl SensitivityPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vary(mut self, parameter: SensitivityParameter, values: impl Into<Vec<f64>>) -> Self {
        self.parameters.entry(parameter).or_default().variations = values.into();
        self
    }

    pub fn with_base(mut self, parameter: SensitivityParameter, base: f64) -> Self {
        self.parameters.entry(parameter).or_default().base = Some(base);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitivityPoint {
    pub param_value: f64,
    pub total_value: i64,
    pub unit_price: i64,
    /// `(param_value − base_value) / base_value × 100` to two places; zero
    /// when the base value is zero.
    pub change_percent: f64,
    /// Change of the total value relative to the base valuation, percent.
    pub value_change_percent: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitivityFailure {
    pub param_value: f64,
    pub messages: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSensitivity {
    pub base_value: f64,
    pub variations: Vec<SensitivityPoint>,
    pub failures: Vec<SensitivityFailure>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitivityReport {
    pub base_result: ValuationResult,
    pub sensitivity_results: BTreeMap<SensitivityParameter, ParameterSensitivity>,
}

fn percent_change(value: f64, base: f64) -> f64 {
    if base == 0.0 {
        0.0
    } else {
        round_to((value - base) / base * 100.0, 2)
    }
}

impl ValuationOrchestrator {
    /// Values the base request once, then each variation with every other
    /// field held at the base request's value. A variation that fails is
    /// recorded with its messages; only a failing base valuation is an error.
    pub async fn sensitivity_analysis(
        &self,
        base: ValuationRequest,
        plan: SensitivityPlan,
    ) -> Result<SensitivityReport> {
        let base_result = self.perform_valuation(base).await?;
        let base_params = base_result.valuation_params.clone();
        let base_total = base_result.total_value as f64;

        let mut sensitivity_results = BTreeMap::new();
        for (parameter, variation) in plan.parameters {
            let base_value = variation.base.unwrap_or_else(|| parameter.read(&base_params));
            let mut points = Vec::with_capacity(variation.variations.len());
            let mut failures = Vec::new();

            for value in variation.variations {
                let mut params = base_params.clone();
                parameter.apply(&mut params, value);

                match self.perform_valuation(ValuationRequest::from(params)).await {
                    Ok(result) => points.push(SensitivityPoint {
                        param_value: value,
                        total_value: result.total_value,
                        unit_price: result.unit_price,
                        change_percent: percent_change(value, base_value),
                        value_change_percent: percent_change(result.total_value as f64, base_total),
                    }),
                    Err(e) => {
                        warn!(parameter = %parameter, value = value, error = %e, "Sensitivity variation failed");
                        failures.push(SensitivityFailure {
                            param_value: value,
                            messages: e.user_messages(),
                        });
                    }
                }
            }

            sensitivity_results.insert(
                parameter,
                ParameterSensitivity {
                    base_value,
                    variations: points,
                    failures,
                },
            );
        }

        info!(parameters = sensitivity_results.len(), "Sensitivity analysis finished");
        Ok(SensitivityReport {
            base_result,
            sensitivity_results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_names_round_trip() {
        for name in ["area", "constructionYear", "floor", "totalFloors", "lotRatio", "greenRatio"] {
            let parameter: SensitivityParameter = name.parse().unwrap();
            assert_eq!(parameter.name(), name);
        }
        assert!("orientation".parse::<SensitivityParameter>().is_err());
    }

    #[test]
    fn test_apply_rounds_integer_fields() {
        let mut params = ValuationParams::defaults_for_year(2025);
        SensitivityParameter::ConstructionYear.apply(&mut params, 2012.6);
        SensitivityParameter::Area.apply(&mut params, 88.5);
        assert_eq!(params.construction_year, 2013);
        assert_eq!(params.area, 88.5);
        assert_eq!(SensitivityParameter::Area.read(&params), 88.5);
    }

    #[test]
    fn test_percent_change() {
        assert_eq!(percent_change(120.0, 100.0), 20.0);
        assert_eq!(percent_change(80.0, 100.0), -20.0);
        assert_eq!(percent_change(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_plan_builder() {
        let plan = SensitivityPlan::new()
            .vary(SensitivityParameter::Area, vec![80.0, 120.0])
            .with_base(SensitivityParameter::Area, 100.0);
        let area = &plan.parameters[&SensitivityParameter::Area];
        assert_eq!(area.base, Some(100.0));
        assert_eq!(area.variations.len(), 2);
    }
}
