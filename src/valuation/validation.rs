use crate::algorithms::AlgorithmKind;
use crate::error::{Error, Result, ValidationErrors};
use crate::types::property::ValuationParams;

/// Checks every rule and reports every violation, then resolves the method.
pub fn validate(params: &ValuationParams, current_year: i32) -> Result<AlgorithmKind> {
    let mut errors = ValidationErrors::new();

    if !(params.area.is_finite() && params.area > 0.0) {
        errors.push(format!("area must be a positive number, got {}", params.area));
    }
    if params.location.trim().is_empty() {
        errors.push("location must not be empty");
    }
    if params.construction_year > current_year {
        errors.push(format!(
            "construction year {} is in the future (current year {})",
            params.construction_year, current_year
        ));
    }
    if params.total_floors < 1 {
        errors.push(format!("total floors must be at least 1, got {}", params.total_floors));
    }
    if params.floor < 1 || params.floor > params.total_floors {
        errors.push(format!(
            "floor must be between 1 and total floors ({}), got {}",
            params.total_floors, params.floor
        ));
    }
    if !(0.0..=100.0).contains(&params.green_ratio) {
        errors.push(format!("green ratio must be between 0 and 100, got {}", params.green_ratio));
    }
    if !(params.lot_ratio.is_finite() && params.lot_ratio > 0.0) {
        errors.push(format!("lot ratio must be positive, got {}", params.lot_ratio));
    }

    let method = match params.valuation_method.parse::<AlgorithmKind>() {
        Ok(kind) => Some(kind),
        Err(message) => {
            errors.push(message);
            None
        }
    };

    match method {
        Some(kind) if errors.is_empty() => Ok(kind),
        _ => Err(Error::Validation(errors)),
    }
}
