//! The valuation facade and the utilities built on it.

pub mod batch;
pub mod matrix;
pub mod methods;
pub mod orchestrator;
pub mod result;
pub mod sensitivity;
pub mod validation;

pub use matrix::{evaluate_matrix, MatrixDimension, MatrixEvaluation, MatrixRating};
pub use orchestrator::{confidence_for, ValuationOrchestrator};
pub use result::{AlgorithmComparison, MarketDataImpact, ValuationMethodInfo, ValuationResult};
pub use sensitivity::{
    ParameterSensitivity, ParameterVariation, SensitivityParameter, SensitivityPoint,
    SensitivityReport, SensitivityPlan,
};
