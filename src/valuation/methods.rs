use crate::algorithms::AlgorithmKind;
use crate::valuation::orchestrator::ValuationOrchestrator;
use crate::valuation::result::ValuationMethodInfo;

const CATALOG: [(AlgorithmKind, &str); 4] = [
    (AlgorithmKind::Comprehensive, "综合考虑多种因素的估价方法"),
    (AlgorithmKind::MarketComparison, "基于市场成交案例的比较估价方法"),
    (AlgorithmKind::IncomeCapitalization, "基于收益能力的估价方法"),
    (AlgorithmKind::Cost, "基于成本的估价方法"),
];

/// The methods offered to callers.
pub fn valuation_methods() -> Vec<ValuationMethodInfo> {
    CATALOG
        .iter()
        .map(|(kind, description)| ValuationMethodInfo {
            id: *kind,
            name: kind.display_name().to_string(),
            description: description.to_string(),
        })
        .collect()
}

impl ValuationOrchestrator {
    pub fn valuation_methods(&self) -> Vec<ValuationMethodInfo> {
        valuation_methods()
    }
}
