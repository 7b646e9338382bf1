use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use crate::algorithms::{
    AlgorithmKind, BasicAlgorithm, ComprehensiveAlgorithm, CostApproachAlgorithm,
    IncomeCapitalizationAlgorithm, MarketComparisonAlgorithm, ValuationAlgorithm,
};
use crate::error::{Error, Result};

/// Typed map from [`AlgorithmKind`] to implementation.
#[derive(Default, Clone)]
pub struct AlgorithmRegistry {
    algorithms: BTreeMap<AlgorithmKind, Arc<dyn ValuationAlgorithm>>,
}

impl AlgorithmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the five built-in algorithms.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let defaults: [Arc<dyn ValuationAlgorithm>; 5] = [
            Arc::new(BasicAlgorithm::new()),
            Arc::new(MarketComparisonAlgorithm::new()),
            Arc::new(IncomeCapitalizationAlgorithm::new()),
            Arc::new(CostApproachAlgorithm::new()),
            Arc::new(ComprehensiveAlgorithm::new()),
        ];
        for algorithm in defaults {
            registry.algorithms.insert(algorithm.kind(), algorithm);
        }
        registry
    }

    /// Adds an algorithm. Fails if its kind is already present; use
    /// [`replace`](Self::replace) to overwrite.
    pub fn register(&mut self, algorithm: Arc<dyn ValuationAlgorithm>) -> Result<()> {
        let kind = algorithm.kind();
        if self.algorithms.contains_key(&kind) {
            return Err(Error::AlgorithmAlreadyRegistered(kind));
        }
        self.algorithms.insert(kind, algorithm);
        info!(algorithm = %kind, "Registered valuation algorithm");
        Ok(())
    }

    /// Installs an algorithm, returning the one it displaced.
    pub fn replace(&mut self, algorithm: Arc<dyn ValuationAlgorithm>) -> Option<Arc<dyn ValuationAlgorithm>> {
        let kind = algorithm.kind();
        let previous = self.algorithms.insert(kind, algorithm);
        if previous.is_some() {
            info!(algorithm = %kind, "Replaced valuation algorithm");
        }
        previous
    }

    pub fn get(&self, kind: AlgorithmKind) -> Option<Arc<dyn ValuationAlgorithm>> {
        self.algorithms.get(&kind).cloned()
    }

    /// All registered algorithms in kind order.
    pub fn all(&self) -> Vec<Arc<dyn ValuationAlgorithm>> {
        self.algorithms.values().cloned().collect()
    }

    pub fn kinds(&self) -> Vec<AlgorithmKind> {
        self.algorithms.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.algorithms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }
}

impl std::fmt::Debug for AlgorithmRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlgorithmRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::algorithms::{AlgorithmInputs, AlgorithmResult, Factor};
    use crate::types::property::PropertyInfo;

    struct FixedCost(i64);

    impl ValuationAlgorithm for FixedCost {
        fn kind(&self) -> AlgorithmKind {
            AlgorithmKind::Cost
        }

        fn description(&self) -> &'static str {
            "fixed"
        }

        fn calculate(&self, _property: &PropertyInfo, inputs: &AlgorithmInputs) -> Result<AlgorithmResult> {
            AlgorithmResult::from_unit_price(
                AlgorithmKind::Cost,
                self.0 as f64,
                1.0,
                vec![Factor::new("fixed", 1.0, 1.0)],
                inputs.valuation_time,
            )
        }
    }

    #[test]
    fn test_defaults_cover_every_kind() {
        let registry = AlgorithmRegistry::with_defaults();
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.kinds(), AlgorithmKind::ALL.to_vec());
        for kind in AlgorithmKind::ALL {
            assert_eq!(registry.get(kind).unwrap().kind(), kind);
        }
    }

    #[test]
    fn test_register_refuses_silent_overwrite() {
        let mut registry = AlgorithmRegistry::with_defaults();
        let err = registry.register(Arc::new(FixedCost(1))).unwrap_err();
        assert!(matches!(err, Error::AlgorithmAlreadyRegistered(AlgorithmKind::Cost)));
    }

    #[test]
    fn test_replace_is_explicit_and_last_wins() {
        let mut registry = AlgorithmRegistry::with_defaults();
        let previous = registry.replace(Arc::new(FixedCost(42)));
        assert_eq!(previous.unwrap().description(), "基于重置成本的估价算法");

        let property = PropertyInfo::from(&crate::types::property::ValuationParams::default());
        let result = registry
            .get(AlgorithmKind::Cost)
            .unwrap()
            .calculate(&property, &AlgorithmInputs::at(Utc::now()))
            .unwrap();
        assert_eq!(result.unit_price, 42);
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn test_empty_registry() {
        let mut registry = AlgorithmRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get(AlgorithmKind::Basic).is_none());
        registry.register(Arc::new(BasicAlgorithm::new())).unwrap();
        assert_eq!(registry.all().len(), 1);
    }
}
