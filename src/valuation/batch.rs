use futures_util::future::join_all;
use tracing::info;
use crate::error::Result;
use crate::types::property::ValuationRequest;
use crate::valuation::orchestrator::ValuationOrchestrator;
use crate::valuation::result::ValuationResult;

impl ValuationOrchestrator {
    /// Values every request independently. Output positions match input
    /// positions; one failing entry does not affect the others.
    pub async fn batch_valuation(&self, requests: Vec<ValuationRequest>) -> Vec<Result<ValuationResult>> {
        let total = requests.len();
        let results = join_all(requests.into_iter().map(|request| self.perform_valuation(request))).await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        info!(total = total, failed = failed, "Batch valuation finished");
        results
    }
}
