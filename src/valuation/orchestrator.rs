use std::sync::Arc;
use std::time::Instant;
use chrono::Datelike;
use tracing::{debug, error, warn, Instrument};
use crate::algorithms::{
    AlgorithmInputs, AlgorithmKind, AlgorithmRegistry, AlgorithmResult, RentData,
};
use crate::cache::{CacheKey, ValuationResultCache};
use crate::config::loader::AppConfig;
use crate::config::ValuationConfig;
use crate::error::{Error, Result};
use crate::events::valuation::ValuationComputed;
use crate::interfaces::event_producer::ValuationEventProducer;
use crate::market_data::aggregator::MarketDataAggregator;
use crate::observability::metrics::{
    RESULT_CACHE_HITS, RESULT_CACHE_MISSES, VALUATIONS_COMPUTED, VALUATIONS_FAILED,
    VALUATIONS_REJECTED, VALUATION_LATENCY,
};
use crate::observability::tracing::trace_valuation;
use crate::types::property::{PropertyInfo, ValuationParams, ValuationRequest};
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::helper::{generate_property_id, generate_valuation_id};
use crate::valuation::matrix::evaluate_matrix;
use crate::valuation::result::{AlgorithmComparison, MarketDataImpact, ValuationResult};
use crate::valuation::validation::validate;

const MIN_CONFIDENCE: f64 = 1.0;
const MAX_CONFIDENCE: f64 = 100.0;
const DEGRADED_PENALTY: f64 = 15.0;
const NO_MARKET_DATA_PENALTY: f64 = 10.0;

/// Confidence for a valuation: the configured base, lowered for less
/// corroborated methods, degraded pricing and missing market data.
pub fn confidence_for(
    base: f64,
    method: AlgorithmKind,
    degraded: bool,
    market_data_available: bool,
) -> f64 {
    let method_offset = match method {
        AlgorithmKind::Comprehensive => 0.0,
        AlgorithmKind::MarketComparison => 5.0,
        AlgorithmKind::IncomeCapitalization | AlgorithmKind::Cost => 10.0,
        AlgorithmKind::Basic => 15.0,
    };
    let mut confidence = base - method_offset;
    if degraded {
        confidence -= DEGRADED_PENALTY;
    }
    if !market_data_available {
        confidence -= NO_MARKET_DATA_PENALTY;
    }
    if confidence.is_finite() {
        confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
    } else {
        MIN_CONFIDENCE
    }
}

/// Entry point for valuations: defaults, validation, caching, market context
/// and event publication around the pricing algorithms.
pub struct ValuationOrchestrator {
    registry: Arc<AlgorithmRegistry>,
    market: Arc<MarketDataAggregator>,
    cache: Arc<ValuationResultCache>,
    events: Arc<dyn ValuationEventProducer>,
    clock: Arc<dyn Clock>,
    settings: ValuationConfig,
}

impl ValuationOrchestrator {
    pub fn new(
        registry: Arc<AlgorithmRegistry>,
        market: Arc<MarketDataAggregator>,
        cache: Arc<ValuationResultCache>,
        events: Arc<dyn ValuationEventProducer>,
        clock: Arc<dyn Clock>,
        settings: ValuationConfig,
    ) -> Self {
        ValuationOrchestrator {
            registry,
            market,
            cache,
            events,
            clock,
            settings,
        }
    }

    /// Wires the default registry, an aggregator over the configured sources
    /// and a cache sized from `config`.
    pub fn from_config(config: &AppConfig, events: Arc<dyn ValuationEventProducer>) -> Result<Self> {
        Self::from_config_with_clock(config, events, Arc::new(SystemClock))
    }

    pub fn from_config_with_clock(
        config: &AppConfig,
        events: Arc<dyn ValuationEventProducer>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let market = MarketDataAggregator::from_config(config, clock.clone())?;
        let cache = ValuationResultCache::from_config(&config.cache, clock.clone());
        Ok(Self::new(
            Arc::new(AlgorithmRegistry::with_defaults()),
            Arc::new(market),
            Arc::new(cache),
            events,
            clock,
            config.valuation.clone(),
        ))
    }

    pub fn registry(&self) -> &AlgorithmRegistry {
        &self.registry
    }

    pub fn market(&self) -> &Arc<MarketDataAggregator> {
        &self.market
    }

    pub fn cache(&self) -> &ValuationResultCache {
        &self.cache
    }

    /// Defaults applied to absent request fields.
    pub fn default_params(&self) -> ValuationParams {
        ValuationParams::defaults_for_year(self.clock.now().year())
    }

    /// Merges `request` over the defaults and validates the result.
    pub fn validate_params(&self, request: ValuationRequest) -> Result<(ValuationParams, AlgorithmKind)> {
        let now = self.clock.now();
        let params = request.merge_over(&ValuationParams::defaults_for_year(now.year()));
        let method = validate(&params, now.year())?;
        Ok((params, method))
    }

    fn inputs(&self) -> AlgorithmInputs {
        AlgorithmInputs::at(self.clock.now())
            .with_rent(RentData::market(self.settings.default_monthly_rent))
    }

    pub async fn perform_valuation(&self, request: ValuationRequest) -> Result<ValuationResult> {
        let started = Instant::now();
        let (params, method) = match self.validate_params(request) {
            Ok(validated) => validated,
            Err(e) => {
                VALUATIONS_REJECTED.inc();
                debug!(error = %e, "Valuation request rejected");
                return Err(e);
            }
        };

        let span = trace_valuation(&params.location, method.id());
        let outcome = self.value_validated(params, method).instrument(span).await;
        VALUATION_LATENCY.observe(started.elapsed().as_secs_f64());
        outcome
    }

    async fn value_validated(&self, params: ValuationParams, method: AlgorithmKind) -> Result<ValuationResult> {
        let key = CacheKey::new(&params, method)?;
        if let Some(cached) = self.cache.get(&key) {
            RESULT_CACHE_HITS.inc();
            debug!("Valuation served from cache");
            return Ok(cached.reissue(self.clock.now()));
        }
        RESULT_CACHE_MISSES.inc();

        let impact = match self.market.snapshot().await {
            Ok(data) => MarketDataImpact::from_snapshot(&data, &params),
            Err(e) => {
                warn!(error = %e, "Market data unavailable, using neutral market impact");
                MarketDataImpact::neutral()
            }
        };

        let algorithm = self
            .registry
            .get(method)
            .ok_or(Error::AlgorithmNotRegistered(method))?;
        let property = PropertyInfo::from(&params);
        let inputs = self.inputs();

        let pricing = algorithm.calculate(&property, &inputs).map_err(|e| {
            VALUATIONS_FAILED.inc();
            error!(error = %e, "Valuation algorithm failed");
            e
        })?;

        let confidence = confidence_for(
            self.settings.default_confidence,
            method,
            pricing.degraded,
            impact.market_data_available,
        );
        let matrix_evaluation = evaluate_matrix(&params, &impact, inputs.current_year());
        let result = ValuationResult {
            id: generate_valuation_id(),
            property_id: generate_property_id(),
            valuation_date: inputs.valuation_time,
            total_value: pricing.price,
            unit_price: pricing.unit_price,
            confidence,
            valuation_method: method,
            factor_analysis: pricing.factors.clone(),
            degraded: pricing.degraded,
            pricing,
            market_data_impact: impact,
            matrix_evaluation,
            valuation_params: params,
            from_cache: false,
        };

        self.cache.set(key, result.clone());
        self.publish(result.clone(), property);
        VALUATIONS_COMPUTED.inc();

        debug!(
            total_value = result.total_value,
            unit_price = result.unit_price,
            confidence = result.confidence,
            degraded = result.degraded,
            "Valuation computed"
        );
        Ok(result)
    }

    fn publish(&self, result: ValuationResult, property: PropertyInfo) {
        let event = ValuationComputed::new(result, property, self.clock.now());
        let events = self.events.clone();
        tokio::spawn(async move {
            if let Err(e) = events.produce(event).await {
                warn!(error = %e, "Failed to publish valuation event");
            }
        });
    }

    /// Prices the request with every registered algorithm except the blend.
    pub fn run_all_algorithms(&self, request: ValuationRequest) -> Result<Vec<AlgorithmResult>> {
        let (params, _) = self.validate_params(request)?;
        let property = PropertyInfo::from(&params);
        let inputs = self.inputs();

        self.registry
            .all()
            .iter()
            .filter(|algorithm| algorithm.kind() != AlgorithmKind::Comprehensive)
            .map(|algorithm| algorithm.calculate(&property, &inputs))
            .collect()
    }

    pub fn compare_results(&self, results: &[AlgorithmResult]) -> Option<AlgorithmComparison> {
        AlgorithmComparison::of(results)
    }
}
