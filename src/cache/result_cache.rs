use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use serde::Serialize;
use tracing::debug;
use crate::algorithms::AlgorithmKind;
use crate::config::CacheConfig;
use crate::error::Result;
use crate::types::property::ValuationParams;
use crate::utils::clock::Clock;
use crate::valuation::result::ValuationResult;

/// Cache key: canonical JSON of exactly the fields that select a price.
/// Nearby facilities and GIS scores are not part of it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyFields<'a> {
    area: f64,
    location: &'a str,
    building_type: &'a str,
    construction_year: i32,
    floor: i32,
    total_floors: i32,
    orientation: &'a str,
    decoration_level: &'a str,
    lot_ratio: f64,
    green_ratio: f64,
    valuation_method: &'a str,
}

impl CacheKey {
    /// `method` is the resolved method, so a display name and its id share
    /// one entry.
    pub fn new(params: &ValuationParams, method: AlgorithmKind) -> Result<Self> {
        let fields = KeyFields {
            area: params.area,
            location: &params.location,
            building_type: &params.building_type,
            construction_year: params.construction_year,
            floor: params.floor,
            total_floors: params.total_floors,
            orientation: &params.orientation,
            decoration_level: &params.decoration_level,
            lot_ratio: params.lot_ratio,
            green_ratio: params.green_ratio,
            valuation_method: method.id(),
        };
        Ok(CacheKey(serde_json::to_string(&fields)?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

struct CacheEntry {
    result: ValuationResult,
    inserted_at: DateTime<Utc>,
}

/// Bounded, least-recently-used memo of valuation results with a fixed
/// time-to-live. Expired entries are dropped when read.
pub struct ValuationResultCache {
    entries: Mutex<LruCache<CacheKey, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl ValuationResultCache {
    pub fn new(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        ValuationResultCache {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(config.capacity, config.ttl(), clock)
    }

    fn entries(&self) -> MutexGuard<'_, LruCache<CacheKey, CacheEntry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - entry.inserted_at >= self.ttl
    }

    /// A live entry, promoted to most recently used.
    pub fn get(&self, key: &CacheKey) -> Option<ValuationResult> {
        let now = self.clock.now();
        let mut entries = self.entries();

        let expired = match entries.get(key) {
            Some(entry) if !self.is_expired(entry, now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.result.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
            self.expirations.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key.as_str(), "Expired valuation result evicted");
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Inserts or replaces. When full, the least recently used entry goes.
    pub fn set(&self, key: CacheKey, result: ValuationResult) {
        let entry = CacheEntry {
            result,
            inserted_at: self.clock.now(),
        };
        let mut entries = self.entries();
        self.insert_locked(&mut entries, key, entry);
    }

    fn insert_locked(
        &self,
        entries: &mut LruCache<CacheKey, CacheEntry>,
        key: CacheKey,
        entry: CacheEntry,
    ) {
        if let Some((displaced, _)) = entries.push(key.clone(), entry) {
            if displaced != key {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(key = %displaced.as_str(), "Valuation result evicted");
            }
        }
    }

    /// Inserts all items under one lock.
    pub fn batch_set(&self, items: Vec<(CacheKey, ValuationResult)>) {
        let now = self.clock.now();
        let mut entries = self.entries();
        for (key, result) in items {
            self.insert_locked(&mut entries, key, CacheEntry { result, inserted_at: now });
        }
    }

    /// Drops every expired entry. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries();
        let expired: Vec<CacheKey> = entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        self.expirations.fetch_add(expired.len() as u64, Ordering::Relaxed);
        expired.len()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries().cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries();
        CacheStats {
            entries: entries.len(),
            capacity: entries.cap().get(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::algorithms::{AlgorithmInputs, BasicAlgorithm, ValuationAlgorithm};
    use crate::types::ids::{PropertyId, ValuationId};
    use crate::types::property::PropertyInfo;
    use crate::utils::clock::ManualClock;
    use crate::valuation::matrix::evaluate_matrix;
use crate::valuation::result::MarketDataImpact;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap()
    }

    fn result_for(params: &ValuationParams) -> ValuationResult {
        let pricing = BasicAlgorithm
            .calculate(&PropertyInfo::from(params), &AlgorithmInputs::at(start()))
            .unwrap();
        ValuationResult {
            id: ValuationId::new(),
            property_id: PropertyId::new(),
            valuation_date: start(),
            total_value: pricing.price,
            unit_price: pricing.unit_price,
            confidence: 70.0,
            valuation_method: AlgorithmKind::Basic,
            factor_analysis: pricing.factors.clone(),
            pricing,
            market_data_impact: MarketDataImpact::neutral(),
            matrix_evaluation: evaluate_matrix(params, &MarketDataImpact::neutral(), 2025),
            valuation_params: params.clone(),
            degraded: false,
            from_cache: false,
        }
    }

    fn key(area: f64) -> CacheKey {
        let mut params = ValuationParams::defaults_for_year(2025);
        params.area = area;
        CacheKey::new(&params, AlgorithmKind::Basic).unwrap()
    }

    #[test]
    fn test_key_ignores_facilities_and_gis() {
        let base = ValuationParams::defaults_for_year(2025);
        let mut other = base.clone();
        other.nearby_facilities = vec!["公园".to_string()];
        other.gis.infrastructure = Some(90.0);

        assert_eq!(
            CacheKey::new(&base, AlgorithmKind::Basic).unwrap(),
            CacheKey::new(&other, AlgorithmKind::Basic).unwrap()
        );
        assert_ne!(
            CacheKey::new(&base, AlgorithmKind::Basic).unwrap(),
            CacheKey::new(&base, AlgorithmKind::Cost).unwrap()
        );
    }

    #[test]
    fn test_key_lists_exactly_the_pricing_fields() {
        let key = CacheKey::new(&ValuationParams::defaults_for_year(2025), AlgorithmKind::MarketComparison).unwrap();
        let value: serde_json::Value = serde_json::from_str(key.as_str()).unwrap();
        let fields: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(fields.len(), 11);
        assert_eq!(value["valuationMethod"], "market-comparison");
        assert!(value.get("nearbyFacilities").is_none());
    }

    #[test]
    fn test_ttl_expiry() {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = ValuationResultCache::new(200, Duration::hours(24), clock.clone());
        let params = ValuationParams::defaults_for_year(2025);
        cache.set(key(100.0), result_for(&params));

        clock.advance(Duration::hours(23));
        assert!(cache.get(&key(100.0)).is_some());

        clock.advance(Duration::hours(2));
        assert!(cache.get(&key(100.0)).is_none());
        assert!(cache.is_empty());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expirations, 1);
    }

    #[test]
    fn test_full_cache_evicts_least_recently_used() {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = ValuationResultCache::new(2, Duration::hours(24), clock);
        let params = ValuationParams::defaults_for_year(2025);

        cache.set(key(80.0), result_for(&params));
        cache.set(key(90.0), result_for(&params));
        // Touch 80 so 90 becomes the eviction candidate.
        assert!(cache.get(&key(80.0)).is_some());
        cache.set(key(100.0), result_for(&params));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key(90.0)).is_none());
        assert!(cache.get(&key(80.0)).is_some());
        assert!(cache.get(&key(100.0)).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_overwrite_is_not_an_eviction() {
        let cache = ValuationResultCache::new(2, Duration::hours(24), Arc::new(ManualClock::new(start())));
        let params = ValuationParams::defaults_for_year(2025);
        cache.set(key(80.0), result_for(&params));
        cache.set(key(80.0), result_for(&params));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_batch_set_and_purge() {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = ValuationResultCache::new(10, Duration::hours(1), clock.clone());
        let params = ValuationParams::defaults_for_year(2025);

        cache.batch_set(vec![(key(70.0), result_for(&params)), (key(75.0), result_for(&params))]);
        clock.advance(Duration::minutes(30));
        cache.set(key(120.0), result_for(&params));
        clock.advance(Duration::minutes(45));

        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 10);
    }
}
