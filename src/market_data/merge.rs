use crate::types::market::{MarketData, MERGED_SOURCE_ID};

/// One successful fetch, tagged with the priority of the source it came from.
#[derive(Clone, Debug)]
pub struct SourceSnapshot {
    pub source_id: String,
    pub priority: i32,
    pub data: MarketData,
}

/// Folds snapshots in ascending priority so that, per key, the highest
/// priority source wins. Optional blocks are taken from the highest priority
/// source that provides them. Ties keep fetch order.
pub fn merge_by_priority(mut snapshots: Vec<SourceSnapshot>) -> MarketData {
    snapshots.sort_by_key(|s| s.priority);

    let mut merged = MarketData::empty(MERGED_SOURCE_ID);
    for snapshot in snapshots {
        let data = snapshot.data;
        merged.area_indexes.extend(data.area_indexes);
        merged.building_type_indexes.extend(data.building_type_indexes);
        merged.base_prices.extend(data.base_prices);

        if data.trends.is_some() {
            merged.trends = data.trends;
        }
        if data.liquidity_index.is_some() {
            merged.liquidity_index = data.liquidity_index;
        }
        if data.policy_impact.is_some() {
            merged.policy_impact = data.policy_impact;
        }
        if data.market_activity.is_some() {
            merged.market_activity = data.market_activity;
        }
        if data.bank_assessment.is_some() {
            merged.bank_assessment = data.bank_assessment;
        }
        if data.government_data.is_some() {
            merged.government_data = data.government_data;
        }
    }
    merged
}
