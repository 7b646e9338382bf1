use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use crate::types::ids::EventId;
use crate::types::property::PropertyInfo;
use crate::utils::helper::generate_event_id;
use crate::valuation::result::ValuationResult;

/// Published once per freshly computed valuation. Cache hits publish nothing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationComputed {
    pub event_id: EventId,
    pub occurred_at: DateTime<Utc>,
    pub result: ValuationResult,
    pub property: PropertyInfo,
    pub checksum: String,
}

impl ValuationComputed {
    pub fn new(result: ValuationResult, property: PropertyInfo, occurred_at: DateTime<Utc>) -> Self {
        let mut event = ValuationComputed {
            event_id: generate_event_id(),
            occurred_at,
            result,
            property,
            checksum: String::new(),
        };
        event.checksum = event.calculate_checksum();
        event
    }

    pub fn calculate_checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.event_id.0.as_bytes());
        hasher.update(self.result.id.0.as_bytes());
        hasher.update(self.occurred_at.timestamp_millis().to_le_bytes());
        hasher.update(self.result.total_value.to_le_bytes());
        hasher.update(self.result.unit_price.to_le_bytes());
        hasher.update(self.result.valuation_method.id().as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn verify_checksum(&self) -> bool {
        self.checksum == self.calculate_checksum()
    }
}
