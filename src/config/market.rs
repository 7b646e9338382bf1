use std::time::Duration;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Period of the background refresh, and the age past which a snapshot
    /// is stale.
    pub update_interval_secs: u64,
    /// Per-source fetch budget.
    pub fetch_timeout_ms: u64,
}

impl MarketConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        MarketConfig {
            update_interval_secs: 3600,  // 1 hour
            fetch_timeout_ms: 5000,
        }
    }
}
