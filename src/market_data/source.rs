use async_trait::async_trait;
use crate::error::Result;
use crate::types::market::MarketData;

/// A feed of market data. When feeds disagree, the one with the higher
/// priority wins.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn priority(&self) -> i32;

    async fn fetch_data(&self) -> Result<MarketData>;
}
