use std::time::Duration;
use async_trait::async_trait;
use tracing::debug;
use crate::error::{Error, Result};
use crate::market_data::source::MarketDataSource;
use crate::types::market::{MarketData, MarketSentiment, MarketTrend};

const API_KEY_HEADER: &str = "x-api-key";
/// Liquidity assumed when the feed omits it.
const DEFAULT_LIQUIDITY_INDEX: f64 = 0.75;

/// Market data served as JSON over HTTP. The body uses the same camelCase
/// layout as [`MarketData`]; every field is optional.
pub struct HttpMarketDataSource {
    id: String,
    name: String,
    priority: i32,
    url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpMarketDataSource {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        priority: i32,
        url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        HttpMarketDataSource {
            id: id.into(),
            name: name.into(),
            priority,
            url: url.into(),
            api_key,
            client,
        }
    }

    fn fetch_error(&self, reason: impl Into<String>) -> Error {
        Error::SourceFetch {
            source_id: self.id.clone(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl MarketDataSource for HttpMarketDataSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn fetch_data(&self) -> Result<MarketData> {
        debug!(source = %self.id, url = %self.url, "Fetching market data");

        let mut request = self
            .client
            .get(&self.url)
            .header("accept", "application/json");
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                self.fetch_error("request timeout")
            } else if e.is_connect() {
                self.fetch_error("connection failed")
            } else {
                self.fetch_error(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.fetch_error(format!("HTTP {}: {}", status, body)));
        }

        let mut data: MarketData = response
            .json()
            .await
            .map_err(|e| self.fetch_error(format!("failed to parse response: {}", e)))?;

        data.source_id = self.id.clone();
        if data.trends.is_none() {
            data.trends = Some(MarketTrend {
                monthly_growth: 0.0,
                annual_growth: 0.0,
                market_sentiment: MarketSentiment::Neutral,
            });
        }
        if data.liquidity_index.is_none() {
            data.liquidity_index = Some(DEFAULT_LIQUIDITY_INDEX);
        }
        Ok(data)
    }
}
