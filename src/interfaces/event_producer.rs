use std::sync::atomic::{AtomicU64, Ordering};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;
use crate::error::{Error, Result};
use crate::events::valuation::ValuationComputed;

/// Outbound sink for computed valuations. Returns the sequence number the
/// sink assigned.
#[async_trait]
pub trait ValuationEventProducer: Send + Sync {
    async fn produce(&self, event: ValuationComputed) -> Result<u64>;
}

/// Forwards events into a bounded tokio channel.
pub struct ChannelEventProducer {
    sender: mpsc::Sender<ValuationComputed>,
    sequence: AtomicU64,
}

impl ChannelEventProducer {
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<ValuationComputed>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let producer = ChannelEventProducer {
            sender,
            sequence: AtomicU64::new(0),
        };
        (producer, receiver)
    }
}

#[async_trait]
impl ValuationEventProducer for ChannelEventProducer {
    async fn produce(&self, event: ValuationComputed) -> Result<u64> {
        self.sender
            .send(event)
            .await
            .map_err(|_| Error::EventPublish("event channel closed".to_string()))?;
        Ok(self.sequence.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Writes a log line per event and keeps nothing.
#[derive(Default)]
pub struct LoggingEventProducer {
    sequence: AtomicU64,
}

impl LoggingEventProducer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ValuationEventProducer for LoggingEventProducer {
    async fn produce(&self, event: ValuationComputed) -> Result<u64> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            sequence = sequence,
            valuation_id = %event.result.id,
            total_value = event.result.total_value,
            method = %event.result.valuation_method,
            "Valuation computed"
        );
        Ok(sequence)
    }
}
