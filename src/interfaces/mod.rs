pub mod event_producer;

pub use event_producer::{ChannelEventProducer, LoggingEventProducer, ValuationEventProducer};
