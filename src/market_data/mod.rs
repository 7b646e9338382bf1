//! Market data: the source trait, the priority merge, the aggregator that
//! owns the current snapshot, and the background refresh schedule.

pub mod aggregator;
pub mod merge;
pub mod scheduler;
pub mod source;
pub mod sources;

pub use aggregator::{
    AggregatorStats, AggregatorStatus, MarketDataAggregator, SnapshotListener, SnapshotState,
    SourceStatus,
};
pub use source::MarketDataSource;
pub use sources::{HttpMarketDataSource, StaticMarketDataSource};
