pub mod algorithms;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod interfaces;
pub mod market_data;
pub mod observability;
pub mod types;
pub mod utils;
pub mod valuation;

pub use error::{Error, Result};
pub use valuation::ValuationOrchestrator;
