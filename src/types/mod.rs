pub mod ids;
pub mod market;
pub mod property;
