pub mod engine;
/// Statistical settlement latency per network mode.
pub mod latency;
/// Hash-chained trade ledger.
pub mod ledger;
pub mod market;
pub mod metrics;
/// Ring-road vehicle movement.
pub mod mobility;
/// Seeded per-round random streams.
pub mod rng;
pub mod sweep;
pub mod types;
