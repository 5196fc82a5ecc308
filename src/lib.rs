//! Vehicle-to-vehicle wireless energy market simulator.
//!
//! Vehicles on a ring road trade battery energy with nearby vehicles in
//! discrete auction rounds. Settled trades are recorded in a hash-chained
//! ledger and each carries a simulated network latency.

#[cfg(feature = "api")]
pub mod api;
/// TOML scenario configuration and presets.
pub mod config;
pub mod error;
/// Vehicles and batteries.
pub mod fleet;
pub mod io;
/// Market rounds, ledger, and the models they draw on.
pub mod sim;
pub mod telemetry;
