//! Run-level error taxonomy.
//!
//! Configuration errors are reported before any round runs. Transfer
//! rejections never surface here: they are recovered inside the round and
//! recorded in the trade log. Everything else in [`SimError`] is an
//! invariant violation and aborts the run.

use thiserror::Error;

use crate::config::ConfigError;
use crate::sim::ledger::LedgerError;

/// Errors that abort a simulation run.
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    #[error("invalid configuration: {}", join_config_errors(.0))]
    Config(Vec<ConfigError>),

    #[error("energy not conserved in round {round}: fleet total drifted by {drift_kwh} kWh")]
    EnergyDrift { round: u32, drift_kwh: f64 },

    #[error("vehicle {vehicle_id} battery out of bounds in round {round}: {level_kwh} kWh of {capacity_kwh} kWh")]
    BatteryOutOfBounds {
        round: u32,
        vehicle_id: u32,
        level_kwh: f64,
        capacity_kwh: f64,
    },

    #[error("ledger integrity check failed: {0}")]
    Ledger(#[from] LedgerError),
}

impl From<ConfigError> for SimError {
    fn from(e: ConfigError) -> Self {
        SimError::Config(vec![e])
    }
}

fn join_config_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}
