//! Core simulation types: validated run configuration and output tables.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::config::{FleetConfig, MarketConfig, NetworkConfig, RoadConfig, ScenarioConfig};
use crate::error::SimError;

use super::latency::NetworkMode;
use super::ledger::LedgerEntry;
use super::metrics::{RoundMetrics, RunSummary};

/// Immutable, validated configuration for one run.
///
/// The only way to build one is [`SimConfig::from_scenario`], so every
/// `SimConfig` has passed validation.
///
/// # Examples
///
/// ```
/// use v2v_market_sim::config::ScenarioConfig;
/// use v2v_market_sim::sim::types::SimConfig;
///
/// let cfg = SimConfig::from_scenario(&ScenarioConfig::smoke()).unwrap();
/// assert_eq!(cfg.vehicles(), 6);
/// assert_eq!(cfg.seed(), 42);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SimConfig {
    scenario: ScenarioConfig,
}

impl SimConfig {
    /// Validates `scenario` and freezes it.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] listing every invalid field.
    pub fn from_scenario(scenario: &ScenarioConfig) -> Result<Self, SimError> {
        let errors = scenario.validate();
        if !errors.is_empty() {
            return Err(SimError::Config(errors));
        }
        Ok(Self {
            scenario: scenario.clone(),
        })
    }

    pub fn vehicles(&self) -> usize {
        self.scenario.simulation.vehicles
    }

    pub fn rounds(&self) -> u32 {
        self.scenario.simulation.rounds
    }

    pub fn seed(&self) -> u64 {
        self.scenario.simulation.seed
    }

    pub fn network_mode(&self) -> NetworkMode {
        self.scenario.simulation.network
    }

    pub fn road(&self) -> &RoadConfig {
        &self.scenario.road
    }

    pub fn fleet(&self) -> &FleetConfig {
        &self.scenario.fleet
    }

    pub fn market(&self) -> &MarketConfig {
        &self.scenario.market
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.scenario.network
    }

    /// The scenario this configuration was built from.
    pub fn scenario(&self) -> &ScenarioConfig {
        &self.scenario
    }
}

/// One row of the energy table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyRow {
    pub round: u32,
    pub energy_kwh: f64,
    pub successful_matches: usize,
    pub rejected_matches: usize,
    pub mean_latency_ms: f64,
    pub sellers: usize,
    pub buyers: usize,
    /// Sellers that quoted but found no buyer in range.
    pub unmatched_sellers: usize,
    /// Buyers that quoted but found no seller in range.
    pub unmatched_buyers: usize,
}

impl From<&RoundMetrics> for EnergyRow {
    fn from(m: &RoundMetrics) -> Self {
        Self {
            round: m.round,
            energy_kwh: m.energy_transferred_kwh,
            successful_matches: m.settled_count,
            rejected_matches: m.rejected_count,
            mean_latency_ms: m.mean_latency_ms,
            sellers: m.sellers,
            buyers: m.buyers,
            unmatched_sellers: m.unmatched_sellers,
            unmatched_buyers: m.unmatched_buyers,
        }
    }
}

/// Result of trying to settle a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Settled,
    Rejected(&'static str),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Settled => f.write_str("settled"),
            Outcome::Rejected(reason) => write!(f, "rejected:{reason}"),
        }
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One row of the full trade log: every match, settled or not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeAttempt {
    pub round: u32,
    pub seller_id: u32,
    pub buyer_id: u32,
    pub quantity_kwh: f64,
    /// Seller's ask, $/kWh.
    pub ask_price: f64,
    /// Clearing price, $/kWh.
    pub price_per_kwh: f64,
    /// Buyer's bid, $/kWh.
    pub bid_price: f64,
    pub latency_ms: f64,
    pub distance_m: f64,
    pub alignment: f64,
    pub outcome: Outcome,
}

/// Final state and trading totals of one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleSummary {
    pub id: u32,
    pub capacity_kwh: f64,
    pub final_level_kwh: f64,
    pub final_soc_pct: f64,
    pub energy_sold_kwh: f64,
    pub energy_bought_kwh: f64,
    /// Settled trades this vehicle took part in.
    pub trades: usize,
    pub final_position_m: f64,
    pub final_speed_kmh: f64,
}

/// Everything a completed run produces.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationOutput {
    pub config: SimConfig,
    pub energy: Vec<EnergyRow>,
    pub logs: Vec<TradeAttempt>,
    pub vehicles: Vec<VehicleSummary>,
    pub ledger: Vec<LedgerEntry>,
    /// Tag of the last ledger entry.
    pub ledger_head: String,
    pub rounds: Vec<RoundMetrics>,
    pub summary: RunSummary,
}
