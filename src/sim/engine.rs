//! Round orchestrator: owns the fleet and the ledger and drives the market.

use tracing::{debug, info, warn};

use crate::config::ConfigError;
use crate::error::SimError;
use crate::fleet::{Role, VehicleState, apply_transfer, spawn_fleet};

use super::latency::LatencyModel;
use super::ledger::Ledger;
use super::market::MatchingEngine;
use super::metrics::{RoundMetrics, RunSummary};
use super::mobility::Mobility;
use super::rng::{DrawStream, SPAWN_ROUND};
use super::types::{
    EnergyRow, Outcome, SimConfig, SimulationOutput, TradeAttempt, VehicleSummary,
};

/// Largest fleet-energy change a round may show before the run is aborted
/// (kWh). Transfers move energy between vehicles, so only rounding remains.
const ENERGY_TOLERANCE_KWH: f64 = 1e-6;

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Fleet spawned, no round played yet.
    Idle,
    /// `round` has been played and more remain.
    Running { round: u32 },
    /// Every round has been played.
    Completed,
}

#[derive(Debug, Clone, Copy, Default)]
struct Participation {
    sold_kwh: f64,
    bought_kwh: f64,
    trades: usize,
}

/// One simulation run.
///
/// Construct with [`Simulation::new`] (seeded fleet) or
/// [`Simulation::with_fleet`] (hand-built fleet), then either call
/// [`Simulation::step`] round by round or [`Simulation::run`] to play to the
/// end. Any error is fatal: the run must be discarded.
#[derive(Debug)]
pub struct Simulation {
    config: SimConfig,
    phase: Phase,
    fleet: Vec<VehicleState>,
    mobility: Mobility,
    latency: LatencyModel,
    market: MatchingEngine,
    ledger: Ledger,
    participation: Vec<Participation>,
    logs: Vec<TradeAttempt>,
    rounds: Vec<RoundMetrics>,
}

impl Simulation {
    /// Spawns the fleet from the seed and prepares round 1.
    pub fn new(config: SimConfig) -> Self {
        let mut stream = DrawStream::for_round(config.seed(), SPAWN_ROUND);
        let fleet = spawn_fleet(config.vehicles(), config.fleet(), config.road(), &mut stream);
        Self::assemble(config, fleet)
    }

    /// Starts a run from a caller-supplied fleet.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] if the fleet size differs from the
    /// configured vehicle count, ids are not `0..n` in order, or a vehicle
    /// sits outside the road.
    pub fn with_fleet(config: SimConfig, fleet: Vec<VehicleState>) -> Result<Self, SimError> {
        let mut errors = Vec::new();
        if fleet.len() != config.vehicles() {
            errors.push(ConfigError::new(
                "fleet",
                format!(
                    "expected {} vehicles, got {}",
                    config.vehicles(),
                    fleet.len()
                ),
            ));
        }
        for (i, v) in fleet.iter().enumerate() {
            if v.id as usize != i {
                errors.push(ConfigError::new(
                    "fleet",
                    format!("vehicle at index {i} has id {}", v.id),
                ));
            }
            if !(0.0..config.road().length_m).contains(&v.position_m) {
                errors.push(ConfigError::new(
                    "fleet",
                    format!("vehicle {} is off the road at {} m", v.id, v.position_m),
                ));
            }
        }
        if !errors.is_empty() {
            return Err(SimError::Config(errors));
        }
        Ok(Self::assemble(config, fleet))
    }

    fn assemble(config: SimConfig, fleet: Vec<VehicleState>) -> Self {
        let market = MatchingEngine::new(config.fleet(), config.market(), config.road());
        Self {
            phase: Phase::Idle,
            participation: vec![Participation::default(); fleet.len()],
            mobility: Mobility::new(config.road()),
            latency: LatencyModel::new(config.network()),
            market,
            ledger: Ledger::new(),
            logs: Vec::new(),
            rounds: Vec::with_capacity(config.rounds() as usize),
            fleet,
            config,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Current fleet, in id order.
    pub fn fleet(&self) -> &[VehicleState] {
        &self.fleet
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Metrics of every round played so far.
    pub fn rounds(&self) -> &[RoundMetrics] {
        &self.rounds
    }

    /// Plays the next round.
    ///
    /// Returns `Ok(None)` once the run is complete.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::EnergyDrift`] or [`SimError::BatteryOutOfBounds`]
    /// if the round breaks an energy invariant.
    pub fn step(&mut self) -> Result<Option<RoundMetrics>, SimError> {
        let round = match self.phase {
            Phase::Idle => 1,
            Phase::Running { round } => round + 1,
            Phase::Completed => return Ok(None),
        };

        let metrics = self.play_round(round)?;
        self.rounds.push(metrics.clone());
        self.phase = if round >= self.config.rounds() {
            Phase::Completed
        } else {
            Phase::Running { round }
        };
        Ok(Some(metrics))
    }

    /// Plays every remaining round, verifies the ledger and returns the
    /// run's output.
    ///
    /// # Errors
    ///
    /// Any round error, or [`SimError::Ledger`] if the chain fails
    /// verification. No partial output is returned.
    pub fn run(mut self) -> Result<SimulationOutput, SimError> {
        while self.step()?.is_some() {}
        self.ledger.verify()?;

        let summary = RunSummary::from_rounds(&self.rounds);
        info!(
            seed = self.config.seed(),
            rounds = summary.rounds,
            settled = summary.settled_trades,
            rejected = summary.rejected_trades,
            energy_kwh = summary.total_energy_kwh,
            "simulation completed"
        );
        Ok(self.into_output(summary))
    }

    fn play_round(&mut self, round: u32) -> Result<RoundMetrics, SimError> {
        let mut stream = DrawStream::for_round(self.config.seed(), round);
        let energy_before = fleet_energy_kwh(&self.fleet);

        // 1. Move
        self.mobility.advance(&mut self.fleet, &mut stream);

        // 2. Classify
        let thresholds = *self.market.thresholds();
        let (mut sellers, mut buyers) = (0, 0);
        for v in &self.fleet {
            match v.role(&thresholds) {
                Role::Seller => sellers += 1,
                Role::Buyer => buyers += 1,
                Role::Inactive => {}
            }
        }

        // 3. Quote, match and sample latency
        let book = self.market.clear(
            &self.fleet,
            round,
            &self.latency,
            self.config.network_mode(),
            &mut stream,
        );

        // 4. Settle
        let min_transfer = self.config.market().min_transfer_kwh;
        let mut energy = 0.0;
        let mut traded_value = 0.0;
        let mut settled = 0;
        let mut rejected = 0;
        let mut latency_samples = Vec::with_capacity(book.matches.len());

        for m in &book.matches {
            latency_samples.push(m.latency_ms);
            let (seller, buyer) =
                pair_mut(&mut self.fleet, m.seller_id as usize, m.buyer_id as usize);

            let outcome = match apply_transfer(
                &mut seller.battery,
                &mut buyer.battery,
                m.quantity_kwh,
                min_transfer,
            ) {
                Ok(()) => {
                    self.ledger.append(m);
                    let s = &mut self.participation[m.seller_id as usize];
                    s.sold_kwh += m.quantity_kwh;
                    s.trades += 1;
                    let b = &mut self.participation[m.buyer_id as usize];
                    b.bought_kwh += m.quantity_kwh;
                    b.trades += 1;
                    energy += m.quantity_kwh;
                    traded_value += m.total_cost();
                    settled += 1;
                    Outcome::Settled
                }
                Err(e) => {
                    warn!(
                        round,
                        seller = m.seller_id,
                        buyer = m.buyer_id,
                        reason = e.reason(),
                        "transfer rejected: {e}"
                    );
                    rejected += 1;
                    Outcome::Rejected(e.reason())
                }
            };

            self.logs.push(TradeAttempt {
                round,
                seller_id: m.seller_id,
                buyer_id: m.buyer_id,
                quantity_kwh: m.quantity_kwh,
                ask_price: m.ask_price,
                price_per_kwh: m.clearing_price,
                bid_price: m.bid_price,
                latency_ms: m.latency_ms,
                distance_m: m.distance_m,
                alignment: m.alignment,
                outcome,
            });
        }

        // 5. Invariants
        let energy_after = fleet_energy_kwh(&self.fleet);
        let drift_kwh = energy_after - energy_before;
        if drift_kwh.abs() > ENERGY_TOLERANCE_KWH {
            return Err(SimError::EnergyDrift { round, drift_kwh });
        }
        if let Some(v) = self.fleet.iter().find(|v| !v.battery.within_bounds()) {
            return Err(SimError::BatteryOutOfBounds {
                round,
                vehicle_id: v.id,
                level_kwh: v.battery.level_kwh(),
                capacity_kwh: v.battery.capacity_kwh,
            });
        }

        debug!(
            round,
            sellers,
            buyers,
            asks = book.book.asks.len(),
            bids = book.book.bids.len(),
            settled,
            rejected,
            energy_kwh = energy,
            draws = stream.draws(),
            "round settled"
        );

        Ok(RoundMetrics {
            round,
            energy_transferred_kwh: energy,
            settled_count: settled,
            rejected_count: rejected,
            latency_samples,
            mean_latency_ms: 0.0,
            p50_latency_ms: 0.0,
            p95_latency_ms: 0.0,
            sellers,
            buyers,
            unmatched_sellers: book.unmatched_sellers(),
            unmatched_buyers: book.unmatched_buyers(),
            traded_value,
            fleet_energy_kwh: energy_after,
        }
        .with_latency_stats())
    }

    fn into_output(self, summary: RunSummary) -> SimulationOutput {
        let vehicles = self
            .fleet
            .iter()
            .zip(&self.participation)
            .map(|(v, p)| VehicleSummary {
                id: v.id,
                capacity_kwh: v.battery.capacity_kwh,
                final_level_kwh: v.battery.level_kwh(),
                final_soc_pct: v.battery.soc() * 100.0,
                energy_sold_kwh: p.sold_kwh,
                energy_bought_kwh: p.bought_kwh,
                trades: p.trades,
                final_position_m: v.position_m,
                final_speed_kmh: v.speed_kmh(),
            })
            .collect();

        SimulationOutput {
            energy: self.rounds.iter().map(EnergyRow::from).collect(),
            logs: self.logs,
            vehicles,
            ledger_head: self.ledger.head().to_string(),
            ledger: self.ledger.entries().to_vec(),
            rounds: self.rounds,
            summary,
            config: self.config,
        }
    }
}

/// Total stored energy of the fleet (kWh).
pub fn fleet_energy_kwh(fleet: &[VehicleState]) -> f64 {
    fleet.iter().map(|v| v.battery.level_kwh()).sum()
}

/// Mutable references to two different vehicles.
fn pair_mut(
    fleet: &mut [VehicleState],
    a: usize,
    b: usize,
) -> (&mut VehicleState, &mut VehicleState) {
    assert_ne!(a, b, "a vehicle cannot trade with itself");
    if a < b {
        let (lo, hi) = fleet.split_at_mut(b);
        (&mut lo[a], &mut hi[0])
    } else {
        let (lo, hi) = fleet.split_at_mut(a);
        (&mut hi[0], &mut lo[b])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScenarioConfig;

    fn smoke() -> SimConfig {
        SimConfig::from_scenario(&ScenarioConfig::smoke()).unwrap()
    }

    #[test]
    fn phases_advance_to_completion() {
        let mut sim = Simulation::new(smoke());
        assert_eq!(sim.phase(), Phase::Idle);

        let first = sim.step().unwrap().unwrap();
        assert_eq!(first.round, 1);
        assert_eq!(sim.phase(), Phase::Running { round: 1 });

        for _ in 2..=5 {
            assert!(sim.step().unwrap().is_some());
        }
        assert_eq!(sim.phase(), Phase::Completed);
        assert!(sim.step().unwrap().is_none());
        assert_eq!(sim.rounds().len(), 5);
    }

    #[test]
    fn ledger_holds_one_entry_per_settled_trade() {
        let output = Simulation::new(smoke()).run().unwrap();
        let settled: usize = output.rounds.iter().map(|r| r.settled_count).sum();
        assert!(settled > 0);
        assert_eq!(output.ledger.len(), settled);
        let settled_logs = output
            .logs
            .iter()
            .filter(|l| l.outcome == Outcome::Settled)
            .count();
        assert_eq!(settled_logs, settled);
    }

    #[test]
    fn with_fleet_rejects_wrong_size_and_ids() {
        let sim = Simulation::new(smoke());
        let mut fleet = sim.fleet().to_vec();
        fleet.swap(0, 1);
        assert!(matches!(
            Simulation::with_fleet(smoke(), fleet.clone()),
            Err(SimError::Config(_))
        ));
        fleet.pop();
        assert!(matches!(
            Simulation::with_fleet(smoke(), fleet),
            Err(SimError::Config(_))
        ));
    }

    #[test]
    fn pair_mut_returns_requested_order() {
        let mut fleet = Simulation::new(smoke()).fleet().to_vec();
        let (a, b) = pair_mut(&mut fleet, 4, 1);
        assert_eq!((a.id, b.id), (4, 1));
        let (a, b) = pair_mut(&mut fleet, 0, 5);
        assert_eq!((a.id, b.id), (0, 5));
    }
}
