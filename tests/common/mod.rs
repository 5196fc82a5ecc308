//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use v2v_market_sim::config::ScenarioConfig;
use v2v_market_sim::fleet::{Battery, VehicleState};
use v2v_market_sim::sim::engine::Simulation;
use v2v_market_sim::sim::types::{SimConfig, SimulationOutput};

/// Smallest valid scenario (6 vehicles, 5 rounds, seed 42, standard network).
pub fn smoke_config() -> SimConfig {
    SimConfig::from_scenario(&ScenarioConfig::smoke()).expect("smoke preset is valid")
}

/// Smoke scenario on an 800 m road without price jitter or speed noise,
/// so hand-built fleets behave exactly as laid out.
pub fn quiet_config() -> SimConfig {
    let mut scenario = ScenarioConfig::smoke();
    scenario.road.length_m = 800.0;
    scenario.market.price_jitter = 0.0;
    scenario.road.speed_noise_kmh = 0.0;
    SimConfig::from_scenario(&scenario).expect("quiet scenario is valid")
}

/// A 60 kWh vehicle at 36 km/h with a 5 kWh transfer limit.
pub fn vehicle(id: u32, position_m: f64, soc: f64) -> VehicleState {
    VehicleState::new(id, position_m, 10.0, Battery::new(60.0, soc), 5.0)
}

/// Pads `fleet` up to `n` vehicles with inactive ones (SOC 0.5) spaced
/// well apart at the far side of the road.
pub fn pad_with_inactive(mut fleet: Vec<VehicleState>, n: usize) -> Vec<VehicleState> {
    let mut position = 400.0;
    while fleet.len() < n {
        fleet.push(vehicle(fleet.len() as u32, position, 0.5));
        position += 60.0;
    }
    fleet
}

/// Runs the smoke scenario to completion.
pub fn run_smoke() -> SimulationOutput {
    Simulation::new(smoke_config())
        .run()
        .expect("smoke run succeeds")
}

/// Runs `scenario` to completion.
pub fn run_scenario(scenario: &ScenarioConfig) -> SimulationOutput {
    let config = SimConfig::from_scenario(scenario).expect("scenario is valid");
    Simulation::new(config).run().expect("run succeeds")
}

/// Fresh, empty directory under the system temp dir.
pub fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("v2v-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}
