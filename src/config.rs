//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::latency::NetworkMode;

/// Allowed fleet sizes.
pub const VEHICLE_RANGE: std::ops::RangeInclusive<usize> = 6..=40;
/// Allowed number of rounds per run.
pub const ROUND_RANGE: std::ops::RangeInclusive<u32> = 5..=200;
/// Largest accepted random seed.
pub const MAX_SEED: u64 = 99_999;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default. Turn it into a
/// run configuration with [`crate::sim::types::SimConfig::from_scenario`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Fleet size, run length, network mode and seed.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Road geometry and vehicle kinematics.
    #[serde(default)]
    pub road: RoadConfig,
    /// Battery sampling ranges and role thresholds.
    #[serde(default)]
    pub fleet: FleetConfig,
    /// Pricing and proximity parameters of the auction.
    #[serde(default)]
    pub market: MarketConfig,
    /// Latency distributions per network mode.
    #[serde(default)]
    pub network: NetworkConfig,
}

/// Run-level parameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of vehicles on the road (6–40).
    pub vehicles: usize,
    /// Number of market rounds (5–200).
    pub rounds: u32,
    /// Master random seed (0–99 999).
    pub seed: u64,
    /// `"standard"` or `"high-speed"`.
    pub network: NetworkMode,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            vehicles: 32,
            rounds: 120,
            seed: 1234,
            network: NetworkMode::HighSpeed,
        }
    }
}

/// Road geometry and vehicle kinematics.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoadConfig {
    /// Road length in metres; positions wrap at this length.
    pub length_m: f64,
    /// Seconds of travel per round.
    pub time_step_s: f64,
    /// Lowest allowed vehicle speed (km/h).
    pub min_speed_kmh: f64,
    /// Highest allowed vehicle speed (km/h).
    pub max_speed_kmh: f64,
    /// Standard deviation of per-round speed noise (km/h).
    pub speed_noise_kmh: f64,
}

impl Default for RoadConfig {
    fn default() -> Self {
        Self {
            length_m: 800.0,
            time_step_s: 1.0,
            min_speed_kmh: 20.0,
            max_speed_kmh: 80.0,
            speed_noise_kmh: 2.0,
        }
    }
}

/// Battery sampling ranges and role thresholds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FleetConfig {
    /// Battery capacities a vehicle is drawn from (kWh).
    pub capacities_kwh: Vec<f64>,
    /// Lower bound of the initial state of charge.
    pub initial_soc_min: f64,
    /// Upper bound of the initial state of charge.
    pub initial_soc_max: f64,
    /// Per-round transfer limits a vehicle is drawn from (kWh).
    pub transfer_limits_kwh: Vec<f64>,
    /// State of charge at or above which a vehicle sells.
    pub sell_threshold: f64,
    /// State of charge at or below which a vehicle buys.
    pub buy_threshold: f64,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            capacities_kwh: vec![60.0, 75.0, 90.0],
            initial_soc_min: 0.12,
            initial_soc_max: 0.96,
            transfer_limits_kwh: vec![3.0, 5.0, 7.0],
            sell_threshold: 0.60,
            buy_threshold: 0.40,
        }
    }
}

/// Auction pricing and proximity parameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarketConfig {
    /// Maximum road distance between trading partners (m).
    pub charging_range_m: f64,
    /// Ask price of a seller with a full surplus ($/kWh).
    pub ask_floor: f64,
    /// Ask premium of a seller with no surplus left ($/kWh).
    pub ask_span: f64,
    /// Bid price of a buyer just at the buy threshold ($/kWh).
    pub bid_floor: f64,
    /// Bid premium of a buyer with an empty battery ($/kWh).
    pub bid_span: f64,
    /// Standard deviation of the per-order price jitter ($/kWh).
    pub price_jitter: f64,
    /// Prices never drop below this value ($/kWh).
    pub min_price: f64,
    /// Smallest energy amount worth quoting or transferring (kWh).
    pub min_transfer_kwh: f64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            charging_range_m: 15.0,
            ask_floor: 0.10,
            ask_span: 0.12,
            bid_floor: 0.12,
            bid_span: 0.18,
            price_jitter: 0.01,
            min_price: 0.01,
            min_transfer_kwh: 0.05,
        }
    }
}

/// Latency distributions per network mode.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// Mean latency of the standard network (ms).
    pub standard_mean_ms: f64,
    /// Latency standard deviation of the standard network (ms).
    pub standard_std_ms: f64,
    /// Mean latency of the high-speed network (ms).
    pub high_speed_mean_ms: f64,
    /// Latency standard deviation of the high-speed network (ms).
    pub high_speed_std_ms: f64,
    /// Lowest latency ever reported (ms).
    pub floor_ms: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            standard_mean_ms: 80.0,
            standard_std_ms: 15.0,
            high_speed_mean_ms: 30.0,
            high_speed_std_ms: 6.0,
            floor_ms: 5.0,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.vehicles"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub(crate) fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario (the dashboard's default sliders).
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the rush-hour preset: a full road on the standard network,
    /// with slower and denser traffic.
    pub fn rush_hour() -> Self {
        Self {
            simulation: SimulationConfig {
                vehicles: 40,
                rounds: 200,
                network: NetworkMode::Standard,
                ..SimulationConfig::default()
            },
            road: RoadConfig {
                length_m: 400.0,
                min_speed_kmh: 10.0,
                max_speed_kmh: 40.0,
                ..RoadConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns the smallest valid run: 6 vehicles, 5 rounds, seed 42,
    /// standard network, on a 300 m loop short enough for the six
    /// vehicles to meet.
    pub fn smoke() -> Self {
        Self {
            simulation: SimulationConfig {
                vehicles: 6,
                rounds: 5,
                seed: 42,
                network: NetworkMode::Standard,
            },
            road: RoadConfig {
                length_m: 300.0,
                ..RoadConfig::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "rush_hour", "smoke"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "rush_hour" => Ok(Self::rush_hour()),
            "smoke" => Ok(Self::smoke()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let s = &self.simulation;
        if !VEHICLE_RANGE.contains(&s.vehicles) {
            errors.push(ConfigError::new(
                "simulation.vehicles",
                format!(
                    "must be in [{}, {}], got {}",
                    VEHICLE_RANGE.start(),
                    VEHICLE_RANGE.end(),
                    s.vehicles
                ),
            ));
        }
        if !ROUND_RANGE.contains(&s.rounds) {
            errors.push(ConfigError::new(
                "simulation.rounds",
                format!(
                    "must be in [{}, {}], got {}",
                    ROUND_RANGE.start(),
                    ROUND_RANGE.end(),
                    s.rounds
                ),
            ));
        }
        if s.seed > MAX_SEED {
            errors.push(ConfigError::new(
                "simulation.seed",
                format!("must be <= {MAX_SEED}, got {}", s.seed),
            ));
        }

        let r = &self.road;
        if !(r.length_m.is_finite() && r.length_m > 0.0) {
            errors.push(ConfigError::new("road.length_m", "must be > 0"));
        }
        if !(r.time_step_s.is_finite() && r.time_step_s > 0.0) {
            errors.push(ConfigError::new("road.time_step_s", "must be > 0"));
        }
        if !(r.min_speed_kmh >= 0.0) {
            errors.push(ConfigError::new("road.min_speed_kmh", "must be >= 0"));
        }
        if !(r.min_speed_kmh <= r.max_speed_kmh) {
            errors.push(ConfigError::new(
                "road.min_speed_kmh",
                "must be <= road.max_speed_kmh",
            ));
        }
        if !(r.speed_noise_kmh >= 0.0) {
            errors.push(ConfigError::new("road.speed_noise_kmh", "must be >= 0"));
        }

        let f = &self.fleet;
        if f.capacities_kwh.is_empty() || f.capacities_kwh.iter().any(|c| !(*c > 0.0)) {
            errors.push(ConfigError::new(
                "fleet.capacities_kwh",
                "must be a non-empty list of values > 0",
            ));
        }
        if f.transfer_limits_kwh.is_empty() || f.transfer_limits_kwh.iter().any(|c| !(*c > 0.0))
        {
            errors.push(ConfigError::new(
                "fleet.transfer_limits_kwh",
                "must be a non-empty list of values > 0",
            ));
        }
        if !(0.0..=1.0).contains(&f.initial_soc_min) || !(0.0..=1.0).contains(&f.initial_soc_max)
        {
            errors.push(ConfigError::new(
                "fleet.initial_soc_min",
                "initial state-of-charge bounds must be in [0.0, 1.0]",
            ));
        } else if f.initial_soc_min > f.initial_soc_max {
            errors.push(ConfigError::new(
                "fleet.initial_soc_min",
                "must be <= fleet.initial_soc_max",
            ));
        }
        if !(f.buy_threshold > 0.0 && f.buy_threshold < f.sell_threshold && f.sell_threshold < 1.0)
        {
            errors.push(ConfigError::new(
                "fleet.buy_threshold",
                "thresholds must satisfy 0 < buy_threshold < sell_threshold < 1",
            ));
        }

        let m = &self.market;
        if !(m.charging_range_m > 0.0) {
            errors.push(ConfigError::new("market.charging_range_m", "must be > 0"));
        } else if r.length_m > 0.0 && m.charging_range_m >= r.length_m / 2.0 {
            errors.push(ConfigError::new(
                "market.charging_range_m",
                "must be < road.length_m / 2",
            ));
        }
        for (field, value) in [
            ("market.ask_floor", m.ask_floor),
            ("market.ask_span", m.ask_span),
            ("market.bid_floor", m.bid_floor),
            ("market.bid_span", m.bid_span),
            ("market.price_jitter", m.price_jitter),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                errors.push(ConfigError::new(field, "must be a finite value >= 0"));
            }
        }
        if !(m.min_price > 0.0) {
            errors.push(ConfigError::new("market.min_price", "must be > 0"));
        }
        if !(m.min_transfer_kwh > 0.0) {
            errors.push(ConfigError::new("market.min_transfer_kwh", "must be > 0"));
        }

        let n = &self.network;
        if !(n.floor_ms >= 0.0) {
            errors.push(ConfigError::new("network.floor_ms", "must be >= 0"));
        }
        if !(n.standard_std_ms >= 0.0 && n.high_speed_std_ms >= 0.0) {
            errors.push(ConfigError::new(
                "network.standard_std_ms",
                "standard deviations must be >= 0",
            ));
        }
        if !(n.high_speed_mean_ms < n.standard_mean_ms) {
            errors.push(ConfigError::new(
                "network.high_speed_mean_ms",
                "must be < network.standard_mean_ms",
            ));
        }
        if !(n.high_speed_std_ms <= n.standard_std_ms) {
            errors.push(ConfigError::new(
                "network.high_speed_std_ms",
                "must be <= network.standard_std_ms",
            ));
        }

        errors
    }
}
