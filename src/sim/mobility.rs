//! One-dimensional ring-road mobility.

use crate::config::RoadConfig;
use crate::fleet::vehicle::{KMH_TO_MPS, VehicleState};

use super::rng::DrawStream;

/// Moves vehicles along a road whose ends are joined.
#[derive(Debug, Clone)]
pub struct Mobility {
    length_m: f64,
    time_step_s: f64,
    min_speed_mps: f64,
    max_speed_mps: f64,
    noise_mps: f64,
}

impl Mobility {
    pub fn new(road: &RoadConfig) -> Self {
        Self {
            length_m: road.length_m,
            time_step_s: road.time_step_s,
            min_speed_mps: road.min_speed_kmh * KMH_TO_MPS,
            max_speed_mps: road.max_speed_kmh * KMH_TO_MPS,
            noise_mps: road.speed_noise_kmh * KMH_TO_MPS,
        }
    }

    /// Road length (m).
    pub fn length_m(&self) -> f64 {
        self.length_m
    }

    /// Advances every vehicle by one time step.
    ///
    /// Vehicles are visited in slice order (the fleet is kept in id order).
    /// Each gets one speed-noise draw, its speed is clamped to the allowed
    /// band, and its position wraps into `[0, length)`.
    pub fn advance(&self, fleet: &mut [VehicleState], stream: &mut DrawStream) {
        for vehicle in fleet.iter_mut() {
            let noisy = vehicle.velocity_mps + stream.gaussian(self.noise_mps);
            vehicle.velocity_mps = noisy.clamp(self.min_speed_mps, self.max_speed_mps);
            vehicle.position_m = self.wrap(vehicle.position_m + vehicle.velocity_mps * self.time_step_s);
        }
    }

    /// Shortest distance between two road positions, going either way round.
    pub fn distance_m(&self, a: f64, b: f64) -> f64 {
        ring_distance(a, b, self.length_m)
    }

    fn wrap(&self, position_m: f64) -> f64 {
        let p = position_m.rem_euclid(self.length_m);
        // rem_euclid can round up to the modulus for tiny negative inputs
        if p >= self.length_m { 0.0 } else { p }
    }
}

/// Circular distance between `a` and `b` on a ring of `length_m`.
pub fn ring_distance(a: f64, b: f64, length_m: f64) -> f64 {
    let d = (a - b).abs() % length_m;
    d.min(length_m - d)
}
