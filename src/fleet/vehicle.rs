use serde::Serialize;

use crate::config::{FleetConfig, RoadConfig};
use crate::fleet::battery::{Battery, Role, RoleThresholds, classify};
use crate::sim::rng::DrawStream;

/// Converts km/h to m/s.
pub const KMH_TO_MPS: f64 = 1000.0 / 3600.0;

/// A vehicle driving along the road with a tradeable battery.
///
/// The id equals the vehicle's index in the fleet and never changes. The
/// market role is not stored here; it is recomputed each round with
/// [`VehicleState::role`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleState {
    /// Stable vehicle id.
    pub id: u32,
    /// Position along the road (m), in `[0, road_length)`.
    pub position_m: f64,
    /// Forward speed (m/s).
    pub velocity_mps: f64,
    /// Traction battery.
    pub battery: Battery,
    /// Most energy this vehicle can hand over or take in per round (kWh).
    pub max_transfer_kwh: f64,
}

impl VehicleState {
    /// Creates a vehicle.
    ///
    /// # Panics
    ///
    /// Panics if `max_transfer_kwh` is not positive.
    pub fn new(
        id: u32,
        position_m: f64,
        velocity_mps: f64,
        battery: Battery,
        max_transfer_kwh: f64,
    ) -> Self {
        assert!(max_transfer_kwh > 0.0);
        Self {
            id,
            position_m,
            velocity_mps,
            battery,
            max_transfer_kwh,
        }
    }

    /// Market role for the current battery level.
    pub fn role(&self, thresholds: &RoleThresholds) -> Role {
        classify(&self.battery, thresholds)
    }

    /// Speed in km/h.
    pub fn speed_kmh(&self) -> f64 {
        self.velocity_mps / KMH_TO_MPS
    }
}

/// Samples the initial fleet from the spawn stream.
///
/// Per vehicle, in id order: capacity, initial SOC, transfer limit,
/// position, speed.
///
/// # Panics
///
/// Panics if `fleet.capacities_kwh` or `fleet.transfer_limits_kwh` is
/// empty. Validated scenarios never are.
pub fn spawn_fleet(
    count: usize,
    fleet: &FleetConfig,
    road: &RoadConfig,
    stream: &mut DrawStream,
) -> Vec<VehicleState> {
    let mut vehicles = Vec::with_capacity(count);
    for id in 0..count {
        let capacity = *stream
            .pick(&fleet.capacities_kwh)
            .expect("fleet.capacities_kwh must not be empty");
        let soc = stream.uniform_range(fleet.initial_soc_min, fleet.initial_soc_max);
        let max_transfer = *stream
            .pick(&fleet.transfer_limits_kwh)
            .expect("fleet.transfer_limits_kwh must not be empty");
        let position = stream.uniform_range(0.0, road.length_m);
        let speed_kmh = stream.uniform_range(road.min_speed_kmh, road.max_speed_kmh);

        vehicles.push(VehicleState::new(
            id as u32,
            position,
            speed_kmh * KMH_TO_MPS,
            Battery::new(capacity, soc.clamp(0.0, 1.0)),
            max_transfer,
        ));
    }
    vehicles
}
