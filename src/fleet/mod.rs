//! Vehicle and battery state.

/// Battery levels, role classification and energy transfers.
pub mod battery;
pub mod vehicle;

pub use battery::{Battery, Role, RoleThresholds, TransferError, apply_transfer, classify};
pub use vehicle::{VehicleState, spawn_fleet};
