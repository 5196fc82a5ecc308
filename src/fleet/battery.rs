use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::config::FleetConfig;

/// A vehicle traction battery that can hand charge to another vehicle.
///
/// `Battery` tracks the stored energy against a fixed capacity. The level
/// is private so that every change goes through [`apply_transfer`], which
/// keeps it inside `[0, capacity]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Battery {
    /// Battery capacity in kilowatt-hours.
    pub capacity_kwh: f64,

    /// Stored energy in kilowatt-hours.
    level_kwh: f64,
}

impl Battery {
    /// Creates a new battery at the given state of charge.
    ///
    /// # Arguments
    ///
    /// * `capacity_kwh` - Battery capacity in kWh (must be > 0)
    /// * `soc` - Initial state of charge as a fraction (0.0 to 1.0)
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero/negative or SOC out of range.
    pub fn new(capacity_kwh: f64, soc: f64) -> Self {
        assert!(capacity_kwh > 0.0);
        assert!((0.0..=1.0).contains(&soc));

        Self {
            capacity_kwh,
            level_kwh: capacity_kwh * soc,
        }
    }

    /// Stored energy (kWh).
    pub fn level_kwh(&self) -> f64 {
        self.level_kwh
    }

    /// State of charge as a fraction of capacity.
    pub fn soc(&self) -> f64 {
        self.level_kwh / self.capacity_kwh
    }

    /// Energy that can still be stored before the battery is full (kWh).
    pub fn headroom_kwh(&self) -> f64 {
        (self.capacity_kwh - self.level_kwh).max(0.0)
    }

    /// Whether the level lies inside `[0, capacity]`.
    pub fn within_bounds(&self) -> bool {
        self.level_kwh >= 0.0 && self.level_kwh <= self.capacity_kwh
    }
}

/// Market role of a vehicle for the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Seller,
    Buyer,
    Inactive,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Seller => "seller",
            Role::Buyer => "buyer",
            Role::Inactive => "inactive",
        };
        f.write_str(s)
    }
}

/// State-of-charge thresholds that split the fleet into sellers and buyers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoleThresholds {
    /// At or above this SOC a vehicle sells.
    pub sell_soc: f64,
    /// At or below this SOC a vehicle buys.
    pub buy_soc: f64,
}

impl From<&FleetConfig> for RoleThresholds {
    fn from(cfg: &FleetConfig) -> Self {
        Self {
            sell_soc: cfg.sell_threshold,
            buy_soc: cfg.buy_threshold,
        }
    }
}

/// Classifies a battery into a market role.
///
/// Pure function of the current level; callers recompute it every round.
pub fn classify(battery: &Battery, thresholds: &RoleThresholds) -> Role {
    let soc = battery.soc();
    if soc >= thresholds.sell_soc {
        Role::Seller
    } else if soc <= thresholds.buy_soc {
        Role::Buyer
    } else {
        Role::Inactive
    }
}

/// Reasons a transfer is refused. No battery state changes on refusal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransferError {
    #[error("invalid transfer quantity {quantity_kwh} kWh")]
    InvalidQuantity { quantity_kwh: f64 },

    #[error("transfer of {quantity_kwh:.4} kWh is below the {min_kwh} kWh minimum")]
    BelowMinimum { quantity_kwh: f64, min_kwh: f64 },

    #[error("seller holds {available_kwh:.4} kWh, cannot give {requested_kwh:.4} kWh")]
    SellerDepleted {
        requested_kwh: f64,
        available_kwh: f64,
    },

    #[error("buyer can store {headroom_kwh:.4} kWh, cannot take {requested_kwh:.4} kWh")]
    BuyerFull {
        requested_kwh: f64,
        headroom_kwh: f64,
    },
}

impl TransferError {
    /// Short machine-readable reason used in the trade log.
    pub fn reason(&self) -> &'static str {
        match self {
            TransferError::InvalidQuantity { .. } => "invalid_quantity",
            TransferError::BelowMinimum { .. } => "below_minimum",
            TransferError::SellerDepleted { .. } => "seller_depleted",
            TransferError::BuyerFull { .. } => "buyer_full",
        }
    }
}

/// Moves `quantity_kwh` from `seller` to `buyer`.
///
/// Either both batteries change by exactly `quantity_kwh` or neither
/// changes, so the summed fleet energy is unaffected by any call.
///
/// # Errors
///
/// Returns a [`TransferError`] when the quantity is not a positive finite
/// number, is below `min_transfer_kwh`, or would push either battery
/// outside `[0, capacity]`.
pub fn apply_transfer(
    seller: &mut Battery,
    buyer: &mut Battery,
    quantity_kwh: f64,
    min_transfer_kwh: f64,
) -> Result<(), TransferError> {
    if !quantity_kwh.is_finite() || quantity_kwh <= 0.0 {
        return Err(TransferError::InvalidQuantity { quantity_kwh });
    }
    if quantity_kwh < min_transfer_kwh {
        return Err(TransferError::BelowMinimum {
            quantity_kwh,
            min_kwh: min_transfer_kwh,
        });
    }
    if seller.level_kwh - quantity_kwh < 0.0 {
        return Err(TransferError::SellerDepleted {
            requested_kwh: quantity_kwh,
            available_kwh: seller.level_kwh,
        });
    }
    if buyer.level_kwh + quantity_kwh > buyer.capacity_kwh {
        return Err(TransferError::BuyerFull {
            requested_kwh: quantity_kwh,
            headroom_kwh: buyer.headroom_kwh(),
        });
    }

    seller.level_kwh -= quantity_kwh;
    buyer.level_kwh += quantity_kwh;
    Ok(())
}
