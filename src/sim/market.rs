//! Per-round double auction between nearby sellers and buyers.
//!
//! # Pricing
//!
//! Sellers ask more the less surplus they have left above the sell
//! threshold; buyers bid more the emptier their battery is:
//!
//! ```text
//! surplus = (soc - sell) / (1 - sell)        ask = ask_floor + ask_span * (1 - surplus)
//! urgency = (buy - soc) / buy                bid = bid_floor + bid_span * urgency
//! ```
//!
//! Both prices get one Gaussian jitter draw and are floored at `min_price`.
//!
//! # Matching
//!
//! Every seller/buyer pair within charging range and with `bid > ask` is a
//! candidate. Candidates are sorted by surplus (`bid - ask`) descending,
//! then seller id, then buyer id, and accepted greedily; a vehicle trades
//! at most once per round. Trades clear at the bid/ask midpoint.
//!
//! # Quantity
//!
//! A pair can move at most `min(offer, request, seller level, buyer
//! headroom)`. Inductive coupling loses efficiency with distance and speed
//! difference, so the cleared quantity is that bound scaled by the link
//! efficiency, which is always in `[0, 1)`.

use serde::Serialize;

use crate::config::{FleetConfig, MarketConfig, RoadConfig};
use crate::fleet::{Role, RoleThresholds, VehicleState};

use super::latency::{LatencyModel, NetworkMode};
use super::mobility::ring_distance;
use super::rng::DrawStream;

/// Gaps shorter than this are too close for proper coil alignment (m).
const MIN_ALIGNMENT_GAP_M: f64 = 0.1;
/// Best achievable alignment score.
const PEAK_ALIGNMENT: f64 = 0.95;
/// Score multiplier for gaps outside the usable band.
const MISALIGNED_FACTOR: f64 = 0.2;
/// Relative speed (km/h) over which alignment decays by a factor of e.
const SPEED_DECAY_KMH: f64 = 50.0;

/// Which side of the book an order is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Ask,
    Bid,
}

/// A round-scoped ask or bid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub vehicle_id: u32,
    pub side: Side,
    /// Energy offered (ask) or requested (bid), kWh.
    pub quantity_kwh: f64,
    /// Reservation price, $/kWh.
    pub price: f64,
    pub round: u32,
}

/// All orders issued in one round, each side in vehicle-id order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBook {
    pub asks: Vec<Order>,
    pub bids: Vec<Order>,
}

/// A seller/buyer pairing accepted by the auction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub round: u32,
    pub seller_id: u32,
    pub buyer_id: u32,
    /// Energy to move, kWh.
    pub quantity_kwh: f64,
    pub ask_price: f64,
    pub bid_price: f64,
    /// Midpoint of ask and bid, $/kWh.
    pub clearing_price: f64,
    /// Simulated settlement latency, ms.
    pub latency_ms: f64,
    /// Road distance between the two vehicles, m.
    pub distance_m: f64,
    /// Coil alignment score in `[0, 1]`.
    pub alignment: f64,
}

impl Match {
    /// Bid minus ask.
    pub fn surplus(&self) -> f64 {
        self.bid_price - self.ask_price
    }

    /// Price paid for the whole quantity.
    pub fn total_cost(&self) -> f64 {
        self.clearing_price * self.quantity_kwh
    }
}

/// Everything the auction produced for one round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundBook {
    pub book: OrderBook,
    pub matches: Vec<Match>,
}

impl RoundBook {
    /// Sellers that issued an ask but found no partner.
    pub fn unmatched_sellers(&self) -> usize {
        self.book.asks.len() - self.matches.len()
    }

    /// Buyers that issued a bid but found no partner.
    pub fn unmatched_buyers(&self) -> usize {
        self.book.bids.len() - self.matches.len()
    }
}

/// Quotes, pairs and prices trades for one round.
#[derive(Debug, Clone)]
pub struct MatchingEngine {
    thresholds: RoleThresholds,
    market: MarketConfig,
    road_length_m: f64,
}

impl MatchingEngine {
    pub fn new(fleet: &FleetConfig, market: &MarketConfig, road: &RoadConfig) -> Self {
        Self {
            thresholds: RoleThresholds::from(fleet),
            market: market.clone(),
            road_length_m: road.length_m,
        }
    }

    pub fn thresholds(&self) -> &RoleThresholds {
        &self.thresholds
    }

    /// Ask price before jitter for a seller at `soc`.
    pub fn base_ask_price(&self, soc: f64) -> f64 {
        let sell = self.thresholds.sell_soc;
        let surplus = ((soc - sell) / (1.0 - sell)).clamp(0.0, 1.0);
        self.market.ask_floor + self.market.ask_span * (1.0 - surplus)
    }

    /// Bid price before jitter for a buyer at `soc`.
    pub fn base_bid_price(&self, soc: f64) -> f64 {
        let buy = self.thresholds.buy_soc;
        let urgency = ((buy - soc) / buy).clamp(0.0, 1.0);
        self.market.bid_floor + self.market.bid_span * urgency
    }

    /// Builds the round's order book.
    ///
    /// Vehicles are visited in id order. A seller offers what it holds
    /// above the sell threshold and a buyer asks for what would bring it up
    /// to the sell threshold, both capped by the vehicle's transfer limit.
    /// Quotes smaller than the minimum transfer are not issued; every
    /// issued order consumes exactly one jitter draw.
    pub fn collect_orders(
        &self,
        fleet: &[VehicleState],
        round: u32,
        stream: &mut DrawStream,
    ) -> OrderBook {
        let mut book = OrderBook::default();
        let sell = self.thresholds.sell_soc;

        for vehicle in fleet {
            let battery = &vehicle.battery;
            let soc = battery.soc();
            let (side, quantity_kwh, base_price) = match vehicle.role(&self.thresholds) {
                Role::Seller => (
                    Side::Ask,
                    vehicle
                        .max_transfer_kwh
                        .min(battery.level_kwh() - sell * battery.capacity_kwh),
                    self.base_ask_price(soc),
                ),
                Role::Buyer => (
                    Side::Bid,
                    vehicle
                        .max_transfer_kwh
                        .min(sell * battery.capacity_kwh - battery.level_kwh()),
                    self.base_bid_price(soc),
                ),
                Role::Inactive => continue,
            };
            if quantity_kwh < self.market.min_transfer_kwh {
                continue;
            }

            let price = (base_price + stream.gaussian(self.market.price_jitter))
                .max(self.market.min_price);
            let order = Order {
                vehicle_id: vehicle.id,
                side,
                quantity_kwh,
                price,
                round,
            };
            match side {
                Side::Ask => book.asks.push(order),
                Side::Bid => book.bids.push(order),
            }
        }
        book
    }

    /// Coil alignment score for a pair at `gap_m` metres with a relative
    /// speed of `relative_kmh`.
    pub fn alignment(&self, gap_m: f64, relative_kmh: f64) -> f64 {
        let range = self.market.charging_range_m;
        let mut score = PEAK_ALIGNMENT;
        if !(MIN_ALIGNMENT_GAP_M..=range).contains(&gap_m) {
            score *= MISALIGNED_FACTOR;
        } else {
            let sigma = 0.8 * range / 3.0;
            let offset = gap_m - range / 2.0;
            score *= (-(offset * offset) / (2.0 * sigma * sigma)).exp();
        }
        score *= (-relative_kmh.abs() / SPEED_DECAY_KMH).exp();
        score.clamp(0.0, 1.0)
    }

    /// Fraction of the quoted energy that actually crosses the link.
    pub fn link_efficiency(&self, gap_m: f64, alignment: f64) -> f64 {
        (alignment * (1.0 - gap_m / self.market.charging_range_m)).max(0.0)
    }

    /// Pairs asks with bids. Deterministic; latency is left at zero.
    pub fn match_orders(&self, book: &OrderBook, fleet: &[VehicleState], round: u32) -> Vec<Match> {
        let mut candidates = Vec::new();
        for ask in &book.asks {
            let Some(seller) = fleet.get(ask.vehicle_id as usize) else {
                continue;
            };
            for bid in &book.bids {
                if bid.price <= ask.price {
                    continue;
                }
                let Some(buyer) = fleet.get(bid.vehicle_id as usize) else {
                    continue;
                };
                let gap = ring_distance(seller.position_m, buyer.position_m, self.road_length_m);
                if gap > self.market.charging_range_m {
                    continue;
                }
                let relative_kmh = seller.speed_kmh() - buyer.speed_kmh();
                let alignment = self.alignment(gap, relative_kmh);
                let efficiency = self.link_efficiency(gap, alignment);
                let bound = ask
                    .quantity_kwh
                    .min(bid.quantity_kwh)
                    .min(seller.battery.level_kwh())
                    .min(buyer.battery.headroom_kwh());
                let quantity_kwh = bound * efficiency;
                if quantity_kwh <= 0.0 {
                    continue;
                }
                candidates.push(Match {
                    round,
                    seller_id: ask.vehicle_id,
                    buyer_id: bid.vehicle_id,
                    quantity_kwh,
                    ask_price: ask.price,
                    bid_price: bid.price,
                    clearing_price: (ask.price + bid.price) / 2.0,
                    latency_ms: 0.0,
                    distance_m: gap,
                    alignment,
                });
            }
        }

        candidates.sort_by(|a, b| {
            b.surplus()
                .total_cmp(&a.surplus())
                .then(a.seller_id.cmp(&b.seller_id))
                .then(a.buyer_id.cmp(&b.buyer_id))
        });

        let mut busy = vec![false; fleet.len()];
        let mut matches = Vec::new();
        for candidate in candidates {
            let (s, b) = (candidate.seller_id as usize, candidate.buyer_id as usize);
            if busy[s] || busy[b] {
                continue;
            }
            busy[s] = true;
            busy[b] = true;
            matches.push(candidate);
        }
        matches
    }

    /// Runs the full auction for one round: quotes (jitter draws), pairing,
    /// then one latency draw per accepted match in acceptance order.
    pub fn clear(
        &self,
        fleet: &[VehicleState],
        round: u32,
        latency: &LatencyModel,
        mode: NetworkMode,
        stream: &mut DrawStream,
    ) -> RoundBook {
        let book = self.collect_orders(fleet, round, stream);
        let mut matches = self.match_orders(&book, fleet, round);
        for m in &mut matches {
            m.latency_ms = latency.sample_latency(mode, stream);
        }
        RoundBook { book, matches }
    }
}
