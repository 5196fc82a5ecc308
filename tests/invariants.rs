//! Property tests over random seeds and fleet sizes.

mod common;

use std::collections::HashSet;

use proptest::prelude::*;

use v2v_market_sim::config::ScenarioConfig;
use v2v_market_sim::sim::engine::{Simulation, fleet_energy_kwh};
use v2v_market_sim::sim::latency::NetworkMode;
use v2v_market_sim::sim::types::SimConfig;

fn scenario(seed: u64, vehicles: usize, rounds: u32, high_speed: bool) -> ScenarioConfig {
    let mut s = ScenarioConfig::baseline();
    s.simulation.seed = seed;
    s.simulation.vehicles = vehicles;
    s.simulation.rounds = rounds;
    s.simulation.network = if high_speed {
        NetworkMode::HighSpeed
    } else {
        NetworkMode::Standard
    };
    // A shorter road keeps the fleet dense enough to trade
    s.road.length_m = 200.0;
    s
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn every_round_conserves_energy_and_bounds(
        seed in 0u64..=99_999,
        vehicles in 6usize..=40,
        rounds in 5u32..=25,
        high_speed in any::<bool>(),
    ) {
        let config = SimConfig::from_scenario(&scenario(seed, vehicles, rounds, high_speed)).unwrap();
        let mut sim = Simulation::new(config);
        let initial = fleet_energy_kwh(sim.fleet());

        while let Some(round) = sim.step().unwrap() {
            prop_assert!((round.fleet_energy_kwh - initial).abs() < 1e-6);
            for v in sim.fleet() {
                prop_assert!(v.battery.level_kwh() >= 0.0);
                prop_assert!(v.battery.level_kwh() <= v.battery.capacity_kwh);
            }
            prop_assert!(round.settled_count + round.rejected_count <= vehicles / 2);
        }
        prop_assert!(sim.ledger().verify().is_ok());
    }

    #[test]
    fn trades_are_exclusive_and_ledger_matches_logs(
        seed in 0u64..=99_999,
        vehicles in 6usize..=40,
    ) {
        let output = common::run_scenario(&scenario(seed, vehicles, 15, false));

        for round in 1..=15 {
            let mut seen = HashSet::new();
            for l in output.logs.iter().filter(|l| l.round == round) {
                prop_assert!(l.seller_id != l.buyer_id);
                prop_assert!(l.ask_price < l.bid_price);
                prop_assert!(l.ask_price <= l.price_per_kwh && l.price_per_kwh <= l.bid_price);
                prop_assert!(seen.insert(l.seller_id));
                prop_assert!(seen.insert(l.buyer_id));
            }
        }

        let settled: Vec<_> = output
            .logs
            .iter()
            .filter(|l| l.outcome.to_string() == "settled")
            .collect();
        prop_assert_eq!(settled.len(), output.ledger.len());
        for (log, entry) in settled.iter().zip(&output.ledger) {
            prop_assert_eq!(log.round, entry.round);
            prop_assert_eq!((log.seller_id, log.buyer_id), (entry.seller_id, entry.buyer_id));
            prop_assert_eq!(log.quantity_kwh, entry.quantity_kwh);
        }
        for (i, e) in output.ledger.iter().enumerate() {
            prop_assert_eq!(e.sequence, i as u64);
        }
    }

    #[test]
    fn same_seed_same_run(seed in 0u64..=99_999) {
        let a = common::run_scenario(&scenario(seed, 12, 10, true));
        let b = common::run_scenario(&scenario(seed, 12, 10, true));
        prop_assert_eq!(&a.ledger_head, &b.ledger_head);
        prop_assert_eq!(&a.energy, &b.energy);
        prop_assert_eq!(&a.vehicles, &b.vehicles);
    }
}
