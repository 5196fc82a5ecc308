//! Integration tests for the smoke scenario end to end.

mod common;

use v2v_market_sim::io::export::{
    ENERGY_FILE, ENERGY_HEADER, LEDGER_FILE, export_all, write_energy_csv, write_ledger_csv,
};
use v2v_market_sim::sim::engine::Simulation;
use v2v_market_sim::sim::ledger::verify_chain;
use v2v_market_sim::sim::types::Outcome;

#[test]
fn smoke_run_has_one_energy_row_per_round() {
    let output = common::run_smoke();
    assert_eq!(output.energy.len(), 5);
    assert_eq!(output.rounds.len(), 5);
    assert_eq!(output.vehicles.len(), 6);
    for (i, row) in output.energy.iter().enumerate() {
        assert_eq!(row.round as usize, i + 1);
    }
}

#[test]
fn reference_run_is_reproducible() {
    let output = common::run_smoke();

    let settled: Vec<usize> = output.energy.iter().map(|r| r.successful_matches).collect();
    let rejected: Vec<usize> = output.energy.iter().map(|r| r.rejected_matches).collect();
    assert_eq!(settled, [0, 0, 1, 1, 1]);
    assert_eq!(rejected, [0, 1, 0, 0, 0]);
    assert_eq!(output.summary.settled_trades, 3);
    assert_eq!(output.summary.rejected_trades, 1);
    assert!((output.summary.total_energy_kwh - 2.216343).abs() < 1e-6);

    // Seller 1 first meets buyer 3 on a link too weak to carry the minimum
    assert_eq!(output.logs.len(), 4);
    assert_eq!(output.logs[0].round, 2);
    assert_eq!(output.logs[0].outcome, Outcome::Rejected("below_minimum"));
    for e in &output.ledger {
        assert_eq!((e.seller_id, e.buyer_id), (1, 3));
    }
    assert_eq!(
        output.ledger_head,
        "5947af083e3cba0c6f3d10b8197f72ff66336968a3ca0a71c017328a7f8b4ad0"
    );

    let unmatched: Vec<(usize, usize)> = output
        .energy
        .iter()
        .map(|r| (r.unmatched_sellers, r.unmatched_buyers))
        .collect();
    assert_eq!(unmatched, [(2, 1), (1, 0), (1, 0), (1, 0), (1, 0)]);

    let mut buf = Vec::new();
    write_energy_csv(&output.energy, &mut buf).unwrap();
    let csv = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[1], "1,0.000000,0,0,0.000,2,1,2,1");
    assert_eq!(lines[2], "2,0.000000,0,1,96.400,2,1,1,0");
}

#[test]
fn ledger_length_equals_settled_count() {
    let output = common::run_smoke();
    let settled: usize = output.energy.iter().map(|r| r.successful_matches).sum();
    assert!(settled > 0, "reference run should trade");
    assert_eq!(output.ledger.len(), settled);
    assert_eq!(output.summary.settled_trades, settled);
    assert_eq!(
        output
            .logs
            .iter()
            .filter(|l| l.outcome == Outcome::Settled)
            .count(),
        settled
    );
    assert_eq!(verify_chain(&output.ledger, &output.ledger_head), Ok(()));
}

#[test]
fn identical_runs_export_identical_bytes() {
    let a = common::run_smoke();
    let b = common::run_smoke();
    assert!(!a.ledger.is_empty());

    let (mut ledger_a, mut ledger_b) = (Vec::new(), Vec::new());
    write_ledger_csv(&a.ledger, &mut ledger_a).unwrap();
    write_ledger_csv(&b.ledger, &mut ledger_b).unwrap();
    assert_eq!(ledger_a, ledger_b);

    let (mut energy_a, mut energy_b) = (Vec::new(), Vec::new());
    write_energy_csv(&a.energy, &mut energy_a).unwrap();
    write_energy_csv(&b.energy, &mut energy_b).unwrap();
    assert_eq!(energy_a, energy_b);

    assert_eq!(a.ledger_head, b.ledger_head);
    assert_eq!(a.vehicles, b.vehicles);
}

#[test]
fn seed_changes_the_run() {
    let a = common::run_smoke();
    let mut scenario = v2v_market_sim::config::ScenarioConfig::smoke();
    scenario.simulation.seed = 43;
    let b = common::run_scenario(&scenario);
    assert_ne!(a.vehicles, b.vehicles);
}

#[test]
fn summary_agrees_with_energy_table() {
    let output = common::run_smoke();
    let total: f64 = output.energy.iter().map(|r| r.energy_kwh).sum();
    assert!((output.summary.total_energy_kwh - total).abs() < 1e-9);

    let sold: f64 = output.vehicles.iter().map(|v| v.energy_sold_kwh).sum();
    let bought: f64 = output.vehicles.iter().map(|v| v.energy_bought_kwh).sum();
    assert!((sold - total).abs() < 1e-9);
    assert!((bought - total).abs() < 1e-9);
}

#[test]
fn stepping_matches_running() {
    let mut stepped = Simulation::new(common::smoke_config());
    let mut rounds = Vec::new();
    while let Some(m) = stepped.step().unwrap() {
        rounds.push(m);
    }
    let run = common::run_smoke();
    assert_eq!(rounds, run.rounds);
    assert_eq!(stepped.ledger().head(), run.ledger_head);
}

#[test]
fn export_writes_all_four_tables() {
    let output = common::run_smoke();
    let dir = common::scratch_dir("export");
    let paths = export_all(&output, &dir).unwrap();
    assert_eq!(paths.len(), 4);
    for p in &paths {
        assert!(p.exists(), "{} missing", p.display());
    }

    let energy = std::fs::read_to_string(dir.join(ENERGY_FILE)).unwrap();
    assert_eq!(energy.lines().next(), Some(ENERGY_HEADER));
    assert_eq!(energy.lines().count(), 6);

    let ledger = std::fs::read_to_string(dir.join(LEDGER_FILE)).unwrap();
    assert_eq!(ledger.lines().count(), output.ledger.len() + 1);

    let _ = std::fs::remove_dir_all(&dir);
}
