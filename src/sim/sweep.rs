//! Independent runs over several seeds.

use std::num::NonZeroUsize;
use std::thread;

use serde::Serialize;

use crate::config::ScenarioConfig;
use crate::error::SimError;

use super::engine::Simulation;
use super::metrics::RunSummary;
use super::types::SimConfig;

/// Summary of one seed in a sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepResult {
    pub seed: u64,
    pub summary: RunSummary,
    pub ledger_head: String,
}

/// Runs `scenario` once per seed, with at most one thread per available
/// CPU.
///
/// Runs share nothing: each owns its fleet, ledger and random streams, so
/// results equal those of sequential runs. Results come back in seed order.
///
/// # Errors
///
/// Returns the first error in seed order. Every seed is validated before
/// any run starts.
pub fn run_sweep(scenario: &ScenarioConfig, seeds: &[u64]) -> Result<Vec<SweepResult>, SimError> {
    let workers = thread::available_parallelism().map_or(1, NonZeroUsize::get);
    run_sweep_with_workers(scenario, seeds, workers)
}

/// Like [`run_sweep`], but runs at most `workers` seeds at a time.
///
/// # Errors
///
/// Same as [`run_sweep`].
pub fn run_sweep_with_workers(
    scenario: &ScenarioConfig,
    seeds: &[u64],
    workers: usize,
) -> Result<Vec<SweepResult>, SimError> {
    let configs = seeds
        .iter()
        .map(|&seed| {
            let mut s = scenario.clone();
            s.simulation.seed = seed;
            SimConfig::from_scenario(&s)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut results = Vec::with_capacity(configs.len());
    for batch in configs.chunks(workers.max(1)) {
        for outcome in run_batch(batch) {
            results.push(outcome?);
        }
    }
    Ok(results)
}

fn run_batch(configs: &[SimConfig]) -> Vec<Result<SweepResult, SimError>> {
    thread::scope(|scope| {
        let handles: Vec<_> = configs
            .iter()
            .map(|config| {
                scope.spawn(move || -> Result<SweepResult, SimError> {
                    let output = Simulation::new(config.clone()).run()?;
                    Ok(SweepResult {
                        seed: config.seed(),
                        summary: output.summary,
                        ledger_head: output.ledger_head,
                    })
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}
