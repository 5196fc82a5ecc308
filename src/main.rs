//! Simulator entry point: CLI wiring and config-driven runs.

mod cli;

use std::path::Path;
use std::process;

use v2v_market_sim::config::ScenarioConfig;
use v2v_market_sim::error::SimError;
use v2v_market_sim::io::export::export_all;
use v2v_market_sim::sim::engine::Simulation;
use v2v_market_sim::sim::sweep::run_sweep;
use v2v_market_sim::sim::types::SimConfig;
use v2v_market_sim::telemetry;

fn exit_with(err: SimError) -> ! {
    match err {
        SimError::Config(errors) => {
            for e in &errors {
                eprintln!("{e}");
            }
        }
        other => eprintln!("error: {other}"),
    }
    process::exit(1);
}

fn load_scenario(opts: &cli::CliOptions) -> ScenarioConfig {
    // --scenario takes priority, then --preset, then baseline default
    let loaded = if let Some(ref path) = opts.scenario {
        ScenarioConfig::from_toml_file(Path::new(path))
    } else if let Some(ref name) = opts.preset {
        ScenarioConfig::from_preset(name)
    } else {
        Ok(ScenarioConfig::baseline())
    };
    let mut scenario = loaded.unwrap_or_else(|e| exit_with(e.into()));

    if let Some(seed) = opts.seed {
        scenario.simulation.seed = seed;
    }
    if let Some(vehicles) = opts.vehicles {
        scenario.simulation.vehicles = vehicles;
    }
    if let Some(rounds) = opts.rounds {
        scenario.simulation.rounds = rounds;
    }
    if let Some(network) = opts.network {
        scenario.simulation.network = network;
    }
    scenario
}

fn main() {
    let opts = cli::parse_args().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        cli::print_usage();
        process::exit(1);
    });
    if opts.help {
        cli::print_usage();
        return;
    }

    telemetry::init(opts.verbose);
    let scenario = load_scenario(&opts);

    if let Some(ref seeds) = opts.sweep {
        let results = run_sweep(&scenario, seeds).unwrap_or_else(|e| exit_with(e));
        println!(
            "{:>6} {:>12} {:>6} {:>9} {:>12}  ledger head",
            "seed", "energy_kwh", "deals", "rejected", "latency_ms"
        );
        for r in &results {
            println!(
                "{:>6} {:>12.3} {:>6} {:>9} {:>12.2}  {}",
                r.seed,
                r.summary.total_energy_kwh,
                r.summary.settled_trades,
                r.summary.rejected_trades,
                r.summary.mean_latency_ms,
                &r.ledger_head[..16],
            );
        }
        return;
    }

    let config = SimConfig::from_scenario(&scenario).unwrap_or_else(|e| exit_with(e));
    let output = Simulation::new(config)
        .run()
        .unwrap_or_else(|e| exit_with(e));

    for r in &output.rounds {
        println!("{r}");
    }
    println!("\n{}", output.summary);
    println!("Ledger: {} entries, head {}", output.ledger.len(), output.ledger_head);

    if let Some(ref dir) = opts.export_dir {
        match export_all(&output, dir) {
            Ok(paths) => {
                for p in paths {
                    eprintln!("Wrote {}", p.display());
                }
            }
            Err(e) => {
                eprintln!("error: failed to write CSV: {e}");
                process::exit(1);
            }
        }
    }

    #[cfg(feature = "api")]
    if opts.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let state = Arc::new(v2v_market_sim::api::AppState::new(output));
        let addr = SocketAddr::from(([0, 0, 0, 0], opts.port.unwrap_or(3000)));
        let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
        if let Err(e) = rt.block_on(v2v_market_sim::api::serve(state, addr)) {
            eprintln!("error: API server failed on {addr}: {e}");
            process::exit(1);
        }
    }
}
