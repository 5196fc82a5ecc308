use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use v2v_market_sim::sim::latency::NetworkMode;

/// Parsed command line.
#[derive(Debug, Default)]
pub struct CliOptions {
    pub scenario: Option<PathBuf>,
    pub preset: Option<String>,
    pub seed: Option<u64>,
    pub vehicles: Option<usize>,
    pub rounds: Option<u32>,
    pub network: Option<NetworkMode>,
    pub export_dir: Option<PathBuf>,
    pub sweep: Option<Vec<u64>>,
    pub verbose: bool,
    pub help: bool,
    #[cfg(feature = "api")]
    pub serve: bool,
    #[cfg(feature = "api")]
    pub port: Option<u16>,
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(args)
}

pub fn parse_args_from(args: Vec<String>) -> Result<CliOptions, String> {
    let mut opts = CliOptions::default();
    let mut i = 0usize;

    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => opts.help = true,
            "--verbose" | "-v" => opts.verbose = true,
            "--scenario" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --scenario (expected a TOML file path)",
                )?;
                if opts.scenario.replace(PathBuf::from(path)).is_some() {
                    return Err("--scenario provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name = args.next_or_err(
                    i,
                    "missing value for --preset (expected a preset name)",
                )?;
                if opts.preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--seed" => {
                i += 1;
                opts.seed = Some(parse_number(&args, i, "--seed")?);
            }
            "--vehicles" => {
                i += 1;
                opts.vehicles = Some(parse_number(&args, i, "--vehicles")?);
            }
            "--rounds" => {
                i += 1;
                opts.rounds = Some(parse_number(&args, i, "--rounds")?);
            }
            "--network" => {
                i += 1;
                let mode = args.next_or_err(
                    i,
                    "missing value for --network (expected standard or high-speed)",
                )?;
                opts.network = Some(mode.parse()?);
            }
            "--export-dir" => {
                i += 1;
                let dir = args.next_or_err(
                    i,
                    "missing value for --export-dir (expected a directory)",
                )?;
                opts.export_dir = Some(PathBuf::from(dir));
            }
            "--sweep" => {
                i += 1;
                let list = args.next_or_err(
                    i,
                    "missing value for --sweep (expected seeds like 1,2,3)",
                )?;
                opts.sweep = Some(parse_seed_list(list)?);
            }
            #[cfg(feature = "api")]
            "--serve" => opts.serve = true,
            #[cfg(feature = "api")]
            "--port" => {
                i += 1;
                opts.port = Some(parse_number(&args, i, "--port")?);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if opts.scenario.is_some() && opts.preset.is_some() {
        return Err(
            "arguments `--scenario` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
        );
    }

    Ok(opts)
}

fn parse_number<T: FromStr>(args: &[String], i: usize, flag: &str) -> Result<T, String> {
    let raw = args.next_or_err(i, &format!("missing value for {flag}"))?;
    raw.parse()
        .map_err(|_| format!("{flag} value \"{raw}\" is not a valid number"))
}

fn parse_seed_list(list: &str) -> Result<Vec<u64>, String> {
    let seeds = list
        .split(',')
        .map(|s| {
            s.trim()
                .parse::<u64>()
                .map_err(|_| format!("--sweep seed \"{s}\" is not a valid u64"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if seeds.is_empty() {
        return Err("--sweep needs at least one seed".to_string());
    }
    Ok(seeds)
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("v2v-market-sim: vehicle-to-vehicle wireless energy market simulator");
    eprintln!();
    eprintln!("Usage: v2v-market-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!("  --preset <name>          Use a built-in preset (baseline, rush_hour, smoke)");
    eprintln!("  --seed <0-99999>         Override random seed");
    eprintln!("  --vehicles <6-40>        Override fleet size");
    eprintln!("  --rounds <5-200>         Override number of rounds");
    eprintln!("  --network <mode>         standard or high-speed");
    eprintln!("  --export-dir <dir>       Write the four CSV tables into <dir>");
    eprintln!("  --sweep <s1,s2,...>      Run one simulation per seed and compare");
    eprintln!("  --verbose, -v            Log every round");
    #[cfg(feature = "api")]
    {
        eprintln!("  --serve                  Serve the completed run over HTTP");
        eprintln!("  --port <u16>             API server port (default: 3000)");
    }
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
}
