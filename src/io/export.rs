//! CSV export for simulation output tables.
//!
//! Floats are written with fixed precision so identical runs produce
//! byte-identical files.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::sim::ledger::LedgerEntry;
use crate::sim::types::{EnergyRow, SimulationOutput, TradeAttempt, VehicleSummary};

/// Energy table columns.
pub const ENERGY_HEADER: &str = "round,energy_kwh,successful_matches,rejected_matches,\
                                mean_latency_ms,sellers,buyers,unmatched_sellers,\
                                unmatched_buyers";

/// Trade log columns.
pub const LOGS_HEADER: &str = "round,seller_id,buyer_id,quantity_kwh,ask_price,\
                               price_per_kwh,bid_price,latency_ms,distance_m,alignment,\
                               outcome";

/// Vehicle summary columns.
pub const FLEET_HEADER: &str = "vehicle_id,capacity_kwh,final_level_kwh,final_soc_pct,\
                                energy_sold_kwh,energy_bought_kwh,trades,\
                                final_position_m,final_speed_kmh";

/// Ledger columns.
pub const LEDGER_HEADER: &str = "sequence,round,seller_id,buyer_id,quantity_kwh,\
                                 price_per_kwh,total_cost,latency_ms,distance_m,alignment,\
                                 prev_tag,tag";

/// File names written by [`export_all`].
pub const ENERGY_FILE: &str = "v2v_energy.csv";
pub const LOGS_FILE: &str = "v2v_logs.csv";
pub const FLEET_FILE: &str = "v2v_fleet.csv";
pub const LEDGER_FILE: &str = "v2v_ledger.csv";

fn header(h: &str) -> impl Iterator<Item = &str> {
    h.split(',').map(str::trim)
}

/// Writes the per-round energy table.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_energy_csv(rows: &[EnergyRow], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(header(ENERGY_HEADER))?;
    for r in rows {
        wtr.write_record(&[
            r.round.to_string(),
            format!("{:.6}", r.energy_kwh),
            r.successful_matches.to_string(),
            r.rejected_matches.to_string(),
            format!("{:.3}", r.mean_latency_ms),
            r.sellers.to_string(),
            r.buyers.to_string(),
            r.unmatched_sellers.to_string(),
            r.unmatched_buyers.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes every trade attempt with its outcome.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_logs_csv(rows: &[TradeAttempt], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(header(LOGS_HEADER))?;
    for r in rows {
        wtr.write_record(&[
            r.round.to_string(),
            r.seller_id.to_string(),
            r.buyer_id.to_string(),
            format!("{:.6}", r.quantity_kwh),
            format!("{:.6}", r.ask_price),
            format!("{:.6}", r.price_per_kwh),
            format!("{:.6}", r.bid_price),
            format!("{:.3}", r.latency_ms),
            format!("{:.3}", r.distance_m),
            format!("{:.4}", r.alignment),
            r.outcome.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the final per-vehicle summary.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_fleet_csv(rows: &[VehicleSummary], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(header(FLEET_HEADER))?;
    for v in rows {
        wtr.write_record(&[
            v.id.to_string(),
            format!("{:.1}", v.capacity_kwh),
            format!("{:.6}", v.final_level_kwh),
            format!("{:.2}", v.final_soc_pct),
            format!("{:.6}", v.energy_sold_kwh),
            format!("{:.6}", v.energy_bought_kwh),
            v.trades.to_string(),
            format!("{:.3}", v.final_position_m),
            format!("{:.2}", v.final_speed_kmh),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the ledger, one row per entry, tags included.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_ledger_csv(entries: &[LedgerEntry], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(header(LEDGER_HEADER))?;
    for e in entries {
        wtr.write_record(&[
            e.sequence.to_string(),
            e.round.to_string(),
            e.seller_id.to_string(),
            e.buyer_id.to_string(),
            format!("{:.6}", e.quantity_kwh),
            format!("{:.6}", e.price_per_kwh),
            format!("{:.6}", e.total_cost),
            format!("{:.3}", e.latency_ms),
            format!("{:.3}", e.distance_m),
            format!("{:.4}", e.alignment),
            e.prev_tag.clone(),
            e.tag.clone(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn to_file(
    dir: &Path,
    name: &str,
    write: impl FnOnce(io::BufWriter<File>) -> io::Result<()>,
) -> io::Result<PathBuf> {
    let path = dir.join(name);
    let file = File::create(&path)?;
    write(io::BufWriter::new(file))?;
    Ok(path)
}

/// Writes all four tables into `dir`, creating it if needed.
///
/// Returns the written paths in the order energy, logs, fleet, ledger.
///
/// # Errors
///
/// Returns an `io::Error` if the directory or any file cannot be written.
pub fn export_all(output: &SimulationOutput, dir: &Path) -> io::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    Ok(vec![
        to_file(dir, ENERGY_FILE, |w| write_energy_csv(&output.energy, w))?,
        to_file(dir, LOGS_FILE, |w| write_logs_csv(&output.logs, w))?,
        to_file(dir, FLEET_FILE, |w| write_fleet_csv(&output.vehicles, w))?,
        to_file(dir, LEDGER_FILE, |w| write_ledger_csv(&output.ledger, w))?,
    ])
}
