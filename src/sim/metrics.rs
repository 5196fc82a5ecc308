//! Per-round metrics and the post-hoc run summary.

use std::fmt;

use serde::Serialize;

/// What happened in one round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundMetrics {
    /// One-based round number.
    pub round: u32,
    /// Energy moved by settled trades (kWh).
    pub energy_transferred_kwh: f64,
    pub settled_count: usize,
    pub rejected_count: usize,
    /// Latency of every match in the round, settled or not (ms).
    pub latency_samples: Vec<f64>,
    pub mean_latency_ms: f64,
    pub p50_latency_ms: f64,
    pub p95_latency_ms: f64,
    /// Vehicles classified as sellers at the start of the round.
    pub sellers: usize,
    /// Vehicles classified as buyers at the start of the round.
    pub buyers: usize,
    pub unmatched_sellers: usize,
    pub unmatched_buyers: usize,
    /// Sum of `clearing price * quantity` over settled trades ($).
    pub traded_value: f64,
    /// Total fleet energy after the round (kWh).
    pub fleet_energy_kwh: f64,
}

impl RoundMetrics {
    /// Fills in the latency statistics from `latency_samples`.
    pub fn with_latency_stats(mut self) -> Self {
        self.mean_latency_ms = mean(&self.latency_samples);
        self.p50_latency_ms = percentile(&self.latency_samples, 50.0);
        self.p95_latency_ms = percentile(&self.latency_samples, 95.0);
        self
    }
}

impl fmt::Display for RoundMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "round {:>3} | sellers {:>2} buyers {:>2} unmatched {:>2}/{:<2} | \
             deals {:>2} rejected {:>2} | {:>7.3} kWh | latency mean {:>6.2} ms p95 {:>6.2} ms",
            self.round,
            self.sellers,
            self.buyers,
            self.unmatched_sellers,
            self.unmatched_buyers,
            self.settled_count,
            self.rejected_count,
            self.energy_transferred_kwh,
            self.mean_latency_ms,
            self.p95_latency_ms,
        )
    }
}

/// Arithmetic mean, or 0 for an empty slice.
pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Nearest-rank percentile (`pct` in `(0, 100]`), or 0 for an empty slice.
pub fn percentile(samples: &[f64], pct: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Aggregate indicators for a completed run.
///
/// Computed from the per-round metrics so the summary always agrees with
/// the energy table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub rounds: usize,
    /// Total energy shared between vehicles (kWh).
    pub total_energy_kwh: f64,
    pub settled_trades: usize,
    pub rejected_trades: usize,
    /// Mean over every latency sample in the run (ms).
    pub mean_latency_ms: f64,
    /// p95 over every latency sample in the run (ms).
    pub p95_latency_ms: f64,
    /// Total value traded ($).
    pub traded_value: f64,
    /// Volume-weighted mean clearing price ($/kWh).
    pub mean_price_per_kwh: f64,
    /// Round with the most energy moved, if any energy moved at all.
    pub busiest_round: Option<u32>,
}

impl RunSummary {
    /// Computes the summary from every round of a run.
    pub fn from_rounds(rounds: &[RoundMetrics]) -> Self {
        let mut total_energy = 0.0;
        let mut traded_value = 0.0;
        let mut settled = 0;
        let mut rejected = 0;
        let mut all_latency = Vec::new();
        let mut busiest: Option<(u32, f64)> = None;

        for r in rounds {
            total_energy += r.energy_transferred_kwh;
            traded_value += r.traded_value;
            settled += r.settled_count;
            rejected += r.rejected_count;
            all_latency.extend_from_slice(&r.latency_samples);
            if r.energy_transferred_kwh > busiest.map_or(0.0, |(_, e)| e) {
                busiest = Some((r.round, r.energy_transferred_kwh));
            }
        }

        let mean_price = if total_energy > 0.0 {
            traded_value / total_energy
        } else {
            0.0
        };

        Self {
            rounds: rounds.len(),
            total_energy_kwh: total_energy,
            settled_trades: settled,
            rejected_trades: rejected,
            mean_latency_ms: mean(&all_latency),
            p95_latency_ms: percentile(&all_latency, 95.0),
            traded_value,
            mean_price_per_kwh: mean_price,
            busiest_round: busiest.map(|(round, _)| round),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Market Summary ---")?;
        writeln!(f, "Rounds:                {}", self.rounds)?;
        writeln!(f, "Total energy shared:   {:.3} kWh", self.total_energy_kwh)?;
        writeln!(f, "Successful deals:      {}", self.settled_trades)?;
        writeln!(f, "Rejected deals:        {}", self.rejected_trades)?;
        writeln!(f, "Average latency:       {:.2} ms", self.mean_latency_ms)?;
        writeln!(f, "p95 latency:           {:.2} ms", self.p95_latency_ms)?;
        writeln!(
            f,
            "Traded value:          ${:.4} (avg {:.4} $/kWh)",
            self.traded_value, self.mean_price_per_kwh
        )?;
        match self.busiest_round {
            Some(r) => write!(f, "Busiest round:         {r}"),
            None => write!(f, "Busiest round:         -"),
        }
    }
}
