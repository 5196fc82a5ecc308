//! Deterministic random streams.
//!
//! Every round draws from its own `StdRng` seeded from the master seed and
//! the round number, so a round's draws never depend on how many numbers
//! earlier rounds consumed. Round 0 is reserved for spawning the fleet.
//! Within a round the engine consumes the stream in a fixed order:
//! mobility noise, then price jitter, then latency samples.

use rand::{Rng, SeedableRng, rngs::StdRng};

/// Stream index used to spawn the fleet before round 1.
pub const SPAWN_ROUND: u32 = 0;

/// Random stream for one round, with a running draw counter.
#[derive(Debug, Clone)]
pub struct DrawStream {
    rng: StdRng,
    round: u32,
    draws: u64,
}

impl DrawStream {
    /// Creates the stream for `round` of a run seeded with `seed`.
    pub fn for_round(seed: u64, round: u32) -> Self {
        Self {
            rng: StdRng::seed_from_u64(round_seed(seed, round)),
            round,
            draws: 0,
        }
    }

    /// Round this stream belongs to.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Number of draws consumed so far.
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Uniform draw in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.draws += 1;
        self.rng.random::<f64>()
    }

    /// Uniform draw in `[low, high)`; returns `low` for an empty range.
    pub fn uniform_range(&mut self, low: f64, high: f64) -> f64 {
        let u = self.uniform();
        if high <= low {
            return low;
        }
        low + (high - low) * u
    }

    /// Picks one element uniformly. Returns `None` for an empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        self.draws += 1;
        let idx = self.rng.random_range(0..items.len());
        items.get(idx)
    }

    /// Gaussian noise with mean 0 using the Box-Muller transform.
    ///
    /// A non-positive `std_dev` returns 0 without consuming the stream.
    pub fn gaussian(&mut self, std_dev: f64) -> f64 {
        if std_dev <= 0.0 {
            return 0.0;
        }

        let u1 = self.uniform().clamp(1e-12, 1.0);
        let u2 = self.uniform();
        let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        z0 * std_dev
    }
}

/// Derives the seed of one round's stream.
pub fn round_seed(seed: u64, round: u32) -> u64 {
    splitmix64(seed ^ splitmix64(u64::from(round).wrapping_add(0x9E37_79B9_7F4A_7C15)))
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
