//! Statistical network latency for settlement messages.
//!
//! Latency is a recorded property of each trade, not a delay the engine
//! waits on: a whole round settles in one logical step.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::NetworkConfig;

use super::rng::DrawStream;

/// Network quality selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkMode {
    /// Ordinary cellular network: slower and noisier.
    Standard,
    /// High-speed 5G network: faster and steadier.
    HighSpeed,
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkMode::Standard => f.write_str("standard"),
            NetworkMode::HighSpeed => f.write_str("high-speed"),
        }
    }
}

impl FromStr for NetworkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(NetworkMode::Standard),
            "high-speed" | "high_speed" | "5g" => Ok(NetworkMode::HighSpeed),
            other => Err(format!(
                "unknown network mode \"{other}\" (expected \"standard\" or \"high-speed\")"
            )),
        }
    }
}

/// Mean and spread of one network mode (ms).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyProfile {
    pub mean_ms: f64,
    pub std_ms: f64,
}

/// Gaussian latency model with a hard floor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyModel {
    standard: LatencyProfile,
    high_speed: LatencyProfile,
    floor_ms: f64,
}

impl LatencyModel {
    pub fn new(cfg: &NetworkConfig) -> Self {
        Self {
            standard: LatencyProfile {
                mean_ms: cfg.standard_mean_ms,
                std_ms: cfg.standard_std_ms,
            },
            high_speed: LatencyProfile {
                mean_ms: cfg.high_speed_mean_ms,
                std_ms: cfg.high_speed_std_ms,
            },
            floor_ms: cfg.floor_ms,
        }
    }

    /// Distribution parameters for `mode`.
    pub fn profile(&self, mode: NetworkMode) -> LatencyProfile {
        match mode {
            NetworkMode::Standard => self.standard,
            NetworkMode::HighSpeed => self.high_speed,
        }
    }

    /// Draws one latency value (ms), never below the floor.
    pub fn sample_latency(&self, mode: NetworkMode, stream: &mut DrawStream) -> f64 {
        let p = self.profile(mode);
        (p.mean_ms + stream.gaussian(p.std_ms)).max(self.floor_ms)
    }
}
