//! Simulation-specific configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Virtual-clock run parameters.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SimulatorConfig {
    /// Seed for the latency and overrun generators.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Fixed latency added to every subtask, in microseconds.
    #[validate(range(max = 10_000_000))]
    #[serde(default)]
    pub latency_us: u64,

    /// Upper bound of the random jitter added on top of `latency_us`.
    #[validate(range(max = 10_000_000))]
    #[serde(default)]
    pub jitter_us: u64,

    /// Probability that a subtask overruns its whole interval.
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default)]
    pub overrun_probability: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            latency_us: 0,
            jitter_us: 0,
            overrun_probability: 0.0,
        }
    }
}

fn default_seed() -> u64 {
    42
}
