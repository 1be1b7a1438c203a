//! Chaos module.
//!
//! Fault injection for simulation: with a fixed probability a subtask runs
//! past the end of its slot, which the scheduler must detect as an overrun
//! without letting later deadlines drift.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::SimulationError;

/// Decides, per subtask invocation, whether to force an overrun.
#[derive(Debug)]
pub struct OverrunInjector {
    probability: f64,
    overshoot_ns: u64,
    rng: SmallRng,
}

impl OverrunInjector {
    pub fn new(probability: f64, overshoot_ns: u64, seed: u64) -> Result<Self, SimulationError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(SimulationError::InvalidProbability(probability));
        }
        Ok(Self {
            probability,
            overshoot_ns,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    pub fn disabled() -> Self {
        Self {
            probability: 0.0,
            overshoot_ns: 0,
            rng: SmallRng::seed_from_u64(0),
        }
    }

    /// Returns how far past its slot the next invocation runs, if at all.
    pub fn overrun(&mut self) -> Option<u64> {
        if self.probability <= 0.0 {
            return None;
        }
        self.rng
            .random_bool(self.probability)
            .then_some(self.overshoot_ns)
    }
}
