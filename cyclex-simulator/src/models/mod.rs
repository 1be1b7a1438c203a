//! Execution-time models for simulated subtasks.

pub mod jitter;
pub mod latency;

use std::time::Duration;

use jitter::{JitterModel, NoJitterModel, RandomJitterModel};
use latency::{FixedLatencyModel, LatencyModel, NoLatencyModel};

use crate::chaos::OverrunInjector;

/// How long one subtask invocation takes on the virtual clock.
///
/// Shared by every simulated subtask in a table, so the random streams are
/// consumed in slot order and a seed fully determines a run.
pub struct ExecutionModel {
    latency: Box<dyn LatencyModel>,
    jitter: Box<dyn JitterModel>,
    chaos: OverrunInjector,
}

impl ExecutionModel {
    pub fn new(latency_ns: u64, jitter_ns: u64, chaos: OverrunInjector, seed: u64) -> Self {
        let latency: Box<dyn LatencyModel> = if latency_ns == 0 {
            Box::new(NoLatencyModel)
        } else {
            Box::new(FixedLatencyModel::new(latency_ns))
        };
        let jitter: Box<dyn JitterModel> = if jitter_ns == 0 {
            Box::new(NoJitterModel)
        } else {
            Box::new(RandomJitterModel::new(jitter_ns, seed))
        };
        Self {
            latency,
            jitter,
            chaos,
        }
    }

    /// Virtual nanoseconds consumed by a subtask occupying `interval_ns` that
    /// busy-waits for `busy_ns`.
    pub fn execution_ns(&mut self, interval_ns: u64, busy_ns: u64) -> u64 {
        if let Some(overshoot) = self.chaos.overrun() {
            return interval_ns.saturating_add(overshoot);
        }
        let base = Duration::from_nanos(busy_ns);
        let total = self.jitter.apply_jitter(self.latency.apply_latency(base));
        u64::try_from(total.as_nanos()).unwrap_or(u64::MAX)
    }
}
