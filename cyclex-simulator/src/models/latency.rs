//! ## cyclex-simulator::models::latency
//! **Constant execution-time models**
//!
//! A fixed latency shifts every subtask finish by the same amount, which
//! shifts every sample equally and leaves the measured jitter at zero.

use std::time::Duration;

/// Trait for latency models.
pub trait LatencyModel: Send {
    /// Returns `duration` plus the modelled latency.
    fn apply_latency(&self, duration: Duration) -> Duration;
}

/// Fixed latency model.
#[derive(Debug, Clone, Copy)]
pub struct FixedLatencyModel {
    latency: Duration,
}

impl FixedLatencyModel {
    pub fn new(latency_ns: u64) -> Self {
        Self {
            latency: Duration::from_nanos(latency_ns),
        }
    }
}

impl LatencyModel for FixedLatencyModel {
    fn apply_latency(&self, duration: Duration) -> Duration {
        duration + self.latency
    }
}

/// Subtasks complete in zero time.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLatencyModel;

impl LatencyModel for NoLatencyModel {
    fn apply_latency(&self, duration: Duration) -> Duration {
        duration
    }
}
