//! ## cyclex-simulator::models::jitter
//! **Seeded execution-time variation**

use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Trait for jitter models.
pub trait JitterModel: Send {
    /// Applies jitter to a given duration, returning the jittered duration.
    fn apply_jitter(&mut self, duration: Duration) -> Duration;
}

/// Uniform jitter in `[0, magnitude]`, reproducible from its seed.
#[derive(Debug)]
pub struct RandomJitterModel {
    magnitude_ns: u64,
    rng: SmallRng,
}

impl RandomJitterModel {
    pub fn new(magnitude_ns: u64, seed: u64) -> Self {
        Self {
            magnitude_ns,
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl JitterModel for RandomJitterModel {
    fn apply_jitter(&mut self, duration: Duration) -> Duration {
        let jitter_ns = self.rng.random_range(0..=self.magnitude_ns);
        duration + Duration::from_nanos(jitter_ns)
    }
}

/// No-op jitter model.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitterModel;

impl JitterModel for NoJitterModel {
    fn apply_jitter(&mut self, duration: Duration) -> Duration {
        duration
    }
}
