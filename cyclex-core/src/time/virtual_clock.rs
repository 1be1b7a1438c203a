//! Virtual clock for deterministic runs.
//!
//! Time only moves when someone advances it. Sleeping jumps straight to the
//! deadline, so a bounded run of thousands of cycles completes instantly while
//! exercising exactly the same deadline arithmetic as the OS clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::{Clock, Timestamp};
use crate::error::ClockError;

/// A shared nanosecond counter. Clones observe and advance the same time.
#[derive(Debug, Clone)]
pub struct VirtualClock {
    offset: Arc<AtomicU64>,
}

impl VirtualClock {
    /// Creates a clock starting at `seed` nanoseconds.
    pub fn new(seed: u64) -> Self {
        Self {
            offset: Arc::new(AtomicU64::new(seed)),
        }
    }

    #[inline]
    pub fn now_ns(&self) -> u64 {
        self.offset.load(Ordering::Acquire)
    }

    /// Advances the clock by `ns`, e.g. to model subtask execution time.
    #[inline]
    pub fn advance(&self, ns: u64) {
        self.offset.fetch_add(ns, Ordering::AcqRel);
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Result<Timestamp, ClockError> {
        Ok(Timestamp::from_nanos(self.now_ns()))
    }

    fn sleep_until(&self, deadline: Timestamp) -> Result<(), ClockError> {
        let target = u64::try_from(deadline.as_nanos()).unwrap_or(0);
        self.offset.fetch_max(target, Ordering::AcqRel);
        Ok(())
    }
}
