//! ## cyclex-core::timestamps
//! **Preallocated per-cycle timestamp log**
//!
//! Sized once before the loop starts so recording never allocates on the
//! scheduler thread.

use crate::error::SchedulerError;
use crate::time::Timestamp;

#[derive(Debug)]
pub struct TimestampLog {
    entries: Vec<Timestamp>,
    limit: usize,
}

impl TimestampLog {
    /// Reserves room for exactly `cycles` timestamps.
    pub fn with_capacity(cycles: u64) -> Result<Self, SchedulerError> {
        let capacity = usize::try_from(cycles).map_err(|_| SchedulerError::Allocation {
            cycles,
            source: None,
        })?;

        let mut entries = Vec::new();
        entries
            .try_reserve_exact(capacity)
            .map_err(|err| SchedulerError::Allocation {
                cycles,
                source: Some(err),
            })?;

        Ok(Self {
            entries,
            limit: capacity,
        })
    }

    /// Appends a timestamp. Returns `false` and drops it once the log is full.
    #[inline]
    pub fn record(&mut self, timestamp: Timestamp) -> bool {
        if self.entries.len() == self.limit {
            return false;
        }
        self.entries.push(timestamp);
        true
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.limit
    }

    pub fn as_slice(&self) -> &[Timestamp] {
        &self.entries
    }

    pub fn into_vec(self) -> Vec<Timestamp> {
        self.entries
    }
}
