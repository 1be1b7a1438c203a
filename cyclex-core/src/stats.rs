//! ## cyclex-core::stats
//! **Running jitter statistics**
//!
//! Jitter is the absolute difference between the measured time since the
//! previous sample and the nominal cycle length. The collector keeps a running
//! mean, min and max of that error without storing samples.
//!
//! The mean uses the plain incremental form `(mean * n + e) / (n + 1)`. It is
//! exact enough for bounded runs; in unbounded daemon runs precision degrades
//! slowly as `n` grows.

use std::fmt;

use crate::time::{Timestamp, NSEC_PER_USEC};

/// Below any valid (non-negative) error, so the first sample always wins.
const UNSET_MAX_ERROR: f64 = -1.0;

#[derive(Debug, Clone)]
pub struct StatisticsCollector {
    expected_ns: f64,
    last_sample: Option<Timestamp>,
    samples: u64,
    current_error: f64,
    mean_error: f64,
    min_error: f64,
    max_error: f64,
    overruns: u64,
}

impl StatisticsCollector {
    /// Seeds the state for a cycle of `expected_cycle_ns`. `min` starts at the
    /// cycle length and can only decrease from there.
    pub fn new(expected_cycle_ns: u64) -> Self {
        let expected_ns = expected_cycle_ns as f64;
        Self {
            expected_ns,
            last_sample: None,
            samples: 0,
            current_error: 0.0,
            mean_error: 0.0,
            min_error: expected_ns,
            max_error: UNSET_MAX_ERROR,
            overruns: 0,
        }
    }

    /// Feeds the timestamp of the current cycle.
    ///
    /// The first call only establishes the reference point and returns `None`.
    /// Every later call returns the error it recorded.
    pub fn sample(&mut self, now: Timestamp) -> Option<f64> {
        let last = self.last_sample.replace(now)?;

        let delta = now.nanos_since(last) as f64;
        let error = (delta - self.expected_ns).abs();
        let n = self.samples as f64;

        self.current_error = error;
        self.mean_error = (self.mean_error * n + error) / (n + 1.0);
        self.samples += 1;

        if error < self.min_error {
            self.min_error = error;
        }
        if error > self.max_error {
            self.max_error = error;
        }

        Some(error)
    }

    pub fn record_overrun(&mut self) {
        self.overruns += 1;
    }

    #[inline]
    pub fn samples(&self) -> u64 {
        self.samples
    }

    #[inline]
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    #[inline]
    pub fn expected_ns(&self) -> f64 {
        self.expected_ns
    }

    #[inline]
    pub fn mean_error_ns(&self) -> f64 {
        self.mean_error
    }

    /// `None` until the first error has been recorded.
    pub fn min_error_ns(&self) -> Option<f64> {
        (self.samples > 0).then_some(self.min_error)
    }

    /// `None` until the first error has been recorded.
    pub fn max_error_ns(&self) -> Option<f64> {
        (self.max_error > UNSET_MAX_ERROR).then_some(self.max_error)
    }

    /// Snapshot of the current state. Does not modify the collector.
    pub fn report(&self) -> JitterSnapshot {
        JitterSnapshot {
            timestamp: self.last_sample,
            samples: self.samples,
            overruns: self.overruns,
            current_error_ns: self.current_error,
            mean_error_ns: self.mean_error,
            min_error_ns: self.min_error_ns().unwrap_or(0.0),
            max_error_ns: self.max_error_ns().unwrap_or(0.0),
        }
    }
}

/// Point-in-time view of the jitter statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JitterSnapshot {
    pub timestamp: Option<Timestamp>,
    pub samples: u64,
    pub overruns: u64,
    pub current_error_ns: f64,
    pub mean_error_ns: f64,
    pub min_error_ns: f64,
    pub max_error_ns: f64,
}

fn micros(ns: f64) -> f64 {
    ns / NSEC_PER_USEC as f64
}

impl fmt::Display for JitterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "# Statistics #")?;
        writeln!(f, "Current Error: {:05.2} us", micros(self.current_error_ns))?;
        writeln!(f, "Average Error: {:05.2} us", micros(self.mean_error_ns))?;
        writeln!(f, "Min Error: {:05.2} us", micros(self.min_error_ns))?;
        writeln!(f, "Max Error: {:05.2} us", micros(self.max_error_ns))
    }
}
