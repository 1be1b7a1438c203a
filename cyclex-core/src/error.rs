use std::collections::TryReserveError;
use std::io;

use thiserror::Error;

/// Failures of the underlying clock primitives.
#[derive(Debug, Error)]
pub enum ClockError {
    #[error("failed to read monotonic clock: {0}")]
    Read(#[source] io::Error),

    #[error("absolute sleep failed: {0}")]
    Sleep(#[source] io::Error),
}

/// Invalid cycle tables. Always detected before the loop starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("cycle length must be greater than zero")]
    ZeroCycle,

    #[error("subtask '{name}' has a zero interval")]
    ZeroInterval { name: String },

    #[error("subtask intervals total {total_ns} ns, exceeding the {cycle_ns} ns cycle")]
    IntervalsExceedCycle { total_ns: u128, cycle_ns: u64 },

    #[error("subtask intervals total {total_ns} ns, but the cycle is {cycle_ns} ns")]
    IntervalMismatch { total_ns: u128, cycle_ns: u64 },

    #[error("cycle table has no entries")]
    EmptyTable,
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler has already been started")]
    AlreadyStarted,

    #[error("failed to allocate timestamp log for {cycles} cycles")]
    Allocation {
        cycles: u64,
        #[source]
        source: Option<TryReserveError>,
    },

    #[error("subtask '{subtask}' overran its deadline by {late_ns} ns in cycle {cycle}")]
    Overrun {
        subtask: String,
        late_ns: u64,
        cycle: u64,
    },

    #[error(transparent)]
    Clock(#[from] ClockError),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report to {target}: {source}")]
    Write {
        target: String,
        #[source]
        source: io::Error,
    },
}
