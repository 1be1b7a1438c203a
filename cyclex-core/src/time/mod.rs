//! ## cyclex-core::time
//! **Monotonic timestamps, clocks and the absolute-deadline time keeper**
//!
//! The scheduler never touches the OS clock directly. Everything goes through
//! the [`Clock`] trait so the same loop runs against [`MonotonicClock`] in
//! production and [`VirtualClock`] in tests and simulation.

mod monotonic;
mod virtual_clock;

use std::fmt;

pub use monotonic::MonotonicClock;
pub use virtual_clock::VirtualClock;

use crate::error::ClockError;

pub const NSEC_PER_SEC: i64 = 1_000_000_000;
pub const NSEC_PER_USEC: u64 = 1_000;
pub const NSEC_PER_MSEC: u64 = 1_000_000;

/// A point on the monotonic timeline.
///
/// Always normalized: `nanos` lies in `[0, NSEC_PER_SEC)`. Because of that the
/// derived ordering on `(secs, nanos)` is the chronological ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    secs: i64,
    nanos: i64,
}

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp { secs: 0, nanos: 0 };

    /// Builds a timestamp, carrying any nanosecond overflow (or underflow)
    /// into the seconds field.
    pub fn new(secs: i64, nanos: i64) -> Self {
        Self {
            secs: secs + nanos.div_euclid(NSEC_PER_SEC),
            nanos: nanos.rem_euclid(NSEC_PER_SEC),
        }
    }

    pub fn from_nanos(total: u64) -> Self {
        Self::new(
            (total / NSEC_PER_SEC as u64) as i64,
            (total % NSEC_PER_SEC as u64) as i64,
        )
    }

    #[inline]
    pub fn secs(&self) -> i64 {
        self.secs
    }

    #[inline]
    pub fn subsec_nanos(&self) -> i64 {
        self.nanos
    }

    /// Total nanoseconds since the clock origin.
    #[inline]
    pub fn as_nanos(&self) -> i128 {
        self.secs as i128 * NSEC_PER_SEC as i128 + self.nanos as i128
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.secs as f64 + self.nanos as f64 / NSEC_PER_SEC as f64
    }

    /// Adds `interval_ns`, normalizing nanosecond overflow into seconds.
    #[must_use]
    pub fn add_nanos(self, interval_ns: u64) -> Self {
        let carry = (interval_ns / NSEC_PER_SEC as u64) as i64;
        let rest = (interval_ns % NSEC_PER_SEC as u64) as i64;
        Self::new(self.secs + carry, self.nanos + rest)
    }

    /// Signed distance from `earlier` to `self` in nanoseconds.
    #[inline]
    pub fn nanos_since(&self, earlier: Timestamp) -> i128 {
        self.as_nanos() - earlier.as_nanos()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.secs, self.nanos)
    }
}

/// Narrow clock capability used by the time keeper.
pub trait Clock: Send {
    /// Current monotonic time.
    fn now(&self) -> Result<Timestamp, ClockError>;

    /// Blocks until `deadline` is reached. Returns immediately when the
    /// deadline already lies in the past.
    fn sleep_until(&self, deadline: Timestamp) -> Result<(), ClockError>;
}

impl<C: Clock + Sync> Clock for std::sync::Arc<C> {
    fn now(&self) -> Result<Timestamp, ClockError> {
        (**self).now()
    }

    fn sleep_until(&self, deadline: Timestamp) -> Result<(), ClockError> {
        (**self).sleep_until(deadline)
    }
}

/// Owns the absolute deadline of the running loop.
///
/// The deadline is advanced *before* the slot's work runs, so it always names
/// the next wake-up instant no matter how long the work takes. Sleeping targets
/// that absolute instant, so execution-time variance never accumulates.
pub struct TimeKeeper<C> {
    clock: C,
    deadline: Timestamp,
}

impl<C: Clock> TimeKeeper<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            deadline: Timestamp::ZERO,
        }
    }

    /// Reads the clock and makes the current instant the baseline deadline.
    pub fn initialize(&mut self) -> Result<Timestamp, ClockError> {
        self.deadline = self.clock.now()?;
        Ok(self.deadline)
    }

    /// Moves the deadline `interval_ns` forward and returns it.
    #[inline]
    pub fn advance(&mut self, interval_ns: u64) -> Timestamp {
        self.deadline = self.deadline.add_nanos(interval_ns);
        self.deadline
    }

    #[inline]
    pub fn deadline(&self) -> Timestamp {
        self.deadline
    }

    #[inline]
    pub fn now(&self) -> Result<Timestamp, ClockError> {
        self.clock.now()
    }

    /// Absolute wait on the current deadline.
    #[inline]
    pub fn sleep_until_deadline(&self) -> Result<(), ClockError> {
        self.clock.sleep_until(self.deadline)
    }

    /// How far the clock is past the deadline, if it is.
    pub fn lateness(&self) -> Result<Option<u64>, ClockError> {
        let late = self.clock.now()?.nanos_since(self.deadline);
        Ok((late > 0).then(|| u64::try_from(late).unwrap_or(u64::MAX)))
    }

    pub fn is_overrun(&self) -> Result<bool, ClockError> {
        Ok(self.lateness()?.is_some())
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
