//! OS monotonic clock.
//!
//! On Linux this is `CLOCK_MONOTONIC` with `clock_nanosleep(TIMER_ABSTIME)`.
//! Other targets fall back to `std::time::Instant` and a relative sleep, which
//! is good enough for development but not for jitter measurements.

use super::{Clock, Timestamp};
use crate::error::ClockError;

#[cfg(target_os = "linux")]
mod imp {
    use nix::errno::Errno;
    use nix::sys::time::TimeSpec;
    use nix::time::{clock_gettime, clock_nanosleep, ClockId, ClockNanosleepFlags};

    use super::{Clock, ClockError, Timestamp};

    #[derive(Debug, Clone, Copy, Default)]
    pub struct MonotonicClock;

    impl MonotonicClock {
        pub fn new() -> Self {
            Self
        }
    }

    impl Clock for MonotonicClock {
        fn now(&self) -> Result<Timestamp, ClockError> {
            let ts = clock_gettime(ClockId::CLOCK_MONOTONIC)
                .map_err(|errno| ClockError::Read(errno.into()))?;
            Ok(Timestamp::new(ts.tv_sec() as i64, ts.tv_nsec() as i64))
        }

        fn sleep_until(&self, deadline: Timestamp) -> Result<(), ClockError> {
            let target = TimeSpec::new(deadline.secs() as _, deadline.subsec_nanos() as _);
            loop {
                match clock_nanosleep(
                    ClockId::CLOCK_MONOTONIC,
                    ClockNanosleepFlags::TIMER_ABSTIME,
                    &target,
                ) {
                    Ok(_) => return Ok(()),
                    // Absolute target, so a signal just means wait again.
                    Err(Errno::EINTR) => continue,
                    Err(errno) => return Err(ClockError::Sleep(errno.into())),
                }
            }
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod imp {
    use std::time::{Duration, Instant};

    use super::{Clock, ClockError, Timestamp};

    #[derive(Debug, Clone, Copy)]
    pub struct MonotonicClock {
        origin: Instant,
    }

    impl MonotonicClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
            }
        }
    }

    impl Default for MonotonicClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for MonotonicClock {
        fn now(&self) -> Result<Timestamp, ClockError> {
            let elapsed = self.origin.elapsed();
            Ok(Timestamp::new(
                elapsed.as_secs() as i64,
                elapsed.subsec_nanos() as i64,
            ))
        }

        fn sleep_until(&self, deadline: Timestamp) -> Result<(), ClockError> {
            let remaining = deadline.nanos_since(self.now()?);
            if remaining > 0 {
                std::thread::sleep(Duration::from_nanos(remaining as u64));
            }
            Ok(())
        }
    }
}

pub use imp::MonotonicClock;
