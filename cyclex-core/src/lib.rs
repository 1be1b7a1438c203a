//! # cyclex-core
//!
//! A cyclic executive: a fixed table of short subtasks repeated every period,
//! paced by absolute-deadline sleeps so that variable execution time never
//! turns into drift, plus running jitter statistics that show how closely the
//! loop tracks its nominal period.
//!
//! ### Key Submodules:
//! - `time`: `Timestamp`, the `Clock` trait (OS monotonic and virtual), `TimeKeeper`
//! - `schedule`: `Subtask` and the validated `CycleSpec`
//! - `stats`: `StatisticsCollector` and `JitterSnapshot`
//! - `scheduler`: `CyclicScheduler`, run modes and the overrun policy
//! - `report`: `RunReport` and the console/file sinks
//!
//! Real-time process setup (memory locking, CPU pinning, priorities) lives in
//! `cyclex-rt` and must happen before a scheduler is started.

pub mod error;
pub mod report;
pub mod schedule;
pub mod scheduler;
pub mod stats;
pub mod time;
pub mod timestamps;

pub mod prelude {
    pub use crate::error::*;
    pub use crate::report::{publish, FileSink, ReportSink, RunReport, WriterSink};
    pub use crate::schedule::{CycleSpec, Subtask, SubtaskEntry};
    pub use crate::scheduler::{CyclicScheduler, OverrunPolicy, RunMode, SchedulerState};
    pub use crate::stats::{JitterSnapshot, StatisticsCollector};
    pub use crate::time::{Clock, MonotonicClock, TimeKeeper, Timestamp, VirtualClock};
    pub use crate::timestamps::TimestampLog;
}

pub use error::{ClockError, ReportError, ScheduleError, SchedulerError};
