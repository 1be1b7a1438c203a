//! Cycle table configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation::{validate_overrun_policy, validate_subtask_kind, validate_subtask_name};

const NSEC_PER_USEC: u64 = 1_000;
const NSEC_PER_MSEC: u64 = 1_000_000;

/// Cycle length, run length and the ordered subtask table.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScheduleConfig {
    /// Cycle period in milliseconds.
    #[validate(range(min = 1, max = 60_000))]
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    /// Number of cycles to execute; absent means run until stopped.
    #[serde(default)]
    pub cycles: Option<u64>,

    /// Ordered subtask slots. The scheduler appends a filler slot covering
    /// whatever part of the period the table leaves unassigned.
    #[validate(nested)]
    #[serde(default)]
    pub subtasks: Vec<SubtaskConfig>,

    /// What to do when a subtask finishes after its deadline.
    #[validate(custom(function = validate_overrun_policy))]
    #[serde(default = "default_overrun")]
    pub overrun: String,

    /// Emit a jitter snapshot log line every N cycles.
    #[validate(range(min = 1))]
    #[serde(default)]
    pub snapshot_every: Option<u64>,
}

impl ScheduleConfig {
    /// Cycle period in nanoseconds.
    pub fn period_ns(&self) -> u64 {
        self.period_ms.saturating_mul(NSEC_PER_MSEC)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            cycles: None,
            subtasks: Vec::new(),
            overrun: default_overrun(),
            snapshot_every: None,
        }
    }
}

/// One slot in the cycle table.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubtaskConfig {
    #[validate(custom(function = validate_subtask_name))]
    pub name: String,

    /// Slot length in microseconds.
    #[validate(range(min = 1))]
    pub interval_us: u64,

    /// `noop` returns immediately, `spin` busy-waits for `busy_us`.
    #[validate(custom(function = validate_subtask_kind))]
    #[serde(default = "default_kind")]
    pub kind: String,

    #[serde(default)]
    pub busy_us: u64,
}

impl SubtaskConfig {
    pub fn interval_ns(&self) -> u64 {
        self.interval_us.saturating_mul(NSEC_PER_USEC)
    }

    pub fn busy_ns(&self) -> u64 {
        self.busy_us.saturating_mul(NSEC_PER_USEC)
    }
}

fn default_period_ms() -> u64 {
    40
}

fn default_overrun() -> String {
    "warn".into()
}

fn default_kind() -> String {
    "noop".into()
}
