//! Real-time bootstrap parameters.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Memory locking, stack prefault, CPU pinning and scheduling priority.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RtConfig {
    /// Run the bootstrap at all. Disable for unprivileged runs.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// CPU the scheduler thread is pinned to.
    #[validate(range(max = 1023))]
    #[serde(default)]
    pub cpu: usize,

    /// SCHED_RR priority.
    #[validate(range(min = 1, max = 99))]
    #[serde(default = "default_priority")]
    pub priority: i32,

    #[serde(default = "default_true")]
    pub lock_memory: bool,

    /// Bytes of stack touched on the scheduler thread before the first cycle.
    #[validate(range(min = 4096, max = 4_194_304))]
    #[serde(default = "default_prefault_stack_bytes")]
    pub prefault_stack_bytes: usize,

    /// Stack size of the scheduler thread.
    #[validate(range(min = 65_536, max = 67_108_864))]
    #[serde(default = "default_thread_stack_bytes")]
    pub thread_stack_bytes: usize,
}

impl Default for RtConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cpu: 0,
            priority: default_priority(),
            lock_memory: true,
            prefault_stack_bytes: default_prefault_stack_bytes(),
            thread_stack_bytes: default_thread_stack_bytes(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_priority() -> i32 {
    49
}

fn default_prefault_stack_bytes() -> usize {
    128 * 1024
}

fn default_thread_stack_bytes() -> usize {
    1024 * 1024
}
