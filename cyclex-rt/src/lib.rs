//! # Cyclex RT
//!
//! Process and thread preconditions for deterministic cycle timing: locked
//! memory, a prefaulted stack, a fixed CPU and round-robin real-time priority.
//!
//! The work is split the way the threads are: [`RtSetup::apply_process`] runs
//! on the main thread before the scheduler thread is spawned, so the affinity
//! mask is inherited, and [`RtSetup::apply_thread`] runs first thing on the
//! scheduler thread itself.

mod error;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
use linux as sys;

#[cfg(not(target_os = "linux"))]
mod fallback;
#[cfg(not(target_os = "linux"))]
use fallback as sys;

use cyclex_config::RtConfig;
use tracing::{debug, info};

pub use error::RtError;

/// Granularity of [`prefault_stack`].
pub const PAGE_SIZE: usize = 4096;

/// Lock all current and future pages of the process into RAM.
pub fn lock_memory() -> Result<(), RtError> {
    sys::lock_memory()?;
    info!("Process memory locked");
    Ok(())
}

/// Pin the calling thread to `cpu`. Threads spawned afterwards inherit the mask.
pub fn pin_to_cpu(cpu: usize) -> Result<(), RtError> {
    sys::pin_to_cpu(cpu)?;
    info!(cpu, "CPU affinity set");
    Ok(())
}

/// Switch the calling thread to `SCHED_RR` at `priority`.
pub fn set_round_robin_priority(priority: i32) -> Result<(), RtError> {
    sys::set_round_robin_priority(priority)?;
    info!(priority, "SCHED_RR priority set");
    Ok(())
}

/// Touch `bytes` of stack below the caller, one page per frame, so the first
/// cycles do not take page faults. Returns the number of pages touched.
pub fn prefault_stack(bytes: usize) -> usize {
    let pages = touch_pages(bytes.div_ceil(PAGE_SIZE));
    debug!(bytes, pages, "Stack prefaulted");
    pages
}

#[inline(never)]
fn touch_pages(remaining: usize) -> usize {
    if remaining == 0 {
        return 0;
    }
    let mut page = [0u8; PAGE_SIZE];
    page[0] = 1;
    page[PAGE_SIZE - 1] = 1;
    std::hint::black_box(&mut page);
    1 + touch_pages(remaining - 1)
}

/// Bootstrap steps derived from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtSetup {
    pub lock_memory: bool,
    pub cpu: Option<usize>,
    pub priority: Option<i32>,
    pub prefault_stack_bytes: usize,
}

impl RtSetup {
    /// A setup that changes nothing. Used for unprivileged runs.
    pub fn disabled() -> Self {
        Self {
            lock_memory: false,
            cpu: None,
            priority: None,
            prefault_stack_bytes: 0,
        }
    }

    pub fn is_disabled(&self) -> bool {
        *self == Self::disabled()
    }

    /// Main-thread half: memory lock and CPU pinning.
    pub fn apply_process(&self) -> Result<(), RtError> {
        if self.lock_memory {
            lock_memory()?;
        }
        if let Some(cpu) = self.cpu {
            pin_to_cpu(cpu)?;
        }
        Ok(())
    }

    /// Scheduler-thread half: priority and stack prefault.
    pub fn apply_thread(&self) -> Result<(), RtError> {
        if let Some(priority) = self.priority {
            set_round_robin_priority(priority)?;
        }
        if self.prefault_stack_bytes > 0 {
            prefault_stack(self.prefault_stack_bytes);
        }
        Ok(())
    }
}

impl From<&RtConfig> for RtSetup {
    fn from(config: &RtConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        Self {
            lock_memory: config.lock_memory,
            cpu: Some(config.cpu),
            priority: Some(config.priority),
            prefault_stack_bytes: config.prefault_stack_bytes,
        }
    }
}
