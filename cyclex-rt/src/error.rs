use std::io;
use thiserror::Error;

/// Failures while establishing real-time preconditions.
#[derive(Debug, Error)]
pub enum RtError {
    #[error("Failed to lock process memory: {0}")]
    MemoryLock(#[source] io::Error),

    #[error("Failed to pin scheduler to CPU {cpu}: {source}")]
    CpuAffinity {
        cpu: usize,
        #[source]
        source: io::Error,
    },

    #[error("Failed to set SCHED_RR priority {priority}: {source}")]
    SchedulingPolicy {
        priority: i32,
        #[source]
        source: io::Error,
    },

    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}
