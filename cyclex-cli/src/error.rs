//! Top-level error type and the process exit code each failure maps to.

use std::io;

use thiserror::Error;

use cyclex_config::ConfigError;
use cyclex_core::{ReportError, ScheduleError, SchedulerError};
use cyclex_rt::RtError;
use cyclex_simulator::SimulationError;

pub const EXIT_INVALID_SCHEDULE: i32 = -1;
pub const EXIT_MEMORY_LOCK: i32 = -2;
pub const EXIT_CPU_AFFINITY: i32 = -3;
pub const EXIT_CONFIG: i32 = -4;
pub const EXIT_ALLOCATION: i32 = -5;
pub const EXIT_SCHEDULING_POLICY: i32 = -6;
pub const EXIT_OVERRUN: i32 = -7;
pub const EXIT_OUTPUT: i32 = -8;
pub const EXIT_RUNTIME: i32 = -9;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid cycle configuration: {0}")]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Rt(#[from] RtError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error("invalid overrun policy: {0}")]
    OverrunPolicy(String),

    #[error("failed to render metrics: {0}")]
    Metrics(String),

    #[error("failed to spawn scheduler thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("scheduler thread panicked")]
    SchedulerPanicked,
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::OverrunPolicy(_) => EXIT_CONFIG,
            CliError::Schedule(_) => EXIT_INVALID_SCHEDULE,
            CliError::Rt(err) => rt_exit_code(err),
            CliError::Scheduler(err) => scheduler_exit_code(err),
            CliError::Report(_) | CliError::Metrics(_) => EXIT_OUTPUT,
            CliError::Simulation(err) => match err {
                SimulationError::InvalidProbability(_) | SimulationError::InvalidPolicy(_) => {
                    EXIT_CONFIG
                }
                SimulationError::Schedule(_) => EXIT_INVALID_SCHEDULE,
                SimulationError::Scheduler(err) => scheduler_exit_code(err),
                SimulationError::HashMismatch { .. } => EXIT_OUTPUT,
            },
            CliError::Spawn(_) | CliError::SchedulerPanicked => EXIT_RUNTIME,
        }
    }
}

fn rt_exit_code(err: &RtError) -> i32 {
    match err {
        RtError::MemoryLock(_) => EXIT_MEMORY_LOCK,
        RtError::CpuAffinity { .. } => EXIT_CPU_AFFINITY,
        RtError::SchedulingPolicy { .. } => EXIT_SCHEDULING_POLICY,
        RtError::Unsupported(_) => EXIT_CONFIG,
    }
}

fn scheduler_exit_code(err: &SchedulerError) -> i32 {
    match err {
        SchedulerError::Allocation { .. } => EXIT_ALLOCATION,
        SchedulerError::Overrun { .. } => EXIT_OVERRUN,
        SchedulerError::AlreadyStarted | SchedulerError::Clock(_) => EXIT_RUNTIME,
    }
}
