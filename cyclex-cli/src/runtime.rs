//! ## cyclex-cli::runtime
//! **Wiring between configuration, bootstrap and the scheduler thread**
//!
//! The main thread locks memory and pins the CPU so the scheduler thread
//! inherits both, spawns `cyclex-sched`, and joins it. The scheduler thread
//! raises itself to SCHED_RR, prefaults its stack and runs the loop.

use std::thread;

use tracing::{error, info, instrument};

use cyclex_config::{CyclexConfig, ScheduleConfig, SubtaskConfig};
use cyclex_core::prelude::*;
use cyclex_rt::RtSetup;
use cyclex_telemetry::MetricsRecorder;

use crate::error::CliError;

pub const SCHEDULER_THREAD_NAME: &str = "cyclex-sched";

/// Builds the cycle table. Unassigned time at the end of the period goes to
/// a filler slot.
pub fn build_cycle_spec(schedule: &ScheduleConfig) -> Result<CycleSpec, ScheduleError> {
    schedule
        .subtasks
        .iter()
        .fold(CycleSpec::builder(schedule.period_ns()), |builder, task| {
            builder.entry(subtask_entry(task))
        })
        .build()
}

fn subtask_entry(task: &SubtaskConfig) -> SubtaskEntry {
    if task.kind.eq_ignore_ascii_case("spin") {
        let busy_ns = task.busy_ns();
        let clock = MonotonicClock::new();
        SubtaskEntry::new(task.name.clone(), task.interval_ns(), move || {
            spin_for(&clock, busy_ns)
        })
    } else {
        SubtaskEntry::new(task.name.clone(), task.interval_ns(), || {})
    }
}

/// Busy-waits on the monotonic clock. A clock failure ends the spin early;
/// the scheduler reads the same clock right after and reports the failure.
fn spin_for<C: Clock>(clock: &C, busy_ns: u64) {
    let Ok(start) = clock.now() else {
        return;
    };
    while let Ok(now) = clock.now() {
        if now.nanos_since(start) >= busy_ns as i128 {
            break;
        }
        std::hint::spin_loop();
    }
}

pub fn overrun_policy(schedule: &ScheduleConfig) -> Result<OverrunPolicy, CliError> {
    schedule.overrun.parse().map_err(CliError::OverrunPolicy)
}

/// Runs the configured scheduler on its own thread and returns its report.
#[instrument(level = "info", skip_all, fields(period_ms = config.schedule.period_ms))]
pub fn execute(config: &CyclexConfig, metrics: MetricsRecorder) -> Result<RunReport, CliError> {
    let spec = build_cycle_spec(&config.schedule)?;
    let mode = RunMode::from_cycles(config.schedule.cycles);
    let mut scheduler = CyclicScheduler::new(spec, MonotonicClock::new(), mode)?
        .with_overrun_policy(overrun_policy(&config.schedule)?)
        .with_metrics(metrics);
    if let Some(every) = config.schedule.snapshot_every {
        scheduler = scheduler.with_snapshot_every(every);
    }

    let setup = RtSetup::from(&config.rt);
    if setup.is_disabled() {
        info!("Real-time bootstrap disabled");
    }
    setup.apply_process()?;

    let handle = thread::Builder::new()
        .name(SCHEDULER_THREAD_NAME.into())
        .stack_size(config.rt.thread_stack_bytes)
        .spawn(move || -> Result<RunReport, CliError> {
            setup.apply_thread()?;
            Ok(scheduler.run()?)
        })
        .map_err(CliError::Spawn)?;

    match handle.join() {
        Ok(result) => result,
        Err(_) => {
            error!("Scheduler thread panicked");
            Err(CliError::SchedulerPanicked)
        }
    }
}

/// Writes the report to the file and, if enabled, the console.
pub fn publish_report(config: &CyclexConfig, report: &RunReport) -> Result<(), CliError> {
    let mut sinks: Vec<Box<dyn ReportSink>> = Vec::with_capacity(2);
    if config.report.console {
        sinks.push(Box::new(WriterSink::stdout()));
    }
    sinks.push(Box::new(FileSink::new(&config.report.path)));
    publish(report, &mut sinks)?;
    info!(path = %config.report.path.display(), "Report written");
    Ok(())
}
