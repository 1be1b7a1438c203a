//! ## cyclex-core::scheduler
//! **The cyclic executive loop**
//!
//! One scheduler owns one [`CycleSpec`], one [`TimeKeeper`] and one
//! [`StatisticsCollector`]. Each cycle walks the table in order:
//!
//! 1. advance the deadline by the slot's interval,
//! 2. run the slot's subtask,
//! 3. (first slot only) sample the clock for jitter and the timestamp log,
//! 4. check the deadline for an overrun,
//! 5. sleep until the absolute deadline.
//!
//! Deadline N is always exactly one interval after deadline N-1. An overrun
//! only makes step 5 return at once; it never shifts later deadlines.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, info, instrument, warn};

use cyclex_telemetry::MetricsRecorder;

use crate::error::SchedulerError;
use crate::report::RunReport;
use crate::schedule::CycleSpec;
use crate::stats::StatisticsCollector;
use crate::time::{Clock, TimeKeeper, NSEC_PER_USEC};
use crate::timestamps::TimestampLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Run exactly this many cycles, then report.
    Bounded(u64),
    /// Daemon mode. Only an aborting overrun ends the loop.
    Unbounded,
}

impl RunMode {
    pub fn from_cycles(cycles: Option<u64>) -> Self {
        cycles.map_or(RunMode::Unbounded, RunMode::Bounded)
    }
}

/// What to do when a slot finishes after its deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverrunPolicy {
    /// Do not even check.
    Ignore,
    /// Count it and log a warning.
    #[default]
    Warn,
    /// Count it and end the run with [`SchedulerError::Overrun`].
    Abort,
}

impl FromStr for OverrunPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ignore" => Ok(OverrunPolicy::Ignore),
            "warn" => Ok(OverrunPolicy::Warn),
            "abort" => Ok(OverrunPolicy::Abort),
            other => Err(format!("unknown overrun policy '{other}'")),
        }
    }
}

impl fmt::Display for OverrunPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OverrunPolicy::Ignore => "ignore",
            OverrunPolicy::Warn => "warn",
            OverrunPolicy::Abort => "abort",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Uninitialized,
    Running,
    Terminated,
}

pub struct CyclicScheduler<C> {
    spec: CycleSpec,
    keeper: TimeKeeper<C>,
    stats: StatisticsCollector,
    mode: RunMode,
    log: Option<TimestampLog>,
    overrun_policy: OverrunPolicy,
    snapshot_every: Option<u64>,
    metrics: Option<MetricsRecorder>,
    state: SchedulerState,
    cycles_executed: u64,
}

impl<C: Clock> CyclicScheduler<C> {
    /// Creates an uninitialized scheduler. In bounded mode the timestamp log
    /// is allocated here, before any cycle runs.
    pub fn new(spec: CycleSpec, clock: C, mode: RunMode) -> Result<Self, SchedulerError> {
        let log = match mode {
            RunMode::Bounded(cycles) => Some(TimestampLog::with_capacity(cycles)?),
            RunMode::Unbounded => None,
        };

        Ok(Self {
            stats: StatisticsCollector::new(spec.cycle_ns()),
            keeper: TimeKeeper::new(clock),
            spec,
            mode,
            log,
            overrun_policy: OverrunPolicy::default(),
            snapshot_every: None,
            metrics: None,
            state: SchedulerState::Uninitialized,
            cycles_executed: 0,
        })
    }

    pub fn with_overrun_policy(mut self, policy: OverrunPolicy) -> Self {
        self.overrun_policy = policy;
        self
    }

    /// Logs a statistics snapshot every `cycles` cycles. Zero disables it.
    pub fn with_snapshot_every(mut self, cycles: u64) -> Self {
        self.snapshot_every = (cycles > 0).then_some(cycles);
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsRecorder) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[inline]
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    #[inline]
    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn statistics(&self) -> &StatisticsCollector {
        &self.stats
    }

    pub fn spec(&self) -> &CycleSpec {
        &self.spec
    }

    pub fn cycles_executed(&self) -> u64 {
        self.cycles_executed
    }

    /// Runs the loop to completion.
    ///
    /// Bounded runs return the report after the last cycle. Unbounded runs
    /// return only with an error. Either way the scheduler ends up
    /// `Terminated` and cannot be started again.
    #[instrument(level = "info", name = "cyclic_scheduler", skip(self), fields(cycle_ns = self.spec.cycle_ns(), mode = ?self.mode))]
    pub fn run(&mut self) -> Result<RunReport, SchedulerError> {
        if self.state != SchedulerState::Uninitialized {
            return Err(SchedulerError::AlreadyStarted);
        }

        let result = self.start().and_then(|_| self.run_loop());
        let report = self.terminate();
        result.map(|_| report)
    }

    fn start(&mut self) -> Result<(), SchedulerError> {
        let baseline = self.keeper.initialize()?;
        self.stats = StatisticsCollector::new(self.spec.cycle_ns());
        self.state = SchedulerState::Running;
        info!(
            baseline = %baseline,
            slots = self.spec.entries().len(),
            overrun_policy = %self.overrun_policy,
            "Scheduler running"
        );
        Ok(())
    }

    fn run_loop(&mut self) -> Result<(), SchedulerError> {
        match self.mode {
            RunMode::Bounded(cycles) => {
                for _ in 0..cycles {
                    self.run_cycle()?;
                }
                Ok(())
            }
            RunMode::Unbounded => loop {
                self.run_cycle()?;
            },
        }
    }

    fn run_cycle(&mut self) -> Result<(), SchedulerError> {
        let Self {
            spec,
            keeper,
            stats,
            log,
            metrics,
            overrun_policy,
            cycles_executed,
            ..
        } = self;
        let cycle = *cycles_executed;

        for (slot, entry) in spec.entries_mut().iter_mut().enumerate() {
            keeper.advance(entry.interval_ns());
            entry.execute();

            if slot == 0 {
                let now = keeper.now()?;
                if let Some(error_ns) = stats.sample(now) {
                    if let Some(metrics) = metrics.as_ref() {
                        metrics.observe_jitter(error_ns);
                    }
                }
                if let Some(log) = log.as_mut() {
                    log.record(now);
                }
            }

            if *overrun_policy != OverrunPolicy::Ignore {
                if let Some(late_ns) = keeper.lateness()? {
                    stats.record_overrun();
                    if let Some(metrics) = metrics.as_ref() {
                        metrics.inc_overruns();
                    }
                    if *overrun_policy == OverrunPolicy::Abort {
                        return Err(SchedulerError::Overrun {
                            subtask: entry.name().to_owned(),
                            late_ns,
                            cycle,
                        });
                    }
                    warn!(
                        subtask = entry.name(),
                        cycle,
                        late_us = late_ns / NSEC_PER_USEC,
                        "Cycle overrun: subtask finished after its deadline"
                    );
                }
            }

            keeper.sleep_until_deadline()?;
        }

        *cycles_executed += 1;
        if let Some(metrics) = metrics.as_ref() {
            metrics.inc_cycles();
        }
        if let Some(every) = self.snapshot_every {
            if self.cycles_executed % every == 0 {
                let snapshot = self.stats.report();
                info!(
                    cycle = self.cycles_executed,
                    current_us = snapshot.current_error_ns / NSEC_PER_USEC as f64,
                    mean_us = snapshot.mean_error_ns / NSEC_PER_USEC as f64,
                    min_us = snapshot.min_error_ns / NSEC_PER_USEC as f64,
                    max_us = snapshot.max_error_ns / NSEC_PER_USEC as f64,
                    overruns = snapshot.overruns,
                    "Jitter snapshot"
                );
            }
        }
        debug!(cycle, deadline = %self.keeper.deadline(), "Cycle complete");
        Ok(())
    }

    fn terminate(&mut self) -> RunReport {
        self.state = SchedulerState::Terminated;
        let report = RunReport {
            statistics: self.stats.report(),
            cycles_executed: self.cycles_executed,
            timestamps: self.log.take().map(TimestampLog::into_vec),
        };
        info!(
            cycles = report.cycles_executed,
            samples = report.statistics.samples,
            overruns = report.statistics.overruns,
            "Scheduler terminated"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClockError;
    use crate::time::{Timestamp, VirtualClock, NSEC_PER_MSEC};
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tracing_test::traced_test;

    const CYCLE_NS: u64 = 40 * NSEC_PER_MSEC;

    /// Virtual clock that remembers every sleep target.
    #[derive(Clone)]
    struct RecordingClock {
        inner: VirtualClock,
        sleeps: Arc<Mutex<Vec<Timestamp>>>,
    }

    impl RecordingClock {
        fn new(start: u64) -> Self {
            Self {
                inner: VirtualClock::new(start),
                sleeps: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl Clock for RecordingClock {
        fn now(&self) -> Result<Timestamp, ClockError> {
            self.inner.now()
        }

        fn sleep_until(&self, deadline: Timestamp) -> Result<(), ClockError> {
            self.sleeps.lock().push(deadline);
            self.inner.sleep_until(deadline)
        }
    }

    fn idle_spec() -> CycleSpec {
        CycleSpec::builder(CYCLE_NS).build().unwrap()
    }

    #[test]
    fn bounded_run_with_zero_latency() {
        let clock = VirtualClock::new(5 * NSEC_PER_MSEC);
        let mut scheduler = CyclicScheduler::new(idle_spec(), clock, RunMode::Bounded(10)).unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Uninitialized);

        let report = scheduler.run().unwrap();

        assert_eq!(scheduler.state(), SchedulerState::Terminated);
        assert_eq!(report.cycles_executed, 10);
        let timestamps = report.timestamps.unwrap();
        assert_eq!(timestamps.len(), 10);
        assert_eq!(report.statistics.samples, 9);
        assert_eq!(report.statistics.mean_error_ns, 0.0);
        assert_eq!(report.statistics.min_error_ns, 0.0);
        assert_eq!(report.statistics.max_error_ns, 0.0);
        for pair in timestamps.windows(2) {
            assert_eq!(pair[1].nanos_since(pair[0]), CYCLE_NS as i128);
        }
    }

    #[test]
    fn zero_cycles_yields_empty_report() {
        let hits = Arc::new(AtomicU64::new(0));
        let seen = hits.clone();
        let spec = CycleSpec::builder(CYCLE_NS)
            .subtask("work", NSEC_PER_MSEC, move || {
                seen.fetch_add(1, Ordering::Relaxed);
            })
            .build()
            .unwrap();

        let mut scheduler = CyclicScheduler::new(spec, VirtualClock::new(0), RunMode::Bounded(0)).unwrap();
        let report = scheduler.run().unwrap();

        assert_eq!(hits.load(Ordering::Relaxed), 0);
        assert_eq!(report.cycles_executed, 0);
        assert_eq!(report.timestamps, Some(Vec::new()));
        assert_eq!(report.statistics.samples, 0);
    }

    #[test]
    fn cannot_run_twice() {
        let mut scheduler =
            CyclicScheduler::new(idle_spec(), VirtualClock::new(0), RunMode::Bounded(1)).unwrap();
        scheduler.run().unwrap();
        assert!(matches!(scheduler.run(), Err(SchedulerError::AlreadyStarted)));
    }

    #[test]
    fn slots_run_in_table_order_every_cycle() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (order.clone(), order.clone());
        let spec = CycleSpec::builder(CYCLE_NS)
            .subtask("recv", 10 * NSEC_PER_MSEC, move || a.lock().push("recv"))
            .subtask("send", 10 * NSEC_PER_MSEC, move || b.lock().push("send"))
            .build()
            .unwrap();

        let clock = RecordingClock::new(0);
        let mut scheduler = CyclicScheduler::new(spec, clock.clone(), RunMode::Bounded(2)).unwrap();
        scheduler.run().unwrap();

        assert_eq!(*order.lock(), ["recv", "send", "recv", "send"]);
        // Three slots per cycle including the filler.
        let sleeps = clock.sleeps.lock();
        let offsets: Vec<i128> = sleeps.iter().map(|t| t.as_nanos() / NSEC_PER_MSEC as i128).collect();
        assert_eq!(offsets, [10, 20, 40, 50, 60, 80]);
    }

    #[test]
    fn constant_latency_does_not_show_as_jitter() {
        let clock = VirtualClock::new(0);
        let handle = clock.clone();
        let spec = CycleSpec::builder(CYCLE_NS)
            .subtask("work", 20 * NSEC_PER_MSEC, move || handle.advance(3 * NSEC_PER_MSEC))
            .build()
            .unwrap();

        let report = CyclicScheduler::new(spec, clock, RunMode::Bounded(20))
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(report.statistics.max_error_ns, 0.0);
        assert_eq!(report.statistics.overruns, 0);
    }

    #[test]
    fn variable_latency_is_measured() {
        let clock = VirtualClock::new(0);
        let handle = clock.clone();
        let mut toggle = false;
        let spec = CycleSpec::builder(CYCLE_NS)
            .subtask("work", 20 * NSEC_PER_MSEC, move || {
                toggle = !toggle;
                handle.advance(if toggle { 1_000 } else { 101_000 });
            })
            .build()
            .unwrap();

        let report = CyclicScheduler::new(spec, clock, RunMode::Bounded(5))
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(report.statistics.samples, 4);
        assert!((report.statistics.mean_error_ns - 100_000.0).abs() < 1e-6);
        assert!((report.statistics.max_error_ns - 100_000.0).abs() < 1e-6);
    }

    #[traced_test]
    #[test]
    fn overrun_is_counted_and_does_not_shift_deadlines() {
        let clock = RecordingClock::new(0);
        let handle = clock.inner.clone();
        let mut calls = 0;
        let spec = CycleSpec::builder(CYCLE_NS)
            .subtask("algo", 10 * NSEC_PER_MSEC, move || {
                calls += 1;
                if calls == 2 {
                    handle.advance(25 * NSEC_PER_MSEC);
                }
            })
            .build()
            .unwrap();

        let report = CyclicScheduler::new(spec, clock.clone(), RunMode::Bounded(4))
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(report.statistics.overruns, 1);
        assert!(logs_contain("Cycle overrun"));
        // The overrun in cycle 1 eats into the filler slot, but every slot
        // deadline stays on the original grid.
        let sleeps = clock.sleeps.lock();
        let offsets: Vec<i128> = sleeps.iter().map(|t| t.as_nanos() / NSEC_PER_MSEC as i128).collect();
        assert_eq!(offsets, [10, 40, 50, 80, 90, 120, 130, 160]);
    }

    #[test]
    fn abort_policy_stops_the_run() {
        let clock = VirtualClock::new(0);
        let handle = clock.clone();
        let spec = CycleSpec::builder(CYCLE_NS)
            .subtask("algo", 10 * NSEC_PER_MSEC, move || handle.advance(11 * NSEC_PER_MSEC))
            .build()
            .unwrap();

        let mut scheduler = CyclicScheduler::new(spec, clock, RunMode::Unbounded)
            .unwrap()
            .with_overrun_policy(OverrunPolicy::Abort);
        let err = scheduler.run().unwrap_err();

        match err {
            SchedulerError::Overrun { subtask, late_ns, cycle } => {
                assert_eq!(subtask, "algo");
                assert_eq!(late_ns, NSEC_PER_MSEC);
                assert_eq!(cycle, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(scheduler.state(), SchedulerState::Terminated);
        assert_eq!(scheduler.statistics().overruns(), 1);
    }

    #[test]
    fn ignore_policy_skips_detection() {
        let clock = VirtualClock::new(0);
        let handle = clock.clone();
        let spec = CycleSpec::single(CYCLE_NS, "slow", move || handle.advance(2 * CYCLE_NS)).unwrap();

        let report = CyclicScheduler::new(spec, clock, RunMode::Bounded(3))
            .unwrap()
            .with_overrun_policy(OverrunPolicy::Ignore)
            .run()
            .unwrap();
        assert_eq!(report.statistics.overruns, 0);
    }

    #[test]
    fn metrics_follow_the_loop() {
        let metrics = MetricsRecorder::new().unwrap();
        let report = CyclicScheduler::new(idle_spec(), VirtualClock::new(0), RunMode::Bounded(6))
            .unwrap()
            .with_metrics(metrics.clone())
            .run()
            .unwrap();

        assert_eq!(report.cycles_executed, 6);
        assert_eq!(metrics.cycles.get(), 6.0);
        assert_eq!(metrics.jitter.get_sample_count(), 5);
        assert_eq!(metrics.overruns.get(), 0.0);
    }

    #[traced_test]
    #[test]
    fn periodic_snapshots_are_logged() {
        CyclicScheduler::new(idle_spec(), VirtualClock::new(0), RunMode::Bounded(4))
            .unwrap()
            .with_snapshot_every(2)
            .run()
            .unwrap();
        assert!(logs_contain("Jitter snapshot"));
    }

    #[test]
    fn overrun_policy_parses() {
        assert_eq!("WARN".parse::<OverrunPolicy>(), Ok(OverrunPolicy::Warn));
        assert_eq!("abort".parse::<OverrunPolicy>(), Ok(OverrunPolicy::Abort));
        assert!("skip".parse::<OverrunPolicy>().is_err());
        assert_eq!(RunMode::from_cycles(None), RunMode::Unbounded);
        assert_eq!(RunMode::from_cycles(Some(3)), RunMode::Bounded(3));
    }

    proptest! {
        #[test]
        fn deadlines_stay_on_grid_under_latency(
            period_us in 100u64..50_000,
            latencies in proptest::collection::vec(0u64..1_000_000, 1..64),
        ) {
            let period_ns = period_us * NSEC_PER_USEC;
            let clock = RecordingClock::new(1_000);
            let handle = clock.inner.clone();
            let cycles = latencies.len() as u64;
            let mut feed = latencies.into_iter().map(move |l| l % period_ns);
            let spec = CycleSpec::single(period_ns, "work", move || {
                handle.advance(feed.next().unwrap_or(0));
            }).unwrap();

            let report = CyclicScheduler::new(spec, clock.clone(), RunMode::Bounded(cycles))
                .unwrap()
                .run()
                .unwrap();

            prop_assert_eq!(report.statistics.overruns, 0);
            let sleeps = clock.sleeps.lock();
            prop_assert_eq!(sleeps.len() as u64, cycles);
            prop_assert_eq!(sleeps[0].nanos_since(Timestamp::from_nanos(1_000)), period_ns as i128);
            for pair in sleeps.windows(2) {
                prop_assert_eq!(pair[1].nanos_since(pair[0]), period_ns as i128);
            }
        }
    }
}
