/*!
# Cyclex Simulator

Deterministic runs of the cyclic scheduler on a virtual clock. Subtasks do no
real work; each one advances the clock by a modelled execution time (fixed
latency, seeded jitter, injected overruns) and the scheduler's absolute
sleeps jump the clock to the next deadline. A run of any length completes
immediately and is fully determined by its parameters and seed.

## Key Components:
- **Execution models:** fixed latency, random jitter, no-op variants.
- **Chaos:** probabilistic overrun injection.
- **State hash:** BLAKE3 over the recorded timestamps, for replay checks.
*/

use std::sync::Arc;

use blake3::Hasher;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::info;

use cyclex_config::CyclexConfig;
use cyclex_core::prelude::*;
use cyclex_core::time::{NSEC_PER_MSEC, NSEC_PER_USEC};
use cyclex_telemetry::MetricsRecorder;

pub mod chaos;
pub mod models;

use chaos::OverrunInjector;
use models::ExecutionModel;

/// Cycles simulated when the configuration leaves the run unbounded.
pub const DEFAULT_SIMULATED_CYCLES: u64 = 1_000;

/// How far past its slot an injected overrun runs.
pub const DEFAULT_OVERSHOOT_NS: u64 = 100 * NSEC_PER_USEC;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("overrun probability {0} is outside [0, 1]")]
    InvalidProbability(f64),

    #[error("invalid overrun policy '{0}'")]
    InvalidPolicy(String),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("state hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },
}

/// One simulated slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedSubtask {
    pub name: String,
    pub interval_ns: u64,
    /// Work the subtask itself does, before latency and jitter.
    pub busy_ns: u64,
}

/// Everything that determines a simulated run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    pub period_ns: u64,
    pub cycles: u64,
    pub seed: u64,
    pub latency_ns: u64,
    pub jitter_ns: u64,
    pub overrun_probability: f64,
    pub overshoot_ns: u64,
    pub overrun_policy: OverrunPolicy,
    pub subtasks: Vec<SimulatedSubtask>,
}

impl SimulationParams {
    /// A single-slot table of `period_ms` with no latency.
    pub fn new(period_ms: u64, cycles: u64, seed: u64) -> Self {
        Self {
            period_ns: period_ms.saturating_mul(NSEC_PER_MSEC),
            cycles,
            seed,
            latency_ns: 0,
            jitter_ns: 0,
            overrun_probability: 0.0,
            overshoot_ns: DEFAULT_OVERSHOOT_NS,
            overrun_policy: OverrunPolicy::Warn,
            subtasks: Vec::new(),
        }
    }

    pub fn from_config(config: &CyclexConfig) -> Result<Self, SimulationError> {
        let overrun_policy = config
            .schedule
            .overrun
            .parse()
            .map_err(|_| SimulationError::InvalidPolicy(config.schedule.overrun.clone()))?;
        let subtasks = config
            .schedule
            .subtasks
            .iter()
            .map(|task| SimulatedSubtask {
                name: task.name.clone(),
                interval_ns: task.interval_ns(),
                busy_ns: if task.kind.eq_ignore_ascii_case("spin") {
                    task.busy_ns()
                } else {
                    0
                },
            })
            .collect();

        Ok(Self {
            period_ns: config.schedule.period_ns(),
            cycles: config.schedule.cycles.unwrap_or(DEFAULT_SIMULATED_CYCLES),
            seed: config.simulator.seed,
            latency_ns: config.simulator.latency_us.saturating_mul(NSEC_PER_USEC),
            jitter_ns: config.simulator.jitter_us.saturating_mul(NSEC_PER_USEC),
            overrun_probability: config.simulator.overrun_probability,
            overshoot_ns: DEFAULT_OVERSHOOT_NS,
            overrun_policy,
            subtasks,
        })
    }
}

/// Result of a completed simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    pub report: RunReport,
    /// Hex BLAKE3 digest of the timestamp sequence.
    pub state_hash: String,
}

impl SimulationOutcome {
    /// Fails unless the run reproduced `expected`.
    pub fn validate_hash(&self, expected: &str) -> Result<(), SimulationError> {
        if self.state_hash.eq_ignore_ascii_case(expected.trim()) {
            Ok(())
        } else {
            Err(SimulationError::HashMismatch {
                expected: expected.to_owned(),
                actual: self.state_hash.clone(),
            })
        }
    }
}

/// The Simulator ties together the virtual clock, the execution model shared
/// by all simulated subtasks and the scheduler that paces them.
pub struct Simulator {
    params: SimulationParams,
    clock: VirtualClock,
    metrics: Option<MetricsRecorder>,
}

impl Simulator {
    pub fn new(params: SimulationParams) -> Self {
        Self {
            params,
            clock: VirtualClock::new(0),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsRecorder) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Builds the cycle table with every slot wired to the execution model.
    pub fn build_spec(&self) -> Result<CycleSpec, SimulationError> {
        let params = &self.params;
        let chaos = OverrunInjector::new(
            params.overrun_probability,
            params.overshoot_ns,
            params.seed.wrapping_add(1),
        )?;
        let model = Arc::new(Mutex::new(ExecutionModel::new(
            params.latency_ns,
            params.jitter_ns,
            chaos,
            params.seed,
        )));

        let mut builder = CycleSpec::builder(params.period_ns);
        if params.subtasks.is_empty() {
            builder = builder.entry(self.simulated_entry(
                "simulated",
                params.period_ns,
                0,
                &model,
            ));
        }
        for task in &params.subtasks {
            builder = builder.entry(self.simulated_entry(
                &task.name,
                task.interval_ns,
                task.busy_ns,
                &model,
            ));
        }
        Ok(builder.build()?)
    }

    fn simulated_entry(
        &self,
        name: &str,
        interval_ns: u64,
        busy_ns: u64,
        model: &Arc<Mutex<ExecutionModel>>,
    ) -> SubtaskEntry {
        let clock = self.clock.clone();
        let model = Arc::clone(model);
        SubtaskEntry::new(name, interval_ns, move || {
            let elapsed = model.lock().execution_ns(interval_ns, busy_ns);
            clock.advance(elapsed);
        })
    }

    /// Runs the bounded simulation and hashes the recorded timestamps.
    pub fn run(self) -> Result<SimulationOutcome, SimulationError> {
        let spec = self.build_spec()?;
        let Simulator {
            params,
            clock,
            metrics,
        } = self;

        let mut scheduler = CyclicScheduler::new(spec, clock, RunMode::Bounded(params.cycles))?
            .with_overrun_policy(params.overrun_policy);
        if let Some(metrics) = metrics {
            scheduler = scheduler.with_metrics(metrics);
        }

        let report = scheduler.run()?;
        let state_hash = state_hash(report.timestamps.as_deref().unwrap_or_default());
        info!(
            seed = params.seed,
            cycles = report.cycles_executed,
            overruns = report.statistics.overruns,
            state_hash = %state_hash,
            "Simulation complete"
        );
        Ok(SimulationOutcome { report, state_hash })
    }
}

/// Hex BLAKE3 digest of a timestamp sequence.
pub fn state_hash(timestamps: &[Timestamp]) -> String {
    let mut hasher = Hasher::new();
    for ts in timestamps {
        hasher.update(&ts.secs().to_le_bytes());
        hasher.update(&ts.subsec_nanos().to_le_bytes());
    }
    hex::encode(hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn jittery(seed: u64) -> SimulationParams {
        SimulationParams {
            latency_ns: 200 * NSEC_PER_USEC,
            jitter_ns: 500 * NSEC_PER_USEC,
            ..SimulationParams::new(40, 50, seed)
        }
    }

    #[test]
    fn test_zero_latency_run_is_exact() {
        let outcome = Simulator::new(SimulationParams::new(40, 10, 42))
            .run()
            .unwrap();

        let stats = &outcome.report.statistics;
        assert_eq!(outcome.report.cycles_executed, 10);
        assert_eq!(stats.samples, 9);
        assert_eq!(stats.mean_error_ns, 0.0);
        assert_eq!(stats.min_error_ns, 0.0);
        assert_eq!(stats.max_error_ns, 0.0);

        let expected: Vec<_> = (0..10)
            .map(|k| Timestamp::from_nanos(k * 40 * NSEC_PER_MSEC))
            .collect();
        assert_eq!(outcome.report.timestamps.as_deref(), Some(&expected[..]));
        assert_eq!(outcome.state_hash, state_hash(&expected));
    }

    #[test]
    fn test_same_seed_same_hash() {
        let a = Simulator::new(jittery(7)).run().unwrap();
        let b = Simulator::new(jittery(7)).run().unwrap();
        assert_eq!(a.state_hash, b.state_hash);
        assert_eq!(a.report, b.report);
        assert!(a.validate_hash(&b.state_hash).is_ok());
    }

    #[test]
    fn test_different_seed_different_hash() {
        let a = Simulator::new(jittery(7)).run().unwrap();
        let b = Simulator::new(jittery(8)).run().unwrap();
        assert_ne!(a.state_hash, b.state_hash);
        assert!(matches!(
            a.validate_hash(&b.state_hash),
            Err(SimulationError::HashMismatch { .. })
        ));
    }

    #[test]
    fn test_constant_latency_has_no_jitter() {
        let params = SimulationParams {
            latency_ns: 3 * NSEC_PER_MSEC,
            ..SimulationParams::new(40, 20, 1)
        };
        let outcome = Simulator::new(params).run().unwrap();
        let stats = &outcome.report.statistics;
        assert_eq!(stats.max_error_ns, 0.0);
        assert_eq!(stats.overruns, 0);

        let timestamps = outcome.report.timestamps.unwrap();
        assert_eq!(timestamps[0], Timestamp::from_nanos(3 * NSEC_PER_MSEC));
        assert_eq!(timestamps[1], Timestamp::from_nanos(43 * NSEC_PER_MSEC));
    }

    #[test]
    fn test_forced_overruns_are_counted_not_fatal() {
        let params = SimulationParams {
            overrun_probability: 1.0,
            subtasks: vec![
                SimulatedSubtask {
                    name: "read".into(),
                    interval_ns: 10 * NSEC_PER_MSEC,
                    busy_ns: 0,
                },
                SimulatedSubtask {
                    name: "write".into(),
                    interval_ns: 30 * NSEC_PER_MSEC,
                    busy_ns: 0,
                },
            ],
            ..SimulationParams::new(40, 5, 3)
        };
        let outcome = Simulator::new(params).run().unwrap();
        assert_eq!(outcome.report.cycles_executed, 5);
        assert_eq!(outcome.report.statistics.overruns, 10);
    }

    #[test]
    fn test_abort_policy_surfaces_overrun() {
        let params = SimulationParams {
            overrun_probability: 1.0,
            overrun_policy: OverrunPolicy::Abort,
            ..SimulationParams::new(40, 5, 3)
        };
        let err = Simulator::new(params).run().unwrap_err();
        assert!(matches!(
            err,
            SimulationError::Scheduler(SchedulerError::Overrun { cycle: 0, .. })
        ));
    }

    #[test]
    fn test_oversized_table_rejected() {
        let params = SimulationParams {
            subtasks: vec![SimulatedSubtask {
                name: "big".into(),
                interval_ns: 50 * NSEC_PER_MSEC,
                busy_ns: 0,
            }],
            ..SimulationParams::new(40, 5, 3)
        };
        assert!(matches!(
            Simulator::new(params).run(),
            Err(SimulationError::Schedule(
                ScheduleError::IntervalsExceedCycle { .. }
            ))
        ));
    }

    #[test]
    fn test_params_from_config() {
        let mut config = CyclexConfig::default();
        config.schedule.cycles = Some(12);
        config.schedule.overrun = "abort".into();
        config.simulator.latency_us = 5;
        config.simulator.jitter_us = 7;
        config.schedule.subtasks = vec![cyclex_config::SubtaskConfig {
            name: "spin".into(),
            interval_us: 100,
            kind: "spin".into(),
            busy_us: 20,
        }];

        let params = SimulationParams::from_config(&config).unwrap();
        assert_eq!(params.period_ns, 40 * NSEC_PER_MSEC);
        assert_eq!(params.cycles, 12);
        assert_eq!(params.seed, 42);
        assert_eq!(params.latency_ns, 5_000);
        assert_eq!(params.jitter_ns, 7_000);
        assert_eq!(params.overrun_policy, OverrunPolicy::Abort);
        assert_eq!(params.subtasks[0].busy_ns, 20_000);

        config.schedule.cycles = None;
        let params = SimulationParams::from_config(&config).unwrap();
        assert_eq!(params.cycles, DEFAULT_SIMULATED_CYCLES);
    }

    proptest! {
        #[test]
        fn jitter_error_is_bounded(seed in any::<u64>(), jitter_us in 1u64..2_000) {
            let params = SimulationParams {
                jitter_ns: jitter_us * NSEC_PER_USEC,
                ..SimulationParams::new(10, 30, seed)
            };
            let outcome = Simulator::new(params).run().unwrap();
            let stats = outcome.report.statistics;
            prop_assert!(stats.max_error_ns <= (jitter_us * NSEC_PER_USEC) as f64);
            prop_assert_eq!(stats.overruns, 0);
        }
    }
}
