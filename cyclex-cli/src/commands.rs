use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use opentelemetry::KeyValue;
use tracing::info;

use cyclex_config::{ConfigError, CyclexConfig};
use cyclex_core::prelude::*;
use cyclex_simulator::{SimulationParams, Simulator};
use cyclex_telemetry::{EventLogger, MetricsRecorder};

use crate::error::CliError;
use crate::runtime;

#[derive(Parser, Debug)]
#[command(version, about = "Cyclic executive with drift-free absolute-deadline pacing")]
pub struct Cli {
    /// Configuration file; defaults to config/cyclex.yaml when present.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scheduler on the monotonic clock
    Run(RunArgs),
    /// Run a deterministic simulation on a virtual clock
    Simulate(SimulateArgs),
    /// Validate configuration and the cycle table, then exit
    Check,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Cycle period in milliseconds
    #[arg(long)]
    pub period_ms: Option<u64>,
    /// Number of cycles; runs forever when neither this nor the config sets it
    #[arg(long)]
    pub cycles: Option<u64>,
    /// Report file
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// Skip memory locking, CPU pinning and SCHED_RR
    #[arg(long)]
    pub no_rt: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SimulateArgs {
    #[arg(long)]
    pub period_ms: Option<u64>,
    #[arg(long)]
    pub cycles: Option<u64>,
    #[arg(long)]
    pub seed: Option<u64>,
    /// Fixed latency added to every subtask, in microseconds
    #[arg(long)]
    pub latency_us: Option<u64>,
    /// Maximum random jitter added to every subtask, in microseconds
    #[arg(long)]
    pub jitter_us: Option<u64>,
    /// Probability that a subtask overruns its slot
    #[arg(long)]
    pub overrun_probability: Option<f64>,
    /// Fail unless the run reproduces this state hash
    #[arg(long)]
    pub validate_hash: Option<String>,
}

impl RunArgs {
    fn apply(&self, config: &mut CyclexConfig) {
        if let Some(period_ms) = self.period_ms {
            config.schedule.period_ms = period_ms;
        }
        if let Some(cycles) = self.cycles {
            config.schedule.cycles = Some(cycles);
        }
        if let Some(path) = &self.report {
            config.report.path = path.clone();
        }
        if self.no_rt {
            config.rt.enabled = false;
        }
    }
}

impl SimulateArgs {
    fn apply(&self, config: &mut CyclexConfig) {
        if let Some(period_ms) = self.period_ms {
            config.schedule.period_ms = period_ms;
        }
        if let Some(cycles) = self.cycles {
            config.schedule.cycles = Some(cycles);
        }
        if let Some(seed) = self.seed {
            config.simulator.seed = seed;
        }
        if let Some(latency_us) = self.latency_us {
            config.simulator.latency_us = latency_us;
        }
        if let Some(jitter_us) = self.jitter_us {
            config.simulator.jitter_us = jitter_us;
        }
        if let Some(p) = self.overrun_probability {
            config.simulator.overrun_probability = p;
        }
        // A virtual clock needs no OS setup.
        config.rt.enabled = false;
    }
}

/// Defaults, file and environment, then the subcommand's flags on top.
pub fn load_config(cli: &Cli) -> Result<CyclexConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => CyclexConfig::load_from_path(path)?,
        None => CyclexConfig::load()?,
    };
    match &cli.command {
        Commands::Run(args) => args.apply(&mut config),
        Commands::Simulate(args) => args.apply(&mut config),
        Commands::Check => {}
    }
    config.validated()
}

pub fn run_command(cli: Cli, config: CyclexConfig) -> Result<(), CliError> {
    let metrics = MetricsRecorder::new().map_err(|e| CliError::Metrics(e.to_string()))?;

    match cli.command {
        Commands::Run(_) => run_mode(&config, metrics),
        Commands::Simulate(args) => {
            simulation_mode(&config, args.validate_hash.as_deref(), metrics)
        }
        Commands::Check => check_mode(&config),
    }
}

fn run_mode(config: &CyclexConfig, metrics: MetricsRecorder) -> Result<(), CliError> {
    EventLogger::log_event(
        "run_started",
        vec![
            KeyValue::new("period_ms", config.schedule.period_ms as i64),
            KeyValue::new(
                "cycles",
                config
                    .schedule
                    .cycles
                    .map_or("unbounded".to_string(), |c| c.to_string()),
            ),
            KeyValue::new("rt", config.rt.enabled),
        ],
    );

    let report = runtime::execute(config, metrics.clone())?;
    runtime::publish_report(config, &report)?;

    EventLogger::log_event(
        "run_completed",
        vec![
            KeyValue::new("cycles", report.cycles_executed as i64),
            KeyValue::new("overruns", report.statistics.overruns as i64),
        ],
    );
    dump_metrics(config, &metrics)
}

fn simulation_mode(
    config: &CyclexConfig,
    validate_hash: Option<&str>,
    metrics: MetricsRecorder,
) -> Result<(), CliError> {
    let params = SimulationParams::from_config(config)?;
    let seed = params.seed;
    let outcome = Simulator::new(params).with_metrics(metrics.clone()).run()?;

    let mut sinks: Vec<Box<dyn ReportSink>> = vec![Box::new(WriterSink::stdout())];
    publish(&outcome.report, &mut sinks)?;
    println!("State hash: {}", outcome.state_hash);

    EventLogger::log_event(
        "simulation_completed",
        vec![
            KeyValue::new("seed", seed as i64),
            KeyValue::new("cycles", outcome.report.cycles_executed as i64),
            KeyValue::new("state_hash", outcome.state_hash.clone()),
        ],
    );

    if let Some(expected) = validate_hash {
        outcome.validate_hash(expected)?;
        info!("State hash validated");
    }
    dump_metrics(config, &metrics)
}

fn check_mode(config: &CyclexConfig) -> Result<(), CliError> {
    let spec = runtime::build_cycle_spec(&config.schedule)?;
    let policy = runtime::overrun_policy(&config.schedule)?;
    for (slot, entry) in spec.entries().iter().enumerate() {
        info!(
            slot,
            subtask = entry.name(),
            interval_us = entry.interval_ns() / cyclex_core::time::NSEC_PER_USEC,
            "Cycle slot"
        );
    }
    info!(
        period_ms = config.schedule.period_ms,
        slots = spec.entries().len(),
        mode = ?RunMode::from_cycles(config.schedule.cycles),
        overrun_policy = %policy,
        rt = config.rt.enabled,
        "Configuration OK"
    );
    Ok(())
}

fn dump_metrics(config: &CyclexConfig, metrics: &MetricsRecorder) -> Result<(), CliError> {
    if config.telemetry.dump_metrics {
        let text = metrics
            .gather_metrics()
            .map_err(|e| CliError::Metrics(e.to_string()))?;
        print!("{}", text);
    }
    Ok(())
}
