//! # Cyclex Configuration
//!
//! Layered configuration for the cyclic scheduler: built-in defaults, a YAML
//! file, `CYCLEX_*` environment variables, then whatever the CLI overrides.
//! Every load ends with field validation plus the cross-field checks that
//! `validator` cannot express.

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod error;
mod report;
mod rt;
mod schedule;
mod simulator;
mod telemetry;
pub mod validation;

pub use error::ConfigError;
pub use report::ReportConfig;
pub use rt::RtConfig;
pub use schedule::{ScheduleConfig, SubtaskConfig};
pub use simulator::SimulatorConfig;
pub use telemetry::TelemetryConfig;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/cyclex.yaml";

const ENV_PREFIX: &str = "CYCLEX_";

/// Top-level configuration container.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct CyclexConfig {
    /// Cycle period, run length and subtask table.
    #[validate(nested)]
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Memory lock, affinity and priority bootstrap.
    #[validate(nested)]
    #[serde(default)]
    pub rt: RtConfig,

    /// Report destinations.
    #[validate(nested)]
    #[serde(default)]
    pub report: ReportConfig,

    #[validate(nested)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Virtual-clock runs only.
    #[validate(nested)]
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

impl CyclexConfig {
    /// Load configuration from the default file and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/cyclex.yaml`, if present
    /// 3. `CYCLEX_*` environment variables (`__` separates nested keys)
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(CyclexConfig::default()));
        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            figment = figment.merge(Yaml::file(DEFAULT_CONFIG_PATH));
        }
        Self::finish(figment)
    }

    /// Load configuration from an explicit file. Unlike [`CyclexConfig::load`]
    /// a missing file is an error.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let figment =
            Figment::from(Serialized::defaults(CyclexConfig::default())).merge(Yaml::file(path));
        Self::finish(figment)
    }

    /// Re-run validation, e.g. after CLI overrides were applied.
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        self.check_constraints()?;
        Ok(self)
    }

    fn finish(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validated()
    }

    fn check_constraints(&self) -> Result<(), ConfigError> {
        validation::validate_unique_names(&self.schedule.subtasks)
            .map_err(|e| ConfigError::Constraint(format!("schedule.subtasks: {}", e.code)))?;

        let cpus = num_cpus::get();
        if self.rt.enabled && self.rt.cpu >= cpus {
            return Err(ConfigError::Constraint(format!(
                "rt.cpu {} is out of range, {} CPUs available",
                self.rt.cpu, cpus
            )));
        }

        if self.rt.prefault_stack_bytes > self.rt.thread_stack_bytes / 2 {
            return Err(ConfigError::Constraint(format!(
                "rt.prefault_stack_bytes ({}) must be at most half of rt.thread_stack_bytes ({})",
                self.rt.prefault_stack_bytes, self.rt.thread_stack_bytes
            )));
        }

        for task in &self.schedule.subtasks {
            if task.kind.eq_ignore_ascii_case("spin") && task.busy_us >= task.interval_us {
                return Err(ConfigError::Constraint(format!(
                    "subtask '{}' spins for {} us, which leaves no headroom in its {} us slot",
                    task.name, task.busy_us, task.interval_us
                )));
            }
        }
        Ok(())
    }
}
