//! Logging and metrics configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TelemetryConfig {
    /// Default `tracing` filter directive, used when `RUST_LOG` is unset.
    #[validate(length(min = 1, max = 256))]
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Print the Prometheus text exposition at shutdown.
    #[serde(default)]
    pub dump_metrics: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            dump_metrics: false,
        }
    }
}

fn default_log_filter() -> String {
    "info".into()
}
