//! # cyclex telemetry
//!
//! Logging and metrics for the cyclic executive.

pub mod logging;
pub mod metrics;

pub use logging::EventLogger;
pub use metrics::MetricsRecorder;
