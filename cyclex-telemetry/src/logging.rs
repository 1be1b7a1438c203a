//! ## cyclex-telemetry::logging
//! **Structured logging with `tracing` and OpenTelemetry attributes**
//!
//! The scheduler thread logs through the regular `tracing` macros. Lifecycle
//! events (run start, run complete, simulation complete) go through
//! [`EventLogger::log_event`] so they carry a uniform span and key/value set.

use opentelemetry::KeyValue;
use tracing::info_span;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global fmt subscriber.
    ///
    /// `RUST_LOG` wins over `default_filter` when it is set. Fails if a global
    /// subscriber is already installed.
    pub fn init(default_filter: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .or_else(|_| EnvFilter::try_new(default_filter))
                    .unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_thread_names(true)
            .with_span_events(FmtSpan::CLOSE)
            .try_init()
    }

    #[inline]
    pub fn log_event(event_type: &str, metadata: Vec<KeyValue>) {
        let span = info_span!(
            "scheduler_event",
            event_type = event_type,
            otel.kind = "INTERNAL"
        );
        let _entered = span.enter();

        let fields = metadata
            .iter()
            .map(|kv| format!("{}={}", kv.key, kv.value))
            .collect::<Vec<_>>()
            .join(" ");
        tracing::info!(metadata = %fields, "Scheduler event occurred");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_logging() {
        EventLogger::log_event("test", vec![KeyValue::new("key", "value")]);
        assert!(logs_contain("Scheduler event occurred"));
        assert!(logs_contain("key=value"));
    }

    #[traced_test]
    #[test]
    fn test_logging_multiple_attributes() {
        EventLogger::log_event(
            "run_complete",
            vec![
                KeyValue::new("cycles", 10_i64),
                KeyValue::new("overruns", 0_i64),
            ],
        );
        assert!(logs_contain("cycles=10 overruns=0"));
    }
}
