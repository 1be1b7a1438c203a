//! ## cyclex-telemetry::metrics
//! **Prometheus registry for cycle counters and jitter histograms**
//!
//! Counters and histograms are atomics internally, so recording from the
//! scheduler thread never takes a lock.

use prometheus::{Counter, Encoder, Histogram, HistogramOpts, Registry, TextEncoder};

/// Jitter buckets in nanoseconds, 1 µs up to 10 ms.
const JITTER_BUCKETS_NS: [f64; 9] = [
    1_000.0,
    5_000.0,
    10_000.0,
    50_000.0,
    100_000.0,
    500_000.0,
    1_000_000.0,
    5_000_000.0,
    10_000_000.0,
];

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub cycles: Counter,
    pub overruns: Counter,
    pub jitter: Histogram,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let cycles = Counter::new("cyclex_cycles_total", "Completed scheduler cycles")?;
        let overruns = Counter::new(
            "cyclex_overruns_total",
            "Subtask slots that finished after their deadline",
        )?;
        let jitter = Histogram::with_opts(
            HistogramOpts::new(
                "cyclex_jitter_ns",
                "Absolute deviation of the measured cycle length from the period",
            )
            .buckets(JITTER_BUCKETS_NS.to_vec()),
        )?;

        registry.register(Box::new(cycles.clone()))?;
        registry.register(Box::new(overruns.clone()))?;
        registry.register(Box::new(jitter.clone()))?;

        Ok(Self {
            registry,
            cycles,
            overruns,
            jitter,
        })
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }

    #[inline]
    pub fn inc_cycles(&self) {
        self.cycles.inc();
    }

    #[inline]
    pub fn inc_overruns(&self) {
        self.overruns.inc();
    }

    #[inline]
    pub fn observe_jitter(&self, error_ns: f64) {
        self.jitter.observe(error_ns);
    }
}
