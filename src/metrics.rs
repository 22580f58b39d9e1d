//! Metrics collection and export module

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Instant;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub markets_created: IntCounter,
    pub markets_failed: IntCounterVec,
    pub buys_attempted: IntCounter,
    pub buys_succeeded: IntCounter,
    pub buys_failed: IntCounterVec,
    pub transactions_submitted: IntCounter,
    pub transactions_failed: IntCounterVec,
    pub storage_failures: IntCounterVec,

    // Histograms
    pub submission_latency: Histogram,
    pub create_latency: Histogram,
    pub buy_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let markets_created = IntCounter::with_opts(Opts::new(
            "markets_created_total",
            "Number of markets created",
        ))?;

        let markets_failed = IntCounterVec::new(
            Opts::new("markets_failed_total", "Failed market creations by error category"),
            &["category"],
        )?;

        let buys_attempted =
            IntCounter::with_opts(Opts::new("buys_attempted_total", "Number of buy attempts"))?;

        let buys_succeeded =
            IntCounter::with_opts(Opts::new("buys_succeeded_total", "Number of successful buys"))?;

        let buys_failed = IntCounterVec::new(
            Opts::new("buys_failed_total", "Failed buys by error category"),
            &["category"],
        )?;

        let transactions_submitted = IntCounter::with_opts(Opts::new(
            "transactions_submitted_total",
            "Number of signed transactions sent",
        ))?;

        let transactions_failed = IntCounterVec::new(
            Opts::new(
                "transactions_failed_total",
                "Batch submissions that stopped, by build or submission category",
            ),
            &["category"],
        )?;

        let storage_failures = IntCounterVec::new(
            Opts::new("storage_failures_total", "Content staging failures by phase and kind"),
            &["stage", "category"],
        )?;

        let submission_latency = Histogram::with_opts(
            HistogramOpts::new(
                "submission_latency_seconds",
                "Send-and-confirm latency per transaction",
            )
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        )?;

        let create_latency = Histogram::with_opts(
            HistogramOpts::new("create_market_latency_seconds", "End-to-end market creation")
                .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        )?;

        let buy_latency = Histogram::with_opts(
            HistogramOpts::new("buy_latency_seconds", "End-to-end buy latency")
                .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        )?;

        // Register all metrics
        registry.register(Box::new(markets_created.clone()))?;
        registry.register(Box::new(markets_failed.clone()))?;
        registry.register(Box::new(buys_attempted.clone()))?;
        registry.register(Box::new(buys_succeeded.clone()))?;
        registry.register(Box::new(buys_failed.clone()))?;
        registry.register(Box::new(transactions_submitted.clone()))?;
        registry.register(Box::new(transactions_failed.clone()))?;
        registry.register(Box::new(storage_failures.clone()))?;
        registry.register(Box::new(submission_latency.clone()))?;
        registry.register(Box::new(create_latency.clone()))?;
        registry.register(Box::new(buy_latency.clone()))?;

        Ok(Self {
            registry,
            markets_created,
            markets_failed,
            buys_attempted,
            buys_succeeded,
            buys_failed,
            transactions_submitted,
            transactions_failed,
            storage_failures,
            submission_latency,
            create_latency,
            buy_latency,
        })
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::debug!("metrics encoding failed: {}", e);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.start.elapsed().as_secs_f64());
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
