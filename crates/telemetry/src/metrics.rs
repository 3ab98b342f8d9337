//! Internal metrics collection.
//!
//! Collects pipeline and report metrics in-memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 10000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for (i, &bound) in Self::BUCKET_BOUNDS.iter().enumerate() {
            if ms <= bound {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        // Value exceeds all buckets, add to last
        self.buckets[10].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum.load(Ordering::Relaxed) as f64 / count as f64
        }
    }

    /// Returns `(upper bound ms, count)` per bucket.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the reports service.
#[derive(Debug, Default)]
pub struct Metrics {
    // Pipeline metrics
    pub client_rows_loaded: Counter,
    pub telemetry_rows_loaded: Counter,
    pub mart_rebuilds: Counter,
    pub pipeline_failures: Counter,

    // Report endpoint metrics
    pub reports_served: Counter,
    pub report_rejections: Counter,
    pub report_failures: Counter,

    // ClickHouse metrics
    pub clickhouse_inserts: Counter,
    pub clickhouse_insert_errors: Counter,

    // Latency histograms
    pub report_latency_ms: Histogram,
    pub clickhouse_latency_ms: Histogram,
    pub batch_insert_latency_ms: Histogram,
    pub rollup_latency_ms: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub client_rows_loaded: u64,
    pub telemetry_rows_loaded: u64,
    pub mart_rebuilds: u64,
    pub pipeline_failures: u64,
    pub reports_served: u64,
    pub report_rejections: u64,
    pub report_failures: u64,
    pub clickhouse_inserts: u64,
    pub clickhouse_insert_errors: u64,
    pub report_latency_mean_ms: f64,
    pub clickhouse_latency_mean_ms: f64,
    pub batch_insert_latency_mean_ms: f64,
    pub rollup_latency_mean_ms: f64,
    pub report_latency_buckets: Vec<(u64, u64)>,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            client_rows_loaded: self.client_rows_loaded.get(),
            telemetry_rows_loaded: self.telemetry_rows_loaded.get(),
            mart_rebuilds: self.mart_rebuilds.get(),
            pipeline_failures: self.pipeline_failures.get(),
            reports_served: self.reports_served.get(),
            report_rejections: self.report_rejections.get(),
            report_failures: self.report_failures.get(),
            clickhouse_inserts: self.clickhouse_inserts.get(),
            clickhouse_insert_errors: self.clickhouse_insert_errors.get(),
            report_latency_mean_ms: self.report_latency_ms.mean(),
            clickhouse_latency_mean_ms: self.clickhouse_latency_ms.mean(),
            batch_insert_latency_mean_ms: self.batch_insert_latency_ms.mean(),
            rollup_latency_mean_ms: self.rollup_latency_ms.mean(),
            report_latency_buckets: self.report_latency_ms.buckets(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
