//! Observability: timing histograms and event counters for the dialog core.
//! Histograms keep the last 1024 samples per metric and report p50/p95/p99.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// A span measuring elapsed time from creation to explicit end.
/// Dropping it without `finish` records nothing (used on error paths).
pub struct TimingSpan {
    name: &'static str,
    start: Instant,
    registry: Arc<MetricsRegistry>,
}

impl TimingSpan {
    fn new(name: &'static str, registry: Arc<MetricsRegistry>) -> Self {
        Self {
            name,
            start: Instant::now(),
            registry,
        }
    }

    /// End the span, recording elapsed duration in microseconds.
    pub fn finish(self) -> f64 {
        let elapsed_us = self.start.elapsed().as_micros() as f64;
        self.registry.record(self.name, elapsed_us);
        elapsed_us
    }
}

/// Fixed-capacity ring buffer for histogram samples.
struct SampleRing {
    samples: Vec<f64>,
    pos: usize,
    count: usize,
}

impl SampleRing {
    fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity],
            pos: 0,
            count: 0,
        }
    }

    fn push(&mut self, value: f64) {
        let capacity = self.samples.len();
        self.samples[self.pos] = value;
        self.pos = (self.pos + 1) % capacity;
        self.count = (self.count + 1).min(capacity);
    }

    fn percentile(&self, p: f64) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self.samples[..self.count].to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let idx = ((p / 100.0) * (self.count as f64 - 1.0)).round() as usize;
        sorted[idx.min(self.count - 1)]
    }
}

#[derive(Default)]
struct Tables {
    histograms: HashMap<&'static str, SampleRing>,
    counters: HashMap<&'static str, u64>,
}

/// Stores histograms and counters for all named metrics.
pub struct MetricsRegistry {
    tables: Mutex<Tables>,
    ring_capacity: usize,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            ring_capacity: 1024,
        }
    }

    /// Record a sample (in microseconds) for the named metric.
    pub fn record(&self, name: &'static str, value_us: f64) {
        let mut tables = self.tables.lock();
        let capacity = self.ring_capacity;
        tables
            .histograms
            .entry(name)
            .or_insert_with(|| SampleRing::new(capacity))
            .push(value_us);
        tracing::trace!(metric = name, value_us, "metric_recorded");
    }

    pub fn increment(&self, name: &'static str) {
        *self.tables.lock().counters.entry(name).or_insert(0) += 1;
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.tables.lock().counters.get(name).copied().unwrap_or(0)
    }

    /// Start a timing span that records on finish.
    pub fn span(self: &Arc<Self>, name: &'static str) -> TimingSpan {
        TimingSpan::new(name, Arc::clone(self))
    }

    /// Percentile for a metric (p value 0-100), in microseconds.
    pub fn percentile(&self, name: &str, p: f64) -> f64 {
        self.tables
            .lock()
            .histograms
            .get(name)
            .map(|ring| ring.percentile(p))
            .unwrap_or(0.0)
    }

    /// p50/p95/p99 of every histogram.
    pub fn summary(&self) -> HashMap<String, MetricSummary> {
        let tables = self.tables.lock();
        tables
            .histograms
            .iter()
            .map(|(&name, ring)| {
                (
                    name.to_string(),
                    MetricSummary {
                        p50_us: ring.percentile(50.0),
                        p95_us: ring.percentile(95.0),
                        p99_us: ring.percentile(99.0),
                        count: ring.count,
                    },
                )
            })
            .collect()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricSummary {
    pub p50_us: f64,
    pub p95_us: f64,
    pub p99_us: f64,
    pub count: usize,
}

/// Well-known metric names (constants to avoid typos).
pub mod metric_names {
    pub const CACHE_PUT: &str = "t_cache_put";
    pub const CACHE_GET: &str = "t_cache_get";
    pub const RENDER: &str = "t_render";
    pub const TRANSLATE: &str = "t_translate";
    pub const HANDLE_ACTION: &str = "t_handle_action";

    pub const CACHE_EVICTIONS: &str = "cache_evictions";
    pub const DIALOGS_STARTED: &str = "dialogs_started";
    pub const DIALOGS_COMPLETED: &str = "dialogs_completed";
    pub const DIALOGS_FAILED: &str = "dialogs_failed";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles_over_samples() {
        let registry = MetricsRegistry::new();
        for v in 1..=100 {
            registry.record(metric_names::RENDER, v as f64);
        }
        assert_eq!(registry.percentile(metric_names::RENDER, 50.0), 51.0);
        assert_eq!(registry.percentile(metric_names::RENDER, 99.0), 99.0);
        assert_eq!(registry.summary()[metric_names::RENDER].count, 100);
        assert_eq!(registry.percentile("unknown", 50.0), 0.0);
    }

    #[test]
    fn ring_keeps_latest_samples() {
        let mut ring = SampleRing::new(4);
        for v in [100.0, 1.0, 2.0, 3.0, 4.0] {
            ring.push(v);
        }
        assert_eq!(ring.count, 4);
        assert_eq!(ring.percentile(100.0), 4.0);
    }

    #[test]
    fn counters_and_spans() {
        let registry = Arc::new(MetricsRegistry::new());
        registry.increment(metric_names::DIALOGS_STARTED);
        registry.increment(metric_names::DIALOGS_STARTED);
        assert_eq!(registry.counter(metric_names::DIALOGS_STARTED), 2);
        registry.span(metric_names::TRANSLATE).finish();
        assert_eq!(registry.summary()[metric_names::TRANSLATE].count, 1);
    }
}
