//! In-process counters, gauges and histograms.
//!
//! The registry publishes immutable snapshots: readers clone an `Arc` to
//! the current map and never block; registering a new instrument builds a
//! new map and swaps it in. Metric sinks are external consumers of
//! [`Metrics::read_all`]; exporting is out of scope here.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use quasar_types::parking_lot::RwLock;

#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn add(&self, delta: u64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn incr(&self) {
        self.add(1);
    }

    pub fn read(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }

    pub fn add(&self, delta: i64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn read(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Fixed-bucket histogram: `buckets` upper bounds plus an overflow bucket.
#[derive(Debug)]
pub struct Histogram {
    bounds: Vec<u64>,
    buckets: Vec<AtomicU64>,
    sum: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new(bounds: Vec<u64>) -> Self {
        let buckets = (0..=bounds.len()).map(|_| AtomicU64::new(0)).collect();
        Self {
            bounds,
            buckets,
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn record(&self, value: u64) {
        let index = self
            .bounds
            .iter()
            .position(|&bound| value <= bound)
            .unwrap_or(self.bounds.len());
        self.buckets[index].fetch_add(1, Ordering::Relaxed);
        self.sum.fetch_add(value, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn avg(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }
        self.sum.load(Ordering::Relaxed) as f64 / count as f64
    }

    /// Upper bound of the bucket holding the p-th percentile observation.
    pub fn percentile(&self, p: f64) -> u64 {
        let total = self.count();
        if total == 0 {
            return 0;
        }
        let rank = ((p / 100.0) * total as f64).ceil() as u64;
        let mut seen = 0;
        for (index, bucket) in self.buckets.iter().enumerate() {
            seen += bucket.load(Ordering::Relaxed);
            if seen >= rank {
                return self.bounds.get(index).copied().unwrap_or(u64::MAX);
            }
        }
        u64::MAX
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub counters: HashMap<String, u64>,
    pub gauges: HashMap<String, i64>,
    pub histogram_counts: HashMap<String, u64>,
}

/// The instrument registry. Lookup is read-mostly; registration swaps a new
/// immutable map in.
#[derive(Default)]
pub struct Metrics {
    counters: RwLock<Arc<HashMap<String, Arc<Counter>>>>,
    gauges: RwLock<Arc<HashMap<String, Arc<Gauge>>>>,
    histograms: RwLock<Arc<HashMap<String, Arc<Histogram>>>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str) -> Arc<Counter> {
        if let Some(counter) = self.counters.read().get(name) {
            return counter.clone();
        }
        let mut guard = self.counters.write();
        if let Some(counter) = guard.get(name) {
            return counter.clone();
        }
        let counter = Arc::new(Counter::default());
        let mut next = HashMap::clone(&guard);
        next.insert(name.to_string(), counter.clone());
        *guard = Arc::new(next);
        counter
    }

    pub fn gauge(&self, name: &str) -> Arc<Gauge> {
        if let Some(gauge) = self.gauges.read().get(name) {
            return gauge.clone();
        }
        let mut guard = self.gauges.write();
        if let Some(gauge) = guard.get(name) {
            return gauge.clone();
        }
        let gauge = Arc::new(Gauge::default());
        let mut next = HashMap::clone(&guard);
        next.insert(name.to_string(), gauge.clone());
        *guard = Arc::new(next);
        gauge
    }

    pub fn histogram(&self, name: &str, bounds: Vec<u64>) -> Arc<Histogram> {
        if let Some(histogram) = self.histograms.read().get(name) {
            return histogram.clone();
        }
        let mut guard = self.histograms.write();
        if let Some(histogram) = guard.get(name) {
            return histogram.clone();
        }
        let histogram = Arc::new(Histogram::new(bounds));
        let mut next = HashMap::clone(&guard);
        next.insert(name.to_string(), histogram.clone());
        *guard = Arc::new(next);
        histogram
    }

    /// A point-in-time view for reporters. Readers of individual
    /// instruments never pay for this.
    pub fn read_all(&self) -> MetricsSnapshot {
        let counters = self.counters.read().clone();
        let gauges = self.gauges.read().clone();
        let histograms = self.histograms.read().clone();
        MetricsSnapshot {
            counters: counters.iter().map(|(k, v)| (k.clone(), v.read())).collect(),
            gauges: gauges.iter().map(|(k, v)| (k.clone(), v.read())).collect(),
            histogram_counts: histograms
                .iter()
                .map(|(k, v)| (k.clone(), v.count()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_accumulates() {
        let metrics = Metrics::new();
        let requests = metrics.counter("requests");
        requests.incr();
        requests.add(4);
        assert_eq!(requests.read(), 5);
        // Same name resolves to the same instrument.
        assert_eq!(metrics.counter("requests").read(), 5);
    }

    #[test]
    fn gauge_sets_and_adds() {
        let metrics = Metrics::new();
        let sessions = metrics.gauge("sessions");
        sessions.set(3);
        sessions.add(-1);
        assert_eq!(sessions.read(), 2);
    }

    #[test]
    fn histogram_buckets_and_percentiles() {
        let histogram = Histogram::new(vec![10, 100, 1000]);
        for value in [1u64, 5, 50, 500, 5000] {
            histogram.record(value);
        }
        assert_eq!(histogram.count(), 5);
        assert!((histogram.avg() - 1111.2).abs() < 1e-9);
        assert_eq!(histogram.percentile(50.0), 100);
        assert_eq!(histogram.percentile(99.0), u64::MAX);
    }

    #[test]
    fn snapshot_reflects_registered_instruments() {
        let metrics = Metrics::new();
        metrics.counter("a").add(2);
        metrics.gauge("b").set(7);
        metrics.histogram("c", vec![10]).record(3);
        let snapshot = metrics.read_all();
        assert_eq!(snapshot.counters["a"], 2);
        assert_eq!(snapshot.gauges["b"], 7);
        assert_eq!(snapshot.histogram_counts["c"], 1);
    }

    #[test]
    fn readers_hold_a_stable_snapshot() {
        let metrics = Metrics::new();
        metrics.counter("first").incr();
        let held = metrics.counters.read().clone();
        metrics.counter("second").incr();
        // The held snapshot does not see the later registration.
        assert!(held.get("second").is_none());
        assert!(metrics.counters.read().get("second").is_some());
    }
}
