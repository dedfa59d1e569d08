use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Per-run counters, shared by every worker of a run.
pub struct RunMetrics {
    proteins: AtomicUsize,
    annotations: AtomicUsize,
    requests: AtomicUsize,
    records: AtomicUsize,
    parse_errors: AtomicUsize,
    expanded_rows: AtomicUsize,
    failures: AtomicUsize,

    // Timing (in microseconds)
    total_source_time_us: AtomicU64,
    total_generation_time_us: AtomicU64,
}

impl RunMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            proteins: AtomicUsize::new(0),
            annotations: AtomicUsize::new(0),
            requests: AtomicUsize::new(0),
            records: AtomicUsize::new(0),
            parse_errors: AtomicUsize::new(0),
            expanded_rows: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
            total_source_time_us: AtomicU64::new(0),
            total_generation_time_us: AtomicU64::new(0),
        })
    }

    pub fn record_protein(&self, duration: Duration, annotations: usize) {
        self.proteins.fetch_add(1, Ordering::Relaxed);
        self.annotations.fetch_add(annotations, Ordering::Relaxed);
        self.total_source_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_generation(&self, duration: Duration) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.total_generation_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_parsed(&self, records: usize, parse_errors: usize, expanded_rows: usize) {
        self.records.fetch_add(records, Ordering::Relaxed);
        self.parse_errors.fetch_add(parse_errors, Ordering::Relaxed);
        self.expanded_rows.fetch_add(expanded_rows, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            proteins: self.proteins.load(Ordering::Relaxed),
            annotations: self.annotations.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
            records: self.records.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            expanded_rows: self.expanded_rows.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            avg_source_time_ms: avg_time_ms(&self.total_source_time_us, &self.proteins),
            avg_generation_time_ms: avg_time_ms(&self.total_generation_time_us, &self.requests),
        }
    }
}

fn avg_time_ms(total_us: &AtomicU64, count: &AtomicUsize) -> f64 {
    let total = total_us.load(Ordering::Relaxed) as f64;
    let cnt = count.load(Ordering::Relaxed) as f64;
    if cnt > 0.0 {
        total / cnt / 1000.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MetricsSnapshot {
    pub proteins: usize,
    pub annotations: usize,
    pub requests: usize,
    pub records: usize,
    pub parse_errors: usize,
    pub expanded_rows: usize,
    pub failures: usize,
    pub avg_source_time_ms: f64,
    pub avg_generation_time_ms: f64,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts() {
        let metrics = RunMetrics::new();
        metrics.record_protein(Duration::from_millis(4), 3);
        metrics.record_generation(Duration::from_millis(10));
        metrics.record_generation(Duration::from_millis(30));
        metrics.record_parsed(2, 1, 3);
        metrics.record_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.proteins, 1);
        assert_eq!(snapshot.annotations, 3);
        assert_eq!(snapshot.requests, 2);
        assert_eq!(snapshot.parse_errors, 1);
        assert_eq!(snapshot.expanded_rows, 3);
        assert_eq!(snapshot.failures, 1);
        assert!((snapshot.avg_generation_time_ms - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_averages_are_zero() {
        let snapshot = RunMetrics::new().snapshot();
        assert_eq!(snapshot.avg_source_time_ms, 0.0);
        assert_eq!(snapshot.avg_generation_time_ms, 0.0);
    }
}
