use extract::{ApiErrorKind, Strategy};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

pub struct Metrics {
    // Counters
    total_requests: AtomicUsize,
    successful_requests: AtomicUsize,
    failed_requests: AtomicUsize,

    // Timing (in microseconds)
    total_completion_time_us: AtomicU64,
    completions_timed: AtomicUsize,

    // Indexed by Strategy::index / ApiErrorKind::index
    strategies: [AtomicUsize; Strategy::ALL.len()],
    errors: [AtomicUsize; ApiErrorKind::ALL.len()],
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_requests: AtomicUsize::new(0),
            successful_requests: AtomicUsize::new(0),
            failed_requests: AtomicUsize::new(0),
            total_completion_time_us: AtomicU64::new(0),
            completions_timed: AtomicUsize::new(0),
            strategies: std::array::from_fn(|_| AtomicUsize::new(0)),
            errors: std::array::from_fn(|_| AtomicUsize::new(0)),
        })
    }

    pub fn record_request(&self, success: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_completion(&self, duration: Duration) {
        self.total_completion_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.completions_timed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_strategy(&self, strategy: Strategy) {
        self.strategies[strategy.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self, kind: ApiErrorKind) {
        self.errors[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            avg_completion_time_ms: self.avg_time_ms(&self.total_completion_time_us, &self.completions_timed),
            strategies: Strategy::ALL
                .into_iter()
                .map(|s| (s.as_str(), self.strategies[s.index()].load(Ordering::Relaxed)))
                .collect(),
            errors: ApiErrorKind::ALL
                .into_iter()
                .map(|k| (k.as_str(), self.errors[k.index()].load(Ordering::Relaxed)))
                .collect(),
        }
    }

    fn avg_time_ms(&self, total_us: &AtomicU64, count: &AtomicUsize) -> f64 {
        let total = total_us.load(Ordering::Relaxed) as f64;
        let cnt = count.load(Ordering::Relaxed) as f64;
        if cnt > 0.0 {
            total / cnt / 1000.0 // Convert to ms
        } else {
            0.0
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub avg_completion_time_ms: f64,
    pub strategies: BTreeMap<&'static str, usize>,
    pub errors: BTreeMap<&'static str, usize>,
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
        let metrics = Metrics::new();
        metrics.record_request(true);
        metrics.record_request(false);
        metrics.record_strategy(Strategy::FallbackTable);
        metrics.record_strategy(Strategy::FallbackTable);
        metrics.record_error(ApiErrorKind::RateLimit);
        metrics.record_completion(Duration::from_millis(10));
        metrics.record_completion(Duration::from_millis(30));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 2);
        assert_eq!(snapshot.failed_requests, 1);
        assert_eq!(snapshot.strategies["fallback_table"], 2);
        assert_eq!(snapshot.strategies["fenced_block"], 0);
        assert_eq!(snapshot.errors["rate_limit"], 1);
        assert!((snapshot.avg_completion_time_ms - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_average() {
        assert_eq!(Metrics::new().snapshot().avg_completion_time_ms, 0.0);
    }
}
