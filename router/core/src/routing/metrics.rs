//! Router Metrics
//!
//! Process-local counters for the routing layer:
//! - Request outcomes (success, failure, fallback)
//! - Pre-flight rejections (rate limit, no eligible backend)
//! - Circuit breaker trips
//! - Routing and response latency distributions

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::time::Instant;

use super::circuit_breaker::CircuitState;

// ============================================================================
// Histogram
// ============================================================================

/// Fixed-bucket histogram
#[derive(Debug)]
pub struct Histogram {
    /// Upper bucket boundaries
    buckets: Vec<f64>,
    counts: Vec<AtomicU64>,
    total_count: AtomicU64,
    sum: AtomicU64,
    min: AtomicU64,
    max: AtomicU64,
}

impl Histogram {
    /// Create a histogram with the given upper bounds (must be non-empty)
    #[must_use]
    pub fn new(buckets: Vec<f64>) -> Self {
        let buckets = if buckets.is_empty() { vec![f64::MAX] } else { buckets };
        let counts = buckets.iter().map(|_| AtomicU64::new(0)).collect();
        Self {
            buckets,
            counts,
            total_count: AtomicU64::new(0),
            sum: AtomicU64::new(0),
            min: AtomicU64::new(u64::MAX),
            max: AtomicU64::new(0),
        }
    }

    /// Millisecond buckets from 1ms to 60s
    #[must_use]
    pub fn latency_default() -> Self {
        Self::new(vec![
            1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
            30000.0, 60000.0,
        ])
    }

    /// Record a value; values above the last bound land in the last bucket
    pub fn record(&self, value: f64) {
        let bucket_idx = self
            .buckets
            .iter()
            .position(|&b| value <= b)
            .unwrap_or(self.buckets.len() - 1);

        let value_u64 = value.max(0.0) as u64;
        self.counts[bucket_idx].fetch_add(1, Ordering::Relaxed);
        self.total_count.fetch_add(1, Ordering::Relaxed);
        self.sum.fetch_add(value_u64, Ordering::Relaxed);
        self.min.fetch_min(value_u64, Ordering::Relaxed);
        self.max.fetch_max(value_u64, Ordering::Relaxed);
    }

    /// Point-in-time copy
    #[must_use]
    pub fn snapshot(&self) -> HistogramSnapshot {
        let counts: Vec<u64> = self
            .counts
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .collect();
        let total = self.total_count.load(Ordering::Relaxed);
        let sum = self.sum.load(Ordering::Relaxed);
        let min = self.min.load(Ordering::Relaxed);

        HistogramSnapshot {
            buckets: self.buckets.clone(),
            counts,
            total,
            sum,
            min: if min == u64::MAX { 0 } else { min },
            max: self.max.load(Ordering::Relaxed),
            mean: if total > 0 { sum as f64 / total as f64 } else { 0.0 },
        }
    }

    fn reset(&self) {
        for count in &self.counts {
            count.store(0, Ordering::Relaxed);
        }
        self.total_count.store(0, Ordering::Relaxed);
        self.sum.store(0, Ordering::Relaxed);
        self.min.store(u64::MAX, Ordering::Relaxed);
        self.max.store(0, Ordering::Relaxed);
    }
}

/// Snapshot of histogram data
#[derive(Clone, Debug, Serialize)]
pub struct HistogramSnapshot {
    pub buckets: Vec<f64>,
    pub counts: Vec<u64>,
    pub total: u64,
    pub sum: u64,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
}

impl HistogramSnapshot {
    /// Upper bound of the bucket containing the `p` quantile
    #[must_use]
    pub fn percentile(&self, p: f64) -> f64 {
        if self.total == 0 {
            return 0.0;
        }

        let target = ((self.total as f64 * p).ceil() as u64).max(1);
        let mut cumulative = 0u64;

        for (i, &count) in self.counts.iter().enumerate() {
            cumulative += count;
            if cumulative >= target {
                return self.buckets[i];
            }
        }

        *self.buckets.last().unwrap_or(&0.0)
    }

    pub fn p50(&self) -> f64 {
        self.percentile(0.5)
    }

    pub fn p99(&self) -> f64 {
        self.percentile(0.99)
    }
}

// ============================================================================
// Counter
// ============================================================================

/// A simple atomic counter
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    fn reset(&self) {
        self.value.store(0, Ordering::Relaxed);
    }
}

// ============================================================================
// Per-Backend View
// ============================================================================

/// Public per-backend metrics
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelMetrics {
    /// Backend identifier
    pub backend_id: String,
    /// Successful fraction of the rolling window
    pub success_rate: f64,
    /// Mean latency of the rolling window
    pub avg_response_time_ms: f64,
    /// Failed fraction of the rolling window
    pub error_rate: f64,
    /// Samples in the rolling window
    pub sample_count: usize,
    /// Breaker state
    pub circuit_breaker_state: CircuitState,
    /// Learned multiplier
    pub adaptive_weight: f64,
}

// ============================================================================
// Router Metrics
// ============================================================================

/// Counters for the whole router
#[derive(Debug)]
pub struct RouterMetrics {
    /// Requests accepted past the rate limiter
    pub requests: Counter,
    /// Requests answered
    pub successes: Counter,
    /// Requests that exhausted the chain
    pub failures: Counter,
    /// Fallback steps taken across all requests
    pub fallbacks: Counter,
    /// Requests rejected by the rate limiter
    pub rate_limited: Counter,
    /// Requests with no eligible backend
    pub no_eligible: Counter,
    /// Breakers opened by failures
    pub circuit_breaker_trips: Counter,
    /// Requests re-routed around an open breaker
    pub circuit_breaker_reroutes: Counter,
    /// Time spent analysing and selecting (ms)
    pub routing_latency: Histogram,
    /// Time spent in the generation primitive (ms)
    pub response_time: Histogram,
    started_at: Instant,
}

impl Default for RouterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            requests: Counter::default(),
            successes: Counter::default(),
            failures: Counter::default(),
            fallbacks: Counter::default(),
            rate_limited: Counter::default(),
            no_eligible: Counter::default(),
            circuit_breaker_trips: Counter::default(),
            circuit_breaker_reroutes: Counter::default(),
            routing_latency: Histogram::latency_default(),
            response_time: Histogram::latency_default(),
            started_at: Instant::now(),
        }
    }

    /// Aggregate view
    #[must_use]
    pub fn summary(&self) -> RouterMetricsSummary {
        let requests = self.requests.get();
        let successes = self.successes.get();
        let routing = self.routing_latency.snapshot();
        let response = self.response_time.snapshot();

        RouterMetricsSummary {
            uptime_secs: self.started_at.elapsed().as_secs(),
            total_requests: requests,
            successes,
            failures: self.failures.get(),
            fallbacks: self.fallbacks.get(),
            rate_limited: self.rate_limited.get(),
            no_eligible: self.no_eligible.get(),
            circuit_breaker_trips: self.circuit_breaker_trips.get(),
            circuit_breaker_reroutes: self.circuit_breaker_reroutes.get(),
            success_rate: if requests > 0 {
                successes as f64 / requests as f64
            } else {
                1.0
            },
            routing_latency_p50_ms: routing.p50(),
            routing_latency_p99_ms: routing.p99(),
            response_time_mean_ms: response.mean,
            response_time_p99_ms: response.p99(),
        }
    }

    /// Zero every counter
    pub fn reset(&self) {
        for counter in [
            &self.requests,
            &self.successes,
            &self.failures,
            &self.fallbacks,
            &self.rate_limited,
            &self.no_eligible,
            &self.circuit_breaker_trips,
            &self.circuit_breaker_reroutes,
        ] {
            counter.reset();
        }
        self.routing_latency.reset();
        self.response_time.reset();
    }
}

/// Serializable router-wide summary
#[derive(Clone, Debug, Serialize)]
pub struct RouterMetricsSummary {
    pub uptime_secs: u64,
    pub total_requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub fallbacks: u64,
    pub rate_limited: u64,
    pub no_eligible: u64,
    pub circuit_breaker_trips: u64,
    pub circuit_breaker_reroutes: u64,
    pub success_rate: f64,
    pub routing_latency_p50_ms: f64,
    pub routing_latency_p99_ms: f64,
    pub response_time_mean_ms: f64,
    pub response_time_p99_ms: f64,
}
