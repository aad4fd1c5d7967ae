//! Performance Monitor
//!
//! Rolling per-backend history of call outcomes. Success rate and latency
//! are computed on demand from the window; nothing is pre-aggregated.

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

/// Score returned while a backend has too little history
pub const NEUTRAL_PERFORMANCE_SCORE: f64 = 10.0;

/// Upper bound of [`PerformanceMonitor::performance_score`]
pub const MAX_PERFORMANCE_SCORE: f64 = 20.0;

// ============================================================================
// Samples
// ============================================================================

/// One completed call
#[derive(Clone, Copy, Debug)]
pub struct PerformanceSample {
    /// Whether the call succeeded
    pub success: bool,
    /// Observed latency
    pub latency_ms: u64,
    /// When the sample was recorded
    pub recorded_at: Instant,
}

/// Aggregates over the current window
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PerformanceStats {
    /// Samples in the window
    pub sample_count: usize,
    /// Fraction of successful calls (1.0 when empty)
    pub success_rate: f64,
    /// Mean latency of all calls in the window
    pub avg_response_time_ms: f64,
    /// `1 - success_rate`
    pub error_rate: f64,
}

#[derive(Debug, Default)]
struct PerformanceRecord {
    samples: VecDeque<PerformanceSample>,
}

impl PerformanceRecord {
    fn push(&mut self, sample: PerformanceSample, capacity: usize) {
        if self.samples.len() >= capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    fn stats(&self) -> PerformanceStats {
        let count = self.samples.len();
        if count == 0 {
            return PerformanceStats {
                success_rate: 1.0,
                ..Default::default()
            };
        }

        let successes = self.samples.iter().filter(|s| s.success).count();
        let total_latency: u64 = self.samples.iter().map(|s| s.latency_ms).sum();
        let success_rate = successes as f64 / count as f64;

        PerformanceStats {
            sample_count: count,
            success_rate,
            avg_response_time_ms: total_latency as f64 / count as f64,
            error_rate: 1.0 - success_rate,
        }
    }
}

// ============================================================================
// Monitor
// ============================================================================

/// Rolling outcome store keyed by backend id
#[derive(Debug)]
pub struct PerformanceMonitor {
    records: DashMap<String, Arc<Mutex<PerformanceRecord>>>,
    window_size: usize,
    min_samples: usize,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(100, 5)
    }
}

impl PerformanceMonitor {
    /// Create a monitor keeping `window_size` samples per backend
    #[must_use]
    pub fn new(window_size: usize, min_samples: usize) -> Self {
        Self {
            records: DashMap::new(),
            window_size: window_size.max(1),
            min_samples,
        }
    }

    fn record_for(&self, backend_id: &str) -> Arc<Mutex<PerformanceRecord>> {
        self.records
            .entry(backend_id.to_string())
            .or_default()
            .clone()
    }

    /// Record a completed call
    pub fn record(&self, backend_id: &str, success: bool, latency_ms: u64) {
        let sample = PerformanceSample {
            success,
            latency_ms,
            recorded_at: Instant::now(),
        };
        self.record_for(backend_id)
            .lock()
            .push(sample, self.window_size);
    }

    /// Aggregates for one backend (empty stats when unseen)
    #[must_use]
    pub fn stats(&self, backend_id: &str) -> PerformanceStats {
        match self.records.get(backend_id) {
            Some(record) => record.lock().stats(),
            None => PerformanceRecord::default().stats(),
        }
    }

    /// Historical performance score in `[0, 20]`
    ///
    /// Backends with fewer than the minimum sample count score a neutral 10
    /// so that new backends are neither favoured nor punished.
    #[must_use]
    pub fn performance_score(&self, backend_id: &str) -> f64 {
        let stats = self.stats(backend_id);
        if stats.sample_count < self.min_samples {
            return NEUTRAL_PERFORMANCE_SCORE;
        }

        let latency_factor = (1.0 - stats.avg_response_time_ms / 10_000.0).max(0.0);
        (stats.success_rate * 15.0 + latency_factor * 5.0).clamp(0.0, MAX_PERFORMANCE_SCORE)
    }

    /// Most recent sample for a backend
    #[must_use]
    pub fn last_sample(&self, backend_id: &str) -> Option<PerformanceSample> {
        self.records
            .get(backend_id)
            .and_then(|r| r.lock().samples.back().copied())
    }

    /// Backend ids with any history
    #[must_use]
    pub fn tracked_backends(&self) -> Vec<String> {
        self.records.iter().map(|e| e.key().clone()).collect()
    }

    /// Drop all history
    pub fn clear(&self) {
        self.records.clear();
    }
}
