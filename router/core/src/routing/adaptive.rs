//! Adaptive Weight Tracker
//!
//! A learned per-backend multiplier in `[0.1, 2.0]`. Each completed call
//! pulls the weight toward a target derived from the outcome using
//! exponential smoothing, so repeated failures or slow responses gradually
//! suppress a backend without cutting it off.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

/// Lower bound of any adaptive weight
pub const MIN_WEIGHT: f64 = 0.1;

/// Upper bound of any adaptive weight
pub const MAX_WEIGHT: f64 = 2.0;

/// Target weight for a single outcome
///
/// Failures target the floor; successes target `2 / (latency_s + 1)`, so an
/// instant answer pulls toward the ceiling and a 19 s answer toward the floor.
///
/// The numerator is [`MAX_WEIGHT`] rather than 1 so that repeated fast
/// successes can drift a weight up to the 2.0 ceiling; with a numerator of 1
/// no success could ever raise a weight above 1.0.
#[must_use]
pub fn outcome_target(success: bool, latency_ms: u64) -> f64 {
    if !success {
        return MIN_WEIGHT;
    }
    let latency_s = latency_ms as f64 / 1000.0;
    (MAX_WEIGHT / (latency_s + 1.0)).max(MIN_WEIGHT)
}

/// Per-backend learned multipliers
#[derive(Debug)]
pub struct AdaptiveWeightTracker {
    weights: DashMap<String, Arc<Mutex<f64>>>,
    decay: f64,
    initial_weight: f64,
}

impl Default for AdaptiveWeightTracker {
    fn default() -> Self {
        Self::new(0.95, 1.0)
    }
}

impl AdaptiveWeightTracker {
    /// Create a tracker with the given smoothing factor and starting weight
    #[must_use]
    pub fn new(decay: f64, initial_weight: f64) -> Self {
        Self {
            weights: DashMap::new(),
            decay: decay.clamp(0.0, 1.0),
            initial_weight: initial_weight.clamp(MIN_WEIGHT, MAX_WEIGHT),
        }
    }

    fn cell(&self, backend_id: &str) -> Arc<Mutex<f64>> {
        self.weights
            .entry(backend_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(self.initial_weight)))
            .clone()
    }

    /// Fold one outcome into the backend's weight and return the new value
    pub fn update(&self, backend_id: &str, success: bool, latency_ms: u64) -> f64 {
        let target = outcome_target(success, latency_ms);
        let cell = self.cell(backend_id);
        let mut weight = cell.lock();
        let updated = (*weight * self.decay + target * (1.0 - self.decay)).clamp(MIN_WEIGHT, MAX_WEIGHT);
        *weight = updated;

        tracing::trace!(backend = %backend_id, success, latency_ms, weight = updated, "Adaptive weight updated");
        updated
    }

    /// Current weight (initial weight when unseen)
    #[must_use]
    pub fn weight(&self, backend_id: &str) -> f64 {
        self.weights
            .get(backend_id)
            .map_or(self.initial_weight, |w| *w.lock())
    }

    /// Snapshot of all learned weights
    #[must_use]
    pub fn weights(&self) -> HashMap<String, f64> {
        self.weights
            .iter()
            .map(|e| (e.key().clone(), *e.value().lock()))
            .collect()
    }

    /// Forget what was learned about one backend
    pub fn reset(&self, backend_id: &str) {
        self.weights.remove(backend_id);
    }

    /// Forget everything
    pub fn clear(&self) {
        self.weights.clear();
    }
}
