//! Backend Health Monitoring
//!
//! Tracks an advisory health record per backend:
//! - Response time, error rate and availability as exponential moving averages
//! - A derived `is_healthy` flag and human-readable issues
//! - Optional periodic synthetic probes through the generation primitive
//!
//! Live calls and probes feed the same [`HealthMonitor::observe`] path, so a
//! probe and a concurrent request can never overwrite each other's update.
//! Health only influences scoring; it never blocks a request the way an
//! open circuit breaker does.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::config::HealthCheckConfig;
use super::primitive::{GenerationPrimitive, GenerationRequest};

/// Smoothing factor for all health averages
pub const HEALTH_EMA_ALPHA: f64 = 0.1;

/// Availability (percent) at or below which a backend is unhealthy
pub const MIN_AVAILABILITY: f64 = 50.0;

/// Error rate at or above which a backend is unhealthy
pub const MAX_ERROR_RATE: f64 = 0.5;

/// Average response time flagged as an issue
pub const SLOW_RESPONSE_MS: f64 = 5_000.0;

/// Scoring multiplier applied to unhealthy backends
pub const UNHEALTHY_RELIABILITY_FACTOR: f64 = 0.5;

// ============================================================================
// Health Status
// ============================================================================

/// One call outcome as seen by the health monitor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Observation {
    /// Whether the call succeeded
    pub success: bool,
    /// Observed latency
    pub response_time_ms: u64,
}

impl Observation {
    /// Successful call
    #[must_use]
    pub fn success(response_time_ms: u64) -> Self {
        Self {
            success: true,
            response_time_ms,
        }
    }

    /// Failed call
    #[must_use]
    pub fn failure(response_time_ms: u64) -> Self {
        Self {
            success: false,
            response_time_ms,
        }
    }
}

/// Health record for one backend
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelHealthStatus {
    /// Backend identifier
    pub backend_id: String,

    /// `availability > 50 && error_rate < 0.5`
    pub is_healthy: bool,

    /// When the record was last updated
    pub last_checked: DateTime<Utc>,

    /// Smoothed response time
    pub response_time_ms: f64,

    /// Smoothed error rate (0.0 - 1.0)
    pub error_rate: f64,

    /// Smoothed availability (0 - 100)
    pub availability: f64,

    /// Threshold violations, regenerated on every update
    pub issues: Vec<String>,

    /// Observations folded in so far
    pub observations: u64,
}

impl ModelHealthStatus {
    fn new(backend_id: &str) -> Self {
        Self {
            backend_id: backend_id.to_string(),
            is_healthy: true,
            last_checked: Utc::now(),
            response_time_ms: 0.0,
            error_rate: 0.0,
            availability: 100.0,
            issues: Vec::new(),
            observations: 0,
        }
    }

    fn apply(&mut self, observation: Observation, alpha: f64) {
        let latency = observation.response_time_ms as f64;
        let (error_sample, availability_sample) = if observation.success {
            (0.0, 100.0)
        } else {
            (1.0, 0.0)
        };

        self.response_time_ms = if self.observations == 0 {
            latency
        } else {
            alpha * latency + (1.0 - alpha) * self.response_time_ms
        };
        self.error_rate = alpha * error_sample + (1.0 - alpha) * self.error_rate;
        self.availability = alpha * availability_sample + (1.0 - alpha) * self.availability;
        self.observations += 1;
        self.last_checked = Utc::now();

        self.is_healthy = self.availability > MIN_AVAILABILITY && self.error_rate < MAX_ERROR_RATE;
        self.issues = self.current_issues();
    }

    fn current_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.availability <= MIN_AVAILABILITY {
            issues.push(format!("availability {:.1}% at or below {MIN_AVAILABILITY}%", self.availability));
        }
        if self.error_rate >= MAX_ERROR_RATE {
            issues.push(format!("error rate {:.2} at or above {MAX_ERROR_RATE}", self.error_rate));
        }
        if self.response_time_ms > SLOW_RESPONSE_MS {
            issues.push(format!(
                "average response time {:.0}ms above {SLOW_RESPONSE_MS}ms",
                self.response_time_ms
            ));
        }
        issues
    }
}

// ============================================================================
// Health Monitor
// ============================================================================

/// Advisory health records plus the optional probe task
#[derive(Debug)]
pub struct HealthMonitor {
    records: DashMap<String, Arc<Mutex<ModelHealthStatus>>>,
    alpha: f64,
    probe_task: Mutex<Option<JoinHandle<()>>>,
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthMonitor {
    /// Create an empty monitor
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            alpha: HEALTH_EMA_ALPHA,
            probe_task: Mutex::new(None),
        }
    }

    fn get_or_create(&self, backend_id: &str) -> Arc<Mutex<ModelHealthStatus>> {
        self.records
            .entry(backend_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ModelHealthStatus::new(backend_id))))
            .clone()
    }

    /// Fold one outcome into the backend's record
    pub fn observe(&self, backend_id: &str, observation: Observation) {
        let record = self.get_or_create(backend_id);
        let mut status = record.lock();
        let was_healthy = status.is_healthy;
        status.apply(observation, self.alpha);

        if was_healthy && !status.is_healthy {
            tracing::warn!(
                backend = %backend_id,
                availability = status.availability,
                error_rate = status.error_rate,
                "Backend became unhealthy"
            );
        } else if !was_healthy && status.is_healthy {
            tracing::info!(backend = %backend_id, "Backend healthy again");
        }
    }

    /// Health record for one backend
    #[must_use]
    pub fn status(&self, backend_id: &str) -> Option<ModelHealthStatus> {
        self.records.get(backend_id).map(|r| r.lock().clone())
    }

    /// All health records, sorted by backend id
    #[must_use]
    pub fn all_statuses(&self) -> Vec<ModelHealthStatus> {
        let mut statuses: Vec<_> = self.records.iter().map(|e| e.value().lock().clone()).collect();
        statuses.sort_by(|a, b| a.backend_id.cmp(&b.backend_id));
        statuses
    }

    /// Whether a backend is healthy (unknown backends count as healthy)
    #[must_use]
    pub fn is_healthy(&self, backend_id: &str) -> bool {
        self.records
            .get(backend_id)
            .map_or(true, |r| r.lock().is_healthy)
    }

    /// Scoring multiplier: 1.0 when healthy or unknown, 0.5 otherwise
    #[must_use]
    pub fn reliability_factor(&self, backend_id: &str) -> f64 {
        if self.is_healthy(backend_id) {
            1.0
        } else {
            UNHEALTHY_RELIABILITY_FACTOR
        }
    }

    /// Probe every backend once, concurrently, each bounded by `timeout`
    pub async fn check_now(
        &self,
        primitive: &dyn GenerationPrimitive,
        backend_ids: &[String],
        timeout: Duration,
    ) {
        let probes = backend_ids.iter().map(|id| async move {
            let started = Instant::now();
            let success = if primitive.is_available(id) {
                let chain = vec![id.clone()];
                let request = GenerationRequest::probe();
                matches!(
                    tokio::time::timeout(timeout, primitive.generate(&chain, &request)).await,
                    Ok(Ok(_))
                )
            } else {
                false
            };
            (id, success, started.elapsed().as_millis() as u64)
        });

        for (id, success, elapsed_ms) in join_all(probes).await {
            tracing::debug!(backend = %id, success, elapsed_ms, "Health probe finished");
            self.observe(id, Observation { success, response_time_ms: elapsed_ms });
        }
    }

    /// Start periodic probes; returns `false` when disabled or already running
    pub fn start(
        self: &Arc<Self>,
        primitive: Arc<dyn GenerationPrimitive>,
        backend_ids: Vec<String>,
        config: &HealthCheckConfig,
    ) -> bool {
        let Some(interval) = config.interval() else {
            tracing::debug!("Health checks disabled");
            return false;
        };

        let mut task = self.probe_task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return false;
        }

        let timeout = config.timeout();
        let monitor: Weak<Self> = Arc::downgrade(self);
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(monitor) = monitor.upgrade() else {
                    break;
                };
                monitor.check_now(primitive.as_ref(), &backend_ids, timeout).await;
            }
        }));

        tracing::info!(interval_ms = interval.as_millis() as u64, "Health checks started");
        true
    }

    /// Stop periodic probes; safe to call repeatedly
    pub fn stop(&self) {
        if let Some(task) = self.probe_task.lock().take() {
            task.abort();
            tracing::info!("Health checks stopped");
        }
    }

    /// Whether the probe task is running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.probe_task
            .lock()
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    /// Drop all health records
    pub fn clear(&self) {
        self.records.clear();
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// Tests
// ============================================================================
