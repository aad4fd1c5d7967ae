//! Circuit Breaker Registry
//!
//! Per-backend failure-count state machine that stops the router from
//! hammering a backend which keeps failing.
//!
//! ```text
//! +--------+   threshold failures   +------+   recovery_timeout   +-----------+
//! | Closed | ---------------------> | Open | -------------------> | Half-Open |
//! +--------+                        +------+                      +-----------+
//!     ^                                 ^           1 failure           |
//!     |                                 +-------------------------------+
//!     |                   1 success                                     |
//!     +-----------------------------------------------------------------+
//! ```
//!
//! - **Closed**: normal operation
//! - **Open**: rejected until the cool-down elapses
//! - **Half-Open**: entered lazily the first time an open breaker is consulted
//!   after its cool-down; the next outcome decides between closed and open
//!
//! Each backend's record sits behind its own lock so unrelated backends never
//! contend.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

use super::config::CircuitBreakerConfig;

// ============================================================================
// Circuit State
// ============================================================================

/// Circuit breaker state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Requests flow normally
    #[default]
    Closed,

    /// Requests are rejected
    Open,

    /// One trial outcome decides recovery
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half_open"),
        }
    }
}

// ============================================================================
// Breaker Record
// ============================================================================

#[derive(Debug, Default)]
struct BreakerRecord {
    state: CircuitState,
    failure_count: u32,
    last_failure_time: Option<Instant>,
    next_attempt_time: Option<Instant>,
}

impl BreakerRecord {
    /// Move open -> half-open once the cool-down has elapsed
    fn maybe_transition_to_half_open(&mut self, backend_id: &str, now: Instant) {
        if self.state != CircuitState::Open {
            return;
        }
        if self.next_attempt_time.is_some_and(|next| now >= next) {
            self.state = CircuitState::HalfOpen;
            tracing::info!(backend = %backend_id, "Circuit breaker transitioning to half-open");
        }
    }

    fn transition_to_open(&mut self, backend_id: &str, now: Instant, recovery: Duration) {
        self.state = CircuitState::Open;
        self.next_attempt_time = Some(now + recovery);

        tracing::warn!(
            backend = %backend_id,
            failure_count = self.failure_count,
            recovery_ms = recovery.as_millis() as u64,
            "Circuit breaker opened - backend marked unavailable"
        );
    }

    fn transition_to_closed(&mut self, backend_id: &str) {
        let was = self.state;
        self.state = CircuitState::Closed;
        self.failure_count = 0;
        self.next_attempt_time = None;

        if was != CircuitState::Closed {
            tracing::info!(backend = %backend_id, "Circuit breaker closed - backend recovered");
        }
    }

    fn snapshot(&self, backend_id: &str) -> CircuitBreakerSnapshot {
        let now = Instant::now();
        CircuitBreakerSnapshot {
            backend_id: backend_id.to_string(),
            state: self.state,
            failure_count: self.failure_count,
            since_last_failure: self.last_failure_time.map(|t| now.saturating_duration_since(t)),
            retry_in: self
                .next_attempt_time
                .filter(|_| self.state == CircuitState::Open)
                .map(|t| t.saturating_duration_since(now)),
        }
    }
}

/// Point-in-time view of one breaker
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CircuitBreakerSnapshot {
    /// Backend identifier
    pub backend_id: String,
    /// Current state
    pub state: CircuitState,
    /// Consecutive failures since the last success
    pub failure_count: u32,
    /// Time since the most recent failure
    pub since_last_failure: Option<Duration>,
    /// Remaining cool-down while open
    pub retry_in: Option<Duration>,
}

// ============================================================================
// Registry
// ============================================================================

/// Breakers for every backend the router has touched
#[derive(Debug)]
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, Arc<Mutex<BreakerRecord>>>,
    config: CircuitBreakerConfig,
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreakerRegistry {
    /// Create a registry with the given thresholds
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: DashMap::new(),
            config,
        }
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    fn get_or_create(&self, backend_id: &str) -> Arc<Mutex<BreakerRecord>> {
        self.breakers
            .entry(backend_id.to_string())
            .or_default()
            .clone()
    }

    /// Consult the breaker before dispatching to `backend_id`
    ///
    /// An open breaker whose cool-down has elapsed moves to half-open here and
    /// lets the request through.
    pub fn allows_request(&self, backend_id: &str) -> bool {
        if !self.config.enabled {
            return true;
        }
        let Some(record) = self.breakers.get(backend_id).map(|r| r.clone()) else {
            return true;
        };
        let mut record = record.lock();
        record.maybe_transition_to_half_open(backend_id, Instant::now());
        record.state != CircuitState::Open
    }

    /// Record a successful call; always resets the failure count
    pub fn record_success(&self, backend_id: &str) {
        let record = self.get_or_create(backend_id);
        record.lock().transition_to_closed(backend_id);
    }

    /// Record a failed call; returns `true` when this failure opened the breaker
    pub fn record_failure(&self, backend_id: &str) -> bool {
        let now = Instant::now();
        let record = self.get_or_create(backend_id);
        let mut record = record.lock();

        record.failure_count = record.failure_count.saturating_add(1);
        record.last_failure_time = Some(now);

        if !self.config.enabled {
            return false;
        }

        match record.state {
            CircuitState::Closed if record.failure_count >= self.config.failure_threshold => {
                record.transition_to_open(backend_id, now, self.config.recovery_timeout());
                true
            }
            CircuitState::HalfOpen => {
                record.transition_to_open(backend_id, now, self.config.recovery_timeout());
                true
            }
            _ => false,
        }
    }

    /// Current state (closed for unknown backends)
    #[must_use]
    pub fn state(&self, backend_id: &str) -> CircuitState {
        self.breakers
            .get(backend_id)
            .map_or(CircuitState::Closed, |r| r.lock().state)
    }

    /// Snapshot of one breaker, if it exists
    #[must_use]
    pub fn snapshot(&self, backend_id: &str) -> Option<CircuitBreakerSnapshot> {
        self.breakers
            .get(backend_id)
            .map(|r| r.lock().snapshot(backend_id))
    }

    /// Snapshots of all breakers
    #[must_use]
    pub fn all_snapshots(&self) -> Vec<CircuitBreakerSnapshot> {
        self.breakers
            .iter()
            .map(|e| e.value().lock().snapshot(e.key()))
            .collect()
    }

    /// Force a breaker closed with no failures, whatever its history
    pub fn reset(&self, backend_id: &str) {
        let record = self.get_or_create(backend_id);
        let mut record = record.lock();
        record.transition_to_closed(backend_id);
        record.last_failure_time = None;
        tracing::info!(backend = %backend_id, "Circuit breaker manually reset");
    }

    /// Drop every breaker
    pub fn clear(&self) {
        self.breakers.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(threshold: u32, recovery_ms: u64) -> CircuitBreakerRegistry {
        CircuitBreakerRegistry::new(CircuitBreakerConfig {
            enabled: true,
            failure_threshold: threshold,
            recovery_timeout_ms: recovery_ms,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_at_threshold() {
        let breakers = registry(5, 60_000);

        for _ in 0..4 {
            assert!(!breakers.record_failure("x"));
        }
        assert_eq!(breakers.state("x"), CircuitState::Closed);
        assert!(breakers.allows_request("x"));

        assert!(breakers.record_failure("x"));
        assert_eq!(breakers.state("x"), CircuitState::Open);
        assert!(!breakers.allows_request("x"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_after_recovery_timeout() {
        let breakers = registry(2, 1_000);
        breakers.record_failure("x");
        breakers.record_failure("x");

        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(!breakers.allows_request("x"));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(breakers.allows_request("x"));
        assert_eq!(breakers.state("x"), CircuitState::HalfOpen);

        breakers.record_success("x");
        let snapshot = breakers.snapshot("x").unwrap();
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.failure_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens() {
        let breakers = registry(1, 500);
        assert!(breakers.record_failure("x"));

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(breakers.allows_request("x"));

        assert!(breakers.record_failure("x"));
        assert_eq!(breakers.state("x"), CircuitState::Open);
        let snapshot = breakers.snapshot("x").unwrap();
        assert_eq!(snapshot.retry_in, Some(Duration::from_millis(500)));
    }

    #[tokio::test]
    async fn test_success_resets_failure_count() {
        let breakers = registry(3, 1_000);
        breakers.record_failure("x");
        breakers.record_failure("x");
        breakers.record_success("x");
        breakers.record_failure("x");
        breakers.record_failure("x");
        assert_eq!(breakers.state("x"), CircuitState::Closed);
        assert_eq!(breakers.snapshot("x").unwrap().failure_count, 2);
    }

    #[tokio::test]
    async fn test_manual_reset() {
        let breakers = registry(1, 60_000);
        breakers.record_failure("x");
        assert_eq!(breakers.state("x"), CircuitState::Open);

        breakers.reset("x");
        assert_eq!(breakers.state("x"), CircuitState::Closed);
        assert!(breakers.allows_request("x"));
        assert_eq!(breakers.snapshot("x").unwrap().failure_count, 0);
    }

    #[tokio::test]
    async fn test_disabled_always_allows() {
        let breakers = CircuitBreakerRegistry::new(CircuitBreakerConfig {
            enabled: false,
            failure_threshold: 1,
            ..Default::default()
        });
        assert!(!breakers.record_failure("x"));
        assert!(breakers.allows_request("x"));
        assert_eq!(breakers.state("x"), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_breakers_are_independent() {
        let breakers = registry(1, 60_000);
        breakers.record_failure("a");
        assert!(!breakers.allows_request("a"));
        assert!(breakers.allows_request("b"));
        assert_eq!(breakers.all_snapshots().len(), 1);

        breakers.clear();
        assert!(breakers.allows_request("a"));
    }
}
