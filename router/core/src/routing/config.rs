//! Routing Configuration
//!
//! Configuration types for circuit breaking, adaptive learning, health
//! checks, rate limiting, fallback ordering and backend selection.

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Circuit Breaker
// ============================================================================

/// Per-backend circuit breaker settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Whether breakers are consulted at all
    pub enabled: bool,

    /// Consecutive failures before the breaker opens
    pub failure_threshold: u32,

    /// How long an open breaker rejects requests
    pub recovery_timeout_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            recovery_timeout_ms: 60_000,
        }
    }
}

impl CircuitBreakerConfig {
    /// Cool-down as a `Duration`
    #[must_use]
    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_millis(self.recovery_timeout_ms)
    }
}

// ============================================================================
// Adaptive Learning
// ============================================================================

/// Adaptive weight settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// Multiply the performance term by the learned weight
    pub enabled: bool,

    /// Smoothing factor applied to the previous weight (0.0 - 1.0, exclusive)
    pub decay: f64,

    /// Weight assigned to a backend on first sight
    pub initial_weight: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            decay: 0.95,
            initial_weight: 1.0,
        }
    }
}

// ============================================================================
// Health Checks
// ============================================================================

/// Periodic health probe settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Probe interval; 0 disables periodic probes
    pub interval_ms: u64,

    /// Upper bound for a single probe
    pub timeout_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_ms: 60_000,
            timeout_ms: 10_000,
        }
    }
}

impl HealthCheckConfig {
    /// Probe interval, `None` when probes are disabled
    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_ms > 0).then(|| Duration::from_millis(self.interval_ms))
    }

    /// Probe timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ============================================================================
// Rate Limiting
// ============================================================================

/// Fixed-window rate limit settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Whether requests are counted
    pub enabled: bool,

    /// Requests accepted per context per window
    pub requests_per_window: u32,

    /// Window length
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_window: 100,
            window_ms: 60_000,
        }
    }
}

impl RateLimitConfig {
    /// Window length as a `Duration`
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

// ============================================================================
// Fallback
// ============================================================================

/// Ordering applied to fallback backends
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    /// Best historical success rate and latency first
    #[default]
    Performance,
    /// Cheapest first
    Cost,
    /// Healthiest first (breaker state, then health record)
    Reliability,
}

impl std::str::FromStr for FallbackStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "performance" => Ok(Self::Performance),
            "cost" => Ok(Self::Cost),
            "reliability" => Ok(Self::Reliability),
            other => Err(format!("unknown fallback strategy: {other}")),
        }
    }
}

/// Fallback chain settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Reorder fallbacks by `strategy` instead of keeping score order
    pub intelligent: bool,

    /// Ordering used when `intelligent` is set
    pub strategy: FallbackStrategy,

    /// Maximum number of fallbacks behind the primary
    pub max_fallbacks: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            intelligent: true,
            strategy: FallbackStrategy::Performance,
            max_fallbacks: 3,
        }
    }
}

// ============================================================================
// Selection
// ============================================================================

/// Which selection strategy the router runs
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Static lookup table
    RuleBased,
    /// Weighted scoring pipeline
    #[default]
    Scored,
}

impl std::str::FromStr for SelectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "rule_based" | "rules" => Ok(Self::RuleBased),
            "scored" | "scoring" => Ok(Self::Scored),
            other => Err(format!("unknown selection mode: {other}")),
        }
    }
}

// ============================================================================
// Full Router Configuration
// ============================================================================

/// Complete router configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Circuit breaker settings
    pub circuit_breaker: CircuitBreakerConfig,

    /// Adaptive learning settings
    pub adaptive: AdaptiveConfig,

    /// Health probe settings
    pub health_check: HealthCheckConfig,

    /// Rate limit settings
    pub rate_limit: RateLimitConfig,

    /// Fallback ordering settings
    pub fallback: FallbackConfig,

    /// Selection strategy
    pub selection: SelectionMode,

    /// Samples kept per backend by the performance monitor
    pub performance: PerformanceConfig,
}

/// Performance history settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Rolling window size per backend
    pub window_size: usize,

    /// Samples required before history affects scoring
    pub min_samples: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            window_size: 100,
            min_samples: 5,
        }
    }
}
