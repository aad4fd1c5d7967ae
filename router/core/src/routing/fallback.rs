//! Fallback Chain Planning
//!
//! Turns a [`Selection`] into the ordered chain handed to the generation
//! primitive, and tracks per-request fallback bookkeeping.
//!
//! ```text
//! Selection { primary, fallbacks }
//!         |
//!         v
//! FallbackPlanner::plan()   drop open breakers, reorder by strategy
//!         |
//!         v
//! FallbackChain [primary, f1, f2, f3]  ->  GenerationPrimitive
//! ```

use std::collections::HashSet;

use serde::Serialize;

use super::capabilities::ModelCapabilityRegistry;
use super::circuit_breaker::{CircuitBreakerRegistry, CircuitState};
use super::config::{FallbackConfig, FallbackStrategy};
use super::health::HealthMonitor;
use super::performance::PerformanceMonitor;
use super::selection::Selection;

// ============================================================================
// Fallback Chain
// ============================================================================

/// Ordered backends for one request
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FallbackChain {
    /// Backend tried first
    pub primary: String,

    /// Alternatives in order
    pub fallbacks: Vec<String>,
}

impl FallbackChain {
    /// Create a new fallback chain
    pub fn new(primary: impl Into<String>, fallbacks: Vec<String>) -> Self {
        Self {
            primary: primary.into(),
            fallbacks,
        }
    }

    /// Primary followed by fallbacks
    #[must_use]
    pub fn ordered(&self) -> Vec<String> {
        std::iter::once(self.primary.clone())
            .chain(self.fallbacks.iter().cloned())
            .collect()
    }

    /// Position of a backend in the chain (primary is 0)
    #[must_use]
    pub fn position(&self, backend_id: &str) -> Option<usize> {
        if self.primary == backend_id {
            return Some(0);
        }
        self.fallbacks
            .iter()
            .position(|f| f == backend_id)
            .map(|p| p + 1)
    }

    /// Check if a backend is in this chain
    #[must_use]
    pub fn contains(&self, backend_id: &str) -> bool {
        self.position(backend_id).is_some()
    }

    /// Total depth including the primary
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self.fallbacks.len()
    }

    /// Reject chains that repeat a backend or exceed `max_depth`
    pub fn validate(&self, max_depth: usize) -> Result<(), FallbackChainError> {
        let mut seen = HashSet::new();
        seen.insert(self.primary.as_str());

        for fallback in &self.fallbacks {
            if !seen.insert(fallback.as_str()) {
                return Err(FallbackChainError::CycleDetected {
                    backend: fallback.clone(),
                });
            }
        }

        if self.depth() > max_depth {
            return Err(FallbackChainError::ChainTooDeep {
                depth: self.depth(),
                max: max_depth,
            });
        }
        Ok(())
    }
}

/// Invalid fallback chain
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FallbackChainError {
    /// A backend appears twice
    #[error("cycle detected in fallback chain at backend: {backend}")]
    CycleDetected {
        /// Repeated backend
        backend: String,
    },

    /// Chain longer than allowed
    #[error("chain depth {depth} exceeds maximum {max}")]
    ChainTooDeep {
        /// Actual depth
        depth: usize,
        /// Allowed depth
        max: usize,
    },
}

// ============================================================================
// Planner
// ============================================================================

/// Shared state consulted while ordering fallbacks
#[derive(Clone, Copy)]
pub struct FallbackInputs<'a> {
    /// Static capability table
    pub registry: &'a ModelCapabilityRegistry,
    /// Outcome history
    pub performance: &'a PerformanceMonitor,
    /// Breaker state
    pub breakers: &'a CircuitBreakerRegistry,
    /// Advisory health
    pub health: &'a HealthMonitor,
}

/// Builds chains from selections
#[derive(Clone, Debug, Default)]
pub struct FallbackPlanner {
    config: FallbackConfig,
}

impl FallbackPlanner {
    /// Create a planner
    #[must_use]
    pub fn new(config: FallbackConfig) -> Self {
        Self { config }
    }

    /// Build the chain for a selection
    ///
    /// Fallbacks whose breaker rejects requests are dropped. With intelligent
    /// fallback enabled the survivors are reordered by the configured strategy;
    /// otherwise selection order is kept. Duplicates of the primary are removed.
    #[must_use]
    pub fn plan(&self, selection: &Selection, inputs: &FallbackInputs<'_>) -> FallbackChain {
        let mut seen: HashSet<&str> = HashSet::from([selection.primary.as_str()]);
        let mut fallbacks = Vec::with_capacity(selection.fallbacks.len());
        for fallback in &selection.fallbacks {
            if !seen.insert(fallback.as_str()) {
                continue;
            }
            if !inputs.breakers.allows_request(fallback) {
                tracing::debug!(backend = %fallback, "Dropping fallback with open circuit breaker");
                continue;
            }
            fallbacks.push(fallback.clone());
        }

        if self.config.intelligent {
            self.reorder(&mut fallbacks, inputs);
        }
        fallbacks.truncate(self.config.max_fallbacks);

        FallbackChain::new(selection.primary.clone(), fallbacks)
    }

    fn reorder(&self, fallbacks: &mut [String], inputs: &FallbackInputs<'_>) {
        match self.config.strategy {
            FallbackStrategy::Performance => {
                fallbacks.sort_by(|a, b| {
                    let sa = inputs.performance.performance_score(a);
                    let sb = inputs.performance.performance_score(b);
                    sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
                });
            }
            FallbackStrategy::Cost => {
                let cost = |id: &str| {
                    inputs
                        .registry
                        .get(id)
                        .map_or(f64::MAX, |c| c.cost_per_token)
                };
                fallbacks.sort_by(|a, b| {
                    cost(a)
                        .partial_cmp(&cost(b))
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            }
            FallbackStrategy::Reliability => {
                let availability = |id: &str| {
                    inputs
                        .health
                        .status(id)
                        .map_or(100.0, |s| s.availability)
                };
                fallbacks.sort_by(|a, b| {
                    let closed_a = inputs.breakers.state(a) == CircuitState::Closed;
                    let closed_b = inputs.breakers.state(b) == CircuitState::Closed;
                    closed_b.cmp(&closed_a).then_with(|| {
                        availability(b)
                            .partial_cmp(&availability(a))
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
                });
            }
        }
    }
}

// ============================================================================
// Fallback Context
// ============================================================================

/// Per-request fallback bookkeeping
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FallbackContext {
    /// Primaries skipped because their breaker was open
    pub skipped: Vec<String>,

    /// Fallback steps taken so far
    pub fallbacks_used: u32,

    /// Whether an open breaker forced re-selection
    pub circuit_breaker_triggered: bool,
}

impl FallbackContext {
    /// Create an empty context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `backend_id` was skipped because its breaker is open
    pub fn skip_open_breaker(&mut self, backend_id: impl Into<String>) {
        self.skipped.push(backend_id.into());
        self.fallbacks_used += 1;
        self.circuit_breaker_triggered = true;
    }

    /// Record which chain entry actually answered
    pub fn record_answer(&mut self, chain: &FallbackChain, backend_id: &str) {
        let steps = chain.position(backend_id).unwrap_or(0);
        self.fallbacks_used += u32::try_from(steps).unwrap_or(u32::MAX);
    }

    /// Check if a backend was skipped
    #[must_use]
    pub fn has_skipped(&self, backend_id: &str) -> bool {
        self.skipped.iter().any(|s| s == backend_id)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::config::CircuitBreakerConfig;
    use pretty_assertions::assert_eq;

    struct Fixture {
        registry: ModelCapabilityRegistry,
        performance: PerformanceMonitor,
        breakers: CircuitBreakerRegistry,
        health: HealthMonitor,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registry: ModelCapabilityRegistry::with_defaults(),
                performance: PerformanceMonitor::default(),
                breakers: CircuitBreakerRegistry::new(CircuitBreakerConfig {
                    failure_threshold: 1,
                    ..Default::default()
                }),
                health: HealthMonitor::new(),
            }
        }

        fn inputs(&self) -> FallbackInputs<'_> {
            FallbackInputs {
                registry: &self.registry,
                performance: &self.performance,
                breakers: &self.breakers,
                health: &self.health,
            }
        }
    }

    fn selection(primary: &str, fallbacks: &[&str]) -> Selection {
        Selection {
            primary: primary.to_string(),
            fallbacks: fallbacks.iter().map(|f| (*f).to_string()).collect(),
            reasoning: Vec::new(),
            scores: Vec::new(),
        }
    }

    fn planner(intelligent: bool, strategy: FallbackStrategy) -> FallbackPlanner {
        FallbackPlanner::new(FallbackConfig {
            intelligent,
            strategy,
            max_fallbacks: 3,
        })
    }

    #[test]
    fn test_chain_positions() {
        let chain = FallbackChain::new("a", vec!["b".to_string(), "c".to_string()]);
        assert_eq!(chain.ordered(), vec!["a", "b", "c"]);
        assert_eq!(chain.position("a"), Some(0));
        assert_eq!(chain.position("c"), Some(2));
        assert_eq!(chain.position("z"), None);
        assert!(chain.contains("b"));
        assert_eq!(chain.depth(), 3);
    }

    #[test]
    fn test_validate_chain() {
        let cyclic = FallbackChain::new("a", vec!["b".to_string(), "a".to_string()]);
        assert_eq!(
            cyclic.validate(4),
            Err(FallbackChainError::CycleDetected {
                backend: "a".to_string()
            })
        );

        let deep = FallbackChain::new("a", vec!["b".to_string(), "c".to_string()]);
        assert!(matches!(
            deep.validate(2),
            Err(FallbackChainError::ChainTooDeep { depth: 3, max: 2 })
        ));
        assert!(deep.validate(3).is_ok());
    }

    #[tokio::test]
    async fn test_plan_keeps_selection_order_without_intelligence() {
        let fixture = Fixture::new();
        let chain = planner(false, FallbackStrategy::Cost).plan(
            &selection("gpt-4o", &["claude-3-5-sonnet", "gpt-4o-mini", "gpt-4o"]),
            &fixture.inputs(),
        );
        assert_eq!(chain.fallbacks, vec!["claude-3-5-sonnet", "gpt-4o-mini"]);
    }

    #[tokio::test]
    async fn test_plan_drops_open_breakers() {
        let fixture = Fixture::new();
        fixture.breakers.record_failure("claude-3-5-sonnet");

        let chain = planner(false, FallbackStrategy::Performance).plan(
            &selection("gpt-4o", &["claude-3-5-sonnet", "gemini-1.5-pro"]),
            &fixture.inputs(),
        );
        assert_eq!(chain.fallbacks, vec!["gemini-1.5-pro"]);
    }

    #[tokio::test]
    async fn test_cost_strategy() {
        let fixture = Fixture::new();
        let chain = planner(true, FallbackStrategy::Cost).plan(
            &selection("gpt-4o", &["claude-3-5-sonnet", "gemini-1.5-pro", "gpt-4o-mini"]),
            &fixture.inputs(),
        );
        assert_eq!(
            chain.fallbacks,
            vec!["gpt-4o-mini", "claude-3-5-sonnet", "gemini-1.5-pro"]
        );
    }

    #[tokio::test]
    async fn test_performance_strategy() {
        let fixture = Fixture::new();
        for _ in 0..5 {
            fixture.performance.record("gemini-1.5-pro", true, 100);
            fixture.performance.record("claude-3-5-sonnet", false, 100);
        }
        let chain = planner(true, FallbackStrategy::Performance).plan(
            &selection("gpt-4o", &["claude-3-5-sonnet", "gpt-4o-mini", "gemini-1.5-pro"]),
            &fixture.inputs(),
        );
        assert_eq!(
            chain.fallbacks,
            vec!["gemini-1.5-pro", "gpt-4o-mini", "claude-3-5-sonnet"]
        );
    }

    #[tokio::test]
    async fn test_reliability_strategy() {
        let fixture = Fixture::new();
        fixture
            .health
            .observe("claude-3-5-sonnet", crate::routing::health::Observation::failure(50));
        let chain = planner(true, FallbackStrategy::Reliability).plan(
            &selection("gpt-4o", &["claude-3-5-sonnet", "gemini-1.5-pro"]),
            &fixture.inputs(),
        );
        assert_eq!(chain.fallbacks, vec!["gemini-1.5-pro", "claude-3-5-sonnet"]);
    }

    #[test]
    fn test_fallback_context() {
        let chain = FallbackChain::new("a", vec!["b".to_string(), "c".to_string()]);
        let mut ctx = FallbackContext::new();
        ctx.skip_open_breaker("x");
        ctx.record_answer(&chain, "c");

        assert!(ctx.circuit_breaker_triggered);
        assert!(ctx.has_skipped("x"));
        assert_eq!(ctx.fallbacks_used, 3);
    }
}
