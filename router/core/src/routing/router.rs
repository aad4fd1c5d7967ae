//! Model Router
//!
//! Ties the routing components together for each request:
//!
//! ```text
//! Request ──> RateLimiter ──> ComplexityAnalyzer ──> SelectionCriteria
//!                                                         │
//!            ┌──── primary breaker open? re-select ◄──────┤
//!            │                                            v
//!            └─────────────────────────────────> SelectionStrategy
//!                                                         │
//!                                                  FallbackPlanner
//!                                                         │
//!                                                         v
//!                                              GenerationPrimitive
//!                                                         │
//!             PerformanceMonitor / CircuitBreakerRegistry / AdaptiveWeightTracker / HealthMonitor
//! ```
//!
//! The router owns no timeouts. `max_latency_ms` only filters candidates;
//! deadlines belong to the generation primitive.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;

use super::adaptive::AdaptiveWeightTracker;
use super::capabilities::{ModelCapabilityRegistry, ModelTier};
use super::circuit_breaker::{CircuitBreakerRegistry, CircuitState};
use super::complexity::{ComplexityAnalyzer, RequestComplexity};
use super::config::RouterConfig;
use super::fallback::{FallbackChain, FallbackContext, FallbackInputs, FallbackPlanner};
use super::health::{HealthMonitor, ModelHealthStatus, Observation, SLOW_RESPONSE_MS};
use super::metrics::{ModelMetrics, RouterMetrics, RouterMetricsSummary};
use super::performance::PerformanceMonitor;
use super::primitive::{GenerationPrimitive, GenerationRequest, ResponseValidator, StreamEvent};
use super::rate_limit::{RateLimitExceeded, RateLimiter};
use super::request::Request;
use super::selection::{RoutingError, Selection, SelectionContext, SelectionCriteria, SelectionStrategy};

/// Routing context used when the caller does not name one
pub const DEFAULT_CONTEXT: &str = "default";

/// Buffered events between the primitive and the caller
const STREAM_BUFFER: usize = 32;

// ============================================================================
// Constraints & Results
// ============================================================================

/// Caller-side limits applied on top of the request itself
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoutingConstraints {
    /// Rate limit bucket (caller, app, tenant...)
    pub context: String,

    /// Only consider backends that can stream
    pub requires_streaming: bool,

    /// Reject backends slower than this on average
    pub max_latency_ms: Option<u64>,

    /// Reject backends more expensive than this per token
    pub max_cost_per_token: Option<f64>,

    /// Try backends of this tier first
    pub preferred_tier: Option<ModelTier>,

    /// Output token cap passed to the primitive
    pub max_tokens: Option<u32>,
}

impl Default for RoutingConstraints {
    fn default() -> Self {
        Self {
            context: DEFAULT_CONTEXT.to_string(),
            requires_streaming: false,
            max_latency_ms: None,
            max_cost_per_token: None,
            preferred_tier: None,
            max_tokens: None,
        }
    }
}

impl RoutingConstraints {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    #[must_use]
    pub fn streaming(mut self) -> Self {
        self.requires_streaming = true;
        self
    }

    #[must_use]
    pub fn with_max_latency(mut self, max_latency_ms: u64) -> Self {
        self.max_latency_ms = Some(max_latency_ms);
        self
    }

    #[must_use]
    pub fn with_max_cost(mut self, max_cost_per_token: f64) -> Self {
        self.max_cost_per_token = Some(max_cost_per_token);
        self
    }

    #[must_use]
    pub fn with_preferred_tier(mut self, tier: ModelTier) -> Self {
        self.preferred_tier = Some(tier);
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    fn apply(&self, criteria: &mut SelectionCriteria) {
        criteria.requires_streaming |= self.requires_streaming;
        criteria.max_latency_ms = self.max_latency_ms;
        criteria.max_cost_per_token = self.max_cost_per_token;
        criteria.preferred_tier = self.preferred_tier;
    }
}

/// Successful routed generation
#[derive(Clone, Debug, Serialize)]
pub struct RouteResult {
    /// Generated text
    pub text: String,
    /// Backend that actually answered
    pub model_id: String,
    /// Time spent in the primitive
    pub response_time_ms: u64,
    /// Fallback steps taken (breaker skips plus chain position)
    pub fallbacks_used: u32,
    /// Whether an open breaker forced re-selection
    pub circuit_breaker_triggered: bool,
    /// Advisory score in `[0, 1]`; not a calibrated probability
    pub confidence: f64,
    /// Complexity analysis of the request
    pub complexity: RequestComplexity,
    /// Validator verdict, if a validator was supplied
    pub validated: Option<bool>,
}

/// Routing decision made before anything is dispatched
#[derive(Clone, Debug, Serialize)]
pub struct RoutePlan {
    /// Complexity analysis of the request
    pub complexity: RequestComplexity,
    /// Criteria after constraints and breaker exclusions
    pub criteria: SelectionCriteria,
    /// Raw selection output
    pub selection: Selection,
    /// Chain handed to the primitive
    pub chain: FallbackChain,
    /// Breaker skips so far
    pub fallback: FallbackContext,
}

// ============================================================================
// Errors
// ============================================================================

/// Errors surfaced to router callers
///
/// An open circuit breaker never appears here; it only triggers re-selection.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// The routing context used up its window
    #[error(transparent)]
    RateLimitExceeded(#[from] RateLimitExceeded),

    /// Filtering removed every backend
    #[error("no eligible backend: {}", .reasons.join("; "))]
    NoEligibleModel {
        /// Why each backend was rejected
        reasons: Vec<String>,
    },

    /// The whole fallback chain failed
    #[error("generation via {backend} failed after {fallbacks_used} fallbacks: {source}")]
    Upstream {
        /// Primary backend of the failed chain
        backend: String,
        /// Fallback steps taken
        fallbacks_used: u32,
        /// Criteria the chain was selected with
        criteria: Box<SelectionCriteria>,
        /// Error reported by the primitive
        #[source]
        source: anyhow::Error,
    },

    /// The router has been destroyed
    #[error("router is not running")]
    NotRunning,
}

impl From<RoutingError> for RouterError {
    fn from(err: RoutingError) -> Self {
        match err {
            RoutingError::NoEligibleModel { reasons } => Self::NoEligibleModel { reasons },
            RoutingError::UnknownBackend(id) => Self::NoEligibleModel {
                reasons: vec![format!("{id}: not registered")],
            },
        }
    }
}

// ============================================================================
// Outcome Recording
// ============================================================================

/// Shared per-backend state, cloneable into stream forwarding tasks
#[derive(Clone)]
struct OutcomeRecorder {
    performance: Arc<PerformanceMonitor>,
    breakers: Arc<CircuitBreakerRegistry>,
    weights: Arc<AdaptiveWeightTracker>,
    health: Arc<HealthMonitor>,
    metrics: Arc<RouterMetrics>,
    adaptive: bool,
}

impl OutcomeRecorder {
    fn success(&self, backend_id: &str, latency_ms: u64) {
        self.performance.record(backend_id, true, latency_ms);
        self.breakers.record_success(backend_id);
        if self.adaptive {
            self.weights.update(backend_id, true, latency_ms);
        }
        self.health.observe(backend_id, Observation::success(latency_ms));
    }

    fn failure(&self, backend_id: &str, latency_ms: u64) {
        self.performance.record(backend_id, false, latency_ms);
        if self.breakers.record_failure(backend_id) {
            self.metrics.circuit_breaker_trips.inc();
        }
        if self.adaptive {
            self.weights.update(backend_id, false, latency_ms);
        }
        self.health.observe(backend_id, Observation::failure(latency_ms));
    }

    /// Record an answered request; chain entries ahead of the answer failed
    fn answered(&self, chain: &FallbackChain, backend_id: &str, latency_ms: u64, skipped: u32) {
        let ahead = chain.position(backend_id).unwrap_or(0);
        for failed in chain.ordered().iter().take(ahead) {
            self.failure(failed, latency_ms);
        }
        self.success(backend_id, latency_ms);

        self.metrics.successes.inc();
        self.metrics
            .fallbacks
            .add(u64::from(skipped) + ahead as u64);
        self.metrics.response_time.record(latency_ms as f64);
    }

    /// Record a request nobody answered
    fn exhausted(&self, failed: &[String], latency_ms: u64) {
        for backend_id in failed {
            self.failure(backend_id, latency_ms);
        }
        self.metrics.failures.inc();
        self.metrics.response_time.record(latency_ms as f64);
    }

    fn clear(&self) {
        self.performance.clear();
        self.breakers.clear();
        self.weights.clear();
        self.health.clear();
        self.metrics.reset();
    }
}

// ============================================================================
// Streaming
// ============================================================================

/// A routed streaming response
///
/// Outcome recording happens in a forwarding task; dropping the stream before
/// completion records nothing.
pub struct RoutedStream {
    /// Backend the chain starts with
    pub primary: String,
    /// Breaker skips before dispatch
    pub fallbacks_used: u32,
    /// Whether an open breaker forced re-selection
    pub circuit_breaker_triggered: bool,
    /// Complexity analysis of the request
    pub complexity: RequestComplexity,
    events: mpsc::Receiver<StreamEvent>,
}

impl RoutedStream {
    /// Next event, `None` once the stream has ended
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    /// Adapt into a [`futures::Stream`]
    #[must_use]
    pub fn into_stream(self) -> ReceiverStream<StreamEvent> {
        ReceiverStream::new(self.events)
    }
}

impl std::fmt::Debug for RoutedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutedStream")
            .field("primary", &self.primary)
            .field("fallbacks_used", &self.fallbacks_used)
            .field("circuit_breaker_triggered", &self.circuit_breaker_triggered)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Complexity-aware router with circuit breaking and adaptive weights
pub struct ModelRouter {
    config: RouterConfig,
    registry: Arc<ModelCapabilityRegistry>,
    primitive: Arc<dyn GenerationPrimitive>,
    analyzer: ComplexityAnalyzer,
    strategy: SelectionStrategy,
    planner: FallbackPlanner,
    rate_limiter: RateLimiter,
    recorder: OutcomeRecorder,
    destroyed: AtomicBool,
}

impl std::fmt::Debug for ModelRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRouter")
            .field("backends", &self.registry.ids())
            .field("strategy", &self.strategy)
            .field("destroyed", &self.destroyed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl ModelRouter {
    /// Create a router; call [`ModelRouter::start`] to begin health probes
    pub fn new(
        config: RouterConfig,
        registry: Arc<ModelCapabilityRegistry>,
        primitive: Arc<dyn GenerationPrimitive>,
    ) -> Self {
        let recorder = OutcomeRecorder {
            performance: Arc::new(PerformanceMonitor::new(
                config.performance.window_size,
                config.performance.min_samples,
            )),
            breakers: Arc::new(CircuitBreakerRegistry::new(config.circuit_breaker.clone())),
            weights: Arc::new(AdaptiveWeightTracker::new(
                config.adaptive.decay,
                config.adaptive.initial_weight,
            )),
            health: Arc::new(HealthMonitor::new()),
            metrics: Arc::new(RouterMetrics::new()),
            adaptive: config.adaptive.enabled,
        };

        tracing::info!(
            backends = registry.len(),
            selection = ?config.selection,
            "Model router created"
        );

        Self {
            strategy: SelectionStrategy::from_mode(config.selection, config.adaptive.enabled),
            planner: FallbackPlanner::new(config.fallback.clone()),
            rate_limiter: RateLimiter::new(config.rate_limit.clone()),
            analyzer: ComplexityAnalyzer::new(),
            config,
            registry,
            primitive,
            recorder,
            destroyed: AtomicBool::new(false),
        }
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Capability table
    #[must_use]
    pub fn registry(&self) -> &ModelCapabilityRegistry {
        &self.registry
    }

    /// Start periodic health probes; returns whether a probe task was spawned
    pub fn start(&self) -> Result<bool, RouterError> {
        self.ensure_running()?;
        Ok(self.recorder.health.start(
            Arc::clone(&self.primitive),
            self.registry.ids(),
            &self.config.health_check,
        ))
    }

    /// Whether [`ModelRouter::destroy`] has not been called
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.destroyed.load(Ordering::Acquire)
    }

    fn ensure_running(&self) -> Result<(), RouterError> {
        if self.is_running() {
            Ok(())
        } else {
            Err(RouterError::NotRunning)
        }
    }

    // ------------------------------------------------------------------------
    // Planning
    // ------------------------------------------------------------------------

    /// Analyse and select without dispatching
    ///
    /// Does not count against the rate limit. Consulting breakers may still
    /// move an open breaker whose cool-down elapsed to half-open.
    pub fn plan(
        &self,
        request: &Request,
        constraints: &RoutingConstraints,
    ) -> Result<RoutePlan, RouterError> {
        self.ensure_running()?;
        self.route(request, constraints)
    }

    fn route(
        &self,
        request: &Request,
        constraints: &RoutingConstraints,
    ) -> Result<RoutePlan, RouterError> {
        let complexity = self.analyzer.analyze(request);
        let mut criteria = SelectionCriteria::from_request(request, &complexity);
        constraints.apply(&mut criteria);

        let available: Vec<String> = self
            .registry
            .ids()
            .into_iter()
            .filter(|id| self.primitive.is_available(id))
            .collect();

        let recorder = &self.recorder;
        let ctx = SelectionContext {
            registry: &self.registry,
            performance: &recorder.performance,
            weights: &recorder.weights,
            health: &recorder.health,
        };

        let mut fallback = FallbackContext::new();
        let selection = loop {
            let selection = self.strategy.select(&criteria, &available, &ctx)?;
            if recorder.breakers.allows_request(&selection.primary) {
                break selection;
            }
            tracing::info!(
                request_id = %request.request_id,
                backend = %selection.primary,
                "Primary circuit breaker open, selecting alternative"
            );
            fallback.skip_open_breaker(selection.primary.clone());
            criteria.exclude(selection.primary);
        };

        let chain = self.planner.plan(
            &selection,
            &FallbackInputs {
                registry: &self.registry,
                performance: &recorder.performance,
                breakers: &recorder.breakers,
                health: &recorder.health,
            },
        );
        if let Err(err) = chain.validate(self.config.fallback.max_fallbacks + 1) {
            tracing::warn!(request_id = %request.request_id, error = %err, "Invalid fallback chain");
        }

        Ok(RoutePlan {
            complexity,
            criteria,
            selection,
            chain,
            fallback,
        })
    }

    /// Pre-flight shared by generate and stream
    fn admit(
        &self,
        request: &Request,
        constraints: &RoutingConstraints,
    ) -> Result<RoutePlan, RouterError> {
        self.ensure_running()?;
        let metrics = &self.recorder.metrics;

        if let Err(err) = self.rate_limiter.check(&constraints.context) {
            metrics.rate_limited.inc();
            return Err(err.into());
        }
        metrics.requests.inc();

        let started = Instant::now();
        let plan = match self.route(request, constraints) {
            Ok(plan) => plan,
            Err(err) => {
                metrics.no_eligible.inc();
                tracing::warn!(request_id = %request.request_id, error = %err, "Request could not be routed");
                return Err(err);
            }
        };
        metrics
            .routing_latency
            .record(started.elapsed().as_secs_f64() * 1000.0);
        if plan.fallback.circuit_breaker_triggered {
            metrics
                .circuit_breaker_reroutes
                .add(plan.fallback.skipped.len() as u64);
        }

        tracing::debug!(
            request_id = %request.request_id,
            complexity = %plan.complexity.category,
            score = plan.complexity.score,
            chain = ?plan.chain.ordered(),
            "Request routed"
        );
        Ok(plan)
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Route and generate a complete response
    pub async fn generate(
        &self,
        request: &Request,
        constraints: &RoutingConstraints,
        validator: Option<&dyn ResponseValidator>,
    ) -> Result<RouteResult, RouterError> {
        let RoutePlan {
            complexity,
            criteria,
            chain,
            mut fallback,
            ..
        } = self.admit(request, constraints)?;

        let ordered = chain.ordered();
        let generation = generation_request(request, constraints);
        let started = Instant::now();
        let result = self.primitive.generate(&ordered, &generation).await;
        let response_time_ms = started.elapsed().as_millis() as u64;

        let output = match result {
            Ok(output) => output,
            Err(source) => {
                self.recorder.exhausted(&ordered, response_time_ms);
                let fallbacks_used = fallback.fallbacks_used + chain.fallbacks.len() as u32;
                tracing::warn!(
                    request_id = %request.request_id,
                    backend = %chain.primary,
                    fallbacks_used,
                    error = %source,
                    "Generation failed across fallback chain"
                );
                return Err(RouterError::Upstream {
                    backend: chain.primary,
                    fallbacks_used,
                    criteria: Box::new(criteria),
                    source,
                });
            }
        };

        let skipped = fallback.fallbacks_used;
        fallback.record_answer(&chain, &output.backend_id);
        self.recorder
            .answered(&chain, &output.backend_id, response_time_ms, skipped);

        let validated = validator.map(|v| v.validate(&output.text));
        if validated == Some(false) {
            tracing::warn!(
                request_id = %request.request_id,
                backend = %output.backend_id,
                "Response rejected by validator"
            );
        }

        let confidence = confidence(
            fallback.fallbacks_used,
            fallback.circuit_breaker_triggered,
            validated,
            response_time_ms,
        );

        tracing::info!(
            request_id = %request.request_id,
            backend = %output.backend_id,
            response_time_ms,
            fallbacks_used = fallback.fallbacks_used,
            "Request completed"
        );

        Ok(RouteResult {
            text: output.text,
            model_id: output.backend_id,
            response_time_ms,
            fallbacks_used: fallback.fallbacks_used,
            circuit_breaker_triggered: fallback.circuit_breaker_triggered,
            confidence,
            complexity,
            validated,
        })
    }

    /// Route and stream a response
    ///
    /// The outcome is recorded when the primitive reports completion or an
    /// error, or closes the stream without completing.
    pub async fn stream(
        &self,
        request: &Request,
        constraints: &RoutingConstraints,
    ) -> Result<RoutedStream, RouterError> {
        let RoutePlan {
            complexity,
            criteria,
            chain,
            fallback,
            ..
        } = self.admit(request, constraints)?;

        let ordered = chain.ordered();
        let generation = generation_request(request, constraints);
        let started = Instant::now();

        let mut upstream = match self.primitive.stream(&ordered, &generation).await {
            Ok(upstream) => upstream,
            Err(source) => {
                self.recorder
                    .exhausted(&ordered, started.elapsed().as_millis() as u64);
                let fallbacks_used = fallback.fallbacks_used + chain.fallbacks.len() as u32;
                tracing::warn!(
                    request_id = %request.request_id,
                    backend = %chain.primary,
                    error = %source,
                    "Stream could not be opened"
                );
                return Err(RouterError::Upstream {
                    backend: chain.primary,
                    fallbacks_used,
                    criteria: Box::new(criteria),
                    source,
                });
            }
        };

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let recorder = self.recorder.clone();
        let request_id = request.request_id.clone();
        let skipped = fallback.fallbacks_used;
        let primary = chain.primary.clone();

        tokio::spawn(async move {
            let mut settled = false;
            while let Some(event) = upstream.recv().await {
                let latency_ms = started.elapsed().as_millis() as u64;
                match &event {
                    StreamEvent::Token(_) => {}
                    StreamEvent::Complete { backend_id, .. } => {
                        recorder.answered(&chain, backend_id, latency_ms, skipped);
                        tracing::info!(request_id = %request_id, backend = %backend_id, latency_ms, "Stream completed");
                        settled = true;
                    }
                    StreamEvent::Error(message) => {
                        recorder.exhausted(std::slice::from_ref(&chain.primary), latency_ms);
                        tracing::warn!(request_id = %request_id, backend = %chain.primary, error = %message, "Stream failed");
                        settled = true;
                    }
                }

                if tx.send(event).await.is_err() {
                    tracing::debug!(request_id = %request_id, "Stream consumer went away");
                    return;
                }
                if settled {
                    return;
                }
            }

            if !settled {
                recorder.exhausted(
                    std::slice::from_ref(&chain.primary),
                    started.elapsed().as_millis() as u64,
                );
                tracing::warn!(request_id = %request_id, backend = %chain.primary, "Stream closed without completing");
            }
        });

        Ok(RoutedStream {
            primary,
            fallbacks_used: fallback.fallbacks_used,
            circuit_breaker_triggered: fallback.circuit_breaker_triggered,
            complexity,
            events: rx,
        })
    }

    // ------------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------------

    /// Per-backend metrics, in registry order
    #[must_use]
    pub fn model_metrics(&self) -> Vec<ModelMetrics> {
        let recorder = &self.recorder;
        self.registry
            .ids()
            .into_iter()
            .map(|id| {
                let stats = recorder.performance.stats(&id);
                ModelMetrics {
                    success_rate: stats.success_rate,
                    avg_response_time_ms: stats.avg_response_time_ms,
                    error_rate: stats.error_rate,
                    sample_count: stats.sample_count,
                    circuit_breaker_state: recorder.breakers.state(&id),
                    adaptive_weight: recorder.weights.weight(&id),
                    backend_id: id,
                }
            })
            .collect()
    }

    /// Health records for every backend observed so far
    #[must_use]
    pub fn health_status(&self) -> Vec<ModelHealthStatus> {
        self.recorder.health.all_statuses()
    }

    /// Learned weights for every backend observed so far
    #[must_use]
    pub fn adaptive_weights(&self) -> HashMap<String, f64> {
        self.recorder.weights.weights()
    }

    /// Breaker state for one backend
    #[must_use]
    pub fn circuit_breaker_state(&self, backend_id: &str) -> CircuitState {
        self.recorder.breakers.state(backend_id)
    }

    /// Force a backend's breaker closed
    pub fn reset_circuit_breaker(&self, backend_id: &str) -> Result<(), RoutingError> {
        if !self.registry.contains(backend_id) {
            return Err(RoutingError::UnknownBackend(backend_id.to_string()));
        }
        self.recorder.breakers.reset(backend_id);
        Ok(())
    }

    /// Router-wide counters
    #[must_use]
    pub fn metrics_summary(&self) -> RouterMetricsSummary {
        self.recorder.metrics.summary()
    }

    /// Probe every backend once, outside the periodic schedule
    pub async fn check_health(&self) {
        self.recorder
            .health
            .check_now(
                self.primitive.as_ref(),
                &self.registry.ids(),
                self.config.health_check.timeout(),
            )
            .await;
    }

    /// Stop health probes and drop all learned state; safe to call repeatedly
    pub fn destroy(&self) {
        let was_running = !self.destroyed.swap(true, Ordering::AcqRel);
        self.recorder.health.stop();
        self.recorder.clear();
        self.rate_limiter.clear();
        if was_running {
            tracing::info!("Model router destroyed");
        }
    }
}

impl Drop for ModelRouter {
    fn drop(&mut self) {
        self.recorder.health.stop();
    }
}

fn generation_request(request: &Request, constraints: &RoutingConstraints) -> GenerationRequest {
    GenerationRequest {
        max_tokens: constraints.max_tokens,
        ..GenerationRequest::from_request(request)
    }
}

/// Advisory confidence score, clamped to `[0, 1]`
#[must_use]
pub fn confidence(
    fallbacks_used: u32,
    circuit_breaker_triggered: bool,
    validated: Option<bool>,
    response_time_ms: u64,
) -> f64 {
    let mut confidence = 1.0 - 0.1 * f64::from(fallbacks_used);
    if circuit_breaker_triggered {
        confidence -= 0.2;
    }
    if validated == Some(false) {
        confidence -= 0.3;
    }
    if response_time_ms as f64 > SLOW_RESPONSE_MS {
        confidence -= 0.1;
    }
    confidence.clamp(0.0, 1.0)
}

// ============================================================================
// Tests
// ============================================================================
