//! Backend Selection
//!
//! Turns a request's requirements into an ordered list of backends.
//!
//! # Selection Flow (scored)
//!
//! ```text
//! 1. Hard-filter backends that cannot serve the request
//! 2. Split survivors into preferred / other groups
//! 3. Score every survivor (quality, domain accuracy, history, latency, cost, fit)
//! 4. Sort by score within each group, preferred group first
//! 5. Top backend is primary, the next three are fallbacks
//! ```
//!
//! The rule-based strategy skips all of this and maps the complexity category
//! straight to a fixed backend.

use serde::Serialize;

use super::adaptive::AdaptiveWeightTracker;
use super::capabilities::{ModelCapabilities, ModelCapabilityRegistry, ModelTier};
use super::complexity::{ComplexityCategory, RequestComplexity};
use super::config::SelectionMode;
use super::health::HealthMonitor;
use super::performance::PerformanceMonitor;
use super::request::Request;

/// Number of fallbacks returned behind the primary
pub const MAX_SELECTION_FALLBACKS: usize = 3;

/// Weight of the general quality score
pub const QUALITY_WEIGHT: f64 = 40.0;

/// Weight of the domain accuracy score
pub const DOMAIN_WEIGHT: f64 = 30.0;

/// Bonus when the request sits at the top of a backend's supported range
pub const EXACT_COMPLEXITY_BONUS: f64 = 15.0;

/// Bonus for a required capability (vision, streaming)
pub const CAPABILITY_BONUS: f64 = 5.0;

// ============================================================================
// Criteria
// ============================================================================

/// Everything selection needs to know about a request
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SelectionCriteria {
    /// Complexity category of the request
    pub complexity: ComplexityCategory,

    /// Raw complexity score (0 - 100)
    pub complexity_score: u32,

    /// Request carries images
    pub requires_vision: bool,

    /// Caller wants a streamed response
    pub requires_streaming: bool,

    /// Response language
    pub language: Option<String>,

    /// Reject backends slower than this on average
    pub max_latency_ms: Option<u64>,

    /// Reject backends more expensive than this per token
    pub max_cost_per_token: Option<f64>,

    /// Never select these
    pub excluded: Vec<String>,

    /// Try these first
    pub preferred: Vec<String>,

    /// Try backends of this tier first
    pub preferred_tier: Option<ModelTier>,
}

impl SelectionCriteria {
    /// Build criteria from an analysed request
    #[must_use]
    pub fn from_request(request: &Request, complexity: &RequestComplexity) -> Self {
        Self {
            complexity: complexity.category,
            complexity_score: complexity.score,
            requires_vision: request.image_count() > 0,
            requires_streaming: false,
            language: request.language.clone(),
            max_latency_ms: None,
            max_cost_per_token: None,
            excluded: request.excluded_backends.clone(),
            preferred: request.preferred_backends.clone(),
            preferred_tier: None,
        }
    }

    /// Exclude one more backend
    pub fn exclude(&mut self, backend_id: impl Into<String>) {
        let backend_id = backend_id.into();
        if !self.excluded.contains(&backend_id) {
            self.excluded.push(backend_id);
        }
    }

    fn is_excluded(&self, backend_id: &str) -> bool {
        self.excluded.iter().any(|e| e == backend_id)
    }

    fn is_preferred(&self, capabilities: &ModelCapabilities) -> bool {
        self.preferred.iter().any(|p| *p == capabilities.id)
            || self.preferred_tier == Some(capabilities.tier)
    }

    /// Reason a backend is ineligible, if any
    fn rejection(&self, capabilities: &ModelCapabilities) -> Option<String> {
        let id = &capabilities.id;
        if self.is_excluded(id) {
            return Some(format!("{id}: excluded"));
        }
        if self.requires_vision && !capabilities.supports_vision {
            return Some(format!("{id}: no vision support"));
        }
        if self.requires_streaming && !capabilities.supports_streaming {
            return Some(format!("{id}: no streaming support"));
        }
        if !capabilities.supports_complexity(self.complexity) {
            return Some(format!("{id}: does not handle {} requests", self.complexity));
        }
        if let Some(language) = &self.language {
            if !capabilities.supports_language(language) {
                return Some(format!("{id}: does not support language '{language}'"));
            }
        }
        if let Some(max) = self.max_latency_ms {
            if capabilities.avg_latency_ms > max {
                return Some(format!(
                    "{id}: average latency {}ms exceeds {max}ms",
                    capabilities.avg_latency_ms
                ));
            }
        }
        if let Some(max) = self.max_cost_per_token {
            if capabilities.cost_per_token > max {
                return Some(format!(
                    "{id}: cost {} per token exceeds {max}",
                    capabilities.cost_per_token
                ));
            }
        }
        None
    }
}

// ============================================================================
// Selection Result
// ============================================================================

/// Contribution of each scoring term
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// quality × 40
    pub quality: f64,
    /// domain accuracy × 30
    pub domain: f64,
    /// history (0 - 20) × adaptive weight × reliability factor
    pub performance: f64,
    /// 0 - 10, faster is higher
    pub latency: f64,
    /// 0 - 10, cheaper is higher
    pub cost: f64,
    /// 0 or 15
    pub complexity_match: f64,
    /// 0, 5 or 10
    pub capabilities: f64,
}

impl ScoreBreakdown {
    /// Sum of all terms
    #[must_use]
    pub fn total(&self) -> f64 {
        self.quality
            + self.domain
            + self.performance
            + self.latency
            + self.cost
            + self.complexity_match
            + self.capabilities
    }
}

/// Score of one candidate backend
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BackendScore {
    /// Backend identifier
    pub backend_id: String,
    /// Whether it was in the preferred group
    pub preferred: bool,
    /// Sum of the breakdown
    pub total: f64,
    /// Individual terms
    pub breakdown: ScoreBreakdown,
}

/// Outcome of a selection
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Selection {
    /// Backend to try first
    pub primary: String,
    /// Ordered alternatives (at most three)
    pub fallbacks: Vec<String>,
    /// Human-readable explanation
    pub reasoning: Vec<String>,
    /// Ranked candidate scores (empty for rule-based selection)
    pub scores: Vec<BackendScore>,
}

/// Shared state consulted while scoring
#[derive(Clone, Copy)]
pub struct SelectionContext<'a> {
    /// Static capability table
    pub registry: &'a ModelCapabilityRegistry,
    /// Outcome history
    pub performance: &'a PerformanceMonitor,
    /// Learned multipliers
    pub weights: &'a AdaptiveWeightTracker,
    /// Advisory health
    pub health: &'a HealthMonitor,
}

/// Selection failures
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    /// Every backend was filtered out
    #[error("no eligible backend: {}", .reasons.join("; "))]
    NoEligibleModel {
        /// Why each backend was rejected
        reasons: Vec<String>,
    },

    /// Backend id not in the capability registry
    #[error("unknown backend: {0}")]
    UnknownBackend(String),
}

// ============================================================================
// Strategy
// ============================================================================

/// Which algorithm picks the backend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionStrategy {
    /// Fixed category-to-backend table
    RuleBased,
    /// Weighted scoring over all eligible backends
    Scored {
        /// Multiply the history term by the learned weight
        adaptive_learning: bool,
    },
}

impl Default for SelectionStrategy {
    fn default() -> Self {
        Self::Scored {
            adaptive_learning: true,
        }
    }
}

impl SelectionStrategy {
    /// Strategy for a configured mode
    #[must_use]
    pub fn from_mode(mode: SelectionMode, adaptive_learning: bool) -> Self {
        match mode {
            SelectionMode::RuleBased => Self::RuleBased,
            SelectionMode::Scored => Self::Scored { adaptive_learning },
        }
    }

    /// Pick a primary backend and up to three fallbacks from `available`
    pub fn select(
        &self,
        criteria: &SelectionCriteria,
        available: &[String],
        ctx: &SelectionContext<'_>,
    ) -> Result<Selection, RoutingError> {
        let selection = match self {
            Self::RuleBased => select_rule_based(criteria, available, ctx.registry)?,
            Self::Scored { adaptive_learning } => {
                select_scored(criteria, available, ctx, *adaptive_learning)?
            }
        };

        tracing::debug!(
            primary = %selection.primary,
            fallbacks = ?selection.fallbacks,
            complexity = %criteria.complexity,
            "Backend selected"
        );
        Ok(selection)
    }
}

// ============================================================================
// Rule-Based
// ============================================================================

/// Static fallback order used by the rule-based strategy
pub const RULE_FALLBACK_ORDER: [&str; 6] = [
    "claude-3-5-sonnet",
    "gpt-4o",
    "gemini-1.5-pro",
    "gpt-4o-mini",
    "claude-3-haiku",
    "llama-3.1-70b",
];

/// Backend the rule table maps a request to
#[must_use]
pub fn rule_target(criteria: &SelectionCriteria) -> &'static str {
    if criteria.requires_vision {
        return "gpt-4o";
    }
    match criteria.complexity {
        ComplexityCategory::Simple => "gpt-4o-mini",
        ComplexityCategory::Moderate => "claude-3-haiku",
        ComplexityCategory::Complex => "claude-3-5-sonnet",
        ComplexityCategory::Advanced => "gpt-4o",
    }
}

fn select_rule_based(
    criteria: &SelectionCriteria,
    available: &[String],
    registry: &ModelCapabilityRegistry,
) -> Result<Selection, RoutingError> {
    let usable = |id: &str| {
        available.iter().any(|a| a == id)
            && !criteria.is_excluded(id)
            && (!criteria.requires_vision || registry.get(id).is_some_and(|c| c.supports_vision))
    };

    let target = rule_target(criteria);
    let mut ordered: Vec<String> = Vec::new();
    let candidates = std::iter::once(target)
        .chain(RULE_FALLBACK_ORDER)
        .chain(available.iter().map(String::as_str));
    for id in candidates {
        if usable(id) && !ordered.iter().any(|o| o == id) {
            ordered.push(id.to_string());
        }
    }

    if ordered.is_empty() {
        return Err(RoutingError::NoEligibleModel {
            reasons: vec![format!(
                "no available backend for {} request (rule table target: {target})",
                criteria.complexity
            )],
        });
    }

    let primary = ordered.remove(0);
    let mut reasoning = vec![format!("rule table maps {} to {target}", criteria.complexity)];
    if primary != target {
        reasoning.push(format!("{target} unavailable, using {primary}"));
    }
    ordered.truncate(MAX_SELECTION_FALLBACKS);

    Ok(Selection {
        primary,
        fallbacks: ordered,
        reasoning,
        scores: Vec::new(),
    })
}

// ============================================================================
// Scored
// ============================================================================

/// Score one backend against the criteria
#[must_use]
pub fn score_backend(
    capabilities: &ModelCapabilities,
    criteria: &SelectionCriteria,
    ctx: &SelectionContext<'_>,
    adaptive_learning: bool,
) -> ScoreBreakdown {
    let id = capabilities.id.as_str();

    let mut performance = ctx.performance.performance_score(id);
    if adaptive_learning {
        performance *= ctx.weights.weight(id);
    }
    performance *= ctx.health.reliability_factor(id);

    let latency = (10.0 * (1.0 - capabilities.avg_latency_ms as f64 / 10_000.0)).max(0.0);
    let cost = (10.0 - capabilities.cost_per_token * 1_000_000.0).max(0.0);

    let complexity_match = if capabilities.is_exact_complexity_match(criteria.complexity) {
        EXACT_COMPLEXITY_BONUS
    } else {
        0.0
    };

    let mut capability_bonus = 0.0;
    if criteria.requires_vision && capabilities.supports_vision {
        capability_bonus += CAPABILITY_BONUS;
    }
    if criteria.requires_streaming && capabilities.supports_streaming {
        capability_bonus += CAPABILITY_BONUS;
    }

    ScoreBreakdown {
        quality: capabilities.quality_score * QUALITY_WEIGHT,
        domain: capabilities.medical_accuracy * DOMAIN_WEIGHT,
        performance,
        latency,
        cost,
        complexity_match,
        capabilities: capability_bonus,
    }
}

fn select_scored(
    criteria: &SelectionCriteria,
    available: &[String],
    ctx: &SelectionContext<'_>,
    adaptive_learning: bool,
) -> Result<Selection, RoutingError> {
    let mut rejections = Vec::new();
    let mut eligible = Vec::new();

    for id in available {
        let Some(capabilities) = ctx.registry.get(id) else {
            rejections.push(format!("{id}: not registered"));
            continue;
        };
        match criteria.rejection(capabilities) {
            Some(reason) => rejections.push(reason),
            None => eligible.push(capabilities),
        }
    }

    if eligible.is_empty() {
        if rejections.is_empty() {
            rejections.push("no backends available".to_string());
        }
        tracing::warn!(reasons = ?rejections, "No eligible backend");
        return Err(RoutingError::NoEligibleModel {
            reasons: rejections,
        });
    }

    let mut scores: Vec<BackendScore> = eligible
        .iter()
        .map(|capabilities| {
            let breakdown = score_backend(capabilities, criteria, ctx, adaptive_learning);
            BackendScore {
                backend_id: capabilities.id.clone(),
                preferred: criteria.is_preferred(capabilities),
                total: breakdown.total(),
                breakdown,
            }
        })
        .collect();

    // Preferred group first, highest score first within each group
    scores.sort_by(|a, b| {
        b.preferred
            .cmp(&a.preferred)
            .then_with(|| b.total.partial_cmp(&a.total).unwrap_or(std::cmp::Ordering::Equal))
    });

    let primary = scores[0].backend_id.clone();
    let fallbacks: Vec<String> = scores
        .iter()
        .skip(1)
        .take(MAX_SELECTION_FALLBACKS)
        .map(|s| s.backend_id.clone())
        .collect();

    let mut reasoning = vec![
        format!(
            "complexity {} (score {})",
            criteria.complexity, criteria.complexity_score
        ),
        format!(
            "{} of {} backends eligible",
            eligible.len(),
            available.len()
        ),
        format!("selected {primary} with score {:.1}", scores[0].total),
    ];
    if scores[0].preferred {
        reasoning.push(format!("{primary} matches caller preference"));
    }
    reasoning.extend(rejections.into_iter().map(|r| format!("filtered {r}")));

    Ok(Selection {
        primary,
        fallbacks,
        reasoning,
        scores,
    })
}

// ============================================================================
// Tests
// ============================================================================
