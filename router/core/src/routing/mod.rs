#![allow(missing_docs)]
//! Complexity-Aware Model Routing
//!
//! Picks the backend expected to best serve each request and keeps requests
//! flowing when backends fail.
//!
//! # Architecture
//!
//! ```text
//! +--------------------+
//! |    ModelRouter     |  <-- Entry point: generate / stream
//! +---------+----------+
//!           |
//!           v
//! +--------------------+     +----------------------+
//! | ComplexityAnalyzer |     |     RateLimiter      |
//! +---------+----------+     +----------------------+
//!           |
//!           v
//! +--------------------+     +----------------------+
//! | SelectionStrategy  | <-- | ModelCapabilityReg.  |
//! | (rule-based/scored)| <-- | PerformanceMonitor   |
//! +---------+----------+ <-- | AdaptiveWeights      |
//!           |            <-- | HealthMonitor        |
//!           v                +----------------------+
//! +--------------------+
//! |  FallbackPlanner   | <-- CircuitBreakerRegistry
//! +---------+----------+
//!           |
//!           v
//! +--------------------+
//! | GenerationPrimitive|  <-- Talks to the backends
//! +--------------------+
//! ```
//!
//! # Design Principles
//!
//! 1. **Fine-Grained State**: One lock per backend record, never a global lock
//! 2. **Silent Breakers**: An open breaker re-routes, it never fails a request
//! 3. **Single Update Path**: Health probes and live calls share one EMA update
//! 4. **No Router Deadlines**: Latency limits filter candidates; the primitive owns timeouts

pub mod adaptive;
pub mod capabilities;
pub mod circuit_breaker;
pub mod complexity;
pub mod config;
pub mod fallback;
pub mod health;
pub mod metrics;
pub mod performance;
pub mod primitive;
pub mod rate_limit;
pub mod request;
pub mod router;
pub mod selection;

#[cfg(test)]
pub mod test_utils;

pub use adaptive::AdaptiveWeightTracker;
pub use capabilities::{ModelCapabilities, ModelCapabilityRegistry, ModelTier};
pub use circuit_breaker::{CircuitBreakerRegistry, CircuitBreakerSnapshot, CircuitState};
pub use complexity::{ComplexityAnalyzer, ComplexityCategory, ComplexityFactors, RequestComplexity};
pub use config::*;
pub use fallback::{FallbackChain, FallbackContext, FallbackPlanner};
pub use health::{HealthMonitor, ModelHealthStatus, Observation};
pub use metrics::{ModelMetrics, RouterMetrics, RouterMetricsSummary};
pub use performance::{PerformanceMonitor, PerformanceStats};
pub use primitive::{
    GenerationOutput, GenerationPrimitive, GenerationRequest, GenerationStatus, ResponseValidator,
    StreamEvent,
};
pub use rate_limit::{RateLimitExceeded, RateLimiter};
pub use request::{
    Attachment, AttachmentKind, MedicalComplexity, MedicalHistory, Message, MessageRole, Request,
    Urgency,
};
pub use router::*;
pub use selection::{RoutingError, Selection, SelectionCriteria, SelectionStrategy};
