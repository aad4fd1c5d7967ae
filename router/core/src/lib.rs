//! Router Core - Complexity-Aware LLM Backend Routing
//!
//! This crate decides which LLM backend should answer a request and keeps
//! requests flowing when backends misbehave. It never talks to a backend
//! itself: the network side sits behind the [`GenerationPrimitive`] trait.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          ModelRouter                             │
//! │  ┌────────────┐  ┌──────────────┐  ┌───────────┐  ┌───────────┐  │
//! │  │   Rate     │  │  Complexity  │  │ Selection │  │ Fallback  │  │
//! │  │  Limiter   │─▶│   Analyzer   │─▶│ Strategy  │─▶│  Planner  │  │
//! │  └────────────┘  └──────────────┘  └─────┬─────┘  └─────┬─────┘  │
//! │                                          │              │        │
//! │  ┌─────────────┐ ┌───────────┐ ┌─────────┴──┐ ┌─────────┴──────┐ │
//! │  │ Performance │ │ Adaptive  │ │   Health   │ │ Circuit Breaker│ │
//! │  │  Monitor    │ │  Weights  │ │  Monitor   │ │   Registry     │ │
//! │  └─────────────┘ └───────────┘ └────────────┘ └────────────────┘ │
//! └──────────────────────────────────┬───────────────────────────────┘
//!                                    │ fallback chain
//!                                    v
//!                          GenerationPrimitive
//! ```
//!
//! # Key Types
//!
//! - [`ModelRouter`]: Orchestrates one request end to end
//! - [`ComplexityAnalyzer`]: Scores request difficulty (0 - 100)
//! - [`ModelCapabilityRegistry`]: Static backend descriptors
//! - [`CircuitBreakerRegistry`]: Per-backend failure guards
//! - [`AdaptiveWeightTracker`]: Learned per-backend multipliers
//! - [`HealthMonitor`]: Smoothed advisory health records
//! - [`RateLimiter`]: Fixed-window request limits per context
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use router_core::{
//!     load_config, ModelRouter, Request, RoutingConstraints,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = load_config()?;
//!     let router = ModelRouter::new(
//!         settings.router.clone(),
//!         Arc::new(settings.registry()),
//!         Arc::new(MyPrimitive::new()),
//!     );
//!     router.start()?;
//!
//!     let request = Request::new("Summarise my lab results");
//!     let result = router
//!         .generate(&request, &RoutingConstraints::default(), None)
//!         .await?;
//!     println!("{} answered: {}", result.model_id, result.text);
//!
//!     router.destroy();
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`routing`]: Analysis, selection, reliability state and the router
//! - [`config`]: TOML and environment configuration loading

#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod routing;

// Routing exports
pub use routing::{
    AdaptiveWeightTracker, Attachment, CircuitBreakerRegistry, CircuitState, ComplexityAnalyzer,
    ComplexityCategory, GenerationOutput, GenerationPrimitive, GenerationRequest, HealthMonitor,
    Message, ModelCapabilities, ModelCapabilityRegistry, ModelHealthStatus, ModelMetrics,
    ModelRouter, ModelTier, RateLimitExceeded, RateLimiter, Request, RequestComplexity,
    ResponseValidator, RouteResult, RoutedStream, RouterConfig, RouterError, RoutingConstraints,
    RoutingError, StreamEvent,
};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigSource,
    RouterSettings, RouterToml,
};
