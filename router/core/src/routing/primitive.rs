//! Generation Primitive
//!
//! The seam between routing and the code that actually talks to a backend.
//! Implementations receive an ordered fallback chain and are expected to
//! try each backend in turn, performing their own low-level retries; the
//! router only learns which backend finally answered.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::request::{Message, Request};

// ============================================================================
// Request / Response
// ============================================================================

/// What the primitive is asked to generate
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Correlation id
    pub request_id: String,
    /// Conversation to continue
    pub messages: Vec<Message>,
    /// Output token cap
    pub max_tokens: Option<u32>,
    /// Response language hint
    pub language: Option<String>,
}

impl GenerationRequest {
    /// Derive from a routed request
    #[must_use]
    pub fn from_request(request: &Request) -> Self {
        Self {
            request_id: request.request_id.clone(),
            messages: request.messages.clone(),
            max_tokens: None,
            language: request.language.clone(),
        }
    }

    /// Minimal request used by health probes
    #[must_use]
    pub fn probe() -> Self {
        Self {
            request_id: format!("health-probe-{}", uuid::Uuid::new_v4()),
            messages: vec![Message::user("ping")],
            max_tokens: Some(1),
            language: None,
        }
    }
}

/// Completion state reported by the primitive
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    /// Backend finished normally
    #[default]
    Complete,
    /// Output hit the token cap
    Truncated,
}

/// Result of a non-streaming generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutput {
    /// Generated text
    pub text: String,
    /// Backend that produced it
    pub backend_id: String,
    /// Completion state
    pub status: GenerationStatus,
}

/// Event on a streaming response
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// Incremental text
    Token(String),
    /// Stream finished successfully
    Complete {
        /// Full text
        text: String,
        /// Backend that produced it
        backend_id: String,
    },
    /// Stream failed
    Error(String),
}

// ============================================================================
// Traits
// ============================================================================

/// Backend-facing generation capability set
#[async_trait]
pub trait GenerationPrimitive: Send + Sync {
    /// Generate a complete response, walking `chain` in order
    async fn generate(
        &self,
        chain: &[String],
        request: &GenerationRequest,
    ) -> anyhow::Result<GenerationOutput>;

    /// Stream a response, walking `chain` in order
    async fn stream(
        &self,
        chain: &[String],
        request: &GenerationRequest,
    ) -> anyhow::Result<mpsc::Receiver<StreamEvent>>;

    /// Whether a backend can currently be dispatched to
    fn is_available(&self, _backend_id: &str) -> bool {
        true
    }
}

/// Post-hoc check on generated text
pub trait ResponseValidator: Send + Sync {
    /// `true` when the text is acceptable
    fn validate(&self, text: &str) -> bool;
}

impl<F> ResponseValidator for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn validate(&self, text: &str) -> bool {
        self(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_validator() {
        let non_empty = |text: &str| !text.trim().is_empty();
        let validator: &dyn ResponseValidator = &non_empty;
        assert!(validator.validate("ok"));
        assert!(!validator.validate("   "));
    }

    #[test]
    fn test_probe_is_minimal() {
        let probe = GenerationRequest::probe();
        assert_eq!(probe.max_tokens, Some(1));
        assert_eq!(probe.messages.len(), 1);
        assert!(probe.request_id.starts_with("health-probe-"));
    }

    #[test]
    fn test_from_request_keeps_language() {
        let request = Request::new("hola").with_language("es");
        let generation = GenerationRequest::from_request(&request);
        assert_eq!(generation.language.as_deref(), Some("es"));
        assert_eq!(generation.request_id, request.request_id);
    }
}
