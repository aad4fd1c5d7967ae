//! Model Capability Registry
//!
//! Static descriptors for every backend the router can dispatch to. The
//! registry is built once at startup and is read-only afterwards, so it is
//! shared behind an `Arc` without any locking.

use serde::{Deserialize, Serialize};

use super::complexity::ComplexityCategory;

// ============================================================================
// Model Tier
// ============================================================================

/// Price/quality tier a caller can express a preference for
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Cheap and fast
    Economy,
    /// Balanced
    Standard,
    /// Highest quality
    Premium,
}

// ============================================================================
// Model Capabilities
// ============================================================================

/// Static capability descriptor for one backend
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelCapabilities {
    /// Backend identifier
    pub id: String,

    /// Human-readable name
    pub display_name: String,

    /// Maximum context window (tokens)
    pub max_tokens: u32,

    /// Whether images are accepted
    pub supports_vision: bool,

    /// Whether streaming responses are supported
    pub supports_streaming: bool,

    /// Typical end-to-end latency in milliseconds
    pub avg_latency_ms: u64,

    /// Blended price per token (USD)
    pub cost_per_token: f64,

    /// General quality (0.0 - 1.0)
    pub quality_score: f64,

    /// Accuracy on medical questions (0.0 - 1.0)
    pub medical_accuracy: f64,

    /// Complexity categories this backend is suitable for
    pub supported_complexity: Vec<ComplexityCategory>,

    /// Response languages (ISO 639-1)
    pub supported_languages: Vec<String>,

    /// Price/quality tier
    pub tier: ModelTier,
}

impl ModelCapabilities {
    /// Create a descriptor with neutral defaults
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            max_tokens: 8_192,
            supports_vision: false,
            supports_streaming: true,
            avg_latency_ms: 1_000,
            cost_per_token: 0.000_001,
            quality_score: 0.5,
            medical_accuracy: 0.5,
            supported_complexity: ComplexityCategory::ALL.to_vec(),
            supported_languages: vec!["en".to_string()],
            tier: ModelTier::Standard,
        }
    }

    /// Whether this backend handles the given category
    #[must_use]
    pub fn supports_complexity(&self, category: ComplexityCategory) -> bool {
        self.supported_complexity.contains(&category)
    }

    /// Whether this backend answers in the given language
    #[must_use]
    pub fn supports_language(&self, language: &str) -> bool {
        self.supported_languages
            .iter()
            .any(|l| l.eq_ignore_ascii_case(language))
    }

    /// Whether `category` is the most demanding tier this backend supports
    #[must_use]
    pub fn is_exact_complexity_match(&self, category: ComplexityCategory) -> bool {
        self.supported_complexity.iter().max() == Some(&category)
    }
}

fn languages(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|c| (*c).to_string()).collect()
}

// ============================================================================
// Registry
// ============================================================================

/// Read-only table of backend capabilities, in registration order
#[derive(Clone, Debug, Default)]
pub struct ModelCapabilityRegistry {
    models: Vec<ModelCapabilities>,
}

impl ModelCapabilityRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in backend table
    #[must_use]
    pub fn with_defaults() -> Self {
        use ComplexityCategory::{Advanced, Complex, Moderate, Simple};

        let mut registry = Self::new();
        let wide = &["en", "es", "fr", "de", "pt", "it", "zh", "ja"];

        registry.register(ModelCapabilities {
            id: "gpt-4o".to_string(),
            display_name: "GPT-4o".to_string(),
            max_tokens: 128_000,
            supports_vision: true,
            supports_streaming: true,
            avg_latency_ms: 2_500,
            cost_per_token: 0.000_005,
            quality_score: 0.95,
            medical_accuracy: 0.90,
            supported_complexity: vec![Moderate, Complex, Advanced],
            supported_languages: languages(wide),
            tier: ModelTier::Premium,
        });
        registry.register(ModelCapabilities {
            id: "claude-3-5-sonnet".to_string(),
            display_name: "Claude 3.5 Sonnet".to_string(),
            max_tokens: 200_000,
            supports_vision: true,
            supports_streaming: true,
            avg_latency_ms: 2_000,
            cost_per_token: 0.000_003,
            quality_score: 0.94,
            medical_accuracy: 0.92,
            supported_complexity: vec![Moderate, Complex, Advanced],
            supported_languages: languages(wide),
            tier: ModelTier::Premium,
        });
        registry.register(ModelCapabilities {
            id: "gemini-1.5-pro".to_string(),
            display_name: "Gemini 1.5 Pro".to_string(),
            max_tokens: 1_000_000,
            supports_vision: true,
            supports_streaming: true,
            avg_latency_ms: 3_000,
            cost_per_token: 0.000_003_5,
            quality_score: 0.90,
            medical_accuracy: 0.85,
            supported_complexity: vec![Moderate, Complex, Advanced],
            supported_languages: languages(wide),
            tier: ModelTier::Standard,
        });
        registry.register(ModelCapabilities {
            id: "gpt-4o-mini".to_string(),
            display_name: "GPT-4o mini".to_string(),
            max_tokens: 128_000,
            supports_vision: true,
            supports_streaming: true,
            avg_latency_ms: 900,
            cost_per_token: 0.000_000_15,
            quality_score: 0.82,
            medical_accuracy: 0.75,
            supported_complexity: vec![Simple, Moderate, Complex],
            supported_languages: languages(wide),
            tier: ModelTier::Economy,
        });
        registry.register(ModelCapabilities {
            id: "claude-3-haiku".to_string(),
            display_name: "Claude 3 Haiku".to_string(),
            max_tokens: 200_000,
            supports_vision: true,
            supports_streaming: true,
            avg_latency_ms: 700,
            cost_per_token: 0.000_000_25,
            quality_score: 0.80,
            medical_accuracy: 0.74,
            supported_complexity: vec![Simple, Moderate],
            supported_languages: languages(wide),
            tier: ModelTier::Economy,
        });
        registry.register(ModelCapabilities {
            id: "llama-3.1-70b".to_string(),
            display_name: "Llama 3.1 70B".to_string(),
            max_tokens: 128_000,
            supports_vision: false,
            supports_streaming: true,
            avg_latency_ms: 1_200,
            cost_per_token: 0.000_000_9,
            quality_score: 0.78,
            medical_accuracy: 0.70,
            supported_complexity: vec![Simple, Moderate, Complex],
            supported_languages: languages(&["en", "es", "fr", "de"]),
            tier: ModelTier::Standard,
        });

        registry
    }

    /// Register (or replace) a backend descriptor
    pub fn register(&mut self, capabilities: ModelCapabilities) {
        if let Some(existing) = self.models.iter_mut().find(|m| m.id == capabilities.id) {
            *existing = capabilities;
        } else {
            self.models.push(capabilities);
        }
    }

    /// Look up a backend
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ModelCapabilities> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Whether a backend is registered
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// All backend ids in registration order
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.models.iter().map(|m| m.id.clone()).collect()
    }

    /// All descriptors in registration order
    #[must_use]
    pub fn all(&self) -> &[ModelCapabilities] {
        &self.models
    }

    /// Number of registered backends
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
