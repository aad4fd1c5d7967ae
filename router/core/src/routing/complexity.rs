//! Request Complexity Analysis
//!
//! Converts a raw [`Request`] into a normalized score (0-100) and a coarse
//! [`ComplexityCategory`]. Analysis is pure and deterministic: the same
//! request always yields the same result, and missing fields contribute zero.
//!
//! # Scoring
//!
//! ```text
//! messages        1 pt each (max 20)
//! images          10 pt each + 25 flat when any image is present
//! files           5 pt per MB (max 20)
//! long history    15 pt (> 10 messages)
//! analysis        25 pt
//! personalization 10 pt
//! medical         5 / 15 / 25 (low / medium / high)
//! urgency         0 / 5 / 10 / 20 (low / normal / high / urgent)
//! ```
//!
//! The sum is capped at 100 and bucketed: `>= 75` advanced, `>= 50` complex,
//! `>= 25` moderate, otherwise simple.

use serde::{Deserialize, Serialize};

use super::request::{MedicalComplexity, Request, Urgency};

/// Points per conversation turn
pub const MESSAGE_POINTS: u32 = 1;
/// Upper bound on the message contribution
pub const MESSAGE_POINTS_CAP: u32 = 20;
/// Points per attached image
pub const IMAGE_POINTS: u32 = 10;
/// Flat bonus when any image is attached
pub const VISION_BONUS: u32 = 25;
/// Points per megabyte of attached files
pub const FILE_POINTS_PER_MB: u32 = 5;
/// Upper bound on the file-size contribution
pub const FILE_POINTS_CAP: u32 = 20;
/// Bonus for conversations longer than [`LONG_HISTORY_MESSAGES`]
pub const LONG_HISTORY_BONUS: u32 = 15;
/// Message count above which a conversation counts as long
pub const LONG_HISTORY_MESSAGES: usize = 10;
/// Bonus when the caller asks for analysis
pub const ANALYSIS_BONUS: u32 = 25;
/// Bonus when the caller asks for personalisation
pub const PERSONALIZATION_BONUS: u32 = 10;
/// Maximum score
pub const MAX_SCORE: u32 = 100;

const BYTES_PER_MB: u64 = 1024 * 1024;

// ============================================================================
// Category
// ============================================================================

/// Coarse bucket summarizing expected request difficulty
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityCategory {
    /// Score below 25
    #[default]
    Simple,
    /// Score 25-49
    Moderate,
    /// Score 50-74
    Complex,
    /// Score 75 and above
    Advanced,
}

impl ComplexityCategory {
    /// All categories in ascending order
    pub const ALL: [Self; 4] = [Self::Simple, Self::Moderate, Self::Complex, Self::Advanced];

    /// Bucket a score into a category
    #[must_use]
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s >= 75 => Self::Advanced,
            s if s >= 50 => Self::Complex,
            s if s >= 25 => Self::Moderate,
            _ => Self::Simple,
        }
    }
}

impl std::fmt::Display for ComplexityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Moderate => write!(f, "moderate"),
            Self::Complex => write!(f, "complex"),
            Self::Advanced => write!(f, "advanced"),
        }
    }
}

// ============================================================================
// Factors
// ============================================================================

/// Facts derived from a request that drive the score
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ComplexityFactors {
    pub has_images: bool,
    pub image_count: usize,
    pub file_bytes: u64,
    pub message_count: usize,
    pub has_long_history: bool,
    pub requires_analysis: bool,
    pub requires_personalization: bool,
    pub medical_complexity: Option<MedicalComplexity>,
    pub urgency: Option<Urgency>,
}

impl ComplexityFactors {
    /// Extract factors from a request
    #[must_use]
    pub fn from_request(request: &Request) -> Self {
        let image_count = request.image_count();
        let message_count = request.messages.len();
        Self {
            has_images: image_count > 0,
            image_count,
            file_bytes: request.file_bytes(),
            message_count,
            has_long_history: message_count > LONG_HISTORY_MESSAGES,
            requires_analysis: request.requires_analysis,
            requires_personalization: request.requires_personalization,
            medical_complexity: request.medical_history.as_ref().map(|h| h.complexity),
            urgency: request.urgency,
        }
    }
}

/// Points contributed by a medical complexity tier
#[must_use]
pub fn medical_points(tier: MedicalComplexity) -> u32 {
    match tier {
        MedicalComplexity::Low => 5,
        MedicalComplexity::Medium => 15,
        MedicalComplexity::High => 25,
    }
}

/// Points contributed by an urgency tier
#[must_use]
pub fn urgency_points(urgency: Urgency) -> u32 {
    match urgency {
        Urgency::Low => 0,
        Urgency::Normal => 5,
        Urgency::High => 10,
        Urgency::Urgent => 20,
    }
}

// ============================================================================
// Analysis Result
// ============================================================================

/// Result of complexity analysis
#[derive(Clone, Debug, Serialize)]
pub struct RequestComplexity {
    /// Bucketed category
    pub category: ComplexityCategory,
    /// Normalized score (0-100)
    pub score: u32,
    /// Facts the score was computed from
    pub factors: ComplexityFactors,
    /// One entry per contributing factor, with its points
    pub reasons: Vec<String>,
}

/// Stateless analyzer
#[derive(Clone, Copy, Debug, Default)]
pub struct ComplexityAnalyzer;

impl ComplexityAnalyzer {
    /// Create a new analyzer
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Analyze a request
    #[must_use]
    pub fn analyze(&self, request: &Request) -> RequestComplexity {
        let factors = ComplexityFactors::from_request(request);
        let mut score = 0_u32;
        let mut reasons = Vec::new();

        let mut add = |points: u32, reason: String| {
            if points > 0 {
                score += points;
                reasons.push(format!("{reason} (+{points})"));
            }
        };

        let message_points =
            (factors.message_count as u32).saturating_mul(MESSAGE_POINTS).min(MESSAGE_POINTS_CAP);
        add(message_points, format!("{} message(s)", factors.message_count));

        if factors.has_images {
            add(
                (factors.image_count as u32).saturating_mul(IMAGE_POINTS),
                format!("{} image(s)", factors.image_count),
            );
            add(VISION_BONUS, "vision required".to_string());
        }

        let file_points = u32::try_from(
            factors.file_bytes.saturating_mul(u64::from(FILE_POINTS_PER_MB)) / BYTES_PER_MB,
        )
        .unwrap_or(u32::MAX)
        .min(FILE_POINTS_CAP);
        add(
            file_points,
            format!("{:.1} MB of attached files", factors.file_bytes as f64 / BYTES_PER_MB as f64),
        );

        if factors.has_long_history {
            add(LONG_HISTORY_BONUS, "long conversation history".to_string());
        }
        if factors.requires_analysis {
            add(ANALYSIS_BONUS, "analysis requested".to_string());
        }
        if factors.requires_personalization {
            add(PERSONALIZATION_BONUS, "personalization requested".to_string());
        }
        if let Some(tier) = factors.medical_complexity {
            add(medical_points(tier), format!("{tier:?} medical complexity").to_lowercase());
        }
        if let Some(urgency) = factors.urgency {
            add(urgency_points(urgency), format!("{urgency:?} urgency").to_lowercase());
        }

        let score = score.min(MAX_SCORE);
        let category = ComplexityCategory::from_score(score);

        tracing::debug!(
            request_id = %request.request_id,
            score,
            %category,
            "Analyzed request complexity"
        );

        RequestComplexity {
            category,
            score,
            factors,
            reasons,
        }
    }
}
