//! Routing Request
//!
//! The caller-supplied payload that the router classifies and dispatches.
//! A [`Request`] is never mutated once routing begins; every component
//! receives it by shared reference.

use serde::{Deserialize, Serialize};

// ============================================================================
// Conversation
// ============================================================================

/// Role of a conversation turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions
    System,
    /// End-user turn
    #[default]
    User,
    /// Model turn
    Assistant,
}

/// A single conversation turn
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    /// Who produced this turn
    pub role: MessageRole,
    /// Text content
    pub content: String,
}

impl Message {
    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

// ============================================================================
// Attachments
// ============================================================================

/// Kind of attached content
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    /// Image that requires a vision-capable backend
    Image,
    /// Any other file (documents, lab reports, ...)
    File,
}

/// Attached image or file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Attachment kind
    pub kind: AttachmentKind,
    /// Original file name, if known
    #[serde(default)]
    pub name: Option<String>,
    /// Size in bytes
    #[serde(default)]
    pub size_bytes: u64,
}

impl Attachment {
    /// An image attachment of the given size
    #[must_use]
    pub fn image(size_bytes: u64) -> Self {
        Self {
            kind: AttachmentKind::Image,
            name: None,
            size_bytes,
        }
    }

    /// A file attachment of the given size
    #[must_use]
    pub fn file(size_bytes: u64) -> Self {
        Self {
            kind: AttachmentKind::File,
            name: None,
            size_bytes,
        }
    }
}

// ============================================================================
// Domain Metadata
// ============================================================================

/// Medical complexity tier of the caller's history
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MedicalComplexity {
    /// Routine history
    Low,
    /// Some chronic conditions or medications
    Medium,
    /// Multiple interacting conditions
    High,
}

/// Summary of the caller's medical history
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalHistory {
    /// Free-form summary
    #[serde(default)]
    pub summary: String,
    /// Complexity tier
    pub complexity: MedicalComplexity,
}

/// How urgently the caller needs an answer
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// No time pressure
    Low,
    /// Regular request
    Normal,
    /// Needs prompt attention
    High,
    /// Time-critical
    Urgent,
}

// ============================================================================
// Request
// ============================================================================

/// A generation request as supplied by the caller
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Request {
    /// Correlation id for logs
    pub request_id: String,
    /// Ordered conversation turns
    pub messages: Vec<Message>,
    /// Attached images and files
    pub attachments: Vec<Attachment>,
    /// Caller asks for an in-depth analysis
    pub requires_analysis: bool,
    /// Caller asks for a personalised answer
    pub requires_personalization: bool,
    /// Medical history summary
    pub medical_history: Option<MedicalHistory>,
    /// Urgency tier
    pub urgency: Option<Urgency>,
    /// Response language (ISO 639-1, e.g. "en")
    pub language: Option<String>,
    /// Backends the caller would like to be tried first
    pub preferred_backends: Vec<String>,
    /// Backends that must never be used
    pub excluded_backends: Vec<String>,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            messages: Vec::new(),
            attachments: Vec::new(),
            requires_analysis: false,
            requires_personalization: false,
            medical_history: None,
            urgency: None,
            language: None,
            preferred_backends: Vec::new(),
            excluded_backends: Vec::new(),
        }
    }
}

impl Request {
    /// Create a request with a single user message
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(prompt)],
            ..Default::default()
        }
    }

    /// Create a request from a full conversation
    #[must_use]
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    /// Attach an image or file
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Flag the request as needing analysis
    #[must_use]
    pub fn with_analysis(mut self) -> Self {
        self.requires_analysis = true;
        self
    }

    /// Flag the request as needing personalisation
    #[must_use]
    pub fn with_personalization(mut self) -> Self {
        self.requires_personalization = true;
        self
    }

    /// Set urgency
    #[must_use]
    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = Some(urgency);
        self
    }

    /// Set medical history
    #[must_use]
    pub fn with_medical_history(mut self, history: MedicalHistory) -> Self {
        self.medical_history = Some(history);
        self
    }

    /// Set response language
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Exclude a backend
    pub fn excluding(mut self, backend_id: impl Into<String>) -> Self {
        self.excluded_backends.push(backend_id.into());
        self
    }

    /// Prefer a backend
    pub fn preferring(mut self, backend_id: impl Into<String>) -> Self {
        self.preferred_backends.push(backend_id.into());
        self
    }

    /// Number of attached images
    #[must_use]
    pub fn image_count(&self) -> usize {
        self.attachments
            .iter()
            .filter(|a| a.kind == AttachmentKind::Image)
            .count()
    }

    /// Total size of non-image attachments in bytes
    #[must_use]
    pub fn file_bytes(&self) -> u64 {
        self.attachments
            .iter()
            .filter(|a| a.kind == AttachmentKind::File)
            .fold(0u64, |acc, a| acc.saturating_add(a.size_bytes))
    }

    /// Content of the most recent user turn
    #[must_use]
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
    }
}
