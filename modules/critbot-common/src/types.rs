use serde::{Deserialize, Serialize};

/// Readable text pulled from one URL, plus the page title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub content: String,
    pub title: String,
}

/// Outcome of critiquing one URL. Always displayable: failures are folded
/// into [`CritiqueResult::analysis_error`] rather than surfaced as errors.
#[derive(Debug, Clone, PartialEq)]
pub struct CritiqueResult {
    /// Full model reply, kept verbatim.
    pub criticism: String,
    pub summary: String,
    /// 50 when the reply carries no score line. Negative scores are penalties.
    pub score_number: f64,
    pub score_emoji: Option<&'static str>,
}

impl CritiqueResult {
    pub const ERROR_CRITICISM: &'static str =
        "I'm sorry, I couldn't analyze this content due to a technical issue.";
    pub const ERROR_SUMMARY: &'static str = "Analysis error";
    pub const ERROR_EMOJI: &'static str = "⚠️";

    pub fn analysis_error() -> Self {
        Self {
            criticism: Self::ERROR_CRITICISM.to_string(),
            summary: Self::ERROR_SUMMARY.to_string(),
            score_number: 0.0,
            score_emoji: Some(Self::ERROR_EMOJI),
        }
    }

    pub fn is_analysis_error(&self) -> bool {
        self.criticism == Self::ERROR_CRITICISM && self.summary == Self::ERROR_SUMMARY
    }
}

/// One persisted critique, written once and never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CritiqueRecord {
    pub title: String,
    pub url: String,
    pub timestamp: String,
    pub content: String,
    pub criticism: String,
    pub summary: String,
    pub score: f64,
}

/// Minimal view of a chat message used to build model history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessageRef {
    pub body: String,
    pub from_me: bool,
    pub sender_name: Option<String>,
}

impl ChatMessageRef {
    pub fn new(body: impl Into<String>, from_me: bool, sender_name: Option<String>) -> Self {
        Self {
            body: body.into(),
            from_me,
            sender_name,
        }
    }

    /// Name shown to the model for a non-bot message.
    pub fn display_name(&self) -> &str {
        self.sender_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or("User")
    }
}
