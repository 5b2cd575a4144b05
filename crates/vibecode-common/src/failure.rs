//! Failure classification.
//!
//! Stored generation errors are free text (whatever the transport or the
//! provider said). The user sees a reason derived by pattern-matching that
//! text, first match wins.

use serde::{Deserialize, Serialize};

/// Longest message shown for an unclassified failure.
pub const GENERIC_MESSAGE_LIMIT: usize = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Cancelled,
    Timeout,
    RateLimited,
    AuthOrKey,
    InsufficientCredits,
    Network,
    Generic,
}

impl FailureKind {
    pub fn classify(error: &str) -> Self {
        let lower = error.to_lowercase();
        let any = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if any(&["abort", "cancel"]) {
            Self::Cancelled
        } else if any(&["timeout", "timed out"]) {
            Self::Timeout
        } else if any(&["rate limit", "429"]) {
            Self::RateLimited
        } else if any(&["api key", "unauthorized", "401"]) {
            Self::AuthOrKey
        } else if any(&["insufficient", "credits", "balance"]) {
            Self::InsufficientCredits
        } else if any(&["network", "fetch"]) {
            Self::Network
        } else {
            Self::Generic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::AuthOrKey => "auth_or_key",
            Self::InsufficientCredits => "insufficient_credits",
            Self::Network => "network",
            Self::Generic => "generic",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Cancelled => "Generation cancelled",
            Self::Timeout => "Request timeout",
            Self::RateLimited => "Rate limited",
            Self::AuthOrKey => "API key error",
            Self::InsufficientCredits => "Insufficient credits",
            Self::Network => "Network error",
            Self::Generic => "Generation failed",
        }
    }

    fn canned_message(&self) -> Option<&'static str> {
        match self {
            Self::Cancelled => Some("The generation was stopped before it finished."),
            Self::Timeout => Some("The model took too long to respond. Try again or pick a faster model."),
            Self::RateLimited => Some("Too many requests right now. Wait a moment and retry."),
            Self::AuthOrKey => Some("Check the OpenRouter API key in Settings."),
            Self::InsufficientCredits => Some("The OpenRouter account has run out of credits."),
            Self::Network => Some("Could not reach the model provider. Check the connection and retry."),
            Self::Generic => None,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-facing description of a failed post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    pub kind: FailureKind,
    pub title: String,
    pub message: String,
}

impl FailureInfo {
    pub fn from_error(error: Option<&str>) -> Self {
        let error = error.unwrap_or("");
        let kind = FailureKind::classify(error);
        let message = match kind.canned_message() {
            Some(m) => m.to_string(),
            None if error.trim().is_empty() => "Unknown error".to_string(),
            None => truncate_chars(error, GENERIC_MESSAGE_LIMIT),
        };
        Self {
            kind,
            title: kind.title().to_string(),
            message,
        }
    }
}

/// Cap `s` at `max` characters without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_order() {
        let cases = [
            ("Generation cancelled: server shutting down", FailureKind::Cancelled),
            ("AbortError: The operation was aborted", FailureKind::Cancelled),
            ("Request timeout after 300s: generation took too long", FailureKind::Timeout),
            ("connection timed out", FailureKind::Timeout),
            ("API error (429 Too Many Requests): slow down", FailureKind::RateLimited),
            ("Rate limit exceeded", FailureKind::RateLimited),
            ("API error (401 Unauthorized): bad key", FailureKind::AuthOrKey),
            ("Invalid API key", FailureKind::AuthOrKey),
            ("Insufficient credits on account", FailureKind::InsufficientCredits),
            ("Your balance is too low", FailureKind::InsufficientCredits),
            ("Network error: connection refused", FailureKind::Network),
            ("fetch failed", FailureKind::Network),
            ("Model returned an empty response", FailureKind::Generic),
        ];
        for (input, expected) in cases {
            assert_eq!(FailureKind::classify(input), expected, "input: {input}");
        }
    }

    #[test]
    fn test_first_match_wins() {
        // Mentions both a timeout and a cancellation; cancellation is checked first.
        assert_eq!(
            FailureKind::classify("cancelled after timeout"),
            FailureKind::Cancelled
        );
        assert_eq!(
            FailureKind::classify("network timeout"),
            FailureKind::Timeout
        );
    }

    #[test]
    fn test_generic_message_is_capped() {
        let long = "x".repeat(400);
        let info = FailureInfo::from_error(Some(&long));
        assert_eq!(info.kind, FailureKind::Generic);
        assert_eq!(info.title, "Generation failed");
        assert_eq!(info.message.chars().count(), GENERIC_MESSAGE_LIMIT);
    }

    #[test]
    fn test_missing_error_is_generic() {
        let info = FailureInfo::from_error(None);
        assert_eq!(info.kind, FailureKind::Generic);
        assert_eq!(info.message, "Unknown error");
    }

    #[test]
    fn test_classified_failure_has_canned_message() {
        let info = FailureInfo::from_error(Some("Request timeout after 120s"));
        assert_eq!(info.kind, FailureKind::Timeout);
        assert_eq!(info.title, "Request timeout");
        assert!(!info.message.is_empty());
    }

    #[test]
    fn test_truncate_chars_respects_code_points() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::RateLimited).unwrap();
        assert_eq!(json, "\"rate_limited\"");
    }
}
