//! The span data model.
//!
//! A [`Span`] is a labeled substring of the prompt: a semantic role from a
//! closed taxonomy, a confidence score, and the character range it occupied
//! in the normalized text at labeling time. Offsets are *hints* - the text
//! may have been edited since labeling - so consumers re-derive positions via
//! the locator before acting on them.

use crate::cache::content_hash;
use crate::offsets;
use serde::{Deserialize, Serialize};

/// Semantic role taxonomy for prompt spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    /// The main subject being depicted
    Subject,
    /// What the subject is doing
    Action,
    /// Scene or environment
    Setting,
    /// Light source, direction, or quality
    Lighting,
    /// Camera, lens, framing, or shot type
    Camera,
    /// Artistic style or medium
    Style,
    /// Emotional tone of the image
    Mood,
    /// Rendering quality or fidelity modifiers
    Quality,
}

impl PromptRole {
    /// Stable string form, matching the wire and data-attribute contracts.
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptRole::Subject => "subject",
            PromptRole::Action => "action",
            PromptRole::Setting => "setting",
            PromptRole::Lighting => "lighting",
            PromptRole::Camera => "camera",
            PromptRole::Style => "style",
            PromptRole::Mood => "mood",
            PromptRole::Quality => "quality",
        }
    }

    /// Parse the stable string form back into a role.
    pub fn parse(value: &str) -> Option<PromptRole> {
        match value {
            "subject" => Some(PromptRole::Subject),
            "action" => Some(PromptRole::Action),
            "setting" => Some(PromptRole::Setting),
            "lighting" => Some(PromptRole::Lighting),
            "camera" => Some(PromptRole::Camera),
            "style" => Some(PromptRole::Style),
            "mood" => Some(PromptRole::Mood),
            "quality" => Some(PromptRole::Quality),
            _ => None,
        }
    }
}

/// Provenance of a span: how the labeling service produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpanSource {
    /// Matched against a curated lexicon
    #[serde(rename = "lexicon-matched")]
    Lexicon,
    /// Inferred by the labeling model
    #[serde(rename = "model-inferred")]
    Model,
}

impl SpanSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanSource::Lexicon => "lexicon-matched",
            SpanSource::Model => "model-inferred",
        }
    }

    pub fn parse(value: &str) -> Option<SpanSource> {
        match value {
            "lexicon-matched" => Some(SpanSource::Lexicon),
            "model-inferred" => Some(SpanSource::Model),
            _ => None,
        }
    }
}

impl Default for SpanSource {
    fn default() -> Self {
        SpanSource::Model
    }
}

/// A labeled substring of the prompt text.
///
/// `start`/`end` are char offsets into the normalized text *at label time*.
/// The invariant `quote == text[start..end]` is expected to decay as the user
/// edits; treat the offsets as relocation hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    /// Stable identifier, unique per extraction pass
    pub id: String,

    /// The literal substring this span refers to
    #[serde(alias = "text")]
    pub quote: String,

    /// Char offset of the first char (at label time)
    pub start: usize,

    /// Char offset one past the last char (at label time)
    pub end: usize,

    /// Semantic role
    pub role: PromptRole,

    /// Provenance tag
    #[serde(default)]
    pub source: SpanSource,

    /// Labeler confidence in [0, 1]
    pub confidence: f64,

    /// Short text snippet preceding the span, captured at creation time
    #[serde(default)]
    pub left_ctx: String,

    /// Short text snippet following the span, captured at creation time
    #[serde(default)]
    pub right_ctx: String,

    /// Dedupe key for repeated extraction/validation passes
    #[serde(default)]
    pub idempotency_key: String,

    /// Whether structural validation accepted this span
    #[serde(default)]
    pub validator_pass: bool,
}

/// Chars of surrounding text captured as relocation context.
pub const CONTEXT_CHARS: usize = 24;

impl Span {
    /// Create a span over `text[start..end)` (char offsets), capturing
    /// surrounding context and deriving the idempotency key.
    ///
    /// Returns `None` when the range is out of bounds.
    pub fn over(
        id: impl Into<String>,
        text: &str,
        start: usize,
        end: usize,
        role: PromptRole,
        source: SpanSource,
        confidence: f64,
    ) -> Option<Span> {
        let quote = offsets::char_slice(text, start, end)?.to_string();
        if quote.is_empty() {
            return None;
        }
        let (left_ctx, right_ctx) = capture_context(text, start, end);
        let idempotency_key = derive_idempotency_key(&quote, start, end);
        Some(Span {
            id: id.into(),
            quote,
            start,
            end,
            role,
            source,
            confidence: confidence.clamp(0.0, 1.0),
            left_ctx,
            right_ctx,
            idempotency_key,
            validator_pass: true,
        })
    }

    /// Span length in chars, as recorded at label time.
    pub fn char_len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the recorded offsets still hold against `text`:
    /// in bounds and slicing to the quote.
    pub fn offsets_hold(&self, text: &str) -> bool {
        self.start < self.end
            && offsets::char_slice(text, self.start, self.end)
                .map(|slice| slice == self.quote)
                .unwrap_or(false)
    }

    /// Confidence tier under the given thresholds.
    pub fn tier(&self, thresholds: &RevealThresholds) -> ConfidenceTier {
        thresholds.tier_of(self.confidence)
    }

    /// True when the recorded range overlaps `other`'s.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Capture left/right context snippets around `[start, end)`.
pub fn capture_context(text: &str, start: usize, end: usize) -> (String, String) {
    let total = offsets::char_len(text);
    let left_from = start.saturating_sub(CONTEXT_CHARS);
    let right_to = (end + CONTEXT_CHARS).min(total);
    let left = offsets::char_slice(text, left_from, start.min(total)).unwrap_or("");
    let right = offsets::char_slice(text, end.min(total), right_to).unwrap_or("");
    (left.to_string(), right.to_string())
}

/// Derive the dedupe key from quote and position.
pub fn derive_idempotency_key(quote: &str, start: usize, end: usize) -> String {
    format!("{}@{}:{}", content_hash(quote), start, end)
}

/// Confidence tier driving rendering order and suggestion-panel warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

/// Configurable tier boundaries.
///
/// `high` and `medium` are inclusive lower bounds; everything below `medium`
/// is low tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RevealThresholds {
    pub high: f64,
    pub medium: f64,
}

impl Default for RevealThresholds {
    fn default() -> Self {
        Self {
            high: 0.8,
            medium: 0.6,
        }
    }
}

impl RevealThresholds {
    pub fn tier_of(&self, confidence: f64) -> ConfidenceTier {
        if confidence >= self.high {
            ConfidenceTier::High
        } else if confidence >= self.medium {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_captures_quote_and_context() {
        let text = "a photo of a red fox in morning light";
        let span = Span::over("s1", text, 13, 20, PromptRole::Subject, SpanSource::Model, 0.9)
            .unwrap();
        assert_eq!(span.quote, "red fox");
        assert_eq!(span.left_ctx, "a photo of a ");
        assert_eq!(span.right_ctx, " in morning light");
        assert!(span.offsets_hold(text));
    }

    #[test]
    fn over_rejects_out_of_bounds() {
        assert!(Span::over("s1", "short", 2, 99, PromptRole::Style, SpanSource::Model, 0.5)
            .is_none());
    }

    #[test]
    fn offsets_decay_when_text_shifts() {
        let text = "a photo of a red fox";
        let span = Span::over("s1", text, 13, 20, PromptRole::Subject, SpanSource::Model, 0.9)
            .unwrap();
        let edited = format!("new {}", text);
        assert!(!span.offsets_hold(&edited));
    }

    #[test]
    fn confidence_is_clamped() {
        let span = Span::over("s1", "abc", 0, 3, PromptRole::Mood, SpanSource::Lexicon, 1.7)
            .unwrap();
        assert_eq!(span.confidence, 1.0);
    }

    #[test]
    fn idempotency_key_tracks_quote_and_position() {
        let a = derive_idempotency_key("red fox", 13, 20);
        let b = derive_idempotency_key("red fox", 13, 20);
        let c = derive_idempotency_key("red fox", 14, 21);
        let d = derive_idempotency_key("blue fox", 13, 20);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn tier_boundaries() {
        let t = RevealThresholds::default();
        assert_eq!(t.tier_of(0.9), ConfidenceTier::High);
        assert_eq!(t.tier_of(0.8), ConfidenceTier::High);
        assert_eq!(t.tier_of(0.7), ConfidenceTier::Medium);
        assert_eq!(t.tier_of(0.6), ConfidenceTier::Medium);
        assert_eq!(t.tier_of(0.3), ConfidenceTier::Low);
    }

    #[test]
    fn role_string_roundtrip() {
        let roles = [
            PromptRole::Subject,
            PromptRole::Action,
            PromptRole::Setting,
            PromptRole::Lighting,
            PromptRole::Camera,
            PromptRole::Style,
            PromptRole::Mood,
            PromptRole::Quality,
        ];
        for role in roles.iter() {
            assert_eq!(PromptRole::parse(role.as_str()), Some(*role));
        }
        assert_eq!(PromptRole::parse("teleporter"), None);
    }

    #[test]
    fn span_wire_shape_accepts_text_alias() {
        let json = r#"{
            "id": "s1",
            "text": "golden hour",
            "start": 4,
            "end": 15,
            "role": "lighting",
            "source": "lexicon-matched",
            "confidence": 0.92
        }"#;
        let span: Span = serde_json::from_str(json).unwrap();
        assert_eq!(span.quote, "golden hour");
        assert_eq!(span.role, PromptRole::Lighting);
        assert_eq!(span.source, SpanSource::Lexicon);
        assert!(!span.validator_pass);
    }

    #[test]
    fn overlap_detection() {
        let text = "one two three four";
        let a = Span::over("a", text, 0, 7, PromptRole::Subject, SpanSource::Model, 0.9).unwrap();
        let b = Span::over("b", text, 4, 13, PromptRole::Action, SpanSource::Model, 0.8).unwrap();
        let c = Span::over("c", text, 8, 13, PromptRole::Action, SpanSource::Model, 0.8).unwrap();
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }
}
