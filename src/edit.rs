//! Span edit application.
//!
//! The single place a suggestion click becomes a text mutation. Given the
//! current prompt, an edit operation, and the span it targets, compute the
//! updated prompt and the boundaries that were spliced. Every precondition
//! failure is a quiet no-op (`updated_prompt: None`) - this path runs on
//! every click and must never throw a user out of their edit.

use crate::locate::{locate, LocateOptions};
use crate::offsets;
use crate::span::Span;
use serde::{Deserialize, Serialize};

/// The two user-visible span edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SpanEditKind {
    /// Replace the span's text with a suggestion
    #[serde(rename_all = "camelCase")]
    ReplaceSpanText { replacement_text: String },
    /// Delete the span's text outright
    RemoveSpan,
}

/// An edit request against one span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanEdit {
    #[serde(flatten)]
    pub kind: SpanEditKind,
    /// Fallback quote when the span carries none.
    #[serde(default)]
    pub anchor_quote: Option<String>,
}

/// Result of applying an edit.
///
/// `updated_prompt == None` means the edit was a no-op: nothing to change,
/// nothing located, or the result would be textually identical.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome {
    pub updated_prompt: Option<String>,
    pub match_start: usize,
    pub match_end: usize,
}

impl EditOutcome {
    fn noop() -> Self {
        EditOutcome {
            updated_prompt: None,
            match_start: 0,
            match_end: 0,
        }
    }
}

/// Apply `edit` to `prompt`, relocating the span's quote first.
///
/// Quote derivation, first non-empty wins: `span.quote`, then
/// `edit.anchor_quote`. Pure: callers commit `updated_prompt` to state and
/// handle undo bookkeeping themselves.
pub fn apply_edit(prompt: &str, edit: &SpanEdit, span: Option<&Span>) -> EditOutcome {
    if prompt.is_empty() {
        return EditOutcome::noop();
    }

    let quote = match derive_quote(edit, span) {
        Some(quote) => quote,
        None => return EditOutcome::noop(),
    };

    let opts = LocateOptions {
        prefer_index: span.map(|s| s.start),
        left_ctx: span.map(|s| s.left_ctx.as_str()).filter(|ctx| !ctx.is_empty()),
        right_ctx: span.map(|s| s.right_ctx.as_str()).filter(|ctx| !ctx.is_empty()),
    };
    let m = match locate(prompt, quote, &opts) {
        Some(m) => m,
        None => return EditOutcome::noop(),
    };

    let replacement = match &edit.kind {
        SpanEditKind::ReplaceSpanText { replacement_text } => replacement_text.as_str(),
        SpanEditKind::RemoveSpan => "",
    };

    match offsets::splice(prompt, m.start, m.end, replacement) {
        Some(updated) if updated != prompt => EditOutcome {
            updated_prompt: Some(updated),
            match_start: m.start,
            match_end: m.end,
        },
        // identical result: suppress so no spurious re-render or history entry
        _ => EditOutcome {
            updated_prompt: None,
            match_start: m.start,
            match_end: m.end,
        },
    }
}

fn derive_quote<'a>(edit: &'a SpanEdit, span: Option<&'a Span>) -> Option<&'a str> {
    let from_span = span.map(|s| s.quote.as_str()).filter(|q| !q.trim().is_empty());
    let from_edit = edit
        .anchor_quote
        .as_deref()
        .filter(|q| !q.trim().is_empty());
    from_span.or(from_edit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{PromptRole, SpanSource};

    fn span_over(text: &str, start: usize, end: usize) -> Span {
        Span::over("s1", text, start, end, PromptRole::Subject, SpanSource::Model, 0.9).unwrap()
    }

    fn replace(replacement: &str) -> SpanEdit {
        SpanEdit {
            kind: SpanEditKind::ReplaceSpanText {
                replacement_text: replacement.to_string(),
            },
            anchor_quote: None,
        }
    }

    fn remove() -> SpanEdit {
        SpanEdit {
            kind: SpanEditKind::RemoveSpan,
            anchor_quote: None,
        }
    }

    #[test]
    fn replaces_span_text() {
        let prompt = "hello world today";
        let span = span_over(prompt, 6, 11);
        assert_eq!(span.quote, "world");

        let outcome = apply_edit(prompt, &replace("earth"), Some(&span));
        assert_eq!(outcome.updated_prompt.as_deref(), Some("hello earth today"));
        assert_eq!(outcome.match_start, 6);
        assert_eq!(outcome.match_end, 11);
    }

    #[test]
    fn removes_span_text() {
        let prompt = "hello world today";
        let span = span_over(prompt, 5, 11);
        assert_eq!(span.quote, " world");

        let outcome = apply_edit(prompt, &remove(), Some(&span));
        assert_eq!(outcome.updated_prompt.as_deref(), Some("hello today"));
        assert_eq!(outcome.match_start, 5);
        assert_eq!(outcome.match_end, 11);
    }

    #[test]
    fn replacing_with_itself_is_a_noop() {
        let prompt = "hello world";
        let span = span_over(prompt, 6, 11);
        let outcome = apply_edit(prompt, &replace("world"), Some(&span));
        assert_eq!(outcome.updated_prompt, None);
        // boundaries still reported for the caller's selection logic
        assert_eq!((outcome.match_start, outcome.match_end), (6, 11));
    }

    #[test]
    fn empty_prompt_is_a_noop() {
        let prompt_for_span = "hello world";
        let span = span_over(prompt_for_span, 0, 5);
        let outcome = apply_edit("", &replace("x"), Some(&span));
        assert_eq!(outcome.updated_prompt, None);
    }

    #[test]
    fn missing_span_without_anchor_is_a_noop() {
        let outcome = apply_edit("hello world", &replace("x"), None);
        assert_eq!(outcome.updated_prompt, None);
    }

    #[test]
    fn whitespace_only_quote_is_a_noop() {
        let edit = SpanEdit {
            kind: SpanEditKind::RemoveSpan,
            anchor_quote: Some("   ".to_string()),
        };
        let outcome = apply_edit("hello world", &edit, None);
        assert_eq!(outcome.updated_prompt, None);
    }

    #[test]
    fn unlocatable_quote_is_a_noop() {
        let edit = SpanEdit {
            kind: SpanEditKind::RemoveSpan,
            anchor_quote: Some("nowhere".to_string()),
        };
        let outcome = apply_edit("hello world", &edit, None);
        assert_eq!(outcome.updated_prompt, None);
    }

    #[test]
    fn anchor_quote_is_the_fallback() {
        let edit = SpanEdit {
            kind: SpanEditKind::ReplaceSpanText {
                replacement_text: "dusk".to_string(),
            },
            anchor_quote: Some("dawn".to_string()),
        };
        let outcome = apply_edit("painted at dawn", &edit, None);
        assert_eq!(outcome.updated_prompt.as_deref(), Some("painted at dusk"));
    }

    #[test]
    fn relocates_before_editing_when_offsets_are_stale() {
        let original = "a red fox runs";
        let span = span_over(original, 2, 9); // "red fox"
        // text grew in front of the span since labeling
        let edited = "now a red fox runs";
        let outcome = apply_edit(edited, &replace("grey wolf"), Some(&span));
        assert_eq!(outcome.updated_prompt.as_deref(), Some("now a grey wolf runs"));
        assert_eq!((outcome.match_start, outcome.match_end), (6, 13));
    }

    #[test]
    fn edit_wire_shape() {
        let json = r#"{"type":"replaceSpanText","replacementText":"earth"}"#;
        let edit: SpanEdit = serde_json::from_str(json).unwrap();
        assert_eq!(
            edit.kind,
            SpanEditKind::ReplaceSpanText {
                replacement_text: "earth".to_string()
            }
        );

        let json = r#"{"type":"removeSpan","anchorQuote":"world"}"#;
        let edit: SpanEdit = serde_json::from_str(json).unwrap();
        assert_eq!(edit.kind, SpanEditKind::RemoveSpan);
        assert_eq!(edit.anchor_quote.as_deref(), Some("world"));
    }
}
