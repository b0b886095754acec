//! The editor session: owner of all shared mutable state.
//!
//! One session per open prompt. It owns the position cache (no globals -
//! lifecycle is tied to the session, so nothing leaks across prompts), the
//! adopted span set, and an epoch counter. Every async result carries the
//! epoch it was requested under; a result arriving after the prompt moved
//! on is dropped before it can touch session state.

use crate::payload::{LabelPolicy, LabelRequest, LabelResponse, SuggestionRequest};
use prompt_anchor::{
    apply_edit, locate_cached, normalize, offsets, EditOutcome, LocateOptions, PositionCache,
    QuoteMatch, RevealThresholds, Span, SpanEdit, SpanEditKind,
};
use prompt_anchor_surface::{apply_highlights, RenderReport, SurfaceArena};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Per-session configuration; versions travel with every cache key.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub max_spans: usize,
    pub min_confidence: f64,
    pub template_version: String,
    pub policy: LabelPolicy,
    pub thresholds: RevealThresholds,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_spans: 32,
            min_confidence: 0.3,
            template_version: "v1".to_string(),
            policy: LabelPolicy::new().with("allowOverlap", "false"),
            thresholds: RevealThresholds::default(),
        }
    }
}

/// Session state for one prompt being authored.
pub struct EditorSession {
    config: SessionConfig,
    prompt: String,
    spans: Vec<Span>,
    cache: PositionCache,
    epoch: u64,
}

impl EditorSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            prompt: String::new(),
            spans: Vec::new(),
            cache: PositionCache::new(),
            epoch: 0,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The normalized prompt text all span offsets refer to.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Current epoch; capture before an await, check on the way back.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn cache(&self) -> &PositionCache {
        &self.cache
    }

    /// Replace the prompt text. Normalizes, clears memoized positions, and
    /// bumps the epoch so in-flight async results become stale. Returns
    /// whether the text actually changed.
    pub fn set_prompt(&mut self, raw: &str) -> bool {
        let normalized = normalize(raw);
        if normalized == self.prompt {
            return false;
        }
        self.prompt = normalized;
        self.cache.clear();
        self.epoch += 1;
        true
    }

    /// Move to a new template/lexicon version: existing spans and memoized
    /// positions are invalid under the new labeling regime.
    pub fn set_template_version(&mut self, version: impl Into<String>) {
        let version = version.into();
        if version == self.config.template_version {
            return;
        }
        self.config.template_version = version;
        self.spans.clear();
        self.cache.clear();
        self.epoch += 1;
    }

    /// The labeling request for the current prompt and config.
    pub fn label_request(&self) -> LabelRequest {
        LabelRequest {
            text: self.prompt.clone(),
            max_spans: self.config.max_spans,
            min_confidence: self.config.min_confidence,
            policy: self.config.policy.clone(),
            template_version: self.config.template_version.clone(),
        }
    }

    /// Adopt a labeling response requested under `request_epoch`.
    ///
    /// Stale responses (the prompt changed while the request was in flight)
    /// are dropped. Adopted spans are deduped by idempotency key and
    /// overlap-resolved (higher confidence wins, then earlier start) so the
    /// renderer's non-overlap precondition holds.
    pub fn adopt_spans(&mut self, request_epoch: u64, response: LabelResponse) -> bool {
        if request_epoch != self.epoch {
            debug!(
                request_epoch,
                current = self.epoch,
                "labeling response arrived stale; dropping"
            );
            return false;
        }
        self.spans = resolve_overlaps(dedupe_spans(response.spans));
        true
    }

    /// Relocate one span against the current prompt, memoized.
    pub fn relocate(&mut self, span_id: &str) -> Option<QuoteMatch> {
        let span = self.spans.iter().find(|span| span.id == span_id)?;
        let opts = LocateOptions {
            prefer_index: Some(span.start),
            left_ctx: non_empty(&span.left_ctx),
            right_ctx: non_empty(&span.right_ctx),
        };
        locate_cached(&mut self.cache, &self.prompt, &span.quote, &opts)
    }

    /// Relocate every span; spans the locator gives up on are reported with
    /// `None` so callers can drop them from display.
    pub fn relocate_all(&mut self) -> Vec<(String, Option<QuoteMatch>)> {
        let ids: Vec<String> = self.spans.iter().map(|span| span.id.clone()).collect();
        ids.into_iter()
            .map(|id| {
                let m = self.relocate(&id);
                (id, m)
            })
            .collect()
    }

    /// Apply a suggestion edit to the span's range and commit the result.
    ///
    /// On a real change: the prompt is re-normalized and committed, the
    /// cache cleared, the epoch bumped, and the edited span updated in
    /// place (or removed for `RemoveSpan`). A no-op leaves everything
    /// untouched and returns the outcome for inspection.
    pub fn apply_suggestion(&mut self, span_id: &str, edit: &SpanEdit) -> EditOutcome {
        let span = self.spans.iter().find(|span| span.id == span_id).cloned();
        let outcome = apply_edit(&self.prompt, edit, span.as_ref());

        let updated = match &outcome.updated_prompt {
            Some(updated) => updated.clone(),
            None => return outcome,
        };

        // splicing NFC text can de-normalize at the seam; re-normalize
        self.prompt = normalize(&updated);
        self.cache.clear();
        self.epoch += 1;

        match &edit.kind {
            SpanEditKind::RemoveSpan => {
                self.spans.retain(|span| span.id != span_id);
            }
            SpanEditKind::ReplaceSpanText { replacement_text } => {
                let start = outcome.match_start;
                let end = start + offsets::char_len(replacement_text);
                if let Some(span) = self.spans.iter_mut().find(|span| span.id == span_id) {
                    span.quote = replacement_text.clone();
                    span.start = start;
                    span.end = end;
                    span.idempotency_key =
                        prompt_anchor::derive_idempotency_key(&span.quote, start, end);
                }
                // recapture contexts against the committed prompt
                let (left, right) = prompt_anchor::capture_context(&self.prompt, start, end);
                if let Some(span) = self.spans.iter_mut().find(|span| span.id == span_id) {
                    span.left_ctx = left;
                    span.right_ctx = right;
                }
            }
        }
        outcome
    }

    /// Render the session's spans onto an editable surface.
    pub fn render(&self, arena: &mut SurfaceArena) -> RenderReport {
        apply_highlights(arena, &self.spans)
    }

    /// Build the suggestion request for a clicked span.
    ///
    /// `None` when the span no longer locates: context extraction must not
    /// fall back to a fabricated position.
    pub fn suggestion_request(&mut self, span_id: &str) -> Option<SuggestionRequest> {
        let m = self.relocate(span_id)?;
        let span = self.spans.iter().find(|span| span.id == span_id)?;
        let highlighted = offsets::char_slice(&self.prompt, m.start, m.end)?.to_string();
        let (context_before, context_after) =
            prompt_anchor::capture_context(&self.prompt, m.start, m.end);
        let mut metadata = std::collections::BTreeMap::new();
        metadata.insert("spanId".to_string(), span.id.clone());
        metadata.insert("role".to_string(), span.role.as_str().to_string());
        metadata.insert("source".to_string(), span.source.as_str().to_string());
        metadata.insert("confidence".to_string(), span.confidence.to_string());
        Some(SuggestionRequest {
            highlighted_text: highlighted,
            context_before,
            context_after,
            full_prompt: self.prompt.clone(),
            metadata,
        })
    }
}

fn non_empty(text: &str) -> Option<&str> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Drop repeats of the same extraction across validation passes.
fn dedupe_spans(spans: Vec<Span>) -> Vec<Span> {
    let mut seen = HashSet::new();
    spans
        .into_iter()
        .filter(|span| {
            span.idempotency_key.is_empty() || seen.insert(span.idempotency_key.clone())
        })
        .collect()
}

/// Enforce the renderer's precondition: an ordered, non-overlapping set.
/// Higher confidence wins a collision; ties go to the earlier span.
fn resolve_overlaps(mut spans: Vec<Span>) -> Vec<Span> {
    spans.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then(b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal))
    });
    let mut kept: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        match kept.iter().position(|existing| existing.overlaps(&span)) {
            None => kept.push(span),
            Some(idx) => {
                if span.confidence > kept[idx].confidence {
                    warn!(
                        dropped = %kept[idx].id,
                        kept = %span.id,
                        "overlapping spans; keeping higher confidence"
                    );
                    kept[idx] = span;
                } else {
                    warn!(
                        dropped = %span.id,
                        kept = %kept[idx].id,
                        "overlapping spans; keeping higher confidence"
                    );
                }
            }
        }
    }
    kept.sort_by_key(|span| span.start);
    kept
}
