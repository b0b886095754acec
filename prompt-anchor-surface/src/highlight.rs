//! Highlight wrapping over the editable surface.
//!
//! Each located span is wrapped in a `mark` element carrying the span's
//! metadata as data attributes, so a click handler can rebuild the span
//! without re-scanning the document. Wraps are applied in a single
//! left-to-right sweep; the node index is rebuilt after each structural
//! mutation (wrapping never changes text content, so located char offsets
//! stay valid across the sweep - only node boundaries move).
//!
//! Failure isolation: a span that no longer locates, overlaps an earlier
//! one, or resolves onto already-wrapped nodes is skipped with a warning.
//! One bad span never aborts the render pass.

use crate::index::TextNodeIndex;
use crate::node::{Element, NodeId, SurfaceArena};
use prompt_anchor::{locate, LocateOptions, PromptRole, QuoteMatch, Span, SpanSource};
use std::fmt;
use tracing::warn;

/// Tag used for highlight wrapper elements.
pub const HIGHLIGHT_TAG: &str = "mark";

pub const ATTR_SPAN_ID: &str = "data-span-id";
pub const ATTR_ROLE: &str = "data-role";
pub const ATTR_SOURCE: &str = "data-source";
pub const ATTR_START: &str = "data-start";
pub const ATTR_END: &str = "data-end";
pub const ATTR_QUOTE: &str = "data-quote";
pub const ATTR_LEFT_CTX: &str = "data-left-ctx";
pub const ATTR_RIGHT_CTX: &str = "data-right-ctx";
pub const ATTR_IDEMPOTENCY_KEY: &str = "data-idempotency-key";
pub const ATTR_VALIDATOR_PASS: &str = "data-validator-pass";
pub const ATTR_CONFIDENCE: &str = "data-confidence";

/// Why a span was left unrendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The locator found no acceptable range for the quote
    NotLocated,
    /// The located range overlaps an earlier span's range
    Overlap,
    /// The range resolves onto nodes already inside a highlight
    AlreadyWrapped,
    /// The index could not resolve the range into nodes
    Unresolvable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::NotLocated => "not located",
            SkipReason::Overlap => "overlaps earlier span",
            SkipReason::AlreadyWrapped => "already wrapped",
            SkipReason::Unresolvable => "range unresolvable",
        };
        f.write_str(text)
    }
}

/// Outcome of a render pass.
#[derive(Debug, Clone, Default)]
pub struct RenderReport {
    pub applied: Vec<String>,
    pub skipped: Vec<(String, SkipReason)>,
}

impl RenderReport {
    pub fn all_applied(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn summary(&self) -> String {
        format!("{} applied, {} skipped", self.applied.len(), self.skipped.len())
    }
}

/// Wrap every locatable span in a highlight element.
///
/// Spans are relocated against the surface's current text (recorded offsets
/// are only hints), then applied in document order of their located ranges.
pub fn apply_highlights(arena: &mut SurfaceArena, spans: &[Span]) -> RenderReport {
    let text = arena.text_content();
    let mut report = RenderReport::default();

    // relocate everything against an immutable view first
    let mut located: Vec<(&Span, QuoteMatch)> = Vec::new();
    for span in spans.iter() {
        let opts = LocateOptions {
            prefer_index: Some(span.start),
            left_ctx: if span.left_ctx.is_empty() {
                None
            } else {
                Some(span.left_ctx.as_str())
            },
            right_ctx: if span.right_ctx.is_empty() {
                None
            } else {
                Some(span.right_ctx.as_str())
            },
        };
        match locate(&text, &span.quote, &opts) {
            Some(m) => located.push((span, m)),
            None => {
                warn!(span_id = %span.id, quote = %span.quote, "span no longer locates; skipping");
                report.skipped.push((span.id.clone(), SkipReason::NotLocated));
            }
        }
    }
    located.sort_by_key(|(_, m)| (m.start, m.end));

    // single left-to-right sweep; text offsets stay valid, node boundaries
    // are re-read through a fresh index per span
    let mut last_end = 0;
    for (span, m) in located {
        if m.start < last_end {
            warn!(span_id = %span.id, "located range overlaps earlier span; skipping");
            report.skipped.push((span.id.clone(), SkipReason::Overlap));
            continue;
        }
        match wrap_range(arena, span, &m) {
            Ok(()) => {
                last_end = m.end;
                report.applied.push(span.id.clone());
            }
            Err(reason) => {
                warn!(span_id = %span.id, reason = %reason, "could not wrap span; skipping");
                report.skipped.push((span.id.clone(), reason));
            }
        }
    }
    report
}

fn wrap_range(arena: &mut SurfaceArena, span: &Span, m: &QuoteMatch) -> Result<(), SkipReason> {
    let index = TextNodeIndex::build(arena);
    let slices = index.resolve(m.start, m.end).ok_or(SkipReason::Unresolvable)?;

    // refuse to nest highlights
    for slice in slices.iter() {
        if inside_highlight(arena, slice.node) {
            return Err(SkipReason::AlreadyWrapped);
        }
    }

    // a span fragmented across nodes gets one wrapper per fragment, all
    // carrying the same span id
    for slice in slices {
        let mut target = slice.node;
        if slice.start > 0 {
            target = arena.split_text(target, slice.start).ok_or(SkipReason::Unresolvable)?;
        }
        let slice_len = slice.end - slice.start;
        let target_len = arena
            .text(target)
            .map(|t| t.chars().count())
            .ok_or(SkipReason::Unresolvable)?;
        if slice_len < target_len {
            // keep only the covered prefix; the tail returns to the parent
            arena.split_text(target, slice_len).ok_or(SkipReason::Unresolvable)?;
        }
        arena
            .wrap_node(target, highlight_element(span))
            .ok_or(SkipReason::Unresolvable)?;
    }
    Ok(())
}

fn inside_highlight(arena: &SurfaceArena, id: NodeId) -> bool {
    arena
        .ancestors(id)
        .iter()
        .any(|ancestor| arena.attr(*ancestor, ATTR_SPAN_ID).is_some())
}

/// Build the wrapper element for a span, with the full data-attribute
/// contract. `data-start`/`data-end` carry the offsets recorded at label
/// time so the suggestion-fetch collaborator sees what the labeler saw.
fn highlight_element(span: &Span) -> Element {
    let mut element = Element::new(HIGHLIGHT_TAG);
    element.attrs.insert(ATTR_SPAN_ID.to_string(), span.id.clone());
    element
        .attrs
        .insert(ATTR_ROLE.to_string(), span.role.as_str().to_string());
    element
        .attrs
        .insert(ATTR_SOURCE.to_string(), span.source.as_str().to_string());
    element
        .attrs
        .insert(ATTR_START.to_string(), span.start.to_string());
    element.attrs.insert(ATTR_END.to_string(), span.end.to_string());
    element
        .attrs
        .insert(ATTR_QUOTE.to_string(), span.quote.clone());
    element
        .attrs
        .insert(ATTR_LEFT_CTX.to_string(), span.left_ctx.clone());
    element
        .attrs
        .insert(ATTR_RIGHT_CTX.to_string(), span.right_ctx.clone());
    element.attrs.insert(
        ATTR_IDEMPOTENCY_KEY.to_string(),
        span.idempotency_key.clone(),
    );
    element.attrs.insert(
        ATTR_VALIDATOR_PASS.to_string(),
        span.validator_pass.to_string(),
    );
    element
        .attrs
        .insert(ATTR_CONFIDENCE.to_string(), span.confidence.to_string());
    element
}

/// Rebuild a span from a highlight element's data attributes.
///
/// The inverse of [`apply_highlights`]'s attribute stamping; click handlers
/// use this to hand the suggestion fetcher a span-shaped object without
/// re-scanning the document.
pub fn span_from_element(arena: &SurfaceArena, id: NodeId) -> Option<Span> {
    let attr = |name: &str| arena.attr(id, name);
    Some(Span {
        id: attr(ATTR_SPAN_ID)?.to_string(),
        quote: attr(ATTR_QUOTE)?.to_string(),
        start: attr(ATTR_START)?.parse().ok()?,
        end: attr(ATTR_END)?.parse().ok()?,
        role: PromptRole::parse(attr(ATTR_ROLE)?)?,
        source: SpanSource::parse(attr(ATTR_SOURCE)?)?,
        confidence: attr(ATTR_CONFIDENCE)?.parse().ok()?,
        left_ctx: attr(ATTR_LEFT_CTX).unwrap_or("").to_string(),
        right_ctx: attr(ATTR_RIGHT_CTX).unwrap_or("").to_string(),
        idempotency_key: attr(ATTR_IDEMPOTENCY_KEY).unwrap_or("").to_string(),
        validator_pass: attr(ATTR_VALIDATOR_PASS)
            .map(|v| v == "true")
            .unwrap_or(false),
    })
}

/// Serialize the surface to a markup string, keeping only the listed
/// attributes. Text is emitted verbatim (test aid, not an HTML encoder).
pub fn to_markup_with(arena: &SurfaceArena, keep_attrs: &[&str]) -> String {
    let mut out = String::new();
    markup_node(arena, arena.root(), Some(keep_attrs), &mut out);
    out
}

/// Serialize the surface to a markup string with all attributes.
pub fn to_markup(arena: &SurfaceArena) -> String {
    let mut out = String::new();
    markup_node(arena, arena.root(), None, &mut out);
    out
}

fn markup_node(
    arena: &SurfaceArena,
    id: NodeId,
    keep_attrs: Option<&[&str]>,
    out: &mut String,
) {
    if let Some(text) = arena.text(id) {
        out.push_str(text);
        return;
    }
    let tag = arena.tag(id).unwrap_or("?");
    out.push('<');
    out.push_str(tag);
    if let Some(attrs) = arena.attrs(id) {
        for (name, value) in attrs.iter() {
            if keep_attrs.map(|keep| keep.contains(&name.as_str())).unwrap_or(true) {
                out.push_str(&format!(" {}=\"{}\"", name, value));
            }
        }
    }
    out.push('>');
    for child in arena.children(id).to_vec() {
        markup_node(arena, child, keep_attrs, out);
    }
    out.push_str(&format!("</{}>", tag));
}
