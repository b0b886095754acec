//! Span anchoring and re-anchoring for prompt-authoring editors.
//!
//! A prompt editor receives labeled spans (substrings with semantic roles and
//! confidence scores) from an external labeling service. By the time a span is
//! acted on, the surrounding text may have been re-normalized, edited, or
//! streamed past it, so recorded offsets are hints rather than guarantees.
//! This crate is the text core that copes with that drift:
//!
//! - [`normalize`] - canonical text form (NFC + newline handling) so offsets
//!   mean the same thing on every pass
//! - [`locate`] - tiered quote relocation: exact-at-hint, global exact,
//!   context-assisted, whitespace-tolerant, then give up with `None`
//! - [`PositionCache`] - memoized locator results with hit/miss telemetry
//! - [`apply_edit`] - the single place a suggestion click becomes a text
//!   mutation
//!
//! ## Example
//!
//! ```
//! use prompt_anchor::{locate, normalize, LocateOptions};
//!
//! let text = normalize("Un nin\u{0303}o corriendo en la playa");
//! let m = locate(&text, "niño", &LocateOptions::default()).unwrap();
//! assert!(m.exact);
//! ```

mod cache;
mod edit;
mod locate;
mod normalize;
pub mod offsets;
mod span;

pub use cache::{
    cache_key,
    content_hash,
    locate_cached,
    CacheKeyParams,
    CacheSnapshot,
    CachedLookup,
    PositionCache,
};

pub use edit::{
    apply_edit,
    EditOutcome,
    SpanEdit,
    SpanEditKind,
};

pub use locate::{
    locate,
    LocateOptions,
    MatchStrategy,
    QuoteMatch,
};

pub use normalize::{normalize, normalize_opt};

pub use span::{
    capture_context,
    derive_idempotency_key,
    ConfidenceTier,
    PromptRole,
    RevealThresholds,
    Span,
    SpanSource,
    CONTEXT_CHARS,
};
