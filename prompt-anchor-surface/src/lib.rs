//! Editable-surface abstractions for prompt-anchor.
//!
//! The editor's highlight layer works against a DOM-like tree of text nodes.
//! This crate models that surface as an arena of node records (no live
//! pointers), builds the linear-offset index over it, and wraps located span
//! ranges in highlight elements without disturbing un-highlighted text.
//!
//! ## Core Types
//!
//! - [`SurfaceArena`] - the editable surface: text and element nodes
//! - [`TextNodeIndex`] - linear char offsets to node+offset pairs
//! - [`apply_highlights`] / [`RenderReport`] - the render pass
//! - [`span_from_element`] - data-attribute round-trip for click handlers

mod highlight;
mod index;
mod node;
mod scroll;

pub use highlight::{
    apply_highlights,
    span_from_element,
    to_markup,
    to_markup_with,
    RenderReport,
    SkipReason,
    ATTR_CONFIDENCE,
    ATTR_END,
    ATTR_IDEMPOTENCY_KEY,
    ATTR_LEFT_CTX,
    ATTR_QUOTE,
    ATTR_RIGHT_CTX,
    ATTR_ROLE,
    ATTR_SOURCE,
    ATTR_SPAN_ID,
    ATTR_START,
    ATTR_VALIDATOR_PASS,
    HIGHLIGHT_TAG,
};

pub use index::{IndexEntry, NodeSlice, TextNodeIndex};

pub use node::{Element, NodeId, NodeKind, SurfaceArena};

pub use scroll::{
    clear_pulse,
    pulse_span,
    scroll_to_span,
    PulseHandle,
    ScrollAlignment,
    ScrollBehavior,
    ScrollCommand,
    ATTR_PULSE,
    PULSE_DURATION,
};
