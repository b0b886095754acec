//! Scroll-to-span and the transient attention pulse.
//!
//! Pure value outputs: the host applies the [`ScrollCommand`] to its
//! viewport, and the session's timer clears the pulse after
//! [`PULSE_DURATION`]. The surface itself holds no timers, so nothing here
//! can fire against a stale tree.

use crate::highlight::ATTR_SPAN_ID;
use crate::node::{NodeId, SurfaceArena};
use std::time::Duration;

/// Attribute marking a pulsing highlight.
pub const ATTR_PULSE: &str = "data-pulse";

/// How long the pulse stays on a highlight before the session clears it.
pub const PULSE_DURATION: Duration = Duration::from_millis(1200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Auto,
    Smooth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAlignment {
    Start,
    Center,
    End,
}

/// A request to bring a node into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollCommand {
    pub node: NodeId,
    pub behavior: ScrollBehavior,
    pub alignment: ScrollAlignment,
}

/// Locate the rendered wrapper for `span_id` and request a smooth scroll to
/// the viewport center. `None` when the span is not currently rendered.
pub fn scroll_to_span(arena: &SurfaceArena, span_id: &str) -> Option<ScrollCommand> {
    let node = arena.find_by_attr(ATTR_SPAN_ID, span_id)?;
    Some(ScrollCommand {
        node,
        behavior: ScrollBehavior::Smooth,
        alignment: ScrollAlignment::Center,
    })
}

/// A pulse in flight: which node to clear, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseHandle {
    pub node: NodeId,
    pub expires_after: Duration,
}

/// Apply the transient pulse to a rendered span.
///
/// The caller schedules [`clear_pulse`] after `expires_after`; no persistent
/// state change is left behind once cleared.
pub fn pulse_span(arena: &mut SurfaceArena, span_id: &str) -> Option<PulseHandle> {
    let node = arena.find_by_attr(ATTR_SPAN_ID, span_id)?;
    arena.set_attr(node, ATTR_PULSE, "true");
    Some(PulseHandle {
        node,
        expires_after: PULSE_DURATION,
    })
}

/// Remove a previously applied pulse.
pub fn clear_pulse(arena: &mut SurfaceArena, handle: &PulseHandle) {
    arena.remove_attr(handle.node, ATTR_PULSE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::apply_highlights;
    use prompt_anchor::{PromptRole, Span, SpanSource};

    fn rendered_arena() -> SurfaceArena {
        let text = "a red fox at dawn";
        let mut arena = SurfaceArena::from_text("div", text);
        let span =
            Span::over("s1", text, 2, 9, PromptRole::Subject, SpanSource::Model, 0.9).unwrap();
        let report = apply_highlights(&mut arena, &[span]);
        assert!(report.all_applied());
        arena
    }

    #[test]
    fn scroll_targets_the_wrapper() {
        let arena = rendered_arena();
        let command = scroll_to_span(&arena, "s1").unwrap();
        assert_eq!(command.behavior, ScrollBehavior::Smooth);
        assert_eq!(command.alignment, ScrollAlignment::Center);
        assert_eq!(arena.attr(command.node, ATTR_SPAN_ID), Some("s1"));
    }

    #[test]
    fn unknown_span_yields_no_command() {
        let arena = rendered_arena();
        assert!(scroll_to_span(&arena, "missing").is_none());
    }

    #[test]
    fn pulse_sets_then_clears_cleanly() {
        let mut arena = rendered_arena();
        let handle = pulse_span(&mut arena, "s1").unwrap();
        assert_eq!(handle.expires_after, PULSE_DURATION);
        assert_eq!(arena.attr(handle.node, ATTR_PULSE), Some("true"));

        clear_pulse(&mut arena, &handle);
        assert_eq!(arena.attr(handle.node, ATTR_PULSE), None);
    }
}
