//! Progressive reveal scheduling.
//!
//! Spans appear in confidence tiers: high immediately, medium after a short
//! delay, low after a longer one, so the most trustworthy highlights paint
//! first. The schedule itself is a pure function ([`plan_reveal`]); the tokio
//! driver ([`ProgressiveReveal`]) stamps every timer with a generation so a
//! changed input cancels all pending tiers - no stale reveals.

use prompt_anchor::{ConfidenceTier, RevealThresholds, Span};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Per-tier reveal delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealDelays {
    pub high: Duration,
    pub medium: Duration,
    pub low: Duration,
}

impl Default for RevealDelays {
    fn default() -> Self {
        Self {
            high: Duration::from_millis(0),
            medium: Duration::from_millis(50),
            low: Duration::from_millis(100),
        }
    }
}

/// One tier's worth of reveals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealBatch {
    pub tier: ConfidenceTier,
    pub delay: Duration,
    pub span_ids: Vec<String>,
}

/// A tier firing: these spans just became visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealEvent {
    pub tier: ConfidenceTier,
    pub span_ids: Vec<String>,
}

/// Partition spans into tier batches, high first. Empty tiers are omitted.
pub fn plan_reveal(
    spans: &[Span],
    thresholds: &RevealThresholds,
    delays: &RevealDelays,
) -> Vec<RevealBatch> {
    let tiers = [
        (ConfidenceTier::High, delays.high),
        (ConfidenceTier::Medium, delays.medium),
        (ConfidenceTier::Low, delays.low),
    ];
    let mut batches = Vec::new();
    for (tier, delay) in tiers.iter() {
        let span_ids: Vec<String> = spans
            .iter()
            .filter(|span| span.tier(thresholds) == *tier)
            .map(|span| span.id.clone())
            .collect();
        if !span_ids.is_empty() {
            batches.push(RevealBatch {
                tier: *tier,
                delay: *delay,
                span_ids,
            });
        }
    }
    batches
}

#[derive(Debug)]
struct RevealState {
    generation: u64,
    visible: HashSet<String>,
    total: usize,
}

/// Drives tier timers and tracks incremental visibility.
#[derive(Debug, Clone)]
pub struct ProgressiveReveal {
    thresholds: RevealThresholds,
    delays: RevealDelays,
    state: Arc<Mutex<RevealState>>,
}

impl ProgressiveReveal {
    pub fn new(thresholds: RevealThresholds, delays: RevealDelays) -> Self {
        Self {
            thresholds,
            delays,
            state: Arc::new(Mutex::new(RevealState {
                generation: 0,
                visible: HashSet::new(),
                total: 0,
            })),
        }
    }

    /// Start a fresh schedule for `spans`, cancelling any pending tiers from
    /// a previous start. Reveal events arrive on the returned channel.
    pub fn start(&self, spans: &[Span]) -> mpsc::UnboundedReceiver<RevealEvent> {
        let generation = {
            let mut state = self.state.lock().unwrap();
            state.generation += 1;
            state.visible.clear();
            state.total = spans.len();
            state.generation
        };

        let (tx, rx) = mpsc::unbounded_channel();
        for batch in plan_reveal(spans, &self.thresholds, &self.delays) {
            let state = Arc::clone(&self.state);
            let tx = tx.clone();
            tokio::spawn(async move {
                if batch.delay > Duration::from_millis(0) {
                    tokio::time::sleep(batch.delay).await;
                }
                let event = {
                    let mut state = state.lock().unwrap();
                    if state.generation != generation {
                        debug!(tier = ?batch.tier, "reveal tier woke stale; dropping");
                        return;
                    }
                    for id in batch.span_ids.iter() {
                        state.visible.insert(id.clone());
                    }
                    RevealEvent {
                        tier: batch.tier,
                        span_ids: batch.span_ids,
                    }
                };
                // receiver may be gone; that's fine, visibility is tracked
                let _ = tx.send(event);
            });
        }
        rx
    }

    /// Cancel all pending tiers. The next [`start`](Self::start) begins a
    /// fresh schedule.
    pub fn cancel(&self) {
        let mut state = self.state.lock().unwrap();
        state.generation += 1;
    }

    /// Fraction of the current span set that is visible, in `[0, 1]`.
    /// An empty set counts as fully revealed.
    pub fn progress(&self) -> f64 {
        let state = self.state.lock().unwrap();
        if state.total == 0 {
            1.0
        } else {
            state.visible.len() as f64 / state.total as f64
        }
    }

    pub fn visible_count(&self) -> usize {
        self.state.lock().unwrap().visible.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompt_anchor::{PromptRole, SpanSource};

    fn span(id: &str, confidence: f64) -> Span {
        let text = "a red fox at dawn in watercolour";
        Span::over(id, text, 2, 9, PromptRole::Subject, SpanSource::Model, confidence).unwrap()
    }

    #[test]
    fn plan_partitions_by_tier_high_first() {
        let spans = vec![span("low", 0.3), span("high", 0.9), span("medium", 0.7)];
        let batches = plan_reveal(&spans, &RevealThresholds::default(), &RevealDelays::default());
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].tier, ConfidenceTier::High);
        assert_eq!(batches[0].span_ids, vec!["high".to_string()]);
        assert_eq!(batches[1].tier, ConfidenceTier::Medium);
        assert_eq!(batches[2].tier, ConfidenceTier::Low);
        assert_eq!(batches[2].delay, Duration::from_millis(100));
    }

    #[test]
    fn plan_omits_empty_tiers() {
        let spans = vec![span("a", 0.95), span("b", 0.85)];
        let batches = plan_reveal(&spans, &RevealThresholds::default(), &RevealDelays::default());
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].span_ids.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reveals_tiers_in_order_and_reports_progress() {
        let reveal = ProgressiveReveal::new(RevealThresholds::default(), RevealDelays::default());
        let spans = vec![span("s0", 0.9), span("s1", 0.7), span("s2", 0.3)];
        let mut rx = reveal.start(&spans);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.tier, ConfidenceTier::High);
        assert_eq!(first.span_ids, vec!["s0".to_string()]);

        let second = rx.recv().await.unwrap();
        assert_eq!(second.tier, ConfidenceTier::Medium);
        assert!((reveal.progress() - 2.0 / 3.0).abs() < 1e-9);

        let third = rx.recv().await.unwrap();
        assert_eq!(third.tier, ConfidenceTier::Low);
        assert_eq!(reveal.progress(), 1.0);
        assert_eq!(reveal.visible_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn changed_input_cancels_pending_tiers() {
        let reveal = ProgressiveReveal::new(RevealThresholds::default(), RevealDelays::default());
        let first_set = vec![span("old-high", 0.9), span("old-low", 0.2)];
        let mut first_rx = reveal.start(&first_set);

        // the high tier fires immediately
        let first = first_rx.recv().await.unwrap();
        assert_eq!(first.span_ids, vec!["old-high".to_string()]);

        // input changes before the low tier's delay elapses
        let second_set = vec![span("new-high", 0.9)];
        let mut second_rx = reveal.start(&second_set);

        let fresh = second_rx.recv().await.unwrap();
        assert_eq!(fresh.span_ids, vec!["new-high".to_string()]);
        assert_eq!(reveal.progress(), 1.0);

        // the stale low tier never arrives on the old channel
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(first_rx.try_recv().is_err());
        assert_eq!(reveal.visible_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_everything() {
        let reveal = ProgressiveReveal::new(RevealThresholds::default(), RevealDelays::default());
        let spans = vec![span("slow", 0.3)];
        let mut rx = reveal.start(&spans);
        reveal.cancel();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(reveal.visible_count(), 0);
    }

    #[test]
    fn empty_set_is_fully_revealed() {
        let reveal = ProgressiveReveal::new(RevealThresholds::default(), RevealDelays::default());
        assert_eq!(reveal.progress(), 1.0);
    }
}
