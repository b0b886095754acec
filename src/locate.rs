//! Tiered quote relocation.
//!
//! Given a normalized haystack and a quote that was cut from some earlier
//! revision of it, find the best-matching char range. The search runs in
//! tiers, first success wins:
//!
//! 1. exact slice equality at the hinted offset (the unedited-document case)
//! 2. global literal search; when several occurrences exist the captured
//!    left/right context picks the best one, then hint distance, then first
//!    in document order
//! 3. whitespace-fold search over collapsed whitespace (recovers
//!    reflow/retyping drift inside the quote)
//! 4. context-anchored recovery: find surviving fragments of the captured
//!    context and take the drifted region between them (the quote itself no
//!    longer appears literally)
//! 5. `None` - callers must never invent an offset
//!
//! All offsets are char indices. Candidate matches whose boundaries would
//! split a grapheme cluster (combining marks, emoji sequences) are rejected
//! so a highlight can never cut a visual character in half.

use crate::offsets;
use unicode_segmentation::GraphemeCursor;

/// How a match was found; doubles as a degradation indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Literal equality at the hinted offset
    HintExact,
    /// Literal search over the whole haystack
    GlobalExact,
    /// Recovered via whitespace-collapsed comparison
    WhitespaceFold,
    /// Recovered from surviving context fragments around a drifted quote
    ContextAssisted,
}

/// A located quote: char range plus match quality.
///
/// `exact == false` signals the range was recovered by fuzzy search; the
/// slice at `[start, end)` may differ from the quote.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuoteMatch {
    pub start: usize,
    pub end: usize,
    pub exact: bool,
    pub strategy: MatchStrategy,
}

/// Optional search inputs.
#[derive(Debug, Clone, Default)]
pub struct LocateOptions<'a> {
    /// A previously known char offset to try first and to disambiguate
    /// multiple occurrences.
    pub prefer_index: Option<usize>,
    /// Text snippet that preceded the quote at capture time.
    pub left_ctx: Option<&'a str>,
    /// Text snippet that followed the quote at capture time.
    pub right_ctx: Option<&'a str>,
}

impl<'a> LocateOptions<'a> {
    fn left(&self) -> &'a str {
        self.left_ctx.unwrap_or("")
    }

    fn right(&self) -> &'a str {
        self.right_ctx.unwrap_or("")
    }
}

/// Locate `quote` inside `haystack`.
///
/// Deterministic: identical arguments always return identical results. When
/// multiple exact occurrences exist and neither context nor hint
/// disambiguates, the first occurrence in document order wins.
pub fn locate(haystack: &str, quote: &str, opts: &LocateOptions<'_>) -> Option<QuoteMatch> {
    if haystack.is_empty() || quote.is_empty() {
        return None;
    }

    if let Some(hint) = opts.prefer_index {
        if let Some(m) = match_at_hint(haystack, quote, hint) {
            return Some(m);
        }
    }

    if let Some(m) = global_exact(haystack, quote, opts) {
        return Some(m);
    }

    if let Some(m) = whitespace_fold(haystack, quote) {
        return Some(m);
    }

    context_anchored(haystack, quote, opts)
}

fn match_at_hint(haystack: &str, quote: &str, hint: usize) -> Option<QuoteMatch> {
    let quote_chars = offsets::char_len(quote);
    let slice = offsets::char_slice(haystack, hint, hint + quote_chars)?;
    if slice != quote {
        return None;
    }
    finish_match(haystack, hint, hint + quote_chars, true, MatchStrategy::HintExact)
}

fn global_exact(haystack: &str, quote: &str, opts: &LocateOptions<'_>) -> Option<QuoteMatch> {
    let quote_chars = offsets::char_len(quote);
    let mut best: Option<QuoteMatch> = None;
    let mut best_rank = (0usize, usize::MAX); // (context agreement, hint distance); first in doc order breaks ties

    for (byte_idx, _) in haystack.match_indices(quote) {
        let start = offsets::char_index(haystack, byte_idx);
        let end = start + quote_chars;
        let candidate = match finish_match(haystack, start, end, true, MatchStrategy::GlobalExact) {
            Some(candidate) => candidate,
            None => continue, // splits a grapheme cluster
        };

        let agreement = context_agreement(haystack, start, end, opts.left(), opts.right());
        let distance = match opts.prefer_index {
            Some(hint) => {
                if start >= hint {
                    start - hint
                } else {
                    hint - start
                }
            }
            None => 0,
        };

        let better = match best {
            None => true,
            Some(_) => agreement > best_rank.0 || (agreement == best_rank.0 && distance < best_rank.1),
        };
        if better {
            best_rank = (agreement, distance);
            best = Some(candidate);
        }
    }
    best
}

/// Chars of captured context that literally surround the occurrence:
/// longest matching suffix of `left` before `start` plus longest matching
/// prefix of `right` after `end`.
fn context_agreement(haystack: &str, start: usize, end: usize, left: &str, right: &str) -> usize {
    let mut agreement = 0;

    if !left.is_empty() {
        let left_chars = offsets::char_len(left);
        let take = left_chars.min(start);
        if let (Some(before), Some(tail)) = (
            offsets::char_slice(haystack, start - take, start),
            offsets::char_slice(left, left_chars - take, left_chars),
        ) {
            agreement += common_suffix_chars(before, tail);
        }
    }

    if !right.is_empty() {
        let total = offsets::char_len(haystack);
        let right_chars = offsets::char_len(right);
        let take = right_chars.min(total.saturating_sub(end));
        if let (Some(after), Some(head)) = (
            offsets::char_slice(haystack, end, end + take),
            offsets::char_slice(right, 0, take),
        ) {
            agreement += common_prefix_chars(after, head);
        }
    }

    agreement
}

fn common_prefix_chars(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

fn common_suffix_chars(a: &str, b: &str) -> usize {
    a.chars()
        .rev()
        .zip(b.chars().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

fn whitespace_fold(haystack: &str, quote: &str) -> Option<QuoteMatch> {
    let (folded_hay, fold_map) = fold_with_map(haystack);
    let (folded_quote, _) = fold_with_map(quote);
    if folded_quote.is_empty() {
        return None;
    }
    // No whitespace drift anywhere; the exact tiers already failed.
    if folded_hay == haystack && folded_quote == quote {
        return None;
    }

    let byte_idx = folded_hay.find(&folded_quote)?;
    let folded_start = offsets::char_index(&folded_hay, byte_idx);
    let folded_end = folded_start + offsets::char_len(&folded_quote);

    let start = fold_map[folded_start];
    let end = fold_map
        .get(folded_end)
        .copied()
        .unwrap_or_else(|| offsets::char_len(haystack));

    finish_match(haystack, start, end, false, MatchStrategy::WhitespaceFold)
}

/// Collapse whitespace runs to single spaces, keeping a map from folded char
/// index back to the original char index.
fn fold_with_map(text: &str) -> (String, Vec<usize>) {
    let mut folded = String::with_capacity(text.len());
    let mut map = Vec::new();
    let mut in_whitespace = false;
    for (idx, c) in text.chars().enumerate() {
        if c.is_whitespace() {
            if !in_whitespace {
                folded.push(' ');
                map.push(idx);
                in_whitespace = true;
            }
        } else {
            folded.push(c);
            map.push(idx);
            in_whitespace = false;
        }
    }
    (folded, map)
}

/// Context fragment divisors to try: full snippet, then its nearer half,
/// then its nearer quarter. Shorter fragments tolerate edits further away
/// from the span.
const CONTEXT_STEPS: [usize; 3] = [1, 2, 4];

/// Minimum chars of context worth anchoring on.
const MIN_CONTEXT_CHARS: usize = 3;

fn context_anchored(haystack: &str, quote: &str, opts: &LocateOptions<'_>) -> Option<QuoteMatch> {
    let lefts = suffix_fragments(opts.left());
    let rights = prefix_fragments(opts.right());
    if lefts.is_empty() && rights.is_empty() {
        return None;
    }

    let quote_chars = offsets::char_len(quote);
    let total = offsets::char_len(haystack);
    // The drifted region may be shorter or longer than the quote, within reason.
    let min_gap = 1.max(quote_chars.saturating_sub(quote_chars / 2));
    let max_gap = quote_chars + quote_chars / 2 + 8;

    // Two-sided: the region between a surviving left fragment and a
    // surviving right fragment, sized plausibly like the quote.
    let mut best: Option<(usize, QuoteMatch)> = None; // (size error, match)
    for left in lefts.iter() {
        for right in rights.iter() {
            for left_end in occurrence_ends(haystack, left) {
                for right_start in occurrence_starts(haystack, right) {
                    if right_start < left_end {
                        continue;
                    }
                    let gap = right_start - left_end;
                    if gap < min_gap || gap > max_gap {
                        continue;
                    }
                    let error = if gap >= quote_chars {
                        gap - quote_chars
                    } else {
                        quote_chars - gap
                    };
                    let keep = match &best {
                        None => true,
                        Some((best_error, m)) => {
                            error < *best_error || (error == *best_error && left_end < m.start)
                        }
                    };
                    if keep {
                        if let Some(m) = finish_match(
                            haystack,
                            left_end,
                            right_start,
                            false,
                            MatchStrategy::ContextAssisted,
                        ) {
                            best = Some((error, m));
                        }
                    }
                }
            }
        }
    }
    if let Some((_, m)) = best {
        return Some(m);
    }

    // One-sided: only one context survived; take a quote-sized region
    // adjacent to it.
    for left in lefts.iter() {
        if let Some(left_end) = occurrence_ends(haystack, left).into_iter().next() {
            let end = (left_end + quote_chars).min(total);
            if end > left_end {
                if let Some(m) =
                    finish_match(haystack, left_end, end, false, MatchStrategy::ContextAssisted)
                {
                    return Some(m);
                }
            }
        }
    }
    for right in rights.iter() {
        if let Some(right_start) = occurrence_starts(haystack, right).into_iter().next() {
            let start = right_start.saturating_sub(quote_chars);
            if right_start > start {
                if let Some(m) =
                    finish_match(haystack, start, right_start, false, MatchStrategy::ContextAssisted)
                {
                    return Some(m);
                }
            }
        }
    }
    None
}

/// Char offsets just past each occurrence of `needle`.
fn occurrence_ends(haystack: &str, needle: &str) -> Vec<usize> {
    let needle_chars = offsets::char_len(needle);
    haystack
        .match_indices(needle)
        .map(|(byte_idx, _)| offsets::char_index(haystack, byte_idx) + needle_chars)
        .collect()
}

/// Char offsets of each occurrence of `needle`.
fn occurrence_starts(haystack: &str, needle: &str) -> Vec<usize> {
    haystack
        .match_indices(needle)
        .map(|(byte_idx, _)| offsets::char_index(haystack, byte_idx))
        .collect()
}

/// Trailing fragments of the left context: full snippet, then its last
/// half, then its last quarter.
fn suffix_fragments(ctx: &str) -> Vec<&str> {
    let total = offsets::char_len(ctx);
    let mut out = Vec::new();
    for step in CONTEXT_STEPS.iter() {
        let take = total / step;
        if take < MIN_CONTEXT_CHARS {
            break;
        }
        if let Some(fragment) = offsets::char_slice(ctx, total - take, total) {
            if out.last() != Some(&fragment) {
                out.push(fragment);
            }
        }
    }
    out
}

/// Leading fragments of the right context, mirroring [`suffix_fragments`].
fn prefix_fragments(ctx: &str) -> Vec<&str> {
    let total = offsets::char_len(ctx);
    let mut out = Vec::new();
    for step in CONTEXT_STEPS.iter() {
        let take = total / step;
        if take < MIN_CONTEXT_CHARS {
            break;
        }
        if let Some(fragment) = offsets::char_slice(ctx, 0, take) {
            if out.last() != Some(&fragment) {
                out.push(fragment);
            }
        }
    }
    out
}

fn finish_match(
    haystack: &str,
    start: usize,
    end: usize,
    exact: bool,
    strategy: MatchStrategy,
) -> Option<QuoteMatch> {
    let start_byte = offsets::byte_index(haystack, start)?;
    let end_byte = offsets::byte_index(haystack, end)?;
    if !is_grapheme_boundary(haystack, start_byte) || !is_grapheme_boundary(haystack, end_byte) {
        return None;
    }
    Some(QuoteMatch {
        start,
        end,
        exact,
        strategy,
    })
}

fn is_grapheme_boundary(text: &str, byte_idx: usize) -> bool {
    let mut cursor = GraphemeCursor::new(byte_idx, text.len(), true);
    cursor.is_boundary(text, 0).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize;

    #[test]
    fn exact_match_at_hint() {
        let text = "hello world hello";
        let m = locate(
            text,
            "hello",
            &LocateOptions {
                prefer_index: Some(12),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!((m.start, m.end), (12, 17));
        assert!(m.exact);
        assert_eq!(m.strategy, MatchStrategy::HintExact);
    }

    #[test]
    fn first_occurrence_wins_without_hint_or_context() {
        let m = locate("ab ab ab", "ab", &LocateOptions::default()).unwrap();
        assert_eq!((m.start, m.end), (0, 2));
        assert_eq!(m.strategy, MatchStrategy::GlobalExact);
    }

    #[test]
    fn nearest_occurrence_wins_with_stale_hint() {
        // hint points between the two occurrences, closer to the second
        let text = "ab ....... ab";
        let m = locate(
            text,
            "ab",
            &LocateOptions {
                prefer_index: Some(9),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!((m.start, m.end), (11, 13));
    }

    #[test]
    fn context_picks_among_repeated_occurrences() {
        let text = "red car beside a red house";
        let m = locate(
            text,
            "red",
            &LocateOptions {
                left_ctx: Some("beside a "),
                right_ctx: Some(" house"),
                ..Default::default()
            },
        )
        .unwrap();
        // without context the first "red" would win; context pins the second
        assert_eq!((m.start, m.end), (17, 20));
        assert!(m.exact);
        assert_eq!(m.strategy, MatchStrategy::GlobalExact);
    }

    #[test]
    fn locates_accented_quote() {
        // decomposed input normalizes to the composed form the quote uses
        let text = normalize("Un nin\u{0303}o corriendo en la playa");
        let m = locate(&text, "niño", &LocateOptions::default()).unwrap();
        assert_eq!((m.start, m.end), (3, 7));
        assert!(m.exact);
        assert_eq!(offsets::char_slice(&text, m.start, m.end), Some("niño"));
    }

    #[test]
    fn soundness_exact_slice_equals_quote() {
        let text = "the quick brown fox jumps";
        let m = locate(text, "brown fox", &LocateOptions::default()).unwrap();
        assert!(m.exact);
        assert_eq!(offsets::char_slice(text, m.start, m.end), Some("brown fox"));
    }

    #[test]
    fn whitespace_fold_recovers_reflowed_text() {
        let text = "a  red\tfox\njumps";
        let m = locate(text, "red fox jumps", &LocateOptions::default()).unwrap();
        assert_eq!(m.strategy, MatchStrategy::WhitespaceFold);
        assert!(!m.exact);
        assert_eq!(offsets::char_slice(text, m.start, m.end), Some("red\tfox\njumps"));
    }

    #[test]
    fn context_recovers_drifted_quote() {
        // captured: "a photo in " + "soft morning light" + " over hills";
        // the quote itself was since rewritten
        let edited = "a photo in softened dawn light over hills";
        let m = locate(
            edited,
            "soft morning light",
            &LocateOptions {
                prefer_index: Some(11),
                left_ctx: Some("a photo in "),
                right_ctx: Some(" over hills"),
            },
        )
        .unwrap();
        assert_eq!(m.strategy, MatchStrategy::ContextAssisted);
        assert!(!m.exact);
        assert_eq!(
            offsets::char_slice(edited, m.start, m.end),
            Some("softened dawn light")
        );
    }

    #[test]
    fn one_sided_context_recovers_with_left_anchor_only() {
        let edited = "style: watercolour wash, muted";
        let m = locate(
            edited,
            "oil paint",
            &LocateOptions {
                left_ctx: Some("style: "),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(m.strategy, MatchStrategy::ContextAssisted);
        assert_eq!((m.start, m.end), (7, 16));
    }

    #[test]
    fn never_splits_emoji_sequence() {
        // "👩‍🚀" is woman + ZWJ + rocket; a quote ending mid-sequence must not match
        let text = "crew: 👩‍🚀 ready";
        assert!(locate(text, "crew: 👩", &LocateOptions::default()).is_none());
        // the whole cluster is fine
        let m = locate(text, "👩‍🚀", &LocateOptions::default()).unwrap();
        assert_eq!(offsets::char_slice(text, m.start, m.end), Some("👩‍🚀"));
    }

    #[test]
    fn miss_returns_none() {
        assert!(locate("hello world", "goodbye", &LocateOptions::default()).is_none());
        assert!(locate("", "x", &LocateOptions::default()).is_none());
        assert!(locate("x", "", &LocateOptions::default()).is_none());
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let text = "one two one two one";
        let opts = LocateOptions {
            prefer_index: Some(8),
            ..Default::default()
        };
        let a = locate(text, "one", &opts);
        let b = locate(text, "one", &opts);
        assert_eq!(a, b);
    }

    #[test]
    fn hint_past_end_falls_back_to_global() {
        let m = locate(
            "abc def",
            "def",
            &LocateOptions {
                prefer_index: Some(50),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!((m.start, m.end), (4, 7));
        assert_eq!(m.strategy, MatchStrategy::GlobalExact);
    }
}
