//! Linear-offset index over the surface's text nodes.
//!
//! Ephemeral by design: built in document order before a batch of wrap
//! operations, discarded after any structural mutation. Translates a linear
//! `[start, end)` char range into one or more node slices - a span crosses
//! node boundaries once earlier wraps have fragmented the tree.

use crate::node::{NodeId, SurfaceArena};

/// One text node's place in the linear offset space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub node: NodeId,
    /// Char offset of the node's first char in the whole surface
    pub start: usize,
    /// Char length of the node
    pub len: usize,
}

/// A `[start, end)` char range within a single text node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeSlice {
    pub node: NodeId,
    pub start: usize,
    pub end: usize,
}

impl NodeSlice {
    /// Whether the slice covers its node entirely.
    pub fn covers(&self, entry: &IndexEntry) -> bool {
        self.start == 0 && self.end == entry.len
    }
}

/// Ordered map from linear char offsets to text nodes.
#[derive(Debug, Clone)]
pub struct TextNodeIndex {
    entries: Vec<IndexEntry>,
    total_len: usize,
}

impl TextNodeIndex {
    /// Walk the surface in document order, accumulating lengths.
    pub fn build(arena: &SurfaceArena) -> Self {
        let mut entries = Vec::new();
        let mut offset = 0;
        for node in arena.text_nodes() {
            let len = arena.text(node).map(|t| t.chars().count()).unwrap_or(0);
            entries.push(IndexEntry {
                node,
                start: offset,
                len,
            });
            offset += len;
        }
        Self {
            entries,
            total_len: offset,
        }
    }

    pub fn total_len(&self) -> usize {
        self.total_len
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry containing linear char offset `offset`.
    ///
    /// Zero-length nodes never contain an offset.
    pub fn node_at(&self, offset: usize) -> Option<&IndexEntry> {
        if offset >= self.total_len {
            return None;
        }
        // binary search for the last entry starting at or before `offset`;
        // zero-length entries sort before the non-empty one at the same start
        let idx = self
            .entries
            .partition_point(|entry| entry.start <= offset)
            .checked_sub(1)?;
        let entry = &self.entries[idx];
        if entry.len > 0 && offset < entry.start + entry.len {
            Some(entry)
        } else {
            None
        }
    }

    /// Translate linear `[start, end)` into per-node slices, in document
    /// order. `None` when the range is empty or out of bounds.
    pub fn resolve(&self, start: usize, end: usize) -> Option<Vec<NodeSlice>> {
        if start >= end || end > self.total_len {
            return None;
        }
        let mut slices = Vec::new();
        for entry in self.entries.iter() {
            if entry.len == 0 {
                continue;
            }
            let node_start = entry.start;
            let node_end = entry.start + entry.len;
            if node_end <= start {
                continue;
            }
            if node_start >= end {
                break;
            }
            slices.push(NodeSlice {
                node: entry.node,
                start: start.saturating_sub(node_start).min(entry.len),
                end: (end - node_start).min(entry.len),
            });
        }
        if slices.is_empty() {
            None
        } else {
            Some(slices)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Element;

    #[test]
    fn build_accumulates_offsets() {
        let mut arena = SurfaceArena::from_text("div", "one two three");
        let node = arena.text_nodes()[0];
        arena.split_text(node, 4).unwrap();
        let index = TextNodeIndex::build(&arena);
        assert_eq!(index.total_len(), 13);
        assert_eq!(index.entries().len(), 2);
        assert_eq!(index.entries()[0].start, 0);
        assert_eq!(index.entries()[0].len, 4);
        assert_eq!(index.entries()[1].start, 4);
        assert_eq!(index.entries()[1].len, 9);
    }

    #[test]
    fn node_at_finds_covering_node() {
        let mut arena = SurfaceArena::from_text("div", "abcdef");
        let node = arena.text_nodes()[0];
        arena.split_text(node, 3).unwrap();
        let index = TextNodeIndex::build(&arena);
        assert_eq!(index.node_at(0).unwrap().start, 0);
        assert_eq!(index.node_at(2).unwrap().start, 0);
        assert_eq!(index.node_at(3).unwrap().start, 3);
        assert!(index.node_at(6).is_none());
    }

    #[test]
    fn resolve_within_one_node() {
        let arena = SurfaceArena::from_text("div", "hello world");
        let index = TextNodeIndex::build(&arena);
        let slices = index.resolve(6, 11).unwrap();
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].start, 6);
        assert_eq!(slices[0].end, 11);
    }

    #[test]
    fn resolve_across_fragmented_nodes() {
        let mut arena = SurfaceArena::from_text("div", "one two three");
        let node = arena.text_nodes()[0];
        let rest = arena.split_text(node, 4).unwrap();
        arena.split_text(rest, 4).unwrap(); // "one " | "two " | "three"
        let index = TextNodeIndex::build(&arena);

        // "e two th" crosses all three nodes
        let slices = index.resolve(2, 10).unwrap();
        assert_eq!(slices.len(), 3);
        assert_eq!((slices[0].start, slices[0].end), (2, 4));
        assert_eq!((slices[1].start, slices[1].end), (0, 4));
        assert_eq!((slices[2].start, slices[2].end), (0, 2));
    }

    #[test]
    fn resolve_rejects_bad_ranges() {
        let arena = SurfaceArena::from_text("div", "short");
        let index = TextNodeIndex::build(&arena);
        assert!(index.resolve(3, 3).is_none());
        assert!(index.resolve(4, 2).is_none());
        assert!(index.resolve(0, 6).is_none());
    }

    #[test]
    fn index_counts_chars_not_bytes() {
        let arena = SurfaceArena::from_text("div", "año");
        let index = TextNodeIndex::build(&arena);
        assert_eq!(index.total_len(), 3);
        let slices = index.resolve(1, 2).unwrap();
        assert_eq!((slices[0].start, slices[0].end), (1, 2));
    }

    #[test]
    fn wrapped_nodes_still_index_in_document_order() {
        let mut arena = SurfaceArena::from_text("div", "one two three");
        let node = arena.text_nodes()[0];
        let middle = arena.split_text(node, 4).unwrap();
        arena.split_text(middle, 3).unwrap();
        arena.wrap_node(middle, Element::new("mark"));
        let index = TextNodeIndex::build(&arena);
        assert_eq!(index.total_len(), 13);
        assert_eq!(index.entries()[1].start, 4);
        assert_eq!(index.entries()[1].len, 3);
    }
}
