//! The editable surface as an arena of node records.
//!
//! Mirrors the tree-walking and node-splitting primitives a DOM editable
//! surface exposes, but over index-based records instead of live pointers:
//! mutations during a render pass can never invalidate a reference someone
//! is still holding, only an index that gets rebuilt anyway.

use std::collections::BTreeMap;

/// Index of a node within its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// Element payload: tag name plus addressable attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: BTreeMap::new(),
        }
    }
}

/// A node is either a run of text or an element with children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Text(String),
    Element(Element),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An editable surface: a tree of text and element nodes.
///
/// Node ids are stable for the lifetime of the arena; detached nodes keep
/// their slot (the arena is session-scoped and bounded by document size).
#[derive(Debug, Clone)]
pub struct SurfaceArena {
    nodes: Vec<Node>,
    root: NodeId,
}

impl SurfaceArena {
    /// Create a surface with an empty root element.
    pub fn new(root_tag: impl Into<String>) -> Self {
        let root = Node {
            kind: NodeKind::Element(Element::new(root_tag)),
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    /// Create a surface whose root holds a single text node.
    pub fn from_text(root_tag: impl Into<String>, text: impl Into<String>) -> Self {
        let mut arena = Self::new(root_tag);
        arena.append_text(arena.root(), text);
        arena
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Text content of a text node; `None` for elements.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element(_) => None,
        }
    }

    /// Tag of an element node; `None` for text nodes.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(&element.tag),
            NodeKind::Text(_) => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(element) => element.attrs.get(name).map(|v| v.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    /// All attributes of an element, sorted by name.
    pub fn attrs(&self, id: NodeId) -> Option<&BTreeMap<String, String>> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(&element.attrs),
            NodeKind::Text(_) => None,
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: impl Into<String>, value: impl Into<String>) {
        if let NodeKind::Element(element) = &mut self.nodes[id.0].kind {
            element.attrs.insert(name.into(), value.into());
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let NodeKind::Element(element) = &mut self.nodes[id.0].kind {
            element.attrs.remove(name);
        }
    }

    /// Append a new text node under `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> NodeId {
        let id = self.push(Node {
            kind: NodeKind::Text(text.into()),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Append a new element node under `parent`.
    pub fn append_element(&mut self, parent: NodeId, element: Element) -> NodeId {
        let id = self.push(Node {
            kind: NodeKind::Element(element),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Split a text node at `char_offset`, keeping `[0, char_offset)` in the
    /// original and moving the rest into a new sibling inserted right after.
    ///
    /// Returns the new right-hand node, or `None` when the node is not text
    /// or the offset is not strictly inside it (no split needed).
    pub fn split_text(&mut self, id: NodeId, char_offset: usize) -> Option<NodeId> {
        let (left, right) = {
            let text = match &self.nodes[id.0].kind {
                NodeKind::Text(text) => text,
                NodeKind::Element(_) => return None,
            };
            let total = text.chars().count();
            if char_offset == 0 || char_offset >= total {
                return None;
            }
            let byte = text
                .char_indices()
                .nth(char_offset)
                .map(|(byte_idx, _)| byte_idx)?;
            (text[..byte].to_string(), text[byte..].to_string())
        };

        let parent = self.nodes[id.0].parent?;
        self.nodes[id.0].kind = NodeKind::Text(left);
        let right_id = self.push(Node {
            kind: NodeKind::Text(right),
            parent: Some(parent),
            children: Vec::new(),
        });
        let position = self.nodes[parent.0]
            .children
            .iter()
            .position(|child| *child == id)?;
        self.nodes[parent.0].children.insert(position + 1, right_id);
        Some(right_id)
    }

    /// Wrap a single child node in a new element that takes its place.
    pub fn wrap_node(&mut self, id: NodeId, element: Element) -> Option<NodeId> {
        let parent = self.nodes[id.0].parent?;
        let position = self.nodes[parent.0]
            .children
            .iter()
            .position(|child| *child == id)?;

        let wrapper = self.push(Node {
            kind: NodeKind::Element(element),
            parent: Some(parent),
            children: vec![id],
        });
        self.nodes[parent.0].children[position] = wrapper;
        self.nodes[id.0].parent = Some(wrapper);
        Some(wrapper)
    }

    /// All text nodes in document order.
    pub fn text_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_text(self.root, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut Vec<NodeId>) {
        match &self.nodes[id.0].kind {
            NodeKind::Text(_) => out.push(id),
            NodeKind::Element(_) => {
                for child in self.nodes[id.0].children.iter() {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Concatenated text content in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for id in self.text_nodes() {
            if let Some(text) = self.text(id) {
                out.push_str(text);
            }
        }
        out
    }

    /// First element (document order) whose attribute `name` equals `value`.
    pub fn find_by_attr(&self, name: &str, value: &str) -> Option<NodeId> {
        self.find_by_attr_from(self.root, name, value)
    }

    fn find_by_attr_from(&self, id: NodeId, name: &str, value: &str) -> Option<NodeId> {
        if self.attr(id, name) == Some(value) {
            return Some(id);
        }
        for child in self.nodes[id.0].children.iter() {
            if let Some(found) = self.find_by_attr_from(*child, name, value) {
                return Some(found);
            }
        }
        None
    }

    /// Walk ancestors of `id` (excluding itself), nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.nodes[id.0].parent;
        while let Some(parent) = current {
            out.push(parent);
            current = self.nodes[parent.0].parent;
        }
        out
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }
}
