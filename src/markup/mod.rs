//! Index-based markup tree.
//!
//! Templates, components and rendered content are parsed into a [`Markup`]
//! arena. Nodes live in one `Vec` and refer to each other by [`NodeId`], so
//! splicing a subtree (content into a template, a component into its
//! placeholder) only relinks a handful of indices.
//!
//! # Layout
//!
//! ```text
//! Markup { nodes: [Fragment, Element(html), Element(body), Text, ...] }
//!                   ^ root
//!
//! each Node: parent / prev / next / first_child / last_child (Option<NodeId>)
//! ```
//!
//! Nodes can be *sealed*. The composer seals already-final content so its
//! walk never descends into it. The flag is never serialized.
//!
//! Text, attribute values and raw bodies are kept exactly as they appeared in
//! the source (still escaped), so a parse → serialize cycle does not change
//! entity spelling.

mod parse;
mod serialize;

pub use parse::MarkupError;

/// Handle to a node inside one [`Markup`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    /// Raw (escaped) attribute value.
    pub value: String,
    /// Authored quote character. `None` for a valueless attribute (`<script defer>`).
    pub quote: Option<char>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Tag name with its authored casing.
    pub name: String,
    pub attrs: Vec<Attribute>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push(Attribute {
            key: key.into(),
            value: value.into(),
            quote: Some('"'),
        });
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|attr| attr.key.eq_ignore_ascii_case(key))
            .map(|attr| attr.value.as_str())
    }

    #[inline]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// Container without markup of its own (document root, spliced lists).
    Fragment,
    /// Everything between `<!` and `>`, keyword casing included.
    Doctype(String),
    Element(Element),
    /// Raw (escaped) character data.
    Text(String),
    Comment(String),
    /// Emitted verbatim: `<script>`/`<style>` bodies, CDATA sections.
    Raw(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    sealed: bool,
}

impl Node {
    const fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            prev: None,
            next: None,
            first_child: None,
            last_child: None,
            sealed: false,
        }
    }
}

/// A parsed markup document.
#[derive(Debug, Clone)]
pub struct Markup {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Markup {
    fn default() -> Self {
        Self::new()
    }
}

impl Markup {
    /// Empty document with a single fragment root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Fragment)],
            root: NodeId(0),
        }
    }

    #[inline]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0].data
    }

    #[cfg(test)]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Element name, if `id` is an element.
    #[cfg(test)]
    pub fn element_name(&self, id: NodeId) -> Option<&str> {
        match self.get(id) {
            NodeData::Element(element) => Some(&element.name),
            _ => None,
        }
    }

    /// Snapshot of the direct children of `id`, safe to hold across mutation.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.nodes[id.0].first_child;
        while let Some(child) = cursor {
            out.push(child);
            cursor = self.nodes[child.0].next;
        }
        out
    }

    /// All nodes below `id` in document order (pre-order, `id` excluded).
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).into_iter().rev());
        }
        out
    }

    /// First text node (document order) whose raw text contains `needle`.
    pub fn find_text(&self, needle: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&id| matches!(self.get(id), NodeData::Text(text) if text.contains(needle)))
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Allocate a detached node.
    pub fn create(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(data));
        id
    }

    /// Create an element and append it under `parent`.
    pub fn append_element(&mut self, parent: NodeId, element: Element) -> NodeId {
        let id = self.create(NodeData::Element(element));
        self.append(parent, id);
        id
    }

    /// Create a text node holding already-escaped text and append it under `parent`.
    pub fn append_text(&mut self, parent: NodeId, raw: impl Into<String>) -> NodeId {
        let id = self.create(NodeData::Text(raw.into()));
        self.append(parent, id);
        id
    }

    // ========================================================================
    // Relinking
    // ========================================================================

    /// Append `child` as the last child of `parent`. `child` is detached first.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        let last = self.nodes[parent.0].last_child;
        {
            let node = &mut self.nodes[child.0];
            node.parent = Some(parent);
            node.prev = last;
        }
        match last {
            Some(last) => self.nodes[last.0].next = Some(child),
            None => self.nodes[parent.0].first_child = Some(child),
        }
        self.nodes[parent.0].last_child = Some(child);
    }

    /// Insert `node` as the previous sibling of `anchor`.
    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) {
        self.detach(node);
        let parent = self.nodes[anchor.0].parent;
        let prev = self.nodes[anchor.0].prev;
        {
            let n = &mut self.nodes[node.0];
            n.parent = parent;
            n.prev = prev;
            n.next = Some(anchor);
        }
        self.nodes[anchor.0].prev = Some(node);
        match prev {
            Some(prev) => self.nodes[prev.0].next = Some(node),
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].first_child = Some(node);
                }
            }
        }
    }

    /// Insert `node` as the next sibling of `anchor`.
    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) {
        match self.nodes[anchor.0].next {
            Some(next) => self.insert_before(next, node),
            None => match self.nodes[anchor.0].parent {
                Some(parent) => self.append(parent, node),
                None => {
                    // Anchor is itself detached: link as a loose sibling.
                    self.detach(node);
                    self.nodes[anchor.0].next = Some(node);
                    self.nodes[node.0].prev = Some(anchor);
                }
            },
        }
    }

    /// Unlink `id` from its parent and siblings. The subtree below `id` is kept.
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let node = &self.nodes[id.0];
            (node.parent, node.prev, node.next)
        };

        match prev {
            Some(prev) => self.nodes[prev.0].next = next,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].first_child = next;
                }
            }
        }
        match next {
            Some(next) => self.nodes[next.0].prev = prev,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].last_child = prev;
                }
            }
        }

        let node = &mut self.nodes[id.0];
        node.parent = None;
        node.prev = None;
        node.next = None;
    }

    /// Copy every node of `other` into this arena.
    ///
    /// Returns the copy of `other`'s root, detached. Seal flags are preserved.
    pub fn adopt(&mut self, other: &Markup) -> NodeId {
        let offset = self.nodes.len();
        let shift = |id: Option<NodeId>| id.map(|NodeId(i)| NodeId(i + offset));
        self.nodes.extend(other.nodes.iter().map(|node| Node {
            data: node.data.clone(),
            parent: shift(node.parent),
            prev: shift(node.prev),
            next: shift(node.next),
            first_child: shift(node.first_child),
            last_child: shift(node.last_child),
            sealed: node.sealed,
        }));
        NodeId(other.root.0 + offset)
    }

    /// Put the children of `fragment` where `target` is, then drop `target`.
    ///
    /// Returns the moved nodes in order. `target` and its subtree become unreachable.
    pub fn replace_with_children(&mut self, target: NodeId, fragment: NodeId) -> Vec<NodeId> {
        let moved = self.children(fragment);
        for &node in &moved {
            self.insert_before(target, node);
        }
        self.detach(target);
        moved
    }

    /// Place the children of `fragment` right after `anchor`.
    ///
    /// Returns the moved nodes in order.
    pub fn splice_after(&mut self, anchor: NodeId, fragment: NodeId) -> Vec<NodeId> {
        let moved = self.children(fragment);
        let mut cursor = anchor;
        for &node in &moved {
            self.insert_after(cursor, node);
            cursor = node;
        }
        moved
    }

    // ========================================================================
    // Seal Flags
    // ========================================================================

    #[inline]
    pub fn seal(&mut self, id: NodeId) {
        self.nodes[id.0].sealed = true;
    }

    #[inline]
    pub fn is_sealed(&self, id: NodeId) -> bool {
        self.nodes[id.0].sealed
    }
}
