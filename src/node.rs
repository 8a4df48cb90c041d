/// Arena-backed document tree shared by the block and inline phases
use crate::source::{SourceSpan, merge_spans};

/// Stable handle to a node inside a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bullet { marker: char },
    Ordered { start: u32, delimiter: char },
}

/// The payload of a node. Block variants come first, inline variants after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValue {
    Document,
    BlockQuote,
    Heading {
        level: u8,
    },
    FencedCodeBlock {
        fence_char: char,
        fence_length: usize,
        fence_indent: usize,
        info: String,
        literal: String,
    },
    IndentedCodeBlock {
        literal: String,
    },
    HtmlBlock {
        literal: String,
    },
    ThematicBreak,
    List {
        kind: ListKind,
        tight: bool,
    },
    ListItem {
        marker_indent: usize,
        content_indent: usize,
    },
    Paragraph,
    CustomBlock {
        name: String,
    },
    // Inline nodes
    Text {
        literal: String,
    },
    Code {
        literal: String,
    },
    HtmlInline {
        literal: String,
    },
    Emphasis {
        delimiter: char,
    },
    StrongEmphasis {
        delimiter: char,
    },
    Link {
        destination: String,
        title: Option<String>,
    },
    Image {
        destination: String,
        title: Option<String>,
    },
    HardLineBreak,
    SoftLineBreak,
    CustomInline {
        name: String,
    },
}

impl NodeValue {
    pub fn text(literal: impl Into<String>) -> Self {
        NodeValue::Text {
            literal: literal.into(),
        }
    }

    pub fn is_paragraph(&self) -> bool {
        matches!(self, NodeValue::Paragraph)
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    value: NodeValue,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    source_spans: Vec<SourceSpan>,
}

/// Owns every node of one document. Nodes are never freed, only unlinked.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<NodeData>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, value: NodeValue) -> NodeId {
        self.nodes.push(NodeData {
            value,
            parent: None,
            first_child: None,
            last_child: None,
            prev: None,
            next: None,
            source_spans: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn value(&self, id: NodeId) -> &NodeValue {
        &self.nodes[id.0].value
    }

    pub fn value_mut(&mut self, id: NodeId) -> &mut NodeValue {
        &mut self.nodes[id.0].value
    }

    /// Literal of a `Text` node, `None` for anything else.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].value {
            NodeValue::Text { literal } => Some(literal),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].first_child
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].last_child
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].next
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].prev
    }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.first_child(id),
        }
    }

    /// `id` and everything below it, in document order.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            root: id,
            next: Some(id),
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.unlink(child);
        self.nodes[child.0].parent = Some(parent);
        match self.nodes[parent.0].last_child {
            Some(last) => {
                self.nodes[last.0].next = Some(child);
                self.nodes[child.0].prev = Some(last);
            }
            None => self.nodes[parent.0].first_child = Some(child),
        }
        self.nodes[parent.0].last_child = Some(child);
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        self.unlink(child);
        self.nodes[child.0].parent = Some(parent);
        match self.nodes[parent.0].first_child {
            Some(first) => {
                self.nodes[first.0].prev = Some(child);
                self.nodes[child.0].next = Some(first);
            }
            None => self.nodes[parent.0].last_child = Some(child),
        }
        self.nodes[parent.0].first_child = Some(child);
    }

    /// Place `sibling` directly after `node`, detaching it from wherever it was.
    pub fn insert_after(&mut self, node: NodeId, sibling: NodeId) {
        self.unlink(sibling);
        let next = self.nodes[node.0].next;
        let parent = self.nodes[node.0].parent;
        self.nodes[sibling.0].next = next;
        self.nodes[sibling.0].prev = Some(node);
        self.nodes[sibling.0].parent = parent;
        self.nodes[node.0].next = Some(sibling);
        match next {
            Some(next) => self.nodes[next.0].prev = Some(sibling),
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].last_child = Some(sibling);
                }
            }
        }
    }

    pub fn insert_before(&mut self, node: NodeId, sibling: NodeId) {
        self.unlink(sibling);
        let prev = self.nodes[node.0].prev;
        let parent = self.nodes[node.0].parent;
        self.nodes[sibling.0].prev = prev;
        self.nodes[sibling.0].next = Some(node);
        self.nodes[sibling.0].parent = parent;
        self.nodes[node.0].prev = Some(sibling);
        match prev {
            Some(prev) => self.nodes[prev.0].next = Some(sibling),
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].first_child = Some(sibling);
                }
            }
        }
    }

    /// Detach `id` from its parent and siblings. Its own children stay attached to it.
    pub fn unlink(&mut self, id: NodeId) {
        let data = &self.nodes[id.0];
        let (parent, prev, next) = (data.parent, data.prev, data.next);
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
        let data = &mut self.nodes[id.0];
        data.parent = None;
        data.prev = None;
        data.next = None;
    }

    /// Move every sibling strictly between `after` and `before` into `wrapper`, keeping order.
    ///
    /// `wrapper` itself is not placed; callers usually follow with `insert_after(after, wrapper)`.
    pub fn wrap_between(&mut self, wrapper: NodeId, after: NodeId, before: NodeId) {
        let mut current = self.next_sibling(after);
        while let Some(node) = current {
            if node == before {
                break;
            }
            current = self.next_sibling(node);
            self.append_child(wrapper, node);
        }
    }

    pub fn source_spans(&self, id: NodeId) -> &[SourceSpan] {
        &self.nodes[id.0].source_spans
    }

    pub fn set_source_spans(&mut self, id: NodeId, spans: Vec<SourceSpan>) {
        self.nodes[id.0].source_spans = spans;
    }

    pub fn add_source_span(&mut self, id: NodeId, span: SourceSpan) {
        self.nodes[id.0].source_spans.push(span);
    }

    /// Append spans, joining ones that continue each other on the same line.
    pub fn merge_source_spans(&mut self, id: NodeId, spans: impl IntoIterator<Item = SourceSpan>) {
        merge_spans(&mut self.nodes[id.0].source_spans, spans);
    }
}

pub struct Children<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.next_sibling(current);
        Some(current)
    }
}

pub struct Descendants<'a> {
    tree: &'a Tree,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = if let Some(child) = self.tree.first_child(current) {
            Some(child)
        } else {
            let mut node = current;
            loop {
                if node == self.root {
                    break None;
                }
                if let Some(next) = self.tree.next_sibling(node) {
                    break Some(next);
                }
                match self.tree.parent(node) {
                    Some(parent) => node = parent,
                    None => break None,
                }
            }
        };
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tree: &Tree, parent: NodeId) -> Vec<String> {
        tree.children(parent)
            .filter_map(|id| tree.text(id).map(str::to_string))
            .collect()
    }

    #[test]
    fn unlink_patches_neighbours() {
        let mut tree = Tree::new();
        let root = tree.create(NodeValue::Paragraph);
        let a = tree.create(NodeValue::text("a"));
        let b = tree.create(NodeValue::text("b"));
        let c = tree.create(NodeValue::text("c"));
        for id in [a, b, c] {
            tree.append_child(root, id);
        }

        tree.unlink(b);
        assert_eq!(texts(&tree, root), ["a", "c"]);
        assert_eq!(tree.previous_sibling(c), Some(a));
        assert_eq!(tree.parent(b), None);

        tree.unlink(c);
        assert_eq!(tree.last_child(root), Some(a));
        tree.unlink(a);
        assert_eq!(tree.first_child(root), None);
        assert_eq!(tree.last_child(root), None);
    }

    #[test]
    fn insert_after_last_updates_parent() {
        let mut tree = Tree::new();
        let root = tree.create(NodeValue::Paragraph);
        let a = tree.create(NodeValue::text("a"));
        let b = tree.create(NodeValue::text("b"));
        tree.append_child(root, a);
        tree.insert_after(a, b);
        assert_eq!(tree.last_child(root), Some(b));
        assert_eq!(tree.parent(b), Some(root));

        let z = tree.create(NodeValue::text("z"));
        tree.insert_before(a, z);
        assert_eq!(texts(&tree, root), ["z", "a", "b"]);
        assert_eq!(tree.first_child(root), Some(z));
    }

    #[test]
    fn wrap_between_moves_inner_siblings() {
        let mut tree = Tree::new();
        let root = tree.create(NodeValue::Paragraph);
        let ids: Vec<_> = ["*", "x", "y", "*"]
            .into_iter()
            .map(|s| {
                let id = tree.create(NodeValue::text(s));
                tree.append_child(root, id);
                id
            })
            .collect();
        let emphasis = tree.create(NodeValue::Emphasis { delimiter: '*' });
        tree.wrap_between(emphasis, ids[0], ids[3]);
        tree.insert_after(ids[0], emphasis);

        assert_eq!(texts(&tree, emphasis), ["x", "y"]);
        let order: Vec<_> = tree.children(root).collect();
        assert_eq!(order, vec![ids[0], emphasis, ids[3]]);
    }

    #[test]
    fn descendants_stay_within_root() {
        let mut tree = Tree::new();
        let doc = tree.create(NodeValue::Document);
        let quote = tree.create(NodeValue::BlockQuote);
        let para = tree.create(NodeValue::Paragraph);
        let after = tree.create(NodeValue::ThematicBreak);
        tree.append_child(doc, quote);
        tree.append_child(quote, para);
        tree.append_child(doc, after);

        assert_eq!(tree.descendants(quote).collect::<Vec<_>>(), vec![quote, para]);
        assert_eq!(
            tree.descendants(doc).collect::<Vec<_>>(),
            vec![doc, quote, para, after]
        );
    }
}
