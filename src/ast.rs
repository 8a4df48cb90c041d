/// Owned, serializable snapshot of a parsed document
use crate::node::{ListKind, NodeId, NodeValue, Tree};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Document(Vec<Node>),
    // Block-level nodes
    Paragraph(Vec<Node>),
    Heading {
        level: u8,
        children: Vec<Node>,
    },
    FencedCodeBlock {
        info: String,
        literal: String,
    },
    IndentedCodeBlock(String),
    HtmlBlock(String),
    ThematicBreak,
    BlockQuote(Vec<Node>),
    BulletList {
        marker: char,
        tight: bool,
        children: Vec<Node>, // Contains ListItem nodes
    },
    OrderedList {
        start: u32,
        delimiter: char,
        tight: bool,
        children: Vec<Node>,
    },
    ListItem(Vec<Node>),
    CustomBlock {
        name: String,
        children: Vec<Node>,
    },
    // Inline nodes
    Text(String),
    Code(String),
    HtmlInline(String),
    Emphasis(Vec<Node>),
    Strong(Vec<Node>),
    Link {
        destination: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        children: Vec<Node>,
    },
    Image {
        destination: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        children: Vec<Node>, // Alt text
    },
    HardBreak,
    SoftBreak,
    CustomInline {
        name: String,
        children: Vec<Node>,
    },
}

impl Node {
    /// Snapshot the subtree rooted at `id`. Nodes are built bottom-up from
    /// the reversed pre-order, so nesting depth never reaches the call stack.
    pub fn from_tree(tree: &Tree, id: NodeId) -> Node {
        let order: Vec<NodeId> = tree.descendants(id).collect();
        let mut built: HashMap<NodeId, Node> = HashMap::with_capacity(order.len());
        for &node in order.iter().rev() {
            let children = tree
                .children(node)
                .filter_map(|child| built.remove(&child))
                .collect();
            built.insert(node, Node::with_children(tree.value(node), children));
        }
        built
            .remove(&id)
            .unwrap_or_else(|| Node::with_children(tree.value(id), Vec::new()))
    }

    /// `children` is dropped for values that cannot have any.
    fn with_children(value: &NodeValue, children: Vec<Node>) -> Node {
        match value {
            NodeValue::Document => Node::Document(children),
            NodeValue::BlockQuote => Node::BlockQuote(children),
            NodeValue::Heading { level } => Node::Heading {
                level: *level,
                children,
            },
            NodeValue::FencedCodeBlock { info, literal, .. } => Node::FencedCodeBlock {
                info: info.clone(),
                literal: literal.clone(),
            },
            NodeValue::IndentedCodeBlock { literal } => Node::IndentedCodeBlock(literal.clone()),
            NodeValue::HtmlBlock { literal } => Node::HtmlBlock(literal.clone()),
            NodeValue::ThematicBreak => Node::ThematicBreak,
            NodeValue::List {
                kind: ListKind::Bullet { marker },
                tight,
            } => Node::BulletList {
                marker: *marker,
                tight: *tight,
                children,
            },
            NodeValue::List {
                kind: ListKind::Ordered { start, delimiter },
                tight,
            } => Node::OrderedList {
                start: *start,
                delimiter: *delimiter,
                tight: *tight,
                children,
            },
            NodeValue::ListItem { .. } => Node::ListItem(children),
            NodeValue::Paragraph => Node::Paragraph(children),
            NodeValue::CustomBlock { name } => Node::CustomBlock {
                name: name.clone(),
                children,
            },
            NodeValue::Text { literal } => Node::Text(literal.clone()),
            NodeValue::Code { literal } => Node::Code(literal.clone()),
            NodeValue::HtmlInline { literal } => Node::HtmlInline(literal.clone()),
            NodeValue::Emphasis { .. } => Node::Emphasis(children),
            NodeValue::StrongEmphasis { .. } => Node::Strong(children),
            NodeValue::Link { destination, title } => Node::Link {
                destination: destination.clone(),
                title: title.clone(),
                children,
            },
            NodeValue::Image { destination, title } => Node::Image {
                destination: destination.clone(),
                title: title.clone(),
                children,
            },
            NodeValue::HardLineBreak => Node::HardBreak,
            NodeValue::SoftLineBreak => Node::SoftBreak,
            NodeValue::CustomInline { name } => Node::CustomInline {
                name: name.clone(),
                children,
            },
        }
    }

    fn take_children(&mut self) -> Vec<Node> {
        match self {
            Node::Document(children)
            | Node::Paragraph(children)
            | Node::BlockQuote(children)
            | Node::ListItem(children)
            | Node::Emphasis(children)
            | Node::Strong(children)
            | Node::Heading { children, .. }
            | Node::BulletList { children, .. }
            | Node::OrderedList { children, .. }
            | Node::CustomBlock { children, .. }
            | Node::Link { children, .. }
            | Node::Image { children, .. }
            | Node::CustomInline { children, .. } => std::mem::take(children),
            Node::FencedCodeBlock { .. }
            | Node::IndentedCodeBlock(_)
            | Node::HtmlBlock(_)
            | Node::ThematicBreak
            | Node::Text(_)
            | Node::Code(_)
            | Node::HtmlInline(_)
            | Node::HardBreak
            | Node::SoftBreak => Vec::new(),
        }
    }
}

// Deep snapshots are torn down one level at a time instead of recursively.
impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = self.take_children();
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.take_children());
        }
    }
}
