/// The result of a parse: the node tree plus the link reference definitions it used
use crate::ast;
use crate::definitions::{LinkReferenceDefinition, LinkReferenceDefinitions};
use crate::node::{NodeId, Tree};

#[derive(Debug, Clone)]
pub struct Document {
    tree: Tree,
    root: NodeId,
    definitions: LinkReferenceDefinitions,
}

impl Document {
    pub(crate) fn new(tree: Tree, root: NodeId, definitions: LinkReferenceDefinitions) -> Self {
        Document {
            tree,
            root,
            definitions,
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Mutable access for post-processing; the root stays the same.
    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    /// The `Document` node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn definitions(&self) -> &LinkReferenceDefinitions {
        &self.definitions
    }

    /// The definition for `label`, matched the same way references are.
    pub fn definition(&self, label: &str) -> Option<&LinkReferenceDefinition> {
        self.definitions.get(label)
    }

    pub fn to_ast(&self) -> ast::Node {
        ast::Node::from_tree(&self.tree, self.root)
    }
}
