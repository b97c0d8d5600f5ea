//! # Command Node Trees
//!
//! The structured front end needs every command pre-registered as a hierarchical schema:
//! Root → optional SubcommandGroup → Subcommand → Parameter. Trees are stored as an arena
//! indexed by [`NodeId`]; `parent` links exist for lookups only and never own anything.
//!
//! ## Structural equality
//!
//! Two trees are equal when their roots agree on kind, name, description and property set,
//! and their children agree pairwise in order. Property order never matters and the
//! `registered` flag does not participate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::diagnostics::Violation;

pub mod compiler;
pub mod diff;
pub mod limits;
pub mod payload;

pub use compiler::{CompiledCommands, RootFailure, RoutingTable, SchemaCompiler};
pub use diff::{diff, SchemaDifference};
pub use payload::SchemaPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    Root,
    SubcommandGroup,
    Subcommand,
    Parameter,
}

impl NodeKind {
    /// Payload type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Root => "ROOT",
            NodeKind::SubcommandGroup => "GROUP",
            NodeKind::Subcommand => "SUBCOMMAND",
            NodeKind::Parameter => "PARAMETER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandNode {
    pub kind: NodeKind,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub children: Vec<NodeId>,
    #[serde(default)]
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub registered: bool,
}

impl CommandNode {
    fn new(kind: NodeKind, name: String, description: String, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            name,
            description,
            properties: BTreeMap::new(),
            children: Vec::new(),
            parent,
            registered: false,
        }
    }

    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }
}

/// Node arena. Deserialization checks that the root and every link point inside the arena,
/// so indexing by the stored root cannot go out of bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TreeRepr")]
pub struct CommandTree {
    nodes: Vec<CommandNode>,
    root: NodeId,
}

#[derive(Deserialize)]
struct TreeRepr {
    nodes: Vec<CommandNode>,
    root: NodeId,
}

impl TryFrom<TreeRepr> for CommandTree {
    type Error = String;

    fn try_from(repr: TreeRepr) -> Result<Self, Self::Error> {
        let TreeRepr { nodes, root } = repr;
        match nodes.get(root.0) {
            None => return Err(format!("root {} is outside a tree of {} nodes", root.0, nodes.len())),
            Some(node) if node.kind != NodeKind::Root => {
                return Err(format!("node {} is a {:?}, not a root", root.0, node.kind))
            }
            Some(_) => {}
        }
        for (index, node) in nodes.iter().enumerate() {
            let dangling = node
                .children
                .iter()
                .chain(node.parent.iter())
                .find(|id| id.0 >= nodes.len());
            if let Some(id) = dangling {
                return Err(format!("node {index} links to missing node {}", id.0));
            }
        }
        Ok(Self { nodes, root })
    }
}

impl CommandTree {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            nodes: vec![CommandNode::new(
                NodeKind::Root,
                name.into(),
                description.into(),
                None,
            )],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> &CommandNode {
        &self.nodes[self.root.0]
    }

    pub fn name(&self) -> &str {
        &self.root_node().name
    }

    pub fn node(&self, id: NodeId) -> Option<&CommandNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &CommandNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &CommandNode)> {
        self.node(id)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|&child| self.node(child).map(|n| (child, n)))
    }

    /// Appends a child, rejecting a sibling with the same (case-insensitive) name.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<NodeId, Violation> {
        let name = name.into();
        if self
            .children(parent)
            .any(|(_, sibling)| sibling.name.eq_ignore_ascii_case(&name))
        {
            return Err(Violation::DuplicateSibling { name });
        }
        let id = NodeId(self.nodes.len());
        let Some(parent_node) = self.nodes.get_mut(parent.0) else {
            return Err(Violation::InvalidDeclaration {
                message: format!("parent node {} does not exist", parent.0),
            });
        };
        parent_node.children.push(id);
        self.nodes
            .push(CommandNode::new(kind, name, description.into(), Some(parent)));
        Ok(id)
    }

    pub fn set_property(&mut self, id: NodeId, key: impl Into<String>, value: serde_json::Value) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.properties.insert(key.into(), value);
        }
    }

    /// Names from the root down to `id`, inclusive.
    pub fn path_of(&self, id: NodeId) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = self.node(id);
        while let Some(node) = current {
            path.push(node.name.as_str());
            current = node.parent.and_then(|p| self.node(p));
        }
        path.reverse();
        path
    }

    /// Follows child names from the root.
    pub fn find(&self, path: &[&str]) -> Option<NodeId> {
        let mut current = self.root;
        for segment in path {
            current = self
                .children(current)
                .find(|(_, n)| n.name.eq_ignore_ascii_case(segment))
                .map(|(id, _)| id)?;
        }
        Some(current)
    }

    pub fn is_registered(&self) -> bool {
        self.root_node().registered
    }

    pub fn mark_registered(&mut self) {
        if let Some(root) = self.nodes.get_mut(self.root.0) {
            root.registered = true;
        }
    }

    pub fn structurally_eq(&self, other: &CommandTree) -> bool {
        nodes_eq(self, self.root, other, other.root)
    }
}

fn nodes_eq(a: &CommandTree, a_id: NodeId, b: &CommandTree, b_id: NodeId) -> bool {
    match (a.node(a_id), b.node(b_id)) {
        (Some(x), Some(y)) => {
            x.kind == y.kind
                && x.name == y.name
                && x.description == y.description
                && x.properties == y.properties
                && x.children.len() == y.children.len()
                && x
                    .children
                    .iter()
                    .zip(&y.children)
                    .all(|(&ca, &cb)| nodes_eq(a, ca, b, cb))
        }
        (None, None) => true,
        _ => false,
    }
}

impl PartialEq for CommandTree {
    fn eq(&self, other: &Self) -> bool {
        self.structurally_eq(other)
    }
}
