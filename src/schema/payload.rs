//! Platform payload rendering of node trees.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::diagnostics::CommandError;
use crate::schema::{CommandTree, NodeId, NodeKind};

/// One node of the registration payload; parameters carry `option_type` and `constraints`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SchemaPayload>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub constraints: BTreeMap<String, serde_json::Value>,
}

impl SchemaPayload {
    pub fn from_tree(tree: &CommandTree) -> Self {
        Self::from_node(tree, tree.root())
    }

    fn from_node(tree: &CommandTree, id: NodeId) -> Self {
        let Some(node) = tree.node(id) else {
            return Self {
                kind: NodeKind::Root.as_str().to_string(),
                name: String::new(),
                description: String::new(),
                option_type: None,
                options: Vec::new(),
                constraints: BTreeMap::new(),
            };
        };

        let mut constraints = node.properties.clone();
        let option_type = match node.kind {
            NodeKind::Parameter => constraints
                .remove("type")
                .and_then(|t| t.as_str().map(str::to_string)),
            _ => None,
        };

        Self {
            kind: node.kind.as_str().to_string(),
            name: node.name.clone(),
            description: node.description.clone(),
            option_type,
            options: tree
                .children(id)
                .map(|(child, _)| Self::from_node(tree, child))
                .collect(),
            constraints,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, CommandError> {
        serde_json::to_string_pretty(self).map_err(|e| CommandError::Internal {
            message: format!("cannot serialize payload for '{}': {e}", self.name),
            ctx: Default::default(),
            source: Some(Box::new(e)),
        })
    }
}
