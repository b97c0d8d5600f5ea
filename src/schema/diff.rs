//! First-difference reporting between two node trees.

use std::collections::BTreeSet;
use std::fmt;

use crate::schema::{CommandTree, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDifference {
    /// Space-separated node path, starting at the root.
    pub path: String,
    pub what: String,
}

impl fmt::Display for SchemaDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.what)
    }
}

/// `None` when the trees are structurally identical.
pub fn diff(old: &CommandTree, new: &CommandTree) -> Option<SchemaDifference> {
    diff_nodes(old, old.root(), new, new.root())
}

fn diff_nodes(
    old: &CommandTree,
    old_id: NodeId,
    new: &CommandTree,
    new_id: NodeId,
) -> Option<SchemaDifference> {
    let (a, b) = (old.node(old_id)?, new.node(new_id)?);
    let at = |what: String| {
        Some(SchemaDifference {
            path: old.path_of(old_id).join(" "),
            what,
        })
    };

    if a.kind != b.kind {
        return at(format!("kind {:?} -> {:?}", a.kind, b.kind));
    }
    if a.name != b.name {
        return at(format!("name '{}' -> '{}'", a.name, b.name));
    }
    if a.description != b.description {
        return at(format!(
            "description '{}' -> '{}'",
            a.description, b.description
        ));
    }

    let keys: BTreeSet<&String> = a.properties.keys().chain(b.properties.keys()).collect();
    for key in keys {
        let (before, after) = (a.properties.get(key), b.properties.get(key));
        if before != after {
            let show = |v: Option<&serde_json::Value>| {
                v.map_or_else(|| "<unset>".to_string(), |v| v.to_string())
            };
            return at(format!("{key} {} -> {}", show(before), show(after)));
        }
    }

    for (&child_a, &child_b) in a.children.iter().zip(&b.children) {
        if let Some(difference) = diff_nodes(old, child_a, new, child_b) {
            return Some(difference);
        }
    }
    if a.children.len() != b.children.len() {
        return at(format!(
            "{} children -> {}",
            a.children.len(),
            b.children.len()
        ));
    }
    None
}
