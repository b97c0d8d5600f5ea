//! Structural limits imposed by the platform on registered schemas.

use crate::diagnostics::Violation;
use crate::schema::{CommandTree, NodeKind};

pub struct SchemaLimits {
    pub max_name_length: usize,
    pub max_description_length: usize,
    pub max_children: usize,
    pub max_choices: usize,
    /// Root alias plus at most two subcommand segments.
    pub max_path_segments: usize,
}

pub const SCHEMA_LIMITS: SchemaLimits = SchemaLimits {
    max_name_length: 32,
    max_description_length: 100,
    max_children: 25,
    max_choices: 25,
    max_path_segments: 3,
};

pub fn validate_name(name: &str) -> Result<(), Violation> {
    let length = name.chars().count();
    if length == 0 || length > SCHEMA_LIMITS.max_name_length {
        return Err(Violation::NameLength {
            name: name.to_string(),
            length,
        });
    }
    Ok(())
}

pub fn validate_description(name: &str, description: &str) -> Result<(), Violation> {
    let length = description.chars().count();
    if length == 0 || length > SCHEMA_LIMITS.max_description_length {
        return Err(Violation::DescriptionLength {
            name: name.to_string(),
            length,
        });
    }
    Ok(())
}

pub fn validate_choices(parameter: &str, count: usize) -> Result<(), Violation> {
    if count > SCHEMA_LIMITS.max_choices {
        return Err(Violation::TooManyChoices {
            parameter: parameter.to_string(),
            count,
            max: SCHEMA_LIMITS.max_choices,
        });
    }
    Ok(())
}

/// Checks every node of a finished tree: name and description lengths, child counts, and
/// that no subcommand group is left empty.
pub fn validate_tree(tree: &CommandTree) -> Result<(), Violation> {
    for (id, node) in tree.nodes() {
        validate_name(&node.name)?;
        validate_description(&node.name, &node.description)?;
        if node.children.len() > SCHEMA_LIMITS.max_children {
            return Err(Violation::TooManyChildren {
                name: tree.path_of(id).join(" "),
                count: node.children.len(),
                max: SCHEMA_LIMITS.max_children,
            });
        }
        if node.kind == NodeKind::SubcommandGroup && node.children.is_empty() {
            return Err(Violation::EmptyGroup {
                group: tree.path_of(id).join(" "),
            });
        }
    }
    Ok(())
}
