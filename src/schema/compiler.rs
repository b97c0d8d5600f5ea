//! # Schema Compiler
//!
//! Turns loosely ordered declarations into the two artifacts the front ends consume:
//!
//! - a flat routing table (root alias → candidate commands, in declaration order) for text
//! - one depth-bounded [`CommandTree`] per root alias for the structured front end
//!
//! Commands are grouped by their root alias and then by their second path segment. Three
//! segment paths produce a SubcommandGroup holding Subcommands, two segment paths produce
//! Subcommands, and a bare root command contributes its parameters to the Root itself when
//! nothing else lives under that root.
//!
//! A root that violates a structural rule is skipped for both front ends and reported in
//! [`CompiledCommands::failures`].

use std::sync::Arc;

use im::HashMap;
use serde_json::{json, Value as Json};
use tracing::{error, warn};

use crate::declare::{CommandGroup, ParameterDescriptor, RegisteredCommand, TypeTag};
use crate::diagnostics::{CommandError, Violation};
use crate::model::ChannelKind;
use crate::resolve::{is_issuer_only, ConditionRegistry, ResolverRegistry};
use crate::schema::limits::{self, SCHEMA_LIMITS};
use crate::schema::{CommandTree, NodeId, NodeKind};

// ============================================================================
// OUTPUT TYPES
// ============================================================================

/// Alias → candidate commands, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    routes: HashMap<String, Vec<Arc<RegisteredCommand>>>,
}

impl RoutingTable {
    pub fn get(&self, alias: &str) -> Option<&[Arc<RegisteredCommand>]> {
        self.routes.get(&alias.to_lowercase()).map(Vec::as_slice)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.get(alias).is_some()
    }

    pub fn aliases(&self) -> Vec<&str> {
        let mut aliases: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        aliases.sort_unstable();
        aliases
    }

    /// The first command declared under exactly this full path.
    pub fn find(&self, path: &[&str]) -> Option<&Arc<RegisteredCommand>> {
        let (root, rest) = path.split_first()?;
        self.get(root)?.iter().find(|command| {
            command.subcommand_path().len() == rest.len()
                && command
                    .subcommand_path()
                    .iter()
                    .zip(rest)
                    .all(|(a, b)| a.eq_ignore_ascii_case(b))
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn insert(&mut self, alias: &str, candidates: Vec<Arc<RegisteredCommand>>) -> bool {
        let alias = alias.to_lowercase();
        if self.routes.contains_key(&alias) {
            return false;
        }
        self.routes.insert(alias, candidates);
        true
    }
}

#[derive(Debug)]
pub struct RootFailure {
    pub root: String,
    pub error: CommandError,
}

#[derive(Debug, Default)]
pub struct CompiledCommands {
    pub routing: RoutingTable,
    pub trees: Vec<CommandTree>,
    pub failures: Vec<RootFailure>,
}

impl CompiledCommands {
    pub fn tree(&self, root: &str) -> Option<&CommandTree> {
        self.trees.iter().find(|t| t.name().eq_ignore_ascii_case(root))
    }
}

// ============================================================================
// COMPILER
// ============================================================================

pub struct SchemaCompiler<'a> {
    resolvers: &'a ResolverRegistry,
    conditions: &'a ConditionRegistry,
}

impl<'a> SchemaCompiler<'a> {
    pub fn new(resolvers: &'a ResolverRegistry, conditions: &'a ConditionRegistry) -> Self {
        Self {
            resolvers,
            conditions,
        }
    }

    /// Compiles every root alias in declaration order. Failing roots are logged and skipped.
    pub fn compile_all(
        &self,
        commands: &[Arc<RegisteredCommand>],
        groups: &[CommandGroup],
    ) -> CompiledCommands {
        let mut roots: Vec<&str> = Vec::new();
        for command in commands {
            if !roots.contains(&command.root()) {
                roots.push(command.root());
            }
        }

        let mut compiled = CompiledCommands::default();
        for root in roots {
            match self.compile(root, commands, groups) {
                Ok(tree) => {
                    let candidates: Vec<Arc<RegisteredCommand>> = commands
                        .iter()
                        .filter(|c| c.root() == root)
                        .cloned()
                        .collect();
                    compiled.routing.insert(root, candidates.clone());
                    for alias in root_aliases(root, groups) {
                        if !compiled.routing.insert(alias, candidates.clone()) {
                            warn!(root, alias, "alias already routes elsewhere, ignoring");
                        }
                    }
                    compiled.trees.push(tree);
                }
                Err(err) => {
                    error!(root, error = %err, "command root failed to compile, skipping");
                    compiled.failures.push(RootFailure {
                        root: root.to_string(),
                        error: err,
                    });
                }
            }
        }
        compiled
    }

    /// Builds the node tree for one root alias.
    pub fn compile(
        &self,
        root: &str,
        commands: &[Arc<RegisteredCommand>],
        groups: &[CommandGroup],
    ) -> Result<CommandTree, CommandError> {
        let members: Vec<&Arc<RegisteredCommand>> =
            commands.iter().filter(|c| c.root() == root).collect();
        for command in &members {
            self.validate_command(command)
                .map_err(|v| CommandError::violation(command.qualified_name(), v))?;
        }

        let declared_groups: Vec<&CommandGroup> = groups
            .iter()
            .filter(|g| g.path().len() == 2 && g.path()[0] == root)
            .collect();
        let has_subcommands =
            members.iter().any(|c| c.path().len() > 1) || !declared_groups.is_empty();

        let root_description = groups
            .iter()
            .find(|g| g.is_root() && g.path()[0] == root)
            .map(|g| g.description().to_string())
            .or_else(|| {
                members
                    .iter()
                    .find(|c| c.path().len() == 1)
                    .map(|c| c.description().to_string())
            })
            .unwrap_or_else(|| format!("{root} commands"));

        let mut tree = CommandTree::new(root, root_description);
        let root_id = tree.root();
        let mut seen: Vec<&[String]> = Vec::new();

        for command in &members {
            if seen.contains(&command.path()) {
                warn!(
                    command = %command.qualified_name(),
                    "overload shares a path with an earlier declaration; schema uses the first"
                );
                continue;
            }
            seen.push(command.path());

            let to_violation = |v: Violation| CommandError::violation(command.qualified_name(), v);
            match command.subcommand_path() {
                [] if has_subcommands => {
                    warn!(
                        command = %command.qualified_name(),
                        "root command coexists with subcommands and stays text-only"
                    );
                }
                [] => self
                    .add_parameters(&mut tree, root_id, command)
                    .map_err(to_violation)?,
                [sub] => {
                    let id = self
                        .add_subcommand(&mut tree, root_id, sub, command)
                        .map_err(to_violation)?;
                    self.add_parameters(&mut tree, id, command)
                        .map_err(to_violation)?;
                }
                [group, sub] => {
                    let group_id = ensure_group(&mut tree, group, &declared_groups)
                        .map_err(to_violation)?;
                    let id = self
                        .add_subcommand(&mut tree, group_id, sub, command)
                        .map_err(to_violation)?;
                    self.add_parameters(&mut tree, id, command)
                        .map_err(to_violation)?;
                }
                _ => {
                    return Err(to_violation(Violation::PathTooDeep {
                        path: command.qualified_name(),
                    }))
                }
            }
        }

        for group in &declared_groups {
            let name = &group.path()[1];
            if tree.find(&[name.as_str()]).is_none() {
                ensure_group(&mut tree, name, &declared_groups)
                    .map_err(|v| CommandError::violation(group.path().join(" "), v))?;
            }
        }

        limits::validate_tree(&tree).map_err(|v| CommandError::violation(root, v))?;
        Ok(tree)
    }

    fn validate_command(&self, command: &RegisteredCommand) -> Result<(), Violation> {
        if command.path().len() > SCHEMA_LIMITS.max_path_segments {
            return Err(Violation::PathTooDeep {
                path: command.qualified_name(),
            });
        }
        for segment in command.path() {
            limits::validate_name(segment)?;
        }

        let mut seen_optional = false;
        let mut seen_variadic: Option<&str> = None;
        for param in command.parameters() {
            let Some(entry) = self.resolvers.lookup(param.type_tag()) else {
                return Err(Violation::UnknownType {
                    parameter: param.name().to_string(),
                    type_name: param.type_tag().to_string(),
                });
            };
            for condition in param.conditions() {
                if !self.conditions.has(&condition.name) {
                    return Err(Violation::UnknownCondition {
                        parameter: param.name().to_string(),
                        condition: condition.name.clone(),
                    });
                }
            }
            limits::validate_choices(param.name(), param.choices().len())?;

            if is_issuer_only(param, entry) {
                continue;
            }
            if let Some(variadic) = seen_variadic {
                return Err(Violation::VariadicNotTrailing {
                    parameter: variadic.to_string(),
                });
            }
            if param.requires_input() && seen_optional {
                return Err(Violation::RequiredAfterOptional {
                    parameter: param.name().to_string(),
                });
            }
            seen_optional |= !param.requires_input();
            if param.type_tag().is_variadic() {
                seen_variadic = Some(param.name());
            }
        }
        Ok(())
    }

    fn add_subcommand(
        &self,
        tree: &mut CommandTree,
        parent: NodeId,
        name: &str,
        command: &RegisteredCommand,
    ) -> Result<NodeId, Violation> {
        let existing = tree
            .children(parent)
            .find(|(_, n)| n.name.eq_ignore_ascii_case(name))
            .map(|(_, n)| n.kind);
        if existing == Some(NodeKind::SubcommandGroup) {
            return Err(both_subcommand_and_group(&command.qualified_name()));
        }
        tree.add_child(
            parent,
            NodeKind::Subcommand,
            name,
            command.description().to_string(),
        )
    }

    fn add_parameters(
        &self,
        tree: &mut CommandTree,
        parent: NodeId,
        command: &RegisteredCommand,
    ) -> Result<(), Violation> {
        for param in command.parameters() {
            let Some(entry) = self.resolvers.lookup(param.type_tag()) else {
                continue;
            };
            if is_issuer_only(param, entry) {
                continue;
            }
            let description = param.description().unwrap_or(param.name()).to_string();
            let id = tree.add_child(parent, NodeKind::Parameter, param.name(), description)?;
            for (key, value) in self.parameter_properties(param) {
                tree.set_property(id, key, value);
            }
        }
        Ok(())
    }

    fn parameter_properties(&self, param: &ParameterDescriptor) -> Vec<(&'static str, Json)> {
        let option_type = option_type(param.type_tag());
        let numeric = matches!(option_type, "LONG" | "DECIMAL");
        let mut properties = vec![
            ("type", json!(option_type)),
            ("required", json!(param.requires_input())),
        ];

        let choices: Vec<(String, String)> = if !param.choices().is_empty() {
            param.choices().to_vec()
        } else if let TypeTag::Named(name) = param.type_tag() {
            self.resolvers
                .enum_members(name)
                .map(|members| members.iter().map(|m| (m.clone(), m.clone())).collect())
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        if !choices.is_empty() {
            let rendered: Vec<Json> = choices
                .into_iter()
                .map(|(label, value)| json!({ "name": label, "value": choice_value(&value, numeric) }))
                .collect();
            properties.push(("choices", Json::Array(rendered)));
        }

        if numeric {
            let integral = option_type == "LONG";
            if let Some(min) = param.min_bound() {
                let value = if integral {
                    json!(clamp_i64(min.ceil()))
                } else {
                    json!(min.as_f64())
                };
                properties.push(("min_value", value));
            }
            if let Some(max) = param.max_bound() {
                let value = if integral {
                    json!(clamp_i64(max.floor()))
                } else {
                    json!(max.as_f64())
                };
                properties.push(("max_value", value));
            }
        }
        if option_type == "STRING" {
            if let Some(min) = param.min_length() {
                properties.push(("min_length", json!(min)));
            }
            if let Some(max) = param.max_length() {
                properties.push(("max_length", json!(max)));
            }
        }
        if let Some(kinds) = param.flag("kinds") {
            let codes: Vec<u8> = kinds
                .split('|')
                .filter_map(ChannelKind::parse)
                .map(|k| k.schema_code())
                .collect();
            if !codes.is_empty() {
                properties.push(("channel_types", json!(codes)));
            }
        }
        if param.has_flag("autocomplete") {
            properties.push(("autocomplete", json!(true)));
        }
        properties
    }
}

/// Platform option type for a declared type.
pub fn option_type(type_tag: &TypeTag) -> &'static str {
    match type_tag {
        t if t.is_integer() => "LONG",
        t if t.is_float() => "DECIMAL",
        TypeTag::Bool => "BOOLEAN",
        TypeTag::User | TypeTag::Member => "USER",
        TypeTag::Channel => "CHANNEL",
        TypeTag::Role => "ROLE",
        TypeTag::Mentionable => "MENTIONABLE",
        _ => "STRING",
    }
}

/// Integer bounds are exported rounded inwards, matching what text input accepts.
fn clamp_i64(value: i128) -> i64 {
    value.clamp(i64::MIN.into(), i64::MAX.into()) as i64
}

fn choice_value(value: &str, numeric: bool) -> Json {
    if numeric {
        if let Ok(i) = value.parse::<i64>() {
            return json!(i);
        }
        if let Ok(f) = value.parse::<f64>() {
            return json!(f);
        }
    }
    json!(value)
}

fn both_subcommand_and_group(path: &str) -> Violation {
    Violation::InvalidDeclaration {
        message: format!("'{path}' is used both as a subcommand and as a group"),
    }
}

fn ensure_group(
    tree: &mut CommandTree,
    name: &str,
    declared: &[&CommandGroup],
) -> Result<NodeId, Violation> {
    let root = tree.root();
    if let Some((id, node)) = tree
        .children(root)
        .find(|(_, n)| n.name.eq_ignore_ascii_case(name))
    {
        return match node.kind {
            NodeKind::SubcommandGroup => Ok(id),
            _ => Err(both_subcommand_and_group(&format!("{} {name}", tree.name()))),
        };
    }
    let description = declared
        .iter()
        .find(|g| g.path()[1].eq_ignore_ascii_case(name))
        .map(|g| g.description().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| format!("{name} commands"));
    tree.add_child(root, NodeKind::SubcommandGroup, name, description)
}

fn root_aliases<'g>(root: &str, groups: &'g [CommandGroup]) -> impl Iterator<Item = &'g str> + 'g {
    let root = root.to_string();
    groups
        .iter()
        .filter(move |g| g.is_root() && g.path()[0] == root)
        .flat_map(|g| g.aliases().iter().map(String::as_str))
}
