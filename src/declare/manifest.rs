//! YAML command manifests.
//!
//! A manifest expresses the declaration surface as data so that tooling (the `argot` CLI) can
//! compile, inspect and diff command schemas without the bot's handler code.
//!
//! ```yaml
//! enums:
//!   colour: [red, green, dark_blue]
//! groups:
//!   - path: role
//!     description: Manage roles
//!     aliases: [roles]
//! commands:
//!   - path: role add
//!     description: Give a member a role
//!     signature: "<member:member> <role:role> [reason...]"
//!     params:
//!       member: { flags: other }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::declare::{Bound, CommandBuilder, CommandGroup, ParameterBuilder};
use crate::diagnostics::CommandError;
use crate::dispatch::CommandHandler;
use crate::resolve::ResolverRegistry;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub enums: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
    #[serde(default)]
    pub commands: Vec<CommandSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupSpec {
    pub path: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandSpec {
    pub path: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub params: BTreeMap<String, ParamSpec>,
}

/// Annotations layered on a parameter declared by the signature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamSpec {
    pub description: Option<String>,
    pub flags: Option<String>,
    pub choices: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub conditions: Option<String>,
    pub min_value: Option<Bound>,
    pub max_value: Option<Bound>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

impl Manifest {
    pub fn from_yaml(text: &str) -> Result<Self, CommandError> {
        serde_yaml::from_str(text).map_err(|e| CommandError::Config {
            message: format!("invalid manifest: {e}"),
            ctx: Default::default(),
            source: Some(Box::new(e)),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CommandError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| CommandError::Config {
            message: format!("cannot read manifest '{}': {e}", path.display()),
            ctx: Default::default(),
            source: Some(Box::new(e)),
        })?;
        Self::from_yaml(&text)
    }

    pub fn groups(&self) -> Vec<CommandGroup> {
        self.groups
            .iter()
            .map(|spec| {
                spec.aliases.iter().fold(
                    CommandGroup::new(&spec.path, spec.description.clone()),
                    |group, alias| group.alias(alias.clone()),
                )
            })
            .collect()
    }

    /// One builder per declared command, all bound to the same handler.
    pub fn command_builders(&self, handler: Arc<dyn CommandHandler>) -> Vec<CommandBuilder> {
        self.commands
            .iter()
            .map(|spec| spec.to_builder(Arc::clone(&handler)))
            .collect()
    }

    pub fn register_enums(&self, registry: &mut ResolverRegistry) {
        for (name, members) in &self.enums {
            registry.register_enum(name.clone(), members.clone());
        }
    }
}

impl CommandSpec {
    pub fn to_builder(&self, handler: Arc<dyn CommandHandler>) -> CommandBuilder {
        let mut builder = CommandBuilder::new(self.path.clone())
            .description(self.description.clone())
            .help(self.help.clone())
            .signature(&self.signature)
            .handler(handler);
        for permission in &self.permissions {
            builder = builder.permission(permission.clone());
        }
        for (name, spec) in &self.params {
            builder = builder.configure(name, |param| spec.apply(param));
        }
        builder
    }
}

impl ParamSpec {
    fn apply(&self, mut param: ParameterBuilder) -> ParameterBuilder {
        if let Some(description) = &self.description {
            param = param.description(description.clone());
        }
        if let Some(flags) = &self.flags {
            param = param.flags(flags.clone());
        }
        if let Some(choices) = &self.choices {
            param = param.choices(choices.clone());
        }
        if let Some(conditions) = &self.conditions {
            param = param.conditions(conditions.clone());
        }
        for permission in &self.permissions {
            param = param.permission(permission.clone());
        }
        if let Some(v) = self.min_value {
            param = param.min_value(v);
        }
        if let Some(v) = self.max_value {
            param = param.max_value(v);
        }
        if let Some(v) = self.min_length {
            param = param.min_length(v);
        }
        if let Some(v) = self.max_length {
            param = param.max_length(v);
        }
        param
    }
}
