//! # Command Declarations
//!
//! The explicit registration surface: commands are built with [`CommandBuilder`], their
//! parameters with [`ParameterBuilder`] or a usage-style signature
//! (`"<member:member> <role:role> [reason:string...]"`). Building produces immutable
//! [`RegisteredCommand`] / [`ParameterDescriptor`] values that the schema compiler and the
//! resolution pipeline consume.
//!
//! ## Declaration strings
//!
//! - flags: `key=value,key2` (keys are case-insensitive, values kept verbatim)
//! - choices: `label1=value1,label2=value2` (a bare entry is its own value)
//! - conditions: `not-self|limits:min=1` (`name` or `name:config`, separated by `|`)

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{CommandError, Violation};
use crate::dispatch::CommandHandler;
use crate::resolve::caseless_eq;

pub mod manifest;
pub mod signature;
pub mod types;

pub use types::TypeTag;

// ============================================================================
// PARAMETERS
// ============================================================================

/// A condition attached to a parameter, checked after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionRef {
    pub name: String,
    pub config: Option<String>,
}

/// A numeric bound, kept in the domain it was written in so integer bounds stay exact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    Integer(i64),
    Float(f64),
}

impl Bound {
    /// Integers first, then finite floats.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(i) = text.parse::<i64>() {
            return Some(Self::Integer(i));
        }
        text.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Self::Float)
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Self::Integer(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    pub fn as_decimal(self) -> Option<Decimal> {
        match self {
            Self::Integer(i) => Some(Decimal::from(i)),
            Self::Float(f) => Decimal::try_from(f).ok(),
        }
    }

    /// Smallest integer at or above the bound.
    pub fn ceil(self) -> i128 {
        match self {
            Self::Integer(i) => i128::from(i),
            Self::Float(f) => f.ceil() as i128,
        }
    }

    /// Largest integer at or below the bound.
    pub fn floor(self) -> i128 {
        match self {
            Self::Integer(i) => i128::from(i),
            Self::Float(f) => f.floor() as i128,
        }
    }
}

impl From<i64> for Bound {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Bound {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for Bound {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

/// Static metadata for one formal argument of a command.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    name: String,
    type_tag: TypeTag,
    optional: bool,
    default: Option<String>,
    flags: BTreeMap<String, String>,
    permissions: BTreeSet<String>,
    choices: Vec<(String, String)>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    min_value: Option<Bound>,
    max_value: Option<Bound>,
    description: Option<String>,
    conditions: Vec<ConditionRef>,
}

impl ParameterDescriptor {
    pub fn builder(name: impl Into<String>, type_tag: TypeTag) -> ParameterBuilder {
        ParameterBuilder::new(name, type_tag)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_tag(&self) -> &TypeTag {
        &self.type_tag
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Required parameters abort with usage when no input is left.
    pub fn requires_input(&self) -> bool {
        !self.optional && self.default.is_none()
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn flag(&self, key: &str) -> Option<&str> {
        self.flags.get(key).map(String::as_str)
    }

    pub fn has_flag(&self, key: &str) -> bool {
        self.flags.contains_key(key)
    }

    pub fn flags(&self) -> &BTreeMap<String, String> {
        &self.flags
    }

    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.permissions
    }

    pub fn choices(&self) -> &[(String, String)] {
        &self.choices
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn conditions(&self) -> &[ConditionRef] {
        &self.conditions
    }

    /// `min` flag, falling back to the `min_value` annotation.
    pub fn min_bound(&self) -> Option<Bound> {
        self.numeric_flag("min").or(self.min_value)
    }

    /// `max` flag, falling back to the `max_value` annotation.
    pub fn max_bound(&self) -> Option<Bound> {
        self.numeric_flag("max").or(self.max_value)
    }

    pub fn min_length(&self) -> Option<usize> {
        self.flag("minlen")
            .and_then(|v| v.parse().ok())
            .or(self.min_length)
    }

    pub fn max_length(&self) -> Option<usize> {
        self.flag("maxlen")
            .and_then(|v| v.parse().ok())
            .or(self.max_length)
    }

    fn numeric_flag(&self, key: &str) -> Option<Bound> {
        self.flag(key).and_then(Bound::parse)
    }
}

/// Builds a [`ParameterDescriptor`]; string annotations are parsed in [`ParameterBuilder::build`].
#[derive(Debug, Clone)]
pub struct ParameterBuilder {
    name: String,
    type_tag: TypeTag,
    optional: bool,
    default: Option<String>,
    flags: Vec<String>,
    permissions: BTreeSet<String>,
    choices: Option<String>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    min_value: Option<Bound>,
    max_value: Option<Bound>,
    description: Option<String>,
    conditions: Option<String>,
}

impl ParameterBuilder {
    pub fn new(name: impl Into<String>, type_tag: TypeTag) -> Self {
        Self {
            name: name.into(),
            type_tag,
            optional: false,
            default: None,
            flags: Vec::new(),
            permissions: BTreeSet::new(),
            choices: None,
            min_length: None,
            max_length: None,
            min_value: None,
            max_value: None,
            description: None,
            conditions: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.optional = false;
        self
    }

    pub fn type_tag(mut self, type_tag: TypeTag) -> Self {
        self.type_tag = type_tag;
        self
    }

    /// Input used when none is supplied; it goes through the resolver like typed input.
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Appends a `key=value,key2` flag string. May be called repeatedly.
    pub fn flags(mut self, flags: impl Into<String>) -> Self {
        self.flags.push(flags.into());
        self
    }

    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    pub fn choices(mut self, choices: impl Into<String>) -> Self {
        self.choices = Some(choices.into());
        self
    }

    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn min_value(mut self, value: impl Into<Bound>) -> Self {
        self.min_value = Some(value.into());
        self
    }

    pub fn max_value(mut self, value: impl Into<Bound>) -> Self {
        self.max_value = Some(value.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn conditions(mut self, conditions: impl Into<String>) -> Self {
        self.conditions = Some(conditions.into());
        self
    }

    pub fn build(self) -> Result<ParameterDescriptor, Violation> {
        let mut flags = BTreeMap::new();
        for spec in &self.flags {
            flags.extend(parse_flags(spec)?);
        }
        let choices = match &self.choices {
            Some(spec) => parse_choices(spec)?,
            None => Vec::new(),
        };
        let conditions = match &self.conditions {
            Some(spec) => parse_conditions(spec)?,
            None => Vec::new(),
        };

        Ok(ParameterDescriptor {
            name: self.name.to_lowercase(),
            type_tag: self.type_tag,
            optional: self.optional,
            default: self.default,
            flags,
            permissions: self.permissions,
            choices,
            min_length: self.min_length,
            max_length: self.max_length,
            min_value: self.min_value,
            max_value: self.max_value,
            description: self.description,
            conditions,
        })
    }
}

// ============================================================================
// DECLARATION STRING PARSERS
// ============================================================================

pub fn parse_flags(spec: &str) -> Result<BTreeMap<String, String>, Violation> {
    let mut flags = BTreeMap::new();
    for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (key, value) = match entry.split_once('=') {
            Some((key, value)) => (key.trim(), value.trim()),
            None => (entry, ""),
        };
        if key.is_empty() {
            return Err(Violation::InvalidDeclaration {
                message: format!("flag '{entry}' has no key"),
            });
        }
        flags.insert(key.to_ascii_lowercase(), value.to_string());
    }
    Ok(flags)
}

pub fn parse_choices(spec: &str) -> Result<Vec<(String, String)>, Violation> {
    let mut choices: Vec<(String, String)> = Vec::new();
    for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (label, value) = match entry.split_once('=') {
            Some((label, value)) => (label.trim(), value.trim()),
            None => (entry, entry),
        };
        if label.is_empty() || value.is_empty() {
            return Err(Violation::InvalidDeclaration {
                message: format!("choice '{entry}' needs both a label and a value"),
            });
        }
        if choices.iter().any(|(l, _)| caseless_eq(l, label)) {
            return Err(Violation::InvalidDeclaration {
                message: format!("choice label '{label}' is declared twice"),
            });
        }
        choices.push((label.to_string(), value.to_string()));
    }
    Ok(choices)
}

pub fn parse_conditions(spec: &str) -> Result<Vec<ConditionRef>, Violation> {
    spec.split('|')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(|entry| {
            let (name, config) = match entry.split_once(':') {
                Some((name, config)) => (name.trim(), Some(config.trim().to_string())),
                None => (entry, None),
            };
            if name.is_empty() {
                return Err(Violation::InvalidDeclaration {
                    message: format!("condition '{entry}' has no name"),
                });
            }
            Ok(ConditionRef {
                name: name.to_ascii_lowercase(),
                config,
            })
        })
        .collect()
}

// ============================================================================
// COMMANDS
// ============================================================================

/// A declared command: a path, its parameters and the handler to invoke.
#[derive(Clone)]
pub struct RegisteredCommand {
    path: Vec<String>,
    parameters: Vec<ParameterDescriptor>,
    handler: Arc<dyn CommandHandler>,
    description: String,
    help_text: String,
    permissions: BTreeSet<String>,
}

impl RegisteredCommand {
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The leading alias segment.
    pub fn root(&self) -> &str {
        self.path.first().map(String::as_str).unwrap_or_default()
    }

    /// Segments after the root alias.
    pub fn subcommand_path(&self) -> &[String] {
        self.path.get(1..).unwrap_or_default()
    }

    pub fn qualified_name(&self) -> String {
        self.path.join(" ")
    }

    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    pub fn handler(&self) -> &Arc<dyn CommandHandler> {
        &self.handler
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn help_text(&self) -> &str {
        &self.help_text
    }

    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.permissions
    }
}

impl fmt::Debug for RegisteredCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredCommand")
            .field("path", &self.path)
            .field("parameters", &self.parameters)
            .field("description", &self.description)
            .field("permissions", &self.permissions)
            .finish_non_exhaustive()
    }
}

/// Fluent builder for [`RegisteredCommand`].
///
/// Declaration mistakes (bad signature, unknown parameter in `configure`, ...) are remembered
/// and reported by [`CommandBuilder::build`], so the chain itself never fails.
pub struct CommandBuilder {
    path: String,
    description: String,
    help_text: String,
    params: Vec<ParameterBuilder>,
    permissions: BTreeSet<String>,
    handler: Option<Arc<dyn CommandHandler>>,
    error: Option<Violation>,
}

impl CommandBuilder {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            description: String::new(),
            help_text: String::new(),
            params: Vec::new(),
            permissions: BTreeSet::new(),
            handler: None,
            error: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help_text = help.into();
        self
    }

    /// Appends the parameters of a usage-style signature.
    pub fn signature(mut self, signature: &str) -> Self {
        match signature::parse_signature(signature) {
            Ok(params) => self.params.extend(params),
            Err(violation) => self.remember(violation),
        }
        self
    }

    pub fn param(mut self, param: ParameterBuilder) -> Self {
        self.params.push(param);
        self
    }

    /// Adjusts an already declared parameter, usually one that came from a signature.
    pub fn configure(
        mut self,
        name: &str,
        adjust: impl FnOnce(ParameterBuilder) -> ParameterBuilder,
    ) -> Self {
        match self.params.iter().position(|p| p.name.eq_ignore_ascii_case(name)) {
            Some(index) => {
                let param = self.params.remove(index);
                self.params.insert(index, adjust(param));
            }
            None => self.remember(Violation::InvalidDeclaration {
                message: format!("cannot configure unknown parameter '{name}'"),
            }),
        }
        self
    }

    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    pub fn handler(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    fn remember(&mut self, violation: Violation) {
        if self.error.is_none() {
            self.error = Some(violation);
        }
    }

    pub fn build(self) -> Result<RegisteredCommand, CommandError> {
        let path: Vec<String> = self
            .path
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        let qualified = path.join(" ");
        if let Some(violation) = self.error {
            return Err(CommandError::violation(qualified, violation));
        }
        if path.is_empty() {
            return Err(CommandError::violation(
                self.path,
                Violation::InvalidDeclaration {
                    message: "command path is empty".to_string(),
                },
            ));
        }
        let Some(handler) = self.handler else {
            return Err(CommandError::violation(
                qualified,
                Violation::InvalidDeclaration {
                    message: "no handler attached".to_string(),
                },
            ));
        };

        let mut parameters = Vec::with_capacity(self.params.len());
        for param in self.params {
            let descriptor = param
                .build()
                .map_err(|v| CommandError::violation(qualified.clone(), v))?;
            if parameters
                .iter()
                .any(|p: &ParameterDescriptor| p.name() == descriptor.name())
            {
                return Err(CommandError::violation(
                    qualified,
                    Violation::DuplicateSibling {
                        name: descriptor.name().to_string(),
                    },
                ));
            }
            parameters.push(descriptor);
        }

        Ok(RegisteredCommand {
            path,
            parameters,
            handler,
            description: self.description,
            help_text: self.help_text,
            permissions: self.permissions,
        })
    }
}

/// A declared scope: a root alias (one segment) or a subcommand group (two segments).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandGroup {
    path: Vec<String>,
    description: String,
    aliases: Vec<String>,
}

impl CommandGroup {
    pub fn new(path: &str, description: impl Into<String>) -> Self {
        Self {
            path: path.split_whitespace().map(str::to_lowercase).collect(),
            description: description.into(),
            aliases: Vec::new(),
        }
    }

    /// Extra text-mode alias; only meaningful on root groups.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into().to_lowercase());
        self
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn is_root(&self) -> bool {
        self.path.len() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_keyed_case_insensitively() {
        let flags = parse_flags("Other, min=1 ,MAX=5,split=;").unwrap();
        assert_eq!(flags.get("other").map(String::as_str), Some(""));
        assert_eq!(flags.get("min").map(String::as_str), Some("1"));
        assert_eq!(flags.get("max").map(String::as_str), Some("5"));
        assert_eq!(flags.get("split").map(String::as_str), Some(";"));
    }

    #[test]
    fn flag_without_key_is_rejected() {
        assert!(matches!(
            parse_flags("=3"),
            Err(Violation::InvalidDeclaration { .. })
        ));
    }

    #[test]
    fn choices_keep_declaration_order() {
        let choices = parse_choices("Small=s, Large=l,medium").unwrap();
        assert_eq!(
            choices,
            vec![
                ("Small".to_string(), "s".to_string()),
                ("Large".to_string(), "l".to_string()),
                ("medium".to_string(), "medium".to_string()),
            ]
        );
        assert!(parse_choices("a=1,A=2").is_err());
    }

    #[test]
    fn conditions_split_name_and_config() {
        let conditions = parse_conditions("not-self | limits:min=1").unwrap();
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].name, "not-self");
        assert_eq!(conditions[0].config, None);
        assert_eq!(conditions[1].config.as_deref(), Some("min=1"));
    }

    #[test]
    fn flag_bounds_win_over_annotations() {
        let param = ParameterBuilder::new("amount", TypeTag::I32)
            .min_value(0.0)
            .max_value(100.0)
            .flags("min=1")
            .build()
            .unwrap();
        assert_eq!(param.min_bound().map(Bound::as_f64), Some(1.0));
        assert_eq!(param.max_bound().map(Bound::as_f64), Some(100.0));
        assert!(param.requires_input());
    }

    #[test]
    fn default_value_lifts_input_requirement() {
        let param = ParameterBuilder::new("count", TypeTag::I32)
            .default_value("1")
            .build()
            .unwrap();
        assert!(!param.is_optional());
        assert!(!param.requires_input());
    }
}
