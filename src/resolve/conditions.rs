//! Post-resolution conditions.
//!
//! A condition runs on a parameter's resolved value and returns the user-facing rejection
//! message on failure. Parameters declare them as `name` or `name:config`, separated by `|`;
//! the config string is handed to the condition untouched.

use im::HashMap;

use crate::declare::ParameterDescriptor;
use crate::model::{InvocationContext, Value};

pub struct ConditionContext<'a> {
    pub invocation: &'a InvocationContext,
    pub param: &'a ParameterDescriptor,
    pub config: Option<&'a str>,
}

pub type ConditionFn = fn(&ConditionContext<'_>, &Value) -> Result<(), String>;

#[derive(Clone, Default)]
pub struct ConditionRegistry {
    conditions: HashMap<String, ConditionFn>,
}

impl ConditionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, condition: ConditionFn) {
        self.conditions
            .insert(name.into().to_ascii_lowercase(), condition);
    }

    pub fn get(&self, name: &str) -> Option<ConditionFn> {
        self.conditions.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl std::fmt::Debug for ConditionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.conditions.keys().collect();
        names.sort();
        f.debug_struct("ConditionRegistry")
            .field("conditions", &names)
            .finish()
    }
}

/// Registry holding `not-self`, `not-bot` and `nonempty`.
pub fn build_default_conditions() -> ConditionRegistry {
    let mut registry = ConditionRegistry::new();
    registry.register("not-self", not_self);
    registry.register("not-bot", not_bot);
    registry.register("nonempty", nonempty);
    registry
}

// ============================================================================
// BUILT-IN CONDITIONS
// ============================================================================

fn not_self(ctx: &ConditionContext<'_>, value: &Value) -> Result<(), String> {
    match value.as_user() {
        Some(user) if user.id == ctx.invocation.issuer.id => {
            Err("You cannot target yourself.".to_string())
        }
        _ => Ok(()),
    }
}

fn not_bot(_ctx: &ConditionContext<'_>, value: &Value) -> Result<(), String> {
    match value.as_user() {
        Some(user) if user.bot => Err(format!("{} is a bot.", user.name)),
        _ => Ok(()),
    }
}

fn nonempty(ctx: &ConditionContext<'_>, value: &Value) -> Result<(), String> {
    let empty = match value {
        Value::Str(s) => s.trim().is_empty(),
        Value::Strings(items) => items.is_empty(),
        _ => false,
    };
    if empty {
        Err(format!("{} must not be empty.", ctx.param.name()))
    } else {
        Ok(())
    }
}
