//! The argument resolution pipeline.
//!
//! Walks a command's parameters in declaration order and produces either the full ordered
//! argument map, a request to show usage, or the first error. Nothing partial escapes.
//!
//! Per parameter:
//! 0. issuer-only parameters resolve from the invocation without touching input
//! 1. no input: inject the default, else resolve-or-absent for optional, else show usage
//! 2. input present but a required permission is missing: `PermissionDenied`
//! 3. declared choices restrict and translate the raw token
//! 4. the resolver runs
//! 5. the parameter's conditions check the value

use tracing::debug;

use crate::declare::{ParameterDescriptor, RegisteredCommand};
use crate::diagnostics::{ArgumentErrorKind, CommandError};
use crate::err_msg;
use crate::model::{Arguments, EntitySource, InvocationContext, PermissionResolver, Value};
use crate::resolve::{
    caseless_eq, is_issuer_only, ArgumentInput, ConditionContext, ConditionRegistry, InputValue,
    OptionValue, ResolutionContext, ResolverRegistry,
};

/// Shared, read-only collaborators of a resolution run.
#[derive(Clone, Copy)]
pub struct ResolveEnv<'a> {
    pub resolvers: &'a ResolverRegistry,
    pub conditions: &'a ConditionRegistry,
    pub entities: &'a dyn EntitySource,
    pub permissions: &'a dyn PermissionResolver,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(Arguments),
    /// A required parameter received no input.
    ShowUsage,
}

fn permitted(
    param: &ParameterDescriptor,
    invocation: &InvocationContext,
    env: &ResolveEnv<'_>,
) -> bool {
    param
        .permissions()
        .iter()
        .all(|p| env.permissions.has_permission(invocation, p))
}

pub fn resolve(
    command: &RegisteredCommand,
    invocation: &InvocationContext,
    mut input: ArgumentInput,
    env: &ResolveEnv<'_>,
) -> Result<Resolution, CommandError> {
    let params = command.parameters();

    let mut entries = Vec::with_capacity(params.len());
    for param in params {
        let entry = env.resolvers.lookup(param.type_tag()).ok_or_else(|| {
            err_msg!(
                Internal,
                "no resolver for type '{}' of parameter '{}'",
                param.type_tag(),
                param.name()
            )
        })?;
        entries.push(entry);
    }
    let last_consuming = params
        .iter()
        .zip(&entries)
        .rposition(|(param, entry)| !is_issuer_only(param, entry));

    let mut arguments = Arguments::new();
    for (index, (param, entry)) in params.iter().zip(&entries).enumerate() {
        let is_last = last_consuming == Some(index);
        let mut ctx = ResolutionContext::new(
            param,
            invocation,
            env.entities,
            env.resolvers,
            &mut input,
            is_last,
        );

        if is_issuer_only(param, entry) {
            let value = (entry.resolve)(&mut ctx)?;
            check_conditions(&ctx, &value, env)?;
            arguments.insert(param.name(), value);
            continue;
        }

        if ctx.has_input() {
            if !permitted(param, invocation, env) {
                return Err(CommandError::permission_denied(param.name()));
            }
        } else if let Some(default) = param.default_value() {
            ctx.inject_text(default);
        } else if param.is_optional() {
            let value = if entry.accepts_absent && permitted(param, invocation, env) {
                (entry.resolve)(&mut ctx)?
            } else {
                Value::Absent
            };
            check_conditions(&ctx, &value, env)?;
            arguments.insert(param.name(), value);
            continue;
        } else {
            debug!(
                command = %command.qualified_name(),
                parameter = param.name(),
                "required parameter missing, showing usage"
            );
            return Ok(Resolution::ShowUsage);
        }

        if !param.choices().is_empty() {
            apply_choices(&mut ctx)?;
        }

        let value = (entry.resolve)(&mut ctx)?;
        check_conditions(&ctx, &value, env)?;
        arguments.insert(param.name(), value);
    }

    if let ArgumentInput::Text { tokens, .. } = &input {
        if !tokens.is_empty() {
            debug!(
                command = %command.qualified_name(),
                ignored = tokens.len(),
                "ignoring unconsumed trailing tokens"
            );
        }
    }

    Ok(Resolution::Resolved(arguments))
}

/// Replaces the next input with the value of the matching choice.
fn apply_choices(ctx: &mut ResolutionContext<'_>) -> Result<(), CommandError> {
    let Some(input) = ctx.pop() else {
        return Ok(());
    };
    let text = input.text().trim().to_string();
    let param = ctx.param;
    let found = param
        .choices()
        .iter()
        .find(|(label, value)| caseless_eq(label, &text) || caseless_eq(value, &text));

    match found {
        Some((_, value)) => {
            match input {
                InputValue::Typed(OptionValue::String(_)) | InputValue::Text(_) => {
                    ctx.inject_text(value)
                }
                typed @ InputValue::Typed(_) => ctx.inject(typed),
            }
            Ok(())
        }
        None => Err(ctx.fail(ArgumentErrorKind::MustSpecifyOne {
            input: text,
            options: param.choices().iter().map(|(label, _)| label.clone()).collect(),
        })),
    }
}

fn check_conditions(
    ctx: &ResolutionContext<'_>,
    value: &Value,
    env: &ResolveEnv<'_>,
) -> Result<(), CommandError> {
    if value.is_absent() {
        return Ok(());
    }
    for condition in ctx.param.conditions() {
        let check = env.conditions.get(&condition.name).ok_or_else(|| {
            err_msg!(Internal, "condition '{}' is not registered", condition.name)
        })?;
        let cctx = ConditionContext {
            invocation: ctx.invocation,
            param: ctx.param,
            config: condition.config.as_deref(),
        };
        check(&cctx, value).map_err(|message| {
            ctx.fail(ArgumentErrorKind::ConditionFailed {
                condition: condition.name.clone(),
                message,
            })
        })?;
    }
    Ok(())
}
