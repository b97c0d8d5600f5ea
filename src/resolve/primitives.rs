//! Booleans and the invoking guild.

use crate::declare::TypeTag;
use crate::diagnostics::{ArgumentErrorKind, CommandError};
use crate::model::Value;
use crate::resolve::{
    InputValue, OptionValue, ResolutionContext, ResolverEntry, ResolverKind, ResolverRegistry,
};

const TRUE_WORDS: &[&str] = &["true", "yes", "on", "y", "1"];
const FALSE_WORDS: &[&str] = &["false", "no", "off", "n", "0"];

pub fn register_primitive_resolvers(registry: &mut ResolverRegistry) {
    registry.register(TypeTag::Bool, ResolverKind::InputConsuming, resolve_bool);
    registry.register_entry(ResolverEntry {
        type_tag: TypeTag::Guild,
        kind: ResolverKind::IssuerOnly,
        accepts_absent: true,
        resolve: resolve_guild,
    });
}

pub fn resolve_bool(ctx: &mut ResolutionContext<'_>) -> Result<Value, CommandError> {
    let Some(input) = ctx.pop() else {
        return Ok(Value::Absent);
    };
    if let InputValue::Typed(OptionValue::Boolean(b)) = input {
        return Ok(Value::Bool(b));
    }
    let text = input.text().trim().to_ascii_lowercase();
    if TRUE_WORDS.contains(&text.as_str()) {
        Ok(Value::Bool(true))
    } else if FALSE_WORDS.contains(&text.as_str()) {
        Ok(Value::Bool(false))
    } else {
        Err(ctx.fail(ArgumentErrorKind::MustSpecifyOne {
            input: input.text().into_owned(),
            options: vec!["true".to_string(), "false".to_string()],
        }))
    }
}

pub fn resolve_guild(ctx: &mut ResolutionContext<'_>) -> Result<Value, CommandError> {
    match &ctx.invocation.guild {
        Some(guild) => Ok(Value::Guild(guild.clone())),
        None if ctx.param.is_optional() => Ok(Value::Absent),
        None => Err(ctx.fail(ArgumentErrorKind::NotInScope { entity: "guild" })),
    }
}
