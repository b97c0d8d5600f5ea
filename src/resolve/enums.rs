//! Enumeration resolver.
//!
//! Registered once for `AnyEnum`; concrete enumerations reach it through the registry's family
//! fallback and are identified by the parameter's `Named` tag.

use crate::declare::TypeTag;
use crate::diagnostics::{ArgumentErrorKind, CommandError};
use crate::err_msg;
use crate::model::Value;
use crate::resolve::{ResolutionContext, ResolverKind, ResolverRegistry};

pub fn register_enum_resolver(registry: &mut ResolverRegistry) {
    registry.register(TypeTag::AnyEnum, ResolverKind::InputConsuming, resolve_enum);
}

/// Lowercases and drops `_`, `-` and spaces so `dark-blue`, `DARK_BLUE` and `darkblue` agree.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn resolve_enum(ctx: &mut ResolutionContext<'_>) -> Result<Value, CommandError> {
    let (param, registry) = (ctx.param, ctx.registry);
    let TypeTag::Named(name) = param.type_tag() else {
        return Err(err_msg!(
            Internal,
            "parameter '{}' is not an enumeration",
            param.name()
        ));
    };
    let Some(def) = registry.enum_def(name) else {
        return Err(err_msg!(Internal, "enumeration '{}' is not registered", name));
    };
    let Some(input) = ctx.pop() else {
        return Ok(Value::Absent);
    };

    let text = input.text().into_owned();
    let wanted = normalize(&text);
    match def.members.iter().find(|m| normalize(m) == wanted) {
        Some(member) => Ok(Value::Enum {
            type_name: def.name.clone(),
            member: member.clone(),
        }),
        None => Err(ctx.fail(ArgumentErrorKind::MustSpecifyOne {
            input: text,
            options: def.members.clone(),
        })),
    }
}
