//!
//! User-facing message templates.
//!
//! Everything a bot user may read goes through this module: rejection replies, usage lines and
//! the fallback for internal failures. Templates use `{}` placeholders filled in order.
//!

use crate::declare::RegisteredCommand;
use crate::diagnostics::CommandError;
use crate::resolve::{is_issuer_only, ResolverRegistry};

// ============================================================================
// TEMPLATES
// ============================================================================

pub const MSG_INVALID_ARGUMENT: &str = "Invalid value for `{}`: {}";
pub const MSG_PERMISSION_DENIED: &str = "You do not have permission to use `{}`.";
pub const MSG_USAGE: &str = "Usage: {}";
pub const MSG_INTERNAL: &str = "Something went wrong while running this command.";
pub const MSG_HANDLER_FAILED: &str = "`{}` failed to complete. Please try again later.";

fn fill(template: &str, values: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut values = values.iter();
    while let Some(index) = rest.find("{}") {
        out.push_str(&rest[..index]);
        out.push_str(values.next().copied().unwrap_or_default());
        rest = &rest[index + 2..];
    }
    out.push_str(rest);
    out
}

/// Reply text for a failed invocation.
pub fn format_error(err: &CommandError) -> String {
    match err {
        CommandError::InvalidArgument { parameter, kind, ctx } => {
            let mut text = fill(
                MSG_INVALID_ARGUMENT,
                &[parameter.as_str(), kind.to_string().as_str()],
            );
            if let Some(help) = &ctx.help {
                text.push(' ');
                text.push_str(help);
            }
            text
        }
        CommandError::PermissionDenied { target, .. } => fill(MSG_PERMISSION_DENIED, &[target.as_str()]),
        _ => MSG_INTERNAL.to_string(),
    }
}

pub fn format_usage(usage: &str) -> String {
    fill(MSG_USAGE, &[usage])
}

/// Reply for a handler error. Only the command name reaches the user; the error is logged.
pub fn format_handler_failure(command: &str) -> String {
    fill(MSG_HANDLER_FAILED, &[command])
}

/// `role add <member> <role> [reason...]`; issuer-only parameters are omitted.
pub fn render_usage(prefix: &str, command: &RegisteredCommand, resolvers: &ResolverRegistry) -> String {
    let mut parts = vec![format!("{prefix}{}", command.qualified_name())];
    for param in command.parameters() {
        if resolvers
            .lookup(param.type_tag())
            .is_some_and(|entry| is_issuer_only(param, entry))
        {
            continue;
        }
        let dots = if param.type_tag().is_variadic() { "..." } else { "" };
        parts.push(if param.requires_input() {
            format!("<{}{dots}>", param.name())
        } else {
            format!("[{}{dots}]", param.name())
        });
    }
    parts.join(" ")
}
