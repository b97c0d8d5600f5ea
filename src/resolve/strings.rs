//! String and string-array resolvers.

use crate::declare::TypeTag;
use crate::diagnostics::{ArgumentErrorKind, CommandError};
use crate::model::Value;
use crate::resolve::{InputValue, OptionValue, ResolutionContext, ResolverKind, ResolverRegistry};

pub fn register_string_resolvers(registry: &mut ResolverRegistry) {
    registry.register(TypeTag::String, ResolverKind::InputConsuming, resolve_string);
    registry.register(
        TypeTag::StringArray,
        ResolverKind::InputConsuming,
        resolve_string_array,
    );
}

/// `raw`: one token, untouched. Otherwise the last parameter swallows the rest of the line
/// unless flagged `single` or restricted to declared choices.
pub fn resolve_string(ctx: &mut ResolutionContext<'_>) -> Result<Value, CommandError> {
    let text = if ctx.has_flag("raw") {
        match ctx.pop() {
            Some(input) => input.text().into_owned(),
            None => return Ok(Value::Absent),
        }
    } else if ctx.is_last && !ctx.has_flag("single") && ctx.param.choices().is_empty() {
        let parts = ctx.pop_rest();
        if parts.is_empty() {
            return Ok(Value::Absent);
        }
        parts
            .iter()
            .map(|p| p.text().trim().to_string())
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        match ctx.pop() {
            Some(input) => input.text().trim().to_string(),
            None => return Ok(Value::Absent),
        }
    };

    check_length(ctx, &text)?;
    Ok(Value::Str(text))
}

fn check_length(ctx: &ResolutionContext<'_>, text: &str) -> Result<(), CommandError> {
    let actual = text.chars().count();
    if let Some(min) = ctx.param.min_length() {
        if actual < min {
            return Err(ctx.fail(ArgumentErrorKind::TooShort { min, actual }));
        }
    }
    if let Some(max) = ctx.param.max_length() {
        if actual > max {
            return Err(ctx.fail(ArgumentErrorKind::TooLong { max, actual }));
        }
    }
    Ok(())
}

/// `split[=delim]` re-splits the joined tail on the delimiter (default `,`).
pub fn resolve_string_array(ctx: &mut ResolutionContext<'_>) -> Result<Value, CommandError> {
    let parts = ctx.pop_rest();
    let items: Vec<String> = if ctx.has_flag("split") {
        let delimiter = match ctx.flag("split") {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => ",".to_string(),
        };
        let joined = parts
            .iter()
            .map(|p| p.text().into_owned())
            .collect::<Vec<_>>()
            .join(" ");
        joined
            .split(delimiter.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        parts
            .into_iter()
            .flat_map(|p| match p {
                InputValue::Text(token) => vec![token.text],
                InputValue::Typed(OptionValue::String(s)) => {
                    s.split_whitespace().map(str::to_string).collect()
                }
                InputValue::Typed(other) => vec![other.to_text()],
            })
            .collect()
    };
    Ok(Value::Strings(items))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::declare::ParameterDescriptor;
    use crate::diagnostics::{to_error_source, Span};
    use crate::model::{Channel, InvocationContext, NoEntities, User};
    use crate::resolve::{build_default_registry, ArgumentInput, Token};

    fn text_input(line: &str) -> ArgumentInput {
        let mut tokens = VecDeque::new();
        let mut offset = 0;
        for word in line.split(' ') {
            tokens.push_back(Token {
                text: word.to_string(),
                span: Span::new(offset, offset + word.len()),
            });
            offset += word.len() + 1;
        }
        ArgumentInput::Text {
            source: to_error_source(line),
            tokens,
        }
    }

    fn run(
        param: ParameterDescriptor,
        line: &str,
        is_last: bool,
    ) -> (Result<Value, CommandError>, usize) {
        let registry = build_default_registry();
        let invocation = InvocationContext::direct(User::new(1, "ada"), Channel::direct(2));
        let mut input = text_input(line);
        let result = {
            let mut ctx =
                ResolutionContext::new(&param, &invocation, &NoEntities, &registry, &mut input, is_last);
            let entry = registry.lookup(param.type_tag()).unwrap();
            (entry.resolve)(&mut ctx)
        };
        (result, input.remaining_tokens())
    }

    #[test]
    fn last_string_swallows_the_rest() {
        let param = ParameterDescriptor::builder("reason", TypeTag::String).build().unwrap();
        let (value, left) = run(param, "spamming in general", true);
        assert_eq!(value.unwrap(), Value::Str("spamming in general".to_string()));
        assert_eq!(left, 0);
    }

    #[test]
    fn single_flag_takes_one_token() {
        let param = ParameterDescriptor::builder("word", TypeTag::String)
            .flags("single")
            .build()
            .unwrap();
        let (value, left) = run(param, "one two", true);
        assert_eq!(value.unwrap(), Value::Str("one".to_string()));
        assert_eq!(left, 1);
    }

    #[test]
    fn length_limits_count_characters() {
        let param = ParameterDescriptor::builder("name", TypeTag::String)
            .flags("maxlen=3")
            .build()
            .unwrap();
        let (value, _) = run(param, "héllo", true);
        assert!(matches!(
            value.unwrap_err().argument_kind(),
            Some(ArgumentErrorKind::TooLong { max: 3, actual: 5 })
        ));
    }

    #[test]
    fn split_flag_uses_delimiter() {
        let param = ParameterDescriptor::builder("items", TypeTag::StringArray)
            .flags("split=;")
            .build()
            .unwrap();
        let (value, _) = run(param, "apples; pears ;; plums", true);
        assert_eq!(
            value.unwrap(),
            Value::Strings(vec![
                "apples".to_string(),
                "pears".to_string(),
                "plums".to_string()
            ])
        );
    }

    #[test]
    fn array_without_split_keeps_tokens() {
        let param = ParameterDescriptor::builder("items", TypeTag::StringArray)
            .build()
            .unwrap();
        let (value, _) = run(param, "a,b c", true);
        assert_eq!(
            value.unwrap(),
            Value::Strings(vec!["a,b".to_string(), "c".to_string()])
        );
    }
}
