//! Usage-style signature parsing.
//!
//! `<name:type>` is required, `[name:type]` optional, `=value` supplies a default and a trailing
//! `...` marks the variadic tail. The type defaults to `string`.

use pest::{iterators::Pair, Parser};
use pest_derive::Parser;

use crate::declare::{ParameterBuilder, TypeTag};
use crate::diagnostics::Violation;

#[derive(Parser)]
#[grammar = "declare/signature.pest"]
struct SignatureParser;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parses a signature into parameter builders in declaration order.
pub fn parse_signature(signature: &str) -> Result<Vec<ParameterBuilder>, Violation> {
    if signature.trim().is_empty() {
        return Ok(Vec::new());
    }

    let pairs = SignatureParser::parse(Rule::signature, signature).map_err(|e| {
        Violation::InvalidDeclaration {
            message: format!("invalid signature '{signature}': {e}"),
        }
    })?;

    let mut params = Vec::new();
    for pair in pairs.flatten().filter(|p| p.as_rule() == Rule::parameter) {
        params.push(build_parameter(pair, signature)?);
    }
    Ok(params)
}

// ============================================================================
// BUILDERS
// ============================================================================

fn build_parameter(pair: Pair<Rule>, signature: &str) -> Result<ParameterBuilder, Violation> {
    let Some(inner) = pair.into_inner().next() else {
        return Err(malformed(signature));
    };
    let optional = inner.as_rule() == Rule::optional;
    let Some(body) = inner.into_inner().next() else {
        return Err(malformed(signature));
    };

    let mut name = None;
    let mut type_tag = TypeTag::String;
    let mut default = None;
    let mut variadic = false;

    for part in body.into_inner() {
        match part.as_rule() {
            Rule::name => name = Some(part.as_str().to_string()),
            Rule::type_name => type_tag = TypeTag::from_keyword(part.as_str()),
            Rule::default => {
                default = part
                    .into_inner()
                    .next()
                    .map(|v| v.as_str().trim().to_string());
            }
            Rule::variadic => variadic = true,
            _ => {}
        }
    }

    let Some(name) = name else {
        return Err(malformed(signature));
    };

    if variadic {
        type_tag = match type_tag {
            TypeTag::String | TypeTag::StringArray => TypeTag::StringArray,
            other => {
                return Err(Violation::InvalidDeclaration {
                    message: format!("'{name}' of type '{other}' cannot be variadic"),
                })
            }
        };
    }

    let mut builder = ParameterBuilder::new(name, type_tag);
    if optional {
        builder = builder.optional();
    }
    if let Some(default) = default {
        builder = builder.default_value(default);
    }
    Ok(builder)
}

fn malformed(signature: &str) -> Violation {
    Violation::InvalidDeclaration {
        message: format!("invalid signature '{signature}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(signature: &str) -> Vec<crate::declare::ParameterDescriptor> {
        parse_signature(signature)
            .unwrap()
            .into_iter()
            .map(|p| p.build().unwrap())
            .collect()
    }

    #[test]
    fn parses_required_optional_and_variadic() {
        let params = build("<member:member> <role:role> [reason...]");
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].type_tag(), &TypeTag::Member);
        assert!(params[0].requires_input());
        assert_eq!(params[1].type_tag(), &TypeTag::Role);
        assert_eq!(params[2].name(), "reason");
        assert_eq!(params[2].type_tag(), &TypeTag::StringArray);
        assert!(params[2].is_optional());
    }

    #[test]
    fn default_value_is_captured() {
        let params = build("<amount:int=1> [unit = kg]");
        assert_eq!(params[0].default_value(), Some("1"));
        assert!(!params[0].requires_input());
        assert_eq!(params[1].default_value(), Some("kg"));
    }

    #[test]
    fn untyped_parameter_is_string() {
        let params = build("<text>");
        assert_eq!(params[0].type_tag(), &TypeTag::String);
    }

    #[test]
    fn unknown_type_becomes_named() {
        let params = build("<colour:Colour>");
        assert_eq!(params[0].type_tag(), &TypeTag::Named("Colour".to_string()));
    }

    #[test]
    fn empty_signature_declares_nothing() {
        assert!(parse_signature("   ").unwrap().is_empty());
    }

    #[test]
    fn rejects_unbalanced_brackets() {
        assert!(matches!(
            parse_signature("<member:member"),
            Err(Violation::InvalidDeclaration { .. })
        ));
    }

    #[test]
    fn rejects_variadic_numbers() {
        let err = parse_signature("<values:int...>").unwrap_err();
        assert!(err.to_string().contains("cannot be variadic"));
    }
}
