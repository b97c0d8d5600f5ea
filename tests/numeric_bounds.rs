// Integer widths, float and decimal parsing, and declared bounds at their edges.

mod common;

use argot::declare::{CommandBuilder, TypeTag};
use argot::dispatch::handler_fn;
use argot::model::{AllowAll, Value};
use argot::resolve::conditions::build_default_conditions;
use argot::resolve::{build_default_registry, resolve, ArgumentInput, Resolution, ResolveEnv};
use argot::router::tokenize;
use argot::{to_error_source, ArgumentErrorKind, CommandError, ParameterBuilder};
use common::{guild_ctx, MemoryEntities};

fn resolve_one(param: ParameterBuilder, input: &str) -> Result<Value, CommandError> {
    let command = CommandBuilder::new("n")
        .param(param)
        .handler(handler_fn(|_call| async { Ok(()) }))
        .build()
        .expect("valid declaration");
    let entities = MemoryEntities::default();
    let resolvers = build_default_registry();
    let conditions = build_default_conditions();
    let env = ResolveEnv {
        resolvers: &resolvers,
        conditions: &conditions,
        entities: &entities,
        permissions: &AllowAll,
    };
    let tokens = ArgumentInput::Text {
        source: to_error_source(input),
        tokens: tokenize(input),
    };
    match resolve(&command, &guild_ctx(), tokens, &env)? {
        Resolution::Resolved(args) => Ok(args.get("value").cloned().unwrap_or(Value::Absent)),
        Resolution::ShowUsage => panic!("unexpected usage for input '{input}'"),
    }
}

fn typed(tag: TypeTag) -> ParameterBuilder {
    ParameterBuilder::new("value", tag)
}

fn kind_of(result: Result<Value, CommandError>) -> ArgumentErrorKind {
    result
        .expect_err("expected a failure")
        .argument_kind()
        .cloned()
        .expect("argument failure")
}

#[test]
fn every_integer_width_is_exact() {
    let widths: [(TypeTag, i128, i128); 4] = [
        (TypeTag::I8, i8::MIN as i128, i8::MAX as i128),
        (TypeTag::I16, i16::MIN as i128, i16::MAX as i128),
        (TypeTag::I32, i32::MIN as i128, i32::MAX as i128),
        (TypeTag::I64, i64::MIN as i128, i64::MAX as i128),
    ];
    for (tag, min, max) in widths {
        assert_eq!(
            resolve_one(typed(tag.clone()), &min.to_string()).ok().and_then(|v| v.as_i64()),
            Some(min as i64),
            "{tag} min"
        );
        assert_eq!(
            resolve_one(typed(tag.clone()), &max.to_string()).ok().and_then(|v| v.as_i64()),
            Some(max as i64),
            "{tag} max"
        );
        assert!(matches!(
            kind_of(resolve_one(typed(tag.clone()), &(min - 1).to_string())),
            ArgumentErrorKind::BelowMinimum { .. }
        ));
        assert!(matches!(
            kind_of(resolve_one(typed(tag.clone()), &(max + 1).to_string())),
            ArgumentErrorKind::AboveMaximum { .. }
        ));
    }
}

#[test]
fn declared_bounds_are_inclusive() {
    let bounded = || typed(TypeTag::I32).min_value(1.0).max_value(5.0);
    assert_eq!(resolve_one(bounded(), "1").ok().and_then(|v| v.as_i64()), Some(1));
    assert_eq!(resolve_one(bounded(), "5").ok().and_then(|v| v.as_i64()), Some(5));
    match kind_of(resolve_one(bounded(), "0")) {
        ArgumentErrorKind::BelowMinimum { input, min } => {
            assert_eq!(input, "0");
            assert_eq!(min, "1");
        }
        other => panic!("expected BelowMinimum, got {other:?}"),
    }
    assert!(matches!(
        kind_of(resolve_one(bounded(), "6")),
        ArgumentErrorKind::AboveMaximum { .. }
    ));
}

#[test]
fn bound_flags_override_annotations() {
    let param = typed(TypeTag::I64).min_value(1.0).flags("min=10");
    assert!(matches!(
        kind_of(resolve_one(param, "5")),
        ArgumentErrorKind::BelowMinimum { .. }
    ));
}

#[test]
fn bounds_never_widen_the_natural_range() {
    let param = typed(TypeTag::I8).max_value(1000.0);
    assert!(matches!(
        kind_of(resolve_one(param, "200")),
        ArgumentErrorKind::AboveMaximum { .. }
    ));
}

#[test]
fn garbage_is_not_a_number() {
    for input in ["abc", "1.5", "0x10", "NaN"] {
        assert!(
            matches!(
                kind_of(resolve_one(typed(TypeTag::I32), input)),
                ArgumentErrorKind::NotANumber { .. }
            ),
            "input {input}"
        );
    }
}

#[test]
fn floats_reject_non_finite_values() {
    assert_eq!(
        resolve_one(typed(TypeTag::F64), "2.5").ok().and_then(|v| v.as_f64()),
        Some(2.5)
    );
    for input in ["inf", "NaN"] {
        assert!(matches!(
            kind_of(resolve_one(typed(TypeTag::F64), input)),
            ArgumentErrorKind::NotANumber { .. }
        ));
    }
    assert!(matches!(
        kind_of(resolve_one(typed(TypeTag::F32), "1e39")),
        ArgumentErrorKind::AboveMaximum { .. }
    ));
}

#[test]
fn decimals_keep_their_digits() {
    match resolve_one(typed(TypeTag::Decimal), "12.3400") {
        Ok(Value::Decimal(d)) => assert_eq!(d.to_string(), "12.3400"),
        other => panic!("expected a decimal, got {other:?}"),
    }
    assert!(matches!(
        resolve_one(typed(TypeTag::Decimal), "1e3"),
        Ok(Value::Decimal(_))
    ));
}
