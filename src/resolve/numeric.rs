//! Numeric resolvers.
//!
//! Integers are parsed into `i128` and checked in the integer domain, so the natural range of
//! every width is exact (`i16` accepts `-32768..=32767`, nothing more). The `min`/`max` flags
//! (or the `min_value`/`max_value` annotations) tighten that range; they never widen it.
//! Floats reject non-finite input. `Number` resolves to `F64`.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::declare::TypeTag;
use crate::diagnostics::{ArgumentErrorKind, CommandError};
use crate::model::Value;
use crate::resolve::{InputValue, OptionValue, ResolutionContext, ResolverKind, ResolverRegistry};
use crate::err_msg;

pub fn register_numeric_resolvers(registry: &mut ResolverRegistry) {
    for tag in [TypeTag::I8, TypeTag::I16, TypeTag::I32, TypeTag::I64] {
        registry.register(tag, ResolverKind::InputConsuming, resolve_integer);
    }
    for tag in [TypeTag::F32, TypeTag::F64, TypeTag::Number] {
        registry.register(tag, ResolverKind::InputConsuming, resolve_float);
    }
    registry.register(TypeTag::Decimal, ResolverKind::InputConsuming, resolve_decimal);
}

// ============================================================================
// INTEGERS
// ============================================================================

fn integer_range(tag: &TypeTag) -> (i128, i128) {
    match tag {
        TypeTag::I8 => (i8::MIN.into(), i8::MAX.into()),
        TypeTag::I16 => (i16::MIN.into(), i16::MAX.into()),
        TypeTag::I32 => (i32::MIN.into(), i32::MAX.into()),
        _ => (i64::MIN.into(), i64::MAX.into()),
    }
}

pub fn resolve_integer(ctx: &mut ResolutionContext<'_>) -> Result<Value, CommandError> {
    let Some(input) = ctx.pop() else {
        return Ok(Value::Absent);
    };
    let text = input.text().into_owned();
    let raw: i128 = match &input {
        InputValue::Typed(OptionValue::Integer(i)) => i128::from(*i),
        InputValue::Typed(OptionValue::Number(n)) if n.is_finite() && n.fract() == 0.0 => *n as i128,
        _ => text
            .trim()
            .parse::<i128>()
            .map_err(|_| ctx.fail(ArgumentErrorKind::NotANumber { input: text.clone() }))?,
    };

    let tag = ctx.param.type_tag();
    let (natural_min, natural_max) = integer_range(tag);
    let min = ctx
        .param
        .min_bound()
        .map_or(natural_min, |m| m.ceil().max(natural_min));
    let max = ctx
        .param
        .max_bound()
        .map_or(natural_max, |m| m.floor().min(natural_max));

    if raw < min {
        return Err(ctx.fail(ArgumentErrorKind::BelowMinimum {
            input: text,
            min: min.to_string(),
        }));
    }
    if raw > max {
        return Err(ctx.fail(ArgumentErrorKind::AboveMaximum {
            input: text,
            max: max.to_string(),
        }));
    }

    let value = match tag {
        TypeTag::I8 => i8::try_from(raw).ok().map(Value::I8),
        TypeTag::I16 => i16::try_from(raw).ok().map(Value::I16),
        TypeTag::I32 => i32::try_from(raw).ok().map(Value::I32),
        _ => i64::try_from(raw).ok().map(Value::I64),
    };
    value.ok_or_else(|| err_msg!(Internal, "{} escaped the range of {}", raw, tag))
}

// ============================================================================
// FLOATS
// ============================================================================

fn float_range(tag: &TypeTag) -> (f64, f64) {
    match tag {
        TypeTag::F32 => (f64::from(f32::MIN), f64::from(f32::MAX)),
        _ => (f64::MIN, f64::MAX),
    }
}

pub fn resolve_float(ctx: &mut ResolutionContext<'_>) -> Result<Value, CommandError> {
    let Some(input) = ctx.pop() else {
        return Ok(Value::Absent);
    };
    let text = input.text().into_owned();
    let raw = match &input {
        InputValue::Typed(OptionValue::Number(n)) => Some(*n),
        InputValue::Typed(OptionValue::Integer(i)) => Some(*i as f64),
        _ => text.trim().parse::<f64>().ok(),
    };
    let raw = match raw {
        Some(v) if v.is_finite() => v,
        _ => return Err(ctx.fail(ArgumentErrorKind::NotANumber { input: text })),
    };

    let tag = ctx.param.type_tag();
    let (natural_min, natural_max) = float_range(tag);
    let min = ctx
        .param
        .min_bound()
        .map_or(natural_min, |m| m.as_f64().max(natural_min));
    let max = ctx
        .param
        .max_bound()
        .map_or(natural_max, |m| m.as_f64().min(natural_max));

    if raw < min {
        return Err(ctx.fail(ArgumentErrorKind::BelowMinimum {
            input: text,
            min: min.to_string(),
        }));
    }
    if raw > max {
        return Err(ctx.fail(ArgumentErrorKind::AboveMaximum {
            input: text,
            max: max.to_string(),
        }));
    }

    Ok(match tag {
        TypeTag::F32 => Value::F32(raw as f32),
        _ => Value::F64(raw),
    })
}

// ============================================================================
// DECIMALS
// ============================================================================

fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

pub fn resolve_decimal(ctx: &mut ResolutionContext<'_>) -> Result<Value, CommandError> {
    let Some(input) = ctx.pop() else {
        return Ok(Value::Absent);
    };
    let text = input.text().into_owned();
    let raw = match &input {
        InputValue::Typed(OptionValue::Integer(i)) => Some(Decimal::from(*i)),
        InputValue::Typed(OptionValue::Number(n)) => Decimal::try_from(*n).ok(),
        _ => parse_decimal(&text),
    };
    let Some(raw) = raw else {
        return Err(ctx.fail(ArgumentErrorKind::NotANumber { input: text }));
    };

    if let Some(min) = ctx.param.min_bound().and_then(|m| m.as_decimal()) {
        if raw < min {
            return Err(ctx.fail(ArgumentErrorKind::BelowMinimum {
                input: text,
                min: min.normalize().to_string(),
            }));
        }
    }
    if let Some(max) = ctx.param.max_bound().and_then(|m| m.as_decimal()) {
        if raw > max {
            return Err(ctx.fail(ArgumentErrorKind::AboveMaximum {
                input: text,
                max: max.normalize().to_string(),
            }));
        }
    }
    Ok(Value::Decimal(raw))
}
