//! Emulations behind the infix and prefix operators.
//!
//! Operands are converted to numbers first (empty text counts as zero).
//! `+` falls back to string concatenation when an operand is non-numeric
//! text; the other arithmetic operators treat such operands as zero.
//! Comparisons fall back to case-insensitive text comparison.

use std::cmp::Ordering;

use tracing::{error, warn};
use xlmulator_common::{Number, Value, XlmError};

use super::utils::number_or_zero;
use crate::function::{Builtin, FnCaps, FunctionContext};
use crate::function_registry::FunctionRegistry;

const OP: FnCaps = FnCaps::PURE.union(FnCaps::OPERATOR);

pub const OPERATORS: &[Builtin] = &[
    Builtin::new("_plus", OP, 2, plus),
    Builtin::new("_minus", OP, 2, minus),
    Builtin::new("_times", OP, 2, times),
    Builtin::new("_divide", OP, 2, divide),
    Builtin::new("_power", OP, 2, power),
    Builtin::new("_concat", OP, 2, concat),
    Builtin::new("_less_than", OP, 2, less_than),
    Builtin::new("_less_or_equal", OP, 2, less_or_equal),
    Builtin::new("_greater_than", OP, 2, greater_than),
    Builtin::new("_greater_or_equal", OP, 2, greater_or_equal),
    Builtin::new("_equals", OP, 2, equals),
    Builtin::new("_not_equal", OP, 2, not_equal),
    Builtin::new("_unary_minus", OP, 1, unary_minus),
];

pub fn register_builtins(registry: &mut FunctionRegistry) {
    for op in OPERATORS {
        registry.register(std::sync::Arc::new(*op));
    }
}

/* ───────────────────────────── arithmetic ──────────────────────────── */

/// Numeric view used by arithmetic: empty text is zero, other text is not
/// a number.
fn numeric(v: &Value) -> Option<Number> {
    if v.is_empty_text() {
        Some(Number::Int(0))
    } else {
        v.to_number()
    }
}

fn arith(
    a: Number,
    b: Number,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Value {
    if let (Number::Int(x), Number::Int(y)) = (a, b) {
        if let Some(r) = int_op(x, y) {
            return Value::Int(r);
        }
    }
    Value::Float(float_op(a.as_f64(), b.as_f64()))
}

fn plus(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    match (numeric(&args[0]), numeric(&args[1])) {
        (Some(a), Some(b)) => Ok(arith(a, b, i64::checked_add, |x, y| x + y)),
        _ => Ok(Value::Text(format!("{}{}", args[0], args[1]))),
    }
}

fn minus(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    let a = number_or_zero("_minus", &args[0]);
    let b = number_or_zero("_minus", &args[1]);
    Ok(arith(a, b, i64::checked_sub, |x, y| x - y))
}

fn times(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    let a = number_or_zero("_times", &args[0]);
    let b = number_or_zero("_times", &args[1]);
    Ok(arith(a, b, i64::checked_mul, |x, y| x * y))
}

fn divide(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    let a = number_or_zero("_divide", &args[0]);
    let b = number_or_zero("_divide", &args[1]);
    if b.as_f64() == 0.0 {
        error!(
            category = "division_by_zero",
            dividend = %xlmulator_common::Value::from(a),
            "division by zero; substituting 0"
        );
        return Ok(Value::Int(0));
    }
    let exact = |x: i64, y: i64| {
        if x.checked_rem(y)? == 0 {
            x.checked_div(y)
        } else {
            None
        }
    };
    Ok(arith(a, b, exact, |x, y| x / y))
}

fn power(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    let a = number_or_zero("_power", &args[0]);
    let b = number_or_zero("_power", &args[1]);
    let int_pow = |x: i64, y: i64| u32::try_from(y).ok().and_then(|e| x.checked_pow(e));
    let out = arith(a, b, int_pow, f64::powf);
    if let Value::Float(f) = out {
        if !f.is_finite() {
            warn!(category = "conversion", base = %xlmulator_common::Value::from(a), "power result is not finite");
            return Ok(Value::from("#NUM!"));
        }
    }
    Ok(out)
}

fn unary_minus(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(match number_or_zero("_unary_minus", &args[0]) {
        Number::Int(i) => i
            .checked_neg()
            .map_or_else(|| Value::Float(-(i as f64)), Value::Int),
        Number::Float(f) => Value::Float(-f),
    })
}

fn concat(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(Value::Text(format!("{}{}", args[0], args[1])))
}

/* ───────────────────────────── comparison ──────────────────────────── */

pub(crate) fn compare(a: &Value, b: &Value) -> Ordering {
    if let (Some(x), Some(y)) = (a.to_number(), b.to_number()) {
        return match (x, y) {
            (Number::Int(x), Number::Int(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        };
    }
    warn!(
        category = "conversion",
        left = %a,
        right = %b,
        "non-numeric comparison operand; comparing as text"
    );
    a.to_string()
        .to_lowercase()
        .cmp(&b.to_string().to_lowercase())
}

fn less_than(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(Value::Bool(compare(&args[0], &args[1]).is_lt()))
}

fn less_or_equal(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(Value::Bool(compare(&args[0], &args[1]).is_le()))
}

fn greater_than(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(Value::Bool(compare(&args[0], &args[1]).is_gt()))
}

fn greater_or_equal(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(Value::Bool(compare(&args[0], &args[1]).is_ge()))
}

fn equals(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(Value::Bool(compare(&args[0], &args[1]).is_eq()))
}

fn not_equal(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(Value::Bool(compare(&args[0], &args[1]).is_ne()))
}
