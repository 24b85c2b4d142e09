use std::sync::Arc;

use tracing::{debug, error};
use xlmulator_common::{Number, Value, XlmError};

use super::utils::{int_arg, number_or_zero, round_to_precision};
use crate::function::{Builtin, FunctionContext};
use crate::function_registry::FunctionRegistry;

pub const MATH_FUNCTIONS: &[Builtin] = &[
    Builtin::pure("ABS", 1, abs_fn),
    Builtin::pure("INT", 1, int_fn),
    Builtin::pure("MOD", 2, mod_fn),
    Builtin::pure("ROUND", 1, round_fn),
    Builtin::pure("SUM", 0, sum_fn),
    Builtin::pure("PRODUCT", 0, product_fn),
];

pub fn register_builtins(registry: &mut FunctionRegistry) {
    for f in MATH_FUNCTIONS {
        registry.register(Arc::new(*f));
    }
}

/// Collapse a float that holds a whole number back to an integer.
fn normalize(f: f64) -> Value {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
        Value::Int(f as i64)
    } else {
        Value::Float(f)
    }
}

fn abs_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(match number_or_zero("ABS", &args[0]) {
        Number::Int(i) => i
            .checked_abs()
            .map_or_else(|| Value::Float((i as f64).abs()), Value::Int),
        Number::Float(f) => Value::Float(f.abs()),
    })
}

fn int_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(match number_or_zero("INT", &args[0]) {
        Number::Int(i) => Value::Int(i),
        Number::Float(f) => normalize(f.floor()),
    })
}

/// Excel MOD: the result takes the sign of the divisor.
fn mod_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    let n = number_or_zero("MOD", &args[0]);
    let d = number_or_zero("MOD", &args[1]);
    if d.as_f64() == 0.0 {
        error!(category = "division_by_zero", function = "MOD", "MOD by zero; substituting 0");
        return Ok(Value::Int(0));
    }
    if let (Number::Int(n), Number::Int(d)) = (n, d) {
        if let Some(r) = n.checked_rem(d) {
            let r = if r != 0 && (r < 0) != (d < 0) { r + d } else { r };
            return Ok(Value::Int(r));
        }
    }
    let (n, d) = (n.as_f64(), d.as_f64());
    Ok(normalize(n - d * (n / d).floor()))
}

fn round_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    let n = number_or_zero("ROUND", &args[0]);
    let digits = int_arg("ROUND", args, 1, 0).clamp(-15, 15) as i32;
    Ok(match n {
        Number::Int(i) if digits >= 0 => Value::Int(i),
        other => normalize(round_to_precision(other.as_f64(), digits)),
    })
}

/// Numeric arguments only; text that does not convert is skipped.
fn numbers(function: &str, args: &[Value]) -> Vec<Number> {
    args.iter()
        .filter_map(|v| {
            let n = v.to_number();
            if n.is_none() && !v.is_empty_text() {
                debug!(function = %function, value = %v, "skipping non-numeric argument");
            }
            n
        })
        .collect()
}

fn sum_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    let mut int_total: Option<i64> = Some(0);
    let mut float_total = 0.0;
    for n in numbers("SUM", args) {
        float_total += n.as_f64();
        int_total = match (int_total, n) {
            (Some(t), Number::Int(i)) => t.checked_add(i),
            _ => None,
        };
    }
    Ok(int_total.map_or_else(|| Value::Float(float_total), Value::Int))
}

fn product_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    let nums = numbers("PRODUCT", args);
    if nums.is_empty() {
        return Ok(Value::Int(0));
    }
    let mut int_total: Option<i64> = Some(1);
    let mut float_total = 1.0;
    for n in nums {
        float_total *= n.as_f64();
        int_total = match (int_total, n) {
            (Some(t), Number::Int(i)) => t.checked_mul(i),
            _ => None,
        };
    }
    Ok(int_total.map_or_else(|| Value::Float(float_total), Value::Int))
}
