use std::sync::Arc;

use xlmulator_common::{Value, XlmError};

use super::utils::is_error_text;
use crate::function::{Builtin, FunctionContext};
use crate::function_registry::FunctionRegistry;

pub const LOGICAL_FUNCTIONS: &[Builtin] = &[
    Builtin::pure("AND", 1, and_fn),
    Builtin::pure("OR", 1, or_fn),
    Builtin::pure("NOT", 1, not_fn),
    Builtin::pure("IF", 2, if_fn),
    Builtin::pure("TRUE", 0, true_fn),
    Builtin::pure("FALSE", 0, false_fn),
    Builtin::pure("ISNUMBER", 1, isnumber_fn),
    Builtin::pure("ISTEXT", 1, istext_fn),
    Builtin::pure("ISERROR", 1, iserror_fn),
    Builtin::pure("ISBLANK", 1, isblank_fn),
];

pub fn register_builtins(registry: &mut FunctionRegistry) {
    for f in LOGICAL_FUNCTIONS {
        registry.register(Arc::new(*f));
    }
}

fn and_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(Value::Bool(args.iter().all(Value::is_truthy)))
}

fn or_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(Value::Bool(args.iter().any(Value::is_truthy)))
}

fn not_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(Value::Bool(!args[0].is_truthy()))
}

/// Both branches have already been evaluated; IF only selects one. An
/// absent else-branch yields FALSE.
fn if_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    let branch = if args[0].is_truthy() { 1 } else { 2 };
    Ok(args
        .get(branch)
        .cloned()
        .unwrap_or(Value::Bool(false)))
}

fn true_fn(_: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(Value::Bool(true))
}

fn false_fn(_: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(Value::Bool(false))
}

fn isnumber_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(Value::Bool(matches!(args[0], Value::Int(_) | Value::Float(_))))
}

fn istext_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    let v = &args[0];
    Ok(Value::Bool(
        matches!(v, Value::Text(_)) && !v.is_empty_text() && !is_error_text(v),
    ))
}

fn iserror_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(Value::Bool(is_error_text(&args[0])))
}

fn isblank_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(Value::Bool(args[0].is_empty_text()))
}
