//! Functions with no effect worth modeling. Each returns its own name as a
//! placeholder tag so the dump still shows that it ran.

use std::sync::Arc;

use xlmulator_common::{CellCoord, Value, XlmError};

use crate::function::{Builtin, FnCaps, Function, FunctionContext};
use crate::function_registry::FunctionRegistry;

#[derive(Debug, Clone, Copy)]
pub struct StubFn {
    name: &'static str,
}

impl Function for StubFn {
    fn caps(&self) -> FnCaps {
        FnCaps::STUB
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn eval(&self, _: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
        Ok(Value::from(self.name))
    }
}

pub const STUB_NAMES: &[&str] = &[
    "RUN",
    "GOTO",
    "RETURN",
    "WHILE",
    "NEXT",
    "ECHO",
    "APP.MAXIMIZE",
    "APP.MINIMIZE",
    "WINDOW.HIDE",
    "WORKBOOK.HIDE",
    "WORKBOOK.UNHIDE",
    "ACTIVATE",
    "SELECT",
    "ERROR",
    "GET.CELL",
    "GET.WINDOW",
    "GET.DOCUMENT",
    "ON.TIME",
    "WAIT",
    "NOW",
    "DAY",
];

pub const POSITION_FUNCTIONS: &[Builtin] = &[
    Builtin::pure("ROW", 0, row_fn),
    Builtin::pure("COLUMN", 0, column_fn),
];

pub fn register_builtins(registry: &mut FunctionRegistry) {
    for &name in STUB_NAMES {
        registry.register(Arc::new(StubFn { name }));
    }
    for f in POSITION_FUNCTIONS {
        registry.register(Arc::new(*f));
    }
}

/// Cell a position function asks about: a label argument when one is
/// given, the calling cell otherwise.
fn target(args: &[Value], ctx: &FunctionContext<'_>) -> Option<CellCoord> {
    args.first()
        .and_then(Value::as_text)
        .and_then(CellCoord::parse_label)
        .or(ctx.caller)
}

fn row_fn(args: &[Value], ctx: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(target(args, ctx).map_or_else(
        super::utils::value_error,
        |c| Value::Int(i64::from(c.row)),
    ))
}

fn column_fn(args: &[Value], ctx: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(target(args, ctx).map_or_else(
        super::utils::value_error,
        |c| Value::Int(i64::from(c.col)),
    ))
}
