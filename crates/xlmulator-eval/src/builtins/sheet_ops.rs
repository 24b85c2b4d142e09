//! `FORMULA`, `FORMULA.FILL` and `SET.VALUE`: the functions that write back
//! into the sheet being evaluated.
//!
//! The interpreter hands these their destination as `$R<row>$C<col>` label
//! text instead of dereferencing it.

use tracing::{debug, warn};
use xlmulator_common::{CellCoord, Value, XlmError};
use xlmulator_parse::Formula;

use crate::function::{FnCaps, Function, FunctionContext};

fn destination(label: &Value) -> Result<CellCoord, XlmError> {
    let text = label.to_string();
    CellCoord::parse_label(&text).ok_or(XlmError::InvalidReference(text))
}

/// `FORMULA(content, dest)` and `FORMULA.FILL(content, dest)`.
///
/// Text starting with `=` is parsed and stored as a formula owned by `dest`;
/// any other value is stored as a literal.
#[derive(Debug, Clone, Copy)]
pub struct FormulaFn {
    name: &'static str,
}

impl FormulaFn {
    pub const FORMULA: FormulaFn = FormulaFn { name: "FORMULA" };
    pub const FORMULA_FILL: FormulaFn = FormulaFn {
        name: "FORMULA.FILL",
    };
}

impl Function for FormulaFn {
    fn caps(&self) -> FnCaps {
        FnCaps::WRITES_SHEET
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn min_args(&self) -> usize {
        1
    }

    fn eval(&self, args: &[Value], ctx: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
        let Some(dest) = args.get(1) else {
            warn!(
                function = self.name,
                caller = ?ctx.caller,
                "active-cell destination is not modeled; nothing written"
            );
            return Ok(Value::Bool(true));
        };
        let dest = destination(dest)?;
        match &args[0] {
            Value::Text(text) if text.starts_with('=') => {
                let formula = Formula::from_text(text, Some(dest));
                let is_new = ctx.sheet.set_formula(dest, formula);
                debug!(function = self.name, dest = %dest, is_new, "formula written");
            }
            value => {
                debug!(function = self.name, dest = %dest, value = %value, "value written");
                ctx.sheet.set_value(dest, value.clone());
            }
        }
        Ok(Value::Bool(true))
    }
}

/// `SET.VALUE(dest, value)`: sets the resolved value of `dest` without
/// touching a formula stored there.
#[derive(Debug, Clone, Copy)]
pub struct SetValueFn;

impl Function for SetValueFn {
    fn caps(&self) -> FnCaps {
        FnCaps::WRITES_SHEET
    }

    fn name(&self) -> &'static str {
        "SET.VALUE"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn eval(&self, args: &[Value], ctx: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
        let dest = destination(&args[0])?;
        debug!(dest = %dest, value = %args[1], "SET.VALUE");
        ctx.sheet.set_resolved(dest, args[1].clone());
        Ok(Value::Bool(true))
    }
}
