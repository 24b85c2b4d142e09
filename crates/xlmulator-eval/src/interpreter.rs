//! Recursive evaluation of postfix formula stacks against a live sheet.
//!
//! Evaluation mirrors rendering: pop the top item; a literal is its own
//! value, a cell reference evaluates the referenced cell, and an item with
//! an arity pops that many operands (each evaluated recursively), restores
//! call order and dispatches to the function registry.
//!
//! Cells currently being evaluated sit on a visitation stack. A reference
//! back into that stack is a cycle: it is severed and reads as the empty
//! value. References to cells that do not exist read as empty too. Both are
//! logged. Structural problems (operand underflow, unknown functions,
//! nesting beyond the depth ceiling) abort the cell being evaluated. A
//! referenced cell that aborts reads as empty for its readers and is
//! remembered, so its formula is dispatched at most once.
//!
//! Chains of binary operators (`CHAR(..)&CHAR(..)&...`) are walked along
//! their left spine iteratively. Depth grows with real nesting only, not
//! with the length of a chain.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::{debug, warn};
use xlmulator_common::{CellCoord, Value, XlmError};
use xlmulator_parse::{CellRef, Formula, StackCursor, StackItem};

use crate::engine::EvalConfig;
use crate::function::FunctionContext;
use crate::function_registry::FunctionRegistry;
use crate::sheet::{Cell, Sheet};

/// Cells whose evaluation aborted, with the formula stack that failed.
pub type FailedCells = FxHashMap<CellCoord, (Arc<[StackItem]>, XlmError)>;

pub struct Interpreter<'a> {
    sheet: &'a mut Sheet,
    registry: &'a FunctionRegistry,
    max_depth: usize,
    visiting: Vec<CellCoord>,
    depth: usize,
    failed: FailedCells,
}

impl<'a> Interpreter<'a> {
    pub fn new(sheet: &'a mut Sheet, registry: &'a FunctionRegistry, config: &EvalConfig) -> Self {
        Self {
            sheet,
            registry,
            max_depth: config.max_depth,
            visiting: Vec::new(),
            depth: 0,
            failed: FailedCells::default(),
        }
    }

    /// Start from failures recorded by an earlier interpreter in the same pass.
    pub fn with_failures(mut self, failed: FailedCells) -> Self {
        self.failed = failed;
        self
    }

    pub fn into_failures(self) -> FailedCells {
        self.failed
    }

    pub fn sheet(&self) -> &Sheet {
        self.sheet
    }

    /// Resolve a cell. Literals and already-evaluated formulas return their
    /// value; other formulas are evaluated and the result cached on the cell.
    ///
    /// Returns `CellNotFound` for an absent cell and `CycleDetected` if the
    /// cell is already being evaluated further up. A formula that already
    /// failed returns its recorded error without being dispatched again.
    pub fn evaluate_cell(&mut self, coord: CellCoord) -> Result<Value, XlmError> {
        let stack = match self.sheet.get(coord)? {
            Cell::Value(v) => return Ok(v.clone()),
            Cell::Formula(f) => match f.value() {
                Some(v) => return Ok(v.clone()),
                None => f.shared_stack(),
            },
        };
        if let Some((failed_stack, error)) = self.failed.get(&coord) {
            if Arc::ptr_eq(failed_stack, &stack) {
                return Err(error.clone());
            }
        }
        if self.visiting.contains(&coord) {
            return Err(XlmError::CycleDetected(coord));
        }

        self.visiting.push(coord);
        let result = self.evaluate_stack(&stack, Some(coord));
        self.visiting.pop();
        let value = match result {
            Ok(value) => value,
            // The depth ceiling depends on the caller's nesting, not only on
            // this cell, so it is never remembered.
            Err(error @ XlmError::DepthExceeded(_)) => return Err(error),
            Err(error) => {
                self.failed.insert(coord, (stack, error.clone()));
                return Err(error);
            }
        };

        // The formula may have rewritten its own cell; only cache onto the
        // formula that was actually evaluated.
        if self
            .sheet
            .get_formula(coord)
            .is_some_and(|f| f.same_stack(&stack))
        {
            self.sheet.cache_formula_value(coord, value.clone());
        }
        Ok(value)
    }

    /// Evaluate a formula that is not (necessarily) stored in the sheet.
    /// Nothing is cached.
    pub fn evaluate_formula(&mut self, formula: &Formula) -> Result<Value, XlmError> {
        self.evaluate_stack(formula.stack(), formula.coord())
    }

    fn evaluate_stack(
        &mut self,
        stack: &[StackItem],
        owner: Option<CellCoord>,
    ) -> Result<Value, XlmError> {
        let mut cursor = StackCursor::new(stack);
        if cursor.is_exhausted() {
            return Ok(Value::empty());
        }
        let value = self.eval_top(&mut cursor, owner)?;
        if !cursor.is_exhausted() {
            debug!(
                cell = ?owner,
                leftover = cursor.remaining(),
                "ignoring operands left below the result"
            );
        }
        Ok(value)
    }

    fn eval_top(
        &mut self,
        cursor: &mut StackCursor<'_>,
        owner: Option<CellCoord>,
    ) -> Result<Value, XlmError> {
        self.depth += 1;
        let result = self.eval_item(cursor, owner);
        self.depth -= 1;
        result
    }

    fn eval_item(
        &mut self,
        cursor: &mut StackCursor<'_>,
        owner: Option<CellCoord>,
    ) -> Result<Value, XlmError> {
        if self.depth > self.max_depth {
            return Err(XlmError::DepthExceeded(self.max_depth));
        }
        let Some(item) = cursor.pop() else {
            return Err(XlmError::Arity {
                function: "<formula>".into(),
                expected: 1,
                found: 0,
            });
        };
        match (item, item.arity(), item.function_name()) {
            (StackItem::Operator(_), _, Some(name)) => self.eval_operator_chain(name, cursor, owner),
            (_, Some(arity), Some(name)) => self.eval_call(name, usize::from(arity), cursor, owner),
            _ => self.eval_leaf(item, owner),
        }
    }

    /// Evaluate a binary operator whose left operand may itself be a binary
    /// operator, and so on down the chain.
    ///
    /// Right operands are evaluated first, outermost to innermost, then the
    /// leftmost operand; the operators are then applied innermost first. This
    /// is the order plain recursion would produce.
    fn eval_operator_chain(
        &mut self,
        outer: &str,
        cursor: &mut StackCursor<'_>,
        owner: Option<CellCoord>,
    ) -> Result<Value, XlmError> {
        let mut pending: SmallVec<[(&str, Value); 8]> = SmallVec::new();
        let mut name = outer;
        loop {
            let right = self.eval_operand(name, 0, cursor, owner)?;
            pending.push((name, right));
            match cursor.peek() {
                Some(StackItem::Operator(op)) => {
                    cursor.pop();
                    name = op.function_name();
                }
                _ => break,
            }
        }

        let mut acc = self.eval_operand(name, 1, cursor, owner)?;
        while let Some((name, right)) = pending.pop() {
            let mut ctx = FunctionContext::new(&mut *self.sheet, owner);
            acc = self.registry.dispatch(name, &[acc, right], &mut ctx)?;
        }
        Ok(acc)
    }

    /// One operand of a binary operator; `found` is how many were already
    /// popped, for the underflow report.
    fn eval_operand(
        &mut self,
        name: &str,
        found: usize,
        cursor: &mut StackCursor<'_>,
        owner: Option<CellCoord>,
    ) -> Result<Value, XlmError> {
        if cursor.is_exhausted() {
            warn!(category = "arity", function = %name, expected = 2, found, "operand underflow");
            return Err(XlmError::Arity {
                function: name.to_string(),
                expected: 2,
                found,
            });
        }
        self.eval_top(cursor, owner)
    }

    fn eval_leaf(&mut self, item: &StackItem, owner: Option<CellCoord>) -> Result<Value, XlmError> {
        if let StackItem::CellRef(r) = item {
            return self.read_reference(r, owner);
        }
        if let Some(v) = item.literal() {
            return Ok(v);
        }
        debug!(item = ?item, "placeholder evaluates to empty");
        Ok(Value::empty())
    }

    fn read_reference(&mut self, r: &CellRef, owner: Option<CellCoord>) -> Result<Value, XlmError> {
        let Some(target) = r.resolve(owner) else {
            warn!(
                category = "cell_not_found",
                reference = %r.render(owner),
                "reference does not resolve to a cell; substituting empty"
            );
            return Ok(Value::empty());
        };
        match self.evaluate_cell(target) {
            Ok(value) => Ok(value),
            Err(XlmError::CellNotFound(c)) => {
                warn!(category = "cell_not_found", cell = %c, "referenced cell missing; substituting empty");
                Ok(Value::empty())
            }
            Err(XlmError::CycleDetected(c)) => {
                warn!(category = "cycle_detected", cell = %c, "reference cycle severed; substituting empty");
                Ok(Value::empty())
            }
            Err(error @ XlmError::DepthExceeded(_)) => Err(error),
            Err(error) => {
                // The failure belongs to the referenced cell; its readers go on.
                warn!(
                    category = error.category(),
                    cell = %target,
                    error = %error,
                    "referenced cell failed; substituting empty"
                );
                Ok(Value::empty())
            }
        }
    }

    fn eval_call(
        &mut self,
        name: &str,
        arity: usize,
        cursor: &mut StackCursor<'_>,
        owner: Option<CellCoord>,
    ) -> Result<Value, XlmError> {
        let label_at = destination_position(name, arity);
        let mut args: SmallVec<[Value; 4]> = SmallVec::with_capacity(arity);

        for popped in 0..arity {
            if cursor.is_exhausted() {
                warn!(category = "arity", function = %name, expected = arity, found = popped, "operand underflow");
                return Err(XlmError::Arity {
                    function: name.to_string(),
                    expected: arity,
                    found: popped,
                });
            }
            // Operands come off the stack right to left.
            let position = arity - 1 - popped;
            let value = match cursor.peek() {
                Some(StackItem::CellRef(r)) if label_at == Some(position) => {
                    cursor.pop();
                    destination_label(r, owner)?
                }
                _ => self.eval_top(cursor, owner)?,
            };
            args.push(value);
        }
        args.reverse();

        let mut ctx = FunctionContext::new(&mut *self.sheet, owner);
        self.registry.dispatch(name, &args, &mut ctx)
    }
}

/// Argument position holding a destination that must be passed as label
/// text rather than read: the second argument of a two-argument FORMULA and
/// the first argument of SET.VALUE.
fn destination_position(name: &str, arity: usize) -> Option<usize> {
    match name {
        "FORMULA" | "FORMULA.FILL" if arity >= 2 => Some(1),
        "SET.VALUE" if arity >= 1 => Some(0),
        _ => None,
    }
}

fn destination_label(r: &CellRef, owner: Option<CellCoord>) -> Result<Value, XlmError> {
    r.resolve(owner)
        .map(|c| Value::Text(c.label()))
        .ok_or_else(|| XlmError::InvalidReference(r.render(owner)))
}
