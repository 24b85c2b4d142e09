//! A parsed formula: the postfix stack plus the cell that owns it.
//!
//! Rendering walks the stack from the top, the same way evaluation does, and
//! rebuilds infix text. The rendered text ("gloss") is cached on first use;
//! the stack is immutable once the formula is built, so the cache never goes
//! stale. Relocating a formula produces a fresh one with an empty cache.
//!
//! Binary operator chains are rendered along their left spine without
//! recursing, so only real nesting counts against [`MAX_RENDER_DEPTH`].

use std::sync::Arc;

use once_cell::unsync::OnceCell;
use xlmulator_common::{CellCoord, Value, XlmError};

use crate::parser::parse_formula_lenient;
use crate::stack_item::{Operator, StackCursor, StackItem};

/// Nesting ceiling for the renderer. Deeper stacks are reported, not walked.
pub const MAX_RENDER_DEPTH: usize = 1024;

#[derive(Debug, Clone)]
pub struct Formula {
    coord: Option<CellCoord>,
    stack: Arc<[StackItem]>,
    gloss: OnceCell<String>,
    value: Option<Value>,
}

impl Formula {
    pub fn new(stack: Vec<StackItem>) -> Self {
        Self {
            coord: None,
            stack: stack.into(),
            gloss: OnceCell::new(),
            value: None,
        }
    }

    pub fn with_coord(stack: Vec<StackItem>, coord: CellCoord) -> Self {
        let mut f = Self::new(stack);
        f.coord = Some(coord);
        f
    }

    /// Parse formula text (leading `=` optional). Text that does not parse
    /// becomes a single string literal.
    pub fn from_text(text: &str, coord: Option<CellCoord>) -> Self {
        let mut f = Self::new(parse_formula_lenient(text));
        f.coord = coord;
        f
    }

    pub fn coord(&self) -> Option<CellCoord> {
        self.coord
    }

    pub fn stack(&self) -> &[StackItem] {
        &self.stack
    }

    /// Cheap handle on the stack for evaluators that must not borrow the
    /// formula while the sheet is mutated.
    pub fn shared_stack(&self) -> Arc<[StackItem]> {
        Arc::clone(&self.stack)
    }

    /// True if `stack` is this formula's own stack (not merely equal to it).
    pub fn same_stack(&self, stack: &Arc<[StackItem]>) -> bool {
        Arc::ptr_eq(&self.stack, stack)
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn set_value(&mut self, value: Value) {
        self.value = Some(value);
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// True iff the top stack item consumes at least one operand.
    pub fn is_call(&self) -> bool {
        StackCursor::new(&self.stack)
            .peek()
            .is_some_and(StackItem::is_function)
    }

    /// Name of the function at the top of the stack, if any.
    pub fn top_function(&self) -> Option<&str> {
        StackCursor::new(&self.stack)
            .peek()
            .and_then(StackItem::function_name)
    }

    /// Infix rendering of the whole stack, computed once.
    pub fn render(&self) -> Result<&str, XlmError> {
        self.gloss
            .get_or_try_init(|| render_stack(&self.stack, self.coord))
            .map(String::as_str)
    }

    /// The cached rendering, if [`Formula::render`] has already succeeded.
    pub fn gloss(&self) -> Option<&str> {
        self.gloss.get().map(String::as_str)
    }

    /// Copy of this formula owned by `coord`. Attribute markers are dropped
    /// and relative references resolve against the new owner. The cached
    /// value is not carried over.
    pub fn relocate(&self, coord: CellCoord) -> Formula {
        let stack: Vec<StackItem> = self
            .stack
            .iter()
            .filter(|item| !item.is_marker())
            .cloned()
            .collect();
        Formula::with_coord(stack, coord)
    }
}

/// Render a postfix stack to infix text. An empty stack renders as "".
/// Anything left below the first complete expression is ignored.
pub fn render_stack(stack: &[StackItem], owner: Option<CellCoord>) -> Result<String, XlmError> {
    let mut cursor = StackCursor::new(stack);
    if cursor.is_exhausted() {
        return Ok(String::new());
    }
    render_top(&mut cursor, owner, 0)
}

fn render_top(
    cursor: &mut StackCursor<'_>,
    owner: Option<CellCoord>,
    depth: usize,
) -> Result<String, XlmError> {
    if depth > MAX_RENDER_DEPTH {
        return Err(XlmError::DepthExceeded(MAX_RENDER_DEPTH));
    }
    let item = cursor.pop().ok_or_else(|| XlmError::Underflow {
        item: "<formula>".into(),
        expected: 1,
        found: 0,
    })?;

    if let StackItem::Operator(op) = item {
        return render_operator_chain(*op, cursor, owner, depth);
    }
    let Some(arity) = item.arity() else {
        return Ok(item.render(owner));
    };
    let arity = usize::from(arity);

    let mut operands = Vec::with_capacity(arity);
    for found in 0..arity {
        if cursor.is_exhausted() {
            return Err(XlmError::Underflow {
                item: item.to_string(),
                expected: arity,
                found,
            });
        }
        operands.push(render_top(cursor, owner, depth + 1)?);
    }
    // Popped right to left.
    operands.reverse();

    Ok(match item {
        StackItem::Negate => format!("-{}", operands[0]),
        _ => format!("{}({})", item, operands.join(",")),
    })
}

fn render_operator_chain(
    outer: Operator,
    cursor: &mut StackCursor<'_>,
    owner: Option<CellCoord>,
    depth: usize,
) -> Result<String, XlmError> {
    let mut pending = Vec::new();
    let mut op = outer;
    loop {
        pending.push((op, render_operand(op, 0, cursor, owner, depth)?));
        match cursor.peek() {
            Some(StackItem::Operator(next)) => {
                cursor.pop();
                op = *next;
            }
            _ => break,
        }
    }

    let mut text = render_operand(op, 1, cursor, owner, depth)?;
    while let Some((op, right)) = pending.pop() {
        text.push_str(op.symbol());
        text.push_str(&right);
    }
    Ok(text)
}

fn render_operand(
    op: Operator,
    found: usize,
    cursor: &mut StackCursor<'_>,
    owner: Option<CellCoord>,
    depth: usize,
) -> Result<String, XlmError> {
    if cursor.is_exhausted() {
        return Err(XlmError::Underflow {
            item: op.symbol().to_string(),
            expected: 2,
            found,
        });
    }
    render_top(cursor, owner, depth + 1)
}
