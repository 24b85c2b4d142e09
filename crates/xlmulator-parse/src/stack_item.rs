//! The atomic unit of a parsed XLM formula.
//!
//! A formula is a postfix program: operands are pushed first and the
//! operator or function that consumes them follows. Every [`StackItem`]
//! can render itself as a fragment of source text, and reports whether it
//! consumes operands ([`StackItem::arity`]) and whether it renders infix.

use std::fmt::{self, Display};

use tracing::warn;
use xlmulator_common::{CellCoord, Value};

use crate::arity::fixed_arity;

/* ───────────────────────────── operators ───────────────────────────── */

/// Binary infix operators. All of them consume exactly two operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Power,
    Concat,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Power => "^",
            Operator::Concat => "&",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Eq => "=",
            Operator::Ne => "<>",
        }
    }

    /// Name under which the operator's emulation is registered.
    pub fn function_name(self) -> &'static str {
        match self {
            Operator::Add => "_plus",
            Operator::Sub => "_minus",
            Operator::Mul => "_times",
            Operator::Div => "_divide",
            Operator::Power => "_power",
            Operator::Concat => "_concat",
            Operator::Lt => "_less_than",
            Operator::Le => "_less_or_equal",
            Operator::Gt => "_greater_than",
            Operator::Ge => "_greater_or_equal",
            Operator::Eq => "_equals",
            Operator::Ne => "_not_equal",
        }
    }

    pub fn from_symbol(s: &str) -> Option<Self> {
        Some(match s {
            "+" => Operator::Add,
            "-" => Operator::Sub,
            "*" => Operator::Mul,
            "/" => Operator::Div,
            "^" => Operator::Power,
            "&" => Operator::Concat,
            "<" => Operator::Lt,
            "<=" => Operator::Le,
            ">" => Operator::Gt,
            ">=" => Operator::Ge,
            "=" => Operator::Eq,
            "<>" | "!=" => Operator::Ne,
            _ => return None,
        })
    }

    /// Binding strength used by the text parser. Higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            Operator::Lt
            | Operator::Le
            | Operator::Gt
            | Operator::Ge
            | Operator::Eq
            | Operator::Ne => 1,
            Operator::Concat => 2,
            Operator::Add | Operator::Sub => 3,
            Operator::Mul | Operator::Div => 4,
            Operator::Power => 5,
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/* ─────────────────────────── cell references ───────────────────────── */

// Relative references in the legacy binary token stream carry the
// row/column-relative flags in the two high bits of the column word
// (0xC000). These thresholds are taken from observed documents rather than
// derived from the format description.
pub const RELATIVE_COL_FLAGS: u32 = 49152;
const ROW_OFFSET_SIGN: u32 = 32767;
const ROW_OFFSET_WRAP: i64 = 65536;
const COL_OFFSET_SIGN: u32 = 127;
const COL_OFFSET_WRAP: i64 = 256;

/// A reference to another cell. Relative references store signed offsets
/// from the owning cell; absolute references store 1-based coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub row: i64,
    pub col: i64,
    pub relative: bool,
}

impl CellRef {
    pub fn absolute(coord: CellCoord) -> Self {
        Self {
            row: i64::from(coord.row),
            col: i64::from(coord.col),
            relative: false,
        }
    }

    pub fn relative(d_row: i64, d_col: i64) -> Self {
        Self {
            row: d_row,
            col: d_col,
            relative: true,
        }
    }

    /// Decode a raw (row, column) pair from a binary-format reference token.
    ///
    /// A column word above [`RELATIVE_COL_FLAGS`] marks the reference as
    /// relative; the flags are subtracted and the remaining words are read
    /// as two's complement offsets (16-bit rows, 8-bit columns).
    pub fn from_biff(row: u32, col: u32) -> Self {
        if col > RELATIVE_COL_FLAGS {
            let col = col - RELATIVE_COL_FLAGS;
            let d_row = if row > ROW_OFFSET_SIGN {
                i64::from(row) - ROW_OFFSET_WRAP
            } else {
                i64::from(row)
            };
            let d_col = if col > COL_OFFSET_SIGN {
                i64::from(col) - COL_OFFSET_WRAP
            } else {
                i64::from(col)
            };
            Self::relative(d_row, d_col)
        } else {
            Self {
                row: i64::from(row),
                col: i64::from(col),
                relative: false,
            }
        }
    }

    /// Absolute coordinate of the referenced cell. Relative references need
    /// the owning cell; `None` means unresolvable (no owner yet, or off-grid).
    pub fn resolve(&self, owner: Option<CellCoord>) -> Option<CellCoord> {
        if self.relative {
            owner?.offset(self.row, self.col)
        } else {
            let row = u32::try_from(self.row).ok()?;
            let col = u32::try_from(self.col).ok()?;
            CellCoord::new(row, col)
        }
    }

    /// Source-like text: `$R<row>$C<col>` once resolvable, `R[r]C[c]` for
    /// relative references without an owner, `#REF!` when off-grid.
    pub fn render(&self, owner: Option<CellCoord>) -> String {
        match self.resolve(owner) {
            Some(coord) => coord.label(),
            None if self.relative && owner.is_none() => {
                format!("R[{}]C[{}]", self.row, self.col)
            }
            None => "#REF!".to_string(),
        }
    }
}

/* ────────────────────────────── items ─────────────────────────────── */

#[derive(Debug, Clone, PartialEq)]
pub enum StackItem {
    IntLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),
    BoolLiteral(bool),
    CellRef(CellRef),
    Operator(Operator),
    /// Prefix `-`. Consumes one operand.
    Negate,
    /// Fixed-arity function; the arity comes from [`fixed_arity`].
    NamedFunction { name: String, arity: u8 },
    /// Function call whose argument count was captured at parse time.
    VariadicCall { name: String, arity: u8 },
    /// An omitted argument (`f(a,,b)`).
    MissingArg,
    /// Attribute marker. Transparent: it never occupies an operand slot.
    Attribute,
    /// Area reference carried through from the source; not evaluated.
    Area,
    /// Memory-area marker carried through from the source; not evaluated.
    Memory,
    /// Anything the front end could not type (unknown tokens, defined names).
    Unparsed(String),
}

impl StackItem {
    /// Build a fixed-arity function token. Names missing from the arity
    /// table default to one argument.
    pub fn named_function(name: &str) -> Self {
        let name = name.to_ascii_uppercase();
        let arity = match fixed_arity(&name) {
            Some(n) => n,
            None => {
                warn!(
                    category = "unknown_arity",
                    function = %name,
                    "argument count unknown; assuming 1"
                );
                1
            }
        };
        StackItem::NamedFunction { name, arity }
    }

    pub fn variadic_call(name: &str, arity: u8) -> Self {
        StackItem::VariadicCall {
            name: name.to_ascii_uppercase(),
            arity,
        }
    }

    pub fn string<S: Into<String>>(s: S) -> Self {
        StackItem::StringLiteral(s.into())
    }

    /// Number of operands this item consumes, if it consumes any at all.
    pub fn arity(&self) -> Option<u8> {
        match self {
            StackItem::Operator(_) => Some(2),
            StackItem::Negate => Some(1),
            StackItem::NamedFunction { arity, .. } | StackItem::VariadicCall { arity, .. } => {
                Some(*arity)
            }
            _ => None,
        }
    }

    /// True for items that pop operands off the stack.
    pub fn is_function(&self) -> bool {
        self.arity().is_some_and(|n| n > 0)
    }

    pub fn is_infix(&self) -> bool {
        matches!(self, StackItem::Operator(_))
    }

    pub fn is_marker(&self) -> bool {
        matches!(self, StackItem::Attribute)
    }

    /// Placeholders evaluate to the empty value and render as nothing.
    pub fn is_placeholder(&self) -> bool {
        matches!(
            self,
            StackItem::Area | StackItem::Memory | StackItem::Unparsed(_)
        )
    }

    /// Dispatch name of anything that declares an arity.
    pub fn function_name(&self) -> Option<&str> {
        match self {
            StackItem::Operator(op) => Some(op.function_name()),
            StackItem::Negate => Some("_unary_minus"),
            StackItem::NamedFunction { name, .. } | StackItem::VariadicCall { name, .. } => {
                Some(name)
            }
            _ => None,
        }
    }

    /// Value of a constant leaf.
    pub fn literal(&self) -> Option<Value> {
        match self {
            StackItem::IntLiteral(i) => Some(Value::Int(*i)),
            StackItem::FloatLiteral(f) => Some(Value::Float(*f)),
            StackItem::StringLiteral(s) => Some(Value::Text(s.clone())),
            StackItem::BoolLiteral(b) => Some(Value::Bool(*b)),
            StackItem::MissingArg => Some(Value::empty()),
            _ => None,
        }
    }

    /// Render with knowledge of the owning cell, so relative references
    /// show their absolute target.
    pub fn render(&self, owner: Option<CellCoord>) -> String {
        match self {
            StackItem::CellRef(r) => r.render(owner),
            other => other.to_string(),
        }
    }
}

impl Display for StackItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackItem::IntLiteral(i) => write!(f, "{i}"),
            StackItem::FloatLiteral(x) => write!(f, "{}", Value::Float(*x)),
            StackItem::StringLiteral(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            StackItem::BoolLiteral(true) => f.write_str("TRUE"),
            StackItem::BoolLiteral(false) => f.write_str("FALSE"),
            StackItem::CellRef(r) => f.write_str(&r.render(None)),
            StackItem::Operator(op) => f.write_str(op.symbol()),
            StackItem::Negate => f.write_str("-"),
            StackItem::NamedFunction { name, .. } | StackItem::VariadicCall { name, .. } => {
                f.write_str(name)
            }
            StackItem::MissingArg
            | StackItem::Attribute
            | StackItem::Area
            | StackItem::Memory
            | StackItem::Unparsed(_) => Ok(()),
        }
    }
}

/* ────────────────────────────── cursor ────────────────────────────── */

/// Pops operands off a postfix stack from the top down, stepping over
/// attribute markers. Shared by the renderer and the evaluator.
#[derive(Debug, Clone)]
pub struct StackCursor<'s> {
    stack: &'s [StackItem],
    pos: usize,
}

impl<'s> StackCursor<'s> {
    pub fn new(stack: &'s [StackItem]) -> Self {
        Self {
            stack,
            pos: stack.len(),
        }
    }

    pub fn pop(&mut self) -> Option<&'s StackItem> {
        while self.pos > 0 {
            self.pos -= 1;
            let item = &self.stack[self.pos];
            if !item.is_marker() {
                return Some(item);
            }
        }
        None
    }

    pub fn peek(&self) -> Option<&'s StackItem> {
        self.stack[..self.pos].iter().rev().find(|i| !i.is_marker())
    }

    /// Operands still available below the cursor.
    pub fn remaining(&self) -> usize {
        self.stack[..self.pos]
            .iter()
            .filter(|i| !i.is_marker())
            .count()
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_and_infix_flags() {
        let add = StackItem::Operator(Operator::Add);
        assert_eq!(add.arity(), Some(2));
        assert!(add.is_function());
        assert!(add.is_infix());

        let char_fn = StackItem::named_function("char");
        assert_eq!(char_fn.arity(), Some(1));
        assert!(!char_fn.is_infix());
        assert_eq!(char_fn.function_name(), Some("CHAR"));

        let now = StackItem::variadic_call("NOW", 0);
        assert_eq!(now.arity(), Some(0));
        assert!(!now.is_function());

        assert_eq!(StackItem::IntLiteral(3).arity(), None);
        assert!(!StackItem::CellRef(CellRef::relative(0, 1)).is_function());
    }

    #[test]
    fn unknown_named_function_defaults_to_one_argument() {
        let item = StackItem::named_function("NOT.A.REAL.FUNCTION");
        assert_eq!(item.arity(), Some(1));
    }

    #[test]
    fn placeholders_render_empty() {
        for item in [
            StackItem::Attribute,
            StackItem::Area,
            StackItem::Memory,
            StackItem::MissingArg,
            StackItem::Unparsed("ptgXyz".into()),
        ] {
            assert_eq!(item.to_string(), "");
        }
        assert_eq!(StackItem::string("a\"b").to_string(), "\"a\"\"b\"");
    }

    #[test]
    fn relative_references_resolve_against_owner() {
        let owner = CellCoord::new(5, 5);
        let r = CellRef::relative(-1, 2);
        assert_eq!(r.resolve(owner), CellCoord::new(4, 7));
        assert_eq!(r.render(owner), "$R4$C7");
        assert_eq!(r.render(None), "R[-1]C[2]");
        assert_eq!(CellRef::relative(-10, 0).render(owner), "#REF!");
    }

    #[test]
    fn biff_relative_flags_are_stripped() {
        let r = CellRef::from_biff(65535, RELATIVE_COL_FLAGS + 2);
        assert_eq!(r, CellRef::relative(-1, 2));
        let r = CellRef::from_biff(3, RELATIVE_COL_FLAGS + 255);
        assert_eq!(r, CellRef::relative(3, -1));
        let r = CellRef::from_biff(12, 3);
        assert_eq!(r, CellRef::absolute(CellCoord::new(12, 3).unwrap()));
        // The threshold is exclusive.
        assert!(!CellRef::from_biff(1, RELATIVE_COL_FLAGS).relative);
    }

    #[test]
    fn cursor_skips_markers() {
        let stack = vec![
            StackItem::IntLiteral(1),
            StackItem::Attribute,
            StackItem::IntLiteral(2),
            StackItem::Attribute,
        ];
        let mut cursor = StackCursor::new(&stack);
        assert_eq!(cursor.remaining(), 2);
        assert_eq!(cursor.peek(), Some(&StackItem::IntLiteral(2)));
        assert_eq!(cursor.pop(), Some(&StackItem::IntLiteral(2)));
        assert_eq!(cursor.pop(), Some(&StackItem::IntLiteral(1)));
        assert_eq!(cursor.pop(), None);
        assert!(cursor.is_exhausted());
    }
}
