//! The function abstraction the interpreter dispatches calls to.

use xlmulator_common::{CellCoord, Value, XlmError};

use crate::sheet::Sheet;

bitflags::bitflags! {
    /// What an emulated function does besides computing a value.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct FnCaps: u8 {
        /// Same output for the same input, no side effects.
        const PURE         = 0b0000_0001;
        /// Returns an `ACTION: ...` tag describing an observable effect.
        const ACTION       = 0b0000_0010;
        /// Writes a value or formula into the sheet.
        const WRITES_SHEET = 0b0000_0100;
        /// Not emulated; returns a placeholder tag.
        const STUB         = 0b0000_1000;
        /// Backs an infix or prefix operator (`_plus`, `_unary_minus`, ...).
        const OPERATOR     = 0b0001_0000;
        /// Reads the environment the macro believes it runs in.
        const ENVIRONMENT  = 0b0010_0000;
    }
}

/// State a function may touch while it runs: the live sheet and the cell
/// whose formula is being evaluated.
pub struct FunctionContext<'a> {
    pub sheet: &'a mut Sheet,
    pub caller: Option<CellCoord>,
}

impl<'a> FunctionContext<'a> {
    pub fn new(sheet: &'a mut Sheet, caller: Option<CellCoord>) -> Self {
        Self { sheet, caller }
    }
}

/// An emulated XLM function.
///
/// Arguments arrive fully evaluated and in call order. The only exceptions
/// are destination references of `FORMULA`/`SET.VALUE`, which arrive as
/// `$R<row>$C<col>` label text.
pub trait Function: Send + Sync + 'static {
    fn caps(&self) -> FnCaps {
        FnCaps::PURE
    }

    fn name(&self) -> &'static str;

    fn min_args(&self) -> usize {
        0
    }

    fn eval(&self, args: &[Value], ctx: &mut FunctionContext<'_>) -> Result<Value, XlmError>;
}

pub type BuiltinFn = fn(&[Value], &mut FunctionContext<'_>) -> Result<Value, XlmError>;

/// A function backed by a plain function pointer. Most of the library is
/// declared this way, as tables of `Builtin`s.
#[derive(Clone, Copy)]
pub struct Builtin {
    name: &'static str,
    caps: FnCaps,
    min_args: usize,
    f: BuiltinFn,
}

impl Builtin {
    pub const fn new(name: &'static str, caps: FnCaps, min_args: usize, f: BuiltinFn) -> Self {
        Self {
            name,
            caps,
            min_args,
            f,
        }
    }

    pub const fn pure(name: &'static str, min_args: usize, f: BuiltinFn) -> Self {
        Self::new(name, FnCaps::PURE, min_args, f)
    }

    pub const fn action(name: &'static str, min_args: usize, f: BuiltinFn) -> Self {
        Self::new(name, FnCaps::ACTION, min_args, f)
    }
}

impl std::fmt::Debug for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("caps", &self.caps)
            .field("min_args", &self.min_args)
            .finish()
    }
}

impl Function for Builtin {
    fn caps(&self) -> FnCaps {
        self.caps
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn min_args(&self) -> usize {
        self.min_args
    }

    fn eval(&self, args: &[Value], ctx: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
        (self.f)(args, ctx)
    }
}
