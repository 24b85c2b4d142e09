//! Error taxonomy shared by the parser and the emulator.
//!
//! Two families live here:
//!
//! - **structural** errors (`Arity`, `Underflow`, `UnknownFunction`,
//!   `InvalidReference`, `Parse`, `DepthExceeded`) abort the evaluation of
//!   the single cell in progress;
//! - **recoverable** conditions (`CellNotFound`, `CycleDetected`,
//!   `Conversion`, `DivisionByZero`) are handled where they arise and only
//!   ever surface as log records.
//!
//! Every variant carries a stable [`XlmError::category`] string that log
//! records are tagged with.

use crate::CellCoord;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum XlmError {
    #[error("`{function}` expects {expected} operand(s) but only {found} remain on the stack")]
    Arity {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("cannot render `{item}`: expected {expected} operand(s), found {found}")]
    Underflow {
        item: String,
        expected: usize,
        found: usize,
    },

    #[error("no emulation registered for function `{0}`")]
    UnknownFunction(String),

    #[error("cell {0} not found")]
    CellNotFound(CellCoord),

    #[error("cell {0} is part of a reference cycle")]
    CycleDetected(CellCoord),

    #[error("cannot convert {value:?} to {target}")]
    Conversion { value: String, target: &'static str },

    #[error("division by zero")]
    DivisionByZero,

    #[error("invalid cell reference `{0}`")]
    InvalidReference(String),

    #[error("parse error at byte {pos}: {message}")]
    Parse { message: String, pos: usize },

    #[error("evaluation depth limit of {0} exceeded")]
    DepthExceeded(usize),
}

impl XlmError {
    /// Stable, greppable category name used as the `category` log field.
    pub fn category(&self) -> &'static str {
        match self {
            XlmError::Arity { .. } => "arity",
            XlmError::Underflow { .. } => "underflow",
            XlmError::UnknownFunction(_) => "unknown_function",
            XlmError::CellNotFound(_) => "cell_not_found",
            XlmError::CycleDetected(_) => "cycle_detected",
            XlmError::Conversion { .. } => "conversion",
            XlmError::DivisionByZero => "division_by_zero",
            XlmError::InvalidReference(_) => "invalid_reference",
            XlmError::Parse { .. } => "parse",
            XlmError::DepthExceeded(_) => "depth_exceeded",
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            XlmError::CellNotFound(_)
                | XlmError::CycleDetected(_)
                | XlmError::Conversion { .. }
                | XlmError::DivisionByZero
        )
    }

    pub fn parse<S: Into<String>>(message: S, pos: usize) -> Self {
        XlmError::Parse {
            message: message.into(),
            pos,
        }
    }
}
