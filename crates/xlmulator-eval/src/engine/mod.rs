//! Whole-sheet evaluation pass.
//!
//! Provides the priority-ordered worklist driver around the per-cell
//! [`Interpreter`](crate::interpreter::Interpreter).

pub mod eval;

pub use eval::Engine;

use xlmulator_common::{CellCoord, XlmError};

/// Configuration for the evaluation engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalConfig {
    /// Ceiling on evaluator recursion (expression nesting plus nested cell
    /// references). Exceeding it aborts the cell in progress.
    pub max_depth: usize,
    /// Ceiling on formula cells FORMULA()/FORMULA.FILL() may queue in one
    /// pass. Later writes still land in the sheet.
    pub max_dynamic_cells: usize,
    /// Skip formulas whose rendered text was already evaluated. When false
    /// the done set is keyed on coordinates.
    pub dedupe_by_text: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            max_depth: 512,
            max_dynamic_cells: 10_000,
            dedupe_by_text: true,
        }
    }
}

impl EvalConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_dynamic_cells(mut self, max_dynamic_cells: usize) -> Self {
        self.max_dynamic_cells = max_dynamic_cells;
        self
    }

    pub fn with_dedupe_by_text(mut self, dedupe_by_text: bool) -> Self {
        self.dedupe_by_text = dedupe_by_text;
        self
    }
}

/// A top-level cell whose evaluation was aborted.
#[derive(Debug, Clone, PartialEq)]
pub struct CellFailure {
    pub coord: CellCoord,
    pub error: XlmError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalSummary {
    /// Top-level cells evaluated to a value.
    pub evaluated: usize,
    /// Cells skipped because identical formula text was already evaluated.
    pub skipped: usize,
    /// Formula cells queued after being written during the pass.
    pub dynamic_cells: usize,
    pub failures: Vec<CellFailure>,
}

impl EvalSummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
