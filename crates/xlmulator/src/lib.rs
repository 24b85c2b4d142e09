//! Meta crate that re-exports the xlmulator building blocks and bundles the
//! one-call emulation entry point used by the command-line tool.

pub use xlmulator_common as common;
pub use xlmulator_eval as eval;
pub use xlmulator_parse as parse;

pub use xlmulator_common::{CellCoord, Value, XlmError};
pub use xlmulator_eval::{
    Action, ActionKind, CellFailure, Engine, EvalConfig, EvalSummary, SeedCell, Sheet, SheetSeed,
};
pub use xlmulator_parse::{Formula, StackItem, parse_formula};

use serde::Serialize;
use tracing::info;

/// Everything one emulation pass produced.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub sheet: String,
    pub formulas: String,
    pub values: String,
    pub actions: Vec<Action>,
    pub failures: Vec<FailureRecord>,
    pub evaluated: usize,
    pub skipped: usize,
    pub dynamic_cells: usize,
}

/// A [`CellFailure`] flattened for display and serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub cell: String,
    pub category: &'static str,
    pub message: String,
}

impl From<&CellFailure> for FailureRecord {
    fn from(f: &CellFailure) -> Self {
        Self {
            cell: f.coord.label(),
            category: f.error.category(),
            message: f.error.to_string(),
        }
    }
}

/// Seed a sheet, run one evaluation pass and collect the results.
pub fn emulate(seed: &SheetSeed, config: EvalConfig) -> Result<Report, XlmError> {
    let mut engine = Engine::from_seed(seed, config)?;
    let summary = engine.evaluate_all();
    let actions = engine.actions();
    info!(
        sheet = %engine.sheet().name(),
        evaluated = summary.evaluated,
        skipped = summary.skipped,
        dynamic_cells = summary.dynamic_cells,
        actions = actions.len(),
        failures = summary.failures.len(),
        "emulation finished"
    );
    Ok(Report {
        sheet: engine.sheet().name().to_string(),
        formulas: engine.formula_dump(),
        values: engine.value_dump(),
        actions,
        failures: summary.failures.iter().map(FailureRecord::from).collect(),
        evaluated: summary.evaluated,
        skipped: summary.skipped,
        dynamic_cells: summary.dynamic_cells,
    })
}
