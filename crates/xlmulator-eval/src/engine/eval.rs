use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use tracing::{debug, info_span, warn};
use xlmulator_common::{CellCoord, Value, XlmError};

use crate::actions::{Action, extract_actions};
use crate::engine::{CellFailure, EvalConfig, EvalSummary};
use crate::function_registry::{FunctionRegistry, builtin_registry};
use crate::interpreter::{FailedCells, Interpreter};
use crate::report;
use crate::seed::SheetSeed;
use crate::sheet::Sheet;

/// Identity of an evaluated formula for the done set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DoneKey {
    Text(String),
    Coord(CellCoord),
}

pub struct Engine {
    sheet: Sheet,
    registry: Arc<FunctionRegistry>,
    config: EvalConfig,
    failed: FailedCells,
}

impl Engine {
    pub fn new(sheet: Sheet, config: EvalConfig) -> Self {
        Self {
            sheet,
            registry: builtin_registry(),
            config,
            failed: FailedCells::default(),
        }
    }

    pub fn from_seed(seed: &SheetSeed, config: EvalConfig) -> Result<Self, XlmError> {
        Ok(Self::new(Sheet::from_seed(seed)?, config))
    }

    /// Replace the function table, e.g. with one carrying extra emulations.
    pub fn with_registry(mut self, registry: Arc<FunctionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    pub fn sheet_mut(&mut self) -> &mut Sheet {
        &mut self.sheet
    }

    pub fn into_sheet(self) -> Sheet {
        self.sheet
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Evaluate a single cell (and whatever it references) on demand.
    ///
    /// Cells that already failed since the last pass started are not
    /// dispatched again; their recorded error is returned.
    pub fn evaluate_cell(&mut self, coord: CellCoord) -> Result<Value, XlmError> {
        let mut interp = Interpreter::new(&mut self.sheet, &self.registry, &self.config)
            .with_failures(std::mem::take(&mut self.failed));
        let result = interp.evaluate_cell(coord);
        self.failed = interp.into_failures();
        result
    }

    /// One full pass over the sheet.
    ///
    /// Formula cells are visited SET.VALUE calls first, then FORMULA calls,
    /// then everything else, each group in ascending coordinate order.
    /// Formula cells written during the pass join the back of the queue.
    /// A failure aborts only the cell it occurred in: cells reading a failed
    /// cell see the empty value, and the failure is reported once, for the
    /// failed cell itself.
    pub fn evaluate_all(&mut self) -> EvalSummary {
        let span = info_span!(
            "evaluate_all",
            sheet = %self.sheet.name(),
            formulas = self.sheet.formula_count()
        );
        let _guard = span.enter();

        // Writes made before the pass are not dynamic cells of this pass.
        self.sheet.take_written_formulas();
        self.failed.clear();

        let mut queue: VecDeque<CellCoord> = self.priority_order().into();
        let mut done: FxHashSet<DoneKey> = FxHashSet::default();
        let mut summary = EvalSummary::default();

        while let Some(coord) = queue.pop_front() {
            let Some(key) = self.done_key(coord) else {
                debug!(cell = %coord, "queued cell no longer holds a formula");
                continue;
            };
            if !done.insert(key) {
                debug!(cell = %coord, "formula text already evaluated; skipping");
                summary.skipped += 1;
                continue;
            }
            if self.sheet.value(coord).is_some() {
                // Resolved earlier as a dependency, or overwritten by SET.VALUE.
                continue;
            }

            let cell_span = info_span!("evaluate_cell", cell = %coord);
            let _cell_guard = cell_span.enter();
            match self.evaluate_cell(coord) {
                Ok(value) => {
                    debug!(value = %value, "cell resolved");
                    summary.evaluated += 1;
                }
                Err(error) => {
                    warn!(category = error.category(), error = %error, "cell evaluation aborted");
                    summary.failures.push(CellFailure { coord, error });
                }
            }

            for written in self.sheet.take_written_formulas() {
                if summary.dynamic_cells >= self.config.max_dynamic_cells {
                    warn!(
                        category = "dynamic_cell_limit",
                        cell = %written,
                        limit = self.config.max_dynamic_cells,
                        "dynamic cell limit reached; written formula not queued"
                    );
                    continue;
                }
                summary.dynamic_cells += 1;
                queue.push_back(written);
            }
        }

        debug!(
            evaluated = summary.evaluated,
            skipped = summary.skipped,
            failures = summary.failures.len(),
            "pass complete"
        );
        summary
    }

    pub fn actions(&self) -> Vec<Action> {
        extract_actions(&self.sheet)
    }

    pub fn formula_dump(&self) -> String {
        report::formula_dump(&self.sheet)
    }

    pub fn value_dump(&self) -> String {
        report::value_dump(&self.sheet)
    }

    fn priority_order(&self) -> Vec<CellCoord> {
        let mut set_values = Vec::new();
        let mut formulas = Vec::new();
        let mut rest = Vec::new();
        for coord in self.sheet.formula_cells() {
            let text = self
                .sheet
                .get_formula(coord)
                .and_then(|f| f.render().ok())
                .unwrap_or_default();
            if text.starts_with("SET.VALUE(") {
                set_values.push(coord);
            } else if text.starts_with("FORMULA(") {
                formulas.push(coord);
            } else {
                rest.push(coord);
            }
        }
        set_values.extend(formulas);
        set_values.extend(rest);
        set_values
    }

    fn done_key(&self, coord: CellCoord) -> Option<DoneKey> {
        let formula = self.sheet.get_formula(coord)?;
        if !self.config.dedupe_by_text {
            return Some(DoneKey::Coord(coord));
        }
        Some(match formula.render() {
            Ok(text) => DoneKey::Text(text.to_string()),
            Err(_) => DoneKey::Coord(coord),
        })
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("sheet", &self.sheet.name())
            .field("formulas", &self.sheet.formula_count())
            .field("config", &self.config)
            .field("failed", &self.failed.len())
            .finish()
    }
}
