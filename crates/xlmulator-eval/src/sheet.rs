//! The macro sheet being emulated.
//!
//! A sparse map from coordinate to cell. Formula cells are additionally
//! tracked in an ordered set so evaluation passes walk them in ascending
//! row-major order. The sheet is mutated in place while a pass runs:
//! `SET.VALUE` and `FORMULA` persist their writes here, and every formula
//! write is recorded so the engine can queue the destination.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use tracing::debug;
use xlmulator_common::{CellCoord, Value, XlmError};
use xlmulator_parse::Formula;

use crate::seed::{SeedCell, SheetSeed};

#[derive(Debug, Clone)]
pub enum Cell {
    Value(Value),
    Formula(Formula),
}

impl Cell {
    /// The literal value, or the formula's cached value once evaluated.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Cell::Value(v) => Some(v),
            Cell::Formula(f) => f.value(),
        }
    }

    pub fn as_formula(&self) -> Option<&Formula> {
        match self {
            Cell::Formula(f) => Some(f),
            Cell::Value(_) => None,
        }
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, Cell::Formula(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Sheet {
    name: String,
    cells: FxHashMap<CellCoord, Cell>,
    formula_cells: BTreeSet<CellCoord>,
    written_formulas: Vec<CellCoord>,
}

impl Sheet {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Build a sheet from seed data. Formula text is parsed leniently;
    /// a cell id that is not a valid A1 reference is an error.
    pub fn from_seed(seed: &SheetSeed) -> Result<Self, XlmError> {
        let mut sheet = Sheet::new(seed.sheet.clone());
        for (id, cell) in &seed.cells {
            let coord = CellCoord::from_a1(id)
                .or_else(|| CellCoord::parse_label(id))
                .ok_or_else(|| XlmError::InvalidReference(id.clone()))?;
            match cell {
                SeedCell::Formula(text) => {
                    sheet.set_formula(coord, Formula::from_text(text, Some(coord)));
                }
                SeedCell::Value(v) => sheet.set_value(coord, v.clone()),
            }
        }
        // Seeded formulas are not dynamic writes.
        sheet.written_formulas.clear();
        debug!(
            sheet = %sheet.name,
            cells = sheet.cells.len(),
            formulas = sheet.formula_cells.len(),
            "sheet seeded"
        );
        Ok(sheet)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, coord: CellCoord) -> bool {
        self.cells.contains_key(&coord)
    }

    pub fn get(&self, coord: CellCoord) -> Result<&Cell, XlmError> {
        self.cells
            .get(&coord)
            .ok_or(XlmError::CellNotFound(coord))
    }

    pub fn get_formula(&self, coord: CellCoord) -> Option<&Formula> {
        self.cells.get(&coord).and_then(Cell::as_formula)
    }

    /// Resolved value of a cell, if it has one yet.
    pub fn value(&self, coord: CellCoord) -> Option<&Value> {
        self.cells.get(&coord).and_then(Cell::value)
    }

    /// Store a literal, replacing whatever the cell held.
    pub fn set_value(&mut self, coord: CellCoord, value: Value) {
        self.formula_cells.remove(&coord);
        self.cells.insert(coord, Cell::Value(value));
    }

    /// Store a formula (owned by `coord`). Returns true if the cell did not
    /// hold a formula before.
    pub fn set_formula(&mut self, coord: CellCoord, formula: Formula) -> bool {
        let formula = if formula.coord() == Some(coord) {
            formula
        } else {
            formula.relocate(coord)
        };
        let is_new = self.formula_cells.insert(coord);
        self.cells.insert(coord, Cell::Formula(formula));
        self.written_formulas.push(coord);
        is_new
    }

    /// Record `value` as the cell's resolved value: the cached value of a
    /// formula cell, or the literal of any other cell.
    pub fn set_resolved(&mut self, coord: CellCoord, value: Value) {
        match self.cells.get_mut(&coord) {
            Some(Cell::Formula(f)) => f.set_value(value),
            _ => self.set_value(coord, value),
        }
    }

    pub(crate) fn cache_formula_value(&mut self, coord: CellCoord, value: Value) -> bool {
        match self.cells.get_mut(&coord) {
            Some(Cell::Formula(f)) => {
                f.set_value(value);
                true
            }
            _ => false,
        }
    }

    /// Formula coordinates in ascending row-major order.
    pub fn formula_cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.formula_cells.iter().copied()
    }

    pub fn formula_count(&self) -> usize {
        self.formula_cells.len()
    }

    /// Coordinates written with a formula since the last call, in write order.
    pub fn take_written_formulas(&mut self) -> Vec<CellCoord> {
        std::mem::take(&mut self.written_formulas)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, &Cell)> + '_ {
        self.cells.iter().map(|(c, cell)| (*c, cell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(row: u32, col: u32) -> CellCoord {
        CellCoord::new(row, col).unwrap()
    }

    #[test]
    fn missing_cells_are_distinct_errors() {
        let sheet = Sheet::new("Macro1");
        assert_eq!(sheet.get(c(2, 3)).unwrap_err(), XlmError::CellNotFound(c(2, 3)));
    }

    #[test]
    fn formula_cells_iterate_in_row_major_order() {
        let mut sheet = Sheet::new("Macro1");
        for (r, col) in [(3, 1), (1, 9), (1, 2), (2, 5)] {
            sheet.set_formula(c(r, col), Formula::from_text("=1", None));
        }
        sheet.set_value(c(1, 1), Value::Int(7));
        let order: Vec<_> = sheet.formula_cells().collect();
        assert_eq!(order, vec![c(1, 2), c(1, 9), c(2, 5), c(3, 1)]);
        assert_eq!(sheet.take_written_formulas().len(), 4);
        assert!(sheet.take_written_formulas().is_empty());
    }

    #[test]
    fn literal_write_replaces_formula() {
        let mut sheet = Sheet::new("Macro1");
        sheet.set_formula(c(1, 1), Formula::from_text("=1+1", None));
        sheet.set_value(c(1, 1), Value::from("x"));
        assert_eq!(sheet.formula_count(), 0);
        assert_eq!(sheet.value(c(1, 1)), Some(&Value::from("x")));
    }

    #[test]
    fn resolved_write_keeps_formula() {
        let mut sheet = Sheet::new("Macro1");
        sheet.set_formula(c(1, 1), Formula::from_text("=1+1", None));
        sheet.set_resolved(c(1, 1), Value::Int(5));
        assert!(sheet.get(c(1, 1)).unwrap().is_formula());
        assert_eq!(sheet.value(c(1, 1)), Some(&Value::Int(5)));

        sheet.set_resolved(c(9, 9), Value::Int(1));
        assert_eq!(sheet.value(c(9, 9)), Some(&Value::Int(1)));
        assert!(!sheet.get(c(9, 9)).unwrap().is_formula());
    }

    #[test]
    fn formulas_take_the_coordinate_they_are_stored_at() {
        let mut sheet = Sheet::new("Macro1");
        sheet.set_formula(c(4, 4), Formula::from_text("=R[1]C[1]", None));
        let f = sheet.get_formula(c(4, 4)).unwrap();
        assert_eq!(f.coord(), Some(c(4, 4)));
        assert_eq!(f.render().unwrap(), "$R5$C5");
    }

    #[test]
    fn seed_cells_become_values_and_formulas() {
        let seed = SheetSeed::new("Macro1")
            .with_formula("A1", "=CHAR(65)")
            .with_value("B1", Value::Int(42))
            .with_value("$R2$C1", Value::from("hello"));
        let mut sheet = Sheet::from_seed(&seed).unwrap();
        assert_eq!(sheet.name(), "Macro1");
        assert_eq!(sheet.formula_cells().collect::<Vec<_>>(), vec![c(1, 1)]);
        assert_eq!(sheet.value(c(1, 2)), Some(&Value::Int(42)));
        assert_eq!(sheet.value(c(2, 1)), Some(&Value::from("hello")));
        assert!(sheet.take_written_formulas().is_empty());

        let bad = SheetSeed::new("Macro1").with_value("1A", Value::Int(0));
        assert!(matches!(Sheet::from_seed(&bad), Err(XlmError::InvalidReference(_))));
    }
}
