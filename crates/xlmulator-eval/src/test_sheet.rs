//! Lightweight sheet builder for unit, integration and property tests.
use xlmulator_common::{CellCoord, Value};
use xlmulator_parse::Formula;

use crate::engine::{Engine, EvalConfig};
use crate::sheet::Sheet;

#[derive(Debug)]
pub struct SheetBuilder {
    sheet: Sheet,
}

impl Default for SheetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SheetBuilder {
    pub fn new() -> Self {
        Self {
            sheet: Sheet::new("Macro1"),
        }
    }

    /// Add a formula cell. `a1` accepts `B7` or `$R7$C2`; the leading `=` of
    /// `text` is optional.
    pub fn formula(mut self, a1: &str, text: &str) -> Self {
        let coord = coord(a1);
        self.sheet.set_formula(coord, Formula::from_text(text, Some(coord)));
        self
    }

    pub fn value<V: Into<Value>>(mut self, a1: &str, v: V) -> Self {
        self.sheet.set_value(coord(a1), v.into());
        self
    }

    /// Formula cells from `(id, text)` pairs.
    pub fn formulas<'s, I>(self, cells: I) -> Self
    where
        I: IntoIterator<Item = (&'s str, &'s str)>,
    {
        cells
            .into_iter()
            .fold(self, |b, (a1, text)| b.formula(a1, text))
    }

    pub fn build(mut self) -> Sheet {
        self.sheet.take_written_formulas();
        self.sheet
    }

    pub fn engine(self) -> Engine {
        self.engine_with(EvalConfig::default())
    }

    pub fn engine_with(self, config: EvalConfig) -> Engine {
        Engine::new(self.build(), config)
    }
}

/// Coordinate of an `A1` or `$R1$C1` id. Panics on malformed ids; test-only.
pub fn coord(a1: &str) -> CellCoord {
    CellCoord::from_a1(a1)
        .or_else(|| CellCoord::parse_label(a1))
        .unwrap_or_else(|| panic!("bad cell id `{a1}` in SheetBuilder"))
}
