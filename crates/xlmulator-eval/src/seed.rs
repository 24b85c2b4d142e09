//! Seed data handed over by a document reader.
//!
//! A seed names the selected sheet and maps A1 cell ids to either formula
//! text or an already-known value. Text values starting with `=` are
//! formulas; everything else is a literal. With the `serde` feature a seed
//! deserializes from JSON such as
//! `{"sheet": "Macro1", "cells": {"A1": "=CHAR(65)", "B1": 42}}`.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use xlmulator_common::Value;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "Value", into = "Value"))]
#[derive(Debug, Clone, PartialEq)]
pub enum SeedCell {
    Formula(String),
    Value(Value),
}

impl From<Value> for SeedCell {
    fn from(v: Value) -> Self {
        match v {
            Value::Text(s) if s.starts_with('=') => SeedCell::Formula(s),
            other => SeedCell::Value(other),
        }
    }
}

impl From<SeedCell> for Value {
    fn from(cell: SeedCell) -> Self {
        match cell {
            SeedCell::Formula(text) => Value::Text(text),
            SeedCell::Value(v) => v,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SheetSeed {
    #[cfg_attr(feature = "serde", serde(default = "default_sheet_name"))]
    pub sheet: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub cells: BTreeMap<String, SeedCell>,
}

fn default_sheet_name() -> String {
    "Macro1".to_string()
}

impl Default for SheetSeed {
    fn default() -> Self {
        Self::new(default_sheet_name())
    }
}

impl SheetSeed {
    pub fn new<S: Into<String>>(sheet: S) -> Self {
        Self {
            sheet: sheet.into(),
            cells: BTreeMap::new(),
        }
    }

    pub fn with_formula(mut self, id: &str, text: &str) -> Self {
        self.cells
            .insert(id.to_string(), SeedCell::Formula(text.to_string()));
        self
    }

    pub fn with_value<V: Into<Value>>(mut self, id: &str, value: V) -> Self {
        self.cells
            .insert(id.to_string(), SeedCell::Value(value.into()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_equals_marks_formulas() {
        assert_eq!(
            SeedCell::from(Value::from("=CHAR(65)")),
            SeedCell::Formula("=CHAR(65)".into())
        );
        assert_eq!(
            SeedCell::from(Value::from("plain")),
            SeedCell::Value(Value::from("plain"))
        );
        assert_eq!(SeedCell::from(Value::Int(3)), SeedCell::Value(Value::Int(3)));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserializes_from_json() {
        let seed: SheetSeed = serde_json::from_str(
            r#"{"sheet": "Macro1", "cells": {"A1": "=CHAR(65)", "B1": 42, "C1": true, "D1": 1.5}}"#,
        )
        .unwrap();
        assert_eq!(seed.cells["A1"], SeedCell::Formula("=CHAR(65)".into()));
        assert_eq!(seed.cells["B1"], SeedCell::Value(Value::Int(42)));
        assert_eq!(seed.cells["C1"], SeedCell::Value(Value::Bool(true)));
        assert_eq!(seed.cells["D1"], SeedCell::Value(Value::Float(1.5)));

        let unnamed: SheetSeed = serde_json::from_str(r#"{"cells": {}}"#).unwrap();
        assert_eq!(unnamed.sheet, "Macro1");
    }
}
