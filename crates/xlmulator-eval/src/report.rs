//! Plain-text dumps of a sheet's formula cells.
//!
//! Both dumps list formula cells in ascending coordinate order, one per
//! line, as `$R<row>$C<col>:\t<text>`.

use std::fmt::Write as _;

use crate::sheet::Sheet;

/// Rendered infix text of every formula cell. A formula that cannot be
/// rendered shows `<render error: ...>` instead.
pub fn formula_dump(sheet: &Sheet) -> String {
    let mut out = String::new();
    for coord in sheet.formula_cells() {
        let Some(formula) = sheet.get_formula(coord) else {
            continue;
        };
        let _ = match formula.render() {
            Ok(text) => writeln!(out, "{}:\t{}", coord.label(), text),
            Err(e) => writeln!(out, "{}:\t<render error: {}>", coord.label(), e),
        };
    }
    out
}

/// Resolved value of every formula cell; `<unevaluated>` where the last pass
/// produced none.
pub fn value_dump(sheet: &Sheet) -> String {
    let mut out = String::new();
    for coord in sheet.formula_cells() {
        let _ = match sheet.value(coord) {
            Some(v) => writeln!(out, "{}:\t{}", coord.label(), v),
            None => writeln!(out, "{}:\t<unevaluated>", coord.label()),
        };
    }
    out
}
