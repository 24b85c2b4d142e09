use xlmulator_common::{Value, XlmError};
use xlmulator_parse::{CellRef, Formula, Operator, StackItem};

use crate::engine::EvalConfig;
use crate::function_registry::builtin_registry;
use crate::interpreter::Interpreter;
use crate::test_sheet::{SheetBuilder, coord};

/* ─────────────── arithmetic and references ─────────────── */

#[test]
fn literal_arithmetic_and_dependent_cell() {
    let mut engine = SheetBuilder::new()
        .formula("A1", "=3+4")
        .formula("A2", "=A1*2")
        .engine();
    assert_eq!(engine.evaluate_cell(coord("A2")).unwrap(), Value::Int(14));
    // The dependency was resolved and cached on the way.
    assert_eq!(engine.sheet().value(coord("A1")), Some(&Value::Int(7)));
}

#[test]
fn literal_cells_evaluate_to_themselves() {
    let mut engine = SheetBuilder::new()
        .value("B1", "abc")
        .formula("B2", "=LEN(B1)")
        .engine();
    assert_eq!(engine.evaluate_cell(coord("B1")).unwrap(), Value::from("abc"));
    assert_eq!(engine.evaluate_cell(coord("B2")).unwrap(), Value::Int(3));
}

#[test]
fn cached_values_are_not_recomputed() {
    let mut engine = SheetBuilder::new().formula("A1", "=3+4").engine();
    engine.sheet_mut().set_resolved(coord("A1"), Value::from("pinned"));
    assert_eq!(engine.evaluate_cell(coord("A1")).unwrap(), Value::from("pinned"));
}

#[test]
fn char_decodes_and_falls_back_to_placeholder() {
    let mut engine = SheetBuilder::new()
        .formula("A1", "=CHAR(65)")
        .formula("A2", "=CHAR(9999999)")
        .formula("A3", "=CHAR(A4-123)")
        .value("A4", Value::Int(188))
        .engine();
    assert_eq!(engine.evaluate_cell(coord("A1")).unwrap(), Value::from("A"));
    assert_eq!(engine.evaluate_cell(coord("A2")).unwrap(), Value::from("?"));
    assert_eq!(engine.evaluate_cell(coord("A3")).unwrap(), Value::from("A"));
}

#[test]
fn missing_cell_reads_as_empty() {
    let mut engine = SheetBuilder::new()
        .formula("A1", "=LEN(Z99)")
        .formula("A2", "=Z99&\"x\"")
        .engine();
    assert_eq!(engine.evaluate_cell(coord("A1")).unwrap(), Value::Int(0));
    assert_eq!(engine.evaluate_cell(coord("A2")).unwrap(), Value::from("x"));
}

#[test]
fn direct_lookup_of_missing_cell_is_an_error() {
    let mut engine = SheetBuilder::new().engine();
    assert_eq!(
        engine.evaluate_cell(coord("C3")),
        Err(XlmError::CellNotFound(coord("C3")))
    );
}

#[test]
fn relative_references_resolve_against_the_owner() {
    let mut engine = SheetBuilder::new()
        .value("B2", Value::Int(40))
        .formula("A1", "=R[1]C[1]+2")
        .engine();
    assert_eq!(engine.evaluate_cell(coord("A1")).unwrap(), Value::Int(42));
}

/* ─────────────── cycles and limits ─────────────── */

#[test]
fn two_cell_cycle_is_severed() {
    let mut engine = SheetBuilder::new()
        .formula("A1", "=B1+1")
        .formula("B1", "=A1+1")
        .engine();
    // B1 sees A1 as empty while A1 is in progress.
    assert_eq!(engine.evaluate_cell(coord("A1")).unwrap(), Value::Int(2));
    assert_eq!(engine.sheet().value(coord("B1")), Some(&Value::Int(1)));
}

#[test]
fn self_reference_reads_empty() {
    let mut engine = SheetBuilder::new().formula("A1", "=A1&\"!\"").engine();
    assert_eq!(engine.evaluate_cell(coord("A1")).unwrap(), Value::from("!"));
}

#[test]
fn depth_ceiling_aborts_the_cell() {
    let mut engine = SheetBuilder::new()
        .formula("A1", "=ABS(ABS(ABS(-1)))")
        .engine_with(EvalConfig::default().with_max_depth(2));
    assert_eq!(
        engine.evaluate_cell(coord("A1")),
        Err(XlmError::DepthExceeded(2))
    );
    assert_eq!(engine.sheet().value(coord("A1")), None);
}

#[test]
fn operator_chains_do_not_count_as_nesting() {
    let mut engine = SheetBuilder::new()
        .formula("A1", "=1+2+3+4+5+6")
        .formula("A2", "=\"a\"&\"b\"&\"c\"&\"d\"")
        .engine_with(EvalConfig::default().with_max_depth(2));
    assert_eq!(engine.evaluate_cell(coord("A1")).unwrap(), Value::Int(21));
    assert_eq!(engine.evaluate_cell(coord("A2")).unwrap(), Value::from("abcd"));
}

#[test]
fn operator_chains_apply_left_to_right() {
    let mut engine = SheetBuilder::new()
        .formula("A1", "=100-10-1")
        .formula("A2", "=2*3+4*5-1")
        .formula("A3", "=2^3^2")
        .engine();
    assert_eq!(engine.evaluate_cell(coord("A1")).unwrap(), Value::Int(89));
    assert_eq!(engine.evaluate_cell(coord("A2")).unwrap(), Value::Int(25));
    assert_eq!(engine.evaluate_cell(coord("A3")).unwrap(), Value::Int(64));
}

#[test]
fn chain_operands_are_read_right_to_left() {
    // The right operand of the outermost operator is evaluated first, so
    // the SET.VALUE lands before B1 is read.
    let mut engine = SheetBuilder::new()
        .value("B1", "old")
        .formula("A1", "=B1&\"-\"&SET.VALUE(B1, \"new\")")
        .engine();
    assert_eq!(engine.evaluate_cell(coord("A1")).unwrap(), Value::from("new-TRUE"));
}

#[test]
fn referenced_failure_reads_as_empty() {
    let mut engine = SheetBuilder::new()
        .formula("A1", "=NOSUCH(1)")
        .formula("A2", "=LEN(A1)")
        .engine();
    assert_eq!(engine.evaluate_cell(coord("A2")).unwrap(), Value::Int(0));
    // The failure stays with A1 itself.
    assert_eq!(
        engine.evaluate_cell(coord("A1")),
        Err(XlmError::UnknownFunction("NOSUCH".into()))
    );
}

#[test]
fn operand_underflow_is_an_arity_error() {
    let mut sheet = SheetBuilder::new().build();
    sheet.set_formula(
        coord("A1"),
        Formula::new(vec![StackItem::IntLiteral(1), StackItem::Operator(Operator::Mul)]),
    );
    let registry = builtin_registry();
    let config = EvalConfig::default();
    let mut interp = Interpreter::new(&mut sheet, &registry, &config);
    assert_eq!(
        interp.evaluate_cell(coord("A1")),
        Err(XlmError::Arity {
            function: "_times".into(),
            expected: 2,
            found: 1,
        })
    );
}

#[test]
fn unknown_function_aborts_only_the_evaluating_cell() {
    let mut engine = SheetBuilder::new()
        .formula("A1", "=NOSUCH(1)")
        .formula("A2", "=3+4")
        .engine();
    assert_eq!(
        engine.evaluate_cell(coord("A1")),
        Err(XlmError::UnknownFunction("NOSUCH".into()))
    );
    assert_eq!(engine.evaluate_cell(coord("A2")).unwrap(), Value::Int(7));
}

#[test]
fn free_standing_formula_is_not_cached() {
    let mut sheet = SheetBuilder::new().value("A1", Value::Int(5)).build();
    let f = Formula::with_coord(
        vec![
            StackItem::CellRef(CellRef::relative(-1, 0)),
            StackItem::IntLiteral(2),
            StackItem::Operator(Operator::Power),
        ],
        coord("A2"),
    );
    let registry = builtin_registry();
    let config = EvalConfig::default();
    let mut interp = Interpreter::new(&mut sheet, &registry, &config);
    assert_eq!(interp.evaluate_formula(&f).unwrap(), Value::Int(25));
    assert!(!interp.sheet().contains(coord("A2")));
}

/* ─────────────── destination arguments ─────────────── */

#[test]
fn set_value_receives_its_destination_as_a_label() {
    let mut engine = SheetBuilder::new()
        .formula("B1", "=CHAR(66)")
        .formula("A1", "=SET.VALUE(B1, 5)")
        .engine();
    assert_eq!(engine.evaluate_cell(coord("A1")).unwrap(), Value::Bool(true));
    // B1 was never read: its formula still stands, with 5 as its value.
    assert!(engine.sheet().get(coord("B1")).unwrap().is_formula());
    assert_eq!(engine.sheet().value(coord("B1")), Some(&Value::Int(5)));
}

#[test]
fn formula_writes_a_parsed_formula_at_the_destination() {
    let mut engine = SheetBuilder::new()
        .formula("A1", "=FORMULA(\"=CHAR(67)\", C1)")
        .engine();
    assert_eq!(engine.evaluate_cell(coord("A1")).unwrap(), Value::Bool(true));
    let written = engine.sheet().get_formula(coord("C1")).unwrap();
    assert_eq!(written.render().unwrap(), "CHAR(67)");
    assert_eq!(engine.evaluate_cell(coord("C1")).unwrap(), Value::from("C"));
}

#[test]
fn formula_content_argument_is_still_evaluated() {
    let mut engine = SheetBuilder::new()
        .value("B1", "=1+1")
        .formula("A1", "=FORMULA(B1, C1)")
        .engine();
    engine.evaluate_cell(coord("A1")).unwrap();
    assert_eq!(engine.evaluate_cell(coord("C1")).unwrap(), Value::Int(2));
}

#[test]
fn formula_with_plain_text_writes_a_literal() {
    let mut engine = SheetBuilder::new()
        .formula("A1", "=FORMULA(\"hello\", C1)")
        .engine();
    engine.evaluate_cell(coord("A1")).unwrap();
    assert!(!engine.sheet().get(coord("C1")).unwrap().is_formula());
    assert_eq!(engine.sheet().value(coord("C1")), Some(&Value::from("hello")));
}

#[test]
fn formula_rewriting_its_own_cell_does_not_cache_onto_the_new_formula() {
    let mut engine = SheetBuilder::new()
        .formula("A1", "=FORMULA(\"=1+1\", A1)")
        .engine();
    assert_eq!(engine.evaluate_cell(coord("A1")).unwrap(), Value::Bool(true));
    assert_eq!(engine.sheet().value(coord("A1")), None);
    assert_eq!(engine.evaluate_cell(coord("A1")).unwrap(), Value::Int(2));
}
