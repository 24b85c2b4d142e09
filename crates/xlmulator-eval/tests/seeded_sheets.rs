use xlmulator_eval::{ActionKind, Engine, EvalConfig, SheetSeed, Value};
use xlmulator_eval::test_sheet::coord;

/// A deobfuscation chain in the shape droppers use: characters are computed
/// into scratch cells with SET.VALUE, glued together, written out as a new
/// formula and run.
fn dropper_seed() -> SheetSeed {
    SheetSeed::new("Macro1")
        .with_value("H1", Value::Int(222))
        .with_value("H2", Value::Int(220))
        .with_formula("A1", "=SET.VALUE(J1, CHAR(H1-123))")
        .with_formula("A2", "=SET.VALUE(J2, CHAR(H2-123)&\"lc\")")
        .with_formula("A3", "=FORMULA(\"=EXEC(\"\"\"&J1&J2&\"\"\")\", K1)")
        .with_formula("A4", "=GET.WORKSPACE(1)")
        .with_formula("A5", "=HALT()")
}

#[test]
fn dropper_chain_is_recovered() {
    let mut engine = Engine::from_seed(&dropper_seed(), EvalConfig::default()).unwrap();
    let summary = engine.evaluate_all();
    assert!(summary.is_clean(), "{:?}", summary.failures);
    assert_eq!(summary.dynamic_cells, 1);

    assert_eq!(engine.sheet().value(coord("J1")), Some(&Value::from("c")));
    assert_eq!(engine.sheet().value(coord("J2")), Some(&Value::from("alc")));
    let written = engine.sheet().get_formula(coord("K1")).unwrap();
    assert_eq!(written.render().unwrap(), "EXEC(\"calc\")");

    let kinds: Vec<_> = engine.actions().iter().map(|a| (a.kind, a.detail.clone())).collect();
    assert_eq!(
        kinds,
        vec![
            (ActionKind::Exec, "calc".to_string()),
            (ActionKind::Halt, "HALT".to_string()),
        ]
    );
}

#[test]
fn formula_dump_lists_every_formula_cell() {
    let mut engine = Engine::from_seed(&dropper_seed(), EvalConfig::default()).unwrap();
    engine.evaluate_all();
    let dump = engine.formula_dump();
    let labels: Vec<_> = dump
        .lines()
        .filter_map(|line| line.split('\t').next())
        .collect();
    assert_eq!(
        labels,
        vec!["$R1$C1:", "$R1$C11:", "$R2$C1:", "$R3$C1:", "$R4$C1:", "$R5$C1:"]
    );
    assert!(dump.contains("$R1$C1:\tSET.VALUE($R1$C10,CHAR($R1$C8-123))\n"));
}

#[cfg(feature = "serde")]
#[test]
fn seeds_load_from_json() {
    let seed: SheetSeed = serde_json::from_str(
        r#"{"sheet": "Macro1", "cells": {"A1": "=CHAR(65)&B1", "B1": 42, "B2": "plain"}}"#,
    )
    .unwrap();
    let mut engine = Engine::from_seed(&seed, EvalConfig::default()).unwrap();
    engine.evaluate_all();
    assert_eq!(engine.sheet().value(coord("A1")), Some(&Value::from("A42")));
    assert_eq!(engine.sheet().value(coord("B2")), Some(&Value::from("plain")));
}
