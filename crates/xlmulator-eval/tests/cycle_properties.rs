use proptest::prelude::*;
use xlmulator_eval::test_sheet::{SheetBuilder, coord};
use xlmulator_eval::{Engine, EvalConfig, Formula, StackItem, XlmError};
use xlmulator_parse::Operator;

const COLUMNS: [&str; 6] = ["A", "B", "C", "D", "E", "F"];

/// One formula per column of row 1, each combining two references into the
/// same row (self-references included) with a literal.
fn reference_web() -> impl Strategy<Value = Vec<(usize, usize, i64)>> {
    prop::collection::vec((0..COLUMNS.len(), 0..COLUMNS.len(), 0i64..10), 1..=COLUMNS.len())
}

fn build(web: &[(usize, usize, i64)]) -> Vec<(String, String)> {
    web.iter()
        .enumerate()
        .map(|(i, (a, b, n))| {
            (
                format!("{}1", COLUMNS[i]),
                format!("={}1&{}1&{}", COLUMNS[*a], COLUMNS[*b], n),
            )
        })
        .collect()
}

proptest! {
    #[test]
    fn arbitrary_reference_cycles_terminate(web in reference_web()) {
        let cells = build(&web);
        let mut engine = SheetBuilder::new()
            .formulas(cells.iter().map(|(id, text)| (id.as_str(), text.as_str())))
            .engine_with(EvalConfig::default().with_dedupe_by_text(false));
        let summary = engine.evaluate_all();

        prop_assert!(summary.is_clean(), "{:?}", summary.failures);
        for (id, _) in &cells {
            prop_assert!(engine.sheet().value(coord(id)).is_some(), "{} unresolved", id);
        }
    }

    #[test]
    fn passes_are_deterministic(web in reference_web()) {
        let cells = build(&web);
        let run = || {
            let mut engine = SheetBuilder::new()
                .formulas(cells.iter().map(|(id, text)| (id.as_str(), text.as_str())))
                .engine();
            engine.evaluate_all();
            engine.value_dump()
        };
        prop_assert_eq!(run(), run());
    }

    #[test]
    fn long_char_chains_evaluate(terms in 600usize..2000) {
        let mut stack = vec![StackItem::IntLiteral(65), StackItem::named_function("CHAR")];
        for i in 1..terms {
            stack.push(StackItem::IntLiteral(65 + (i % 26) as i64));
            stack.push(StackItem::named_function("CHAR"));
            stack.push(StackItem::Operator(Operator::Concat));
        }
        let mut sheet = SheetBuilder::new().build();
        sheet.set_formula(coord("A1"), Formula::new(stack));
        let mut engine = Engine::new(sheet, EvalConfig::default());
        let summary = engine.evaluate_all();

        prop_assert!(summary.is_clean(), "{:?}", summary.failures);
        let text = engine
            .sheet()
            .value(coord("A1"))
            .map(ToString::to_string)
            .unwrap_or_default();
        prop_assert_eq!(text.len(), terms);
        prop_assert!(text.starts_with("ABCDEFGHIJKLMNOPQRSTUVWXYZABC"));
        prop_assert!(engine.formula_dump().starts_with("$R1$C1:\tCHAR(65)&CHAR(66)&"));
    }

    #[test]
    fn deep_nesting_hits_the_ceiling_instead_of_the_stack(depth in 600usize..2000) {
        let mut stack = vec![StackItem::IntLiteral(1)];
        stack.extend(std::iter::repeat_n(StackItem::Negate, depth));
        let mut sheet = SheetBuilder::new().build();
        sheet.set_formula(coord("A1"), Formula::new(stack));
        let mut engine = Engine::new(sheet, EvalConfig::default());
        let summary = engine.evaluate_all();
        prop_assert_eq!(summary.failures.len(), 1);
        prop_assert_eq!(&summary.failures[0].error, &XlmError::DepthExceeded(512));
    }
}
