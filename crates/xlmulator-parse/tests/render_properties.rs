use proptest::prelude::*;
use xlmulator_parse::{Formula, Operator, StackItem, parse_formula};

const OPERATORS: [Operator; 12] = [
    Operator::Add,
    Operator::Sub,
    Operator::Mul,
    Operator::Div,
    Operator::Power,
    Operator::Concat,
    Operator::Lt,
    Operator::Le,
    Operator::Gt,
    Operator::Ge,
    Operator::Eq,
    Operator::Ne,
];

fn leaf() -> impl Strategy<Value = Vec<StackItem>> {
    prop_oneof![
        (0i64..100_000).prop_map(|i| vec![StackItem::IntLiteral(i)]),
        "[a-z]{0,6}".prop_map(|s| vec![StackItem::StringLiteral(s)]),
        any::<bool>().prop_map(|b| vec![StackItem::BoolLiteral(b)]),
    ]
}

/// Postfix stacks built from literals and binary operators only.
fn expression() -> impl Strategy<Value = Vec<StackItem>> {
    leaf().prop_recursive(6, 64, 2, |inner| {
        (inner.clone(), inner, 0..OPERATORS.len()).prop_map(|(mut lhs, rhs, op)| {
            lhs.extend(rhs);
            lhs.push(StackItem::Operator(OPERATORS[op]));
            lhs
        })
    })
}

proptest! {
    #[test]
    fn render_is_cached_and_idempotent(stack in expression()) {
        let formula = Formula::new(stack);
        let first = formula.render().unwrap().to_string();
        prop_assert_eq!(formula.gloss(), Some(first.as_str()));
        prop_assert_eq!(formula.render().unwrap(), first.as_str());
    }

    #[test]
    fn rendered_text_reparses_to_the_same_text(stack in expression()) {
        let rendered = Formula::new(stack).render().unwrap().to_string();
        let reparsed = Formula::new(parse_formula(&rendered).unwrap());
        prop_assert_eq!(reparsed.render().unwrap(), rendered.as_str());
    }

    #[test]
    fn function_flag_matches_declared_arity(name in "[A-Z]{1,8}(\\.[A-Z]{1,6})?", argc in 0u8..8) {
        let variadic = StackItem::variadic_call(&name, argc);
        prop_assert_eq!(variadic.is_function(), argc > 0);

        let named = StackItem::named_function(&name);
        let declared = named.arity().unwrap();
        prop_assert_eq!(named.is_function(), declared > 0);
    }

    #[test]
    fn short_stacks_never_render_partially(argc in 1u8..6, supplied in 0usize..6) {
        prop_assume!(supplied < usize::from(argc));
        let mut stack: Vec<StackItem> = (0..supplied as i64).map(StackItem::IntLiteral).collect();
        stack.push(StackItem::variadic_call("CONCATENATE", argc));
        prop_assert!(Formula::new(stack).render().is_err());
    }
}

#[test]
fn operators_all_declare_two_operands() {
    for op in OPERATORS {
        let item = StackItem::Operator(op);
        assert_eq!(item.arity(), Some(2));
        assert!(item.is_function());
        assert!(item.is_infix());
    }
    assert!(!StackItem::Negate.is_infix());
}
