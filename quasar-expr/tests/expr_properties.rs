use proptest::prelude::*;

use quasar_expr::{BasicContext, Expr, ExprArena};
use quasar_types::types::Value;

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Empty),
        Just(Value::NULL),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<f64>().prop_map(Value::float),
        "[a-z]{0,12}".prop_map(Value::from),
        prop::collection::vec(any::<i64>().prop_map(Value::Int), 0..6).prop_map(Value::List),
    ]
}

proptest! {
    #[test]
    fn constant_expressions_roundtrip_through_the_binary_form(value in arb_value()) {
        let mut arena = ExprArena::new();
        let root = arena.constant(value.clone());
        let encoded = arena.encode(root);

        let mut decoded_arena = ExprArena::new();
        let decoded = decoded_arena.decode(&encoded).unwrap();
        prop_assert_eq!(decoded_arena.node(decoded), &Expr::Constant(value));
    }

    #[test]
    fn arithmetic_never_panics_and_nulls_propagate(a in arb_value(), b in arb_value()) {
        let mut arena = ExprArena::new();
        let left = arena.constant(a.clone());
        let right = arena.constant(b.clone());
        let sum = arena.arithmetic(quasar_expr::ArithOp::Add, left, right);

        let mut ctx = BasicContext::default();
        let result = arena.eval(sum, &mut ctx);
        match &a {
            Value::Null(kind) => prop_assert_eq!(result, Value::Null(*kind)),
            Value::Empty if !b.is_null() => prop_assert_eq!(result, Value::Empty),
            _ => {}
        }
    }

    #[test]
    fn subscript_is_total_over_random_lists(items in prop::collection::vec(any::<i64>(), 0..8), index in -20i64..20) {
        let mut arena = ExprArena::new();
        let list = {
            let ids = items.iter().map(|i| arena.constant(*i)).collect();
            arena.list(ids)
        };
        let key = arena.constant(index);
        let expr = arena.subscript(list, key);
        let mut ctx = BasicContext::default();
        let result = arena.eval(expr, &mut ctx);
        let len = items.len() as i64;
        if index >= -len && index < len {
            let effective = if index < 0 { len + index } else { index } as usize;
            prop_assert_eq!(result, Value::Int(items[effective]));
        } else {
            prop_assert!(result.is_bad_null());
        }
    }
}
