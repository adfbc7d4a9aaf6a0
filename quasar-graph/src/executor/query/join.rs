use std::collections::HashMap;

use quasar_types::types::{DataSet, Row, Value};

use super::publish;
use crate::context::{QueryContext, RowContext};
use crate::plan::{JoinKind, JoinNode, PlanNode};
use crate::ExecutionError;

/// Hash join: build on the right variable, probe with the left. Rows with a
/// NULL in any key never match (three-valued equality), which also keeps
/// them out of a left join's matched side.
pub(crate) fn execute(
    node: &PlanNode,
    payload: &JoinNode,
    qctx: &mut QueryContext,
) -> Result<(), ExecutionError> {
    let left = qctx.ectx.latest_dataset(&payload.left_var)?;
    let right = qctx.ectx.latest_dataset(&payload.right_var)?;

    let mut build: HashMap<Vec<Value>, Vec<&Row>> = HashMap::new();
    for row in &right.rows {
        let mut ctx = RowContext::new(&right.col_names, row);
        let key: Vec<Value> = payload
            .probe_keys
            .iter()
            .map(|k| qctx.expr_arena.eval(*k, &mut ctx))
            .collect();
        if key.iter().any(|v| v.is_null() || v.is_empty_value()) {
            continue;
        }
        build.entry(key).or_default().push(row);
    }

    let mut col_names = left.col_names.clone();
    col_names.extend(right.col_names.iter().cloned());
    let right_width = right.col_names.len();

    let mut output = DataSet::new(col_names);
    for row in &left.rows {
        let mut ctx = RowContext::new(&left.col_names, row);
        let key: Vec<Value> = payload
            .hash_keys
            .iter()
            .map(|k| qctx.expr_arena.eval(*k, &mut ctx))
            .collect();
        let matches = if key.iter().any(|v| v.is_null() || v.is_empty_value()) {
            None
        } else {
            build.get(&key)
        };
        match matches {
            Some(matched) => {
                for other in matched {
                    let mut values = row.values.clone();
                    values.extend(other.values.iter().cloned());
                    output.push(Row::new(values));
                }
            }
            None => {
                if payload.kind == JoinKind::Left {
                    let mut values = row.values.clone();
                    values.extend(std::iter::repeat(Value::NULL).take(right_width));
                    output.push(Row::new(values));
                }
            }
        }
    }
    publish(node, qctx, output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use quasar_expr::Expr;

    use super::*;
    use crate::executor::query::tests::{latest_rows, test_qctx};
    use crate::plan::{NodeKind, PlanArena, PlanNodeBuilder};

    fn setup(kind: JoinKind) -> Vec<Vec<Value>> {
        let mut qctx = test_qctx();

        let mut left = DataSet::new(vec!["id".to_string(), "name".to_string()]);
        left.push(Row::new(vec![Value::Int(1), Value::from("alice")]));
        left.push(Row::new(vec![Value::Int(2), Value::from("bob")]));
        left.push(Row::new(vec![Value::Int(3), Value::from("carol")]));
        qctx.ectx.publish("l", Value::DataSet(Box::new(left)));

        let mut right = DataSet::new(vec!["id".to_string(), "age".to_string()]);
        right.push(Row::new(vec![Value::Int(1), Value::Int(29)]));
        right.push(Row::new(vec![Value::Int(3), Value::Int(35)]));
        qctx.ectx.publish("r", Value::DataSet(Box::new(right)));

        let hash = qctx.expr_arena.add(Expr::InputProp { col: "id".into() });
        let probe = qctx.expr_arena.add(Expr::InputProp { col: "id".into() });
        let payload = JoinNode {
            kind,
            left_var: "l".to_string(),
            right_var: "r".to_string(),
            hash_keys: vec![hash],
            probe_keys: vec![probe],
        };

        let mut plan = PlanArena::new();
        let node_id = PlanNodeBuilder::new(NodeKind::Join(payload.clone()))
            .input("l")
            .input("r")
            .output("out")
            .add_to(&mut plan);
        execute(plan.node(node_id), &payload, &mut qctx).unwrap();
        latest_rows(&qctx, "out")
    }

    #[test]
    fn inner_join_keeps_matches_only() {
        assert_eq!(
            setup(JoinKind::Inner),
            vec![
                vec![
                    Value::Int(1),
                    Value::from("alice"),
                    Value::Int(1),
                    Value::Int(29)
                ],
                vec![
                    Value::Int(3),
                    Value::from("carol"),
                    Value::Int(3),
                    Value::Int(35)
                ],
            ]
        );
    }

    #[test]
    fn left_join_pads_missing_matches_with_null() {
        let rows = setup(JoinKind::Left);
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[1],
            vec![
                Value::Int(2),
                Value::from("bob"),
                Value::NULL,
                Value::NULL
            ]
        );
    }
}
