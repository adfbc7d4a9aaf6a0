use quasar_types::types::{DataSet, Row};

use super::{input_dataset, publish};
use crate::context::{QueryContext, RowContext};
use crate::plan::{PlanNode, YieldColumn};
use crate::ExecutionError;

/// Evaluates the yield columns against every input row.
pub(crate) fn execute(
    node: &PlanNode,
    columns: &[YieldColumn],
    qctx: &mut QueryContext,
) -> Result<(), ExecutionError> {
    let input = input_dataset(node, qctx)?;
    let col_names: Vec<String> = if node.col_names.is_empty() {
        columns.iter().map(|c| c.name.clone()).collect()
    } else {
        node.col_names.clone()
    };
    let mut output = DataSet::new(col_names);
    for row in &input.rows {
        let mut ctx = RowContext::new(&input.col_names, row);
        let values = columns
            .iter()
            .map(|col| qctx.expr_arena.eval(col.expr, &mut ctx))
            .collect();
        output.push(Row::new(values));
    }
    publish(node, qctx, output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use quasar_expr::{ArithOp, Expr};
    use quasar_types::types::Value;

    use super::*;
    use crate::executor::query::tests::{latest_rows, test_qctx};
    use crate::plan::{NodeKind, PlanArena, PlanNodeBuilder};

    #[test]
    fn projects_expressions_per_row() {
        let mut qctx = test_qctx();
        let mut input = DataSet::new(vec!["v".to_string()]);
        for i in [1i64, 2] {
            input.push(Row::new(vec![Value::Int(i)]));
        }
        qctx.ectx.publish("in", Value::DataSet(Box::new(input)));

        let v = qctx.expr_arena.add(Expr::InputProp { col: "v".into() });
        let ten = qctx.expr_arena.constant(10i64);
        let scaled = qctx.expr_arena.arithmetic(ArithOp::Mul, v, ten);
        let columns = vec![YieldColumn {
            expr: scaled,
            name: "scaled".to_string(),
        }];

        let mut plan = PlanArena::new();
        let node_id = PlanNodeBuilder::new(NodeKind::Project {
            columns: columns.clone(),
        })
        .input("in")
        .output("out")
        .add_to(&mut plan);

        execute(plan.node(node_id), &columns, &mut qctx).unwrap();
        assert_eq!(
            latest_rows(&qctx, "out"),
            vec![vec![Value::Int(10)], vec![Value::Int(20)]]
        );
        assert_eq!(
            qctx.ectx.latest_dataset("out").unwrap().col_names,
            vec!["scaled".to_string()]
        );
    }
}
