use quasar_types::ahash::AHashSet;
use quasar_types::types::DataSet;

use super::{input_dataset, publish};
use crate::context::QueryContext;
use crate::plan::PlanNode;
use crate::ExecutionError;

/// Drops duplicate rows by full-row equality, keeping first occurrences in
/// input order.
pub(crate) fn execute(node: &PlanNode, qctx: &mut QueryContext) -> Result<(), ExecutionError> {
    let input = input_dataset(node, qctx)?;
    let mut seen = AHashSet::new();
    let mut output = DataSet::new(input.col_names.clone());
    for row in &input.rows {
        if seen.insert(row.clone()) {
            output.push(row.clone());
        }
    }
    publish(node, qctx, output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use quasar_types::types::{Row, Value};

    use super::*;
    use crate::executor::query::tests::{latest_rows, test_qctx};
    use crate::plan::{NodeKind, PlanArena, PlanNodeBuilder};

    #[test]
    fn keeps_first_occurrence_in_order() {
        let mut qctx = test_qctx();
        let mut input = DataSet::new(vec!["v".to_string()]);
        for i in [3i64, 1, 3, 2, 1] {
            input.push(Row::new(vec![Value::Int(i)]));
        }
        qctx.ectx.publish("in", Value::DataSet(Box::new(input)));

        let mut plan = PlanArena::new();
        let node_id = PlanNodeBuilder::new(NodeKind::Dedup)
            .input("in")
            .output("out")
            .add_to(&mut plan);

        execute(plan.node(node_id), &mut qctx).unwrap();
        assert_eq!(
            latest_rows(&qctx, "out"),
            vec![
                vec![Value::Int(3)],
                vec![Value::Int(1)],
                vec![Value::Int(2)]
            ]
        );
    }
}
