use quasar_types::ahash::AHashSet;
use quasar_types::types::{DataSet, Row, Value};

use super::publish;
use crate::context::QueryContext;
use crate::plan::{CollectKind, PlanNode};
use crate::ExecutionError;

/// Final coalescer. Depending on its kind it concatenates the latest
/// datasets of its input vars, a step window of one var's history, the
/// distinct vertices/edges of a subgraph expansion, or merged path rows.
pub(crate) fn execute(
    node: &PlanNode,
    kind: CollectKind,
    m_to_n: Option<(usize, usize)>,
    distinct: bool,
    qctx: &mut QueryContext,
) -> Result<(), ExecutionError> {
    let mut output = DataSet::new(node.col_names.clone());
    match kind {
        CollectKind::RowBasedMove => {
            for var in &node.input_vars {
                let input = qctx.ectx.latest_dataset(var)?;
                if output.col_names.is_empty() {
                    output.col_names = input.col_names.clone();
                }
                output.rows.extend(input.rows.iter().cloned());
            }
        }
        CollectKind::MToN => {
            let var = node.input_vars.first().ok_or_else(|| {
                ExecutionError::Semantic("M-to-N collect needs an input var".to_string())
            })?;
            let (m, n) = m_to_n.unwrap_or((1, usize::MAX));
            for (step, value) in qctx.ectx.history(var).iter().enumerate() {
                let step = step + 1;
                if step < m || step > n {
                    continue;
                }
                if let Value::DataSet(ds) = value {
                    if output.col_names.is_empty() {
                        output.col_names = ds.col_names.clone();
                    }
                    output.rows.extend(ds.rows.iter().cloned());
                }
            }
        }
        CollectKind::Subgraph => {
            let mut vertices = vec![];
            let mut edges = vec![];
            let mut seen_vertices = AHashSet::new();
            let mut seen_edges = AHashSet::new();
            for var in &node.input_vars {
                for value in qctx.ectx.history(var) {
                    let Value::DataSet(ds) = value else { continue };
                    for row in &ds.rows {
                        for cell in &row.values {
                            collect_graph_values(
                                cell,
                                &mut vertices,
                                &mut edges,
                                &mut seen_vertices,
                                &mut seen_edges,
                            );
                        }
                    }
                }
            }
            output.col_names = vec!["_vertices".to_string(), "_edges".to_string()];
            output.push(Row::new(vec![Value::List(vertices), Value::List(edges)]));
        }
        CollectKind::BfsShortest
        | CollectKind::AllPaths
        | CollectKind::MultiplePairShortest => {
            for var in &node.input_vars {
                let input = qctx.ectx.latest_dataset(var)?;
                if output.col_names.is_empty() {
                    output.col_names = input.col_names.clone();
                }
                output.rows.extend(input.rows.iter().cloned());
            }
        }
    }

    if distinct {
        let mut seen = AHashSet::new();
        output.rows.retain(|row| seen.insert(row.clone()));
    }
    publish(node, qctx, output);
    Ok(())
}

fn collect_graph_values(
    value: &Value,
    vertices: &mut Vec<Value>,
    edges: &mut Vec<Value>,
    seen_vertices: &mut AHashSet<Value>,
    seen_edges: &mut AHashSet<Value>,
) {
    match value {
        Value::Vertex(v) => {
            if seen_vertices.insert(v.vid.clone()) {
                vertices.push(value.clone());
            }
        }
        Value::Edge(_) => {
            if seen_edges.insert(value.clone()) {
                edges.push(value.clone());
            }
        }
        Value::Path(path) => {
            let src = Value::Vertex(Box::new(path.src.clone()));
            collect_graph_values(&src, vertices, edges, seen_vertices, seen_edges);
            for step in &path.steps {
                let dst = Value::Vertex(Box::new(step.dst.clone()));
                collect_graph_values(&dst, vertices, edges, seen_vertices, seen_edges);
            }
        }
        Value::List(items) => {
            for item in items {
                collect_graph_values(item, vertices, edges, seen_vertices, seen_edges);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use quasar_types::types::{Tag, Vertex};

    use super::*;
    use crate::executor::query::tests::{latest_rows, test_qctx};
    use crate::plan::{NodeKind, PlanArena, PlanNodeBuilder};

    fn dataset(values: &[i64]) -> DataSet {
        let mut ds = DataSet::new(vec!["v".to_string()]);
        for v in values {
            ds.push(Row::new(vec![Value::Int(*v)]));
        }
        ds
    }

    fn collect_node(kind: CollectKind, inputs: &[&str]) -> (PlanArena, crate::plan::NodeId) {
        let mut plan = PlanArena::new();
        let mut builder = PlanNodeBuilder::new(NodeKind::DataCollect {
            kind,
            m_to_n: None,
            distinct: false,
        })
        .output("out");
        for var in inputs {
            builder = builder.input(*var);
        }
        let id = builder.add_to(&mut plan);
        (plan, id)
    }

    #[test]
    fn row_based_move_concatenates_inputs() {
        let mut qctx = test_qctx();
        qctx.ectx
            .publish("a", Value::DataSet(Box::new(dataset(&[1, 2]))));
        qctx.ectx
            .publish("b", Value::DataSet(Box::new(dataset(&[3]))));
        let (plan, id) = collect_node(CollectKind::RowBasedMove, &["a", "b"]);
        execute(plan.node(id), CollectKind::RowBasedMove, None, false, &mut qctx).unwrap();
        assert_eq!(latest_rows(&qctx, "out").len(), 3);
    }

    #[test]
    fn m_to_n_reads_the_step_history() {
        let mut qctx = test_qctx();
        for step in 1..=4i64 {
            qctx.ectx
                .publish("steps", Value::DataSet(Box::new(dataset(&[step]))));
        }
        let (plan, id) = collect_node(CollectKind::MToN, &["steps"]);
        execute(plan.node(id), CollectKind::MToN, Some((2, 3)), false, &mut qctx).unwrap();
        assert_eq!(
            latest_rows(&qctx, "out"),
            vec![vec![Value::Int(2)], vec![Value::Int(3)]]
        );
    }

    #[test]
    fn subgraph_dedups_vertices_by_vid() {
        let mut qctx = test_qctx();
        let v1 = Value::Vertex(Box::new(Vertex::new(Value::from("v1"), vec![])));
        let v1_tagged = Value::Vertex(Box::new(Vertex::new(
            Value::from("v1"),
            vec![Tag::new("person", Default::default())],
        )));
        let mut ds = DataSet::new(vec!["v".to_string()]);
        ds.push(Row::new(vec![v1]));
        ds.push(Row::new(vec![v1_tagged]));
        qctx.ectx.publish("g", Value::DataSet(Box::new(ds)));

        let (plan, id) = collect_node(CollectKind::Subgraph, &["g"]);
        execute(plan.node(id), CollectKind::Subgraph, None, false, &mut qctx).unwrap();
        let rows = latest_rows(&qctx, "out");
        assert_eq!(rows.len(), 1);
        match &rows[0][0] {
            Value::List(vertices) => assert_eq!(vertices.len(), 1),
            other => panic!("expected vertex list, got {other:?}"),
        }
    }

    #[test]
    fn distinct_drops_duplicate_rows() {
        let mut qctx = test_qctx();
        qctx.ectx
            .publish("a", Value::DataSet(Box::new(dataset(&[1, 1, 2]))));
        let (plan, id) = collect_node(CollectKind::AllPaths, &["a"]);
        execute(plan.node(id), CollectKind::AllPaths, None, true, &mut qctx).unwrap();
        assert_eq!(latest_rows(&qctx, "out").len(), 2);
    }
}
