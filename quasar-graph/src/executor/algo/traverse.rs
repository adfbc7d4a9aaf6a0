use std::collections::HashMap;

use quasar_types::ahash::AHashSet;
use quasar_types::types::{DataSet, Path, Row, Step, Value, Vertex};

use crate::context::{QueryContext, RowContext};
use crate::executor::query::{input_dataset, publish};
use crate::plan::{PlanNode, TraverseNode};
use crate::ExecutionError;

/// Variable-length expansion: BFS from the source vids, materializing every
/// path whose length lands in `[min_step, max_step]`. The adjacency list
/// grows one storage round-trip per step; vertices are revisited only
/// across different paths, a single path never cycles.
pub(crate) async fn execute(
    node: &PlanNode,
    payload: &TraverseNode,
    qctx: &mut QueryContext,
) -> Result<(), ExecutionError> {
    let input = input_dataset(node, qctx)?;

    // Prior paths by their dst vid, when this traversal continues a match.
    let mut prior: HashMap<Value, Vec<Path>> = HashMap::new();
    let mut starts: Vec<Value> = vec![];
    let mut seen = AHashSet::new();
    for row in &input.rows {
        let mut ctx = RowContext::new(&input.col_names, row);
        let vid = qctx.expr_arena.eval(payload.src, &mut ctx);
        if vid.is_null() || vid.is_empty_value() {
            continue;
        }
        if payload.track_prev_path {
            if let Some(Value::Path(path)) = row
                .values
                .iter()
                .find(|v| matches!(v, Value::Path(_)))
            {
                prior.entry(vid.clone()).or_default().push(*path.clone());
            }
        }
        if seen.insert(vid.clone()) {
            starts.push(vid);
        }
    }

    let mut current: Vec<Path> = starts
        .iter()
        .flat_map(|vid| match prior.remove(vid) {
            Some(paths) => paths,
            None => vec![Path::new(Vertex::new(vid.clone(), vec![]))],
        })
        .collect();

    let mut emitted: Vec<Path> = vec![];
    if payload.min_step == 0 {
        emitted.extend(current.iter().cloned());
    }

    for step in 1..=payload.max_step {
        let frontier: Vec<Value> = {
            let mut dedup = AHashSet::new();
            current
                .iter()
                .map(|p| p.dst().vid.clone())
                .filter(|vid| dedup.insert(vid.clone()))
                .collect()
        };
        if frontier.is_empty() {
            break;
        }

        let (adjacency, vertices) = super::expand(
            qctx,
            &payload.space,
            frontier,
            &payload.edge_types,
            payload.direction,
        )
        .await?;

        let mut next: Vec<Path> = vec![];
        for path in &current {
            let from = &path.dst().vid;
            let Some(edges) = adjacency.get(from) else {
                continue;
            };
            for edge in edges {
                if path.contains_vertex(&edge.dst) {
                    continue;
                }
                if let Some(filter) = payload.step_filter {
                    let empty = Row::default();
                    let mut ctx = RowContext::new(&[], &empty)
                        .with_edge(Value::Edge(Box::new(edge.clone())));
                    if qctx.expr_arena.eval(filter, &mut ctx) != Value::Bool(true) {
                        continue;
                    }
                }
                let dst_vertex = match vertices.get(&edge.dst) {
                    Some(Value::Vertex(v)) => (**v).clone(),
                    _ => Vertex::new(edge.dst.clone(), vec![]),
                };
                let mut extended = path.clone();
                extended.append(Step {
                    dst: dst_vertex,
                    etype: edge.etype,
                    name: edge.name.clone(),
                    rank: edge.rank,
                    props: edge.props.clone(),
                });
                next.push(extended);
            }
        }

        if step >= payload.min_step {
            emitted.extend(next.iter().cloned());
        }
        current = next;
        if current.is_empty() {
            break;
        }
    }

    let col_names = if node.col_names.is_empty() {
        vec!["_path".to_string()]
    } else {
        node.col_names.clone()
    };
    let mut output = DataSet::new(col_names);
    for path in emitted {
        output.push(Row::new(vec![Value::Path(Box::new(path))]));
    }
    publish(node, qctx, output);
    Ok(())
}
