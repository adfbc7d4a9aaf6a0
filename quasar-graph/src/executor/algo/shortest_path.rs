use std::collections::HashMap;

use futures::future;
use quasar_client::storage::{Direction, GetPropsSpec, PropTarget};
use quasar_types::ahash::AHashSet;
use quasar_types::types::{DataSet, Path, Row, Step, Value, Vertex};

use crate::context::QueryContext;
use crate::executor::query::get_vertices::rows_to_vertices;
use crate::executor::query::{input_dataset, publish};
use crate::plan::{PlanNode, ShortestPathNode};
use crate::ExecutionError;

/// Bidirectional BFS. Input rows carry `[src, dst]` pairs; pairs are split
/// into `num_path_thread` batches that run concurrently. The two frontiers
/// expand alternately; a meeting after both sides expanded the same number
/// of steps leaves the meeting vertex unmaterialized on either side, so
/// those vids go through one final `get_props`. Odd meetings reuse the
/// vertex the last expansion already materialized.
pub(crate) async fn execute(
    node: &PlanNode,
    payload: &ShortestPathNode,
    qctx: &mut QueryContext,
) -> Result<(), ExecutionError> {
    let input = input_dataset(node, qctx)?;
    // Pairs come positionally: the planner always lays out `[src, dst]`.
    let mut pairs: Vec<(Value, Value)> = vec![];
    for row in &input.rows {
        let (Some(src), Some(dst)) = (row.values.first(), row.values.get(1)) else {
            continue;
        };
        if src.is_null() || src.is_empty_value() || dst.is_null() || dst.is_empty_value() {
            continue;
        }
        if src == dst {
            continue;
        }
        pairs.push((src.clone(), dst.clone()));
    }

    let batches = split_batches(pairs, qctx.config.num_path_thread.max(1));
    let shared: &QueryContext = qctx;
    let jobs = batches.into_iter().map(|batch| async move {
        let mut found = vec![];
        for (src, dst) in batch {
            let paths = pair_shortest(shared, payload, src, dst).await?;
            found.extend(paths);
        }
        Ok::<Vec<Path>, ExecutionError>(found)
    });
    let results = future::join_all(jobs).await;

    let col_names = if node.col_names.is_empty() {
        vec!["_path".to_string()]
    } else {
        node.col_names.clone()
    };
    let mut output = DataSet::new(col_names);
    for result in results {
        for path in result? {
            output.push(Row::new(vec![Value::Path(Box::new(path))]));
        }
    }
    publish(node, qctx, output);
    Ok(())
}

fn split_batches<T>(items: Vec<T>, batches: usize) -> Vec<Vec<T>> {
    let per_batch = items.len().div_ceil(batches.max(1)).max(1);
    let mut out: Vec<Vec<T>> = vec![];
    let mut batch = Vec::with_capacity(per_batch);
    for item in items {
        batch.push(item);
        if batch.len() == per_batch {
            out.push(std::mem::take(&mut batch));
        }
    }
    if !batch.is_empty() {
        out.push(batch);
    }
    out
}

/// All shortest paths (or the first, when `single_shortest`) between one
/// pair, up to `max_step` edges.
async fn pair_shortest(
    qctx: &QueryContext,
    payload: &ShortestPathNode,
    src: Value,
    dst: Value,
) -> Result<Vec<Path>, ExecutionError> {
    // Paths from src to the keyed vid / from the keyed vid to dst.
    let mut left: HashMap<Value, Vec<Path>> =
        HashMap::from([(src.clone(), vec![Path::new(Vertex::new(src.clone(), vec![]))])]);
    let mut right: HashMap<Value, Vec<Path>> =
        HashMap::from([(dst.clone(), vec![Path::new(Vertex::new(dst.clone(), vec![]))])]);
    let mut left_frontier = vec![src.clone()];
    let mut right_frontier = vec![dst.clone()];
    let mut materialized: HashMap<Value, Value> = HashMap::new();
    let mut left_steps = 0usize;
    let mut right_steps = 0usize;

    for _ in 0..payload.max_step {
        // Expand the smaller side; ties expand the left.
        let expand_left = left_frontier.len() <= right_frontier.len();
        let (frontier, direction) = if expand_left {
            (std::mem::take(&mut left_frontier), Direction::Out)
        } else {
            (std::mem::take(&mut right_frontier), Direction::In)
        };
        if frontier.is_empty() {
            break;
        }

        let (adjacency, vertices) = super::expand(
            qctx,
            &payload.space,
            frontier.clone(),
            &payload.edge_types,
            direction,
        )
        .await?;
        materialized.extend(vertices);

        let visited = if expand_left {
            left_steps += 1;
            &mut left
        } else {
            right_steps += 1;
            &mut right
        };

        let mut next_frontier = AHashSet::new();
        let mut discovered: Vec<(Value, Path)> = vec![];
        for from in &frontier {
            let Some(edges) = adjacency.get(from) else {
                continue;
            };
            let from_paths = visited.get(from).cloned().unwrap_or_default();
            for edge in edges {
                for path in &from_paths {
                    if path.contains_vertex(&edge.dst) {
                        continue;
                    }
                    let mut extended = path.clone();
                    extended.append(Step {
                        dst: Vertex::new(edge.dst.clone(), vec![]),
                        etype: edge.etype,
                        name: edge.name.clone(),
                        rank: edge.rank,
                        props: edge.props.clone(),
                    });
                    discovered.push((edge.dst.clone(), extended));
                }
            }
        }
        for (vid, path) in discovered {
            let entry = visited.entry(vid.clone()).or_default();
            if entry.is_empty() || entry[0].len() == path.len() {
                entry.push(path);
                next_frontier.insert(vid);
            }
        }
        if expand_left {
            left_frontier = next_frontier.into_iter().collect();
        } else {
            right_frontier = next_frontier.into_iter().collect();
        }

        // Meeting check: vids known to both sides.
        let meets: Vec<Value> = left
            .keys()
            .filter(|vid| right.contains_key(*vid))
            .cloned()
            .collect();
        if !meets.is_empty() {
            let even_meeting = left_steps == right_steps;
            let meeting_vertices =
                materialize_meets(qctx, payload, &meets, &materialized, even_meeting).await?;
            let mut paths = assemble(&left, &right, &meets, &meeting_vertices);
            if payload.single_shortest {
                paths.truncate(1);
            }
            return Ok(paths);
        }
        if left_frontier.is_empty() && right_frontier.is_empty() {
            break;
        }
    }
    Ok(vec![])
}

/// Even-step meetings never saw the meeting vertex as an expansion source,
/// so its properties come from one final `get_props`.
async fn materialize_meets(
    qctx: &QueryContext,
    payload: &ShortestPathNode,
    meets: &[Value],
    materialized: &HashMap<Value, Value>,
    even_meeting: bool,
) -> Result<HashMap<Value, Vertex>, ExecutionError> {
    let mut out = HashMap::new();
    let mut missing = vec![];
    for vid in meets {
        match materialized.get(vid) {
            Some(Value::Vertex(v)) if !even_meeting => {
                out.insert(vid.clone(), (**v).clone());
            }
            _ => missing.push(vid.clone()),
        }
    }
    if !missing.is_empty() {
        let targets = missing.iter().cloned().map(PropTarget::Vertex).collect();
        let response = qctx
            .client
            .get_props(&payload.space, targets, GetPropsSpec::default())
            .await?;
        for dataset in &response.responses {
            for vertex in rows_to_vertices(dataset) {
                if let Value::Vertex(v) = vertex {
                    out.insert(v.vid.clone(), *v);
                }
            }
        }
    }
    Ok(out)
}

fn assemble(
    left: &HashMap<Value, Vec<Path>>,
    right: &HashMap<Value, Vec<Path>>,
    meets: &[Value],
    meeting_vertices: &HashMap<Value, Vertex>,
) -> Vec<Path> {
    let mut out = vec![];
    for meet in meets {
        let (Some(left_paths), Some(right_paths)) = (left.get(meet), right.get(meet)) else {
            continue;
        };
        for lp in left_paths {
            for rp in right_paths {
                let mut path = lp.clone();
                // Swap in the materialized meeting vertex.
                if let Some(vertex) = meeting_vertices.get(meet) {
                    if let Some(last) = path.steps.last_mut() {
                        last.dst = vertex.clone();
                    } else {
                        path.src = vertex.clone();
                    }
                }
                path.steps.extend(reverse_steps(rp));
                out.push(path);
            }
        }
    }
    out
}

/// A right-side path runs dst → … → meet following reversed edges; flip it
/// into meet → … → dst steps.
fn reverse_steps(path: &Path) -> Vec<Step> {
    let mut out = vec![];
    for (index, step) in path.steps.iter().enumerate().rev() {
        let target = if index == 0 {
            path.src.clone()
        } else {
            path.steps[index - 1].dst.clone()
        };
        out.push(Step {
            dst: target,
            etype: -step.etype,
            name: step.name.clone(),
            rank: step.rank,
            props: step.props.clone(),
        });
    }
    out
}
