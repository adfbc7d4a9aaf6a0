pub mod shortest_path;
pub mod traverse;

use std::collections::HashMap;

use quasar_client::storage::{Direction, GetNeighborsSpec};
use quasar_types::types::{Edge, Value};

use crate::context::QueryContext;
use crate::iterator::GetNeighborsIter;
use crate::ExecutionError;

/// One neighborhood expansion: returns the adjacency of the frontier and
/// the materialized source vertices, parsed from the merged responses.
pub(crate) async fn expand(
    qctx: &QueryContext,
    space: &str,
    frontier: Vec<Value>,
    edge_types: &[i32],
    direction: Direction,
) -> Result<(HashMap<Value, Vec<Edge>>, HashMap<Value, Value>), ExecutionError> {
    let spec = GetNeighborsSpec {
        edge_types: edge_types.to_vec(),
        direction: Some(direction),
        ..GetNeighborsSpec::default()
    };
    let response = qctx.client.get_neighbors(space, frontier, spec).await?;

    let mut adjacency: HashMap<Value, Vec<Edge>> = HashMap::new();
    let mut vertices: HashMap<Value, Value> = HashMap::new();
    let mut iter = GetNeighborsIter::new(response.responses);
    while let Some(entry) = iter.next() {
        if let Value::Vertex(v) = &entry.vertex {
            vertices.insert(v.vid.clone(), entry.vertex.clone());
        }
        if let Some(Value::Edge(edge)) = entry.edge {
            adjacency.entry(edge.src.clone()).or_default().push(*edge);
        }
    }
    Ok((adjacency, vertices))
}
