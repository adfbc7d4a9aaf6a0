use quasar_client::storage::{GetPropsSpec, PropTarget};
use quasar_types::types::{DataSet, PropertyMap, Row, Tag, Value, Vertex};

use super::get_neighbors::{gather_vids, prop_defs};
use super::publish;
use crate::context::QueryContext;
use crate::plan::{GetVerticesNode, PlanNode};
use crate::ExecutionError;

/// Fetches vertex properties and materializes one vertex value per
/// response row. The response layout is `_vid` plus one `_tag:` column per
/// requested tag, the same convention the neighbors iterator parses.
pub(crate) async fn execute(
    node: &PlanNode,
    payload: &GetVerticesNode,
    qctx: &mut QueryContext,
) -> Result<(), ExecutionError> {
    let vids = gather_vids(node, payload.vid, qctx)?;
    let targets = vids.into_iter().map(PropTarget::Vertex).collect();

    let spec = GetPropsSpec {
        vertex_props: prop_defs(&payload.vertex_props),
        dedup: payload.dedup,
        ..GetPropsSpec::default()
    };
    let response = qctx.client.get_props(&payload.space, targets, spec).await?;

    let col_names = if node.col_names.is_empty() {
        vec!["_vertices".to_string()]
    } else {
        node.col_names.clone()
    };
    let mut output = DataSet::new(col_names);
    for dataset in response.responses {
        for row in rows_to_vertices(&dataset) {
            output.push(Row::new(vec![row]));
        }
    }
    publish(node, qctx, output);
    Ok(())
}

pub(crate) fn rows_to_vertices(dataset: &DataSet) -> Vec<Value> {
    let vid_col = dataset.col_names.iter().position(|c| c == "_vid");
    let tag_cols: Vec<(usize, String, Vec<String>)> = dataset
        .col_names
        .iter()
        .enumerate()
        .filter_map(|(index, name)| {
            let rest = name.strip_prefix("_tag:")?;
            let (tag, props) = rest.split_once(':').unwrap_or((rest, ""));
            let props = if props.is_empty() {
                vec![]
            } else {
                props.split(',').map(|s| s.to_string()).collect()
            };
            Some((index, tag.to_string(), props))
        })
        .collect();

    dataset
        .rows
        .iter()
        .map(|row| {
            let vid = vid_col
                .and_then(|i| row.values.get(i))
                .cloned()
                .unwrap_or(Value::Empty);
            let mut tags = vec![];
            for (index, tag_name, prop_names) in &tag_cols {
                if let Some(Value::List(values)) = row.values.get(*index) {
                    let mut props = PropertyMap::new();
                    for (prop, value) in prop_names.iter().zip(values) {
                        props.insert(prop.clone(), value.clone());
                    }
                    tags.push(Tag::new(tag_name.clone(), props));
                }
            }
            Value::Vertex(Box::new(Vertex::new(vid, tags)))
        })
        .collect()
}
