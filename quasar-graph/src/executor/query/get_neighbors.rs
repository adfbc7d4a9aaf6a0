use quasar_client::storage::{GetNeighborsSpec, PropDef};
use quasar_types::types::{DataSet, Value};

use super::{input_dataset, publish};
use crate::context::{QueryContext, RowContext};
use crate::plan::{GetNeighborsNode, PlanNode};
use crate::ExecutionError;

pub(crate) fn prop_defs(props: &Option<Vec<(String, Vec<String>)>>) -> Option<Vec<PropDef>> {
    props.as_ref().map(|list| {
        list.iter()
            .map(|(name, props)| PropDef {
                name: name.clone(),
                props: props.clone(),
            })
            .collect()
    })
}

/// Evaluates the source expression over every input row, dedups while
/// preserving first-seen order, and returns the vids.
pub(crate) fn gather_vids(
    node: &PlanNode,
    src: quasar_expr::ExprId,
    qctx: &QueryContext,
) -> Result<Vec<Value>, ExecutionError> {
    let input = input_dataset(node, qctx)?;
    let mut seen = quasar_types::ahash::AHashSet::new();
    let mut vids = vec![];
    for row in &input.rows {
        let mut ctx = RowContext::new(&input.col_names, row);
        let vid = qctx.expr_arena.eval(src, &mut ctx);
        if vid.is_null() || vid.is_empty_value() {
            continue;
        }
        if seen.insert(vid.clone()) {
            vids.push(vid);
        }
    }
    Ok(vids)
}

pub(crate) async fn execute(
    node: &PlanNode,
    payload: &GetNeighborsNode,
    qctx: &mut QueryContext,
) -> Result<(), ExecutionError> {
    let vids = gather_vids(node, payload.src, qctx)?;

    let spec = GetNeighborsSpec {
        edge_types: payload.edge_types.clone(),
        direction: Some(payload.direction),
        vertex_props: prop_defs(&payload.vertex_props),
        edge_props: prop_defs(&payload.edge_props),
        stat_props: payload.stat_props.clone(),
        dedup: payload.dedup,
        random: payload.random,
        limit: payload.limit,
        order_by: payload.order_by.clone(),
        filter: payload.filter.map(|f| qctx.expr_arena.encode(f)),
    };

    let response = qctx
        .client
        .get_neighbors(&payload.space, vids, spec)
        .await?;

    let mut merged = merge_responses(response.responses)?;
    if let Some(filter) = payload.first_step_filter {
        merged = apply_edge_filter(merged, filter, qctx);
    }
    publish(node, qctx, merged);
    Ok(())
}

/// Per-host responses share one column layout; concatenate their rows.
pub(crate) fn merge_responses(responses: Vec<DataSet>) -> Result<DataSet, ExecutionError> {
    let mut iter = responses.into_iter();
    let Some(mut merged) = iter.next() else {
        return Ok(DataSet::default());
    };
    for dataset in iter {
        if dataset.col_names != merged.col_names {
            return Err(ExecutionError::Semantic(
                "storage hosts returned mismatching neighbor columns".to_string(),
            ));
        }
        merged.rows.extend(dataset.rows);
    }
    Ok(merged)
}

/// Drops edge entries failing the filter; rows keep their vertex part even
/// when every edge is filtered out.
fn apply_edge_filter(dataset: DataSet, filter: quasar_expr::ExprId, qctx: &QueryContext) -> DataSet {
    let empty_row = quasar_types::types::Row::default();
    let vid_col = dataset.col_names.iter().position(|c| c == "_vid");
    let edge_cols: Vec<usize> = dataset
        .col_names
        .iter()
        .enumerate()
        .filter(|(_, name)| name.starts_with("_edge:"))
        .map(|(i, _)| i)
        .collect();

    let mut out = DataSet::new(dataset.col_names.clone());
    for mut row in dataset.rows {
        let src = vid_col
            .and_then(|i| row.values.get(i))
            .cloned()
            .unwrap_or(Value::Empty);
        for &col in &edge_cols {
            let Some(Value::List(entries)) = row.values.get(col) else {
                continue;
            };
            let retained: Vec<Value> = entries
                .iter()
                .filter(|entry| {
                    let Some(edge) =
                        crate::iterator::edge_from_cell_entry(&dataset.col_names[col], &src, entry)
                    else {
                        return false;
                    };
                    let mut ctx =
                        RowContext::new(&dataset.col_names, &empty_row).with_edge(edge);
                    qctx.expr_arena.eval(filter, &mut ctx) == Value::Bool(true)
                })
                .cloned()
                .collect();
            row.values[col] = Value::List(retained);
        }
        out.push(row);
    }
    out
}
