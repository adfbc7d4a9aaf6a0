use quasar_client::storage::{EdgeKey, GetPropsSpec, PropTarget};
use quasar_types::types::{DataSet, Edge, PropertyMap, Row, Value};

use super::get_neighbors::prop_defs;
use super::{input_dataset, publish};
use crate::context::{QueryContext, RowContext};
use crate::plan::{GetEdgesNode, PlanNode};
use crate::ExecutionError;

/// Fetches edge properties for `(src, type, rank, dst)` keys evaluated from
/// the input rows and materializes edge values. The response layout is
/// `_src`, `_type`, `_rank`, `_dst` followed by the requested properties in
/// request order.
pub(crate) async fn execute(
    node: &PlanNode,
    payload: &GetEdgesNode,
    qctx: &mut QueryContext,
) -> Result<(), ExecutionError> {
    let input = input_dataset(node, qctx)?;
    let mut targets = vec![];
    for row in &input.rows {
        let mut ctx = RowContext::new(&input.col_names, row);
        let src = qctx.expr_arena.eval(payload.src, &mut ctx);
        let etype = qctx.expr_arena.eval(payload.etype, &mut ctx);
        let rank = qctx.expr_arena.eval(payload.rank, &mut ctx);
        let dst = qctx.expr_arena.eval(payload.dst, &mut ctx);
        let (Some(etype), Some(rank)) = (etype.as_int(), rank.as_int()) else {
            continue;
        };
        if src.is_null() || src.is_empty_value() || dst.is_null() || dst.is_empty_value() {
            continue;
        }
        targets.push(PropTarget::Edge(EdgeKey {
            src,
            edge_type: etype as i32,
            rank,
            dst,
        }));
    }

    let spec = GetPropsSpec {
        edge_props: prop_defs(&payload.edge_props),
        dedup: payload.dedup,
        ..GetPropsSpec::default()
    };
    let response = qctx.client.get_props(&payload.space, targets, spec).await?;

    let edge_name = payload
        .edge_props
        .as_ref()
        .and_then(|props| props.first())
        .map(|(name, _)| name.clone())
        .unwrap_or_default();
    let prop_names: Vec<String> = payload
        .edge_props
        .as_ref()
        .and_then(|props| props.first())
        .map(|(_, names)| names.clone())
        .unwrap_or_default();

    let col_names = if node.col_names.is_empty() {
        vec!["_edges".to_string()]
    } else {
        node.col_names.clone()
    };
    let mut output = DataSet::new(col_names);
    for dataset in response.responses {
        let src_col = dataset.col_names.iter().position(|c| c == "_src");
        let type_col = dataset.col_names.iter().position(|c| c == "_type");
        let rank_col = dataset.col_names.iter().position(|c| c == "_rank");
        let dst_col = dataset.col_names.iter().position(|c| c == "_dst");
        let first_prop = 4;
        for row in &dataset.rows {
            let fetch = |col: Option<usize>| {
                col.and_then(|i| row.values.get(i)).cloned().unwrap_or(Value::Empty)
            };
            let etype = match fetch(type_col) {
                Value::Int(t) if t < 0 => -1,
                _ => 1,
            };
            let rank = fetch(rank_col).as_int().unwrap_or(0);
            let mut props = PropertyMap::new();
            for (offset, prop) in prop_names.iter().enumerate() {
                if let Some(value) = row.values.get(first_prop + offset) {
                    props.insert(prop.clone(), value.clone());
                }
            }
            output.push(Row::new(vec![Value::Edge(Box::new(Edge::new(
                edge_name.clone(),
                fetch(src_col),
                fetch(dst_col),
                rank,
                etype,
                props,
            )))]));
        }
    }
    publish(node, qctx, output);
    Ok(())
}
