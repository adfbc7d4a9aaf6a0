use quasar_types::indexmap::IndexMap;
use quasar_types::types::{DataSet, Row, Value};

use quasar_expr::aggregate::Aggregator;
use quasar_expr::{Expr, ExprId};

use super::{input_dataset, publish};
use crate::context::{QueryContext, RowContext};
use crate::plan::{PlanNode, YieldColumn};
use crate::ExecutionError;

/// Grouped aggregation. Groups keep first-seen order; accumulators live
/// per (group, item) for the duration of this node and are dropped at
/// emission. A group item either wraps an aggregate call or is a plain
/// expression over the group key (its first-row value is kept).
pub(crate) fn execute(
    node: &PlanNode,
    group_keys: &[ExprId],
    group_items: &[YieldColumn],
    qctx: &mut QueryContext,
) -> Result<(), ExecutionError> {
    enum ItemState {
        Agg { arg: ExprId, acc: Aggregator },
        Plain { first: Option<Value> },
    }

    let input = input_dataset(node, qctx)?;
    let mut groups: IndexMap<Vec<Value>, Vec<ItemState>> = IndexMap::new();

    for row in &input.rows {
        let mut ctx = RowContext::new(&input.col_names, row);
        let key: Vec<Value> = group_keys
            .iter()
            .map(|k| qctx.expr_arena.eval(*k, &mut ctx))
            .collect();

        let states = groups.entry(key).or_insert_with(|| {
            group_items
                .iter()
                .map(|item| match qctx.expr_arena.node(item.expr) {
                    Expr::Aggregate { kind, arg } => ItemState::Agg {
                        arg: *arg,
                        acc: Aggregator::new(kind.func, kind.distinct),
                    },
                    _ => ItemState::Plain { first: None },
                })
                .collect()
        });

        for (item, state) in group_items.iter().zip(states.iter_mut()) {
            match state {
                ItemState::Agg { arg, acc } => {
                    let value = qctx.expr_arena.eval(*arg, &mut ctx);
                    acc.apply(&value);
                }
                ItemState::Plain { first } => {
                    if first.is_none() {
                        *first = Some(qctx.expr_arena.eval(item.expr, &mut ctx));
                    }
                }
            }
        }
    }

    let col_names: Vec<String> = if node.col_names.is_empty() {
        group_items.iter().map(|c| c.name.clone()).collect()
    } else {
        node.col_names.clone()
    };
    let mut output = DataSet::new(col_names);
    for (_, states) in groups {
        let values = states
            .into_iter()
            .map(|state| match state {
                ItemState::Agg { acc, .. } => acc.result(),
                ItemState::Plain { first } => first.unwrap_or(Value::Empty),
            })
            .collect();
        output.push(Row::new(values));
    }
    publish(node, qctx, output);
    Ok(())
}
