use quasar_types::ahash::AHashSet;
use quasar_types::types::DataSet;

use super::publish;
use crate::context::QueryContext;
use crate::plan::{PlanNode, SetOpKind};
use crate::ExecutionError;

/// Union concatenates (duplicate elimination is an explicit Dedup node);
/// Intersect and Minus compare by full-row equality.
pub(crate) fn execute(
    node: &PlanNode,
    op: SetOpKind,
    left_var: &str,
    right_var: &str,
    qctx: &mut QueryContext,
) -> Result<(), ExecutionError> {
    let left = qctx.ectx.latest_dataset(left_var)?;
    let right = qctx.ectx.latest_dataset(right_var)?;
    if left.col_names.len() != right.col_names.len() {
        return Err(ExecutionError::Semantic(format!(
            "set operation arms have different widths: {} vs {}",
            left.col_names.len(),
            right.col_names.len()
        )));
    }

    let mut output = DataSet::new(left.col_names.clone());
    match op {
        SetOpKind::Union => {
            output.rows = left.rows.iter().chain(&right.rows).cloned().collect();
        }
        SetOpKind::Intersect => {
            let keep: AHashSet<_> = right.rows.iter().cloned().collect();
            output.rows = left
                .rows
                .iter()
                .filter(|row| keep.contains(*row))
                .cloned()
                .collect();
        }
        SetOpKind::Minus => {
            let drop: AHashSet<_> = right.rows.iter().cloned().collect();
            output.rows = left
                .rows
                .iter()
                .filter(|row| !drop.contains(*row))
                .cloned()
                .collect();
        }
    }
    publish(node, qctx, output);
    Ok(())
}
