use quasar_expr::ExprId;
use quasar_types::types::{DataSet, Value};

use super::{input_dataset, publish};
use crate::context::{QueryContext, RowContext};
use crate::plan::PlanNode;
use crate::ExecutionError;

/// Keeps rows whose condition evaluates to exactly `true`; NULL and Empty
/// verdicts drop the row. Input order is preserved (`need_stable` is a
/// planner promise this implementation always honors).
pub(crate) fn execute(
    node: &PlanNode,
    condition: ExprId,
    _need_stable: bool,
    qctx: &mut QueryContext,
) -> Result<(), ExecutionError> {
    let input = input_dataset(node, qctx)?;
    let mut output = DataSet::new(input.col_names.clone());
    for row in &input.rows {
        let mut ctx = RowContext::new(&input.col_names, row);
        if qctx.expr_arena.eval(condition, &mut ctx) == Value::Bool(true) {
            output.push(row.clone());
        }
    }
    publish(node, qctx, output);
    Ok(())
}
