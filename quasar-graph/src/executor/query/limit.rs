use quasar_types::types::DataSet;

use super::{input_dataset, publish};
use crate::context::QueryContext;
use crate::plan::PlanNode;
use crate::ExecutionError;

pub(crate) fn execute(
    node: &PlanNode,
    offset: usize,
    count: usize,
    qctx: &mut QueryContext,
) -> Result<(), ExecutionError> {
    let input = input_dataset(node, qctx)?;
    let mut output = DataSet::new(input.col_names.clone());
    output.rows = input
        .rows
        .iter()
        .skip(offset)
        .take(count)
        .cloned()
        .collect();
    publish(node, qctx, output);
    Ok(())
}
