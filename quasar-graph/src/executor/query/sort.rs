use std::cmp::Ordering;

use quasar_types::types::{DataSet, Row};

use super::{input_dataset, publish};
use crate::context::QueryContext;
use crate::plan::{OrderDirection, PlanNode};
use crate::ExecutionError;

fn compare(factors: &[(usize, OrderDirection)], a: &Row, b: &Row) -> Ordering {
    for (index, direction) in factors {
        let ordering = match (a.values.get(*index), b.values.get(*index)) {
            (Some(x), Some(y)) => x.cmp(y),
            (None, None) => Ordering::Equal,
            (None, _) => Ordering::Less,
            (_, None) => Ordering::Greater,
        };
        let ordering = match direction {
            OrderDirection::Asc => ordering,
            OrderDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn check_factors(
    factors: &[(usize, OrderDirection)],
    width: usize,
) -> Result<(), ExecutionError> {
    for (index, _) in factors {
        if *index >= width {
            return Err(ExecutionError::ColumnOutOfRange {
                index: *index,
                width,
            });
        }
    }
    Ok(())
}

/// Stable sort by the given (column, direction) factors.
pub(crate) fn execute_sort(
    node: &PlanNode,
    factors: &[(usize, OrderDirection)],
    qctx: &mut QueryContext,
) -> Result<(), ExecutionError> {
    let input = input_dataset(node, qctx)?;
    check_factors(factors, input.col_names.len())?;
    let mut output = input.clone();
    output.rows.sort_by(|a, b| compare(factors, a, b));
    publish(node, qctx, output);
    Ok(())
}

/// Sort, then keep `count` rows starting at `offset`.
pub(crate) fn execute_top_n(
    node: &PlanNode,
    factors: &[(usize, OrderDirection)],
    offset: usize,
    count: usize,
    qctx: &mut QueryContext,
) -> Result<(), ExecutionError> {
    let input = input_dataset(node, qctx)?;
    check_factors(factors, input.col_names.len())?;
    let mut rows = input.rows.clone();
    rows.sort_by(|a, b| compare(factors, a, b));
    let rows: Vec<Row> = rows.into_iter().skip(offset).take(count).collect();
    let mut output = DataSet::new(input.col_names.clone());
    output.rows = rows;
    publish(node, qctx, output);
    Ok(())
}
