pub mod algo;
pub mod query;

use std::collections::HashSet;

use futures::future::BoxFuture;
use quasar_types::tracing::debug;

use crate::context::QueryContext;
use crate::plan::{NodeId, NodeKind, PlanArena};
use crate::ExecutionError;

/// Walks the plan: every dependency completes before its dependent runs,
/// shared dependencies run once. Node results are published into the
/// query's variable table; cancellation is dropping the returned future
/// (storage RPCs are the only suspension points, and nothing is published
/// until a node finishes).
pub struct Executor<'a> {
    plan: &'a PlanArena,
    qctx: &'a mut QueryContext,
    finished: HashSet<NodeId>,
}

impl<'a> Executor<'a> {
    pub fn new(plan: &'a PlanArena, qctx: &'a mut QueryContext) -> Self {
        Self {
            plan,
            qctx,
            finished: HashSet::new(),
        }
    }

    pub async fn execute(&mut self, root: NodeId) -> Result<(), ExecutionError> {
        self.execute_node(root).await
    }

    fn execute_node(&mut self, id: NodeId) -> BoxFuture<'_, Result<(), ExecutionError>> {
        Box::pin(async move {
            if self.finished.contains(&id) {
                return Ok(());
            }
            for dep in self.plan.node(id).dependencies.clone() {
                self.execute_node(dep).await?;
            }

            let node = self.plan.node(id);
            debug!("executing node {} -> {}", node.id, node.output_var);
            match &node.kind {
                NodeKind::Start => Ok(()),
                NodeKind::GetNeighbors(payload) => {
                    query::get_neighbors::execute(node, payload, self.qctx).await
                }
                NodeKind::GetVertices(payload) => {
                    query::get_vertices::execute(node, payload, self.qctx).await
                }
                NodeKind::GetEdges(payload) => {
                    query::get_edges::execute(node, payload, self.qctx).await
                }
                NodeKind::Filter {
                    condition,
                    need_stable,
                } => query::filter::execute(node, *condition, *need_stable, self.qctx),
                NodeKind::Project { columns } => query::project::execute(node, columns, self.qctx),
                NodeKind::Aggregate {
                    group_keys,
                    group_items,
                } => query::aggregate::execute(node, group_keys, group_items, self.qctx),
                NodeKind::Sort { factors } => query::sort::execute_sort(node, factors, self.qctx),
                NodeKind::TopN {
                    factors,
                    offset,
                    count,
                } => query::sort::execute_top_n(node, factors, *offset, *count, self.qctx),
                NodeKind::Limit { offset, count } => {
                    query::limit::execute(node, *offset, *count, self.qctx)
                }
                NodeKind::Dedup => query::dedup::execute(node, self.qctx),
                NodeKind::SetOp { op, left_var, right_var } => {
                    query::set_op::execute(node, *op, left_var, right_var, self.qctx)
                }
                NodeKind::Join(payload) => query::join::execute(node, payload, self.qctx),
                NodeKind::Traverse(payload) => {
                    algo::traverse::execute(node, payload, self.qctx).await
                }
                NodeKind::ShortestPath(payload) => {
                    algo::shortest_path::execute(node, payload, self.qctx).await
                }
                NodeKind::DataCollect {
                    kind,
                    m_to_n,
                    distinct,
                } => query::data_collect::execute(node, *kind, *m_to_n, *distinct, self.qctx),
                NodeKind::SwitchSpace { space } => {
                    self.qctx.meta.space(space)?;
                    self.qctx.current_space = space.clone();
                    Ok(())
                }
            }?;

            self.finished.insert(id);
            Ok(())
        })
    }
}
