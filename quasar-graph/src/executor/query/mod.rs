pub mod aggregate;
pub mod data_collect;
pub mod dedup;
pub mod filter;
pub mod get_edges;
pub mod get_neighbors;
pub mod get_vertices;
pub mod join;
pub mod limit;
pub mod project;
pub mod set_op;
pub mod sort;

use quasar_types::types::{DataSet, Value};

use crate::context::QueryContext;
use crate::plan::PlanNode;
use crate::ExecutionError;

/// Most row-wise executors read exactly one input dataset.
pub(crate) fn input_dataset<'a>(
    node: &PlanNode,
    qctx: &'a QueryContext,
) -> Result<&'a DataSet, ExecutionError> {
    let var = node
        .input_vars
        .first()
        .ok_or_else(|| ExecutionError::Semantic(format!("node {} has no input var", node.id)))?;
    qctx.ectx.latest_dataset(var)
}

pub(crate) fn publish(node: &PlanNode, qctx: &mut QueryContext, dataset: DataSet) {
    qctx.ectx
        .publish(node.output_var.clone(), Value::DataSet(Box::new(dataset)));
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use quasar_client::fanout::StorageClient;
    use quasar_client::host::HostAddr;
    use quasar_client::meta::{MetaInfo, SchemaCache, SpaceInfo, VidKind};
    use quasar_client::router::LeaderCache;
    use quasar_client::storage::{
        AddEdgesRequest, AddVerticesRequest, GetNeighborsRequest, GetPropsRequest,
        StorageResponse, StorageTransport, UpdateEdgeRequest, UpdateVertexRequest,
    };
    use quasar_client::ClientError;
    use quasar_stats::Metrics;
    use quasar_types::config::GraphConfig;
    use quasar_types::types::{DataSet, Value};

    use crate::context::{ExecutionContext, QueryContext};

    /// Row-wise executor tests never reach storage.
    struct UnreachableTransport;

    #[async_trait]
    impl StorageTransport for UnreachableTransport {
        async fn get_neighbors(
            &self,
            _host: &HostAddr,
            _req: GetNeighborsRequest,
        ) -> Result<StorageResponse<DataSet>, ClientError> {
            unreachable!("row-wise test hit storage")
        }

        async fn get_props(
            &self,
            _host: &HostAddr,
            _req: GetPropsRequest,
        ) -> Result<StorageResponse<DataSet>, ClientError> {
            unreachable!("row-wise test hit storage")
        }

        async fn add_vertices(
            &self,
            _host: &HostAddr,
            _req: AddVerticesRequest,
        ) -> Result<StorageResponse<()>, ClientError> {
            unreachable!("row-wise test hit storage")
        }

        async fn add_edges(
            &self,
            _host: &HostAddr,
            _req: AddEdgesRequest,
        ) -> Result<StorageResponse<()>, ClientError> {
            unreachable!("row-wise test hit storage")
        }

        async fn update_vertex(
            &self,
            _host: &HostAddr,
            _req: UpdateVertexRequest,
        ) -> Result<StorageResponse<DataSet>, ClientError> {
            unreachable!("row-wise test hit storage")
        }

        async fn update_edge(
            &self,
            _host: &HostAddr,
            _req: UpdateEdgeRequest,
        ) -> Result<StorageResponse<DataSet>, ClientError> {
            unreachable!("row-wise test hit storage")
        }
    }

    pub(crate) fn test_qctx() -> QueryContext {
        let meta = Arc::new(MetaInfo::new());
        meta.add_space(SpaceInfo {
            id: 1,
            name: "test".to_string(),
            part_count: 1,
            leaders: HashMap::from([(1, vec![HostAddr::new("a", 9779)])]),
            vid_kind: VidKind::FixedString,
            vid_len: 8,
        });
        let config = Arc::new(GraphConfig::default());
        let metrics = Arc::new(Metrics::new());
        let client = Arc::new(StorageClient::new(
            Arc::new(UnreachableTransport),
            meta.clone(),
            Arc::new(LeaderCache::new()),
            config.clone(),
            metrics.clone(),
        ));
        QueryContext {
            ectx: ExecutionContext::new(),
            expr_arena: quasar_expr::ExprArena::new(),
            client,
            meta,
            schemas: Arc::new(SchemaCache::new()),
            config,
            metrics,
            current_space: "test".to_string(),
        }
    }

    pub(crate) fn latest_rows(qctx: &QueryContext, var: &str) -> Vec<Vec<Value>> {
        qctx.ectx
            .latest_dataset(var)
            .unwrap()
            .rows
            .iter()
            .map(|r| r.values.clone())
            .collect()
    }
}
