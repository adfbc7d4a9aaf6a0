use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future;
use quasar_types::config::GraphConfig;
use quasar_types::tracing::{debug, warn};
use quasar_types::types::{DataSet, Value};
use quasar_stats::Metrics;

use crate::host::HostAddr;
use crate::meta::{MetaInfo, PartitionId, SpaceInfo};
use crate::router::{LeaderCache, Router};
use crate::storage::{
    AddEdgesRequest, AddVerticesRequest, ErrorCode, FailureClass, GetNeighborsRequest,
    GetNeighborsSpec, GetPropsRequest, GetPropsSpec, NewEdge, NewVertex, PartitionedRequest,
    PropTarget, StorageResponse, StorageTransport, UpdateEdgeRequest, UpdateVertexRequest,
};
use crate::ClientError;

/// Merged outcome of one fan-out: the per-host payloads that succeeded and
/// the partitions that did not.
#[derive(Clone, Debug)]
pub struct StorageRpcResponse<T> {
    pub responses: Vec<T>,
    pub failed_parts: HashMap<PartitionId, ErrorCode>,
}

impl<T> StorageRpcResponse<T> {
    pub fn is_complete(&self) -> bool {
        self.failed_parts.is_empty()
    }
}

/// Clusters batches by owning host, dispatches every per-host RPC in
/// parallel, and reassembles the responses. On `LeaderChanged` the moved
/// partitions are retried exactly once against the new leader (after
/// updating the shared leader cache); the retry budget is per-part, not
/// per-host.
pub struct StorageClient {
    transport: Arc<dyn StorageTransport>,
    meta: Arc<MetaInfo>,
    leader_cache: Arc<LeaderCache>,
    config: Arc<GraphConfig>,
    metrics: Arc<Metrics>,
}

impl StorageClient {
    pub fn new(
        transport: Arc<dyn StorageTransport>,
        meta: Arc<MetaInfo>,
        leader_cache: Arc<LeaderCache>,
        config: Arc<GraphConfig>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            transport,
            meta,
            leader_cache,
            config,
            metrics,
        }
    }

    pub fn router_for(&self, space: &Arc<SpaceInfo>) -> Router {
        Router::new(space.clone(), self.leader_cache.clone())
    }

    pub async fn get_neighbors(
        &self,
        space_name: &str,
        vids: Vec<Value>,
        spec: GetNeighborsSpec,
    ) -> Result<StorageRpcResponse<DataSet>, ClientError> {
        let space = self.meta.space(space_name)?;
        let router = self.router_for(&space);
        let clusters = router.cluster_by_host(vids, |vid| vid)?;
        let requests: HashMap<HostAddr, GetNeighborsRequest> = clusters
            .into_iter()
            .map(|(host, parts)| {
                (
                    host,
                    GetNeighborsRequest {
                        space: space.id,
                        parts,
                        spec: spec.clone(),
                    },
                )
            })
            .collect();
        let response = self
            .collect(requests, |transport, host, req| async move {
                transport.get_neighbors(&host, req).await
            })
            .await;
        self.finish("get_neighbors", response)
    }

    pub async fn get_props(
        &self,
        space_name: &str,
        targets: Vec<PropTarget>,
        spec: GetPropsSpec,
    ) -> Result<StorageRpcResponse<DataSet>, ClientError> {
        let space = self.meta.space(space_name)?;
        let router = self.router_for(&space);
        let clusters = router.cluster_by_host(targets, |t| t.routing_key())?;
        let requests: HashMap<HostAddr, GetPropsRequest> = clusters
            .into_iter()
            .map(|(host, parts)| {
                (
                    host,
                    GetPropsRequest {
                        space: space.id,
                        parts,
                        spec: spec.clone(),
                    },
                )
            })
            .collect();
        let response = self
            .collect(requests, |transport, host, req| async move {
                transport.get_props(&host, req).await
            })
            .await;
        self.finish("get_props", response)
    }

    pub async fn add_vertices(
        &self,
        space_name: &str,
        vertices: Vec<NewVertex>,
        overwritable: bool,
    ) -> Result<StorageRpcResponse<()>, ClientError> {
        let space = self.meta.space(space_name)?;
        let router = self.router_for(&space);
        let clusters = router.cluster_by_host(vertices, |v| &v.vid)?;
        let requests: HashMap<HostAddr, AddVerticesRequest> = clusters
            .into_iter()
            .map(|(host, parts)| {
                (
                    host,
                    AddVerticesRequest {
                        space: space.id,
                        parts,
                        overwritable,
                    },
                )
            })
            .collect();
        let response = self
            .collect(requests, |transport, host, req| async move {
                transport.add_vertices(&host, req).await
            })
            .await;
        self.finish("add_vertices", response)
    }

    pub async fn add_edges(
        &self,
        space_name: &str,
        edges: Vec<NewEdge>,
        overwritable: bool,
    ) -> Result<StorageRpcResponse<()>, ClientError> {
        let space = self.meta.space(space_name)?;
        let router = self.router_for(&space);
        let clusters = router.cluster_by_host(edges, |e| &e.key.src)?;
        let requests: HashMap<HostAddr, AddEdgesRequest> = clusters
            .into_iter()
            .map(|(host, parts)| {
                (
                    host,
                    AddEdgesRequest {
                        space: space.id,
                        parts,
                        overwritable,
                    },
                )
            })
            .collect();
        let response = self
            .collect(requests, |transport, host, req| async move {
                transport.add_edges(&host, req).await
            })
            .await;
        self.finish("add_edges", response)
    }

    pub async fn update_vertex(
        &self,
        space_name: &str,
        mut req: UpdateVertexRequest,
    ) -> Result<StorageRpcResponse<DataSet>, ClientError> {
        let space = self.meta.space(space_name)?;
        let router = self.router_for(&space);
        req.space = space.id;
        req.part = router.partition_id(&req.vid)?;
        let host = router.leader_of(req.part)?;
        let response = self
            .collect(HashMap::from([(host, req)]), |transport, host, req| async move {
                transport.update_vertex(&host, req).await
            })
            .await;
        self.finish("update_vertex", response)
    }

    pub async fn update_edge(
        &self,
        space_name: &str,
        mut req: UpdateEdgeRequest,
    ) -> Result<StorageRpcResponse<DataSet>, ClientError> {
        let space = self.meta.space(space_name)?;
        let router = self.router_for(&space);
        req.space = space.id;
        req.part = router.partition_id(&req.key.src)?;
        let host = router.leader_of(req.part)?;
        let response = self
            .collect(HashMap::from([(host, req)]), |transport, host, req| async move {
                transport.update_edge(&host, req).await
            })
            .await;
        self.finish("update_edge", response)
    }

    /// The shared dispatch-and-merge path. `rpc` is invoked once per host
    /// for the initial round and once per moved host for the retry round.
    async fn collect<Req, T, F, Fut>(
        &self,
        requests: HashMap<HostAddr, Req>,
        rpc: F,
    ) -> StorageRpcResponse<T>
    where
        Req: PartitionedRequest,
        F: Fn(Arc<dyn StorageTransport>, HostAddr, Req) -> Fut + Copy,
        Fut: Future<Output = Result<StorageResponse<T>, ClientError>>,
    {
        self.metrics.counter("storage_client.batches").incr();

        let mut responses = vec![];
        let mut failed_parts: HashMap<PartitionId, ErrorCode> = HashMap::new();
        // (new leader, original request, moved parts)
        let mut retries: Vec<(HostAddr, Req, Vec<PartitionId>)> = vec![];

        let timeout = Duration::from_millis(self.config.storage_rpc_timeout_ms);
        let round = requests.into_iter().map(|(host, req)| {
            let transport = self.transport.clone();
            async move {
                let result = call_with_timeout(timeout, rpc(transport, host.clone(), req.clone()))
                    .await;
                (host, req, result)
            }
        });
        for (host, req, result) in future::join_all(round).await {
            self.metrics.counter("storage_client.rpcs").incr();
            match result {
                Ok(response) => {
                    if let Some(payload) = response.payload {
                        responses.push(payload);
                    }
                    let mut moved: HashMap<HostAddr, Vec<PartitionId>> = HashMap::new();
                    for part in response.part_results {
                        match part.code {
                            ErrorCode::Succeeded => {}
                            ErrorCode::LeaderChanged => match part.leader {
                                Some(leader) => {
                                    moved.entry(leader).or_default().push(part.part_id)
                                }
                                None => {
                                    failed_parts.insert(part.part_id, ErrorCode::LeaderChanged);
                                }
                            },
                            code => {
                                failed_parts.insert(part.part_id, code);
                            }
                        }
                    }
                    for (leader, parts) in moved {
                        // Teach the router about the move before retrying.
                        for part in &parts {
                            self.leader_cache.update(req.space(), *part, leader.clone());
                        }
                        retries.push((leader, req.clone(), parts));
                    }
                }
                Err(error) => {
                    warn!("storage rpc to {host} failed: {error}");
                    self.metrics.counter("storage_client.rpc_failures").incr();
                    for part in req.part_ids() {
                        failed_parts.insert(part, ErrorCode::RpcFailure);
                    }
                }
            }
        }

        if !retries.is_empty() {
            let retry_round = retries.into_iter().map(|(leader, req, parts)| {
                let transport = self.transport.clone();
                let subset = req.subset(&parts);
                debug!("retrying parts {parts:?} on new leader {leader}");
                async move {
                    let result =
                        call_with_timeout(timeout, rpc(transport, leader.clone(), subset.clone()))
                            .await;
                    (leader, subset, result)
                }
            });
            for (_leader, subset, result) in future::join_all(retry_round).await {
                self.metrics.counter("storage_client.rpc_retries").incr();
                match result {
                    Ok(response) => {
                        if let Some(payload) = response.payload {
                            responses.push(payload);
                        }
                        for part in response.part_results {
                            if part.code != ErrorCode::Succeeded {
                                // Retried once already; surface the failure.
                                failed_parts.insert(part.part_id, part.code);
                            }
                        }
                    }
                    Err(error) => {
                        warn!("storage retry rpc failed: {error}");
                        for part in subset.part_ids() {
                            failed_parts.insert(part, ErrorCode::RpcFailure);
                        }
                    }
                }
            }
        }

        StorageRpcResponse {
            responses,
            failed_parts,
        }
    }

    /// Applies the partial-success policy. Fatal codes abort regardless of
    /// the flag.
    fn finish<T>(
        &self,
        what: &str,
        response: StorageRpcResponse<T>,
    ) -> Result<StorageRpcResponse<T>, ClientError> {
        if response.failed_parts.is_empty() {
            return Ok(response);
        }
        let fatal = response
            .failed_parts
            .values()
            .any(|code| code.classify() == FailureClass::Fatal);
        if fatal || !self.config.accept_partial_success {
            return Err(ClientError::PartialFailure(response.failed_parts.len()));
        }
        warn!(
            "{what}: tolerating {} failed partition(s): {:?}",
            response.failed_parts.len(),
            response.failed_parts
        );
        Ok(response)
    }
}

/// Timeouts are enforced here, per RPC; nodes above have no timeout of
/// their own.
async fn call_with_timeout<T>(
    timeout: Duration,
    call: impl Future<Output = Result<StorageResponse<T>, ClientError>>,
) -> Result<StorageResponse<T>, ClientError> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Timeout(timeout.as_millis() as u64)),
    }
}
