use std::collections::HashMap;

use async_trait::async_trait;
use quasar_types::types::{DataSet, PropertyMap, Value};

use crate::host::HostAddr;
use crate::meta::{EdgeType, PartitionId, SpaceId};
use crate::ClientError;

/// Per-partition failure codes carried in every storage response.
/// `RpcFailure` is synthesized client-side when a whole host call fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Succeeded,
    LeaderChanged,
    PartNotFound,
    KeyNotFound,
    DataInvalid,
    WriteConflict,
    RpcFailure,
}

/// What the fan-out layer does about a failure code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureClass {
    /// Update the router cache and retry once against the new leader.
    LeaderChanged,
    /// Worth retrying elsewhere or later.
    Transient,
    /// Tolerable when partial success is accepted.
    PartialSuccess,
    /// Abort the batch.
    Fatal,
}

impl ErrorCode {
    pub fn classify(self) -> FailureClass {
        match self {
            ErrorCode::Succeeded => FailureClass::PartialSuccess,
            ErrorCode::LeaderChanged => FailureClass::LeaderChanged,
            ErrorCode::PartNotFound => FailureClass::Transient,
            ErrorCode::KeyNotFound => FailureClass::PartialSuccess,
            ErrorCode::DataInvalid => FailureClass::Fatal,
            ErrorCode::WriteConflict => FailureClass::Fatal,
            ErrorCode::RpcFailure => FailureClass::Transient,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PartResult {
    pub part_id: PartitionId,
    pub code: ErrorCode,
    /// Set on `LeaderChanged`: where the partition moved.
    pub leader: Option<HostAddr>,
}

/// One host's reply: a payload plus per-partition results.
#[derive(Clone, Debug)]
pub struct StorageResponse<T> {
    pub payload: Option<T>,
    pub part_results: Vec<PartResult>,
    pub latency_us: u64,
}

impl<T> StorageResponse<T> {
    pub fn ok(payload: T, parts: impl IntoIterator<Item = PartitionId>) -> Self {
        Self {
            payload: Some(payload),
            part_results: parts
                .into_iter()
                .map(|part_id| PartResult {
                    part_id,
                    code: ErrorCode::Succeeded,
                    leader: None,
                })
                .collect(),
            latency_us: 0,
        }
    }
}

/// A request the fan-out can split per partition for targeted retries.
pub trait PartitionedRequest: Clone + Send + 'static {
    fn space(&self) -> SpaceId;
    fn part_ids(&self) -> Vec<PartitionId>;
    fn subset(&self, parts: &[PartitionId]) -> Self;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Out,
    In,
    Both,
}

/// Which properties of a tag or edge a read should return.
#[derive(Clone, Debug)]
pub struct PropDef {
    pub name: String,
    pub props: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct GetNeighborsSpec {
    pub edge_types: Vec<EdgeType>,
    pub direction: Option<Direction>,
    pub vertex_props: Option<Vec<PropDef>>,
    pub edge_props: Option<Vec<PropDef>>,
    pub stat_props: Option<Vec<String>>,
    pub dedup: bool,
    pub random: bool,
    pub limit: Option<i64>,
    pub order_by: Vec<(String, bool)>,
    /// Pushed-down filter in expression binary form.
    pub filter: Option<Vec<u8>>,
}

#[derive(Clone, Debug)]
pub struct GetNeighborsRequest {
    pub space: SpaceId,
    pub parts: HashMap<PartitionId, Vec<Value>>,
    pub spec: GetNeighborsSpec,
}

#[derive(Clone, Debug, Default)]
pub struct GetPropsSpec {
    pub vertex_props: Option<Vec<PropDef>>,
    pub edge_props: Option<Vec<PropDef>>,
    pub dedup: bool,
    pub limit: Option<i64>,
    pub order_by: Vec<(String, bool)>,
    pub filter: Option<Vec<u8>>,
}

/// A property read targets either a vertex (by vid) or an edge (by key).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropTarget {
    Vertex(Value),
    Edge(EdgeKey),
}

impl PropTarget {
    /// The id the router partitions by: the vid, or the edge's source.
    pub fn routing_key(&self) -> &Value {
        match self {
            PropTarget::Vertex(vid) => vid,
            PropTarget::Edge(key) => &key.src,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GetPropsRequest {
    pub space: SpaceId,
    pub parts: HashMap<PartitionId, Vec<PropTarget>>,
    pub spec: GetPropsSpec,
}

#[derive(Clone, Debug)]
pub struct NewVertex {
    pub vid: Value,
    pub tags: Vec<(String, PropertyMap)>,
}

#[derive(Clone, Debug)]
pub struct AddVerticesRequest {
    pub space: SpaceId,
    pub parts: HashMap<PartitionId, Vec<NewVertex>>,
    pub overwritable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    pub src: Value,
    pub edge_type: EdgeType,
    pub rank: i64,
    pub dst: Value,
}

#[derive(Clone, Debug)]
pub struct NewEdge {
    pub key: EdgeKey,
    pub props: PropertyMap,
}

#[derive(Clone, Debug)]
pub struct AddEdgesRequest {
    pub space: SpaceId,
    pub parts: HashMap<PartitionId, Vec<NewEdge>>,
    pub overwritable: bool,
}

/// `SET prop = <expression>`; the expression travels in binary form and is
/// evaluated storage-side against the current row.
#[derive(Clone, Debug)]
pub struct UpdateItem {
    pub prop: String,
    pub value: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct UpdateVertexRequest {
    pub space: SpaceId,
    pub part: PartitionId,
    pub vid: Value,
    pub tag: String,
    pub condition: Option<Vec<u8>>,
    pub update_items: Vec<UpdateItem>,
    pub return_cols: Vec<String>,
    pub insertable: bool,
}

#[derive(Clone, Debug)]
pub struct UpdateEdgeRequest {
    pub space: SpaceId,
    pub part: PartitionId,
    pub key: EdgeKey,
    pub condition: Option<Vec<u8>>,
    pub update_items: Vec<UpdateItem>,
    pub return_cols: Vec<String>,
    pub insertable: bool,
}

macro_rules! partitioned_by_parts_map {
    ($request:ty, $field:ident) => {
        impl PartitionedRequest for $request {
            fn space(&self) -> SpaceId {
                self.space
            }

            fn part_ids(&self) -> Vec<PartitionId> {
                self.$field.keys().copied().collect()
            }

            fn subset(&self, parts: &[PartitionId]) -> Self {
                let mut subset = self.clone();
                subset.$field.retain(|part, _| parts.contains(part));
                subset
            }
        }
    };
}

partitioned_by_parts_map!(GetNeighborsRequest, parts);
partitioned_by_parts_map!(GetPropsRequest, parts);
partitioned_by_parts_map!(AddVerticesRequest, parts);
partitioned_by_parts_map!(AddEdgesRequest, parts);

impl PartitionedRequest for UpdateVertexRequest {
    fn space(&self) -> SpaceId {
        self.space
    }

    fn part_ids(&self) -> Vec<PartitionId> {
        vec![self.part]
    }

    fn subset(&self, _parts: &[PartitionId]) -> Self {
        self.clone()
    }
}

impl PartitionedRequest for UpdateEdgeRequest {
    fn space(&self) -> SpaceId {
        self.space
    }

    fn part_ids(&self) -> Vec<PartitionId> {
        vec![self.part]
    }

    fn subset(&self, _parts: &[PartitionId]) -> Self {
        self.clone()
    }
}

/// The transport seam. Production wires this to the storage service's RPC
/// stack; tests plug an in-process mock.
#[async_trait]
pub trait StorageTransport: Send + Sync {
    async fn get_neighbors(
        &self,
        host: &HostAddr,
        req: GetNeighborsRequest,
    ) -> Result<StorageResponse<DataSet>, ClientError>;

    async fn get_props(
        &self,
        host: &HostAddr,
        req: GetPropsRequest,
    ) -> Result<StorageResponse<DataSet>, ClientError>;

    async fn add_vertices(
        &self,
        host: &HostAddr,
        req: AddVerticesRequest,
    ) -> Result<StorageResponse<()>, ClientError>;

    async fn add_edges(
        &self,
        host: &HostAddr,
        req: AddEdgesRequest,
    ) -> Result<StorageResponse<()>, ClientError>;

    async fn update_vertex(
        &self,
        host: &HostAddr,
        req: UpdateVertexRequest,
    ) -> Result<StorageResponse<DataSet>, ClientError>;

    async fn update_edge(
        &self,
        host: &HostAddr,
        req: UpdateEdgeRequest,
    ) -> Result<StorageResponse<DataSet>, ClientError>;
}
