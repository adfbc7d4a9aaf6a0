use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use quasar_client::fanout::StorageClient;
use quasar_client::host::HostAddr;
use quasar_client::meta::{MetaInfo, SpaceInfo, VidKind};
use quasar_client::router::LeaderCache;
use quasar_client::storage::{
    AddEdgesRequest, AddVerticesRequest, ErrorCode, GetNeighborsRequest, GetNeighborsSpec,
    GetPropsRequest, NewVertex, PartResult, StorageResponse, StorageTransport,
    UpdateEdgeRequest, UpdateVertexRequest,
};
use quasar_client::ClientError;
use quasar_stats::Metrics;
use quasar_types::config::GraphConfig;
use quasar_types::parking_lot::Mutex;
use quasar_types::types::{DataSet, Row, Value};

fn test_space() -> SpaceInfo {
    let a = HostAddr::new("a", 9779);
    let b = HostAddr::new("b", 9779);
    let c = HostAddr::new("c", 9779);
    SpaceInfo {
        id: 1,
        name: "test".to_string(),
        part_count: 4,
        leaders: HashMap::from([
            (1, vec![a.clone()]),
            (2, vec![b]),
            (3, vec![a]),
            (4, vec![c]),
        ]),
        vid_kind: VidKind::Int64,
        vid_len: 8,
    }
}

/// In-process transport: answers `get_neighbors` with one row per vid and
/// lets a test inject per-host part failures for the first call.
#[derive(Default)]
struct MockTransport {
    calls: AtomicUsize,
    /// host -> failures returned on the FIRST call to that host only.
    first_call_failures: Mutex<HashMap<HostAddr, Vec<PartResult>>>,
    seen_hosts: Mutex<Vec<HostAddr>>,
}

impl MockTransport {
    fn respond(&self, host: &HostAddr, req: &GetNeighborsRequest) -> StorageResponse<DataSet> {
        let mut dataset = DataSet::new(vec!["_vid".to_string()]);
        let mut part_results = vec![];
        let injected = self.first_call_failures.lock().remove(host);
        for (&part, vids) in &req.parts {
            if let Some(failures) = &injected {
                if let Some(failure) = failures.iter().find(|f| f.part_id == part) {
                    part_results.push(failure.clone());
                    continue;
                }
            }
            for vid in vids {
                dataset.push(Row::new(vec![vid.clone()]));
            }
            part_results.push(PartResult {
                part_id: part,
                code: ErrorCode::Succeeded,
                leader: None,
            });
        }
        StorageResponse {
            payload: Some(dataset),
            part_results,
            latency_us: 10,
        }
    }
}

#[async_trait]
impl StorageTransport for MockTransport {
    async fn get_neighbors(
        &self,
        host: &HostAddr,
        req: GetNeighborsRequest,
    ) -> Result<StorageResponse<DataSet>, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_hosts.lock().push(host.clone());
        Ok(self.respond(host, &req))
    }

    async fn get_props(
        &self,
        _host: &HostAddr,
        req: GetPropsRequest,
    ) -> Result<StorageResponse<DataSet>, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(StorageResponse::ok(
            DataSet::new(vec![]),
            req.parts.keys().copied().collect::<Vec<_>>(),
        ))
    }

    async fn add_vertices(
        &self,
        _host: &HostAddr,
        req: AddVerticesRequest,
    ) -> Result<StorageResponse<()>, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(StorageResponse::ok(
            (),
            req.parts.keys().copied().collect::<Vec<_>>(),
        ))
    }

    async fn add_edges(
        &self,
        _host: &HostAddr,
        req: AddEdgesRequest,
    ) -> Result<StorageResponse<()>, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(StorageResponse::ok(
            (),
            req.parts.keys().copied().collect::<Vec<_>>(),
        ))
    }

    async fn update_vertex(
        &self,
        _host: &HostAddr,
        req: UpdateVertexRequest,
    ) -> Result<StorageResponse<DataSet>, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(StorageResponse::ok(DataSet::new(vec![]), vec![req.part]))
    }

    async fn update_edge(
        &self,
        _host: &HostAddr,
        req: UpdateEdgeRequest,
    ) -> Result<StorageResponse<DataSet>, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(StorageResponse::ok(DataSet::new(vec![]), vec![req.part]))
    }
}

fn make_client(transport: Arc<MockTransport>, config: GraphConfig) -> StorageClient {
    let meta = Arc::new(MetaInfo::new());
    meta.add_space(test_space());
    StorageClient::new(
        transport,
        meta,
        Arc::new(LeaderCache::new()),
        Arc::new(config),
        Arc::new(Metrics::new()),
    )
}

#[tokio::test]
async fn fan_out_dispatches_exactly_one_rpc_per_owning_host() {
    let transport = Arc::new(MockTransport::default());
    let client = make_client(transport.clone(), GraphConfig::default());

    let vids: Vec<Value> = (1..=8).map(Value::Int).collect();
    let response = client
        .get_neighbors("test", vids, GetNeighborsSpec::default())
        .await
        .unwrap();

    // Hosts a, b, c each own at least one partition: exactly three RPCs.
    assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
    assert!(response.is_complete());
    // All eight vids came back across the merged payloads.
    let total_rows: usize = response.responses.iter().map(|ds| ds.rows.len()).sum();
    assert_eq!(total_rows, 8);
}

#[tokio::test]
async fn leader_change_is_retried_once_against_the_new_leader() {
    let transport = Arc::new(MockTransport::default());
    let new_leader = HostAddr::new("d", 9779);
    transport.first_call_failures.lock().insert(
        HostAddr::new("b", 9779),
        vec![PartResult {
            part_id: 2,
            code: ErrorCode::LeaderChanged,
            leader: Some(new_leader.clone()),
        }],
    );
    let client = make_client(transport.clone(), GraphConfig::default());

    let vids: Vec<Value> = (1..=8).map(Value::Int).collect();
    let response = client
        .get_neighbors("test", vids, GetNeighborsSpec::default())
        .await
        .unwrap();

    assert!(response.is_complete());
    // Three initial RPCs plus one retry.
    assert_eq!(transport.calls.load(Ordering::SeqCst), 4);
    let seen = transport.seen_hosts.lock();
    assert!(seen.contains(&new_leader));
}

#[tokio::test]
async fn failed_part_fails_the_batch_by_default() {
    let transport = Arc::new(MockTransport::default());
    transport.first_call_failures.lock().insert(
        HostAddr::new("c", 9779),
        vec![PartResult {
            part_id: 4,
            code: ErrorCode::PartNotFound,
            leader: None,
        }],
    );
    let client = make_client(transport.clone(), GraphConfig::default());

    let vids: Vec<Value> = (1..=8).map(Value::Int).collect();
    let err = client
        .get_neighbors("test", vids, GetNeighborsSpec::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::PartialFailure(1)));
}

#[tokio::test]
async fn partial_success_degrades_to_a_warning_when_accepted() {
    let transport = Arc::new(MockTransport::default());
    transport.first_call_failures.lock().insert(
        HostAddr::new("c", 9779),
        vec![PartResult {
            part_id: 4,
            code: ErrorCode::PartNotFound,
            leader: None,
        }],
    );
    let config = GraphConfig {
        accept_partial_success: true,
        ..GraphConfig::default()
    };
    let client = make_client(transport.clone(), config);

    let vids: Vec<Value> = (1..=8).map(Value::Int).collect();
    let response = client
        .get_neighbors("test", vids, GetNeighborsSpec::default())
        .await
        .unwrap();
    assert_eq!(response.failed_parts.len(), 1);
    assert_eq!(response.failed_parts[&4], ErrorCode::PartNotFound);
    // The six vids on healthy partitions still arrived.
    let total_rows: usize = response.responses.iter().map(|ds| ds.rows.len()).sum();
    assert_eq!(total_rows, 6);
}

#[tokio::test]
async fn add_vertices_routes_by_vid() {
    let transport = Arc::new(MockTransport::default());
    let client = make_client(transport.clone(), GraphConfig::default());
    let vertices: Vec<NewVertex> = (1..=4)
        .map(|i| NewVertex {
            vid: Value::Int(i),
            tags: vec![],
        })
        .collect();
    let response = client
        .add_vertices("test", vertices, true)
        .await
        .unwrap();
    assert!(response.is_complete());
    assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
}
