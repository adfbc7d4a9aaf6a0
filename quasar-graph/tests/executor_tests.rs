use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use quasar_client::fanout::StorageClient;
use quasar_client::host::HostAddr;
use quasar_client::meta::{MetaInfo, SchemaCache, SpaceInfo, VidKind};
use quasar_client::router::LeaderCache;
use quasar_client::storage::{
    AddEdgesRequest, AddVerticesRequest, Direction, GetNeighborsRequest, GetPropsRequest,
    PropTarget, StorageResponse, StorageTransport, UpdateEdgeRequest, UpdateVertexRequest,
};
use quasar_client::ClientError;
use quasar_expr::{Expr, RelOp};
use quasar_graph::context::{ExecutionContext, QueryContext};
use quasar_graph::executor::Executor;
use quasar_graph::plan::{
    GetNeighborsNode, NodeKind, OrderDirection, PlanArena, PlanNodeBuilder, ShortestPathNode,
    TraverseNode, YieldColumn,
};
use quasar_stats::Metrics;
use quasar_types::config::GraphConfig;
use quasar_types::types::{DataSet, Row, Value};

/// v1→v2, v2→v3, v3→v4, v1→v5, v5→v4: two routes from v1 to v4.
fn out_edges() -> HashMap<&'static str, Vec<&'static str>> {
    HashMap::from([
        ("v1", vec!["v2", "v5"]),
        ("v2", vec!["v3"]),
        ("v3", vec!["v4"]),
        ("v5", vec!["v4"]),
    ])
}

fn in_edges() -> HashMap<&'static str, Vec<&'static str>> {
    let mut reversed: HashMap<&'static str, Vec<&'static str>> = HashMap::new();
    for (src, dsts) in out_edges() {
        for dst in dsts {
            reversed.entry(dst).or_default().push(src);
        }
    }
    reversed
}

struct GraphTransport;

impl GraphTransport {
    fn neighbors_of(vid: &str, direction: Direction) -> (String, Vec<Value>) {
        let (edge_col, adjacency) = match direction {
            Direction::In => ("_edge:-like:".to_string(), in_edges()),
            _ => ("_edge:+like:".to_string(), out_edges()),
        };
        let entries: Vec<Value> = adjacency
            .get(vid)
            .map(|dsts| {
                dsts.iter()
                    .map(|dst| Value::List(vec![Value::from(*dst), Value::Int(0)]))
                    .collect()
            })
            .unwrap_or_default();
        (edge_col, entries)
    }
}

#[async_trait]
impl StorageTransport for GraphTransport {
    async fn get_neighbors(
        &self,
        _host: &HostAddr,
        req: GetNeighborsRequest,
    ) -> Result<StorageResponse<DataSet>, ClientError> {
        let direction = req.spec.direction.unwrap_or(Direction::Out);
        let mut col_names = vec!["_vid".to_string(), "_tag:person:name".to_string()];
        let mut rows = vec![];
        let mut edge_col_name = None;
        for vids in req.parts.values() {
            for vid in vids {
                let Value::Str(vid_str) = vid else { continue };
                let (edge_col, entries) = Self::neighbors_of(vid_str, direction);
                edge_col_name.get_or_insert(edge_col);
                rows.push(Row::new(vec![
                    vid.clone(),
                    Value::List(vec![Value::from(format!("name-{vid_str}"))]),
                    Value::List(entries),
                ]));
            }
        }
        col_names.push(edge_col_name.unwrap_or_else(|| "_edge:+like:".to_string()));
        let mut dataset = DataSet::new(col_names);
        dataset.rows = rows;
        Ok(StorageResponse::ok(
            dataset,
            req.parts.keys().copied().collect::<Vec<_>>(),
        ))
    }

    async fn get_props(
        &self,
        _host: &HostAddr,
        req: GetPropsRequest,
    ) -> Result<StorageResponse<DataSet>, ClientError> {
        let mut dataset = DataSet::new(vec![
            "_vid".to_string(),
            "_tag:person:name".to_string(),
        ]);
        for targets in req.parts.values() {
            for target in targets {
                if let PropTarget::Vertex(vid) = target {
                    let name = match vid {
                        Value::Str(s) => format!("name-{s}"),
                        other => format!("name-{other}"),
                    };
                    dataset.push(Row::new(vec![
                        vid.clone(),
                        Value::List(vec![Value::from(name)]),
                    ]));
                }
            }
        }
        Ok(StorageResponse::ok(
            dataset,
            req.parts.keys().copied().collect::<Vec<_>>(),
        ))
    }

    async fn add_vertices(
        &self,
        _host: &HostAddr,
        req: AddVerticesRequest,
    ) -> Result<StorageResponse<()>, ClientError> {
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
        Ok(StorageResponse::ok(DataSet::new(vec![]), vec![req.part]))
    }

    async fn update_edge(
        &self,
        _host: &HostAddr,
        req: UpdateEdgeRequest,
    ) -> Result<StorageResponse<DataSet>, ClientError> {
        Ok(StorageResponse::ok(DataSet::new(vec![]), vec![req.part]))
    }
}

fn graph_qctx() -> QueryContext {
    let meta = Arc::new(MetaInfo::new());
    meta.add_space(SpaceInfo {
        id: 1,
        name: "social".to_string(),
        part_count: 1,
        leaders: HashMap::from([(1, vec![HostAddr::new("a", 9779)])]),
        vid_kind: VidKind::FixedString,
        vid_len: 8,
    });
    let config = Arc::new(GraphConfig::default());
    let metrics = Arc::new(Metrics::new());
    let client = Arc::new(StorageClient::new(
        Arc::new(GraphTransport),
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
        current_space: "social".to_string(),
    }
}

fn vid_input(qctx: &mut QueryContext, var: &str, vids: &[&str]) {
    let mut ds = DataSet::new(vec!["vid".to_string()]);
    for vid in vids {
        ds.push(Row::new(vec![Value::from(*vid)]));
    }
    qctx.ectx.publish(var, Value::DataSet(Box::new(ds)));
}

#[tokio::test]
async fn get_neighbors_feeds_downstream_filter_and_project() {
    let mut qctx = graph_qctx();
    vid_input(&mut qctx, "starts", &["v1"]);

    let src = qctx.expr_arena.add(Expr::InputProp { col: "vid".into() });
    let get_neighbors = GetNeighborsNode {
        space: "social".to_string(),
        src,
        edge_types: vec![1],
        direction: Direction::Out,
        vertex_props: Some(vec![("person".to_string(), vec!["name".to_string()])]),
        edge_props: Some(vec![("like".to_string(), vec![])]),
        stat_props: None,
        dedup: true,
        random: false,
        limit: None,
        order_by: vec![],
        filter: None,
        first_step_filter: None,
    };

    let mut plan = PlanArena::new();
    let gn = PlanNodeBuilder::new(NodeKind::GetNeighbors(get_neighbors))
        .input("starts")
        .output("neighbors")
        .add_to(&mut plan);

    // Project the source vid out of the neighbors dataset.
    let vid_ref = qctx.expr_arena.add(Expr::InputProp { col: "_vid".into() });
    let project = PlanNodeBuilder::new(NodeKind::Project {
        columns: vec![YieldColumn {
            expr: vid_ref,
            name: "id".to_string(),
        }],
    })
    .input("neighbors")
    .output("ids")
    .depends_on(gn)
    .add_to(&mut plan);

    let mut executor = Executor::new(&plan, &mut qctx);
    executor.execute(project).await.unwrap();

    let ids = qctx.ectx.latest_dataset("ids").unwrap();
    assert_eq!(ids.col_names, vec!["id".to_string()]);
    assert_eq!(ids.rows, vec![Row::new(vec![Value::from("v1")])]);
}

#[tokio::test]
async fn traverse_materializes_variable_length_paths() {
    let mut qctx = graph_qctx();
    vid_input(&mut qctx, "starts", &["v1"]);

    let src = qctx.expr_arena.add(Expr::InputProp { col: "vid".into() });
    let traverse = TraverseNode {
        space: "social".to_string(),
        src,
        edge_types: vec![1],
        direction: Direction::Out,
        min_step: 1,
        max_step: 2,
        step_filter: None,
        track_prev_path: false,
    };

    let mut plan = PlanArena::new();
    let node = PlanNodeBuilder::new(NodeKind::Traverse(traverse))
        .input("starts")
        .output("paths")
        .add_to(&mut plan);

    let mut executor = Executor::new(&plan, &mut qctx);
    executor.execute(node).await.unwrap();

    let paths = qctx.ectx.latest_dataset("paths").unwrap();
    // Step 1: v1→v2, v1→v5. Step 2: v1→v2→v3, v1→v5→v4.
    assert_eq!(paths.rows.len(), 4);
    let lengths: Vec<usize> = paths
        .rows
        .iter()
        .map(|row| match &row.values[0] {
            Value::Path(p) => p.len(),
            other => panic!("expected path, got {other:?}"),
        })
        .collect();
    assert_eq!(lengths.iter().filter(|&&l| l == 1).count(), 2);
    assert_eq!(lengths.iter().filter(|&&l| l == 2).count(), 2);
}

#[tokio::test]
async fn traverse_step_filter_prunes_edges() {
    let mut qctx = graph_qctx();
    vid_input(&mut qctx, "starts", &["v1"]);

    let src = qctx.expr_arena.add(Expr::InputProp { col: "vid".into() });
    // Keep only edges leading to v2.
    let dst_ref = qctx.expr_arena.add(Expr::EdgeDst);
    let v2 = qctx.expr_arena.constant("v2");
    let filter = qctx.expr_arena.relational(RelOp::Eq, dst_ref, v2);

    let traverse = TraverseNode {
        space: "social".to_string(),
        src,
        edge_types: vec![1],
        direction: Direction::Out,
        min_step: 1,
        max_step: 1,
        step_filter: Some(filter),
        track_prev_path: false,
    };

    let mut plan = PlanArena::new();
    let node = PlanNodeBuilder::new(NodeKind::Traverse(traverse))
        .input("starts")
        .output("paths")
        .add_to(&mut plan);

    let mut executor = Executor::new(&plan, &mut qctx);
    executor.execute(node).await.unwrap();
    assert_eq!(qctx.ectx.latest_dataset("paths").unwrap().rows.len(), 1);
}

#[tokio::test]
async fn shortest_path_finds_the_two_hop_route() {
    let mut qctx = graph_qctx();
    let mut pairs = DataSet::new(vec!["src".to_string(), "dst".to_string()]);
    pairs.push(Row::new(vec![Value::from("v1"), Value::from("v4")]));
    qctx.ectx.publish("pairs", Value::DataSet(Box::new(pairs)));

    let node_payload = ShortestPathNode {
        space: "social".to_string(),
        edge_types: vec![1],
        max_step: 5,
        single_shortest: true,
    };
    let mut plan = PlanArena::new();
    let node = PlanNodeBuilder::new(NodeKind::ShortestPath(node_payload))
        .input("pairs")
        .output("paths")
        .add_to(&mut plan);

    let mut executor = Executor::new(&plan, &mut qctx);
    executor.execute(node).await.unwrap();

    let paths = qctx.ectx.latest_dataset("paths").unwrap();
    assert_eq!(paths.rows.len(), 1);
    match &paths.rows[0].values[0] {
        Value::Path(path) => {
            assert_eq!(path.len(), 2);
            assert_eq!(path.src.vid, Value::from("v1"));
            assert_eq!(path.dst().vid, Value::from("v4"));
            // The intermediate hop is v5, the only two-hop route.
            assert_eq!(path.steps[0].dst.vid, Value::from("v5"));
            assert_eq!(path.steps[1].etype, 1);
        }
        other => panic!("expected path, got {other:?}"),
    }
}

#[tokio::test]
async fn driver_runs_dependencies_before_dependents() {
    let mut qctx = graph_qctx();
    vid_input(&mut qctx, "input", &["v3", "v1", "v2", "v1"]);

    let mut plan = PlanArena::new();
    let start = PlanNodeBuilder::new(NodeKind::Start).add_to(&mut plan);

    let dedup = PlanNodeBuilder::new(NodeKind::Dedup)
        .input("input")
        .output("deduped")
        .depends_on(start)
        .add_to(&mut plan);

    let sort = PlanNodeBuilder::new(NodeKind::Sort {
        factors: vec![(0, OrderDirection::Asc)],
    })
    .input("deduped")
    .output("sorted")
    .depends_on(dedup)
    .add_to(&mut plan);

    let limit = PlanNodeBuilder::new(NodeKind::Limit { offset: 0, count: 2 })
        .input("sorted")
        .output("top")
        .depends_on(sort)
        .add_to(&mut plan);

    let mut executor = Executor::new(&plan, &mut qctx);
    executor.execute(limit).await.unwrap();

    let top = qctx.ectx.latest_dataset("top").unwrap();
    assert_eq!(
        top.rows,
        vec![
            Row::new(vec![Value::from("v1")]),
            Row::new(vec![Value::from("v2")]),
        ]
    );
}
