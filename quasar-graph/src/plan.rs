use quasar_client::meta::EdgeType;
use quasar_client::storage::Direction;
use quasar_expr::ExprId;

pub type NodeId = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

#[derive(Clone, Debug)]
pub struct YieldColumn {
    pub expr: ExprId,
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetOpKind {
    Union,
    Intersect,
    Minus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectKind {
    Subgraph,
    RowBasedMove,
    MToN,
    BfsShortest,
    AllPaths,
    MultiplePairShortest,
}

#[derive(Clone, Debug)]
pub struct GetNeighborsNode {
    pub space: String,
    /// Evaluated against each input row to produce a source vid.
    pub src: ExprId,
    pub edge_types: Vec<EdgeType>,
    pub direction: Direction,
    pub vertex_props: Option<Vec<(String, Vec<String>)>>,
    pub edge_props: Option<Vec<(String, Vec<String>)>>,
    pub stat_props: Option<Vec<String>>,
    pub dedup: bool,
    pub random: bool,
    pub limit: Option<i64>,
    pub order_by: Vec<(String, bool)>,
    /// Storage-side filter (already split by the extractor).
    pub filter: Option<ExprId>,
    /// Extra filter applied to the first step only.
    pub first_step_filter: Option<ExprId>,
}

#[derive(Clone, Debug)]
pub struct GetVerticesNode {
    pub space: String,
    pub vid: ExprId,
    pub vertex_props: Option<Vec<(String, Vec<String>)>>,
    pub dedup: bool,
}

#[derive(Clone, Debug)]
pub struct GetEdgesNode {
    pub space: String,
    pub src: ExprId,
    pub etype: ExprId,
    pub rank: ExprId,
    pub dst: ExprId,
    pub edge_props: Option<Vec<(String, Vec<String>)>>,
    pub dedup: bool,
}

#[derive(Clone, Debug)]
pub struct JoinNode {
    pub kind: JoinKind,
    pub left_var: String,
    pub right_var: String,
    pub hash_keys: Vec<ExprId>,
    pub probe_keys: Vec<ExprId>,
}

#[derive(Clone, Debug)]
pub struct TraverseNode {
    pub space: String,
    pub src: ExprId,
    pub edge_types: Vec<EdgeType>,
    pub direction: Direction,
    pub min_step: usize,
    pub max_step: usize,
    /// Applied to every expanded edge; a non-true verdict drops the step.
    pub step_filter: Option<ExprId>,
    /// Extend paths arriving in the input instead of starting fresh ones.
    pub track_prev_path: bool,
}

#[derive(Clone, Debug)]
pub struct ShortestPathNode {
    pub space: String,
    /// Input rows carry `[src, dst]` pairs.
    pub edge_types: Vec<EdgeType>,
    pub max_step: usize,
    /// Stop at the first path per pair; otherwise collect all shortest.
    pub single_shortest: bool,
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Start,
    GetNeighbors(GetNeighborsNode),
    GetVertices(GetVerticesNode),
    GetEdges(GetEdgesNode),
    Filter {
        condition: ExprId,
        need_stable: bool,
    },
    Project {
        columns: Vec<YieldColumn>,
    },
    Aggregate {
        group_keys: Vec<ExprId>,
        group_items: Vec<YieldColumn>,
    },
    Sort {
        factors: Vec<(usize, OrderDirection)>,
    },
    TopN {
        factors: Vec<(usize, OrderDirection)>,
        offset: usize,
        count: usize,
    },
    Limit {
        offset: usize,
        count: usize,
    },
    Dedup,
    SetOp {
        op: SetOpKind,
        left_var: String,
        right_var: String,
    },
    Join(JoinNode),
    Traverse(TraverseNode),
    ShortestPath(ShortestPathNode),
    DataCollect {
        kind: CollectKind,
        m_to_n: Option<(usize, usize)>,
        distinct: bool,
    },
    SwitchSpace {
        space: String,
    },
}

/// Common node record: every node carries its variables and column names,
/// the payload is kind-specific. Nodes reference each other only through
/// ids into the owning arena.
#[derive(Clone, Debug)]
pub struct PlanNode {
    pub id: NodeId,
    pub input_vars: Vec<String>,
    pub output_var: String,
    pub col_names: Vec<String>,
    pub dependencies: Vec<NodeId>,
    pub kind: NodeKind,
}

/// Per-query owner of all plan nodes.
#[derive(Debug, Default)]
pub struct PlanArena {
    nodes: Vec<PlanNode>,
}

impl PlanArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mut node: PlanNode) -> NodeId {
        node.id = self.nodes.len();
        let id = node.id;
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> &PlanNode {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Builder keeping construction sites terse.
pub struct PlanNodeBuilder {
    node: PlanNode,
}

impl PlanNodeBuilder {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            node: PlanNode {
                id: 0,
                input_vars: vec![],
                output_var: String::new(),
                col_names: vec![],
                dependencies: vec![],
                kind,
            },
        }
    }

    pub fn input(mut self, var: impl Into<String>) -> Self {
        self.node.input_vars.push(var.into());
        self
    }

    pub fn output(mut self, var: impl Into<String>) -> Self {
        self.node.output_var = var.into();
        self
    }

    pub fn cols(mut self, names: Vec<String>) -> Self {
        self.node.col_names = names;
        self
    }

    pub fn depends_on(mut self, id: NodeId) -> Self {
        self.node.dependencies.push(id);
        self
    }

    pub fn add_to(self, arena: &mut PlanArena) -> NodeId {
        arena.add(self.node)
    }
}
