use quasar_types::types::Value;

use crate::aggregate::AggFn;

/// Handle into an [`ExprArena`]. Children are stored as ids, never as owned
/// boxes, so a whole tree shares one allocation pool per query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExprId(pub(crate) u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
}

/// Aggregate call site: the function, distinctness, and the argument.
/// Accumulator state lives with whoever drives the grouping (the Aggregate
/// plan node), keyed per group; the expression itself stays immutable.
#[derive(Clone, Debug, PartialEq)]
pub struct AggKind {
    pub func: AggFn,
    pub distinct: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Constant(Value),
    Arithmetic {
        op: ArithOp,
        left: ExprId,
        right: ExprId,
    },
    Negate(ExprId),
    Relational {
        op: RelOp,
        left: ExprId,
        right: ExprId,
    },
    /// N-ary, short-circuiting left to right. The parser builds these by
    /// pulling nested ANDs/ORs flat.
    And(Vec<ExprId>),
    Or(Vec<ExprId>),
    Xor {
        left: ExprId,
        right: ExprId,
    },
    Not(ExprId),
    TagProp {
        tag: String,
        prop: String,
    },
    EdgeProp {
        edge: String,
        prop: String,
    },
    InputProp {
        col: String,
    },
    VarProp {
        var: String,
        col: String,
    },
    SrcProp {
        tag: String,
        prop: String,
    },
    DstProp {
        tag: String,
        prop: String,
    },
    EdgeSrc,
    EdgeTypeRef,
    EdgeRank,
    EdgeDst,
    LabelTagProp {
        label: String,
        tag: String,
        prop: String,
    },
    ListCtor(Vec<ExprId>),
    SetCtor(Vec<ExprId>),
    MapCtor(Vec<(String, ExprId)>),
    Subscript {
        collection: ExprId,
        index: ExprId,
    },
    SubscriptRange {
        collection: ExprId,
        lo: Option<ExprId>,
        hi: Option<ExprId>,
    },
    FunctionCall {
        name: String,
        args: Vec<ExprId>,
    },
    Aggregate {
        kind: AggKind,
        arg: ExprId,
    },
    ListComprehension {
        inner_var: String,
        collection: ExprId,
        filter: Option<ExprId>,
        mapping: Option<ExprId>,
    },
    Column(usize),
    /// The whole current vertex / edge.
    VertexRef,
    EdgeRef,
    /// Fresh v4 uuid per evaluation.
    Uuid,
    /// Unresolved name; validation rewrites it into one of the refs above.
    /// Evaluating it directly yields `Null(UnknownProp)`.
    Label(String),
}

#[derive(Clone, Debug, Default)]
pub struct ExprArena {
    nodes: Vec<Expr>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, expr: Expr) -> ExprId {
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(expr);
        id
    }

    pub fn node(&self, id: ExprId) -> &Expr {
        &self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // Builder helpers. These keep call sites close to how the parser would
    // assemble trees.

    pub fn constant(&mut self, value: impl Into<Value>) -> ExprId {
        self.add(Expr::Constant(value.into()))
    }

    pub fn arithmetic(&mut self, op: ArithOp, left: ExprId, right: ExprId) -> ExprId {
        self.add(Expr::Arithmetic { op, left, right })
    }

    pub fn relational(&mut self, op: RelOp, left: ExprId, right: ExprId) -> ExprId {
        self.add(Expr::Relational { op, left, right })
    }

    pub fn and(&mut self, operands: Vec<ExprId>) -> ExprId {
        self.add(Expr::And(operands))
    }

    pub fn or(&mut self, operands: Vec<ExprId>) -> ExprId {
        self.add(Expr::Or(operands))
    }

    pub fn not(&mut self, operand: ExprId) -> ExprId {
        self.add(Expr::Not(operand))
    }

    pub fn list(&mut self, items: Vec<ExprId>) -> ExprId {
        self.add(Expr::ListCtor(items))
    }

    pub fn subscript(&mut self, collection: ExprId, index: ExprId) -> ExprId {
        self.add(Expr::Subscript { collection, index })
    }

    pub fn function(&mut self, name: impl Into<String>, args: Vec<ExprId>) -> ExprId {
        self.add(Expr::FunctionCall {
            name: name.into(),
            args,
        })
    }

    /// Deep-copies the subtree rooted at `id` into `dst`, returning the new
    /// root. Clones share no state with the source arena.
    pub fn clone_into(&self, id: ExprId, dst: &mut ExprArena) -> ExprId {
        let cloned = match self.node(id) {
            Expr::Constant(v) => Expr::Constant(v.clone()),
            Expr::Arithmetic { op, left, right } => Expr::Arithmetic {
                op: *op,
                left: self.clone_into(*left, dst),
                right: self.clone_into(*right, dst),
            },
            Expr::Negate(operand) => Expr::Negate(self.clone_into(*operand, dst)),
            Expr::Relational { op, left, right } => Expr::Relational {
                op: *op,
                left: self.clone_into(*left, dst),
                right: self.clone_into(*right, dst),
            },
            Expr::And(operands) => {
                Expr::And(operands.iter().map(|o| self.clone_into(*o, dst)).collect())
            }
            Expr::Or(operands) => {
                Expr::Or(operands.iter().map(|o| self.clone_into(*o, dst)).collect())
            }
            Expr::Xor { left, right } => Expr::Xor {
                left: self.clone_into(*left, dst),
                right: self.clone_into(*right, dst),
            },
            Expr::Not(operand) => Expr::Not(self.clone_into(*operand, dst)),
            Expr::ListCtor(items) => {
                Expr::ListCtor(items.iter().map(|i| self.clone_into(*i, dst)).collect())
            }
            Expr::SetCtor(items) => {
                Expr::SetCtor(items.iter().map(|i| self.clone_into(*i, dst)).collect())
            }
            Expr::MapCtor(items) => Expr::MapCtor(
                items
                    .iter()
                    .map(|(k, v)| (k.clone(), self.clone_into(*v, dst)))
                    .collect(),
            ),
            Expr::Subscript { collection, index } => Expr::Subscript {
                collection: self.clone_into(*collection, dst),
                index: self.clone_into(*index, dst),
            },
            Expr::SubscriptRange { collection, lo, hi } => Expr::SubscriptRange {
                collection: self.clone_into(*collection, dst),
                lo: lo.map(|l| self.clone_into(l, dst)),
                hi: hi.map(|h| self.clone_into(h, dst)),
            },
            Expr::FunctionCall { name, args } => Expr::FunctionCall {
                name: name.clone(),
                args: args.iter().map(|a| self.clone_into(*a, dst)).collect(),
            },
            Expr::Aggregate { kind, arg } => Expr::Aggregate {
                kind: kind.clone(),
                arg: self.clone_into(*arg, dst),
            },
            Expr::ListComprehension {
                inner_var,
                collection,
                filter,
                mapping,
            } => Expr::ListComprehension {
                inner_var: inner_var.clone(),
                collection: self.clone_into(*collection, dst),
                filter: filter.map(|f| self.clone_into(f, dst)),
                mapping: mapping.map(|m| self.clone_into(m, dst)),
            },
            leaf => leaf.clone(),
        };
        dst.add(cloned)
    }

    /// Whether any node in the subtree is an aggregate call.
    pub fn has_aggregate(&self, id: ExprId) -> bool {
        match self.node(id) {
            Expr::Aggregate { .. } => true,
            Expr::Arithmetic { left, right, .. }
            | Expr::Relational { left, right, .. }
            | Expr::Xor { left, right } => self.has_aggregate(*left) || self.has_aggregate(*right),
            Expr::Negate(operand) | Expr::Not(operand) => self.has_aggregate(*operand),
            Expr::And(operands) | Expr::Or(operands) | Expr::ListCtor(operands)
            | Expr::SetCtor(operands) => operands.iter().any(|o| self.has_aggregate(*o)),
            Expr::MapCtor(items) => items.iter().any(|(_, v)| self.has_aggregate(*v)),
            Expr::Subscript { collection, index } => {
                self.has_aggregate(*collection) || self.has_aggregate(*index)
            }
            Expr::SubscriptRange { collection, lo, hi } => {
                self.has_aggregate(*collection)
                    || lo.map(|l| self.has_aggregate(l)).unwrap_or(false)
                    || hi.map(|h| self.has_aggregate(h)).unwrap_or(false)
            }
            Expr::FunctionCall { args, .. } => args.iter().any(|a| self.has_aggregate(*a)),
            Expr::ListComprehension {
                collection,
                filter,
                mapping,
                ..
            } => {
                self.has_aggregate(*collection)
                    || filter.map(|f| self.has_aggregate(f)).unwrap_or(false)
                    || mapping.map(|m| self.has_aggregate(m)).unwrap_or(false)
            }
            _ => false,
        }
    }
}
