//! Filter-pushdown extraction.
//!
//! Given a filter destined for a traversal node, split it into a pushable
//! half the storage layer can evaluate and a residual half re-checked after
//! the scan, such that `pushable AND residual` is equivalent to the input
//! under three-valued logic.
//!
//! ORs distribute at most once per node: `A OR (B AND C)` with only `C`
//! unpushable becomes `(A OR B) AND (A OR C)`. When more than one OR
//! operand resists pushing, the whole OR stays residual.

use crate::expr::{Expr, ExprArena, ExprId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushTarget {
    /// Edge and source-vertex properties are visible.
    GetNeighbors,
    /// Tag (and destination) properties are visible.
    GetVertices,
    /// Edge properties only.
    GetEdges,
}

#[derive(Debug, Default)]
pub struct SplitResult {
    pub pushable: Option<ExprId>,
    pub residual: Option<ExprId>,
}

pub struct FilterExtractor<'a> {
    target: PushTarget,
    /// Variable columns the storage request will carry along; a `VarProp`
    /// referencing one of these may be pushed.
    visible_cols: &'a [String],
}

impl<'a> FilterExtractor<'a> {
    pub fn new(target: PushTarget, visible_cols: &'a [String]) -> Self {
        Self {
            target,
            visible_cols,
        }
    }

    /// Whether the whole subtree can be evaluated by the push target.
    pub fn can_push(&self, arena: &ExprArena, id: ExprId) -> bool {
        match arena.node(id) {
            Expr::Constant(_) => true,
            Expr::TagProp { tag, .. } => {
                // Storage has no wildcard tag support.
                tag != "*" && self.target == PushTarget::GetVertices
            }
            Expr::EdgeProp { .. } => matches!(
                self.target,
                PushTarget::GetNeighbors | PushTarget::GetEdges
            ),
            Expr::SrcProp { .. } => self.target == PushTarget::GetNeighbors,
            Expr::DstProp { .. } => self.target == PushTarget::GetVertices,
            Expr::EdgeSrc | Expr::EdgeTypeRef | Expr::EdgeRank | Expr::EdgeDst => matches!(
                self.target,
                PushTarget::GetNeighbors | PushTarget::GetEdges
            ),
            Expr::VarProp { col, .. } => self.visible_cols.iter().any(|c| c == col),
            Expr::InputProp { .. }
            | Expr::Column(_)
            | Expr::VertexRef
            | Expr::EdgeRef
            | Expr::Uuid
            | Expr::Label(_)
            | Expr::LabelTagProp { .. }
            | Expr::Aggregate { .. }
            | Expr::SubscriptRange { .. } => false,
            Expr::Arithmetic { left, right, .. }
            | Expr::Relational { left, right, .. }
            | Expr::Xor { left, right } => {
                self.can_push(arena, *left) && self.can_push(arena, *right)
            }
            Expr::Negate(operand) | Expr::Not(operand) => self.can_push(arena, *operand),
            Expr::And(operands) | Expr::Or(operands) => {
                operands.iter().all(|o| self.can_push(arena, *o))
            }
            Expr::ListCtor(items) | Expr::SetCtor(items) => {
                items.iter().all(|i| self.can_push(arena, *i))
            }
            Expr::MapCtor(items) => items.iter().all(|(_, v)| self.can_push(arena, *v)),
            Expr::Subscript { collection, index } => {
                self.can_push(arena, *collection) && self.can_push(arena, *index)
            }
            Expr::FunctionCall { args, .. } => args.iter().all(|a| self.can_push(arena, *a)),
            Expr::ListComprehension {
                collection,
                filter,
                mapping,
                ..
            } => {
                self.can_push(arena, *collection)
                    && filter.map(|f| self.can_push(arena, f)).unwrap_or(true)
                    && mapping.map(|m| self.can_push(arena, m)).unwrap_or(true)
            }
        }
    }

    /// Splits `root` into `(pushable, residual)`. Either half may be absent:
    /// a fully pushable filter has no residual, an unpushable one no
    /// pushable half.
    pub fn split(&self, arena: &mut ExprArena, root: ExprId) -> SplitResult {
        match arena.node(root).clone() {
            Expr::And(operands) => self.split_and(arena, &operands),
            Expr::Or(operands) => match self.split_or(arena, &operands) {
                Some(result) => result,
                None => self.all_or_nothing(arena, root),
            },
            _ => self.all_or_nothing(arena, root),
        }
    }

    fn all_or_nothing(&self, arena: &ExprArena, root: ExprId) -> SplitResult {
        if self.can_push(arena, root) {
            SplitResult {
                pushable: Some(root),
                residual: None,
            }
        } else {
            SplitResult {
                pushable: None,
                residual: Some(root),
            }
        }
    }

    fn split_and(&self, arena: &mut ExprArena, operands: &[ExprId]) -> SplitResult {
        let mut pushed = vec![];
        let mut remained = vec![];
        for &operand in operands {
            if let Expr::Or(or_operands) = arena.node(operand).clone() {
                // A nested OR may itself distribute once; its halves join
                // the surrounding AND lists.
                if let Some(split) = self.split_or(arena, &or_operands) {
                    if let Some(p) = split.pushable {
                        pushed.push(p);
                    }
                    if let Some(r) = split.residual {
                        remained.push(r);
                    }
                    continue;
                }
            }
            if self.can_push(arena, operand) {
                pushed.push(operand);
            } else {
                remained.push(operand);
            }
        }
        SplitResult {
            pushable: conjoin(arena, pushed),
            residual: conjoin(arena, remained),
        }
    }

    /// The single-shot OR distribution. `None` means no rewrite applies and
    /// the OR must be taken whole (pushed or kept) by the caller.
    fn split_or(&self, arena: &mut ExprArena, operands: &[ExprId]) -> Option<SplitResult> {
        let mut blocked = vec![];
        for (i, &operand) in operands.iter().enumerate() {
            if !self.can_push(arena, operand) {
                blocked.push(i);
            }
        }
        if blocked.is_empty() {
            // Fully pushable; no split needed.
            return None;
        }
        // The rewrite handles exactly one resisting operand, and only when
        // that operand is an AND with a pushable head. Anything else would
        // blow up the expression, so pushing is abandoned.
        if blocked.len() > 1 {
            return None;
        }
        let blocked_index = blocked[0];
        let Expr::And(and_operands) = arena.node(operands[blocked_index]).clone() else {
            return None;
        };

        let mut push_half = vec![];
        let mut keep_half = vec![];
        for &child in &and_operands {
            if self.can_push(arena, child) {
                push_half.push(child);
            } else {
                keep_half.push(child);
            }
        }
        if push_half.is_empty() {
            return None;
        }

        let shared: Vec<ExprId> = operands
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != blocked_index)
            .map(|(_, id)| *id)
            .collect();

        let push_conjoined = conjoin(arena, push_half);
        let pushable = disjoin_with(arena, &shared, push_conjoined);
        let keep_conjoined = conjoin(arena, keep_half);
        let residual = disjoin_with(arena, &shared, keep_conjoined);
        Some(SplitResult {
            pushable,
            residual,
        })
    }
}

fn conjoin(arena: &mut ExprArena, mut operands: Vec<ExprId>) -> Option<ExprId> {
    match operands.len() {
        0 => None,
        1 => Some(operands.pop().unwrap()),
        _ => Some(arena.and(operands)),
    }
}

/// `shared[0] OR shared[1] OR ... OR extra`.
fn disjoin_with(arena: &mut ExprArena, shared: &[ExprId], extra: Option<ExprId>) -> Option<ExprId> {
    let mut operands: Vec<ExprId> = shared.to_vec();
    if let Some(extra) = extra {
        operands.push(extra);
    }
    match operands.len() {
        0 => None,
        1 => Some(operands[0]),
        _ => Some(arena.or(operands)),
    }
}
