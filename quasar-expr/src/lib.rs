//! Expression trees, evaluation, aggregation, and filter pushdown.
//!
//! Expressions live in an [`ExprArena`]; nodes reference children by
//! [`ExprId`], and a query owns exactly one arena. Evaluation is total: it
//! returns a `Value`, downgrading every data-level problem to a
//! `Null(kind)` sentinel. Structural problems (a corrupt serialized
//! expression, an unknown aggregate name) are `ExprError`s.

pub mod aggregate;
pub mod codec;
pub mod context;
pub mod eval;
pub mod expr;
pub mod functions;
pub mod pushdown;

pub use context::BasicContext;
pub use eval::EvalContext;
pub use expr::{AggKind, ArithOp, Expr, ExprArena, ExprId, RelOp};

use quasar_types::thiserror::{self, Error};

#[derive(Error, Debug)]
pub enum ExprError {
    #[error("Unknown aggregate function: {0}")]
    UnknownAggregate(String),
    #[error("Truncated expression encoding at byte {0}")]
    Truncated(usize),
    #[error("Unknown expression kind byte: {0:#04x}")]
    UnknownKind(u8),
    #[error("Invalid constant payload: {0}")]
    BadConstant(String),
    #[error("Dangling expression id: {0:?}")]
    DanglingId(ExprId),
}
