//! Traversal plan nodes and their execution.
//!
//! A query owns one [`plan::PlanArena`] of nodes and one expression arena;
//! the [`executor::Executor`] walks the plan, running every dependency
//! before its dependents, and publishes each node's result into the
//! [`context::ExecutionContext`] under the node's output variable.

pub mod context;
pub mod executor;
pub mod iterator;
pub mod plan;
pub mod session;

use quasar_client::ClientError;
use quasar_expr::ExprError;
use quasar_types::errors::internal::BoxedError;
use quasar_types::thiserror::{self, Error};

use plan::NodeId;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("SemanticError: variable `{0}` has no result yet")]
    VariableNotFound(String),
    #[error("SemanticError: node {0} expects a dataset input")]
    NotADataSet(NodeId),
    #[error("SemanticError: column index {index} out of range ({width} columns)")]
    ColumnOutOfRange { index: usize, width: usize },
    #[error("SemanticError: {0}")]
    Semantic(String),
    #[error("SemanticError: {0}")]
    Expression(#[from] ExprError),
    #[error("StorageError: {0}")]
    Storage(#[from] ClientError),
    #[error("internal error: {0}")]
    Internal(#[from] BoxedError),
    #[error("Execution was cancelled")]
    Cancelled,
}
