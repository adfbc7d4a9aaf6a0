use std::collections::HashMap;
use std::sync::Arc;

use quasar_client::fanout::StorageClient;
use quasar_client::meta::{MetaInfo, SchemaCache};
use quasar_expr::eval::EvalContext;
use quasar_expr::ExprArena;
use quasar_stats::Metrics;
use quasar_types::config::GraphConfig;
use quasar_types::types::{DataSet, NullKind, Row, Value};

use crate::ExecutionError;

/// Variable table: each plan node publishes its result under its output
/// variable. History is kept because M-to-N collectors read every version a
/// loop body produced, not just the last one.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    results: HashMap<String, Vec<Value>>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, var: impl Into<String>, value: Value) {
        self.results.entry(var.into()).or_default().push(value);
    }

    pub fn latest(&self, var: &str) -> Result<&Value, ExecutionError> {
        self.results
            .get(var)
            .and_then(|h| h.last())
            .ok_or_else(|| ExecutionError::VariableNotFound(var.to_string()))
    }

    pub fn history(&self, var: &str) -> &[Value] {
        self.results.get(var).map(|h| h.as_slice()).unwrap_or(&[])
    }

    pub fn latest_dataset(&self, var: &str) -> Result<&DataSet, ExecutionError> {
        match self.latest(var)? {
            Value::DataSet(ds) => Ok(ds),
            _ => Err(ExecutionError::VariableNotFound(var.to_string())),
        }
    }
}

/// Everything one query needs, passed explicitly instead of living in
/// process-global singletons.
pub struct QueryContext {
    pub ectx: ExecutionContext,
    pub expr_arena: ExprArena,
    pub client: Arc<StorageClient>,
    pub meta: Arc<MetaInfo>,
    pub schemas: Arc<SchemaCache>,
    pub config: Arc<GraphConfig>,
    pub metrics: Arc<Metrics>,
    pub current_space: String,
}

/// Row-at-a-time evaluation context over a dataset: input properties
/// resolve by column name, `Column(i)` by position, and the current
/// vertex/edge can be pinned by traversal executors.
pub struct RowContext<'a> {
    pub col_names: &'a [String],
    pub row: &'a Row,
    pub current_vertex: Option<Value>,
    pub current_edge: Option<Value>,
    inner_vars: HashMap<String, Vec<Value>>,
}

impl<'a> RowContext<'a> {
    pub fn new(col_names: &'a [String], row: &'a Row) -> Self {
        Self {
            col_names,
            row,
            current_vertex: None,
            current_edge: None,
            inner_vars: HashMap::new(),
        }
    }

    pub fn with_edge(mut self, edge: Value) -> Self {
        self.current_edge = Some(edge);
        self
    }

    pub fn with_vertex(mut self, vertex: Value) -> Self {
        self.current_vertex = Some(vertex);
        self
    }
}

impl EvalContext for RowContext<'_> {
    fn input_prop(&self, col: &str) -> Value {
        match self.col_names.iter().position(|c| c == col) {
            Some(index) => self
                .row
                .values
                .get(index)
                .cloned()
                .unwrap_or(Value::Null(NullKind::UnknownProp)),
            None => Value::Null(NullKind::UnknownProp),
        }
    }

    fn var_prop(&self, _var: &str, col: &str) -> Value {
        // Variable columns resolve positionally against the joined row the
        // planner laid out, which is the same lookup as an input column.
        self.input_prop(col)
    }

    fn column(&self, index: usize) -> Value {
        self.row
            .values
            .get(index)
            .cloned()
            .unwrap_or(Value::Null(NullKind::UnknownProp))
    }

    fn vertex(&self) -> Value {
        self.current_vertex
            .clone()
            .unwrap_or(Value::Null(NullKind::UnknownProp))
    }

    fn edge(&self) -> Value {
        self.current_edge
            .clone()
            .unwrap_or(Value::Null(NullKind::UnknownProp))
    }

    fn tag_prop(&self, _tag: &str, prop: &str) -> Value {
        match &self.current_vertex {
            Some(Value::Vertex(v)) => v
                .property(prop)
                .cloned()
                .unwrap_or(Value::Null(NullKind::UnknownProp)),
            _ => Value::Null(NullKind::UnknownProp),
        }
    }

    fn edge_prop(&self, _edge: &str, prop: &str) -> Value {
        match &self.current_edge {
            Some(Value::Edge(e)) => match prop {
                "_src" => e.src.clone(),
                "_dst" => e.dst.clone(),
                "_rank" => Value::Int(e.rank),
                "_type" => Value::Int(e.etype as i64),
                _ => e
                    .props
                    .get(prop)
                    .cloned()
                    .unwrap_or(Value::Null(NullKind::UnknownProp)),
            },
            _ => Value::Null(NullKind::UnknownProp),
        }
    }

    fn set_inner_var(&mut self, name: &str, value: Value) {
        self.inner_vars
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn unset_inner_var(&mut self, name: &str) {
        if let Some(stack) = self.inner_vars.get_mut(name) {
            stack.pop();
            if stack.is_empty() {
                self.inner_vars.remove(name);
            }
        }
    }

    fn inner_var(&self, name: &str) -> Option<Value> {
        self.inner_vars.get(name).and_then(|s| s.last()).cloned()
    }
}
