use std::collections::HashMap;

use quasar_types::types::{NullKind, Value};

use crate::eval::EvalContext;

/// Map-backed context for tests and row-at-a-time evaluation. The executor
/// crates provide iterator-backed contexts on top of the same trait.
#[derive(Debug, Default)]
pub struct BasicContext {
    pub input: HashMap<String, Value>,
    pub variables: HashMap<(String, String), Value>,
    pub tag_props: HashMap<(String, String), Value>,
    pub edge_props: HashMap<(String, String), Value>,
    pub src_props: HashMap<(String, String), Value>,
    pub dst_props: HashMap<(String, String), Value>,
    pub current_vertex: Option<Value>,
    pub current_edge: Option<Value>,
    inner_vars: HashMap<String, Vec<Value>>,
}

impl BasicContext {
    pub fn with_input(columns: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            input: columns.into_iter().collect(),
            ..Default::default()
        }
    }
}

fn lookup(map: &HashMap<(String, String), Value>, a: &str, b: &str) -> Value {
    map.get(&(a.to_string(), b.to_string()))
        .cloned()
        .unwrap_or(Value::Null(NullKind::UnknownProp))
}

impl EvalContext for BasicContext {
    fn input_prop(&self, col: &str) -> Value {
        self.input
            .get(col)
            .cloned()
            .unwrap_or(Value::Null(NullKind::UnknownProp))
    }

    fn var_prop(&self, var: &str, col: &str) -> Value {
        lookup(&self.variables, var, col)
    }

    fn tag_prop(&self, tag: &str, prop: &str) -> Value {
        lookup(&self.tag_props, tag, prop)
    }

    fn edge_prop(&self, edge: &str, prop: &str) -> Value {
        lookup(&self.edge_props, edge, prop)
    }

    fn src_prop(&self, tag: &str, prop: &str) -> Value {
        lookup(&self.src_props, tag, prop)
    }

    fn dst_prop(&self, tag: &str, prop: &str) -> Value {
        lookup(&self.dst_props, tag, prop)
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

    // Inner variables shadow like a stack so nested comprehensions over the
    // same name unwind correctly.
    fn set_inner_var(&mut self, name: &str, value: Value) {
        self.inner_vars.entry(name.to_string()).or_default().push(value);
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
