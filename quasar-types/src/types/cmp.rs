use std::cmp::Ordering;

use ordered_float::OrderedFloat;

use super::{DataSet, Edge, NullKind, Path, PropertyMap, Step, Tag, Value, Vertex};

/// Type tag of a value, in the fixed cross-type ordering used when sorting
/// mixed collections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueKind {
    Null,
    Empty,
    Bool,
    Int,
    Float,
    Str,
    Date,
    Time,
    DateTime,
    List,
    Map,
    Set,
    Vertex,
    Edge,
    Path,
    DataSet,
}

impl ValueKind {
    /// `Int` and `Float` share one rank: numbers order numerically first.
    fn rank(self) -> u8 {
        match self {
            ValueKind::Null => 0,
            ValueKind::Empty => 1,
            ValueKind::Bool => 2,
            ValueKind::Int | ValueKind::Float => 3,
            ValueKind::Str => 4,
            ValueKind::Date => 5,
            ValueKind::Time => 6,
            ValueKind::DateTime => 7,
            ValueKind::List => 8,
            ValueKind::Map => 9,
            ValueKind::Set => 10,
            ValueKind::Vertex => 11,
            ValueKind::Edge => 12,
            ValueKind::Path => 13,
            ValueKind::DataSet => 14,
        }
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null(_) => ValueKind::Null,
            Value::Empty => ValueKind::Empty,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
            Value::Date(_) => ValueKind::Date,
            Value::Time(_) => ValueKind::Time,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
            Value::Set(_) => ValueKind::Set,
            Value::Vertex(_) => ValueKind::Vertex,
            Value::Edge(_) => ValueKind::Edge,
            Value::Path(_) => ValueKind::Path,
            Value::DataSet(_) => ValueKind::DataSet,
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let (lk, rk) = (self.kind(), other.kind());
        if lk.rank() != rk.rank() {
            return lk.rank().cmp(&rk.rank());
        }
        match (self, other) {
            (Value::Null(a), Value::Null(b)) => a.cmp(b),
            (Value::Empty, Value::Empty) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.cmp(b),
            // Mixed numbers compare numerically; exact ties break by tag so
            // the order stays consistent with structural equality.
            (Value::Int(a), Value::Float(b)) => OrderedFloat(*a as f64)
                .cmp(b)
                .then(Ordering::Less),
            (Value::Float(a), Value::Int(b)) => a
                .cmp(&OrderedFloat(*b as f64))
                .then(Ordering::Greater),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Time(a), Value::Time(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.cmp(b),
            (Value::Map(a), Value::Map(b)) => cmp_props(a, b),
            (Value::Set(a), Value::Set(b)) => a.cmp(b),
            (Value::Vertex(a), Value::Vertex(b)) => cmp_vertex(a, b),
            (Value::Edge(a), Value::Edge(b)) => cmp_edge(a, b),
            (Value::Path(a), Value::Path(b)) => cmp_path(a, b),
            (Value::DataSet(a), Value::DataSet(b)) => cmp_dataset(a, b),
            _ => unreachable!("equal ranks imply matching or numeric variants"),
        }
    }
}

fn cmp_props(a: &PropertyMap, b: &PropertyMap) -> Ordering {
    let mut left: Vec<(&String, &Value)> = a.iter().collect();
    let mut right: Vec<(&String, &Value)> = b.iter().collect();
    left.sort_unstable_by_key(|(k, _)| *k);
    right.sort_unstable_by_key(|(k, _)| *k);
    left.cmp(&right)
}

fn cmp_tag(a: &Tag, b: &Tag) -> Ordering {
    a.name.cmp(&b.name).then_with(|| cmp_props(&a.props, &b.props))
}

fn cmp_vertex(a: &Vertex, b: &Vertex) -> Ordering {
    a.vid.cmp(&b.vid).then_with(|| {
        a.tags
            .len()
            .cmp(&b.tags.len())
            .then_with(|| {
                a.tags
                    .iter()
                    .zip(&b.tags)
                    .map(|(x, y)| cmp_tag(x, y))
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            })
    })
}

fn cmp_edge(a: &Edge, b: &Edge) -> Ordering {
    a.name
        .cmp(&b.name)
        .then_with(|| a.src.cmp(&b.src))
        .then_with(|| a.dst.cmp(&b.dst))
        .then_with(|| a.rank.cmp(&b.rank))
        .then_with(|| a.etype.cmp(&b.etype))
        .then_with(|| cmp_props(&a.props, &b.props))
}

fn cmp_step(a: &Step, b: &Step) -> Ordering {
    cmp_vertex(&a.dst, &b.dst)
        .then_with(|| a.etype.cmp(&b.etype))
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.rank.cmp(&b.rank))
        .then_with(|| cmp_props(&a.props, &b.props))
}

fn cmp_path(a: &Path, b: &Path) -> Ordering {
    cmp_vertex(&a.src, &b.src).then_with(|| {
        a.steps
            .iter()
            .zip(&b.steps)
            .map(|(x, y)| cmp_step(x, y))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| a.steps.len().cmp(&b.steps.len()))
    })
}

fn cmp_dataset(a: &DataSet, b: &DataSet) -> Ordering {
    a.col_names.cmp(&b.col_names).then_with(|| {
        a.rows
            .iter()
            .zip(&b.rows)
            .map(|(x, y)| x.values.cmp(&y.values))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| a.rows.len().cmp(&b.rows.len()))
    })
}

/// Three-valued relational operations. These are the expression-level
/// comparisons: NULL operands propagate their kind left-to-right, `Empty`
/// never equals anything, and incomparable type combinations produce
/// `Null(BadType)` rather than an error.
impl Value {
    fn propagate_null(&self, other: &Value) -> Option<Value> {
        if let Value::Null(kind) = self {
            return Some(Value::Null(*kind));
        }
        if let Value::Null(kind) = other {
            return Some(Value::Null(*kind));
        }
        None
    }

    /// Equality usable inside expressions. Mixed Int/Float compare
    /// numerically; everything else is structural.
    pub fn equal(&self, other: &Value) -> Value {
        if let Some(null) = self.propagate_null(other) {
            return null;
        }
        if self.is_empty_value() || other.is_empty_value() {
            return Value::Bool(false);
        }
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => Value::Bool(OrderedFloat(a) == OrderedFloat(b)),
            _ => Value::Bool(self == other),
        }
    }

    pub fn not_equal(&self, other: &Value) -> Value {
        match self.equal(other) {
            Value::Bool(b) => Value::Bool(!b),
            v => v,
        }
    }

    fn relational(&self, other: &Value, f: impl Fn(Ordering) -> bool) -> Value {
        if let Some(null) = self.propagate_null(other) {
            return null;
        }
        if self.is_empty_value() || other.is_empty_value() {
            return Value::Empty;
        }
        if !self.comparable_with(other) {
            return Value::Null(NullKind::BadType);
        }
        Value::Bool(f(self.cmp(other)))
    }

    pub fn less_than(&self, other: &Value) -> Value {
        self.relational(other, |o| o == Ordering::Less)
    }

    pub fn less_equal(&self, other: &Value) -> Value {
        self.relational(other, |o| o != Ordering::Greater)
    }

    pub fn greater_than(&self, other: &Value) -> Value {
        self.relational(other, |o| o == Ordering::Greater)
    }

    pub fn greater_equal(&self, other: &Value) -> Value {
        self.relational(other, |o| o != Ordering::Less)
    }

    /// Whether a relational comparison between the two is meaningful:
    /// same kind, or both numeric.
    pub fn comparable_with(&self, other: &Value) -> bool {
        self.kind() == other.kind() || (self.is_numeric() && other.is_numeric())
    }
}
