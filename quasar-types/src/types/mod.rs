use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

mod arith;
mod cmp;

pub use cmp::ValueKind;

/// The reason a value is NULL. `Generic` is the ordinary user-visible NULL;
/// every other kind marks a value produced by a failed coercion or operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NullKind {
    Generic,
    UnknownProp,
    BadData,
    BadType,
    ErrOverflow,
    DivByZero,
    NaN,
    OutOfRange,
}

/// A single ordered mapping of property name to value. Insertion order is
/// preserved so that encoded rows and returned tags stay schema-ordered.
pub type PropertyMap = IndexMap<String, Value>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub props: PropertyMap,
}

impl Tag {
    pub fn new(name: impl Into<String>, props: PropertyMap) -> Self {
        Self {
            name: name.into(),
            props,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    pub vid: Value,
    pub tags: Vec<Tag>,
}

impl Vertex {
    pub fn new(vid: Value, tags: Vec<Tag>) -> Self {
        Self { vid, tags }
    }

    /// First tag-prop whose name matches, searching tags in insertion order.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.tags.iter().find_map(|tag| tag.props.get(name))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub name: String,
    pub src: Value,
    pub dst: Value,
    pub rank: i64,
    /// +1 outbound, -1 inbound.
    pub etype: i8,
    pub props: PropertyMap,
}

impl Edge {
    pub fn new(
        name: impl Into<String>,
        src: Value,
        dst: Value,
        rank: i64,
        etype: i8,
        props: PropertyMap,
    ) -> Self {
        Self {
            name: name.into(),
            src,
            dst,
            rank,
            etype,
            props,
        }
    }

    pub fn reverse(&mut self) {
        std::mem::swap(&mut self.src, &mut self.dst);
        self.etype = -self.etype;
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub dst: Vertex,
    pub etype: i8,
    pub name: String,
    pub rank: i64,
    pub props: PropertyMap,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    pub src: Vertex,
    pub steps: Vec<Step>,
}

impl Path {
    pub fn new(src: Vertex) -> Self {
        Self { src, steps: vec![] }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn dst(&self) -> &Vertex {
        self.steps.last().map(|s| &s.dst).unwrap_or(&self.src)
    }

    /// Whether `vertex` already appears on the path. Used for cycle checks
    /// during traversal.
    pub fn contains_vertex(&self, vid: &Value) -> bool {
        if &self.src.vid == vid {
            return true;
        }
        self.steps.iter().any(|s| &s.dst.vid == vid)
    }

    pub fn append(&mut self, step: Step) {
        self.steps.push(step);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Row {
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self { values }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSet {
    pub col_names: Vec<String>,
    pub rows: Vec<Row>,
}

impl DataSet {
    pub fn new(col_names: Vec<String>) -> Self {
        Self {
            col_names,
            rows: vec![],
        }
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn col_index(&self, name: &str) -> Option<usize> {
        self.col_names.iter().position(|c| c == name)
    }

    /// Appends the rows of `other`. Column names must already agree; the
    /// caller is responsible for that.
    pub fn append(&mut self, other: DataSet) {
        self.rows.extend(other.rows);
    }
}

/// The tagged variant carrying every graph-domain type.
///
/// `Null` and `Empty` are values, not errors: evaluation and row decoding
/// never fail, they produce one of these instead (see the error-handling
/// notes in the crate docs).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Empty,
    Null(NullKind),
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    List(Vec<Value>),
    Map(PropertyMap),
    Set(BTreeSet<Value>),
    Vertex(Box<Vertex>),
    Edge(Box<Edge>),
    Path(Box<Path>),
    DataSet(Box<DataSet>),
}

impl Value {
    pub const NULL: Value = Value::Null(NullKind::Generic);

    pub fn float(f: f64) -> Value {
        Value::Float(OrderedFloat(f))
    }

    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    /// Every null kind except `Generic` marks corrupt or mistyped data.
    pub fn is_bad_null(&self) -> bool {
        matches!(self, Value::Null(kind) if *kind != NullKind::Generic)
    }

    pub fn is_empty_value(&self) -> bool {
        matches!(self, Value::Empty)
    }

    pub fn null_kind(&self) -> Option<NullKind> {
        match self {
            Value::Null(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn is_str(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(f.0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Numeric view used by arithmetic promotion and numeric ordering.
    pub(crate) fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(f.0),
            _ => None,
        }
    }

    /// The byte form a vid takes in persisted keys and router hashing:
    /// 8-byte little-endian for integer vids, the raw bytes for strings.
    pub fn vid_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Value::Int(i) => Some(i.to_le_bytes().to_vec()),
            Value::Str(s) => Some(s.as_bytes().to_vec()),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Empty
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Empty => {}
            Value::Null(kind) => kind.hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.hash(state),
            Value::Str(s) => s.hash(state),
            Value::Date(d) => d.hash(state),
            Value::Time(t) => t.hash(state),
            Value::DateTime(dt) => dt.hash(state),
            Value::List(items) => items.hash(state),
            // IndexMap equality ignores insertion order, so hashing must too.
            Value::Map(map) => hash_props(map, state),
            Value::Set(set) => {
                for v in set {
                    v.hash(state);
                }
            }
            Value::Vertex(v) => {
                v.vid.hash(state);
                for tag in &v.tags {
                    tag.name.hash(state);
                    hash_props(&tag.props, state);
                }
            }
            Value::Edge(e) => {
                e.name.hash(state);
                e.src.hash(state);
                e.dst.hash(state);
                e.rank.hash(state);
                e.etype.hash(state);
                hash_props(&e.props, state);
            }
            Value::Path(p) => {
                Value::Vertex(Box::new(p.src.clone())).hash(state);
                for step in &p.steps {
                    Value::Vertex(Box::new(step.dst.clone())).hash(state);
                    step.etype.hash(state);
                    step.name.hash(state);
                    step.rank.hash(state);
                    hash_props(&step.props, state);
                }
            }
            Value::DataSet(ds) => {
                ds.col_names.hash(state);
                for row in &ds.rows {
                    row.values.hash(state);
                }
            }
        }
    }
}

fn hash_props<H: Hasher>(map: &PropertyMap, state: &mut H) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort_unstable();
    for k in keys {
        k.hash(state);
        map[k.as_str()].hash(state);
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => write!(f, "__EMPTY__"),
            Value::Null(NullKind::Generic) => write!(f, "__NULL__"),
            Value::Null(kind) => write!(f, "__NULL({kind:?})__"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{}", v.0),
            Value::Str(s) => write!(f, "\"{s}\""),
            Value::Date(d) => write!(f, "{d}"),
            Value::Time(t) => write!(f, "{t}"),
            Value::DateTime(dt) => write!(f, "{dt}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Set(set) => {
                write!(f, "{{")?;
                for (i, v) in set.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "}}")
            }
            Value::Vertex(v) => write!(f, "({})", v.vid),
            Value::Edge(e) => {
                if e.etype >= 0 {
                    write!(f, "{}-[{}({})]->{}", e.src, e.name, e.rank, e.dst)
                } else {
                    write!(f, "{}<-[{}({})]-{}", e.src, e.name, e.rank, e.dst)
                }
            }
            Value::Path(p) => {
                write!(f, "({})", p.src.vid)?;
                for step in &p.steps {
                    if step.etype >= 0 {
                        write!(f, "-[{}]->({})", step.name, step.dst.vid)?;
                    } else {
                        write!(f, "<-[{}]-({})", step.name, step.dst.vid)?;
                    }
                }
                Ok(())
            }
            Value::DataSet(ds) => write!(f, "DataSet({} rows)", ds.rows.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(OrderedFloat(f))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// One of each variant, for serialization round-trip tests.
pub fn value_test_cases() -> Vec<Value> {
    let mut props = PropertyMap::new();
    props.insert("name".to_string(), Value::from("alice"));
    props.insert("age".to_string(), Value::Int(29));

    let vertex = Vertex::new(Value::from("v1"), vec![Tag::new("person", props.clone())]);
    let edge = Edge::new("knows", Value::from("v1"), Value::from("v2"), 0, 1, props.clone());
    let mut path = Path::new(vertex.clone());
    path.append(Step {
        dst: Vertex::new(Value::from("v2"), vec![]),
        etype: 1,
        name: "knows".to_string(),
        rank: 0,
        props: PropertyMap::new(),
    });

    let mut ds = DataSet::new(vec!["a".to_string(), "b".to_string()]);
    ds.push(Row::new(vec![Value::Int(1), Value::from("x")]));

    vec![
        Value::Empty,
        Value::NULL,
        Value::Null(NullKind::BadData),
        Value::Bool(true),
        Value::Int(-42),
        Value::float(3.25),
        Value::from("hello"),
        Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
        Value::Time(NaiveTime::from_hms_opt(23, 59, 58).unwrap()),
        Value::DateTime(
            NaiveDate::from_ymd_opt(2024, 2, 29)
                .unwrap()
                .and_hms_opt(1, 2, 3)
                .unwrap(),
        ),
        Value::List(vec![Value::Int(1), Value::from("two")]),
        Value::Map(props),
        Value::Set(BTreeSet::from([Value::Int(1), Value::Int(2)])),
        Value::Vertex(Box::new(vertex)),
        Value::Edge(Box::new(edge)),
        Value::Path(Box::new(path)),
        Value::DataSet(Box::new(ds)),
    ]
}
