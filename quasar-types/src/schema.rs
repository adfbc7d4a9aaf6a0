use serde::{Deserialize, Serialize};

use crate::types::Value;

/// Storage-level type of a schema field. `Vid` is only emitted by legacy v1
/// rows; new schemas use `Int64` or `String` vids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Bool,
    Int64,
    Timestamp,
    Vid,
    Float,
    Double,
    String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub prop_type: PropertyType,
    pub nullable: bool,
    pub default: Option<Value>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, prop_type: PropertyType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            prop_type,
            nullable,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// An ordered sequence of fields plus a version. Versions are append-only:
/// once a `(space, tag|edge, version)` triple has been published it is never
/// mutated, so readers may cache `Arc<Schema>` freely.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub version: u32,
    pub fields: Vec<FieldDefinition>,
}

impl Schema {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            fields: vec![],
        }
    }

    pub fn field(&mut self, field: FieldDefinition) -> &mut Self {
        self.fields.push(field);
        self
    }
}

/// The only interface the row codec sees. Implementations may be a plain
/// `Schema` or a meta-client cache entry.
pub trait SchemaProvider {
    fn num_fields(&self) -> usize;
    fn field_type(&self, index: usize) -> Option<PropertyType>;
    fn field_index(&self, name: &str) -> Option<usize>;
    fn field_name(&self, index: usize) -> Option<&str>;
    fn field_default(&self, index: usize) -> Option<&Value>;
    fn field_nullable(&self, index: usize) -> bool;
    fn version(&self) -> u32;
}

impl SchemaProvider for Schema {
    fn num_fields(&self) -> usize {
        self.fields.len()
    }

    fn field_type(&self, index: usize) -> Option<PropertyType> {
        self.fields.get(index).map(|f| f.prop_type)
    }

    fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    fn field_name(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|f| f.name.as_str())
    }

    fn field_default(&self, index: usize) -> Option<&Value> {
        self.fields.get(index).and_then(|f| f.default.as_ref())
    }

    fn field_nullable(&self, index: usize) -> bool {
        self.fields.get(index).map(|f| f.nullable).unwrap_or(false)
    }

    fn version(&self) -> u32 {
        self.version
    }
}
