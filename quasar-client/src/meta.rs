use std::collections::HashMap;
use std::sync::Arc;

use quasar_types::parking_lot::RwLock;
use quasar_types::schema::Schema;
use quasar_types::serde::{Deserialize, Serialize};

use crate::host::HostAddr;
use crate::ClientError;

pub type SpaceId = u32;
pub type PartitionId = u32;
pub type TagId = u32;
pub type EdgeType = i32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "quasar_types::serde")]
pub enum VidKind {
    Int64,
    FixedString,
}

/// Per-space configuration: partition count, replica lists, vid shape.
/// Partition ids are 1-based.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(crate = "quasar_types::serde")]
pub struct SpaceInfo {
    pub id: SpaceId,
    pub name: String,
    pub part_count: u32,
    /// Ordered replica list per partition; the first responsive entry is
    /// the leader unless the leader cache knows better.
    pub leaders: HashMap<PartitionId, Vec<HostAddr>>,
    pub vid_kind: VidKind,
    pub vid_len: usize,
}

/// Explicit replacement for the host/shard manager singletons: one instance
/// per process, handed to whoever routes.
#[derive(Default)]
pub struct MetaInfo {
    spaces: RwLock<Arc<HashMap<String, Arc<SpaceInfo>>>>,
}

impl MetaInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_space(&self, info: SpaceInfo) {
        let mut guard = self.spaces.write();
        let mut next = HashMap::clone(&guard);
        next.insert(info.name.clone(), Arc::new(info));
        *guard = Arc::new(next);
    }

    pub fn space(&self, name: &str) -> Result<Arc<SpaceInfo>, ClientError> {
        self.spaces
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ClientError::SpaceNotFound(name.to_string()))
    }

    pub fn space_names(&self) -> Vec<String> {
        self.spaces.read().keys().cloned().collect()
    }
}

type SchemaKey = (SpaceId, String, u32);

/// Append-only `(space, tag|edge, version) → schema` cache backed by the
/// meta service. A published version is never mutated, so entries are
/// shared as `Arc<Schema>` and never invalidated.
#[derive(Default)]
pub struct SchemaCache {
    tags: RwLock<Arc<HashMap<SchemaKey, Arc<Schema>>>>,
    edges: RwLock<Arc<HashMap<SchemaKey, Arc<Schema>>>>,
    latest_tag: RwLock<Arc<HashMap<(SpaceId, String), u32>>>,
    latest_edge: RwLock<Arc<HashMap<(SpaceId, String), u32>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish_tag(&self, space: SpaceId, name: &str, schema: Schema) {
        Self::publish(&self.tags, &self.latest_tag, space, name, schema);
    }

    pub fn publish_edge(&self, space: SpaceId, name: &str, schema: Schema) {
        Self::publish(&self.edges, &self.latest_edge, space, name, schema);
    }

    fn publish(
        store: &RwLock<Arc<HashMap<SchemaKey, Arc<Schema>>>>,
        latest: &RwLock<Arc<HashMap<(SpaceId, String), u32>>>,
        space: SpaceId,
        name: &str,
        schema: Schema,
    ) {
        let version = schema.version;
        let key = (space, name.to_string(), version);
        {
            let mut guard = store.write();
            if guard.contains_key(&key) {
                // Versions are immutable once written.
                return;
            }
            let mut next = HashMap::clone(&guard);
            next.insert(key, Arc::new(schema));
            *guard = Arc::new(next);
        }
        let mut guard = latest.write();
        let entry = (space, name.to_string());
        if guard.get(&entry).copied().unwrap_or(0) <= version {
            let mut next = HashMap::clone(&guard);
            next.insert(entry, version);
            *guard = Arc::new(next);
        }
    }

    pub fn tag_schema(
        &self,
        space: SpaceId,
        name: &str,
        version: Option<u32>,
    ) -> Result<Arc<Schema>, ClientError> {
        Self::lookup(&self.tags, &self.latest_tag, space, name, version, "tag")
    }

    pub fn edge_schema(
        &self,
        space: SpaceId,
        name: &str,
        version: Option<u32>,
    ) -> Result<Arc<Schema>, ClientError> {
        Self::lookup(&self.edges, &self.latest_edge, space, name, version, "edge")
    }

    fn lookup(
        store: &RwLock<Arc<HashMap<SchemaKey, Arc<Schema>>>>,
        latest: &RwLock<Arc<HashMap<(SpaceId, String), u32>>>,
        space: SpaceId,
        name: &str,
        version: Option<u32>,
        kind: &'static str,
    ) -> Result<Arc<Schema>, ClientError> {
        let version = match version {
            Some(v) => v,
            None => latest
                .read()
                .get(&(space, name.to_string()))
                .copied()
                .ok_or_else(|| ClientError::SchemaNotFound {
                    space,
                    kind,
                    name: name.to_string(),
                })?,
        };
        store
            .read()
            .get(&(space, name.to_string(), version))
            .cloned()
            .ok_or_else(|| ClientError::SchemaNotFound {
                space,
                kind,
                name: name.to_string(),
            })
    }
}
