//! Cluster metadata, shard routing, and the storage RPC fan-out.
//!
//! The transport (thrift, grpc, in-process mock) sits behind the
//! [`storage::StorageTransport`] trait. Everything above it lives here:
//! clustering a batch by owning host, dispatching in parallel, retrying a
//! moved leader once, and merging partial results.

pub mod fanout;
pub mod host;
pub mod meta;
pub mod router;
pub mod storage;

pub use fanout::{StorageClient, StorageRpcResponse};
pub use host::HostAddr;
pub use meta::{EdgeType, MetaInfo, PartitionId, SchemaCache, SpaceId, SpaceInfo, TagId};
pub use router::{fnv64, LeaderCache, Router};

use quasar_types::thiserror::{self, Error};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Space not found: {0}")]
    SpaceNotFound(String),
    #[error("Partition {0} has no configured leaders")]
    NoLeader(PartitionId),
    #[error("Invalid vertex id: {0}")]
    InvalidVid(String),
    #[error("RPC to {host} failed: {message}")]
    Rpc { host: HostAddr, message: String },
    #[error("RPC timed out after {0} ms")]
    Timeout(u64),
    #[error("Storage reported {0} failed partition(s)")]
    PartialFailure(usize),
    #[error("Schema not found: space {space} {kind} `{name}`")]
    SchemaNotFound {
        space: SpaceId,
        kind: &'static str,
        name: String,
    },
}
