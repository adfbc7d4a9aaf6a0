use std::collections::HashMap;
use std::sync::Arc;

use quasar_types::parking_lot::RwLock;
use quasar_types::types::Value;

use crate::host::HostAddr;
use crate::meta::{PartitionId, SpaceId, SpaceInfo, VidKind};
use crate::ClientError;

const FNV64_SEED: u64 = 0xcbf2_9ce4_8422_2325;

/// 64-bit FNV-1 with sign-extended bytes, matching the hash the storage
/// layer uses for string vids. The sign extension is load-bearing: bytes
/// above 0x7f flip the high bits.
pub fn fnv64(bytes: &[u8]) -> u64 {
    let mut hash = FNV64_SEED;
    for &byte in bytes {
        hash = hash
            .wrapping_add(hash << 1)
            .wrapping_add(hash << 4)
            .wrapping_add(hash << 5)
            .wrapping_add(hash << 7)
            .wrapping_add(hash << 8)
            .wrapping_add(hash << 40);
        hash ^= (byte as i8) as i64 as u64;
    }
    hash
}

/// Leader forwarding cache: `(space, part) → host` learned from
/// LEADER_CHANGED responses. Published as immutable snapshots so routing
/// reads never block behind an update.
#[derive(Default)]
pub struct LeaderCache {
    map: RwLock<Arc<HashMap<(SpaceId, PartitionId), HostAddr>>>,
}

impl LeaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, space: SpaceId, part: PartitionId) -> Option<HostAddr> {
        self.map.read().get(&(space, part)).cloned()
    }

    pub fn update(&self, space: SpaceId, part: PartitionId, leader: HostAddr) {
        let mut guard = self.map.write();
        let mut next = HashMap::clone(&guard);
        next.insert((space, part), leader);
        *guard = Arc::new(next);
    }
}

/// Maps ids to partitions and partitions to hosts for one space.
pub struct Router {
    space: Arc<SpaceInfo>,
    leader_cache: Arc<LeaderCache>,
}

impl Router {
    pub fn new(space: Arc<SpaceInfo>, leader_cache: Arc<LeaderCache>) -> Self {
        Self {
            space,
            leader_cache,
        }
    }

    pub fn space(&self) -> &Arc<SpaceInfo> {
        &self.space
    }

    /// Partition ids are 1-based. Integer vids wrap `vid mod n` into
    /// `1..=n` (0 maps to n, negatives wrap positive); string vids hash.
    pub fn partition_id(&self, vid: &Value) -> Result<PartitionId, ClientError> {
        let n = self.space.part_count;
        match (self.space.vid_kind, vid) {
            (VidKind::Int64, Value::Int(i)) => {
                let m = i.rem_euclid(n as i64) as u32;
                Ok(if m == 0 { n } else { m })
            }
            (VidKind::FixedString, Value::Str(s)) => {
                Ok((fnv64(s.as_bytes()) % u64::from(n)) as u32 + 1)
            }
            _ => Err(ClientError::InvalidVid(vid.to_string())),
        }
    }

    /// The host currently believed to lead a partition: the forwarding
    /// cache first, then the configured replica list.
    pub fn leader_of(&self, part: PartitionId) -> Result<HostAddr, ClientError> {
        if let Some(cached) = self.leader_cache.get(self.space.id, part) {
            return Ok(cached);
        }
        self.space
            .leaders
            .get(&part)
            .and_then(|hosts| hosts.first())
            .cloned()
            .ok_or(ClientError::NoLeader(part))
    }

    /// Clusters a batch by owning host and partition, preserving input
    /// order within each id list. The key extractor lets vertex batches
    /// (the vid) and edge batches (src for outbound, dst for inbound)
    /// share this path.
    pub fn cluster_by_host<T>(
        &self,
        items: Vec<T>,
        key: impl Fn(&T) -> &Value,
    ) -> Result<HashMap<HostAddr, HashMap<PartitionId, Vec<T>>>, ClientError> {
        let mut clusters: HashMap<HostAddr, HashMap<PartitionId, Vec<T>>> = HashMap::new();
        for item in items {
            let part = self.partition_id(key(&item))?;
            let host = self.leader_of(part)?;
            clusters
                .entry(host)
                .or_default()
                .entry(part)
                .or_default()
                .push(item);
        }
        Ok(clusters)
    }
}
