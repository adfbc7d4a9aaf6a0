use serde::{Deserialize, Serialize};

fn default_num_path_thread() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_heartbeat_interval_secs() -> u64 {
    10
}

fn default_storage_rpc_timeout_ms() -> u64 {
    60_000
}

fn default_vid_len() -> usize {
    8
}

fn default_max_scan_batch() -> usize {
    4096
}

/// Runtime flags shared across the query and client layers. Loaded from a
/// YAML document; every field has a default so partial configs work.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphConfig {
    /// When false (the default), a single failed partition fails the batch.
    /// When true, failed parts degrade to warnings and missing data is
    /// tolerated.
    #[serde(default)]
    pub accept_partial_success: bool,

    /// Concurrency for multi-pair path jobs.
    #[serde(default = "default_num_path_thread")]
    pub num_path_thread: usize,

    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    #[serde(default = "default_storage_rpc_timeout_ms")]
    pub storage_rpc_timeout_ms: u64,

    /// Fixed width of persisted vertex ids; shorter vids are padded with
    /// `\x00`.
    #[serde(default = "default_vid_len")]
    pub vid_len: usize,

    #[serde(default = "default_max_scan_batch")]
    pub max_scan_batch: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            accept_partial_success: false,
            num_path_thread: default_num_path_thread(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            storage_rpc_timeout_ms: default_storage_rpc_timeout_ms(),
            vid_len: default_vid_len(),
            max_scan_batch: default_max_scan_batch(),
        }
    }
}

impl GraphConfig {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }
}
