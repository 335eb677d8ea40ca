use serde::{Deserialize, Serialize};

/// Configuration for the in-memory peer store.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct PeerStoreConfig {
    /// Seconds between garbage-collection sweeps.
    #[serde(default = "PeerStoreConfig::default_gc_interval")]
    pub gc_interval: u64,

    /// Seconds a peer survives without re-announcing before the garbage
    /// collector removes it.
    #[serde(default = "PeerStoreConfig::default_peer_lifetime")]
    pub peer_lifetime: u64,

    /// Number of independent shards the swarm index is split over.
    /// Must be a power of two; other values fall back to the default.
    #[serde(default = "PeerStoreConfig::default_shard_count")]
    pub shard_count: u32,

    /// Seconds between aggregate statistics snapshots. Zero disables the
    /// stats job.
    #[serde(default = "PeerStoreConfig::default_stats_interval")]
    pub stats_interval: u64,
}

impl Default for PeerStoreConfig {
    fn default() -> Self {
        Self {
            gc_interval: Self::default_gc_interval(),
            peer_lifetime: Self::default_peer_lifetime(),
            shard_count: Self::default_shard_count(),
            stats_interval: Self::default_stats_interval(),
        }
    }
}

impl PeerStoreConfig {
    /// The configured shard count if it is a power of two, the default
    /// otherwise.
    #[must_use]
    pub fn effective_shard_count(&self) -> u32 {
        if self.shard_count.is_power_of_two() {
            self.shard_count
        } else {
            Self::default_shard_count()
        }
    }

    fn default_gc_interval() -> u64 {
        180
    }

    fn default_peer_lifetime() -> u64 {
        1860
    }

    fn default_shard_count() -> u32 {
        1024
    }

    fn default_stats_interval() -> u64 {
        60
    }
}
