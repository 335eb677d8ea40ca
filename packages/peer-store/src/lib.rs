//! The peer store: an ephemeral, concurrent index of
//! `infohash -> {seeders, leechers}` plus a snatch counter per swarm.
//!
//! The [`PeerStore`] trait is the contract every storage backend must
//! satisfy; [`MemoryPeerStore`](memory::MemoryPeerStore) is the reference
//! in-memory implementation, a sharded map under reader/writer locks. A
//! remote backend (Redis, SQL) would implement the same trait and surface
//! I/O failures as [`Error::Unavailable`].
//!
//! [`DataStore`] is a small namespaced key/value side channel, used by
//! middleware (for example torrent approval lists) that needs persistent
//! small state next to the peer data.
use std::time::Duration;

use async_trait::async_trait;
use swarm_tracker_primitives::info_hash::InfoHash;
use swarm_tracker_primitives::peer::Peer;
use swarm_tracker_primitives::store_metrics::StoreMetrics;
use swarm_tracker_primitives::swarm_metadata::SwarmMetadata;

pub mod error;
pub mod memory;
pub mod swarm;

pub use error::Error;

/// This alias needs to be redeclared in each crate that reads the clock.
/// Working version, for production.
#[cfg(not(test))]
pub(crate) type CurrentClock = swarm_tracker_clock::Working;

/// Stopped version, for testing.
#[cfg(test)]
pub(crate) type CurrentClock = swarm_tracker_clock::Stopped;

/// The contract a peer-store backend must satisfy.
///
/// All operations are async so that remote backends can block on I/O;
/// cancelling the calling task aborts the operation.
#[async_trait]
pub trait PeerStore: Sync + Send {
    /// Inserts the peer into the seeder set, refreshing its timestamp if it
    /// was already there. A leecher entry for the same peer is removed.
    async fn put_seeder(&self, info_hash: InfoHash, peer: Peer) -> Result<(), Error>;

    /// Inserts the peer into the leecher set, refreshing its timestamp if
    /// it was already there. A seeder entry for the same peer is removed.
    async fn put_leecher(&self, info_hash: InfoHash, peer: Peer) -> Result<(), Error>;

    /// Removes the peer from the seeder set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the swarm or the peer is absent.
    async fn delete_seeder(&self, info_hash: InfoHash, peer: Peer) -> Result<(), Error>;

    /// Removes the peer from the leecher set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the swarm or the peer is absent.
    async fn delete_leecher(&self, info_hash: InfoHash, peer: Peer) -> Result<(), Error>;

    /// Atomically moves the peer from the leecher set to the seeder set,
    /// bumping the swarm's snatch counter on a real transition. A peer that
    /// was not a leecher is simply put as a seeder, without a snatch.
    async fn graduate_leecher(&self, info_hash: InfoHash, peer: Peer) -> Result<(), Error>;

    /// Returns up to `wanted` peers of the requested address family, as a
    /// random sample without replacement.
    ///
    /// Seeders asking for peers (`for_seeder`) get leechers only; leechers
    /// get seeders first and leechers to fill. An empty result is not an
    /// error.
    async fn announce_peers(
        &self,
        info_hash: InfoHash,
        for_seeder: bool,
        wanted: usize,
        want_v6: bool,
    ) -> Result<Vec<Peer>, Error>;

    /// The scrape counters for one swarm. A missing swarm scrapes as
    /// zeroes.
    async fn scrape_swarm(&self, info_hash: InfoHash) -> Result<SwarmMetadata, Error>;

    /// Liveness check, used by frontends before reporting healthy.
    async fn ping(&self) -> Result<(), Error>;

    /// Aggregate totals over all swarms.
    fn metrics(&self) -> StoreMetrics;

    /// Spawns the garbage-collection job: every `gc_interval` it removes
    /// peers that have not announced for `peer_lifetime` and reaps empty
    /// swarms.
    fn schedule_gc(&self, gc_interval: Duration, peer_lifetime: Duration);

    /// Spawns the statistics job: every `interval` it logs an aggregate
    /// snapshot of the store.
    fn schedule_stats(&self, interval: Duration);

    /// Stops the scheduled jobs and waits for them to finish.
    async fn stop(&self);
}

/// Namespaced key/value storage for middleware state.
#[async_trait]
pub trait DataStore: Sync + Send {
    async fn put(&self, namespace: &str, key: Vec<u8>, value: Vec<u8>) -> Result<(), Error>;

    async fn load(&self, namespace: &str, key: &[u8]) -> Result<Option<Vec<u8>>, Error>;

    async fn contains(&self, namespace: &str, key: &[u8]) -> Result<bool, Error>;

    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the key is absent.
    async fn delete(&self, namespace: &str, key: &[u8]) -> Result<(), Error>;
}

/// Full storage: peer swarms plus the key/value side channel.
pub trait Storage: PeerStore + DataStore {}

impl<T: PeerStore + DataStore> Storage for T {}
