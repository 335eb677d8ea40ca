//! The reference in-memory peer store.
//!
//! Swarms are spread over `shard_count` independent shards, each a
//! `HashMap<InfoHash, Swarm>` behind its own reader/writer lock, so that
//! parallel announces for different torrents rarely contend. The shard is
//! picked from the first four bytes of the infohash.
//!
//! Global seeder/leecher counters are kept in atomics and updated by the
//! delta of every mutation; they match the per-swarm sums once the store is
//! quiescent.
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::IteratorRandom;
use swarm_tracker_clock::Time;
use swarm_tracker_primitives::info_hash::InfoHash;
use swarm_tracker_primitives::peer::Peer;
use swarm_tracker_primitives::store_metrics::StoreMetrics;
use swarm_tracker_primitives::swarm_metadata::SwarmMetadata;
use swarm_tracker_primitives::{DurationSinceUnixEpoch, IPVersion};
use tokio::task::JoinHandle;

use crate::swarm::Swarm;
use crate::{CurrentClock, DataStore, Error, PeerStore};

const PEER_STORE_LOG_TARGET: &str = "PEER STORE";

/// Sharded in-memory implementation of [`PeerStore`] and [`DataStore`].
pub struct MemoryPeerStore {
    inner: Arc<Inner>,
    halt: tokio::sync::watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

struct Inner {
    shards: Vec<RwLock<HashMap<InfoHash, Swarm>>>,
    seeders: AtomicU64,
    leechers: AtomicU64,
    kv: RwLock<HashMap<String, HashMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryPeerStore {
    /// Builds a store with `shard_count` shards. Counts that are not a
    /// power of two are the caller's mistake; the configuration layer
    /// already normalizes them.
    #[must_use]
    pub fn new(shard_count: u32) -> Self {
        let shard_count = shard_count.max(1).next_power_of_two() as usize;
        let shards = (0..shard_count).map(|_| RwLock::new(HashMap::new())).collect();

        let (halt, _) = tokio::sync::watch::channel(false);

        Self {
            inner: Arc::new(Inner {
                shards,
                seeders: AtomicU64::new(0),
                leechers: AtomicU64::new(0),
                kv: RwLock::new(HashMap::new()),
            }),
            halt,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Removes every peer whose last announce is at or before `cutoff` and
    /// reaps swarms left with no peers and no snatches.
    ///
    /// Shards are swept independently; the write lock is held per shard,
    /// never globally.
    pub fn cleanup(&self, cutoff: DurationSinceUnixEpoch) {
        self.inner.cleanup(cutoff);
    }
}

impl Inner {
    fn shard_for(&self, info_hash: &InfoHash) -> &RwLock<HashMap<InfoHash, Swarm>> {
        let bytes = info_hash.bytes();
        let prefix = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        &self.shards[prefix & (self.shards.len() - 1)]
    }

    /// Every key a mutation or read must touch: the hash itself, plus the
    /// v1 truncation for v2 hashes so hybrid swarms share peers.
    fn mirror_keys(info_hash: InfoHash) -> impl Iterator<Item = InfoHash> {
        let mirrored = info_hash.is_v2().then(|| info_hash.truncate_v1());
        std::iter::once(info_hash).chain(mirrored)
    }

    /// Runs `mutation` on the swarm for `key`, creating it first when
    /// `create` is set, and folds the seeder/leecher count changes into the
    /// global counters. Returns `None` when the swarm is absent and
    /// `create` is not set.
    fn mutate_swarm<R>(&self, key: InfoHash, create: bool, mutation: impl FnOnce(&mut Swarm) -> R) -> Option<R> {
        let mut shard = self.shard_for(&key).write().expect("peer store shard lock poisoned");

        let swarm = if create {
            shard.entry(key).or_default()
        } else {
            shard.get_mut(&key)?
        };

        let seeders_before = swarm.seeders_count();
        let leechers_before = swarm.leechers_count();

        let result = mutation(swarm);

        let seeders_after = swarm.seeders_count();
        let leechers_after = swarm.leechers_count();
        drop(shard);

        adjust_counter(&self.seeders, seeders_before, seeders_after);
        adjust_counter(&self.leechers, leechers_before, leechers_after);

        Some(result)
    }

    fn read_swarm<R>(&self, key: &InfoHash, read: impl FnOnce(&Swarm) -> R) -> Option<R> {
        let shard = self.shard_for(key).read().expect("peer store shard lock poisoned");
        shard.get(key).map(read)
    }

    fn cleanup(&self, cutoff: DurationSinceUnixEpoch) {
        for shard in &self.shards {
            let keys: Vec<InfoHash> = {
                let shard = shard.read().expect("peer store shard lock poisoned");
                shard.keys().copied().collect()
            };

            for key in keys {
                let mut shard = shard.write().expect("peer store shard lock poisoned");

                let Some(swarm) = shard.get_mut(&key) else {
                    continue;
                };

                let seeders_before = swarm.seeders_count();
                let leechers_before = swarm.leechers_count();

                swarm.remove_inactive_peers(cutoff);

                let seeders_after = swarm.seeders_count();
                let leechers_after = swarm.leechers_count();

                if swarm.is_reapable() {
                    shard.remove(&key);
                }
                drop(shard);

                adjust_counter(&self.seeders, seeders_before, seeders_after);
                adjust_counter(&self.leechers, leechers_before, leechers_after);
            }
        }
    }
}

fn adjust_counter(counter: &AtomicU64, before: usize, after: usize) {
    if after > before {
        counter.fetch_add((after - before) as u64, Ordering::Relaxed);
    } else if before > after {
        counter.fetch_sub((before - after) as u64, Ordering::Relaxed);
    }
}

#[async_trait]
impl PeerStore for MemoryPeerStore {
    async fn put_seeder(&self, info_hash: InfoHash, peer: Peer) -> Result<(), Error> {
        let now = CurrentClock::now();
        for key in Inner::mirror_keys(info_hash) {
            self.inner.mutate_swarm(key, true, |swarm| swarm.upsert_seeder(peer, now));
        }
        Ok(())
    }

    async fn put_leecher(&self, info_hash: InfoHash, peer: Peer) -> Result<(), Error> {
        let now = CurrentClock::now();
        for key in Inner::mirror_keys(info_hash) {
            self.inner.mutate_swarm(key, true, |swarm| swarm.upsert_leecher(peer, now));
        }
        Ok(())
    }

    async fn delete_seeder(&self, info_hash: InfoHash, peer: Peer) -> Result<(), Error> {
        let mut removed = false;
        for key in Inner::mirror_keys(info_hash) {
            removed |= self
                .inner
                .mutate_swarm(key, false, |swarm| swarm.remove_seeder(&peer))
                .unwrap_or(false);
        }

        if removed {
            Ok(())
        } else {
            Err(Error::NotFound)
        }
    }

    async fn delete_leecher(&self, info_hash: InfoHash, peer: Peer) -> Result<(), Error> {
        let mut removed = false;
        for key in Inner::mirror_keys(info_hash) {
            removed |= self
                .inner
                .mutate_swarm(key, false, |swarm| swarm.remove_leecher(&peer))
                .unwrap_or(false);
        }

        if removed {
            Ok(())
        } else {
            Err(Error::NotFound)
        }
    }

    async fn graduate_leecher(&self, info_hash: InfoHash, peer: Peer) -> Result<(), Error> {
        let now = CurrentClock::now();
        for key in Inner::mirror_keys(info_hash) {
            self.inner.mutate_swarm(key, true, |swarm| swarm.graduate_leecher(peer, now));
        }
        Ok(())
    }

    async fn announce_peers(
        &self,
        info_hash: InfoHash,
        for_seeder: bool,
        wanted: usize,
        want_v6: bool,
    ) -> Result<Vec<Peer>, Error> {
        if wanted == 0 {
            return Ok(vec![]);
        }

        let family = if want_v6 { IPVersion::IPv6 } else { IPVersion::IPv4 };

        // Union the candidate sets over the mirror keys, deduplicating by
        // peer identity; a hybrid swarm's peers show up under both forms.
        let mut seeders: HashSet<Peer> = HashSet::new();
        let mut leechers: HashSet<Peer> = HashSet::new();

        for key in Inner::mirror_keys(info_hash) {
            self.inner.read_swarm(&key, |swarm| {
                if !for_seeder {
                    seeders.extend(swarm.candidates(true, family));
                }
                leechers.extend(swarm.candidates(false, family));
            });
        }

        let mut rng = rand::thread_rng();

        // Random sample without replacement; map iteration order never
        // reaches the wire. Seeders are not interested in other seeders,
        // everyone else gets seeders first and leechers to fill.
        let mut peers = seeders.iter().copied().choose_multiple(&mut rng, wanted);

        if peers.len() < wanted {
            let fill = leechers
                .iter()
                .filter(|peer| !seeders.contains(peer))
                .copied()
                .choose_multiple(&mut rng, wanted - peers.len());
            peers.extend(fill);
        }

        Ok(peers)
    }

    async fn scrape_swarm(&self, info_hash: InfoHash) -> Result<SwarmMetadata, Error> {
        let mut metadata = SwarmMetadata::zeroed();

        for key in Inner::mirror_keys(info_hash) {
            if let Some(part) = self.inner.read_swarm(&key, Swarm::metadata) {
                metadata.downloaded += part.downloaded;
                metadata.complete += part.complete;
                metadata.incomplete += part.incomplete;
            }
        }

        Ok(metadata)
    }

    async fn ping(&self) -> Result<(), Error> {
        Ok(())
    }

    fn metrics(&self) -> StoreMetrics {
        let swarms = self
            .inner
            .shards
            .iter()
            .map(|shard| shard.read().expect("peer store shard lock poisoned").len() as u64)
            .sum();

        StoreMetrics {
            seeders: self.inner.seeders.load(Ordering::Relaxed),
            leechers: self.inner.leechers.load(Ordering::Relaxed),
            swarms,
        }
    }

    fn schedule_gc(&self, gc_interval: Duration, peer_lifetime: Duration) {
        let inner = self.inner.clone();
        let mut halt = self.halt.subscribe();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(gc_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let cutoff = CurrentClock::now_sub(&peer_lifetime);
                        inner.cleanup(cutoff);
                        tracing::debug!(target: PEER_STORE_LOG_TARGET, ?cutoff, "swept inactive peers");
                    }
                    _ = halt.changed() => {
                        tracing::debug!(target: PEER_STORE_LOG_TARGET, "garbage collection stopped");
                        break;
                    }
                }
            }
        });

        self.tasks.lock().expect("peer store task list poisoned").push(task);
    }

    fn schedule_stats(&self, interval: Duration) {
        if interval.is_zero() {
            return;
        }

        let inner = self.inner.clone();
        let mut halt = self.halt.subscribe();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let swarms: u64 = inner
                            .shards
                            .iter()
                            .map(|shard| shard.read().expect("peer store shard lock poisoned").len() as u64)
                            .sum();
                        tracing::info!(
                            target: PEER_STORE_LOG_TARGET,
                            seeders = inner.seeders.load(Ordering::Relaxed),
                            leechers = inner.leechers.load(Ordering::Relaxed),
                            swarms,
                            "store statistics"
                        );
                    }
                    _ = halt.changed() => {
                        break;
                    }
                }
            }
        });

        self.tasks.lock().expect("peer store task list poisoned").push(task);
    }

    async fn stop(&self) {
        drop(self.halt.send(true));

        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().expect("peer store task list poisoned").drain(..).collect();
        for task in tasks {
            drop(task.await);
        }
    }
}

#[async_trait]
impl DataStore for MemoryPeerStore {
    async fn put(&self, namespace: &str, key: Vec<u8>, value: Vec<u8>) -> Result<(), Error> {
        let mut kv = self.inner.kv.write().expect("data store lock poisoned");
        kv.entry(namespace.to_owned()).or_default().insert(key, value);
        Ok(())
    }

    async fn load(&self, namespace: &str, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        let kv = self.inner.kv.read().expect("data store lock poisoned");
        Ok(kv.get(namespace).and_then(|entries| entries.get(key).cloned()))
    }

    async fn contains(&self, namespace: &str, key: &[u8]) -> Result<bool, Error> {
        let kv = self.inner.kv.read().expect("data store lock poisoned");
        Ok(kv.get(namespace).is_some_and(|entries| entries.contains_key(key)))
    }

    async fn delete(&self, namespace: &str, key: &[u8]) -> Result<(), Error> {
        let mut kv = self.inner.kv.write().expect("data store lock poisoned");

        match kv.get_mut(namespace).and_then(|entries| entries.remove(key)) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound),
        }
    }
}
