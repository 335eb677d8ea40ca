//! The state kept for a single infohash.
use std::collections::HashMap;

use swarm_tracker_primitives::peer::Peer;
use swarm_tracker_primitives::swarm_metadata::SwarmMetadata;
use swarm_tracker_primitives::{DurationSinceUnixEpoch, IPVersion};

/// One swarm: the seeders and leechers of a single torrent, each keyed by
/// the full peer identity and valued by the last-announce timestamp, plus
/// the number of completed downloads observed.
///
/// Invariant: a peer is in at most one of the two sets at any instant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Swarm {
    seeders: HashMap<Peer, DurationSinceUnixEpoch>,
    leechers: HashMap<Peer, DurationSinceUnixEpoch>,
    snatches: u32,
}

impl Swarm {
    /// Inserts or refreshes a seeder, removing any leecher entry for the
    /// same peer.
    pub fn upsert_seeder(&mut self, peer: Peer, now: DurationSinceUnixEpoch) {
        self.leechers.remove(&peer);
        self.seeders.insert(peer, now);
    }

    /// Inserts or refreshes a leecher, removing any seeder entry for the
    /// same peer.
    pub fn upsert_leecher(&mut self, peer: Peer, now: DurationSinceUnixEpoch) {
        self.seeders.remove(&peer);
        self.leechers.insert(peer, now);
    }

    /// Returns whether the peer was present.
    pub fn remove_seeder(&mut self, peer: &Peer) -> bool {
        self.seeders.remove(peer).is_some()
    }

    /// Returns whether the peer was present.
    pub fn remove_leecher(&mut self, peer: &Peer) -> bool {
        self.leechers.remove(peer).is_some()
    }

    /// Moves the peer from the leecher set to the seeder set, counting a
    /// snatch only on a real transition. A peer that was not a leecher is
    /// inserted as a seeder without a snatch.
    pub fn graduate_leecher(&mut self, peer: Peer, now: DurationSinceUnixEpoch) {
        if self.leechers.remove(&peer).is_some() {
            self.snatches += 1;
        }
        self.seeders.insert(peer, now);
    }

    /// The peers another announcer may be told about, filtered by address
    /// family. The order is map-iteration order; callers are expected to
    /// random-sample, never to expose it.
    #[must_use]
    pub fn candidates(&self, from_seeders: bool, family: IPVersion) -> Vec<Peer> {
        let set = if from_seeders { &self.seeders } else { &self.leechers };
        set.keys().filter(|peer| peer.ip_version() == family).copied().collect()
    }

    /// Drops every peer whose last announce is at or before `cutoff`.
    pub fn remove_inactive_peers(&mut self, cutoff: DurationSinceUnixEpoch) {
        self.seeders.retain(|_, updated| *updated > cutoff);
        self.leechers.retain(|_, updated| *updated > cutoff);
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn metadata(&self) -> SwarmMetadata {
        SwarmMetadata {
            downloaded: self.snatches,
            complete: self.seeders.len() as u32,
            incomplete: self.leechers.len() as u32,
        }
    }

    #[must_use]
    pub fn seeders_count(&self) -> usize {
        self.seeders.len()
    }

    #[must_use]
    pub fn leechers_count(&self) -> usize {
        self.leechers.len()
    }

    /// True when both peer sets are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seeders.is_empty() && self.leechers.is_empty()
    }

    /// True when the garbage collector may drop the whole swarm: no peers
    /// in either set and no snatches recorded.
    #[must_use]
    pub fn is_reapable(&self) -> bool {
        self.is_empty() && self.snatches == 0
    }

    /// Timestamp of a peer in either set, for tests and introspection.
    #[must_use]
    pub fn updated_at(&self, peer: &Peer) -> Option<DurationSinceUnixEpoch> {
        self.seeders.get(peer).or_else(|| self.leechers.get(peer)).copied()
    }
}
