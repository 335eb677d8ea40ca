//! Primitive types shared by the swarm-tracker crates.
//!
//! These are the basic `BitTorrent` data structures used by the tracker
//! server crate and by the peer store: infohashes, peers, announce events
//! and aggregate swarm statistics.
use std::time::Duration;

pub mod announce_event;
pub mod info_hash;
pub mod peer;
pub mod store_metrics;
pub mod swarm_metadata;

/// Duration since the Unix Epoch.
pub type DurationSinceUnixEpoch = Duration;

/// IP version used by a peer: IPv4 or IPv6.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum IPVersion {
    IPv4,
    IPv6,
}
