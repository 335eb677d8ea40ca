//! swarm-tracker: a `BitTorrent` tracker.
//!
//! Peers announce their participation in a swarm over UDP
//! ([BEP 15](https://www.bittorrent.org/beps/bep_0015.html)) or HTTP
//! ([BEP 3](https://www.bittorrent.org/beps/bep_0003.html)) and get back
//! a random sample of the swarm to connect to. The tracker keeps an
//! ephemeral in-memory view of every swarm: who seeds, who leeches, and
//! how many downloads completed.
//!
//! The crate splits into:
//!
//! - [`core`]: the middleware pipeline and its hooks, shared by all
//!   frontends.
//! - [`servers`]: the UDP and HTTP frontends.
//! - [`app`]/[`bootstrap`]: configuration-driven assembly and lifecycle.
//!
//! The peer store itself lives in the `swarm-tracker-peer-store` crate;
//! the structures it indexes are in `swarm-tracker-primitives`.
pub mod app;
pub mod bootstrap;
pub mod core;
pub mod servers;

/// This alias needs to be redeclared in each crate that reads the clock.
/// Working version, for production.
#[cfg(not(test))]
pub type CurrentClock = swarm_tracker_clock::Working;

/// Stopped version, for testing.
#[cfg(test)]
pub type CurrentClock = swarm_tracker_clock::Stopped;
