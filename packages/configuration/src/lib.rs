//! Configuration data structures for the swarm-tracker.
//!
//! The whole configuration is loaded from a single TOML file (or built in
//! code for tests). Each running service gets its own section:
//! `[core]` for the tracker policies shared by every frontend,
//! `[[udp_trackers]]` and `[[http_trackers]]` for the sockets to serve, and
//! `[peer_store]` for the in-memory swarm store.
use std::net::SocketAddr;

use derive_more::Constructor;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod core;
pub mod http_tracker;
pub mod middleware;
pub mod peer_store;
pub mod udp_tracker;

pub use crate::core::{Core, SpoofingPolicy};
pub use crate::http_tracker::HttpTracker;
pub use crate::middleware::{IntervalVariation, Middleware, TorrentApproval};
pub use crate::peer_store::PeerStoreConfig;
pub use crate::udp_tracker::UdpTracker;

/// Errors that can occur when loading the configuration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unable to read config file {path}: {source}")]
    UnreadableFile {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config: {source}")]
    Invalid {
        #[from]
        source: toml::de::Error,
    },
}

/// The announce interval policy handed to clients.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy, Constructor)]
pub struct AnnouncePolicy {
    /// Interval in seconds that the client should wait between regular
    /// announce requests.
    pub interval: u32,

    /// Minimum announce interval. Clients must not reannounce more
    /// frequently than this.
    pub interval_min: u32,
}

impl Default for AnnouncePolicy {
    fn default() -> Self {
        Self {
            interval: Self::default_interval(),
            interval_min: Self::default_interval_min(),
        }
    }
}

impl AnnouncePolicy {
    fn default_interval() -> u32 {
        1800
    }

    fn default_interval_min() -> u32 {
        900
    }
}

/// Logging settings.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct Logging {
    /// Lowest level that gets emitted: `off`, `error`, `warn`, `info`,
    /// `debug` or `trace`.
    #[serde(default = "Logging::default_threshold")]
    pub threshold: String,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            threshold: Self::default_threshold(),
        }
    }
}

impl Logging {
    fn default_threshold() -> String {
        "info".to_owned()
    }
}

/// Whole tracker configuration.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Default)]
pub struct Configuration {
    #[serde(default)]
    pub logging: Logging,

    #[serde(default)]
    pub core: Core,

    #[serde(default)]
    pub peer_store: PeerStoreConfig,

    #[serde(default)]
    pub middleware: Middleware,

    /// UDP tracker services to run. More than one is allowed, on different
    /// ports.
    #[serde(default)]
    pub udp_trackers: Vec<UdpTracker>,

    /// HTTP tracker services to run.
    #[serde(default)]
    pub http_trackers: Vec<HttpTracker>,
}

impl Configuration {
    /// Loads the configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Will return an error if the file can't be read or does not contain a
    /// valid configuration.
    pub fn load_from_file(path: &str) -> Result<Configuration, Error> {
        let contents = std::fs::read_to_string(path).map_err(|source| Error::UnreadableFile {
            path: path.to_owned(),
            source,
        })?;

        Self::load_from_str(&contents)
    }

    /// Parses the configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Will return an error if the string is not a valid configuration.
    pub fn load_from_str(contents: &str) -> Result<Configuration, Error> {
        Ok(toml::from_str(contents)?)
    }

    /// A configuration with one UDP tracker on an ephemeral port, used by
    /// tests and examples.
    #[must_use]
    pub fn ephemeral() -> Configuration {
        Configuration {
            udp_trackers: vec![UdpTracker {
                bind_address: ephemeral_bind_address(),
                ..UdpTracker::default()
            }],
            ..Default::default()
        }
    }
}

fn ephemeral_bind_address() -> SocketAddr {
    "127.0.0.1:0".parse().expect("hardcoded socket address should parse")
}
