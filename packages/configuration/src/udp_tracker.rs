use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Configuration for one UDP tracker service.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct UdpTracker {
    /// The address the tracker will bind to.
    pub bind_address: SocketAddr,

    /// Number of parallel receive loops, each with its own socket.
    /// Values above 1 need `SO_REUSEPORT`, which is set automatically.
    #[serde(default = "UdpTracker::default_workers")]
    pub workers: usize,

    /// Secret seeding the connection-ID MAC key. A random key is generated
    /// when unset, which is fine unless several tracker instances must
    /// accept each other's connection IDs.
    #[serde(default)]
    pub private_key: Option<String>,

    /// Tolerated difference, in seconds, between the timestamp inside a
    /// connection ID and the server clock.
    #[serde(default = "UdpTracker::default_max_clock_skew")]
    pub max_clock_skew: u64,

    /// Record per-request handling durations in the statistics repo.
    #[serde(default)]
    pub enable_request_timing: bool,
}

impl Default for UdpTracker {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:6969".parse().expect("hardcoded socket address should parse"),
            workers: Self::default_workers(),
            private_key: None,
            max_clock_skew: Self::default_max_clock_skew(),
            enable_request_timing: false,
        }
    }
}

impl UdpTracker {
    fn default_workers() -> usize {
        1
    }

    fn default_max_clock_skew() -> u64 {
        120
    }
}
