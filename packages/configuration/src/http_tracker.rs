use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Configuration for one HTTP tracker service.
///
/// The HTTP frontend is a thin transcoder over the same announce and scrape
/// logic the UDP frontend drives. TLS termination is left to a reverse
/// proxy.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct HttpTracker {
    /// The address the tracker will bind to.
    pub bind_address: SocketAddr,
}

impl Default for HttpTracker {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:7070".parse().expect("hardcoded socket address should parse"),
        }
    }
}
