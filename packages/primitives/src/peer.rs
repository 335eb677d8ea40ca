//! Peer struct used by the tracker core and the peer store.
//!
//! A peer is identified by its 20-byte peer id together with its socket
//! address. The peer store keys swarm entries by this full identity, so two
//! announces only collapse into the same entry when id, IP and port all
//! match.
use std::net::{IpAddr, SocketAddr};

use serde::Serialize;

use crate::IPVersion;

/// A peer participating in a swarm: `(peer id, address, port)`.
///
/// ```rust,no_run
/// use std::net::{IpAddr, Ipv4Addr, SocketAddr};
/// use swarm_tracker_primitives::peer;
///
/// let peer = peer::Peer {
///     peer_id: peer::Id(*b"-qB00000000000000001"),
///     peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1)), 6881),
/// };
/// ```
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Peer {
    /// ID used by the downloader peer.
    pub peer_id: Id,
    /// The IP and port this peer is listening on.
    pub peer_addr: SocketAddr,
}

impl Peer {
    #[must_use]
    pub fn ip(&self) -> IpAddr {
        self.peer_addr.ip()
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.peer_addr.port()
    }

    /// The IP version used by the peer: IPv4 or IPv6.
    #[must_use]
    pub fn ip_version(&self) -> IPVersion {
        if self.peer_addr.is_ipv4() {
            return IPVersion::IPv4;
        }
        IPVersion::IPv6
    }

    /// Re-addresses the peer, keeping its advertised port.
    #[must_use]
    pub fn with_ip(&self, new_ip: IpAddr) -> Self {
        Self {
            peer_id: self.peer_id,
            peer_addr: SocketAddr::new(new_ip, self.peer_addr.port()),
        }
    }
}

pub const PEER_ID_BYTES_LEN: usize = 20;

/// The 20-byte peer ID chosen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(pub [u8; PEER_ID_BYTES_LEN]);

impl From<[u8; PEER_ID_BYTES_LEN]> for Id {
    fn from(bytes: [u8; PEER_ID_BYTES_LEN]) -> Self {
        Id(bytes)
    }
}

impl Id {
    /// Converts to a `0x`-prefixed hex string.
    ///
    /// For the peer id `-qB00000000000000000` it returns
    /// `0x2d71423030303030303030303030303030303030`.
    #[must_use]
    pub fn to_hex_string(&self) -> String {
        let mut tmp = [0u8; PEER_ID_BYTES_LEN * 2];
        let hex = binascii::bin2hex(&self.0, &mut tmp).expect("failed to hexlify");
        format!("0x{}", std::str::from_utf8(hex).unwrap())
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex_string())
    }
}

impl Serialize for Id {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex_string())
    }
}

pub mod fixture {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use super::{Id, Peer};

    #[derive(PartialEq, Debug)]
    pub struct PeerBuilder {
        peer: Peer,
    }

    impl Default for PeerBuilder {
        fn default() -> Self {
            Self {
                peer: Peer {
                    peer_id: Id(*b"-qB00000000000000000"),
                    peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1)), 8080),
                },
            }
        }
    }

    impl PeerBuilder {
        #[must_use]
        pub fn with_peer_id(mut self, peer_id: &Id) -> Self {
            self.peer.peer_id = *peer_id;
            self
        }

        #[must_use]
        pub fn with_peer_addr(mut self, peer_addr: &SocketAddr) -> Self {
            self.peer.peer_addr = *peer_addr;
            self
        }

        #[must_use]
        pub fn build(self) -> Peer {
            self.peer
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

    use super::{Id, Peer};
    use crate::IPVersion;

    #[test]
    fn a_peer_id_should_be_converted_to_a_hex_string() {
        let id = Id(*b"-qB00000000000000000");
        assert_eq!(id.to_hex_string(), "0x2d71423030303030303030303030303030303030");

        let id = Id([0, 159, 146, 150, 0, 159, 146, 150, 0, 159, 146, 150, 0, 159, 146, 150, 0, 159, 146, 150]);
        assert_eq!(id.to_hex_string(), "0x009f9296009f9296009f9296009f9296009f9296");
    }

    #[test]
    fn peers_differing_only_by_port_should_not_be_equal() {
        let peer_1 = Peer {
            peer_id: Id(*b"-qB00000000000000000"),
            peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 6881),
        };
        let peer_2 = Peer {
            peer_id: Id(*b"-qB00000000000000000"),
            peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 6882),
        };

        assert_ne!(peer_1, peer_2);
    }

    #[test]
    fn the_ip_version_should_be_derived_from_the_peer_address() {
        let v4 = Peer {
            peer_id: Id(*b"-qB00000000000000000"),
            peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 6881),
        };
        let v6 = Peer {
            peer_id: Id(*b"-qB00000000000000000"),
            peer_addr: SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 6881),
        };

        assert_eq!(v4.ip_version(), IPVersion::IPv4);
        assert_eq!(v6.ip_version(), IPVersion::IPv6);
    }
}
