//! Bencoded response bodies for the HTTP tracker.
//!
//! Struct fields are declared in bencode key order, because dictionaries
//! serialize in field order and bencode requires sorted keys.
use std::collections::BTreeMap;
use std::net::SocketAddr;

use serde::Serialize;
use serde_bytes::ByteBuf;
use swarm_tracker_primitives::peer::Peer;

use crate::core::error::Error;
use crate::core::{AnnounceResponse, ScrapeResponse};

/// Non-compact announce: a list of peer dictionaries.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct Announce {
    pub complete: u32,
    pub incomplete: u32,
    pub interval: u32,
    #[serde(rename = "min interval")]
    pub min_interval: u32,
    pub peers: Vec<NormalPeer>,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct NormalPeer {
    pub ip: String,
    #[serde(rename = "peer id")]
    pub peer_id: ByteBuf,
    pub port: u16,
}

impl From<&Peer> for NormalPeer {
    fn from(peer: &Peer) -> Self {
        NormalPeer {
            ip: peer.peer_addr.ip().to_string(),
            peer_id: ByteBuf::from(peer.peer_id.0.to_vec()),
            port: peer.peer_addr.port(),
        }
    }
}

/// Compact announce ([BEP 23](https://www.bittorrent.org/beps/bep_0023.html)):
/// concatenated 6-byte (v4) and 18-byte (v6) address/port tuples.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct CompactAnnounce {
    pub complete: u32,
    pub incomplete: u32,
    pub interval: u32,
    #[serde(rename = "min interval")]
    pub min_interval: u32,
    pub peers: ByteBuf,
    pub peers6: ByteBuf,
}

fn compact_tuples(peers: &[Peer]) -> ByteBuf {
    let mut bytes = Vec::new();
    for peer in peers {
        match peer.peer_addr {
            SocketAddr::V4(addr) => {
                bytes.extend_from_slice(&addr.ip().octets());
                bytes.extend_from_slice(&addr.port().to_be_bytes());
            }
            SocketAddr::V6(addr) => {
                bytes.extend_from_slice(&addr.ip().octets());
                bytes.extend_from_slice(&addr.port().to_be_bytes());
            }
        }
    }
    ByteBuf::from(bytes)
}

/// Renders an announce response body.
///
/// # Errors
///
/// Will return an error if the body can't be bencoded.
pub fn announce_body(resp: &AnnounceResponse, compact: bool) -> Result<Vec<u8>, serde_bencode::Error> {
    if compact {
        serde_bencode::to_bytes(&CompactAnnounce {
            complete: resp.complete,
            incomplete: resp.incomplete,
            interval: resp.interval,
            min_interval: resp.min_interval,
            peers: compact_tuples(&resp.ipv4_peers),
            peers6: compact_tuples(&resp.ipv6_peers),
        })
    } else {
        let peers = resp.ipv4_peers.iter().chain(&resp.ipv6_peers).map(NormalPeer::from).collect();

        serde_bencode::to_bytes(&Announce {
            complete: resp.complete,
            incomplete: resp.incomplete,
            interval: resp.interval,
            min_interval: resp.min_interval,
            peers,
        })
    }
}

#[derive(Serialize, Debug, PartialEq, Eq)]
struct ScrapeFile {
    complete: u32,
    downloaded: u32,
    incomplete: u32,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
struct Scrape {
    /// Keyed by the raw infohash bytes; `BTreeMap` keeps the dictionary
    /// sorted.
    files: BTreeMap<ByteBuf, ScrapeFile>,
}

/// Renders a scrape response body.
///
/// # Errors
///
/// Will return an error if the body can't be bencoded.
pub fn scrape_body(resp: &ScrapeResponse) -> Result<Vec<u8>, serde_bencode::Error> {
    let files = resp
        .files
        .iter()
        .map(|entry| {
            (
                ByteBuf::from(entry.info_hash.bytes().to_vec()),
                ScrapeFile {
                    complete: entry.metadata.complete,
                    downloaded: entry.metadata.downloaded,
                    incomplete: entry.metadata.incomplete,
                },
            )
        })
        .collect();

    serde_bencode::to_bytes(&Scrape { files })
}

#[derive(Serialize, Debug, PartialEq, Eq)]
struct Failure {
    #[serde(rename = "failure reason")]
    failure_reason: String,
}

/// Renders an error as a bencoded `failure reason` body. Trackers answer
/// errors with HTTP 200; the body is the error channel.
#[must_use]
pub fn error_body(err: &Error) -> Vec<u8> {
    serde_bencode::to_bytes(&Failure {
        failure_reason: err.to_string(),
    })
    .unwrap_or_else(|_| b"d14:failure reason14:internal errore".to_vec())
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

    use swarm_tracker_primitives::peer::{self, Peer};
    use swarm_tracker_primitives::swarm_metadata::SwarmMetadata;

    use super::{announce_body, error_body, scrape_body};
    use crate::core::error::ClientError;
    use crate::core::{AnnounceResponse, ScrapeEntry, ScrapeResponse};

    fn v4_peer() -> Peer {
        Peer {
            peer_id: peer::Id(*b"-qB00000000000000001"),
            peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(105, 105, 105, 105)), 0x7070),
        }
    }

    fn v6_peer() -> Peer {
        Peer {
            peer_id: peer::Id(*b"-qB00000000000000002"),
            peer_addr: SocketAddr::new(IpAddr::V6(Ipv6Addr::new(0x6969, 0x6969, 0x6969, 0x6969, 0x6969, 0x6969, 0x6969, 0x6969)), 0x7070),
        }
    }

    fn sample_response() -> AnnounceResponse {
        AnnounceResponse {
            interval: 111,
            min_interval: 222,
            complete: 333,
            incomplete: 444,
            ipv4_peers: vec![v4_peer()],
            ipv6_peers: vec![v6_peer()],
        }
    }

    #[test]
    fn a_non_compact_announce_should_list_peer_dictionaries() {
        let body = announce_body(&sample_response(), false).unwrap();

        let expected = b"d8:completei333e10:incompletei444e8:intervali111e12:min intervali222e5:peersld2:ip15:105.105.105.1057:peer id20:-qB000000000000000014:porti28784eed2:ip39:6969:6969:6969:6969:6969:6969:6969:69697:peer id20:-qB000000000000000024:porti28784eeee";

        assert_eq!(String::from_utf8(body).unwrap(), String::from_utf8(expected.to_vec()).unwrap());
    }

    #[test]
    fn a_compact_announce_should_pack_6_and_18_byte_tuples() {
        let body = announce_body(&sample_response(), true).unwrap();

        let body = String::from_utf8_lossy(&body).into_owned();
        assert!(body.starts_with("d8:completei333e10:incompletei444e8:intervali111e12:min intervali222e5:peers6:"));
        assert!(body.contains("6:peers618:"));
    }

    #[test]
    fn a_scrape_body_should_key_files_by_the_raw_infohash() {
        let info_hash = "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0".parse().unwrap();
        let resp = ScrapeResponse {
            files: vec![ScrapeEntry {
                info_hash,
                metadata: SwarmMetadata {
                    downloaded: 1,
                    complete: 2,
                    incomplete: 3,
                },
            }],
        };

        let body = scrape_body(&resp).unwrap();

        let body = String::from_utf8_lossy(&body).into_owned();
        assert!(body.starts_with("d5:filesd20:"));
        assert!(body.ends_with("d8:completei2e10:downloadedi1e10:incompletei3eeee"));
    }

    #[test]
    fn an_error_should_become_a_failure_reason_body() {
        let body = error_body(&ClientError::UnapprovedTorrent.into());

        assert_eq!(body, b"d14:failure reason18:unapproved torrente");
    }
}
