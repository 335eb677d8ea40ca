//! BEP 15 request frames.
//!
//! All integers are big-endian. Every client packet starts with the same
//! 16-byte header: `connection_id(8) || action(4) || transaction_id(4)`.
//! For a connect the connection-ID slot carries the protocol magic
//! instead.
use std::io::{Cursor, Read};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use byteorder::{NetworkEndian, ReadBytesExt};
use swarm_tracker_primitives::announce_event::AnnounceEvent;
use swarm_tracker_primitives::info_hash::{InfoHash, INFO_HASH_V1_BYTES_LEN};
use swarm_tracker_primitives::peer;

use crate::core::error::ClientError;
use crate::servers::udp::connection_cookie::Cookie;

/// The magic value a connect request carries in its connection-ID slot.
pub const PROTOCOL_MAGIC: i64 = 0x0417_2710_1980;

/// No client packet is shorter than the common header.
pub const MIN_PACKET_LEN: usize = 16;

pub const CONNECT_ACTION_ID: u32 = 0;
pub const ANNOUNCE_ACTION_ID: u32 = 1;
pub const SCRAPE_ACTION_ID: u32 = 2;
pub const ERROR_ACTION_ID: u32 = 3;
/// Dialect variant used by some IPv6 clients; semantics are identical to
/// announce but the request carries a 16-byte IP field and the response is
/// tagged with this action.
pub const ANNOUNCE_V6_ACTION_ID: u32 = 4;

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ConnectRequest {
    pub transaction_id: i32,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct AnnounceRequest {
    pub connection_id: Cookie,
    pub transaction_id: i32,
    pub info_hash: InfoHash,
    pub peer_id: peer::Id,
    pub bytes_downloaded: i64,
    pub bytes_left: i64,
    pub bytes_uploaded: i64,
    pub event: AnnounceEvent,
    /// The address the client advertises, absent when all-zero.
    pub ip_address: Option<IpAddr>,
    pub key: u32,
    pub peers_wanted: i32,
    pub port: u16,
    /// Whether the request used the announce-v6 dialect (action 4).
    pub v6_dialect: bool,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ScrapeRequest {
    pub connection_id: Cookie,
    pub transaction_id: i32,
    pub info_hashes: Vec<InfoHash>,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Request {
    Connect(ConnectRequest),
    Announce(AnnounceRequest),
    Scrape(ScrapeRequest),
}

/// Why a packet could not be parsed into a [`Request`].
#[derive(Debug)]
pub enum ParseError {
    /// The header itself is unusable; nothing can be addressed back to the
    /// client.
    Unsendable { message: String },
    /// The transaction ID is known, so an error frame can be sent.
    Sendable {
        transaction_id: i32,
        err: ClientError,
    },
}

impl From<ConnectRequest> for Request {
    fn from(r: ConnectRequest) -> Self {
        Self::Connect(r)
    }
}

impl From<AnnounceRequest> for Request {
    fn from(r: AnnounceRequest) -> Self {
        Self::Announce(r)
    }
}

impl From<ScrapeRequest> for Request {
    fn from(r: ScrapeRequest) -> Self {
        Self::Scrape(r)
    }
}

impl Request {
    /// Parses a client packet.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError::Unsendable`] for packets shorter than the
    /// common header and a [`ParseError::Sendable`] for anything malformed
    /// beyond it.
    pub fn from_bytes(bytes: &[u8], max_scrape_infohashes: u32) -> Result<Self, ParseError> {
        if bytes.len() < MIN_PACKET_LEN {
            return Err(ParseError::Unsendable {
                message: "packet too short".to_owned(),
            });
        }

        let connection_id = i64::from_be_bytes(bytes[0..8].try_into().expect("slice is 8 bytes"));
        let action = u32::from_be_bytes(bytes[8..12].try_into().expect("slice is 4 bytes"));
        let transaction_id = i32::from_be_bytes(bytes[12..16].try_into().expect("slice is 4 bytes"));

        let cookie: Cookie = bytes[0..8].try_into().expect("slice is 8 bytes");

        let sendable = |err: ClientError| ParseError::Sendable { transaction_id, err };

        let mut cursor = Cursor::new(bytes);
        cursor.set_position(MIN_PACKET_LEN as u64);

        match action {
            CONNECT_ACTION_ID => {
                if connection_id == PROTOCOL_MAGIC {
                    Ok(ConnectRequest { transaction_id }.into())
                } else {
                    Err(sendable(ClientError::MalformedPacket))
                }
            }

            ANNOUNCE_ACTION_ID | ANNOUNCE_V6_ACTION_ID => {
                let v6_dialect = action == ANNOUNCE_V6_ACTION_ID;
                let malformed = |_| sendable(ClientError::MalformedPacket);

                let mut info_hash = [0u8; INFO_HASH_V1_BYTES_LEN];
                let mut peer_id = [0u8; 20];

                cursor.read_exact(&mut info_hash).map_err(malformed)?;
                cursor.read_exact(&mut peer_id).map_err(malformed)?;

                let bytes_downloaded = cursor.read_i64::<NetworkEndian>().map_err(malformed)?;
                let bytes_left = cursor.read_i64::<NetworkEndian>().map_err(malformed)?;
                let bytes_uploaded = cursor.read_i64::<NetworkEndian>().map_err(malformed)?;
                let event = cursor.read_i32::<NetworkEndian>().map_err(malformed)?;

                let ip_address = if v6_dialect {
                    let mut ip = [0u8; 16];
                    cursor.read_exact(&mut ip).map_err(malformed)?;
                    (ip != [0u8; 16]).then(|| IpAddr::V6(Ipv6Addr::from(ip)))
                } else {
                    let mut ip = [0u8; 4];
                    cursor.read_exact(&mut ip).map_err(malformed)?;
                    (ip != [0u8; 4]).then(|| IpAddr::V4(Ipv4Addr::from(ip)))
                };

                let key = cursor.read_u32::<NetworkEndian>().map_err(malformed)?;
                let peers_wanted = cursor.read_i32::<NetworkEndian>().map_err(malformed)?;
                let port = cursor.read_u16::<NetworkEndian>().map_err(malformed)?;

                Ok(AnnounceRequest {
                    connection_id: cookie,
                    transaction_id,
                    info_hash: InfoHash::V1(info_hash),
                    peer_id: peer::Id(peer_id),
                    bytes_downloaded,
                    bytes_left,
                    bytes_uploaded,
                    event: AnnounceEvent::from_i32(event),
                    ip_address,
                    key,
                    peers_wanted,
                    port,
                    v6_dialect,
                }
                .into())
            }

            SCRAPE_ACTION_ID => {
                let remaining = &bytes[MIN_PACKET_LEN..];
                let available = remaining.len() / INFO_HASH_V1_BYTES_LEN;
                let accepted = available.min(max_scrape_infohashes as usize);

                if accepted == 0 {
                    return Err(sendable(ClientError::BadRequest("scrape with no infohashes".to_owned())));
                }

                let info_hashes = remaining
                    .chunks_exact(INFO_HASH_V1_BYTES_LEN)
                    .take(accepted)
                    .map(|chunk| InfoHash::try_from(chunk).expect("chunk is 20 bytes"))
                    .collect();

                Ok(ScrapeRequest {
                    connection_id: cookie,
                    transaction_id,
                    info_hashes,
                }
                .into())
            }

            _ => Err(sendable(ClientError::UnknownAction)),
        }
    }
}
