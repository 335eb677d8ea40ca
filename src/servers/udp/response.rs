//! BEP 15 response frames.
//!
//! The announce response exists in two wire shapes: 6-byte peer tuples for
//! IPv4 and 18-byte tuples for IPv6. The v6-dialect announce (action 4)
//! additionally tags the response header with action 4 instead of 1.
//! Error frames carry a NUL-terminated human-readable message; internal
//! failures are prefixed before they get here.
use std::io::{self, Cursor, Write};
use std::net::{Ipv4Addr, Ipv6Addr};

use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};

use crate::servers::udp::connection_cookie::Cookie;
use crate::servers::udp::request::{
    ANNOUNCE_ACTION_ID, ANNOUNCE_V6_ACTION_ID, CONNECT_ACTION_ID, ERROR_ACTION_ID, SCRAPE_ACTION_ID,
};

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ConnectResponse {
    pub transaction_id: i32,
    pub connection_id: Cookie,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ResponsePeer<I> {
    pub ip_address: I,
    pub port: u16,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct AnnounceResponse<I> {
    pub transaction_id: i32,
    pub interval: i32,
    pub leechers: i32,
    pub seeders: i32,
    pub peers: Vec<ResponsePeer<I>>,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct TorrentScrapeStatistics {
    pub seeders: i32,
    pub completed: i32,
    pub leechers: i32,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ScrapeResponse {
    pub transaction_id: i32,
    pub torrent_stats: Vec<TorrentScrapeStatistics>,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ErrorResponse {
    pub transaction_id: i32,
    pub message: String,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Response {
    Connect(ConnectResponse),
    AnnounceIpv4(AnnounceResponse<Ipv4Addr>),
    /// Announce answered through the v6 dialect: action tag 4, 18-byte
    /// peer tuples.
    AnnounceIpv6(AnnounceResponse<Ipv6Addr>),
    Scrape(ScrapeResponse),
    Error(ErrorResponse),
}

impl From<ConnectResponse> for Response {
    fn from(r: ConnectResponse) -> Self {
        Self::Connect(r)
    }
}

impl From<AnnounceResponse<Ipv4Addr>> for Response {
    fn from(r: AnnounceResponse<Ipv4Addr>) -> Self {
        Self::AnnounceIpv4(r)
    }
}

impl From<AnnounceResponse<Ipv6Addr>> for Response {
    fn from(r: AnnounceResponse<Ipv6Addr>) -> Self {
        Self::AnnounceIpv6(r)
    }
}

impl From<ScrapeResponse> for Response {
    fn from(r: ScrapeResponse) -> Self {
        Self::Scrape(r)
    }
}

impl From<ErrorResponse> for Response {
    fn from(r: ErrorResponse) -> Self {
        Self::Error(r)
    }
}

impl Response {
    /// Serializes the response.
    ///
    /// # Errors
    ///
    /// Will return an error if the writer fails.
    pub fn write(&self, bytes: &mut impl Write) -> Result<(), io::Error> {
        match self {
            Response::Connect(r) => {
                bytes.write_u32::<NetworkEndian>(CONNECT_ACTION_ID)?;
                bytes.write_i32::<NetworkEndian>(r.transaction_id)?;
                bytes.write_all(&r.connection_id)?;
            }

            Response::AnnounceIpv4(r) => {
                bytes.write_u32::<NetworkEndian>(ANNOUNCE_ACTION_ID)?;
                bytes.write_i32::<NetworkEndian>(r.transaction_id)?;
                bytes.write_i32::<NetworkEndian>(r.interval)?;
                bytes.write_i32::<NetworkEndian>(r.leechers)?;
                bytes.write_i32::<NetworkEndian>(r.seeders)?;

                for peer in &r.peers {
                    bytes.write_all(&peer.ip_address.octets())?;
                    bytes.write_u16::<NetworkEndian>(peer.port)?;
                }
            }

            Response::AnnounceIpv6(r) => {
                bytes.write_u32::<NetworkEndian>(ANNOUNCE_V6_ACTION_ID)?;
                bytes.write_i32::<NetworkEndian>(r.transaction_id)?;
                bytes.write_i32::<NetworkEndian>(r.interval)?;
                bytes.write_i32::<NetworkEndian>(r.leechers)?;
                bytes.write_i32::<NetworkEndian>(r.seeders)?;

                for peer in &r.peers {
                    bytes.write_all(&peer.ip_address.octets())?;
                    bytes.write_u16::<NetworkEndian>(peer.port)?;
                }
            }

            Response::Scrape(r) => {
                bytes.write_u32::<NetworkEndian>(SCRAPE_ACTION_ID)?;
                bytes.write_i32::<NetworkEndian>(r.transaction_id)?;

                for stats in &r.torrent_stats {
                    bytes.write_i32::<NetworkEndian>(stats.seeders)?;
                    bytes.write_i32::<NetworkEndian>(stats.completed)?;
                    bytes.write_i32::<NetworkEndian>(stats.leechers)?;
                }
            }

            Response::Error(r) => {
                bytes.write_u32::<NetworkEndian>(ERROR_ACTION_ID)?;
                bytes.write_i32::<NetworkEndian>(r.transaction_id)?;
                bytes.write_all(r.message.as_bytes())?;
                bytes.write_u8(0)?;
            }
        }

        Ok(())
    }

    /// Parses a response frame, used by the test client and the check
    /// tooling.
    ///
    /// # Errors
    ///
    /// Will return an error if the frame is truncated.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, io::Error> {
        let mut cursor = Cursor::new(bytes);

        let action = cursor.read_u32::<NetworkEndian>()?;
        let transaction_id = cursor.read_i32::<NetworkEndian>()?;

        match action {
            CONNECT_ACTION_ID => {
                let mut connection_id = [0u8; 8];
                std::io::Read::read_exact(&mut cursor, &mut connection_id)?;

                Ok(ConnectResponse {
                    transaction_id,
                    connection_id,
                }
                .into())
            }

            ANNOUNCE_ACTION_ID => {
                let (interval, leechers, seeders) = Self::read_announce_header(&mut cursor)?;
                let position = cursor.position() as usize;

                let peers = bytes[position..]
                    .chunks_exact(6)
                    .map(|chunk| {
                        let ip: [u8; 4] = chunk[..4].try_into().expect("chunk prefix is 4 bytes");
                        ResponsePeer {
                            ip_address: Ipv4Addr::from(ip),
                            port: u16::from_be_bytes([chunk[4], chunk[5]]),
                        }
                    })
                    .collect();

                Ok(AnnounceResponse {
                    transaction_id,
                    interval,
                    leechers,
                    seeders,
                    peers,
                }
                .into())
            }

            ANNOUNCE_V6_ACTION_ID => {
                let (interval, leechers, seeders) = Self::read_announce_header(&mut cursor)?;
                let position = cursor.position() as usize;

                let peers = bytes[position..]
                    .chunks_exact(18)
                    .map(|chunk| {
                        let ip: [u8; 16] = chunk[..16].try_into().expect("chunk prefix is 16 bytes");
                        ResponsePeer {
                            ip_address: Ipv6Addr::from(ip),
                            port: u16::from_be_bytes([chunk[16], chunk[17]]),
                        }
                    })
                    .collect();

                Ok(AnnounceResponse {
                    transaction_id,
                    interval,
                    leechers,
                    seeders,
                    peers,
                }
                .into())
            }

            SCRAPE_ACTION_ID => {
                let position = cursor.position() as usize;

                let torrent_stats = bytes[position..]
                    .chunks_exact(12)
                    .map(|chunk| {
                        let mut chunk = Cursor::new(chunk);
                        TorrentScrapeStatistics {
                            seeders: chunk.read_i32::<NetworkEndian>().expect("chunk is 12 bytes"),
                            completed: chunk.read_i32::<NetworkEndian>().expect("chunk is 12 bytes"),
                            leechers: chunk.read_i32::<NetworkEndian>().expect("chunk is 12 bytes"),
                        }
                    })
                    .collect();

                Ok(ScrapeResponse {
                    transaction_id,
                    torrent_stats,
                }
                .into())
            }

            _ => {
                let position = cursor.position() as usize;
                let message = bytes[position..]
                    .split(|byte| *byte == 0)
                    .next()
                    .map(|message| String::from_utf8_lossy(message).into_owned())
                    .unwrap_or_default();

                Ok(ErrorResponse {
                    transaction_id,
                    message,
                }
                .into())
            }
        }
    }

    fn read_announce_header(cursor: &mut Cursor<&[u8]>) -> Result<(i32, i32, i32), io::Error> {
        let interval = cursor.read_i32::<NetworkEndian>()?;
        let leechers = cursor.read_i32::<NetworkEndian>()?;
        let seeders = cursor.read_i32::<NetworkEndian>()?;
        Ok((interval, leechers, seeders))
    }
}
