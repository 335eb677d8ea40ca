//! Query-string parsing for the HTTP tracker.
//!
//! The `info_hash` and `peer_id` parameters carry raw bytes,
//! percent-encoded, so the query string cannot go through a UTF-8
//! deserializer; it is split and decoded by hand.
use std::net::IpAddr;

use swarm_tracker_primitives::announce_event::AnnounceEvent;
use swarm_tracker_primitives::info_hash::InfoHash;
use swarm_tracker_primitives::peer;

use crate::core::error::ClientError;

/// An `announce` request as extracted from the query string, before the
/// source address is resolved into peer representations.
#[derive(Debug, PartialEq, Eq)]
pub struct Announce {
    pub info_hash: InfoHash,
    pub peer_id: peer::Id,
    pub port: u16,
    pub uploaded: u64,
    pub downloaded: u64,
    pub left: u64,
    pub event: AnnounceEvent,
    pub advertised_ip: Option<IpAddr>,
    pub numwant: Option<u32>,
    pub compact: bool,
}

/// A `scrape` request: the repeated `info_hash` parameters.
#[derive(Debug, PartialEq, Eq)]
pub struct Scrape {
    pub info_hashes: Vec<InfoHash>,
}

/// One `key=value` pair with the value percent-decoded into raw bytes.
fn parse_pairs(query: &str) -> Result<Vec<(String, Vec<u8>)>, ClientError> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            Ok((key.to_owned(), percent_decode(value.as_bytes())?))
        })
        .collect()
}

fn percent_decode(input: &[u8]) -> Result<Vec<u8>, ClientError> {
    let mut out = Vec::with_capacity(input.len());
    let mut bytes = input.iter();

    while let Some(byte) = bytes.next() {
        match byte {
            b'%' => {
                let hi = bytes.next().ok_or(ClientError::MalformedPacket)?;
                let lo = bytes.next().ok_or(ClientError::MalformedPacket)?;
                let hex = [*hi, *lo];
                let hex = std::str::from_utf8(&hex).map_err(|_| ClientError::MalformedPacket)?;
                out.push(u8::from_str_radix(hex, 16).map_err(|_| ClientError::MalformedPacket)?);
            }
            b'+' => out.push(b' '),
            byte => out.push(*byte),
        }
    }

    Ok(out)
}

fn missing(param: &str) -> ClientError {
    ClientError::BadRequest(format!("missing param {param}"))
}

fn invalid(param: &str) -> ClientError {
    ClientError::BadRequest(format!("invalid param value for {param}"))
}

fn utf8_param(value: Vec<u8>, param: &str) -> Result<String, ClientError> {
    String::from_utf8(value).map_err(|_| invalid(param))
}

impl Announce {
    /// Extracts an announce from a raw query string.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] naming the missing or invalid parameter.
    pub fn from_query(query: &str) -> Result<Self, ClientError> {
        let pairs = parse_pairs(query)?;

        let mut info_hash = None;
        let mut peer_id = None;
        let mut port = None;
        let mut uploaded = 0u64;
        let mut downloaded = 0u64;
        let mut left = 0u64;
        let mut event = AnnounceEvent::None;
        let mut advertised_ip = None;
        let mut numwant = None;
        let mut compact = false;

        for (key, value) in pairs {
            match key.as_str() {
                "info_hash" => {
                    info_hash = Some(InfoHash::try_from(value.as_slice()).map_err(|_| invalid("info_hash"))?);
                }
                "peer_id" => {
                    let bytes: [u8; 20] = value.as_slice().try_into().map_err(|_| invalid("peer_id"))?;
                    peer_id = Some(peer::Id(bytes));
                }
                "port" => port = Some(utf8_param(value, "port")?.parse().map_err(|_| invalid("port"))?),
                "uploaded" => uploaded = utf8_param(value, "uploaded")?.parse().map_err(|_| invalid("uploaded"))?,
                "downloaded" => {
                    downloaded = utf8_param(value, "downloaded")?.parse().map_err(|_| invalid("downloaded"))?;
                }
                "left" => left = utf8_param(value, "left")?.parse().map_err(|_| invalid("left"))?,
                "event" => {
                    event = match utf8_param(value, "event")?.as_str() {
                        "started" => AnnounceEvent::Started,
                        "stopped" => AnnounceEvent::Stopped,
                        "completed" => AnnounceEvent::Completed,
                        "" => AnnounceEvent::None,
                        _ => return Err(invalid("event")),
                    };
                }
                "ip" => {
                    advertised_ip = Some(utf8_param(value, "ip")?.parse().map_err(|_| invalid("ip"))?);
                }
                "numwant" => {
                    numwant = Some(utf8_param(value, "numwant")?.parse().map_err(|_| ClientError::InvalidNumwant)?);
                }
                "compact" => compact = value == b"1",
                _ => {}
            }
        }

        Ok(Announce {
            info_hash: info_hash.ok_or_else(|| missing("info_hash"))?,
            peer_id: peer_id.ok_or_else(|| missing("peer_id"))?,
            port: port.ok_or_else(|| missing("port"))?,
            uploaded,
            downloaded,
            left,
            event,
            advertised_ip,
            numwant,
            compact,
        })
    }
}

impl Scrape {
    /// Extracts a scrape from a raw query string, bounded by
    /// `max_infohashes`.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when no valid `info_hash` parameter is
    /// present.
    pub fn from_query(query: &str, max_infohashes: u32) -> Result<Self, ClientError> {
        let pairs = parse_pairs(query)?;

        let info_hashes: Vec<InfoHash> = pairs
            .into_iter()
            .filter(|(key, _)| key == "info_hash")
            .take(max_infohashes as usize)
            .map(|(_, value)| InfoHash::try_from(value.as_slice()).map_err(|_| invalid("info_hash")))
            .collect::<Result<_, _>>()?;

        if info_hashes.is_empty() {
            return Err(missing("info_hash"));
        }

        Ok(Scrape { info_hashes })
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use swarm_tracker_primitives::announce_event::AnnounceEvent;

    use super::{Announce, Scrape};
    use crate::core::error::ClientError;

    // 3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0, percent-encoded.
    const INFO_HASH_PARAM: &str = "info_hash=%3B%24U%04%CF_%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0";

    #[test]
    fn an_announce_should_be_extracted_from_a_query_string() {
        let query = format!(
            "{INFO_HASH_PARAM}&peer_id=-qB00000000000000001&port=17548&uploaded=1&downloaded=2&left=3&event=started&numwant=50&compact=1"
        );

        let announce = Announce::from_query(&query).unwrap();

        assert_eq!(
            announce.info_hash,
            "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0".parse().unwrap()
        );
        assert_eq!(&announce.peer_id.0, b"-qB00000000000000001");
        assert_eq!(announce.port, 17548);
        assert_eq!(announce.uploaded, 1);
        assert_eq!(announce.downloaded, 2);
        assert_eq!(announce.left, 3);
        assert_eq!(announce.event, AnnounceEvent::Started);
        assert_eq!(announce.numwant, Some(50));
        assert!(announce.compact);
    }

    #[test]
    fn optional_announce_params_should_default() {
        let query = format!("{INFO_HASH_PARAM}&peer_id=-qB00000000000000001&port=17548");

        let announce = Announce::from_query(&query).unwrap();

        assert_eq!(announce.left, 0);
        assert_eq!(announce.event, AnnounceEvent::None);
        assert_eq!(announce.numwant, None);
        assert_eq!(announce.advertised_ip, None);
        assert!(!announce.compact);
    }

    #[test]
    fn an_announce_without_an_info_hash_should_be_rejected() {
        let result = Announce::from_query("peer_id=-qB00000000000000001&port=17548");

        assert!(matches!(result, Err(ClientError::BadRequest(message)) if message.contains("info_hash")));
    }

    #[test]
    fn an_announce_with_a_malformed_numwant_should_be_rejected() {
        let query = format!("{INFO_HASH_PARAM}&peer_id=-qB00000000000000001&port=17548&numwant=lots");

        let result = Announce::from_query(&query);

        assert!(matches!(result, Err(ClientError::InvalidNumwant)));
    }

    #[test]
    fn the_advertised_ip_should_be_parsed_when_present() {
        let query = format!("{INFO_HASH_PARAM}&peer_id=-qB00000000000000001&port=17548&ip=203.0.113.42");

        let announce = Announce::from_query(&query).unwrap();

        assert_eq!(announce.advertised_ip, Some(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 42))));
    }

    #[test]
    fn a_v2_info_hash_should_be_accepted_over_http() {
        // 32 bytes, percent-encoded as %XX for every byte.
        let encoded: String = (0..32u8).map(|byte| format!("%{byte:02x}")).collect();
        let query = format!("info_hash={encoded}&peer_id=-qB00000000000000001&port=17548");

        let announce = Announce::from_query(&query).unwrap();

        assert!(announce.info_hash.is_v2());
    }

    #[test]
    fn a_scrape_should_accept_repeated_info_hashes_up_to_the_maximum() {
        let query = format!("{INFO_HASH_PARAM}&{INFO_HASH_PARAM}&{INFO_HASH_PARAM}");

        let scrape = Scrape::from_query(&query, 2).unwrap();

        assert_eq!(scrape.info_hashes.len(), 2);
    }

    #[test]
    fn a_scrape_without_info_hashes_should_be_rejected() {
        assert!(Scrape::from_query("", 50).is_err());
    }
}
