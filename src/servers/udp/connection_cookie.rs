//! Logic for generating and verifying connection IDs.
//!
//! The UDP tracker requires the client to connect before it can announce
//! or scrape. The server answers the connect with an 8-byte connection ID
//! that the client must echo in every subsequent request.
//!
//! The connection ID exists to defeat source-address spoofing: a spoofer
//! never sees the connect response, so it cannot present a valid ID on the
//! announce that follows. Storing issued IDs in a table would let an
//! attacker grow server memory with connects, so the token itself is the
//! state:
//!
//! ```text
//! connection ID = timestamp_be32 || mac(key, timestamp_be32 || ip)[..4]
//! ```
//!
//! The MAC is a keyed blake3 hash over the issue timestamp and the client
//! IP (4 or 16 bytes, v4-mapped addresses normalized first), truncated to
//! four bytes. Validation recomputes the MAC from the presented timestamp
//! and the observed source address and additionally bounds the timestamp
//! age by the configured clock-skew window, in both directions.
use std::net::IpAddr;

use swarm_tracker_primitives::DurationSinceUnixEpoch;

/// An 8-byte stateless connection token.
pub type Cookie = [u8; 8];

/// Issues and validates connection IDs.
///
/// MAC computation is a pure function of the key, so a single issuer is
/// shared between all workers behind an `Arc`.
pub struct ConnectionIdIssuer {
    key: [u8; blake3::KEY_LEN],
    max_clock_skew: DurationSinceUnixEpoch,
}

impl ConnectionIdIssuer {
    /// Builds an issuer keyed by `private_key`, or by a random key when no
    /// secret is configured. A configured secret of any length is
    /// stretched into a MAC key; instances sharing the secret accept each
    /// other's cookies.
    #[must_use]
    pub fn new(private_key: Option<&str>, max_clock_skew: DurationSinceUnixEpoch) -> Self {
        let key = match private_key {
            Some(secret) => *blake3::hash(secret.as_bytes()).as_bytes(),
            None => rand::random(),
        };

        Self { key, max_clock_skew }
    }

    /// Generates the connection ID for a client at a point in time.
    #[must_use]
    pub fn generate(&self, ip: IpAddr, now: DurationSinceUnixEpoch) -> Cookie {
        #[allow(clippy::cast_possible_truncation)]
        let timestamp = (now.as_secs() as u32).to_be_bytes();

        let mut cookie = [0u8; 8];
        cookie[..4].copy_from_slice(&timestamp);
        cookie[4..].copy_from_slice(&self.mac(timestamp, ip));
        cookie
    }

    /// Checks a presented connection ID against the observed source
    /// address and the current time.
    #[must_use]
    pub fn validate(&self, cookie: &Cookie, ip: IpAddr, now: DurationSinceUnixEpoch) -> bool {
        let timestamp: [u8; 4] = cookie[..4].try_into().expect("cookie timestamp is 4 bytes");

        if self.mac(timestamp, ip) != cookie[4..] {
            return false;
        }

        let issued_at = u64::from(u32::from_be_bytes(timestamp));
        now.as_secs().abs_diff(issued_at) <= self.max_clock_skew.as_secs()
    }

    fn mac(&self, timestamp: [u8; 4], ip: IpAddr) -> [u8; 4] {
        // No v4-mapped-v6 forms: the same client must produce the same MAC
        // input whether the socket reports it as v4 or mapped.
        let ip = ip.to_canonical();

        let mut input = [0u8; 4 + 16];
        input[..4].copy_from_slice(&timestamp);
        let len = match ip {
            IpAddr::V4(v4) => {
                input[4..8].copy_from_slice(&v4.octets());
                8
            }
            IpAddr::V6(v6) => {
                input[4..20].copy_from_slice(&v6.octets());
                20
            }
        };

        let mac = blake3::keyed_hash(&self.key, &input[..len]);
        mac.as_bytes()[..4].try_into().expect("blake3 output is longer than 4 bytes")
    }
}
