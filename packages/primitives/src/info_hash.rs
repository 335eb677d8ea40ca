use std::panic::Location;

use thiserror::Error;

/// Number of bytes in a version 1 infohash (SHA-1).
pub const INFO_HASH_V1_BYTES_LEN: usize = 20;

/// Number of bytes in a version 2 infohash (SHA-256).
pub const INFO_HASH_V2_BYTES_LEN: usize = 32;

/// `BitTorrent` infohash: the 20-byte (v1) or 32-byte (v2) identifier of a
/// torrent. Equality is byte equality.
///
/// A v2 infohash carries a canonical v1 truncation (its first 20 bytes).
/// Hybrid torrents are announced under both forms, so every store operation
/// that targets a v2 hash is mirrored onto [`InfoHash::truncate_v1`].
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, PartialOrd, Ord)]
pub enum InfoHash {
    V1([u8; INFO_HASH_V1_BYTES_LEN]),
    V2([u8; INFO_HASH_V2_BYTES_LEN]),
}

impl InfoHash {
    /// Returns the raw bytes: 20 for v1, 32 for v2.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        match self {
            InfoHash::V1(bytes) => bytes,
            InfoHash::V2(bytes) => bytes,
        }
    }

    #[must_use]
    pub fn is_v2(&self) -> bool {
        matches!(self, InfoHash::V2(_))
    }

    /// The canonical v1 form of a v2 infohash: its first 20 bytes.
    ///
    /// For a v1 infohash this is the identity.
    #[must_use]
    pub fn truncate_v1(&self) -> InfoHash {
        match self {
            InfoHash::V1(_) => *self,
            InfoHash::V2(bytes) => {
                let mut v1 = [0u8; INFO_HASH_V1_BYTES_LEN];
                v1.copy_from_slice(&bytes[..INFO_HASH_V1_BYTES_LEN]);
                InfoHash::V1(v1)
            }
        }
    }

    /// Returns the infohash as a lowercase hex string (40 or 64 chars).
    #[must_use]
    pub fn to_hex_string(&self) -> String {
        self.to_string()
    }
}

impl Default for InfoHash {
    fn default() -> Self {
        InfoHash::V1([0u8; INFO_HASH_V1_BYTES_LEN])
    }
}

impl From<[u8; INFO_HASH_V1_BYTES_LEN]> for InfoHash {
    fn from(bytes: [u8; INFO_HASH_V1_BYTES_LEN]) -> Self {
        InfoHash::V1(bytes)
    }
}

impl From<[u8; INFO_HASH_V2_BYTES_LEN]> for InfoHash {
    fn from(bytes: [u8; INFO_HASH_V2_BYTES_LEN]) -> Self {
        InfoHash::V2(bytes)
    }
}

impl std::fmt::Display for InfoHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut chars = [0u8; INFO_HASH_V2_BYTES_LEN * 2];
        let hex = binascii::bin2hex(self.bytes(), &mut chars).expect("failed to hexlify");
        write!(f, "{}", std::str::from_utf8(hex).unwrap())
    }
}

impl std::str::FromStr for InfoHash {
    type Err = binascii::ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.len() {
            40 => {
                let mut bytes = [0u8; INFO_HASH_V1_BYTES_LEN];
                binascii::hex2bin(s.as_bytes(), &mut bytes)?;
                Ok(InfoHash::V1(bytes))
            }
            64 => {
                let mut bytes = [0u8; INFO_HASH_V2_BYTES_LEN];
                binascii::hex2bin(s.as_bytes(), &mut bytes)?;
                Ok(InfoHash::V2(bytes))
            }
            _ => Err(binascii::ConvertError::InvalidInputLength),
        }
    }
}

/// Errors that can occur when converting from a byte slice to an `InfoHash`.
///
/// An infohash is exactly 20 (v1) or 32 (v2) bytes.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("invalid number of bytes for infohash: {message} {location}")]
    InvalidByteCount {
        location: &'static Location<'static>,
        message: String,
    },
}

impl TryFrom<&[u8]> for InfoHash {
    type Error = ConversionError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        match bytes.len() {
            INFO_HASH_V1_BYTES_LEN => {
                let mut data = [0u8; INFO_HASH_V1_BYTES_LEN];
                data.copy_from_slice(bytes);
                Ok(InfoHash::V1(data))
            }
            INFO_HASH_V2_BYTES_LEN => {
                let mut data = [0u8; INFO_HASH_V2_BYTES_LEN];
                data.copy_from_slice(bytes);
                Ok(InfoHash::V2(data))
            }
            len => Err(ConversionError::InvalidByteCount {
                location: Location::caller(),
                message: format! {"got {len} bytes, expected {INFO_HASH_V1_BYTES_LEN} or {INFO_HASH_V2_BYTES_LEN}"},
            }),
        }
    }
}

impl serde::ser::Serialize for InfoHash {
    fn serialize<S: serde::ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex_string())
    }
}

impl<'de> serde::de::Deserialize<'de> for InfoHash {
    fn deserialize<D: serde::de::Deserializer<'de>>(des: D) -> Result<Self, D::Error> {
        des.deserialize_str(InfoHashVisitor)
    }
}

struct InfoHashVisitor;

impl serde::de::Visitor<'_> for InfoHashVisitor {
    type Value = InfoHash;

    fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "a 40 or 64 character long hash")
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(|_| {
            serde::de::Error::invalid_value(serde::de::Unexpected::Str(v), &"a 40 or 64 character long hexadecimal string")
        })
    }
}
