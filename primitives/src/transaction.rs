use std::{fmt, str::FromStr};

use hex::{FromHex, FromHexError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ToHex;

/// The 32 bytes hash of a submitted transaction.
///
/// Displayed and (de)serialized as a `0x` prefixed hex string.
#[derive(PartialEq, Eq, Copy, Clone, Hash)]
pub struct TransactionHash([u8; 32]);

impl TransactionHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for TransactionHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for TransactionHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for TransactionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex_prefixed())
    }
}

impl fmt::Debug for TransactionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionHash({})", self)
    }
}

impl FromStr for TransactionHash {
    type Err = FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix("0x").unwrap_or(s);

        <[u8; 32]>::from_hex(hex).map(Self)
    }
}

impl Serialize for TransactionHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TransactionHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let string = String::deserialize(deserializer)?;

        string.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn displays_as_prefixed_32_bytes_hex() {
        let hash = TransactionHash::from([0xab; 32]);
        let string = hash.to_string();

        assert_eq!(66, string.len());
        assert!(string.starts_with("0xabab"));
        assert_eq!(hash, string.parse().expect("Should parse"));
        assert!("0xabab".parse::<TransactionHash>().is_err());
    }
}
