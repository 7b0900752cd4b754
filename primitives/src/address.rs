use hex::{FromHex, FromHexError};
use serde::{Deserialize, Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error;

use crate::{ToETHChecksum, ToHex};

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("Expected prefix `0x`")]
    BadPrefix,
    #[error("Expected length of 40 without or 42 with a `0x` prefix")]
    Length,
    #[error("Invalid hex")]
    Hex(#[from] FromHexError),
}

/// An Ethereum account or contract address.
///
/// Serializes to the [EIP-55](https://eips.ethereum.org/EIPS/eip-55) checksummed string
/// and deserializes from any casing, with or without a `0x` prefix.
#[derive(Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(transparent)]
pub struct Address(#[serde(deserialize_with = "de::from_bytes_insensitive")] [u8; 20]);

impl Address {
    pub fn to_bytes(&self) -> [u8; 20] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn from_bytes(bytes: &[u8; 20]) -> Self {
        Self(*bytes)
    }

    /// Returns `None` when the slice is not exactly 20 bytes long.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; 20]>::try_from(slice).ok().map(Self)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex_prefixed())
    }
}

impl ToETHChecksum for Address {}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        from_bytes(s, Prefix::Insensitive).map(Self)
    }
}

impl TryFrom<&str> for Address {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

mod de {
    use super::{from_bytes, Prefix};
    use serde::{Deserialize, Deserializer};

    /// Deserializes the bytes with our without a `0x` prefix (insensitive)
    pub(super) fn from_bytes_insensitive<'de, D>(deserializer: D) -> Result<[u8; 20], D::Error>
    where
        D: Deserializer<'de>,
    {
        let address = String::deserialize(deserializer)?;

        from_bytes(address, Prefix::Insensitive).map_err(serde::de::Error::custom)
    }
}

pub enum Prefix {
    /// with `0x` prefix
    With,
    /// without `0x` prefix
    Without,
    /// Insensitive to a `0x` prefixed, it allows values with or without a prefix
    Insensitive,
}

/// Decodes a hex encoded address, the hex itself is case-insensitive.
pub fn from_bytes<T: AsRef<[u8]>>(from: T, prefix: Prefix) -> Result<[u8; 20], Error> {
    let bytes = from.as_ref();

    let from_hex =
        |hex_bytes: &[u8]| <[u8; 20] as FromHex>::from_hex(hex_bytes).map_err(Error::Hex);

    // this length check guards against `panic!` when we call `slice.split_at()`
    match (prefix, bytes.len()) {
        (Prefix::With, 42) | (Prefix::Insensitive, 42) => match bytes.split_at(2) {
            (b"0x", hex_bytes) => from_hex(hex_bytes),
            _ => Err(Error::BadPrefix),
        },
        (Prefix::Without, 40) | (Prefix::Insensitive, 40) => from_hex(bytes),
        _ => Err(Error::Length),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::{from_value, to_value, Value};

    #[test]
    fn parses_any_casing_and_serializes_checksummed() {
        let checksummed = "0xce07CbB7e054514D590a0262C93070D838bFBA2e";

        let from_lowercase: Address = checksummed.to_lowercase().parse().expect("Valid address");
        let from_unprefixed: Address = checksummed[2..].parse().expect("Valid address");

        assert_eq!(from_lowercase, from_unprefixed);
        assert_eq!(checksummed, from_lowercase.to_string());
        assert_eq!(
            Value::String(checksummed.into()),
            to_value(from_lowercase).expect("Should serialize")
        );

        let deserialized: Address =
            from_value(Value::String(checksummed.to_uppercase().replace("0X", "0x")))
                .expect("Should deserialize upper case hex");
        assert_eq!(from_lowercase, deserialized);
    }

    #[test]
    fn rejects_bad_prefix_and_length() {
        assert_eq!(
            Err(Error::BadPrefix),
            "1xce07CbB7e054514D590a0262C93070D838bFBA2e".parse::<Address>()
        );
        assert_eq!(Err(Error::Length), "0xce07CbB7".parse::<Address>());
        assert!(matches!(
            "0xzz07CbB7e054514D590a0262C93070D838bFBA2e".parse::<Address>(),
            Err(Error::Hex(_))
        ));
    }
}
