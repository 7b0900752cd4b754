use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use ethabi::{encode, Token};
use ethereum_types::U256;
use hex::{FromHex, FromHexError};
use parse_display::Display;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tiny_keccak::{Hasher, Keccak};

use crate::{Address, BigNum, ChainId, ToHex};

/// The on-chain identifier of a channel.
///
/// It's derived deterministically by the custody contract,
/// see [`Channel::id`].
#[derive(PartialEq, Eq, Copy, Clone, Hash, PartialOrd, Ord)]
pub struct ChannelId([u8; 32]);

impl ChannelId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelId({})", self)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex_prefixed())
    }
}

impl From<[u8; 32]> for ChannelId {
    fn from(array: [u8; 32]) -> Self {
        Self(array)
    }
}

impl AsRef<[u8]> for ChannelId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromHex for ChannelId {
    type Error = FromHexError;

    fn from_hex<T: AsRef<[u8]>>(hex: T) -> Result<Self, Self::Error> {
        <[u8; 32]>::from_hex(hex).map(Self)
    }
}

impl FromStr for ChannelId {
    type Err = FromHexError;

    /// Parses a `0x` prefixed or a non-prefixed hex string
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix("0x").unwrap_or(s);

        Self::from_hex(hex)
    }
}

impl Serialize for ChannelId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ChannelId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let channel_id = String::deserialize(deserializer)?;
        if channel_id.len() != 66 {
            return Err(serde::de::Error::custom(
                "invalid channel id, expected a `0x` prefixed 32 bytes hex",
            ));
        }

        channel_id.parse().map_err(serde::de::Error::custom)
    }
}

/// The parameters of a channel as they are registered in the custody contract.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    /// The depositor and owner of the funds in the channel
    pub owner: Address,
    /// The clearnode which co-signs every state of the channel
    pub clearnode: Address,
    /// The token backing the channel asset
    pub token: Address,
    pub chain_id: ChainId,
    pub nonce: Nonce,
}

impl Channel {
    /// `keccak256(abi.encode(owner, clearnode, token, chainId, nonce))`
    pub fn id(&self) -> ChannelId {
        let tokens = [
            Token::Address(self.owner.as_bytes().into()),
            Token::Address(self.clearnode.as_bytes().into()),
            Token::Address(self.token.as_bytes().into()),
            Token::Uint(U256::from(self.chain_id.to_u64())),
            Token::FixedBytes(self.nonce.to_bytes().to_vec()),
        ];

        let mut channel_id = [0_u8; 32];
        let mut hasher = Keccak::v256();
        hasher.update(&encode(&tokens));
        hasher.finalize(&mut channel_id);

        ChannelId::from(channel_id)
    }

    /// The channel as an ABI tuple, the way the custody contract expects it.
    pub fn tokenize(&self) -> Token {
        Token::Tuple(vec![
            Token::Address(self.owner.as_bytes().into()),
            Token::Address(self.clearnode.as_bytes().into()),
            Token::Address(self.token.as_bytes().into()),
            Token::Uint(U256::from(self.chain_id.to_u64())),
            Token::FixedBytes(self.nonce.to_bytes().to_vec()),
        ])
    }
}

/// The nonce is an Unsigned 256 number
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce(pub U256);

impl Nonce {
    /// In Big-Endian
    pub fn to_bytes(&self) -> [u8; 32] {
        // the impl of From<U256> uses BigEndian
        self.0.into()
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_string())
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nonce({})", self.0)
    }
}

impl From<u64> for Nonce {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

// The U256 implementation deserializes the value from a hex String value with a prefix `0x...`
// This is why we we need to impl it our selves
impl<'de> Deserialize<'de> for Nonce {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let string = String::deserialize(deserializer)?;

        U256::from_dec_str(&string)
            .map_err(serde::de::Error::custom)
            .map(Nonce)
    }
}

impl Serialize for Nonce {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.to_string().serialize(serializer)
    }
}

/// The lifecycle of a channel as seen by the clearnode
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "lowercase")]
#[display(style = "lowercase")]
pub enum ChannelStatus {
    /// No channel exists for the owner & asset
    Absent,
    /// The creation was observed on-chain but is not yet final for the clearnode
    Pending,
    Open,
}

/// The canonical channel of an (owner, asset) pair as recorded by the clearnode.
///
/// There is at most one `HomeChannel` per pair and it is only ever
/// updated by the clearnode's indexer in response to on-chain events.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HomeChannel {
    pub channel_id: ChannelId,
    pub owner: Address,
    /// The asset symbol as configured in the clearnode
    pub asset: String,
    pub chain_id: ChainId,
    pub status: ChannelStatus,
    /// The version of the latest co-signed state of the channel
    pub version: u64,
    /// Total amount locked in the channel, in token base units
    pub amount: BigNum,
    pub updated_at: DateTime<Utc>,
}

impl HomeChannel {
    pub fn is_open(&self) -> bool {
        self.status == ChannelStatus::Open
    }
}
