//! Calls to the custody contract and the clearnode authorizations carrying them.
//!
//! ```solidity
//! function create(Channel calldata channel, uint256 amount, bytes calldata signature);
//! function checkpoint(bytes32 channelId, uint64 version, uint256 amount, bytes calldata signature);
//! ```
use ethabi::{decode, encode, short_signature, ParamType, Token};
use ethereum_types::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tiny_keccak::{Hasher, Keccak};

use crate::{Address, BigNum, ChainId, Channel, ChannelId, DepositMode, Nonce};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Amount {0} does not fit into uint256")]
    AmountOverflow(BigNum),
    #[error("Unknown custody function selector 0x{0}")]
    UnknownSelector(String),
    #[error("Custody call data is shorter than a function selector")]
    TooShort,
    #[error("Decoding custody call: {0}")]
    Abi(#[from] ethabi::Error),
    #[error("Unexpected custody call parameters: {0}")]
    Params(&'static str),
}

/// A state-changing call to the custody contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustodyCall {
    /// Registers the channel and locks the initial `amount` of the channel token
    Create {
        channel: Channel,
        amount: BigNum,
        /// The clearnode signature of the initial state
        signature: Vec<u8>,
    },
    /// Tops up an existing channel with `amount` and moves it to the co-signed `version`
    Checkpoint {
        channel_id: ChannelId,
        version: u64,
        amount: BigNum,
        signature: Vec<u8>,
    },
}

fn channel_param() -> ParamType {
    ParamType::Tuple(vec![
        ParamType::Address,
        ParamType::Address,
        ParamType::Address,
        ParamType::Uint(256),
        ParamType::FixedBytes(32),
    ])
}

fn create_params() -> Vec<ParamType> {
    vec![channel_param(), ParamType::Uint(256), ParamType::Bytes]
}

fn checkpoint_params() -> Vec<ParamType> {
    vec![
        ParamType::FixedBytes(32),
        ParamType::Uint(64),
        ParamType::Uint(256),
        ParamType::Bytes,
    ]
}

impl CustodyCall {
    pub fn mode(&self) -> DepositMode {
        match self {
            CustodyCall::Create { .. } => DepositMode::Create,
            CustodyCall::Checkpoint { .. } => DepositMode::Checkpoint,
        }
    }

    pub fn channel_id(&self) -> ChannelId {
        match self {
            CustodyCall::Create { channel, .. } => channel.id(),
            CustodyCall::Checkpoint { channel_id, .. } => *channel_id,
        }
    }

    pub fn amount(&self) -> &BigNum {
        match self {
            CustodyCall::Create { amount, .. } | CustodyCall::Checkpoint { amount, .. } => amount,
        }
    }

    /// The ABI encoded transaction data, selector included.
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let (selector, tokens) = match self {
            CustodyCall::Create {
                channel,
                amount,
                signature,
            } => (
                short_signature("create", &create_params()),
                vec![
                    channel.tokenize(),
                    Token::Uint(to_u256(amount)?),
                    Token::Bytes(signature.clone()),
                ],
            ),
            CustodyCall::Checkpoint {
                channel_id,
                version,
                amount,
                signature,
            } => (
                short_signature("checkpoint", &checkpoint_params()),
                vec![
                    Token::FixedBytes(channel_id.as_bytes().to_vec()),
                    Token::Uint(U256::from(*version)),
                    Token::Uint(to_u256(amount)?),
                    Token::Bytes(signature.clone()),
                ],
            ),
        };

        let mut data = selector.to_vec();
        data.extend(encode(&tokens));

        Ok(data)
    }

    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        if data.len() < 4 {
            return Err(Error::TooShort);
        }
        let (selector, params) = data.split_at(4);

        if selector == short_signature("create", &create_params()) {
            let mut tokens = decode(&create_params(), params)?.into_iter();

            let channel = tokens
                .next()
                .and_then(|token| token.into_tuple())
                .ok_or(Error::Params("channel tuple"))
                .and_then(detokenize_channel)?;
            let amount = next_uint(&mut tokens)?;
            let signature = next_bytes(&mut tokens)?;

            Ok(CustodyCall::Create {
                channel,
                amount: BigNum::from_u256(amount),
                signature,
            })
        } else if selector == short_signature("checkpoint", &checkpoint_params()) {
            let mut tokens = decode(&checkpoint_params(), params)?.into_iter();

            let channel_id = tokens
                .next()
                .and_then(|token| token.into_fixed_bytes())
                .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
                .map(ChannelId::from)
                .ok_or(Error::Params("channel id"))?;
            // uint64 in the ABI, the decoder accepts any 32 bytes word
            let version = next_uint(&mut tokens)?;
            if version > U256::from(u64::MAX) {
                return Err(Error::Params("checkpoint version"));
            }
            let amount = next_uint(&mut tokens)?;
            let signature = next_bytes(&mut tokens)?;

            Ok(CustodyCall::Checkpoint {
                channel_id,
                version: version.low_u64(),
                amount: BigNum::from_u256(amount),
                signature,
            })
        } else {
            Err(Error::UnknownSelector(hex::encode(selector)))
        }
    }
}

fn to_u256(amount: &BigNum) -> Result<U256, Error> {
    amount
        .to_u256()
        .ok_or_else(|| Error::AmountOverflow(amount.clone()))
}

fn next_uint(tokens: &mut impl Iterator<Item = Token>) -> Result<U256, Error> {
    tokens
        .next()
        .and_then(|token| token.into_uint())
        .ok_or(Error::Params("uint"))
}

fn next_bytes(tokens: &mut impl Iterator<Item = Token>) -> Result<Vec<u8>, Error> {
    tokens
        .next()
        .and_then(|token| token.into_bytes())
        .ok_or(Error::Params("bytes"))
}

fn detokenize_channel(tokens: Vec<Token>) -> Result<Channel, Error> {
    let mut tokens = tokens.into_iter();
    let mut next_address = || {
        tokens
            .next()
            .and_then(|token| token.into_address())
            .map(|address| Address::from(address.to_fixed_bytes()))
            .ok_or(Error::Params("channel address"))
    };

    let owner = next_address()?;
    let clearnode = next_address()?;
    let token = next_address()?;

    let chain_id = tokens
        .next()
        .and_then(|token| token.into_uint())
        .filter(|chain_id| !chain_id.is_zero() && *chain_id <= U256::from(u64::MAX))
        .map(|chain_id| ChainId::new(chain_id.low_u64()))
        .ok_or(Error::Params("channel chain id"))?;

    let nonce = tokens
        .next()
        .and_then(|token| token.into_fixed_bytes())
        .filter(|bytes| bytes.len() == 32)
        .map(|bytes| Nonce(U256::from_big_endian(&bytes)))
        .ok_or(Error::Params("channel nonce"))?;

    Ok(Channel {
        owner,
        clearnode,
        token,
        chain_id,
        nonce,
    })
}

/// The hash of a channel state the clearnode co-signs:
/// `keccak256(abi.encode(channelId, version, amount))`
pub fn state_hash(channel_id: ChannelId, version: u64, amount: &BigNum) -> Result<[u8; 32], Error> {
    let encoded = encode(&[
        Token::FixedBytes(channel_id.as_bytes().to_vec()),
        Token::Uint(U256::from(version)),
        Token::Uint(to_u256(amount)?),
    ]);

    let mut hash = [0_u8; 32];
    let mut hasher = Keccak::v256();
    hasher.update(&encoded);
    hasher.finalize(&mut hash);

    Ok(hash)
}

/// A co-signed transaction payload returned by the clearnode,
/// ready to be submitted to the custody contract.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAuthorization {
    pub channel_id: ChannelId,
    pub mode: DepositMode,
    /// The custody contract the transaction must be sent to
    pub to: Address,
    /// ABI encoded [`CustodyCall`]
    #[serde(with = "crate::util::serde::hex_bytes")]
    pub data: Vec<u8>,
    /// The version of the co-signed state after the deposit
    pub state_version: u64,
}
