use std::{collections::HashSet, fmt, time::Duration};

use primitives::{Address, Amount, ChainId, ChannelId, HomeChannel, TransactionHash};
use thiserror::Error;

use crate::clearnode;

/// What the last poll of the home channel returned before the deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LastSeen {
    /// No poll finished before the deadline
    Nothing,
    /// The clearnode has not indexed any home channel for the pair
    NotIndexed,
    /// A home channel which does not reflect the deposit yet
    Channel(Box<HomeChannel>),
    /// A transient failure of the clearnode
    Error(String),
}

impl fmt::Display for LastSeen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastSeen::Nothing => write!(f, "no poll completed"),
            LastSeen::NotIndexed => write!(f, "no home channel"),
            LastSeen::Channel(channel) => write!(
                f,
                "home channel {} ({}, version {})",
                channel.channel_id, channel.status, channel.version
            ),
            LastSeen::Error(error) => write!(f, "error: {}", error),
        }
    }
}

#[derive(Debug, Error)]
pub enum DepositError {
    #[error("Invalid deposit amount {amount}: {reason}")]
    InvalidAmount { amount: Amount, reason: String },
    #[error("Chain {0} has no custody contract configured in the clearnode")]
    UnsupportedChain(ChainId),
    #[error("Asset {asset} is not supported on chain {chain_id}")]
    UnsupportedAsset { asset: String, chain_id: ChainId },
    #[error("Clearnode refused to co-sign the deposit: {reason}")]
    SigningRejected { reason: String },
    #[error("Deposit transaction failed: {source}")]
    ChainSubmissionFailure {
        /// [`None`] when the transaction was never broadcasted
        transaction_hash: Option<TransactionHash>,
        #[source]
        source: adapter::Error,
    },
    #[error("Clearnode did not index the deposit within {timeout:?}, last seen: {last_seen}")]
    ConvergenceTimeout {
        timeout: Duration,
        last_seen: LastSeen,
    },
    #[error("Home channel {channel_id} of {owner} is not among its {} open channels on-chain", .on_chain.len())]
    ConsistencyMismatch {
        channel_id: ChannelId,
        owner: Address,
        on_chain: HashSet<ChannelId>,
    },
    #[error("Reading the chain: {0}")]
    Chain(#[source] adapter::Error),
    #[error(transparent)]
    Clearnode(#[from] clearnode::Error),
}
