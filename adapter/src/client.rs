use std::collections::HashSet;

use async_trait::async_trait;
use primitives::{Address, BigNum, ChainId, ChannelId, TransactionHash};

use crate::Error;

/// A mined transaction which did **not** revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: TransactionHash,
    pub block_number: u64,
}

/// Available read-only methods of a chain client.
///
/// They don't require an unlocked wallet.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// The address of the wallet this client sends transactions from
    fn whoami(&self) -> Address;

    async fn chain_id(&self) -> Result<ChainId, Error>;

    /// The native balance of the `address` in wei
    async fn balance(&self, address: Address) -> Result<BigNum, Error>;

    /// The on-chain registry of the open channels of `owner` in the `custody` contract.
    async fn open_channels(
        &self,
        custody: Address,
        owner: Address,
    ) -> Result<HashSet<ChannelId>, Error>;

    /// Waits until the transaction is mined.
    ///
    /// A mined but reverted transaction results in an [`Error`] of kind
    /// [`Kind::Reverted`](crate::error::Kind::Reverted).
    async fn wait_for_receipt(&self, transaction_hash: TransactionHash) -> Result<Receipt, Error>;
}

/// The on-chain capabilities needed by a depositor.
///
/// Sending transactions requires the wallet to be unlocked, see [`Unlockable`].
#[async_trait]
pub trait ChainGateway: ChainReader {
    /// Signs and broadcasts a transaction with the given call `data` to the `to` address.
    ///
    /// Once broadcasted the transaction cannot be cancelled.
    async fn submit_transaction(
        &self,
        to: Address,
        data: Vec<u8>,
    ) -> Result<TransactionHash, Error>;
}

/// A client that can be `unlock()`ed in order to send transactions.
///
/// **Note:** A possibly expensive operation as it decrypts the keystore
pub trait Unlockable {
    type Unlocked: ChainGateway;

    fn unlock(&self) -> Result<Self::Unlocked, Error>;
}
