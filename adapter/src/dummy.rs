//! The [`Dummy`] chain client and the in-memory [`DummyChain`] it sends transactions to.
//!
//! The chain hosts a single custody contract which enforces the same rules
//! as the on-chain one:
//! - only the channel owner can create or checkpoint its channel
//! - every state must be co-signed by the clearnode
//! - an owner can have only one open channel per token
//! - checkpoints must increase the state version
use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use dashmap::DashMap;
use primitives::{
    custody::{state_hash, CustodyCall},
    Address, BigNum, ChainId, Channel, ChannelId, ToETHChecksum, ToHex, TransactionHash,
};
use web3::signing::keccak256;

use crate::{ChainGateway, ChainReader, Error, Receipt, Unlockable};

/// The signature the dummy clearnode produces for a channel state.
///
/// `Dummy clearnode signature for {state hash} by {signer}`
pub fn dummy_signature(state_hash: [u8; 32], signer: Address) -> Vec<u8> {
    format!(
        "Dummy clearnode signature for {} by {}",
        state_hash.to_hex_prefixed(),
        signer.to_checksum()
    )
    .into_bytes()
}

/// An event emitted by the custody contract of the [`DummyChain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustodyEvent {
    Created {
        channel: Channel,
        amount: BigNum,
        block_number: u64,
    },
    Checkpointed {
        channel_id: ChannelId,
        version: u64,
        /// The total amount locked in the channel after the checkpoint
        amount: BigNum,
        block_number: u64,
    },
}

/// A channel as registered in the custody contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnChainChannel {
    pub channel: Channel,
    pub version: u64,
    pub amount: BigNum,
}

#[derive(Debug, Clone)]
enum Outcome {
    Mined(Receipt),
    Reverted(String),
}

#[derive(Debug)]
struct State {
    chain_id: ChainId,
    custody: Address,
    /// The co-signer of every channel state
    clearnode: Address,
    reachable: AtomicBool,
    block_number: AtomicU64,
    balances: DashMap<Address, BigNum>,
    channels: DashMap<ChannelId, OnChainChannel>,
    /// (owner, token) => the open channel
    open_channels: DashMap<(Address, Address), ChannelId>,
    transactions: DashMap<TransactionHash, Outcome>,
    events: Mutex<Vec<CustodyEvent>>,
}

/// In-memory chain shared between all the [`Dummy`] clients created from it.
#[derive(Debug, Clone)]
pub struct DummyChain {
    state: Arc<State>,
}

impl DummyChain {
    pub fn new(chain_id: ChainId, custody: Address, clearnode: Address) -> Self {
        Self {
            state: Arc::new(State {
                chain_id,
                custody,
                clearnode,
                reachable: AtomicBool::new(true),
                block_number: AtomicU64::new(0),
                balances: DashMap::new(),
                channels: DashMap::new(),
                open_channels: DashMap::new(),
                transactions: DashMap::new(),
                events: Mutex::new(Vec::new()),
            }),
        }
    }

    /// A client sending transactions from `identity`
    pub fn client(&self, identity: Address) -> Dummy {
        Dummy {
            identity,
            chain: self.clone(),
        }
    }

    pub fn chain_id(&self) -> ChainId {
        self.state.chain_id
    }

    pub fn custody(&self) -> Address {
        self.state.custody
    }

    /// Simulates the RPC node going down or coming back up
    pub fn set_reachable(&self, reachable: bool) {
        self.state.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn set_balance(&self, address: Address, balance: BigNum) {
        self.state.balances.insert(address, balance);
    }

    pub fn channel(&self, channel_id: ChannelId) -> Option<OnChainChannel> {
        self.state
            .channels
            .get(&channel_id)
            .map(|channel| channel.value().clone())
    }

    /// The number of transactions sent to the chain, reverted ones included
    pub fn transactions_count(&self) -> usize {
        self.state.transactions.len()
    }

    /// The custody contract events starting from the `from` index
    pub fn events_since(&self, from: usize) -> Vec<CustodyEvent> {
        let events = self
            .state
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        events.iter().skip(from).cloned().collect()
    }

    fn ensure_reachable(&self) -> Result<(), Error> {
        if self.state.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::unreachable("Dummy chain is not reachable"))
        }
    }

    fn next_block(&self) -> u64 {
        self.state.block_number.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn emit(&self, event: CustodyEvent) {
        self.state
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }

    fn verify_signature(
        &self,
        channel_id: ChannelId,
        version: u64,
        amount: &BigNum,
        signature: &[u8],
    ) -> Result<(), String> {
        let hash = state_hash(channel_id, version, amount).map_err(|err| err.to_string())?;

        if signature == dummy_signature(hash, self.state.clearnode).as_slice() {
            Ok(())
        } else {
            Err(format!(
                "invalid clearnode signature for channel {channel_id} version {version}"
            ))
        }
    }

    /// Executes the custody contract call, either all of its effects are applied or none.
    fn execute(&self, sender: Address, to: Address, data: &[u8], block_number: u64) -> Result<(), String> {
        if to != self.state.custody {
            return Err(format!("no contract at {to}"));
        }

        match CustodyCall::decode(data).map_err(|err| err.to_string())? {
            CustodyCall::Create {
                channel,
                amount,
                signature,
            } => {
                if channel.owner != sender {
                    return Err("only the owner can create a channel".into());
                }
                if channel.chain_id != self.state.chain_id {
                    return Err(format!("channel is for chain {}", channel.chain_id));
                }
                if channel.clearnode != self.state.clearnode {
                    return Err(format!("unknown clearnode {}", channel.clearnode));
                }

                let channel_id = channel.id();
                self.verify_signature(channel_id, 0, &amount, &signature)?;

                // the entry locks the (owner, token) pair for concurrent creates
                let pair = (channel.owner, channel.token);
                match self.state.open_channels.entry(pair) {
                    dashmap::mapref::entry::Entry::Occupied(open) => {
                        return Err(format!(
                            "owner already has an open channel {} for token {}",
                            open.get(),
                            channel.token
                        ));
                    }
                    dashmap::mapref::entry::Entry::Vacant(vacant) => {
                        if self.state.channels.contains_key(&channel_id) {
                            return Err(format!("channel {channel_id} already exists"));
                        }

                        self.state.channels.insert(
                            channel_id,
                            OnChainChannel {
                                channel,
                                version: 0,
                                amount: amount.clone(),
                            },
                        );
                        vacant.insert(channel_id);
                    }
                }

                self.emit(CustodyEvent::Created {
                    channel,
                    amount,
                    block_number,
                });
            }
            CustodyCall::Checkpoint {
                channel_id,
                version,
                amount,
                signature,
            } => {
                self.verify_signature(channel_id, version, &amount, &signature)?;

                let total = {
                    let mut on_chain = self
                        .state
                        .channels
                        .get_mut(&channel_id)
                        .ok_or_else(|| format!("channel {channel_id} does not exist"))?;

                    if on_chain.channel.owner != sender {
                        return Err("only the owner can checkpoint a channel".into());
                    }
                    if version <= on_chain.version {
                        return Err(format!(
                            "stale version {version}, channel is at {}",
                            on_chain.version
                        ));
                    }

                    on_chain.version = version;
                    on_chain.amount += &amount;
                    on_chain.amount.clone()
                };

                self.emit(CustodyEvent::Checkpointed {
                    channel_id,
                    version,
                    amount: total,
                    block_number,
                });
            }
        }

        Ok(())
    }
}

/// Dummy chain client intended for testing.
///
/// Transactions are mined as soon as they are submitted.
#[derive(Debug, Clone)]
pub struct Dummy {
    identity: Address,
    chain: DummyChain,
}

impl Dummy {
    pub fn chain(&self) -> &DummyChain {
        &self.chain
    }
}

#[async_trait]
impl ChainReader for Dummy {
    fn whoami(&self) -> Address {
        self.identity
    }

    async fn chain_id(&self) -> Result<ChainId, Error> {
        self.chain.ensure_reachable()?;

        Ok(self.chain.state.chain_id)
    }

    async fn balance(&self, address: Address) -> Result<BigNum, Error> {
        self.chain.ensure_reachable()?;

        Ok(self
            .chain
            .state
            .balances
            .get(&address)
            .map(|balance| balance.value().clone())
            .unwrap_or_default())
    }

    async fn open_channels(
        &self,
        custody: Address,
        owner: Address,
    ) -> Result<HashSet<ChannelId>, Error> {
        self.chain.ensure_reachable()?;

        if custody != self.chain.state.custody {
            return Err(Error::contract(format!("No custody contract at {custody}")));
        }

        Ok(self
            .chain
            .state
            .open_channels
            .iter()
            .filter(|entry| entry.key().0 == owner)
            .map(|entry| *entry.value())
            .collect())
    }

    async fn wait_for_receipt(&self, transaction_hash: TransactionHash) -> Result<Receipt, Error> {
        self.chain.ensure_reachable()?;

        let outcome = self
            .chain
            .state
            .transactions
            .get(&transaction_hash)
            .map(|outcome| outcome.value().clone())
            .ok_or_else(|| Error::transaction(format!("Unknown transaction {transaction_hash}")))?;

        match outcome {
            Outcome::Mined(receipt) => Ok(receipt),
            Outcome::Reverted(reason) => Err(Error::reverted(format!(
                "Transaction {transaction_hash} reverted: {reason}"
            ))),
        }
    }
}

#[async_trait]
impl ChainGateway for Dummy {
    async fn submit_transaction(
        &self,
        to: Address,
        data: Vec<u8>,
    ) -> Result<TransactionHash, Error> {
        self.chain.ensure_reachable()?;

        let block_number = self.chain.next_block();
        // unique for every transaction, like the sender & nonce pair
        let mut preimage = self.identity.to_bytes().to_vec();
        preimage.extend_from_slice(&block_number.to_be_bytes());
        preimage.extend_from_slice(&data);
        let transaction_hash = TransactionHash::from(keccak256(&preimage));

        let outcome = match self.chain.execute(self.identity, to, &data, block_number) {
            Ok(()) => Outcome::Mined(Receipt {
                transaction_hash,
                block_number,
            }),
            Err(reason) => Outcome::Reverted(reason),
        };

        self.chain.state.transactions.insert(transaction_hash, outcome);

        Ok(transaction_hash)
    }
}

impl Unlockable for Dummy {
    type Unlocked = Self;

    fn unlock(&self) -> Result<Self::Unlocked, Error> {
        Ok(self.clone())
    }
}
