//! In-memory clearnode for testing, paired with the [`DummyChain`].
//!
//! Home channels are only ever written by [`DummyClearnode::index`], which
//! replays the custody contract events of the chain in two phases: a newly
//! created channel is first recorded as [`ChannelStatus::Pending`] and becomes
//! [`ChannelStatus::Open`] on the following pass.
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use adapter::dummy::{dummy_signature, CustodyEvent, DummyChain};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, DashSet};
use primitives::{
    clearnode::AuthorizationRequest,
    custody::{state_hash, ChannelAuthorization, CustodyCall},
    Address, AssetDescriptor, ChainId, Channel, ChannelStatus, DepositMode, HomeChannel, Nonce,
};
use tokio::task::JoinHandle;

use crate::clearnode::{ChannelAuthorizer, ChannelStateStore, ConfigResolver, Error};

#[derive(Debug)]
struct Inner {
    signer: Address,
    chain: DummyChain,
    custody: DashMap<ChainId, Address>,
    assets: DashMap<ChainId, Vec<AssetDescriptor>>,
    /// (owner, upper-case asset symbol) => home channel
    home_channels: DashMap<(Address, String), HomeChannel>,
    /// upper-case asset symbols
    misconfigured: DashSet<String>,
    nonce: AtomicU64,
    /// index of the next chain event to replay
    event_cursor: Mutex<usize>,
    reachable: AtomicBool,
    requests: AtomicUsize,
    authorizations: AtomicUsize,
}

/// Dummy clearnode intended for testing.
///
/// Cloning it shares the same state.
#[derive(Debug, Clone)]
pub struct DummyClearnode {
    inner: Arc<Inner>,
}

fn pair(owner: Address, asset: &str) -> (Address, String) {
    (owner, asset.to_uppercase())
}

fn rejected(status: u16, message: impl Into<String>) -> Error {
    Error::Rejected {
        status,
        message: message.into(),
    }
}

impl DummyClearnode {
    /// A clearnode co-signing with `signer` whose custody contract is the one of the `chain`.
    ///
    /// Only the `assets` with a token on the chain are served for it.
    pub fn new(signer: Address, chain: DummyChain, assets: Vec<AssetDescriptor>) -> Self {
        let chain_id = chain.chain_id();
        let custody = DashMap::new();
        custody.insert(chain_id, chain.custody());

        let chain_assets = DashMap::new();
        chain_assets.insert(
            chain_id,
            assets
                .into_iter()
                .filter(|asset| asset.token_for(chain_id).is_some())
                .collect::<Vec<_>>(),
        );

        Self {
            inner: Arc::new(Inner {
                signer,
                chain,
                custody,
                assets: chain_assets,
                home_channels: DashMap::new(),
                misconfigured: DashSet::new(),
                nonce: AtomicU64::new(0),
                event_cursor: Mutex::new(0),
                reachable: AtomicBool::new(true),
                requests: AtomicUsize::new(0),
                authorizations: AtomicUsize::new(0),
            }),
        }
    }

    pub fn chain(&self) -> &DummyChain {
        &self.inner.chain
    }

    /// Simulates the clearnode going down (`503`) or coming back up
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Sets or removes (with [`None`]) the custody contract of a chain
    pub fn set_custody(&self, chain_id: ChainId, custody: Option<Address>) {
        match custody {
            Some(custody) => {
                self.inner.custody.insert(chain_id, custody);
            }
            None => {
                self.inner.custody.remove(&chain_id);
            }
        }
    }

    /// Home channel reads of the asset will fail with [`Error::Misconfigured`]
    pub fn set_misconfigured(&self, asset: &str) {
        self.inner.misconfigured.insert(asset.to_uppercase());
    }

    /// The number of requests received, authorizations included
    pub fn requests_count(&self) -> usize {
        self.inner.requests.load(Ordering::SeqCst)
    }

    /// The number of authorizations issued
    pub fn authorizations_count(&self) -> usize {
        self.inner.authorizations.load(Ordering::SeqCst)
    }

    /// Replays the new custody contract events.
    ///
    /// Returns the number of replayed events.
    pub fn index(&self) -> usize {
        let now = Utc::now();

        // channels recorded as pending on the previous pass are now final
        for mut home_channel in self.inner.home_channels.iter_mut() {
            if home_channel.status == ChannelStatus::Pending {
                home_channel.status = ChannelStatus::Open;
                home_channel.updated_at = now;
            }
        }

        let events = {
            let mut cursor = self
                .inner
                .event_cursor
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let events = self.inner.chain.events_since(*cursor);
            *cursor += events.len();

            events
        };

        for event in events.iter() {
            match event {
                CustodyEvent::Created {
                    channel, amount, ..
                } => {
                    // channels of tokens which are not a configured asset are ignored
                    let symbol = match self.asset_of(channel) {
                        Some(symbol) => symbol,
                        None => continue,
                    };

                    self.inner.home_channels.insert(
                        pair(channel.owner, &symbol),
                        HomeChannel {
                            channel_id: channel.id(),
                            owner: channel.owner,
                            asset: symbol,
                            chain_id: channel.chain_id,
                            status: ChannelStatus::Pending,
                            version: 0,
                            amount: amount.clone(),
                            updated_at: now,
                        },
                    );
                }
                CustodyEvent::Checkpointed {
                    channel_id,
                    version,
                    amount,
                    ..
                } => {
                    if let Some(mut home_channel) = self
                        .inner
                        .home_channels
                        .iter_mut()
                        .find(|home_channel| home_channel.channel_id == *channel_id)
                    {
                        home_channel.version = *version;
                        home_channel.amount = amount.clone();
                        home_channel.updated_at = now;
                    }
                }
            }
        }

        events.len()
    }

    /// Runs [`DummyClearnode::index`] every `lag` in the background
    /// until the handle is aborted.
    pub fn spawn_indexer(&self, lag: Duration) -> JoinHandle<()> {
        let clearnode = self.clone();

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(lag).await;
                clearnode.index();
            }
        })
    }

    fn asset_of(&self, channel: &Channel) -> Option<String> {
        self.inner.assets.get(&channel.chain_id).and_then(|assets| {
            assets
                .iter()
                .find(|asset| {
                    asset
                        .token_for(channel.chain_id)
                        .map_or(false, |token| token.address == channel.token)
                })
                .map(|asset| asset.symbol.clone())
        })
    }

    fn receive(&self) -> Result<(), Error> {
        self.inner.requests.fetch_add(1, Ordering::SeqCst);

        if self.inner.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Unavailable {
                status: 503,
                message: "Dummy clearnode is not reachable".into(),
            })
        }
    }
}

#[async_trait]
impl ConfigResolver for DummyClearnode {
    async fn custody_contract(&self, chain_id: ChainId) -> Result<Option<Address>, Error> {
        self.receive()?;

        Ok(self.inner.custody.get(&chain_id).map(|custody| *custody))
    }

    async fn assets(&self, chain_id: ChainId) -> Result<Vec<AssetDescriptor>, Error> {
        self.receive()?;

        Ok(self
            .inner
            .assets
            .get(&chain_id)
            .map(|assets| assets.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl ChannelStateStore for DummyClearnode {
    async fn home_channel(
        &self,
        owner: Address,
        asset: &str,
    ) -> Result<Option<HomeChannel>, Error> {
        self.receive()?;

        if self.inner.misconfigured.contains(&asset.to_uppercase()) {
            return Err(Error::Misconfigured(format!(
                "{asset} has no token configured"
            )));
        }

        Ok(self
            .inner
            .home_channels
            .get(&pair(owner, asset))
            .map(|home_channel| home_channel.value().clone()))
    }
}

#[async_trait]
impl ChannelAuthorizer for DummyClearnode {
    async fn authorize(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<ChannelAuthorization, Error> {
        self.receive()?;

        if request.amount.is_zero() {
            return Err(rejected(400, "amount must be positive"));
        }

        let custody = self
            .inner
            .custody
            .get(&request.chain_id)
            .map(|custody| *custody)
            .ok_or_else(|| rejected(404, format!("unknown chain {}", request.chain_id)))?;

        let token = self
            .inner
            .assets
            .get(&request.chain_id)
            .and_then(|assets| {
                assets
                    .iter()
                    .find(|asset| asset.is(&request.asset))
                    .and_then(|asset| asset.token_for(request.chain_id).copied())
            })
            .ok_or_else(|| {
                rejected(
                    422,
                    format!("{} is not supported on chain {}", request.asset, request.chain_id),
                )
            })?;

        let home_channel = self
            .inner
            .home_channels
            .get(&pair(request.owner, &request.asset))
            .map(|home_channel| home_channel.value().clone());

        let (call, state_version) = match (request.mode, home_channel) {
            (DepositMode::Create, Some(existing)) => {
                return Err(rejected(
                    409,
                    format!("home channel {} already exists", existing.channel_id),
                ))
            }
            (DepositMode::Checkpoint, None) => {
                return Err(rejected(409, "no home channel to checkpoint"));
            }
            (DepositMode::Checkpoint, Some(existing)) if existing.chain_id != request.chain_id => {
                return Err(rejected(
                    409,
                    format!("home channel is on chain {}", existing.chain_id),
                ));
            }
            (DepositMode::Create, None) => {
                let nonce = self.inner.nonce.fetch_add(1, Ordering::SeqCst) + 1;
                let channel = Channel {
                    owner: request.owner,
                    clearnode: self.inner.signer,
                    token: token.address,
                    chain_id: request.chain_id,
                    nonce: Nonce::from(nonce),
                };

                let hash = state_hash(channel.id(), 0, &request.amount)
                    .map_err(|err| rejected(400, err.to_string()))?;

                let call = CustodyCall::Create {
                    channel,
                    amount: request.amount.clone(),
                    signature: dummy_signature(hash, self.inner.signer),
                };

                (call, 0)
            }
            (DepositMode::Checkpoint, Some(existing)) => {
                let version = existing.version + 1;
                let hash = state_hash(existing.channel_id, version, &request.amount)
                    .map_err(|err| rejected(400, err.to_string()))?;

                let call = CustodyCall::Checkpoint {
                    channel_id: existing.channel_id,
                    version,
                    amount: request.amount.clone(),
                    signature: dummy_signature(hash, self.inner.signer),
                };

                (call, version)
            }
        };

        let data = call
            .encode()
            .map_err(|err| rejected(400, err.to_string()))?;
        self.inner.authorizations.fetch_add(1, Ordering::SeqCst);

        Ok(ChannelAuthorization {
            channel_id: call.channel_id(),
            mode: call.mode(),
            to: custody,
            data,
            state_version,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use adapter::{ChainGateway, ChainReader};
    use pretty_assertions::assert_eq;
    use primitives::{
        test_util::{ANVIL_CHAIN_ID, CLEARNODE, CUSTODY_ADDRESS, MST, OWNER, OWNER_2},
        BigNum,
    };

    fn setup() -> DummyClearnode {
        let chain = DummyChain::new(ChainId::new(ANVIL_CHAIN_ID), *CUSTODY_ADDRESS, *CLEARNODE);

        DummyClearnode::new(*CLEARNODE, chain, vec![MST.clone()])
    }

    fn request(owner: Address, mode: DepositMode) -> AuthorizationRequest {
        AuthorizationRequest {
            owner,
            chain_id: ChainId::new(ANVIL_CHAIN_ID),
            asset: "mst".into(),
            amount: BigNum::from(10_u64),
            mode,
        }
    }

    async fn submit(clearnode: &DummyClearnode, authorization: ChannelAuthorization) {
        let client = clearnode.chain().client(*OWNER);
        let hash = client
            .submit_transaction(authorization.to, authorization.data)
            .await
            .expect("Should submit");
        client.wait_for_receipt(hash).await.expect("Should be mined");
    }

    #[tokio::test]
    async fn serves_the_chain_config() {
        let clearnode = setup();

        assert_eq!(
            Some(*CUSTODY_ADDRESS),
            clearnode
                .custody_contract(ChainId::new(ANVIL_CHAIN_ID))
                .await
                .unwrap()
        );
        assert_eq!(None, clearnode.custody_contract(ChainId::new(1)).await.unwrap());
        assert!(clearnode.assets(ChainId::new(1)).await.unwrap().is_empty());
        assert_eq!(3, clearnode.requests_count());
    }

    #[tokio::test]
    async fn indexes_a_created_channel_in_two_passes() {
        let clearnode = setup();

        let authorization = clearnode
            .authorize(&request(*OWNER, DepositMode::Create))
            .await
            .expect("Should authorize");
        assert_eq!(*CUSTODY_ADDRESS, authorization.to);
        assert_eq!(0, authorization.state_version);
        let channel_id = authorization.channel_id;

        submit(&clearnode, authorization).await;
        // not indexed yet
        assert_eq!(None, clearnode.home_channel(*OWNER, "MST").await.unwrap());

        assert_eq!(1, clearnode.index());
        let pending = clearnode
            .home_channel(*OWNER, "MST")
            .await
            .unwrap()
            .expect("Should be indexed");
        assert_eq!(ChannelStatus::Pending, pending.status);
        assert_eq!(channel_id, pending.channel_id);
        assert_eq!("MST", pending.asset);

        assert_eq!(0, clearnode.index());
        let open = clearnode
            .home_channel(*OWNER, "mst")
            .await
            .unwrap()
            .expect("Should be indexed");
        assert!(open.is_open());
        assert_eq!(BigNum::from(10_u64), open.amount);

        // other owners are not affected
        assert_eq!(None, clearnode.home_channel(*OWNER_2, "MST").await.unwrap());
    }

    #[tokio::test]
    async fn checkpoints_the_home_channel() {
        let clearnode = setup();

        let created = clearnode
            .authorize(&request(*OWNER, DepositMode::Create))
            .await
            .unwrap();
        let channel_id = created.channel_id;
        submit(&clearnode, created).await;
        clearnode.index();

        let checkpoint = clearnode
            .authorize(&request(*OWNER, DepositMode::Checkpoint))
            .await
            .expect("Should authorize");
        assert_eq!(channel_id, checkpoint.channel_id);
        assert_eq!(1, checkpoint.state_version);
        assert_eq!(DepositMode::Checkpoint, checkpoint.mode);
        submit(&clearnode, checkpoint).await;

        clearnode.index();
        let home_channel = clearnode.home_channel(*OWNER, "MST").await.unwrap().unwrap();
        assert!(home_channel.is_open());
        assert_eq!(1, home_channel.version);
        assert_eq!(BigNum::from(20_u64), home_channel.amount);
        assert_eq!(2, clearnode.authorizations_count());
    }

    #[tokio::test]
    async fn refuses_mismatching_modes() {
        let clearnode = setup();

        let error = clearnode
            .authorize(&request(*OWNER, DepositMode::Checkpoint))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Rejected { status: 409, .. }));

        let created = clearnode
            .authorize(&request(*OWNER, DepositMode::Create))
            .await
            .unwrap();
        submit(&clearnode, created).await;
        clearnode.index();

        let error = clearnode
            .authorize(&request(*OWNER, DepositMode::Create))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Rejected { status: 409, .. }));

        let unsupported = AuthorizationRequest {
            asset: "USDC".into(),
            ..request(*OWNER_2, DepositMode::Create)
        };
        let error = clearnode.authorize(&unsupported).await.unwrap_err();
        assert!(matches!(error, Error::Rejected { status: 422, .. }));
        assert_eq!(1, clearnode.authorizations_count());
    }

    #[tokio::test]
    async fn unreachable_and_misconfigured() {
        let clearnode = setup();

        clearnode.set_misconfigured("mst");
        let error = clearnode.home_channel(*OWNER, "MST").await.unwrap_err();
        assert!(matches!(error, Error::Misconfigured(_)));

        clearnode.set_reachable(false);
        let error = clearnode.home_channel(*OWNER, "MST").await.unwrap_err();
        assert!(error.is_transient());
    }

    #[tokio::test]
    async fn background_indexer_catches_up() {
        let clearnode = setup();
        let authorization = clearnode
            .authorize(&request(*OWNER, DepositMode::Create))
            .await
            .unwrap();
        submit(&clearnode, authorization).await;

        let indexer = clearnode.spawn_indexer(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(200)).await;
        indexer.abort();

        let home_channel = clearnode.home_channel(*OWNER, "MST").await.unwrap().unwrap();
        assert!(home_channel.is_open());
        assert!(clearnode
            .chain()
            .client(*OWNER)
            .open_channels(*CUSTODY_ADDRESS, *OWNER)
            .await
            .unwrap()
            .contains(&home_channel.channel_id));
    }
}
