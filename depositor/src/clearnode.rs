//! The capabilities of the clearnode the depositor relies on.
use async_trait::async_trait;
use primitives::{
    clearnode::AuthorizationRequest, custody::ChannelAuthorization, Address, AssetDescriptor,
    ChainId, HomeChannel,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Request to clearnode: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Building clearnode endpoint: {0}")]
    Url(#[from] url::ParseError),
    /// The clearnode is temporarily unable to answer, e.g. `5xx` responses.
    #[error("Clearnode unavailable ({status}): {message}")]
    Unavailable { status: u16, message: String },
    /// The clearnode explicitly refused the request.
    #[error("Clearnode rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    /// The clearnode reports the asset as misconfigured, retrying will not help.
    #[error("Asset misconfigured in the clearnode: {0}")]
    Misconfigured(String),
}

impl Error {
    /// Whether the same request can succeed if retried later.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Request(error) => !error.is_decode() && !error.is_builder(),
            Error::Unavailable { .. } => true,
            Error::Url(_) | Error::Rejected { .. } | Error::Misconfigured(_) => false,
        }
    }
}

/// Resolves the per-chain configuration of the clearnode.
#[async_trait]
pub trait ConfigResolver: Send + Sync {
    /// [`None`] when the clearnode has no custody contract on the chain.
    async fn custody_contract(&self, chain_id: ChainId) -> Result<Option<Address>, Error>;

    async fn assets(&self, chain_id: ChainId) -> Result<Vec<AssetDescriptor>, Error>;
}

/// The clearnode's record of home channels, updated by its indexer.
#[async_trait]
pub trait ChannelStateStore: Send + Sync {
    /// [`None`] when the clearnode knows no home channel for the pair (yet).
    async fn home_channel(&self, owner: Address, asset: &str)
        -> Result<Option<HomeChannel>, Error>;
}

/// Co-signs channel states as a required participant of every channel.
#[async_trait]
pub trait ChannelAuthorizer: Send + Sync {
    async fn authorize(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<ChannelAuthorization, Error>;
}

/// Everything the [`DepositCoordinator`](crate::DepositCoordinator) needs from a clearnode.
pub trait Clearnode: ConfigResolver + ChannelStateStore + ChannelAuthorizer {}

impl<T> Clearnode for T where T: ConfigResolver + ChannelStateStore + ChannelAuthorizer {}
