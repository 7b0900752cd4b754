use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use primitives::{
    clearnode::{
        AssetsResponse, AuthorizationRequest, AuthorizationResponse, CustodyResponse,
        ErrorResponse, HomeChannelResponse,
    },
    custody::ChannelAuthorization,
    Address, AssetDescriptor, ChainId, HomeChannel, ToETHChecksum,
};
use reqwest::{Client, Response, StatusCode};
use slog::{debug, Logger};

use crate::clearnode::{ChannelAuthorizer, ChannelStateStore, ConfigResolver, Error};

pub use primitives::util::ApiUrl;

/// HTTP client of the clearnode REST API.
///
/// The custody contract and assets of a chain are cached after the first
/// successful fetch, home channels are always fetched from the clearnode.
#[derive(Debug)]
pub struct ClearnodeApi {
    client: Client,
    clearnode_url: ApiUrl,
    logger: Logger,
    custody_cache: DashMap<ChainId, Address>,
    assets_cache: DashMap<ChainId, Vec<AssetDescriptor>>,
}

impl ClearnodeApi {
    pub fn new(clearnode_url: ApiUrl, fetch_timeout: Duration, logger: Logger) -> Result<Self, Error> {
        let client = Client::builder().timeout(fetch_timeout).build()?;

        Ok(Self {
            client,
            clearnode_url,
            logger,
            custody_cache: DashMap::new(),
            assets_cache: DashMap::new(),
        })
    }

    pub fn clearnode_url(&self) -> &ApiUrl {
        &self.clearnode_url
    }
}

/// Turns a non-successful response into an [`Error`].
///
/// `5xx` responses are [`Error::Unavailable`], every other status is [`Error::Rejected`].
async fn error_from_response(response: Response) -> Error {
    let status = response.status();
    // the body might not be an `ErrorResponse`, e.g. from a proxy
    let message = match response.json::<ErrorResponse>().await {
        Ok(error_response) => error_response.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Unknown status")
            .to_string(),
    };

    if status.is_server_error() {
        Error::Unavailable {
            status: status.as_u16(),
            message,
        }
    } else {
        Error::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl ConfigResolver for ClearnodeApi {
    async fn custody_contract(&self, chain_id: ChainId) -> Result<Option<Address>, Error> {
        if let Some(custody) = self.custody_cache.get(&chain_id) {
            return Ok(Some(*custody));
        }

        let url = self
            .clearnode_url
            .join(&format!("config/{}/custody", chain_id))?;
        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let custody = response.json::<CustodyResponse>().await?.custody;
                debug!(&self.logger, "Resolved custody contract"; "module" => "clearnode_interface", "chain_id" => %chain_id, "custody" => %custody);

                self.custody_cache.insert(chain_id, custody);
                Ok(Some(custody))
            }
            _ => Err(error_from_response(response).await),
        }
    }

    async fn assets(&self, chain_id: ChainId) -> Result<Vec<AssetDescriptor>, Error> {
        if let Some(assets) = self.assets_cache.get(&chain_id) {
            return Ok(assets.clone());
        }

        let url = self
            .clearnode_url
            .join(&format!("config/{}/assets", chain_id))?;
        let response = self.client.get(url).send().await?;

        match response.status() {
            // the chain is unknown to the clearnode
            StatusCode::NOT_FOUND => Ok(vec![]),
            status if status.is_success() => {
                let assets = response.json::<AssetsResponse>().await?.assets;
                debug!(&self.logger, "Resolved {} assets", assets.len(); "module" => "clearnode_interface", "chain_id" => %chain_id);

                self.assets_cache.insert(chain_id, assets.clone());
                Ok(assets)
            }
            _ => Err(error_from_response(response).await),
        }
    }
}

#[async_trait]
impl ChannelStateStore for ClearnodeApi {
    async fn home_channel(
        &self,
        owner: Address,
        asset: &str,
    ) -> Result<Option<HomeChannel>, Error> {
        let owner = owner.to_checksum();
        let url = self
            .clearnode_url
            .join_segments(["channels", "home", owner.as_str(), asset]);
        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::UNPROCESSABLE_ENTITY => match error_from_response(response).await {
                Error::Rejected { message, .. } => Err(Error::Misconfigured(message)),
                other => Err(other),
            },
            status if status.is_success() => {
                Ok(Some(response.json::<HomeChannelResponse>().await?.channel))
            }
            _ => Err(error_from_response(response).await),
        }
    }
}

#[async_trait]
impl ChannelAuthorizer for ClearnodeApi {
    async fn authorize(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<ChannelAuthorization, Error> {
        let url = self.clearnode_url.join("channels/authorize")?;
        let response = self.client.post(url).json(request).send().await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(response.json::<AuthorizationResponse>().await?.authorization)
    }
}
