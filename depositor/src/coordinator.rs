use adapter::ChainGateway;
use primitives::{
    asset::find_asset,
    clearnode::AuthorizationRequest,
    custody::{ChannelAuthorization, CustodyCall},
    Address, Amount, BigNum, ChainId, ChannelStatus, DepositIntent, DepositMode, DepositResult,
    HomeChannel,
};
use slog::{info, Logger};

use crate::{
    clearnode::{Clearnode, Error as ClearnodeError},
    convergence::{self, ConvergenceOptions},
    error::DepositError,
    verification::verify_home_channel,
};

/// Deposits funds of its owner into the home channels of the clearnode.
///
/// The owner is the wallet of the [`ChainGateway`].
/// Deposits of different (owner, asset) pairs can run concurrently,
/// deposits of the same pair are **not** serialized, the custody contract
/// rejects a second channel for the pair.
#[derive(Debug, Clone)]
pub struct DepositCoordinator<G, C> {
    gateway: G,
    clearnode: C,
    logger: Logger,
}

impl<G: ChainGateway, C: Clearnode> DepositCoordinator<G, C> {
    pub fn new(gateway: G, clearnode: C, logger: Logger) -> Self {
        Self {
            gateway,
            clearnode,
            logger,
        }
    }

    pub fn owner(&self) -> Address {
        self.gateway.whoami()
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn clearnode(&self) -> &C {
        &self.clearnode
    }

    /// Deposits `amount` of the `asset` on the chain into the owner's home channel.
    ///
    /// Creates the home channel when the clearnode knows none for the owner and asset,
    /// otherwise checkpoints it with the topped up state.
    /// Exactly one transaction is submitted and the call returns once it is mined,
    /// without waiting for the clearnode to index it.
    pub async fn deposit(
        &self,
        chain_id: ChainId,
        asset: &str,
        amount: &Amount,
    ) -> Result<DepositResult, DepositError> {
        if !amount.is_positive() {
            return Err(DepositError::InvalidAmount {
                amount: amount.clone(),
                reason: "the amount should be positive".into(),
            });
        }

        let owner = self.owner();
        let unsupported_asset = || DepositError::UnsupportedAsset {
            asset: asset.to_string(),
            chain_id,
        };

        let assets = self.clearnode.assets(chain_id).await?;
        let descriptor = find_asset(&assets, asset).ok_or_else(unsupported_asset)?;
        let token = descriptor
            .token_for(chain_id)
            .copied()
            .ok_or_else(unsupported_asset)?;
        // the clearnode's spelling of the symbol from here on
        let asset = descriptor.symbol.as_str();

        let units = amount
            .to_token_units(token.decimals)
            .map_err(|err| DepositError::InvalidAmount {
                amount: amount.clone(),
                reason: err.to_string(),
            })?;

        let custody = self
            .clearnode
            .custody_contract(chain_id)
            .await?
            .ok_or(DepositError::UnsupportedChain(chain_id))?;

        // always the clearnode's view, the client never caches home channels
        let home_channel = match self.clearnode.home_channel(owner, asset).await {
            Ok(home_channel) => home_channel.filter(|home| home.status != ChannelStatus::Absent),
            Err(ClearnodeError::Misconfigured(_)) => return Err(unsupported_asset()),
            Err(err) => return Err(err.into()),
        };
        let mode = match home_channel {
            Some(_) => DepositMode::Checkpoint,
            None => DepositMode::Create,
        };

        let intent = DepositIntent {
            chain_id,
            asset: asset.to_string(),
            amount: amount.clone(),
            mode,
        };

        info!(&self.logger, "Requesting deposit authorization"; "module" => "deposit", "chain_id" => %intent.chain_id, "asset" => &intent.asset, "amount" => %intent.amount, "mode" => %intent.mode);

        let request = AuthorizationRequest {
            owner,
            chain_id: intent.chain_id,
            asset: intent.asset,
            amount: units.clone(),
            mode: intent.mode,
        };
        let authorization = match self.clearnode.authorize(&request).await {
            Ok(authorization) => authorization,
            Err(ClearnodeError::Rejected { message, .. }) => {
                return Err(DepositError::SigningRejected { reason: message })
            }
            Err(err) => return Err(err.into()),
        };

        let expected = ExpectedDeposit {
            custody,
            owner,
            chain_id,
            token: token.address,
            mode,
            amount: &units,
            home_channel: home_channel.as_ref(),
        };
        check_authorization(&authorization, &expected)?;

        let ChannelAuthorization {
            channel_id,
            to,
            data,
            state_version,
            ..
        } = authorization;

        let transaction_hash = self
            .gateway
            .submit_transaction(to, data)
            .await
            .map_err(|source| DepositError::ChainSubmissionFailure {
                transaction_hash: None,
                source,
            })?;

        info!(&self.logger, "Deposit transaction submitted"; "module" => "deposit", "transaction_hash" => %transaction_hash, "channel_id" => %channel_id, "mode" => %mode);

        let receipt = self
            .gateway
            .wait_for_receipt(transaction_hash)
            .await
            .map_err(|source| DepositError::ChainSubmissionFailure {
                transaction_hash: Some(transaction_hash),
                source,
            })?;

        info!(&self.logger, "Deposit transaction mined"; "module" => "deposit", "transaction_hash" => %transaction_hash, "block_number" => receipt.block_number);

        Ok(DepositResult {
            transaction_hash,
            mode,
            channel_id,
            state_version,
        })
    }

    /// Waits until the clearnode reports an open home channel of the owner for the `asset`.
    ///
    /// See [`convergence::await_home_channel`].
    pub async fn await_home_channel(
        &self,
        asset: &str,
        options: ConvergenceOptions,
    ) -> Result<HomeChannel, DepositError> {
        convergence::await_home_channel(&self.clearnode, self.owner(), asset, options, &self.logger)
            .await
    }

    /// Waits until the clearnode has indexed the `deposit`.
    ///
    /// See [`convergence::await_deposit`].
    pub async fn await_deposit(
        &self,
        asset: &str,
        deposit: &DepositResult,
        options: ConvergenceOptions,
    ) -> Result<HomeChannel, DepositError> {
        convergence::await_deposit(
            &self.clearnode,
            self.owner(),
            asset,
            deposit,
            options,
            &self.logger,
        )
        .await
    }

    /// Checks that the home channel is open in the custody contract of the chain.
    pub async fn verify(
        &self,
        chain_id: ChainId,
        home_channel: &HomeChannel,
    ) -> Result<(), DepositError> {
        let custody = self
            .clearnode
            .custody_contract(chain_id)
            .await?
            .ok_or(DepositError::UnsupportedChain(chain_id))?;

        verify_home_channel(&self.gateway, custody, home_channel).await?;

        info!(&self.logger, "Home channel verified on-chain"; "module" => "deposit", "channel_id" => %home_channel.channel_id, "chain_id" => %chain_id);

        Ok(())
    }
}

/// What the clearnode was asked to authorize.
struct ExpectedDeposit<'a> {
    custody: Address,
    owner: Address,
    chain_id: ChainId,
    token: Address,
    mode: DepositMode,
    amount: &'a BigNum,
    home_channel: Option<&'a HomeChannel>,
}

/// The authorization should be exactly what was requested,
/// anything else is treated as a refusal of the clearnode.
fn check_authorization(
    authorization: &ChannelAuthorization,
    expected: &ExpectedDeposit<'_>,
) -> Result<(), DepositError> {
    let rejected = |reason: String| Err(DepositError::SigningRejected { reason });

    if authorization.to != expected.custody {
        return rejected(format!(
            "authorization targets {} instead of the custody contract {}",
            authorization.to, expected.custody
        ));
    }

    if authorization.mode != expected.mode {
        return rejected(format!(
            "authorization is for {} but {} was requested",
            authorization.mode, expected.mode
        ));
    }

    if let Some(home_channel) = expected.home_channel {
        if authorization.channel_id != home_channel.channel_id {
            return rejected(format!(
                "authorization is for channel {} instead of the home channel {}",
                authorization.channel_id, home_channel.channel_id
            ));
        }
    }

    let call = match CustodyCall::decode(&authorization.data) {
        Ok(call) => call,
        Err(err) => return rejected(format!("authorization data: {}", err)),
    };

    if call.mode() != expected.mode
        || call.channel_id() != authorization.channel_id
        || call.amount() != expected.amount
    {
        return rejected("authorization data does not match the authorized deposit".into());
    }

    match &call {
        CustodyCall::Create { channel, .. } => {
            if channel.owner != expected.owner {
                return rejected(format!(
                    "channel is owned by {} instead of {}",
                    channel.owner, expected.owner
                ));
            }
            if channel.chain_id != expected.chain_id {
                return rejected(format!(
                    "channel is on chain {} instead of {}",
                    channel.chain_id, expected.chain_id
                ));
            }
            if channel.token != expected.token {
                return rejected(format!(
                    "channel token {} is not the asset token {}",
                    channel.token, expected.token
                ));
            }
        }
        CustodyCall::Checkpoint { version, .. } => {
            if *version != authorization.state_version {
                return rejected(format!(
                    "checkpoint moves to version {} but the authorized state is {}",
                    version, authorization.state_version
                ));
            }
        }
    }

    Ok(())
}
