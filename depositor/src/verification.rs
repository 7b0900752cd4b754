use adapter::ChainReader;
use primitives::{Address, HomeChannel};

use crate::error::DepositError;

/// Checks the home channel reported by the clearnode against the custody contract.
///
/// The channel must be among the open channels of its owner on-chain,
/// otherwise the clearnode's indexer and the chain disagree and
/// [`DepositError::ConsistencyMismatch`] is returned.
pub async fn verify_home_channel<R: ChainReader + ?Sized>(
    chain: &R,
    custody: Address,
    home_channel: &HomeChannel,
) -> Result<(), DepositError> {
    let on_chain = chain
        .open_channels(custody, home_channel.owner)
        .await
        .map_err(DepositError::Chain)?;

    if on_chain.contains(&home_channel.channel_id) {
        Ok(())
    } else {
        Err(DepositError::ConsistencyMismatch {
            channel_id: home_channel.channel_id,
            owner: home_channel.owner,
            on_chain,
        })
    }
}
