use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};

use crate::{Amount, ChainId, ChannelId, TransactionHash};

/// Whether a deposit opens the home channel or tops up the existing one.
///
/// The mode is always derived from the clearnode's view of the home channel
/// and never supplied by the caller.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromStr)]
#[serde(rename_all = "lowercase")]
#[display(style = "lowercase")]
pub enum DepositMode {
    Create,
    Checkpoint,
}

/// A single deposit request, constructed and consumed by one `deposit` call.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DepositIntent {
    pub chain_id: ChainId,
    pub asset: String,
    pub amount: Amount,
    pub mode: DepositMode,
}

/// The outcome of a submitted and mined deposit transaction.
///
/// It does **not** imply that the clearnode has indexed the deposit yet.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DepositResult {
    pub transaction_hash: TransactionHash,
    pub mode: DepositMode,
    /// The channel the authorization was issued for
    pub channel_id: ChannelId,
    /// The version of the co-signed state the transaction carries
    pub state_version: u64,
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::{to_value, Value};

    #[test]
    fn deposit_mode_is_lowercase() {
        assert_eq!(Value::String("checkpoint".into()), to_value(DepositMode::Checkpoint).unwrap());
        assert_eq!(DepositMode::Create, "create".parse().unwrap());
        assert!("top-up".parse::<DepositMode>().is_err());
    }
}
