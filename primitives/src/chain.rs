use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// The Id of the chain
///
/// # Ethereum Virtual Machine
///
/// For all the EVM-compatible Chain IDs visit <https://chainid.network>
#[derive(Serialize, Deserialize, Hash, Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Display, FromStr)]
#[serde(transparent)]
#[display("{0}")]
pub struct ChainId(u64);

impl ChainId {
    /// # Panics
    ///
    /// If `id` is `0`.
    pub fn new(id: u64) -> Self {
        assert!(id != 0, "The Chain Id cannot be 0");

        Self(id)
    }

    pub fn to_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl fmt::Debug for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainId({})", self.0)
    }
}

/// Ethereum Virtual Machine Chain which the client can reach through an RPC node.
///
/// The custody contract and the assets of the chain are **not** part of it,
/// they are always resolved through the clearnode configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chain {
    pub chain_id: ChainId,
    /// RPC url of the chain which will be used for Blockchain interactions.
    pub rpc: Url,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn chain_id_display_and_parse() {
        let chain_id: ChainId = "31337".parse().expect("Should parse ChainId");

        assert_eq!(ChainId::new(31337), chain_id);
        assert_eq!("31337", chain_id.to_string());
        assert_eq!("ChainId(31337)", format!("{chain_id:?}"));
    }

    #[test]
    #[should_panic(expected = "The Chain Id cannot be 0")]
    fn chain_id_zero_panics() {
        let _ = ChainId::new(0);
    }
}
