use serde::{Deserialize, Serialize};

use crate::{Address, ChainId};

/// An asset configured in the clearnode, e.g. `USDC`, with its backing
/// token on every chain it is supported on.
///
/// The symbol is unique per clearnode and compared case-insensitively.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssetDescriptor {
    pub symbol: String,
    #[serde(default)]
    pub tokens: Vec<TokenInfo>,
}

impl AssetDescriptor {
    /// Case-insensitive comparison of the asset symbol
    pub fn is(&self, symbol: &str) -> bool {
        self.symbol.eq_ignore_ascii_case(symbol)
    }

    /// The backing token of the asset on the given chain
    pub fn token_for(&self, chain_id: ChainId) -> Option<&TokenInfo> {
        self.tokens.iter().find(|token| token.chain_id == chain_id)
    }
}

/// Configured Token in a specific chain.
/// Decimals can differ for the same asset from one chain to another.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub chain_id: ChainId,
    pub address: Address,
    pub decimals: u8,
}

/// Finds the asset by symbol, ignoring the case.
pub fn find_asset<'a>(assets: &'a [AssetDescriptor], symbol: &str) -> Option<&'a AssetDescriptor> {
    assets.iter().find(|asset| asset.is(symbol))
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_asset_case_insensitive_and_token_per_chain() {
        let assets: Vec<AssetDescriptor> = serde_json::from_value(json!([
            {
                "symbol": "MST",
                "tokens": [
                    { "chainId": 31337, "address": "0x5FbDB2315678afecb367f032d93F642f64180aa3", "decimals": 18 },
                    { "chainId": 1, "address": "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512", "decimals": 6 }
                ]
            },
            { "symbol": "usdc", "tokens": [] }
        ]))
        .expect("Should deserialize assets");

        let mst = find_asset(&assets, "mst").expect("Should find MST ignoring the case");
        assert_eq!(18, mst.token_for(ChainId::new(31337)).unwrap().decimals);
        assert_eq!(6, mst.token_for(ChainId::new(1)).unwrap().decimals);
        assert!(mst.token_for(ChainId::new(137)).is_none());

        let usdc = find_asset(&assets, "USDC").expect("Should find usdc");
        assert!(usdc.token_for(ChainId::new(31337)).is_none());

        assert!(find_asset(&assets, "DAI").is_none());
    }
}
