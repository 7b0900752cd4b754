//! Request & response bodies of the clearnode REST API.
use serde::{Deserialize, Serialize};

use crate::{
    custody::ChannelAuthorization, Address, AssetDescriptor, BigNum, ChainId, DepositMode,
    HomeChannel,
};

/// `GET /config/:chain_id/custody`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CustodyResponse {
    pub chain_id: ChainId,
    pub custody: Address,
}

/// `GET /config/:chain_id/assets`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssetsResponse {
    pub assets: Vec<AssetDescriptor>,
}

/// `GET /channels/home/:owner/:asset`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HomeChannelResponse {
    pub channel: HomeChannel,
}

/// `POST /channels/authorize`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRequest {
    pub owner: Address,
    pub chain_id: ChainId,
    pub asset: String,
    /// In token base units
    pub amount: BigNum,
    pub mode: DepositMode,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationResponse {
    pub authorization: ChannelAuthorization,
}

/// The body of every non-successful clearnode response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn authorization_request_is_camel_case() {
        let request = AuthorizationRequest {
            owner: "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse().unwrap(),
            chain_id: ChainId::new(31337),
            asset: "MST".into(),
            amount: BigNum::with_precision(1, 18),
            mode: DepositMode::Create,
        };

        let expected = json!({
            "owner": "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
            "chainId": 31337,
            "asset": "MST",
            "amount": "1000000000000000000",
            "mode": "create",
        });

        assert_eq!(expected, serde_json::to_value(&request).unwrap());
    }

    #[test]
    fn deserializes_authorization_response() {
        let json = json!({
            "authorization": {
                "channelId": "0x0101010101010101010101010101010101010101010101010101010101010101",
                "mode": "checkpoint",
                "to": "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512",
                "data": "0xdeadbeef",
                "stateVersion": 2
            }
        });

        let response: AuthorizationResponse =
            serde_json::from_value(json).expect("Should deserialize");

        assert_eq!(DepositMode::Checkpoint, response.authorization.mode);
        assert_eq!(vec![0xde, 0xad, 0xbe, 0xef], response.authorization.data);
        assert_eq!(2, response.authorization.state_version);
    }
}
