#![deny(rust_2018_idioms)]
#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use self::{
    address::Address,
    amount::Amount,
    asset::{AssetDescriptor, TokenInfo},
    big_num::BigNum,
    chain::{Chain, ChainId},
    channel::{Channel, ChannelId, ChannelStatus, HomeChannel, Nonce},
    config::Config,
    deposit::{DepositIntent, DepositMode, DepositResult},
    transaction::TransactionHash,
    util::ApiUrl,
};

pub mod address;
pub mod amount;
pub mod asset;
pub mod big_num;
pub mod chain;
pub mod channel;
pub mod clearnode;
pub mod config;
pub mod custody;
pub mod deposit;
pub mod eth_checksum;
pub mod transaction;

pub mod util {
    pub use api::ApiUrl;

    pub mod api;

    pub mod logging;

    pub mod serde;
}

#[cfg(feature = "test-util")]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub mod test_util;

/// Checksums the result of [`ToHex::to_hex`].
pub trait ToETHChecksum: AsRef<[u8]> {
    /// Preffixes the hex with `0x` and checksums the address
    fn to_checksum(&self) -> String {
        eth_checksum::checksum(self.as_ref())
    }
}

pub trait ToHex {
    // Hex encoded `String`, **without** __Checksum__ming the string
    fn to_hex(&self) -> String;

    // Hex encoded `0x` prefixed `String`, **without** __Checksum__ming the string
    fn to_hex_prefixed(&self) -> String;
}

impl<T: AsRef<[u8]>> ToHex for T {
    fn to_hex(&self) -> String {
        hex::encode(self.as_ref())
    }

    fn to_hex_prefixed(&self) -> String {
        format!("0x{}", self.as_ref().to_hex())
    }
}
