//! Fixtures of a local `anvil` chain with a deployed custody contract
//! and an `MST` test token.
use chrono::{TimeZone, Utc};
use once_cell::sync::Lazy;
use slog::{o, Discard, Drain, Logger};
use url::Url;

use crate::{
    Address, AssetDescriptor, BigNum, Chain, ChainId, ChannelId, ChannelStatus, HomeChannel,
    TokenInfo,
};

/// Anvil account #0, the clearnode signer
pub static CLEARNODE: Lazy<Address> = Lazy::new(|| *ADDRESS_0);
/// Anvil account #1
pub static OWNER: Lazy<Address> = Lazy::new(|| *ADDRESS_1);
/// Anvil account #2
pub static OWNER_2: Lazy<Address> = Lazy::new(|| *ADDRESS_2);

pub static ADDRESS_0: Lazy<Address> = Lazy::new(|| {
    "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        .parse()
        .expect("Valid Address")
});

pub static ADDRESS_1: Lazy<Address> = Lazy::new(|| {
    "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
        .parse()
        .expect("Valid Address")
});

pub static ADDRESS_2: Lazy<Address> = Lazy::new(|| {
    "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC"
        .parse()
        .expect("Valid Address")
});

/// The first contract deployed by [`CLEARNODE`] on a fresh anvil node
pub static MST_TOKEN_ADDRESS: Lazy<Address> = Lazy::new(|| {
    "0x5FbDB2315678afecb367f032d93F642f64180aa3"
        .parse()
        .expect("Valid Address")
});

/// The second contract deployed by [`CLEARNODE`] on a fresh anvil node
pub static CUSTODY_ADDRESS: Lazy<Address> = Lazy::new(|| {
    "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"
        .parse()
        .expect("Valid Address")
});

pub const ANVIL_CHAIN_ID: u64 = 31337;

pub static ANVIL_CHAIN: Lazy<Chain> = Lazy::new(|| Chain {
    chain_id: ChainId::new(ANVIL_CHAIN_ID),
    rpc: Url::parse("http://localhost:8545").expect("Valid Url"),
});

pub static MST_TOKEN: Lazy<TokenInfo> = Lazy::new(|| TokenInfo {
    chain_id: ChainId::new(ANVIL_CHAIN_ID),
    address: *MST_TOKEN_ADDRESS,
    decimals: 18,
});

/// `MST` is only configured on the anvil chain.
pub static MST: Lazy<AssetDescriptor> = Lazy::new(|| AssetDescriptor {
    symbol: "MST".into(),
    tokens: vec![*MST_TOKEN],
});

/// An open home channel of [`OWNER`] for [`MST`] with `version` and `amount`.
pub fn home_channel(channel_id: ChannelId, version: u64, amount: BigNum) -> HomeChannel {
    HomeChannel {
        channel_id,
        owner: *OWNER,
        asset: MST.symbol.clone(),
        chain_id: ChainId::new(ANVIL_CHAIN_ID),
        status: ChannelStatus::Open,
        version,
        amount,
        updated_at: Utc.ymd(2026, 1, 1).and_hms(12, 0, 0),
    }
}

pub fn discard_logger() -> Logger {
    let drain = Discard.fuse();

    Logger::root(drain, o!())
}
