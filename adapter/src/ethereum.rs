//! Ethereum chain client: reads the custody contract and sends the
//! deposit transactions signed with a keystore wallet.
use std::fmt;

use ethsign::{KeyFile, Protected, SecretKey};
use once_cell::sync::Lazy;
use primitives::Address;

#[doc(inline)]
pub use self::client::{Ethereum, Options};

pub mod client;
pub mod error;

/// The ABI of the custody contract, only the functions used by the client.
pub static CUSTODY_ABI: Lazy<&'static [u8]> =
    Lazy::new(|| include_bytes!("../resources/abi/Custody.json"));

/// The wallet state of an [`Ethereum`] client which can only read from the chain.
#[derive(Debug, Clone)]
pub enum LockedWallet {
    KeyStore {
        keystore: KeyFile,
        password: Protected,
    },
}

/// The wallet state of an [`Ethereum`] client which can send transactions.
#[derive(Clone)]
pub struct UnlockedWallet {
    pub(crate) wallet: SecretKey,
}

impl fmt::Debug for UnlockedWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnlockedWallet")
            .field("address", &Address::from(*self.wallet.public().address()))
            .finish_non_exhaustive()
    }
}

pub trait WalletState: Send + Sync {}

impl WalletState for LockedWallet {}
impl WalletState for UnlockedWallet {}
