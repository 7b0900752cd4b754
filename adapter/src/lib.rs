#![deny(rust_2018_idioms)]
#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use self::{
    client::{ChainGateway, ChainReader, Receipt, Unlockable},
    error::Error,
};

#[doc(inline)]
pub use self::ethereum::Ethereum;

pub mod client;
pub mod error;
pub mod ethereum;

/// Dummy chain client and custody contract for testing.
#[cfg(feature = "test-util")]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub mod dummy;

pub mod prelude {
    pub use crate::client::{ChainGateway, ChainReader, Receipt, Unlockable};
}
