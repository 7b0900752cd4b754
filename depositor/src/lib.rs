#![deny(rust_2018_idioms)]
#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use self::{
    clearnode::{ChannelAuthorizer, ChannelStateStore, Clearnode, ConfigResolver},
    clearnode_interface::ClearnodeApi,
    convergence::ConvergenceOptions,
    coordinator::DepositCoordinator,
    error::{DepositError, LastSeen},
};

pub mod clearnode;
pub mod clearnode_interface;
pub mod convergence;
pub mod coordinator;
pub mod error;
pub mod verification;

/// In-memory clearnode and indexer for testing with the [`adapter::dummy::Dummy`] chain.
#[cfg(any(test, feature = "test-util"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub mod dummy;
