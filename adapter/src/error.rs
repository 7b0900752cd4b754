use parse_display::Display;
use std::{error::Error as StdError, fmt};
use thiserror::Error;

pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;

/// The error of every [`ChainGateway`](crate::ChainGateway) call.
///
/// Use the `is_*` methods to inspect the [`Kind`] of failure,
/// e.g. to tell an unreachable node apart from a reverted transaction.
#[derive(Debug, Error)]
#[error("{inner}")]
pub struct Error {
    inner: Box<Inner>,
}

impl Error {
    pub(crate) fn new<E>(kind: Kind, source: Option<E>) -> Self
    where
        E: Into<BoxError>,
    {
        Self {
            inner: Box::new(Inner {
                kind,
                source: source.map(Into::into),
            }),
        }
    }

    /// The RPC node could not be reached
    pub fn unreachable<E>(source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::new(Kind::Unreachable, Some(source))
    }

    /// The transaction was mined but reverted by the contract
    pub fn reverted<E>(source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::new(Kind::Reverted, Some(source))
    }

    /// Signing, broadcasting or confirming a transaction failed
    pub fn transaction<E>(source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::new(Kind::Transaction, Some(source))
    }

    pub fn keystore<E>(source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::new(Kind::Keystore, Some(source))
    }

    /// Initializing or querying a contract failed
    pub fn contract<E>(source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::new(Kind::Contract, Some(source))
    }

    pub fn kind(&self) -> Kind {
        self.inner.kind
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self.inner.kind, Kind::Unreachable)
    }

    pub fn is_reverted(&self) -> bool {
        matches!(self.inner.kind, Kind::Reverted)
    }
}

#[derive(Debug, Error)]
struct Inner {
    kind: Kind,
    source: Option<BoxError>,
}

impl fmt::Display for Inner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            // Writes: "Kind: Error message here"
            Some(source) => write!(f, "{}: {}", self.kind, source),
            // Writes: "Kind"
            None => write!(f, "{}", self.kind),
        }
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    #[display("Node unreachable")]
    Unreachable,
    #[display("Transaction reverted")]
    Reverted,
    Transaction,
    Keystore,
    Contract,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn displays_kind_and_source() {
        let error = Error::reverted("channel already exists");

        assert!(error.is_reverted());
        assert!(!error.is_unreachable());
        assert_eq!(Kind::Reverted, error.kind());
        assert_eq!(
            "Transaction reverted: channel already exists",
            error.to_string()
        );

        assert_eq!(
            "Contract: no code",
            Error::contract("no code").to_string()
        );
    }
}
