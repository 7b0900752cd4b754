use primitives::TransactionHash;
use thiserror::Error;

use crate::error::Kind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Keystore: {0}")]
    Keystore(#[from] KeystoreError),
    #[error("Web3: {0}")]
    Web3(#[from] web3::Error),
    #[error("Contract initialization: {0}")]
    ContractInitialization(web3::ethabi::Error),
    #[error("Contract querying: {0}")]
    ContractQuerying(web3::contract::Error),
    #[error("Invalid chain id {0} reported by the RPC node")]
    InvalidChainId(String),
    #[error("Transaction {0} reverted")]
    Reverted(TransactionHash),
    #[error("Transaction {transaction_hash} was not mined after {attempts} attempts")]
    ReceiptTimeout {
        transaction_hash: TransactionHash,
        attempts: u32,
    },
}

impl From<Error> for crate::Error {
    fn from(error: Error) -> Self {
        let kind = match &error {
            Error::Keystore(_) => Kind::Keystore,
            Error::Web3(web3_error)
            | Error::ContractQuerying(web3::contract::Error::Api(web3_error)) => {
                if is_unreachable(web3_error) {
                    Kind::Unreachable
                } else if is_execution_reverted(web3_error) {
                    Kind::Reverted
                } else {
                    Kind::Transaction
                }
            }
            Error::ContractInitialization(_) | Error::ContractQuerying(_) => Kind::Contract,
            Error::Reverted(_) => Kind::Reverted,
            Error::InvalidChainId(_) | Error::ReceiptTimeout { .. } => Kind::Transaction,
        };

        crate::Error::new(kind, Some(error))
    }
}

fn is_unreachable(error: &web3::Error) -> bool {
    matches!(
        error,
        web3::Error::Unreachable | web3::Error::Transport(_) | web3::Error::Io(_)
    )
}

/// Nodes reject transactions which fail the gas estimation with an
/// `execution reverted` RPC error.
fn is_execution_reverted(error: &web3::Error) -> bool {
    match error {
        web3::Error::Rpc(rpc_error) => rpc_error.message.contains("revert"),
        _ => false,
    }
}

#[derive(Debug, Error)]
pub enum KeystoreError {
    /// `address` key is missing from the keystore file
    #[error("\"address\" key missing in keystore file")]
    AddressMissing,
    /// The `address` key in the keystore file is not a valid `Address`
    #[error("\"address\" length should be 20 bytes")]
    AddressLength,
    /// reading the keystore file failed
    #[error("Reading keystore file: {0}")]
    ReadingFile(#[source] std::io::Error),
    /// Deserializing the keystore file failed
    #[error("Deserializing keystore file: {0}")]
    Deserialization(#[source] serde_json::Error),
    /// Decrypting the keystore with the password failed
    #[error("Decrypting the keystore: {0}")]
    Decrypt(String),
}
