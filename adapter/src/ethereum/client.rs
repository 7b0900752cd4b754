use std::{collections::HashSet, fs, time::Duration};

use async_trait::async_trait;
use ethsign::{KeyFile, SecretKey};
use primitives::{Address, BigNum, Chain, ChainId, ChannelId, TransactionHash};
use web3::{
    contract::{Contract, Options as ContractOptions},
    ethabi::Token,
    signing::{Key, Signature, SigningError},
    transports::Http,
    types::{Bytes, CallRequest, TransactionParameters, H160, H256, U64},
    Web3,
};

use super::{
    error::{Error, KeystoreError},
    LockedWallet, UnlockedWallet, WalletState, CUSTODY_ABI,
};
use crate::{ChainGateway, ChainReader, Receipt, Unlockable};

/// How often the RPC node is asked for the receipt of a submitted transaction
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// After this many polls without a receipt, the transaction is considered lost
const RECEIPT_MAX_ATTEMPTS: u32 = 180;

#[derive(Debug, Clone)]
pub struct Options {
    pub keystore_file: String,
    pub keystore_pwd: String,
}

/// Ethereum client implementation of the [`ChainGateway`].
///
/// It's initialized with a [`LockedWallet`] which only allows reading from the chain,
/// [`Unlockable::unlock`] it to send transactions.
#[derive(Debug, Clone)]
pub struct Ethereum<S = LockedWallet> {
    address: Address,
    chain: Chain,
    web3: Web3<Http>,
    pub(crate) state: S,
}

pub(crate) trait ChainTransport {
    fn init_web3(&self) -> web3::Result<Web3<Http>>;
}

impl ChainTransport for Chain {
    fn init_web3(&self) -> web3::Result<Web3<Http>> {
        let transport = Http::new(self.rpc.as_str())?;

        Ok(Web3::new(transport))
    }
}

impl Ethereum<LockedWallet> {
    pub fn init(opts: Options, chain: &Chain) -> Result<Self, Error> {
        let keystore_contents =
            fs::read_to_string(&opts.keystore_file).map_err(KeystoreError::ReadingFile)?;
        let keystore_json: KeyFile =
            serde_json::from_str(&keystore_contents).map_err(KeystoreError::Deserialization)?;

        let address_bytes = keystore_json
            .address
            .clone()
            .ok_or(KeystoreError::AddressMissing)?;

        let address = Address::from_slice(&address_bytes.0).ok_or(KeystoreError::AddressLength)?;

        Ok(Self {
            address,
            chain: chain.clone(),
            web3: chain.init_web3()?,
            state: LockedWallet::KeyStore {
                keystore: keystore_json,
                password: opts.keystore_pwd.into(),
            },
        })
    }
}

impl<S> Ethereum<S> {
    pub fn chain(&self) -> &Chain {
        &self.chain
    }
}

impl Unlockable for Ethereum<LockedWallet> {
    type Unlocked = Ethereum<UnlockedWallet>;

    fn unlock(&self) -> Result<Ethereum<UnlockedWallet>, crate::Error> {
        let unlocked_wallet = match &self.state {
            LockedWallet::KeyStore { keystore, password } => {
                let wallet = keystore
                    .to_secret_key(password)
                    .map_err(|err| KeystoreError::Decrypt(err.to_string()))
                    .map_err(Error::from)?;

                UnlockedWallet { wallet }
            }
        };

        Ok(Ethereum {
            address: self.address,
            chain: self.chain.clone(),
            web3: self.web3.clone(),
            state: unlocked_wallet,
        })
    }
}

#[async_trait]
impl<S: WalletState> ChainReader for Ethereum<S> {
    fn whoami(&self) -> Address {
        self.address
    }

    async fn chain_id(&self) -> Result<ChainId, crate::Error> {
        let chain_id = self.web3.eth().chain_id().await.map_err(Error::Web3)?;

        if chain_id.is_zero() || chain_id.bits() > 64 {
            return Err(Error::InvalidChainId(chain_id.to_string()).into());
        }

        Ok(ChainId::new(chain_id.low_u64()))
    }

    async fn balance(&self, address: Address) -> Result<BigNum, crate::Error> {
        let balance = self
            .web3
            .eth()
            .balance(H160(address.to_bytes()), None)
            .await
            .map_err(Error::Web3)?;

        // `web3` is on another `ethereum-types` version than `primitives`
        let mut bytes = [0_u8; 32];
        balance.to_big_endian(&mut bytes);

        Ok(BigNum::from_big_endian(&bytes))
    }

    async fn open_channels(
        &self,
        custody: Address,
        owner: Address,
    ) -> Result<HashSet<ChannelId>, crate::Error> {
        let custody_contract =
            Contract::from_json(self.web3.eth(), H160(custody.to_bytes()), &CUSTODY_ABI)
                .map_err(Error::ContractInitialization)?;

        let channel_ids: Vec<H256> = custody_contract
            .query(
                "getOpenChannels",
                (Token::Address(H160(owner.to_bytes())),),
                None,
                ContractOptions::default(),
                None,
            )
            .await
            .map_err(Error::ContractQuerying)?;

        Ok(channel_ids
            .into_iter()
            .map(|channel_id| ChannelId::from(channel_id.to_fixed_bytes()))
            .collect())
    }

    async fn wait_for_receipt(
        &self,
        transaction_hash: TransactionHash,
    ) -> Result<Receipt, crate::Error> {
        let hash = H256(*transaction_hash.as_bytes());

        for _ in 0..RECEIPT_MAX_ATTEMPTS {
            let receipt = self
                .web3
                .eth()
                .transaction_receipt(hash)
                .await
                .map_err(Error::Web3)?;

            // a receipt without a block number is still pending
            match receipt {
                Some(receipt) if receipt.block_number.is_some() => {
                    if receipt.status == Some(U64::from(0)) {
                        return Err(Error::Reverted(transaction_hash).into());
                    }

                    return Ok(Receipt {
                        transaction_hash,
                        block_number: receipt.block_number.unwrap_or_default().as_u64(),
                    });
                }
                _ => tokio::time::sleep(RECEIPT_POLL_INTERVAL).await,
            }
        }

        Err(Error::ReceiptTimeout {
            transaction_hash,
            attempts: RECEIPT_MAX_ATTEMPTS,
        }
        .into())
    }
}

#[async_trait]
impl ChainGateway for Ethereum<UnlockedWallet> {
    async fn submit_transaction(
        &self,
        to: Address,
        data: Vec<u8>,
    ) -> Result<TransactionHash, crate::Error> {
        let call = CallRequest {
            from: Some(H160(self.address.to_bytes())),
            to: Some(H160(to.to_bytes())),
            data: Some(Bytes(data.clone())),
            ..Default::default()
        };
        // a call which would revert fails here, before anything is broadcasted
        let gas = self
            .web3
            .eth()
            .estimate_gas(call, None)
            .await
            .map_err(Error::Web3)?;

        let transaction = TransactionParameters {
            to: Some(H160(to.to_bytes())),
            data: Bytes(data),
            gas,
            chain_id: Some(self.chain.chain_id.to_u64()),
            ..Default::default()
        };

        // fills in the nonce & gas price from the node
        let signed = self
            .web3
            .accounts()
            .sign_transaction(transaction, KeystoreSigner(&self.state.wallet))
            .await
            .map_err(Error::Web3)?;

        let hash = self
            .web3
            .eth()
            .send_raw_transaction(signed.raw_transaction)
            .await
            .map_err(Error::Web3)?;

        Ok(TransactionHash::from(hash.to_fixed_bytes()))
    }
}

/// Signs the transactions of `web3` with the secret key of the keystore.
struct KeystoreSigner<'a>(&'a SecretKey);

impl Key for KeystoreSigner<'_> {
    /// Legacy transactions, `v` is [EIP-155](https://eips.ethereum.org/EIPS/eip-155) replay protected.
    fn sign(&self, message: &[u8], chain_id: Option<u64>) -> Result<Signature, SigningError> {
        let Signature { v, r, s } = self.sign_message(message)?;

        let v = match chain_id {
            Some(chain_id) => v + 35 + chain_id * 2,
            None => v + 27,
        };

        Ok(Signature { v, r, s })
    }

    /// Typed transactions, `v` is the recovery id.
    fn sign_message(&self, message: &[u8]) -> Result<Signature, SigningError> {
        let signature = self
            .0
            .sign(message)
            .map_err(|_| SigningError::InvalidMessage)?;

        Ok(Signature {
            v: signature.v.into(),
            r: H256(signature.r),
            s: H256(signature.s),
        })
    }

    fn address(&self) -> H160 {
        H160(*self.0.public().address())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use primitives::test_util::ANVIL_CHAIN;

    #[test]
    fn init_fails_for_missing_keystore() {
        let options = Options {
            keystore_file: "./does-not-exist.json".into(),
            keystore_pwd: "password".into(),
        };

        let error = Ethereum::init(options, &ANVIL_CHAIN).expect_err("Should fail");
        assert!(matches!(error, Error::Keystore(KeystoreError::ReadingFile(_))));

        let error: crate::Error = error.into();
        assert_eq!(crate::error::Kind::Keystore, error.kind());
    }

    #[test]
    fn keystore_signer_signs_recoverable_transactions() {
        let secret = SecretKey::from_raw(&[0x11; 32]).expect("Should be a valid secret key");
        let signer = KeystoreSigner(&secret);
        let message = web3::signing::keccak256(b"deposit");

        let signature = signer
            .sign(&message, Some(31337))
            .expect("Should sign the hash");
        let recovery_id = signature.v - 35 - 31337 * 2;
        assert!(recovery_id <= 1, "EIP-155 v, got {}", signature.v);

        let rs = [signature.r.as_bytes(), signature.s.as_bytes()].concat();
        let recovered = web3::signing::recover(&message, &rs, recovery_id as i32)
            .expect("Should recover the signer");
        assert_eq!(signer.address(), recovered);

        let legacy = signer.sign(&message, None).expect("Should sign the hash");
        assert_eq!(recovery_id + 27, legacy.v);

        assert!(signer.sign_message(b"not a hash").is_err());
    }

    #[test]
    fn custody_abi_has_the_client_functions() {
        let abi = web3::ethabi::Contract::load(*CUSTODY_ABI).expect("Should load the ABI");

        for function in ["create", "checkpoint", "getOpenChannels"] {
            assert!(abi.function(function).is_ok(), "missing {function}");
        }
    }
}
