use std::{fmt, ops::AddAssign, str::FromStr};

use ethereum_types::U256;
use num::{bigint::ParseBigIntError, BigUint, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Unsigned integer of arbitrary size, used for amounts in the token's base units
/// (i.e. already multiplied by `10^decimals`).
///
/// (De)serializes as a decimal string, e.g. `"1000000000000000000"`.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct BigNum(
    #[serde(
        deserialize_with = "biguint_from_str",
        serialize_with = "biguint_to_str"
    )]
    BigUint,
);

impl BigNum {
    /// `value * 10^precision`
    pub fn with_precision(value: u64, precision: u8) -> Self {
        Self(BigUint::from(value) * BigUint::from(10_u8).pow(precision.into()))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns [`None`] if the value doesn't fit into 256 bits.
    pub fn to_u256(&self) -> Option<U256> {
        let bytes = self.0.to_bytes_be();

        (bytes.len() <= 32).then(|| U256::from_big_endian(&bytes))
    }

    pub fn from_u256(value: U256) -> Self {
        let mut bytes = [0_u8; 32];
        value.to_big_endian(&mut bytes);

        Self::from_big_endian(&bytes)
    }

    /// For the `U256` of other `ethereum-types` versions, e.g. the one of `web3`.
    pub fn from_big_endian(bytes: &[u8]) -> Self {
        Self(BigUint::from_bytes_be(bytes))
    }
}

impl fmt::Display for BigNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_str_radix(10))
    }
}

impl fmt::Debug for BigNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BigNum({})", self)
    }
}

impl AddAssign<&BigNum> for BigNum {
    fn add_assign(&mut self, rhs: &BigNum) {
        self.0 += &rhs.0
    }
}

impl FromStr for BigNum {
    type Err = ParseBigIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigUint::from_str(s).map(Self)
    }
}

impl From<u64> for BigNum {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<BigUint> for BigNum {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

fn biguint_from_str<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
where
    D: Deserializer<'de>,
{
    let num = String::deserialize(deserializer)?;
    BigUint::from_str(&num).map_err(serde::de::Error::custom)
}

fn biguint_to_str<S>(num: &BigUint, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&num.to_str_radix(10))
}
