//! Human readable decimal amounts, e.g. `"1"`, `"0.25"` or `"-3.5"`.
//!
//! Deposits are requested in the asset's human readable units and converted
//! to the token's base units ([`BigNum`]) only once the token decimals are known.
use std::{fmt, str::FromStr};

use num::{BigInt, BigUint, Signed, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::BigNum;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Amount cannot be empty")]
    Empty,
    #[error("Invalid decimal amount `{0}`")]
    Invalid(String),
    #[error("Amount {amount} has more fractional digits than the token precision of {decimals}")]
    PrecisionOverflow { amount: Amount, decimals: u8 },
    #[error("Amount {0} is negative and cannot be converted to token units")]
    Negative(Amount),
}

/// Arbitrary-precision signed decimal: `mantissa * 10^-scale`
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Amount {
    mantissa: BigInt,
    scale: u32,
}

impl Amount {
    pub fn is_positive(&self) -> bool {
        self.mantissa.is_positive()
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    /// The number of meaningful fractional digits, trailing zeros excluded.
    pub fn fractional_digits(&self) -> u32 {
        let mut mantissa = self.mantissa.clone();
        let mut scale = self.scale;
        let ten = BigInt::from(10_u8);

        while scale > 0 && (&mantissa % &ten).is_zero() {
            mantissa /= &ten;
            scale -= 1;
        }

        scale
    }

    /// Converts the amount into the token base units for the given `decimals`.
    ///
    /// Fails for negative amounts and for amounts which cannot be represented
    /// with the token precision without rounding.
    pub fn to_token_units(&self, decimals: u8) -> Result<BigNum, Error> {
        if self.mantissa.is_negative() {
            return Err(Error::Negative(self.clone()));
        }

        let fractional_digits = self.fractional_digits();
        if fractional_digits > u32::from(decimals) {
            return Err(Error::PrecisionOverflow {
                amount: self.clone(),
                decimals,
            });
        }

        let magnitude: BigUint = self.mantissa.magnitude().clone();
        let units = if u32::from(decimals) >= self.scale {
            magnitude * BigUint::from(10_u8).pow(u32::from(decimals) - self.scale)
        } else {
            // only trailing zeros are dropped here, checked above
            magnitude / BigUint::from(10_u8).pow(self.scale - u32::from(decimals))
        };

        Ok(BigNum::from(units))
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self {
            mantissa: BigInt::from(value),
            scale: 0,
        }
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::Empty);
        }

        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));

        let is_digits = |part: &str| part.bytes().all(|byte| byte.is_ascii_digit());
        if (integer.is_empty() && fraction.is_empty()) || !is_digits(integer) || !is_digits(fraction)
        {
            return Err(Error::Invalid(s.to_string()));
        }

        let digits = format!("{integer}{fraction}");
        let magnitude = BigInt::from_str(&digits).map_err(|_| Error::Invalid(s.to_string()))?;
        let scale = u32::try_from(fraction.len()).map_err(|_| Error::Invalid(s.to_string()))?;

        Ok(Self {
            mantissa: if negative { -magnitude } else { magnitude },
            scale,
        })
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.magnitude().to_str_radix(10);
        let sign = if self.mantissa.is_negative() { "-" } else { "" };
        let scale = self.scale as usize;

        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }

        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (integer, fraction) = padded.split_at(padded.len() - scale);
        let fraction = fraction.trim_end_matches('0');

        if fraction.is_empty() {
            write!(f, "{sign}{integer}")
        } else {
            write!(f, "{sign}{integer}.{fraction}")
        }
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let string = String::deserialize(deserializer)?;

        string.parse().map_err(serde::de::Error::custom)
    }
}
