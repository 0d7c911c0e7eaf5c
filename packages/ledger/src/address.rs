use std::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const LEN: usize = 20;
const PREFIX: &str = "0x";

/// An account or contract address on the ledger.
///
/// The all-zero address is the ledger's "unset" sentinel, e.g. the lender of a loan
/// nobody has funded yet or the borrower of an identifier that was never populated.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; LEN]);

impl Address {
    pub const ZERO: Self = Self([0; LEN]);

    pub const fn new(bytes: [u8; LEN]) -> Self {
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self == &Self::ZERO
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[Ledger] Invalid address '{input}', cause '{cause}'")]
pub struct ParseError {
    input: String,
    cause: String,
}

impl ParseError {
    fn new<C>(input: &str, cause: C) -> Self
    where
        C: ToString,
    {
        Self {
            input: input.into(),
            cause: cause.to_string(),
        }
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let hex = input
            .strip_prefix(PREFIX)
            .or_else(|| input.strip_prefix("0X"))
            .ok_or_else(|| ParseError::new(input, "missing '0x' prefix"))?;

        HEXLOWER_PERMISSIVE
            .decode(hex.as_bytes())
            .map_err(|err| ParseError::new(input, err))
            .and_then(|bytes| {
                <[u8; LEN]>::try_from(bytes)
                    .map_err(|bytes| ParseError::new(input, format!("{} bytes long", bytes.len())))
            })
            .map(Self)
    }
}

impl TryFrom<String> for Address {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{PREFIX}{}", HEXLOWER.encode(&self.0))
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(self, f)
    }
}
