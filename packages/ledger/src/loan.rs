use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    num::NonZeroU64,
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use finance::{coin::Coin, currency::Native};

use crate::{
    address::Address,
    error::{Error, Result},
    operation::Operation,
    uint_serde,
};

pub type Funds = Coin<Native>;

/// Interest rate as the ledger records it, an opaque unsigned integer.
///
/// The ledger stores it as a `uint256`. Rates past `u64::MAX` are not
/// representable, and a record carrying one fails to decode.
pub type InterestRate = u64;

/// Seconds since the Unix epoch.
pub type Timestamp = u64;

/// A loan identifier. The ledger assigns them in increasing order starting at 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct LoanId(NonZeroU64);

impl LoanId {
    pub const FIRST: Self = Self(NonZeroU64::MIN);

    pub const fn get(&self) -> u64 {
        self.0.get()
    }

    /// The identifier preceding this one, if any.
    pub fn prev(&self) -> Option<Self> {
        NonZeroU64::new(self.get() - 1).map(Self)
    }
}

impl TryFrom<u64> for LoanId {
    type Error = &'static str;

    fn try_from(id: u64) -> core::result::Result<Self, Self::Error> {
        NonZeroU64::new(id)
            .map(Self)
            .ok_or("loan identifiers start at 1")
    }
}

impl From<LoanId> for u64 {
    fn from(id: LoanId) -> Self {
        id.get()
    }
}

impl FromStr for LoanId {
    type Err = &'static str;

    fn from_str(input: &str) -> core::result::Result<Self, Self::Err> {
        Some(input)
            .filter(|input| !input.is_empty() && input.bytes().all(|byte| byte.is_ascii_digit()))
            .and_then(|input| input.parse::<u64>().ok())
            .ok_or("not an unsigned integer")
            .and_then(Self::try_from)
    }
}

impl Display for LoanId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.0, f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Pending,
    Active,
    Repaid,
    Defaulted,
}

impl TryFrom<u64> for LoanStatus {
    type Error = u64;

    fn try_from(ordinal: u64) -> core::result::Result<Self, Self::Error> {
        match ordinal {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Active),
            2 => Ok(Self::Repaid),
            3 => Ok(Self::Defaulted),
            unknown => Err(unknown),
        }
    }
}

impl Display for LoanStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::Pending => "Pending",
            Self::Active => "Active",
            Self::Repaid => "Repaid",
            Self::Defaulted => "Defaulted",
        })
    }
}

/// A read-only projection of a loan as the ledger holds it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanRecord {
    pub id: LoanId,
    pub borrower: Address,
    pub lender: Address,
    pub principal: Funds,
    pub collateral: Funds,
    pub interest_rate: InterestRate,
    pub total_repayment: Funds,
    pub term_end: Timestamp,
    pub status: LoanStatus,
}

impl LoanRecord {
    pub fn is_funded(&self) -> bool {
        !self.lender.is_zero()
    }

    /// The end of the loan term, unset until the loan gets funded.
    pub fn due_at(&self) -> Option<Timestamp> {
        (self.term_end != 0).then_some(self.term_end)
    }
}

/// The record the ledger returns for `loans(id)`.
///
/// Unallocated identifiers yield a default-initialized record with a zero borrower.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawLoan {
    #[serde(deserialize_with = "uint_serde::deserialize")]
    id: u64,
    borrower: Address,
    lender: Address,
    principal: Funds,
    collateral_amount: Funds,
    /// Out-of-range rates reject the whole record as an invalid response.
    #[serde(deserialize_with = "uint_serde::deserialize")]
    interest_rate: InterestRate,
    total_repayment: Funds,
    #[serde(deserialize_with = "uint_serde::deserialize")]
    term_end: u64,
    #[serde(deserialize_with = "uint_serde::deserialize")]
    status: u64,
}

impl RawLoan {
    /// Validate the raw record, `None` if the slot has never been populated.
    pub(crate) fn into_record(self, requested: LoanId) -> Result<Option<LoanRecord>> {
        if self.borrower.is_zero() {
            return Ok(None);
        }

        let invalid = |cause: String| Error::InvalidResponse {
            operation: Operation::ReadLoan,
            loan: Some(requested),
            cause,
        };

        if self.id != requested.get() {
            return Err(invalid(format!("got the record of loan #{}", self.id)));
        }

        LoanStatus::try_from(self.status)
            .map_err(|ordinal| invalid(format!("unknown status ordinal {ordinal}")))
            .map(|status| {
                Some(LoanRecord {
                    id: requested,
                    borrower: self.borrower,
                    lender: self.lender,
                    principal: self.principal,
                    collateral: self.collateral_amount,
                    interest_rate: self.interest_rate,
                    total_repayment: self.total_repayment,
                    term_end: self.term_end,
                    status,
                })
            })
    }
}

/// A loan request that passed the client-side checks.
///
/// The collateral must strictly exceed a non-zero principal. The ledger may enforce
/// its own rules on top.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoanRequest {
    principal: Funds,
    collateral: Funds,
    interest_rate: InterestRate,
}

impl LoanRequest {
    pub fn new(principal: Funds, collateral: Funds, interest_rate: InterestRate) -> Result<Self> {
        let invalid = |cause: String| Error::ValidationFailed {
            operation: Operation::RequestLoan,
            cause,
        };

        if principal.is_zero() {
            Err(invalid("the principal must be positive".into()))
        } else if collateral <= principal {
            Err(invalid(format!(
                "the collateral {} must exceed the principal {}",
                collateral, principal
            )))
        } else {
            Ok(Self {
                principal,
                collateral,
                interest_rate,
            })
        }
    }

    pub const fn principal(&self) -> Funds {
        self.principal
    }

    pub const fn collateral(&self) -> Funds {
        self.collateral
    }

    pub const fn interest_rate(&self) -> InterestRate {
        self.interest_rate
    }
}
