//! The loan contract interface. Method names match the deployed contract's ABI.
use serde::{Serialize, Serializer};

use crate::loan::{Funds, InterestRate, LoanId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryMsg {
    NextLoanId(),
    Loans(LoanId),
}

impl QueryMsg {
    pub const fn method(&self) -> &'static str {
        match self {
            Self::NextLoanId() => "nextLoanId",
            Self::Loans(_) => "loans",
        }
    }

    pub fn args(&self) -> Vec<String> {
        match self {
            Self::NextLoanId() => vec![],
            Self::Loans(loan) => vec![loan.to_string()],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecuteMsg {
    /// Payable, the collateral is attached as the transaction value.
    RequestLoan {
        principal: Funds,
        interest_rate: InterestRate,
    },
    /// Payable, the principal is attached.
    FundLoan(LoanId),
    /// Payable, the total repayment is attached.
    RepayLoan(LoanId),
    ClaimCollateral(LoanId),
}

impl ExecuteMsg {
    pub const fn method(&self) -> &'static str {
        match self {
            Self::RequestLoan { .. } => "requestLoan",
            Self::FundLoan(_) => "fundLoan",
            Self::RepayLoan(_) => "repayLoan",
            Self::ClaimCollateral(_) => "claimCollateral",
        }
    }

    pub fn args(&self) -> Vec<String> {
        match self {
            Self::RequestLoan {
                principal,
                interest_rate,
            } => vec![principal.amount().to_string(), interest_rate.to_string()],
            Self::FundLoan(loan) | Self::RepayLoan(loan) | Self::ClaimCollateral(loan) => {
                vec![loan.to_string()]
            }
        }
    }
}

#[derive(Serialize)]
struct Encoded {
    method: &'static str,
    args: Vec<String>,
}

impl Serialize for QueryMsg {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Encoded {
            method: self.method(),
            args: self.args(),
        }
        .serialize(serializer)
    }
}

impl Serialize for ExecuteMsg {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Encoded {
            method: self.method(),
            args: self.args(),
        }
        .serialize(serializer)
    }
}
