use std::fmt::{Display, Formatter, Result as FmtResult};

/// The client operations reported in errors, messages and logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Connect,
    Refresh,
    ReadCounter,
    ReadLoan,
    RequestLoan,
    FundLoan,
    RepayLoan,
    ClaimCollateral,
}

impl Operation {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Refresh => "refresh",
            Self::ReadCounter => "read-counter",
            Self::ReadLoan => "read-loan",
            Self::RequestLoan => "request-loan",
            Self::FundLoan => "fund-loan",
            Self::RepayLoan => "repay-loan",
            Self::ClaimCollateral => "claim-collateral",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}
