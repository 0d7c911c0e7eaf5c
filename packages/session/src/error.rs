use thiserror::Error;

use ledger::{
    error::{Error as LedgerError, ErrorKind},
    loan::LoanId,
    operation::Operation,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("[Session] {0}")]
    Ledger(#[from] LedgerError),

    #[error("[Session] '{operation}' is not permitted while {state}")]
    NotPermitted {
        operation: Operation,
        state: &'static str,
    },

    #[error("[Session] '{operation}' was superseded by a newer session change")]
    Superseded { operation: Operation },
}

impl Error {
    /// The ledger failure category, `None` if the operation never reached the ledger.
    pub const fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Ledger(err) => Some(err.kind()),
            Self::NotPermitted { .. } | Self::Superseded { .. } => None,
        }
    }

    pub const fn operation(&self) -> Operation {
        match self {
            Self::Ledger(err) => err.operation(),
            Self::NotPermitted { operation, .. } | Self::Superseded { operation } => *operation,
        }
    }

    pub const fn loan(&self) -> Option<LoanId> {
        match self {
            Self::Ledger(err) => err.loan(),
            Self::NotPermitted { .. } | Self::Superseded { .. } => None,
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
