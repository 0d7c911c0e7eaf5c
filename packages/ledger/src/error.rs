use thiserror::Error;

use crate::{loan::LoanId, operation::Operation};

/// Failure categories the client reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    ProviderUnavailable,
    UserRejected,
    LedgerUnavailable,
    NotFound,
    ValidationFailed,
    TransactionRejected,
    ReceiptPending,
    InvalidResponse,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("[Ledger] No wallet provider available on '{operation}'! Cause: {cause}")]
    ProviderUnavailable { operation: Operation, cause: String },

    #[error("[Ledger] The user rejected '{operation}'! Cause: {cause}")]
    UserRejected { operation: Operation, cause: String },

    #[error("[Ledger] The ledger is unavailable on '{operation}'{}! Cause: {cause}", on_loan(.loan))]
    LedgerUnavailable {
        operation: Operation,
        loan: Option<LoanId>,
        cause: String,
    },

    #[error("[Ledger] Loan #{loan} does not exist, required by '{operation}'")]
    NotFound { operation: Operation, loan: LoanId },

    #[error("[Ledger] Invalid input on '{operation}'! Cause: {cause}")]
    ValidationFailed { operation: Operation, cause: String },

    #[error("[Ledger] Transaction '{operation}'{} rejected! Cause: {cause}", on_loan(.loan))]
    TransactionRejected {
        operation: Operation,
        loan: Option<LoanId>,
        cause: String,
    },

    #[error(
        "[Ledger] No receipt of transaction '{operation}'{} within {timeout_ms}ms, its outcome is unknown",
        on_loan(.loan)
    )]
    ReceiptPending {
        operation: Operation,
        loan: Option<LoanId>,
        timeout_ms: u128,
    },

    #[error("[Ledger] Unexpected response on '{operation}'{}! Cause: {cause}", on_loan(.loan))]
    InvalidResponse {
        operation: Operation,
        loan: Option<LoanId>,
        cause: String,
    },
}

impl Error {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ProviderUnavailable { .. } => ErrorKind::ProviderUnavailable,
            Self::UserRejected { .. } => ErrorKind::UserRejected,
            Self::LedgerUnavailable { .. } => ErrorKind::LedgerUnavailable,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            Self::TransactionRejected { .. } => ErrorKind::TransactionRejected,
            Self::ReceiptPending { .. } => ErrorKind::ReceiptPending,
            Self::InvalidResponse { .. } => ErrorKind::InvalidResponse,
        }
    }

    pub const fn operation(&self) -> Operation {
        match self {
            Self::ProviderUnavailable { operation, .. }
            | Self::UserRejected { operation, .. }
            | Self::LedgerUnavailable { operation, .. }
            | Self::NotFound { operation, .. }
            | Self::ValidationFailed { operation, .. }
            | Self::TransactionRejected { operation, .. }
            | Self::ReceiptPending { operation, .. }
            | Self::InvalidResponse { operation, .. } => *operation,
        }
    }

    pub const fn loan(&self) -> Option<LoanId> {
        match self {
            Self::NotFound { loan, .. } => Some(*loan),
            Self::LedgerUnavailable { loan, .. }
            | Self::TransactionRejected { loan, .. }
            | Self::ReceiptPending { loan, .. }
            | Self::InvalidResponse { loan, .. } => *loan,
            Self::ProviderUnavailable { .. }
            | Self::UserRejected { .. }
            | Self::ValidationFailed { .. } => None,
        }
    }
}

fn on_loan(loan: &Option<LoanId>) -> String {
    loan.map(|loan| format!(" of loan #{loan}"))
        .unwrap_or_default()
}

pub type Result<T> = core::result::Result<T, Error>;
