use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::Value;
use tokio::time;
use tracing::{debug, info};

use crate::{
    address::Address,
    config::Config,
    error::{Error, Result},
    loan::{Funds, LoanId, LoanRecord, LoanRequest, RawLoan},
    msg::{ExecuteMsg, QueryMsg},
    operation::Operation,
    provider::{Provider, ProviderError},
    transaction::{Receipt, TransactionRequest},
    uint_serde,
};

/// The single seam between the client and the ledger.
///
/// Reads are plain contract calls. Submissions carry a fixed gas ceiling and
/// resolve only once the ledger has accepted the transaction.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// The identifier the ledger will assign to the next loan.
    async fn read_counter(&self) -> Result<u64>;

    /// `None` if the identifier has not been allocated or populated.
    async fn read_loan(&self, loan: LoanId) -> Result<Option<LoanRecord>>;

    async fn submit_request_loan(&self, from: Address, request: LoanRequest) -> Result<Receipt>;

    /// `principal` should be read just before the call to avoid acting on stale data.
    async fn submit_fund_loan(
        &self,
        from: Address,
        loan: LoanId,
        principal: Funds,
    ) -> Result<Receipt>;

    /// `total_repayment` should be read just before the call to avoid acting on stale data.
    async fn submit_repay_loan(
        &self,
        from: Address,
        loan: LoanId,
        total_repayment: Funds,
    ) -> Result<Receipt>;

    async fn submit_claim_collateral(&self, from: Address, loan: LoanId) -> Result<Receipt>;
}

/// [`LedgerGateway`] backed by a wallet [`Provider`].
pub struct LedgerStub<P> {
    provider: Arc<P>,
    config: Config,
}

impl<P> LedgerStub<P>
where
    P: Provider,
{
    pub fn new(provider: Arc<P>, config: Config) -> Self {
        Self { provider, config }
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    async fn query(
        &self,
        operation: Operation,
        loan: Option<LoanId>,
        msg: QueryMsg,
    ) -> Result<Value> {
        debug!(%operation, loan = ?loan, method = msg.method(), "querying the ledger");

        let timeout = self.config.read_timeout();
        bounded(timeout, self.provider.call(self.config.contract(), &msg))
            .await
            .ok_or_else(|| Error::LedgerUnavailable {
                operation,
                loan,
                cause: format!("no response within {}ms", timeout.as_millis()),
            })?
            .map_err(|err| Error::LedgerUnavailable {
                operation,
                loan,
                cause: err.to_string(),
            })
    }

    async fn execute(
        &self,
        operation: Operation,
        loan: Option<LoanId>,
        from: Address,
        value: Option<Funds>,
        msg: ExecuteMsg,
    ) -> Result<Receipt> {
        let tx = TransactionRequest {
            from,
            to: self.config.contract(),
            value,
            gas_limit: self.config.gas_limit(),
            call: msg,
        };
        debug!(
            %operation,
            loan = ?loan,
            %from,
            value = ?value.map(|value| value.to_display()),
            "submitting a transaction"
        );

        let timeout = self.config.submission_timeout();
        let receipt = bounded(timeout, self.provider.send_transaction(tx))
            .await
            .ok_or(Error::ReceiptPending {
                operation,
                loan,
                timeout_ms: timeout.as_millis(),
            })?
            .map_err(|err: ProviderError| Error::TransactionRejected {
                operation,
                loan,
                cause: err.to_string(),
            })
            .and_then(|receipt| {
                serde_json::from_value::<Receipt>(receipt).map_err(|err| Error::InvalidResponse {
                    operation,
                    loan,
                    cause: err.to_string(),
                })
            })?;

        if receipt.reverted() {
            Err(Error::TransactionRejected {
                operation,
                loan,
                cause: format!("reverted in transaction {}", receipt.transaction_hash),
            })
        } else {
            info!(%operation, loan = ?loan, tx = %receipt.transaction_hash, "transaction accepted");

            Ok(receipt)
        }
    }
}

#[async_trait]
impl<P> LedgerGateway for LedgerStub<P>
where
    P: Provider,
{
    async fn read_counter(&self) -> Result<u64> {
        const OPERATION: Operation = Operation::ReadCounter;

        self.query(OPERATION, None, QueryMsg::NextLoanId())
            .await
            .and_then(|counter| {
                uint_serde::deserialize(counter).map_err(|err| Error::InvalidResponse {
                    operation: OPERATION,
                    loan: None,
                    cause: err.to_string(),
                })
            })
    }

    async fn read_loan(&self, loan: LoanId) -> Result<Option<LoanRecord>> {
        const OPERATION: Operation = Operation::ReadLoan;

        self.query(OPERATION, Some(loan), QueryMsg::Loans(loan))
            .await
            .and_then(|record| {
                serde_json::from_value::<RawLoan>(record).map_err(|err| Error::InvalidResponse {
                    operation: OPERATION,
                    loan: Some(loan),
                    cause: err.to_string(),
                })
            })
            .and_then(|raw| raw.into_record(loan))
    }

    async fn submit_request_loan(&self, from: Address, request: LoanRequest) -> Result<Receipt> {
        self.execute(
            Operation::RequestLoan,
            None,
            from,
            Some(request.collateral()),
            ExecuteMsg::RequestLoan {
                principal: request.principal(),
                interest_rate: request.interest_rate(),
            },
        )
        .await
    }

    async fn submit_fund_loan(
        &self,
        from: Address,
        loan: LoanId,
        principal: Funds,
    ) -> Result<Receipt> {
        self.execute(
            Operation::FundLoan,
            Some(loan),
            from,
            Some(principal),
            ExecuteMsg::FundLoan(loan),
        )
        .await
    }

    async fn submit_repay_loan(
        &self,
        from: Address,
        loan: LoanId,
        total_repayment: Funds,
    ) -> Result<Receipt> {
        self.execute(
            Operation::RepayLoan,
            Some(loan),
            from,
            Some(total_repayment),
            ExecuteMsg::RepayLoan(loan),
        )
        .await
    }

    async fn submit_claim_collateral(&self, from: Address, loan: LoanId) -> Result<Receipt> {
        self.execute(
            Operation::ClaimCollateral,
            Some(loan),
            from,
            None,
            ExecuteMsg::ClaimCollateral(loan),
        )
        .await
    }
}

/// `None` if the future does not complete in time.
async fn bounded<F>(timeout: Duration, future: F) -> Option<F::Output>
where
    F: Future,
{
    time::timeout(timeout, future).await.ok()
}
