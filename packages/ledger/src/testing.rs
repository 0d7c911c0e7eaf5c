//! A scripted in-memory [`Provider`] mimicking the loan contract, with failure injection.
use std::{
    collections::{BTreeMap, BTreeSet},
    future,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::{
    Notify,
    mpsc::{self, UnboundedReceiver, UnboundedSender},
};

use finance::coin::Amount;

use crate::{
    address::Address,
    loan::{Funds, InterestRate, LoanId, LoanRecord, LoanStatus, Timestamp},
    msg::{ExecuteMsg, QueryMsg},
    provider::{ChainId, Provider, ProviderError, ProviderEvent},
    transaction::TransactionRequest,
};

pub const CONTRACT: Address = address(0xc0);
pub const BORROWER: Address = address(0xb0);
pub const LENDER: Address = address(0xa0);
pub const GENESIS: Timestamp = 1_700_000_000;
pub const TERM: Timestamp = 30 * 24 * 60 * 60;

pub const fn address(last_byte: u8) -> Address {
    let mut bytes = [0; 20];
    bytes[19] = last_byte;
    Address::new(bytes)
}

pub fn loan_id(id: u64) -> LoanId {
    LoanId::try_from(id).expect("test loan identifiers are positive")
}

pub struct InMemoryLedger {
    state: Mutex<State>,
}

struct State {
    accounts: Vec<Address>,
    chain: ChainId,
    next_loan_id: u64,
    loans: BTreeMap<u64, LoanRecord>,
    failing_loans: BTreeSet<u64>,
    counter_failure: Option<ProviderError>,
    accounts_failure: Option<ProviderError>,
    accounts_hold: Option<Arc<Notify>>,
    send_failure: Option<ProviderError>,
    revert_next_send: bool,
    hang_sends: bool,
    quantity_receipts: bool,
    subscribers: Vec<UnboundedSender<ProviderEvent>>,
    counter_reads: usize,
    loan_reads: Vec<LoanId>,
    sent: Vec<TransactionRequest>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(vec![BORROWER])
    }
}

impl InMemoryLedger {
    pub fn new(accounts: Vec<Address>) -> Self {
        Self {
            state: Mutex::new(State {
                accounts,
                chain: ChainId::new("0x539"),
                next_loan_id: 1,
                loans: BTreeMap::new(),
                failing_loans: BTreeSet::new(),
                counter_failure: None,
                accounts_failure: None,
                accounts_hold: None,
                send_failure: None,
                revert_next_send: false,
                hang_sends: false,
                quantity_receipts: false,
                subscribers: vec![],
                counter_reads: 0,
                loan_reads: vec![],
                sent: vec![],
            }),
        }
    }

    /// Store a pending loan as if `borrower` had requested it.
    pub fn post_loan(
        &self,
        borrower: Address,
        principal: Funds,
        collateral: Funds,
        interest_rate: InterestRate,
    ) -> LoanId {
        self.state()
            .open_loan(borrower, principal, collateral, interest_rate)
    }

    /// Allocate an identifier without populating its record.
    pub fn skip_loan_id(&self) {
        self.state().next_loan_id += 1;
    }

    pub fn update_loan<F>(&self, loan: LoanId, update: F)
    where
        F: FnOnce(&mut LoanRecord),
    {
        update(
            self.state()
                .loans
                .get_mut(&loan.get())
                .expect("the loan exists"),
        )
    }

    pub fn loan(&self, loan: LoanId) -> Option<LoanRecord> {
        self.state().loans.get(&loan.get()).cloned()
    }

    pub fn fail_loan(&self, loan: LoanId) {
        self.state().failing_loans.insert(loan.get());
    }

    pub fn fail_counter(&self, failure: Option<ProviderError>) {
        self.state().counter_failure = failure;
    }

    pub fn fail_accounts(&self, failure: Option<ProviderError>) {
        self.state().accounts_failure = failure;
    }

    /// Keep the next account request waiting until the returned handle is notified.
    pub fn hold_accounts(&self) -> Arc<Notify> {
        let hold = Arc::new(Notify::new());
        self.state().accounts_hold = Some(hold.clone());
        hold
    }

    /// Reject the next transaction at the provider.
    pub fn fail_next_send(&self, failure: ProviderError) {
        self.state().send_failure = Some(failure);
    }

    /// Accept the next transaction with a failed execution status.
    pub fn revert_next_send(&self) {
        self.state().revert_next_send = true;
    }

    /// Never resolve any further transaction.
    pub fn hang_sends(&self) {
        self.state().hang_sends = true;
    }

    /// Report receipt numbers and status as `0x` hex quantities.
    pub fn report_quantities(&self) {
        self.state().quantity_receipts = true;
    }

    pub fn switch_accounts(&self, accounts: Vec<Address>) {
        let mut state = self.state();
        state.accounts.clone_from(&accounts);
        state.notify(ProviderEvent::AccountsChanged(accounts));
    }

    pub fn switch_chain(&self, chain: ChainId) {
        let mut state = self.state();
        state.chain = chain.clone();
        state.notify(ProviderEvent::ChainChanged(chain));
    }

    pub fn counter_reads(&self) -> usize {
        self.state().counter_reads
    }

    pub fn loan_reads(&self) -> Vec<LoanId> {
        self.state().loan_reads.clone()
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.state().sent.clone()
    }

    pub fn subscribers(&self) -> usize {
        let mut state = self.state();
        state.subscribers.retain(|subscriber| !subscriber.is_closed());
        state.subscribers.len()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("no test panics while holding the ledger state")
    }
}

impl State {
    fn open_loan(
        &mut self,
        borrower: Address,
        principal: Funds,
        collateral: Funds,
        interest_rate: InterestRate,
    ) -> LoanId {
        let id = loan_id(self.next_loan_id);
        self.next_loan_id += 1;

        let interest = principal.amount() * Amount::from(interest_rate) / Amount::from(100u8);
        self.loans.insert(
            id.get(),
            LoanRecord {
                id,
                borrower,
                lender: Address::ZERO,
                principal,
                collateral,
                interest_rate,
                total_repayment: Funds::new(principal.amount() + interest),
                term_end: 0,
                status: LoanStatus::Pending,
            },
        );
        id
    }

    fn notify(&mut self, event: ProviderEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    fn execute(&mut self, tx: &TransactionRequest) -> Result<(), ProviderError> {
        let value = tx.value.unwrap_or_default();

        match tx.call {
            ExecuteMsg::RequestLoan {
                principal,
                interest_rate,
            } => {
                self.open_loan(tx.from, principal, value, interest_rate);
                Ok(())
            }
            ExecuteMsg::FundLoan(loan) => self.with_loan(loan, |record| {
                if record.status != LoanStatus::Pending {
                    Err("loan is not pending")
                } else if value != record.principal {
                    Err("incorrect principal amount")
                } else {
                    record.lender = tx.from;
                    record.term_end = GENESIS + TERM;
                    record.status = LoanStatus::Active;
                    Ok(())
                }
            }),
            ExecuteMsg::RepayLoan(loan) => self.with_loan(loan, |record| {
                if record.status != LoanStatus::Active {
                    Err("loan is not active")
                } else if value != record.total_repayment {
                    Err("incorrect repayment amount")
                } else {
                    record.status = LoanStatus::Repaid;
                    Ok(())
                }
            }),
            ExecuteMsg::ClaimCollateral(loan) => self.with_loan(loan, |record| {
                if record.status != LoanStatus::Active || record.lender != tx.from {
                    Err("only the lender of an active loan can claim")
                } else {
                    record.status = LoanStatus::Defaulted;
                    Ok(())
                }
            }),
        }
    }

    fn with_loan<F>(&mut self, loan: LoanId, f: F) -> Result<(), ProviderError>
    where
        F: FnOnce(&mut LoanRecord) -> Result<(), &'static str>,
    {
        self.loans
            .get_mut(&loan.get())
            .ok_or("loan does not exist")
            .and_then(f)
            .map_err(|reason| ProviderError::internal(format!("execution reverted: {reason}")))
    }
}

#[async_trait]
impl Provider for InMemoryLedger {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let hold = self.state().accounts_hold.take();
        if let Some(hold) = hold {
            hold.notified().await;
        }

        let state = self.state();
        state
            .accounts_failure
            .clone()
            .map_or_else(|| Ok(state.accounts.clone()), Err)
    }

    async fn chain_id(&self) -> Result<ChainId, ProviderError> {
        Ok(self.state().chain.clone())
    }

    async fn call(&self, contract: Address, msg: &QueryMsg) -> Result<Value, ProviderError> {
        assert_eq!(CONTRACT, contract);

        let mut state = self.state();
        match *msg {
            QueryMsg::NextLoanId() => {
                state.counter_reads += 1;
                state
                    .counter_failure
                    .clone()
                    .map_or_else(|| Ok(json!(state.next_loan_id.to_string())), Err)
            }
            QueryMsg::Loans(loan) => {
                state.loan_reads.push(loan);
                if state.failing_loans.contains(&loan.get()) {
                    Err(ProviderError::internal(format!("cannot decode loan #{loan}")))
                } else {
                    Ok(state.loans.get(&loan.get()).map_or_else(unallocated, encode))
                }
            }
        }
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<Value, ProviderError> {
        let hang = {
            let mut state = self.state();
            state.sent.push(tx.clone());
            state.hang_sends
        };
        if hang {
            future::pending::<()>().await;
        }

        let mut state = self.state();
        if let Some(failure) = state.send_failure.take() {
            return Err(failure);
        }

        let tx_index = state.sent.len();
        let reverted = std::mem::take(&mut state.revert_next_send);
        if !reverted {
            state.execute(&tx)?;
        }

        let transaction_hash = format!("0x{tx_index:064x}");
        Ok(if state.quantity_receipts {
            json!({
                "transactionHash": transaction_hash,
                "blockNumber": format!("{tx_index:#x}"),
                "status": if reverted { "0x0" } else { "0x1" },
            })
        } else {
            json!({
                "transactionHash": transaction_hash,
                "blockNumber": tx_index,
                "status": !reverted,
            })
        })
    }

    fn subscribe(&self) -> UnboundedReceiver<ProviderEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.state().subscribers.push(sender);
        receiver
    }
}

fn encode(loan: &LoanRecord) -> Value {
    json!({
        "id": loan.id.to_string(),
        "borrower": loan.borrower,
        "lender": loan.lender,
        "principal": loan.principal,
        "collateralAmount": loan.collateral,
        "interestRate": loan.interest_rate.to_string(),
        "totalRepayment": loan.total_repayment,
        "termEnd": loan.term_end.to_string(),
        "status": (loan.status as u8).to_string(),
    })
}

fn unallocated() -> Value {
    let zero = Address::ZERO;

    json!({
        "id": "0",
        "borrower": zero,
        "lender": zero,
        "principal": "0",
        "collateralAmount": "0",
        "interestRate": "0",
        "totalRepayment": "0",
        "termEnd": "0",
        "status": "0",
    })
}
