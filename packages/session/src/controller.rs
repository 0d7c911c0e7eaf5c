use std::{
    future::Future,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{
    sync::watch,
    task::{self, JoinHandle},
    time,
};
use tracing::{debug, info};

use ledger::{
    LedgerGateway, LedgerStub,
    address::Address,
    config::Config,
    error::Error as LedgerError,
    loan::{LoanId, LoanRecord},
    operation::Operation,
    provider::{ChainId, Provider, ProviderError, ProviderEvent},
    transaction::Receipt,
};
use loans::{LoanCollection, LoanRepository};
use platform::{
    emit::{Emit, Emitter},
    error,
    message::Message,
};

use crate::{
    error::{Error, Result},
    input::{self, LoanForm},
    state::{Identity, SessionState},
};

/// Drives a wallet session: the handshake, reactions to wallet notifications
/// and the loan operations the user triggers.
///
/// Operations are permitted only while [`SessionState::Connected`]. Every write
/// is followed by exactly one refresh of the loans once the ledger confirms it.
/// The outcome of each operation is published as a [`Message`].
pub struct SessionController<P, G> {
    provider: Arc<P>,
    loans: Arc<LoanRepository<G>>,
    handshake_timeout: Duration,
    state: watch::Sender<SessionState>,
    generation: AtomicU64,
    messages: watch::Sender<Message>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl<P> SessionController<P, LedgerStub<P>>
where
    P: Provider + 'static,
{
    /// A session reaching the ledger through the same provider it connects to.
    ///
    /// The handshake waits for the user as long as a submission does.
    pub fn with_config(provider: Arc<P>, config: Config) -> Arc<Self> {
        let handshake_timeout = config.submission_timeout();
        let gateway = LedgerStub::new(provider.clone(), config);

        Self::new(
            provider,
            Arc::new(LoanRepository::new(Arc::new(gateway))),
            handshake_timeout,
        )
    }
}

impl<P, G> SessionController<P, G>
where
    P: Provider + 'static,
    G: LedgerGateway + 'static,
{
    pub fn new(
        provider: Arc<P>,
        loans: Arc<LoanRepository<G>>,
        handshake_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            provider,
            loans,
            handshake_timeout,
            state: watch::Sender::new(SessionState::Disconnected),
            generation: AtomicU64::new(0),
            messages: watch::Sender::new(Message::default()),
            listener: Mutex::new(None),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity().cloned()
    }

    pub fn is_operation_permitted(&self) -> bool {
        self.state.borrow().is_connected()
    }

    /// The last loans fetched, kept visible even after the connection is lost.
    pub fn loans(&self) -> Arc<LoanCollection> {
        self.loans.snapshot()
    }

    /// The most recent outcome or progress report.
    pub fn message(&self) -> Message {
        self.messages.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn subscribe_messages(&self) -> watch::Receiver<Message> {
        self.messages.subscribe()
    }

    pub fn subscribe_loans(&self) -> watch::Receiver<Arc<LoanCollection>> {
        self.loans.subscribe()
    }

    /// Ask the wallet for an account and load the loans.
    ///
    /// Wallet notifications are handled once connected. A failed refresh of the
    /// loans is reported but does not fail the connection.
    ///
    /// A network change during the handshake restarts the session in the
    /// background, and this call returns [`Error::Superseded`].
    pub async fn connect(self: &Arc<Self>) -> Result<Identity> {
        const OPERATION: Operation = Operation::Connect;

        let outcome = match self.transition(|state| {
            state.may_connect().then_some(SessionState::Connecting)
        }) {
            Some(generation) => {
                info!("connecting to the wallet");
                self.establish(generation, true).await
            }
            None => Err(self.not_permitted(OPERATION)),
        };
        outcome.inspect_err(|err| self.failed(OPERATION, err))
    }

    /// Apply a wallet notification.
    ///
    /// The state changes at once. Any refresh or handshake the change calls for
    /// runs in the background.
    pub fn handle(self: &Arc<Self>, event: ProviderEvent) {
        debug!(?event, "wallet notification");

        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.first() {
                Some(&account) => self.switch_account(account),
                None => self.lose_connection(),
            },
            ProviderEvent::ChainChanged(chain) => self.switch_chain(chain),
        }
    }

    pub async fn refresh(&self) -> Result<Arc<LoanCollection>> {
        const OPERATION: Operation = Operation::Refresh;

        let outcome = match self.permitted(OPERATION) {
            Ok(_) => self.loans.refresh().await.map_err(Error::from),
            Err(err) => Err(err),
        };
        outcome
            .inspect(|collection| {
                self.publish(
                    Emitter::of_type("loans-refreshed")
                        .emit_to_string_value("loans", collection.len())
                        .emit_to_string_value("skipped", collection.skipped().len()),
                )
            })
            .inspect_err(|err| self.failed(OPERATION, err))
    }

    /// Post a loan request with the collateral attached.
    pub async fn request_loan(&self, form: LoanForm<'_>) -> Result<Receipt> {
        const OPERATION: Operation = Operation::RequestLoan;

        let outcome = async {
            let account = self.permitted(OPERATION)?;
            let request = form.parse()?;

            self.publish(
                Emitter::of_type("requesting-loan")
                    .emit_coin("principal", request.principal())
                    .emit_coin("collateral", request.collateral())
                    .emit_to_string_value("interest-rate", request.interest_rate()),
            );
            self.loans
                .gateway()
                .submit_request_loan(account, request)
                .await
                .map_err(Error::from)
        }
        .await;

        self.conclude(OPERATION, outcome, |receipt| {
            Emitter::of_type("loan-requested").emit("tx", receipt.transaction_hash.clone())
        })
        .await
    }

    /// Fund a loan with its principal as the ledger holds it right now.
    pub async fn fund_loan(&self, loan: &str) -> Result<Receipt> {
        const OPERATION: Operation = Operation::FundLoan;

        let outcome = async {
            let account = self.permitted(OPERATION)?;
            let loan = input::loan_id(OPERATION, loan)?;

            self.publish(Emitter::of_type("funding-loan").emit_to_string_value("loan", loan));
            let _pinned = self.loans.pin();
            let principal = self.read_current(OPERATION, loan).await?.principal;
            self.loans
                .gateway()
                .submit_fund_loan(account, loan, principal)
                .await
                .map(|receipt| (loan, principal, receipt))
                .map_err(Error::from)
        }
        .await;

        self.conclude(OPERATION, outcome, |(loan, principal, receipt)| {
            Emitter::of_type("loan-funded")
                .emit_to_string_value("loan", loan)
                .emit_coin("value", *principal)
                .emit("tx", receipt.transaction_hash.clone())
        })
        .await
        .map(|(_, _, receipt)| receipt)
    }

    /// Repay a loan with its total repayment as the ledger holds it right now.
    pub async fn repay_loan(&self, loan: &str) -> Result<Receipt> {
        const OPERATION: Operation = Operation::RepayLoan;

        let outcome = async {
            let account = self.permitted(OPERATION)?;
            let loan = input::loan_id(OPERATION, loan)?;

            self.publish(Emitter::of_type("repaying-loan").emit_to_string_value("loan", loan));
            let _pinned = self.loans.pin();
            let total_repayment = self.read_current(OPERATION, loan).await?.total_repayment;
            self.loans
                .gateway()
                .submit_repay_loan(account, loan, total_repayment)
                .await
                .map(|receipt| (loan, total_repayment, receipt))
                .map_err(Error::from)
        }
        .await;

        self.conclude(OPERATION, outcome, |(loan, total_repayment, receipt)| {
            Emitter::of_type("loan-repaid")
                .emit_to_string_value("loan", loan)
                .emit_coin("value", *total_repayment)
                .emit("tx", receipt.transaction_hash.clone())
        })
        .await
        .map(|(_, _, receipt)| receipt)
    }

    pub async fn claim_collateral(&self, loan: &str) -> Result<Receipt> {
        const OPERATION: Operation = Operation::ClaimCollateral;

        let outcome = async {
            let account = self.permitted(OPERATION)?;
            let loan = input::loan_id(OPERATION, loan)?;

            self.publish(
                Emitter::of_type("claiming-collateral").emit_to_string_value("loan", loan),
            );
            self.loans
                .gateway()
                .submit_claim_collateral(account, loan)
                .await
                .map(|receipt| (loan, receipt))
                .map_err(Error::from)
        }
        .await;

        self.conclude(OPERATION, outcome, |(loan, receipt)| {
            Emitter::of_type("collateral-claimed")
                .emit_to_string_value("loan", loan)
                .emit("tx", receipt.transaction_hash.clone())
        })
        .await
        .map(|(_, receipt)| receipt)
    }

    fn listen(self: &Arc<Self>) {
        let mut events = self.provider.subscribe();
        let session = Arc::downgrade(self);

        let listener = task::spawn(async move {
            while let Some(event) = events.recv().await {
                match session.upgrade() {
                    Some(session) => session.handle(event),
                    None => break,
                }
            }
        });

        if let Some(previous) = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(listener)
        {
            previous.abort();
        }
    }

    /// Run the handshake and, unless superseded meanwhile, enter [`SessionState::Connected`]
    /// and load the loans.
    async fn establish(self: &Arc<Self>, generation: u64, subscribe: bool) -> Result<Identity> {
        let superseded = || {
            debug!("handshake superseded by a newer session change");
            Error::Superseded {
                operation: Operation::Connect,
            }
        };

        match self.handshake().await {
            Ok(identity) => {
                if !self.complete(generation, SessionState::Connected(identity.clone())) {
                    return Err(superseded());
                }
                if subscribe {
                    self.listen();
                }
                info!(account = %identity.account(), chain = %identity.chain(), "connected");
                self.publish(
                    Emitter::of_type("connected")
                        .emit_to_string_value("account", identity.account())
                        .emit_to_string_value("chain", identity.chain()),
                );
                self.refresh_loans().await;
                Ok(identity)
            }
            Err(err) => {
                if self.complete(generation, SessionState::Disconnected) {
                    Err(err.into())
                } else {
                    Err(superseded())
                }
            }
        }
    }

    async fn handshake(&self) -> core::result::Result<Identity, LedgerError> {
        let accounts = self
            .bounded(self.provider.request_accounts())
            .await?
            .map_err(rejected_handshake)?;
        let account = accounts
            .first()
            .copied()
            .ok_or_else(|| LedgerError::ProviderUnavailable {
                operation: Operation::Connect,
                cause: "the wallet exposes no account".into(),
            })?;
        let chain = self
            .bounded(self.provider.chain_id())
            .await?
            .map_err(rejected_handshake)?;

        Ok(Identity::new(account, chain))
    }

    async fn bounded<F>(&self, future: F) -> core::result::Result<F::Output, LedgerError>
    where
        F: Future,
    {
        time::timeout(self.handshake_timeout, future)
            .await
            .map_err(|_| LedgerError::ProviderUnavailable {
                operation: Operation::Connect,
                cause: format!(
                    "no response within {}ms",
                    self.handshake_timeout.as_millis()
                ),
            })
    }

    fn switch_account(self: &Arc<Self>, account: Address) {
        let switched = self.transition(|state| {
            state
                .identity()
                .map(|identity| SessionState::Connected(identity.clone().switch_account(account)))
        });

        if switched.is_some() {
            info!(%account, "account switched");
            self.publish(
                Emitter::of_type("account-changed").emit_to_string_value("account", account),
            );

            let session = self.clone();
            task::spawn(async move { session.refresh_loans().await });
        } else {
            debug!(%account, state = self.state.borrow().name(), "ignoring an account switch");
        }
    }

    fn lose_connection(&self) {
        let lost = self.transition(|state| {
            state
                .is_connected()
                .then_some(SessionState::ConnectionLost)
        });

        if lost.is_some() {
            info!("the wallet exposes no account, connection lost");
            self.publish(
                Emitter::of_error("connection-lost").emit("cause", "the wallet exposes no account"),
            );
        }
    }

    fn switch_chain(self: &Arc<Self>, chain: ChainId) {
        let restart = self.transition(|state| {
            matches!(state, SessionState::Connected(_) | SessionState::Connecting)
                .then_some(SessionState::Connecting)
        });

        if let Some(generation) = restart {
            self.loans.invalidate();
            info!(%chain, "network changed, restarting the session");
            self.publish(Emitter::of_type("network-changed").emit_to_string_value("chain", &chain));

            let session = self.clone();
            task::spawn(async move {
                if let Err(err) = session.establish(generation, false).await {
                    session.failed(Operation::Connect, &err);
                }
            });
        } else {
            debug!(%chain, state = self.state.borrow().name(), "ignoring a network change");
        }
    }

    async fn read_current(&self, operation: Operation, loan: LoanId) -> Result<LoanRecord> {
        self.loans
            .get_loan(loan)
            .await?
            .ok_or(Error::Ledger(LedgerError::NotFound { operation, loan }))
    }

    /// Refresh the loans after a confirmed write and publish the outcome.
    async fn conclude<T, F>(
        &self,
        operation: Operation,
        outcome: Result<T>,
        success: F,
    ) -> Result<T>
    where
        F: FnOnce(&T) -> Emitter,
    {
        match outcome {
            Ok(done) => {
                let refreshed = self.loans.refresh().await;
                info!(%operation, "operation completed");
                self.publish(success(&done).emit_if_some("refresh-error", refreshed.err()));
                Ok(done)
            }
            Err(err) => {
                self.failed(operation, &err);
                Err(err)
            }
        }
    }

    async fn refresh_loans(&self) {
        if let Err(err) = self.loans.refresh().await {
            self.failed(Operation::Refresh, &err.into());
        }
    }

    fn permitted(&self, operation: Operation) -> Result<Address> {
        self.state
            .borrow()
            .identity()
            .map(Identity::account)
            .ok_or_else(|| self.not_permitted(operation))
    }

    fn not_permitted(&self, operation: Operation) -> Error {
        Error::NotPermitted {
            operation,
            state: self.state.borrow().name(),
        }
    }

    fn failed(&self, operation: Operation, err: &Error) {
        if let Error::Superseded { .. } = err {
            debug!(%operation, "nothing to report for a superseded operation");
            return;
        }

        error::log(operation.name())(err);
        self.publish(
            Emitter::of_error(format!("{operation}-failed"))
                .emit_if_some("loan", err.loan())
                .emit_to_string_value("cause", err),
        );
    }

    fn publish<M>(&self, message: M)
    where
        M: Into<Message>,
    {
        self.messages.send_replace(message.into());
    }

    /// Move to the state `next` yields, if any, starting a new generation.
    fn transition<F>(&self, next: F) -> Option<u64>
    where
        F: FnOnce(&SessionState) -> Option<SessionState>,
    {
        let mut generation = None;
        self.state.send_if_modified(|state| {
            next(state)
                .map(|replacement| {
                    *state = replacement;
                    generation = Some(self.generation.fetch_add(1, Ordering::AcqRel) + 1);
                })
                .is_some()
        });
        generation
    }

    /// Move to `next` unless another transition happened since `generation` began.
    fn complete(&self, generation: u64, next: SessionState) -> bool {
        self.state.send_if_modified(|state| {
            let current = self.generation.load(Ordering::Acquire) == generation;
            if current {
                *state = next;
            }
            current
        })
    }
}

impl<P, G> Drop for SessionController<P, G> {
    fn drop(&mut self) {
        if let Some(listener) = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            listener.abort();
        }
    }
}

fn rejected_handshake(err: ProviderError) -> LedgerError {
    if err.is_user_rejected() {
        LedgerError::UserRejected {
            operation: Operation::Connect,
            cause: err.to_string(),
        }
    } else {
        LedgerError::ProviderUnavailable {
            operation: Operation::Connect,
            cause: err.to_string(),
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use tokio::task;

    use ledger::{
        LedgerStub,
        config::Config,
        error::ErrorKind,
        loan::{Funds, LoanStatus},
        operation::Operation,
        provider::{ChainId, ProviderError, ProviderEvent},
        testing::{self, BORROWER, CONTRACT, InMemoryLedger, LENDER},
    };
    use platform::message::Level;

    use crate::{error::Error, input::LoanForm, state::SessionState};

    use super::SessionController;

    type Session = SessionController<InMemoryLedger, LedgerStub<InMemoryLedger>>;

    const ETH: u128 = 1_000_000_000_000_000_000;

    fn eth(amount: u128) -> Funds {
        Funds::from(amount * ETH)
    }

    fn session(ledger: &Arc<InMemoryLedger>) -> Arc<Session> {
        SessionController::with_config(ledger.clone(), Config::new(CONTRACT))
    }

    async fn connected(ledger: &Arc<InMemoryLedger>) -> Arc<Session> {
        let session = session(ledger);
        session.connect().await.unwrap();
        session
    }

    fn post(ledger: &InMemoryLedger, count: u64) {
        (0..count).for_each(|_| {
            ledger.post_loan(BORROWER, eth(1), eth(2), 10);
        })
    }

    #[tokio::test]
    async fn connect() {
        let ledger = Arc::new(InMemoryLedger::default());
        post(&ledger, 2);
        let session = session(&ledger);
        assert_eq!(SessionState::Disconnected, session.state());
        assert!(!session.is_operation_permitted());

        let identity = session.connect().await.unwrap();

        assert_eq!(BORROWER, identity.account());
        assert_eq!(&ChainId::new("0x539"), identity.chain());
        assert_eq!(Some(identity), session.identity());
        assert!(session.is_operation_permitted());
        assert_eq!(2, session.loans().len());
        assert_eq!(1, ledger.subscribers());
        assert_eq!("connected", session.message().event());
    }

    #[tokio::test]
    async fn connect_once() {
        let ledger = Arc::new(InMemoryLedger::default());
        let session = connected(&ledger).await;

        let err = session.connect().await.unwrap_err();

        assert!(matches!(err, Error::NotPermitted { .. }));
        assert!(session.is_operation_permitted());
        assert_eq!(1, ledger.counter_reads());
    }

    #[tokio::test]
    async fn connect_rejected() {
        let ledger = Arc::new(InMemoryLedger::default());
        let session = session(&ledger);

        ledger.fail_accounts(Some(ProviderError::user_rejected("User rejected the request.")));
        let err = session.connect().await.unwrap_err();
        assert_eq!(Some(ErrorKind::UserRejected), err.kind());
        assert_eq!(SessionState::Disconnected, session.state());
        assert_eq!(0, ledger.subscribers());
        assert_eq!(Level::Error, session.message().level());
        assert_eq!("connect-failed", session.message().event());

        ledger.fail_accounts(Some(ProviderError::new(
            ProviderError::DISCONNECTED,
            "disconnected",
        )));
        let err = session.connect().await.unwrap_err();
        assert_eq!(Some(ErrorKind::ProviderUnavailable), err.kind());

        ledger.fail_accounts(None);
        ledger.switch_accounts(vec![]);
        let err = session.connect().await.unwrap_err();
        assert_eq!(Some(ErrorKind::ProviderUnavailable), err.kind());
        assert_eq!(SessionState::Disconnected, session.state());
        assert_eq!(0, ledger.counter_reads());
    }

    #[tokio::test]
    async fn operations_need_connection() {
        let ledger = Arc::new(InMemoryLedger::default());
        post(&ledger, 1);
        let session = session(&ledger);

        assert!(matches!(
            session.fund_loan("1").await,
            Err(Error::NotPermitted { .. })
        ));
        assert!(matches!(
            session.repay_loan("1").await,
            Err(Error::NotPermitted { .. })
        ));
        assert!(matches!(
            session.claim_collateral("1").await,
            Err(Error::NotPermitted { .. })
        ));
        assert!(matches!(
            session.refresh().await,
            Err(Error::NotPermitted { .. })
        ));
        assert!(ledger.sent().is_empty());
        assert_eq!(0, ledger.counter_reads());
        assert_eq!("refresh-failed", session.message().event());
    }

    #[tokio::test]
    async fn request_validated_before_submission() {
        let ledger = Arc::new(InMemoryLedger::default());
        let session = connected(&ledger).await;
        let form = LoanForm {
            principal: "100",
            collateral: "100",
            interest_rate: "5",
        };

        let err = session.request_loan(form).await.unwrap_err();

        assert_eq!(Some(ErrorKind::ValidationFailed), err.kind());
        assert!(ledger.sent().is_empty());
        assert_eq!(1, ledger.counter_reads());
        assert_eq!("request-loan-failed", session.message().event());

        session
            .request_loan(LoanForm {
                collateral: "150",
                ..form
            })
            .await
            .unwrap();
        assert_eq!(Some(eth(150)), ledger.sent()[0].value);
        assert_eq!(1, session.loans().len());
        assert_eq!("loan-requested", session.message().event());
    }

    #[tokio::test]
    async fn fund_with_current_principal() {
        let ledger = Arc::new(InMemoryLedger::new(vec![LENDER]));
        post(&ledger, 3);
        let session = connected(&ledger).await;
        let loan = testing::loan_id(3);
        ledger.update_loan(loan, |record| {
            record.principal = Funds::from(2_500_000_000_000_000_000u128)
        });
        let refreshes = ledger.counter_reads();

        session.fund_loan("3").await.unwrap();

        assert_eq!(
            "2500000000000000000",
            ledger.sent()[0].value.unwrap().amount().to_string()
        );
        assert_eq!(refreshes + 1, ledger.counter_reads());
        let funded = session.loans().get(loan).cloned().unwrap();
        assert_eq!(LENDER, funded.lender);
        assert_eq!(LoanStatus::Active, funded.status);

        let message = session.message();
        assert_eq!("loan-funded", message.event());
        assert_eq!(Some("3"), message.attribute("loan"));
        assert_eq!(Some("2.5"), message.attribute("value"));
        assert_eq!(None, message.attribute("refresh-error"));
    }

    #[tokio::test]
    async fn fund_missing_loan() {
        let ledger = Arc::new(InMemoryLedger::new(vec![LENDER]));
        let session = connected(&ledger).await;

        let err = session.fund_loan("7").await.unwrap_err();

        assert_eq!(Some(ErrorKind::NotFound), err.kind());
        assert_eq!(Some(testing::loan_id(7)), err.loan());
        assert!(ledger.sent().is_empty());
        assert_eq!(Some("7"), session.message().attribute("loan"));
    }

    #[tokio::test]
    async fn failed_write_keeps_loans() {
        let ledger = Arc::new(InMemoryLedger::new(vec![LENDER]));
        post(&ledger, 1);
        let session = connected(&ledger).await;
        let before = session.loans();
        let refreshes = ledger.counter_reads();

        ledger.fail_next_send(ProviderError::user_rejected("User denied transaction signature."));
        let err = session.fund_loan("1").await.unwrap_err();

        assert_eq!(Some(ErrorKind::TransactionRejected), err.kind());
        assert_eq!(refreshes, ledger.counter_reads());
        assert_eq!(before, session.loans());
        assert_eq!(Level::Error, session.message().level());
        assert!(
            session
                .message()
                .attribute("cause")
                .is_some_and(|cause| cause.contains("User denied"))
        );
    }

    #[tokio::test]
    async fn repay_then_claim() {
        let ledger = Arc::new(InMemoryLedger::default());
        post(&ledger, 1);
        let loan = testing::loan_id(1);
        ledger.update_loan(loan, |record| {
            record.lender = LENDER;
            record.status = LoanStatus::Active;
        });
        let session = connected(&ledger).await;

        session.repay_loan("1").await.unwrap();
        assert_eq!(Some(Funds::from(1_100_000_000_000_000_000u128)), ledger.sent()[0].value);
        assert_eq!(
            Some(LoanStatus::Repaid),
            session.loans().get(loan).map(|record| record.status)
        );
        assert_eq!("loan-repaid", session.message().event());

        post(&ledger, 1);
        let defaulted = testing::loan_id(2);
        ledger.update_loan(defaulted, |record| {
            record.lender = LENDER;
            record.status = LoanStatus::Active;
        });
        session.handle(ProviderEvent::AccountsChanged(vec![LENDER]));
        session.claim_collateral("2").await.unwrap();

        assert_eq!(None, ledger.sent()[1].value);
        assert_eq!(LENDER, ledger.sent()[1].from);
        assert_eq!(
            Some(LoanStatus::Defaulted),
            session.loans().get(defaulted).map(|record| record.status)
        );
        assert_eq!("collateral-claimed", session.message().event());
    }

    #[tokio::test]
    async fn empty_accounts_lose_connection() {
        let ledger = Arc::new(InMemoryLedger::default());
        post(&ledger, 2);
        let session = connected(&ledger).await;

        session.handle(ProviderEvent::AccountsChanged(vec![]));

        assert_eq!(SessionState::ConnectionLost, session.state());
        assert!(!session.is_operation_permitted());
        assert_eq!(2, session.loans().len());
        assert_eq!("connection-lost", session.message().event());

        session.handle(ProviderEvent::AccountsChanged(vec![LENDER]));
        assert_eq!(SessionState::ConnectionLost, session.state());

        session.connect().await.unwrap();
        assert!(session.is_operation_permitted());
    }

    #[tokio::test]
    async fn account_switch_refreshes() {
        let ledger = Arc::new(InMemoryLedger::default());
        let session = connected(&ledger).await;
        let mut loans = session.subscribe_loans();
        post(&ledger, 1);

        session.handle(ProviderEvent::AccountsChanged(vec![LENDER]));

        assert_eq!(Some(LENDER), session.identity().map(|identity| identity.account()));
        loans.changed().await.unwrap();
        assert_eq!(1, loans.borrow().len());
    }

    #[tokio::test]
    async fn chain_switch_restarts() {
        let ledger = Arc::new(InMemoryLedger::default());
        post(&ledger, 1);
        let session = connected(&ledger).await;
        let mut states = session.subscribe_state();

        ledger.switch_chain(ChainId::new("0x1"));
        session.handle(ProviderEvent::ChainChanged(ChainId::new("0x1")));

        assert_eq!(SessionState::Connecting, session.state());
        assert!(session.loans().is_empty());
        assert!(!session.is_operation_permitted());

        states.wait_for(SessionState::is_connected).await.unwrap();
        assert_eq!(
            Some(ChainId::new("0x1")),
            session.identity().map(|identity| identity.chain().clone())
        );
        assert_eq!(1, ledger.subscribers());
    }

    #[tokio::test]
    async fn chain_switch_supersedes_connect() {
        let ledger = Arc::new(InMemoryLedger::default());
        let session = connected(&ledger).await;
        session.handle(ProviderEvent::AccountsChanged(vec![]));
        let mut states = session.subscribe_state();
        let release = ledger.hold_accounts();

        let connecting = task::spawn({
            let session = session.clone();
            async move { session.connect().await }
        });
        states
            .wait_for(|state| *state == SessionState::Connecting)
            .await
            .unwrap();

        ledger.switch_chain(ChainId::new("0x1"));
        states.wait_for(SessionState::is_connected).await.unwrap();
        release.notify_one();

        assert_eq!(
            Err(Error::Superseded {
                operation: Operation::Connect
            }),
            connecting.await.unwrap()
        );
        assert_eq!(
            Some(ChainId::new("0x1")),
            session.identity().map(|identity| identity.chain().clone())
        );
        assert_eq!("connected", session.message().event());
    }
}
