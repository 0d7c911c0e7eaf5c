use std::sync::Arc;

use finance::{coin::Coin, currency::Native};
use ledger::{
    LedgerStub,
    address::Address,
    config::Config,
    loan::Funds,
    testing::{BORROWER, CONTRACT, InMemoryLedger},
};
use session::{SessionController, SessionState};

pub(crate) type Session = SessionController<InMemoryLedger, LedgerStub<InMemoryLedger>>;

pub(crate) struct Setup {
    pub ledger: Arc<InMemoryLedger>,
    pub session: Arc<Session>,
}

impl Setup {
    pub fn new(account: Address) -> Self {
        Self::with_config(account, Config::new(CONTRACT))
    }

    pub fn with_config(account: Address, config: Config) -> Self {
        let ledger = Arc::new(InMemoryLedger::new(vec![account]));
        let session = SessionController::with_config(ledger.clone(), config);

        Self { ledger, session }
    }

    /// Post `count` pending loans of the borrower, 1 ETH against 2 ETH at rate 10.
    pub fn post_loans(self, count: u64) -> Self {
        (0..count).for_each(|_| {
            self.ledger.post_loan(BORROWER, eth("1"), eth("2"), 10);
        });
        self
    }

    pub async fn connect(self) -> Self {
        self.session.connect().await.unwrap();
        assert!(self.session.is_operation_permitted());
        self
    }

    pub async fn wait_for_state<F>(&self, predicate: F)
    where
        F: FnMut(&SessionState) -> bool,
    {
        let mut states = self.session.subscribe_state();
        states.wait_for(predicate).await.unwrap();
    }
}

pub(crate) fn eth(amount: &str) -> Funds {
    Coin::<Native>::from_display(amount).unwrap()
}
