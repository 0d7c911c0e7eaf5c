use ledger::{
    provider::ChainId,
    testing::{BORROWER, LENDER},
};
use tokio::task;

use session::{SessionState, error::Error};

use crate::common::{self, Setup};

#[tokio::test]
async fn empty_accounts_keep_loans() {
    let setup = Setup::new(BORROWER).post_loans(2).connect().await;

    setup.ledger.switch_accounts(vec![]);
    setup
        .wait_for_state(|state| *state == SessionState::ConnectionLost)
        .await;

    assert!(!setup.session.is_operation_permitted());
    assert_eq!(2, setup.session.loans().len());
    assert!(matches!(
        setup.session.fund_loan("1").await,
        Err(Error::NotPermitted { .. })
    ));
    assert!(setup.ledger.sent().is_empty());
}

#[tokio::test]
async fn reconnect_after_loss() {
    let setup = Setup::new(BORROWER).post_loans(1).connect().await;
    setup.ledger.switch_accounts(vec![]);
    setup
        .wait_for_state(|state| *state == SessionState::ConnectionLost)
        .await;

    setup.ledger.switch_accounts(vec![LENDER]);
    let identity = setup.session.connect().await.unwrap();

    assert_eq!(LENDER, identity.account());
    assert!(setup.session.is_operation_permitted());
    assert_eq!(Some(LENDER), setup.session.identity().map(|identity| identity.account()));
}

#[tokio::test]
async fn account_switch_refreshes() {
    let setup = Setup::new(BORROWER).post_loans(1).connect().await;
    let mut loans = setup.session.subscribe_loans();
    setup
        .ledger
        .post_loan(BORROWER, common::eth("1"), common::eth("2"), 0);

    setup.ledger.switch_accounts(vec![LENDER]);
    loans.changed().await.unwrap();

    assert_eq!(2, loans.borrow_and_update().len());
    assert_eq!(
        Some(LENDER),
        setup.session.identity().map(|identity| identity.account())
    );
}

#[tokio::test]
async fn chain_switch_reconnects() {
    let setup = Setup::new(BORROWER).post_loans(2).connect().await;
    let refreshes = setup.ledger.counter_reads();

    setup.ledger.switch_chain(ChainId::new("0xaa36a7"));
    setup
        .wait_for_state(|state| {
            state
                .identity()
                .is_some_and(|identity| identity.chain() == &ChainId::new("0xaa36a7"))
        })
        .await;
    while setup.ledger.counter_reads() == refreshes {
        task::yield_now().await;
    }

    assert!(setup.session.is_operation_permitted());
    assert_eq!(refreshes + 1, setup.ledger.counter_reads());
    assert_eq!(2, setup.session.loans().len());
    assert_eq!("connected", setup.session.message().event());
    assert_eq!(1, setup.ledger.subscribers());
}
