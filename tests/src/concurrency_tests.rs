use std::time::Duration;

use tokio::task;

use ledger::{
    config::Config,
    error::ErrorKind,
    testing::{CONTRACT, LENDER},
};
use session::SessionState;

use crate::common::{Setup, eth};

fn patient_config() -> Config {
    Config::new(CONTRACT).with_submission_timeout(Duration::from_secs(60))
}

async fn submitted(setup: &Setup) {
    while setup.ledger.sent().is_empty() {
        task::yield_now().await;
    }
}

async fn settle() {
    for _ in 0..8 {
        task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn notifications_during_pending_submission() {
    let setup = Setup::with_config(LENDER, patient_config())
        .post_loans(1)
        .connect()
        .await;
    let refreshes = setup.ledger.counter_reads();
    setup.ledger.hang_sends();

    let funding = task::spawn({
        let session = setup.session.clone();
        async move { session.fund_loan("1").await }
    });
    submitted(&setup).await;

    setup.ledger.switch_accounts(vec![]);
    setup
        .wait_for_state(|state| *state == SessionState::ConnectionLost)
        .await;
    assert!(!funding.is_finished());

    let err = funding.await.unwrap().unwrap_err();
    assert_eq!(Some(ErrorKind::ReceiptPending), err.kind());
    assert_eq!(refreshes, setup.ledger.counter_reads());
    assert_eq!(1, setup.session.loans().len());
    assert_eq!("fund-loan-failed", setup.session.message().event());
}

#[tokio::test(start_paused = true)]
async fn refresh_waits_for_submission() {
    let setup = Setup::with_config(LENDER, patient_config())
        .post_loans(1)
        .connect()
        .await;
    let refreshes = setup.ledger.counter_reads();
    setup.ledger.hang_sends();

    let funding = task::spawn({
        let session = setup.session.clone();
        async move { session.fund_loan("1").await }
    });
    submitted(&setup).await;

    let refreshing = task::spawn({
        let session = setup.session.clone();
        async move { session.refresh().await.map(|collection| collection.len()) }
    });
    task::yield_now().await;
    task::yield_now().await;
    assert_eq!(refreshes, setup.ledger.counter_reads());

    assert_eq!(Ok(1), refreshing.await.unwrap());
    assert_eq!(refreshes + 1, setup.ledger.counter_reads());
    assert!(funding.is_finished());
    assert_eq!(
        Some(ErrorKind::ReceiptPending),
        funding.await.unwrap().unwrap_err().kind()
    );
}

#[tokio::test(start_paused = true)]
async fn writes_pass_a_waiting_refresh() {
    let setup = Setup::with_config(LENDER, patient_config())
        .post_loans(2)
        .connect()
        .await;
    let refreshes = setup.ledger.counter_reads();
    setup.ledger.hang_sends();

    let first = task::spawn({
        let session = setup.session.clone();
        async move { session.fund_loan("1").await }
    });
    submitted(&setup).await;

    let refreshing = task::spawn({
        let session = setup.session.clone();
        async move { session.refresh().await.map(|collection| collection.len()) }
    });
    settle().await;

    let second = task::spawn({
        let session = setup.session.clone();
        async move { session.fund_loan("2").await }
    });
    settle().await;

    let sent = setup.ledger.sent();
    assert_eq!(2, sent.len());
    assert_eq!(Some(eth("1")), sent[1].value);
    assert_eq!(refreshes, setup.ledger.counter_reads());
    assert!(!refreshing.is_finished());

    for funding in [first, second] {
        assert_eq!(
            Some(ErrorKind::ReceiptPending),
            funding.await.unwrap().unwrap_err().kind()
        );
    }
    assert_eq!(Ok(2), refreshing.await.unwrap());
    assert_eq!(refreshes + 1, setup.ledger.counter_reads());
}

#[tokio::test]
async fn refreshes_do_not_interleave() {
    let setup = Setup::with_config(LENDER, patient_config())
        .post_loans(3)
        .connect()
        .await;
    let refreshes = setup.ledger.counter_reads();
    let reads = setup.ledger.loan_reads().len();

    let first = task::spawn({
        let session = setup.session.clone();
        async move { session.refresh().await.map(|collection| collection.len()) }
    });
    let second = task::spawn({
        let session = setup.session.clone();
        async move { session.refresh().await.map(|collection| collection.len()) }
    });

    assert_eq!(Ok(3), first.await.unwrap());
    assert_eq!(Ok(3), second.await.unwrap());
    assert_eq!(refreshes + 2, setup.ledger.counter_reads());

    let ids: Vec<u64> = setup.ledger.loan_reads()[reads..]
        .iter()
        .map(|loan| loan.get())
        .collect();
    assert_eq!(vec![3, 2, 1, 3, 2, 1], ids);
}
